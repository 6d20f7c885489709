//! Event stream over a streaming response body

use super::Event;
use super::parser::{InvalidLine, LineDecoder, SseParser};
use crate::error::{Error, Result};
use crate::http::{ByteStream, HttpMethod};
use crate::observability::StreamContext;
use futures::Stream;
use pin_project::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Lazy sequence of [`Event`]s decoded from one connection.
///
/// Ends when the body ends. A transport or decoding failure is yielded once,
/// after every event decoded before it, and then the stream ends.
#[pin_project]
pub struct EventStream {
    #[pin]
    body: ByteStream,
    decoder: LineDecoder,
    parser: SseParser,
    pending: VecDeque<Event>,
    failure: Option<Error>,
    finished: bool,
    path: String,
    context: StreamContext,
}

impl EventStream {
    /// Wrap a response body.
    pub fn new(body: ByteStream, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            body,
            decoder: LineDecoder::new(),
            parser: SseParser::new(),
            pending: VecDeque::new(),
            failure: None,
            finished: false,
            context: StreamContext::new(path.clone()),
            path,
        }
    }

    /// Path the stream was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("path", &self.path)
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

fn line_failure(error: InvalidLine, path: &str) -> Error {
    Error::Parse {
        message: error.to_string(),
        method: HttpMethod::Get,
        path: path.to_string(),
        status: None,
    }
}

impl Stream for EventStream {
    type Item = Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.pending.pop_front() {
                this.context
                    .log_event(event.id.as_deref(), event.event.as_deref());
                return Poll::Ready(Some(Ok(event)));
            }
            if let Some(error) = this.failure.take() {
                this.context.log_error(&error);
                return Poll::Ready(Some(Err(error)));
            }
            if *this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.body.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    this.decoder.extend(&chunk);
                    while let Some(line) = this.decoder.next_line() {
                        match line {
                            Ok(line) => this.pending.extend(this.parser.push_line(&line)),
                            Err(e) => {
                                *this.failure = Some(line_failure(e, this.path));
                                *this.finished = true;
                                break;
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    *this.failure = Some(e.into_error(HttpMethod::Get, this.path));
                    *this.finished = true;
                }
                None => {
                    *this.finished = true;
                    match this.decoder.finish() {
                        Some(Ok(line)) => this.pending.extend(this.parser.push_line(&line)),
                        Some(Err(e)) => *this.failure = Some(line_failure(e, this.path)),
                        None => {}
                    }
                    this.pending.extend(this.parser.finish());
                    this.context.log_complete();
                }
            }
        }
    }
}
