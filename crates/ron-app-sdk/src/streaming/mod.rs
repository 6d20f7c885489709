//! Server-sent event streaming
//!
//! - [`parser`] splits bytes into lines and folds lines into [`Event`]s
//! - [`EventStream`] drives the parser over one response body
//! - [`Subscriber`] reconnects with `Last-Event-ID` resumption

pub use event::Event;
pub use stream::EventStream;
pub use subscriber::{SubscribeOptions, Subscriber, SubscriberState};

mod event;
pub mod parser;
mod stream;
mod subscriber;
