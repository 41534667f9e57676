//! askrelay core library — event model, request forwarder, upstream transport,
//! and the webhook host used by the CLI.

pub mod config;
pub mod event;
pub mod forwarder;
pub mod host;
pub mod relay;
pub mod response;
pub mod sink;
pub mod upstream;

pub use event::InboundEvent;
pub use forwarder::{Completion, CompletionError, InvocationFault, RequestForwarder};
