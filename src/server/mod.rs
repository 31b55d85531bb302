//! TCP accept loop and the handler contract.

pub mod listener;

pub use listener::{serve, Handler, HandlerFuture, Server};
