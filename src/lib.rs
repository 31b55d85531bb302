//! rawhttp - HTTP/1.1 over raw TCP
//!
//! Request parsing and response writing on top of a byte stream, plus the
//! accept loop and demo routes that drive them.

pub mod config;
pub mod http;
pub mod proxy;
pub mod routes;
pub mod server;
