//! HTTP/1.1 protocol implementation.
//!
//! Requests are parsed and responses written directly over a byte stream,
//! one request per connection.
//!
//! # Architecture
//!
//! - **`reader`**: growable read buffer over the connection
//! - **`headers`**: case-insensitive header table and header-line parser
//! - **`request`**: request types
//! - **`parser`**: resumable request parser and the read loop driving it
//! - **`response`**: status codes and buffered responses
//! - **`writer`**: response writer enforcing output order, with chunked bodies
//! - **`connection`**: one task per accepted connection
//!
//! # Request Parser
//!
//! ```text
//!        ┌───────────────┐
//!        │  Initialized  │ ← Wait for the request-line CRLF
//!        └───────┬───────┘
//!                │ request-line parsed
//!                ▼
//!        ┌────────────────┐
//!        │ ParsingHeaders │ ← One header line per step
//!        └───────┬────────┘
//!                │ blank line
//!                ├─ no content-length → Done
//!                ▼
//!        ┌────────────────┐
//!        │  ParsingBody   │ ← Take everything until end-of-stream
//!        └───────┬────────┘
//!                │ body length == content-length
//!                ▼
//!        ┌────────────────┐
//!        │      Done      │
//!        └────────────────┘
//! ```
//!
//! # Response Writer
//!
//! ```text
//! StatusLine → Headers → Body ─┬─────────────────────────────→ (close)
//!                              └─ chunked terminator → Trailers → Done
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rawhttp::http::request::Request;
//! use rawhttp::http::response::Response;
//! use rawhttp::http::writer::ResponseWriter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = rawhttp::server::serve(42069, |mut w: ResponseWriter, _req: Request| async move {
//!         Response::ok("hello\n").write_to(&mut w).await?;
//!         Ok(())
//!     })
//!     .await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await
//! }
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;
