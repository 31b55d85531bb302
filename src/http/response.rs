use tokio::io::AsyncWrite;

use crate::http::headers::HeaderTable;
use crate::http::writer::{ResponseWriter, WriteError};

/// HTTP status codes the server writes.
///
/// Only the codes the server produces itself carry a reason phrase; any other
/// code is written as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 500 Internal Server Error
    InternalServerError,
    /// Any other code, written without a reason phrase
    Other(u16),
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use rawhttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Other(404).as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::InternalServerError => 500,
            StatusCode::Other(code) => *code,
        }
    }

    /// Returns the reason phrase, empty for codes without one.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::Other(_) => "",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            400 => StatusCode::BadRequest,
            500 => StatusCode::InternalServerError,
            other => StatusCode::Other(other),
        }
    }
}

/// Headers sent with a fixed-length response: `content-length`,
/// `connection: close` and `content-type: text/html`.
pub fn default_headers(content_len: usize) -> HeaderTable {
    let mut headers = HeaderTable::new();
    headers.insert_normalized("content-length", content_len.to_string());
    headers.insert_normalized("connection", "close".to_string());
    headers.insert_normalized("content-type", "text/html".to_string());
    headers
}

/// A complete response held in memory, for replies whose body is known up
/// front.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderTable,
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderTable,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Starts from [`default_headers`] for an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: default_headers(0),
            body: Vec::new(),
        }
    }

    /// Sets a header, replacing any default of the same name. Invalid names
    /// are skipped with a warning.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let Err(e) = self.headers.replace(key, value) {
            tracing::warn!(header = key, error = %e, "Dropping invalid response header");
        }
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the final Response, with `content-length` matching the body.
    pub fn build(mut self) -> Response {
        self.headers
            .insert_normalized("content-length", self.body.len().to_string());

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a 200 OK response with the given HTML body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok).body(body).build()
    }

    /// Creates a 400 Bad Request response.
    pub fn bad_request(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::BadRequest).body(body).build()
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::InternalServerError)
            .body(body)
            .build()
    }

    /// Writes status line, headers and body through `writer`.
    pub async fn write_to<W>(&self, writer: &mut ResponseWriter<W>) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_status_line(self.status).await?;
        writer.write_headers(&self.headers).await?;
        writer.write_body(&self.body).await?;
        Ok(())
    }
}
