//! Upstream connection and response streaming
//!
//! Fetches a resource from the configured upstream over plain HTTP and hands
//! the body back piece by piece, so the caller can forward it while it is
//! still arriving.

use crate::config::UpstreamConfig;
use crate::http::headers::{find_crlf, HeaderTable};
use crate::http::response::StatusCode;
use anyhow::{Context, Result};
use bytes::{Buf, Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use url::Url;

/// Default buffer size for streaming
const BUFFER_SIZE: usize = 8192;

/// Largest piece returned by [`UpstreamResponse::next_chunk`]
pub const BODY_CHUNK_SIZE: usize = 512;

/// Upper bound on the upstream status line plus headers
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Fetches resources from one upstream base URL
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Base URL; request paths are appended to its path
    base_url: Url,

    /// Connection timeout duration
    connection_timeout: Duration,

    /// Bound on receiving the response head, and on each body read
    request_timeout: Duration,
}

/// Status and headers of an upstream response, with the body still on the wire
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderTable,
    stream: TcpStream,
    buffer: BytesMut,
    /// Body bytes still expected when the upstream sent `content-length`
    remaining: Option<usize>,
    read_timeout: Duration,
}

impl Upstream {
    /// Create a new upstream
    pub fn new(base_url: Url, connection_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            base_url,
            connection_timeout,
            request_timeout,
        }
    }

    pub fn from_config(cfg: &UpstreamConfig) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url).context("Invalid upstream URL")?;
        Ok(Self::new(
            base_url,
            cfg.connect_timeout(),
            cfg.request_timeout(),
        ))
    }

    /// Resolve a request target (path plus optional query) against the base URL
    pub fn target_url(&self, target: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let target = if target.starts_with('/') {
            target.to_string()
        } else {
            format!("/{target}")
        };
        Url::parse(&format!("{base}{target}")).context("Invalid upstream target")
    }

    /// Fetch `target` and return once the response head has arrived
    ///
    /// This function:
    /// 1. Connects to the upstream host
    /// 2. Sends a `GET` request
    /// 3. Reads the status line and headers
    /// 4. Leaves the body to be pulled with [`UpstreamResponse::next_chunk`]
    pub async fn fetch(&self, target: &str) -> Result<UpstreamResponse> {
        let url = self.target_url(target)?;
        if url.scheme() != "http" {
            anyhow::bail!("Unsupported upstream scheme {}: only plain http is supported", url.scheme());
        }

        let host = url.host_str().context("Upstream URL missing host")?;
        let port = url.port_or_known_default().unwrap_or(80);

        // Connect to upstream with timeout
        let addr = format!("{}:{}", host, port);
        let mut stream = timeout(self.connection_timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .with_context(|| format!("Failed to connect to upstream {addr}"))?;

        tracing::debug!(upstream = %url, "Connected to upstream");

        let request_bytes = self.build_http_request(&url)?;
        stream.write_all(&request_bytes).await?;
        stream.flush().await?;

        let deadline = Instant::now() + self.request_timeout;
        let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);
        let (status, headers) = timeout_at(deadline, read_head(&mut stream, &mut buffer))
            .await
            .context("Request timeout")??;

        let remaining = match headers.get("content-length") {
            Some(raw) => Some(
                raw.parse::<usize>()
                    .with_context(|| format!("Invalid upstream content-length {raw:?}"))?,
            ),
            None => None,
        };

        tracing::info!(
            upstream = %url,
            status = status.as_u16(),
            content_length = ?remaining,
            "Upstream responded"
        );

        Ok(UpstreamResponse {
            status,
            headers,
            stream,
            buffer,
            remaining,
            read_timeout: self.request_timeout,
        })
    }

    /// Build HTTP request bytes to send to the upstream
    ///
    /// The request is sent as HTTP/1.0 so the upstream frames its body with
    /// `content-length` or connection close, never chunked.
    pub fn build_http_request(&self, url: &Url) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }
        buffer.extend_from_slice(format!("GET {} HTTP/1.0\r\n", target).as_bytes());

        let host = url.host_str().context("Upstream URL missing host")?;
        let host_value = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let mut headers = HeaderTable::new();
        headers.set("Host", &host_value)?;
        headers.set("Accept", "*/*")?;
        headers.set("User-Agent", concat!("rawhttp/", env!("CARGO_PKG_VERSION")))?;
        headers.set("Connection", "close")?;
        headers.write_block(&mut buffer);

        Ok(buffer)
    }
}

impl UpstreamResponse {
    /// Next piece of the body, at most [`BODY_CHUNK_SIZE`] bytes, or `None`
    /// once the body is complete
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }

        if self.buffer.is_empty() {
            self.buffer.reserve(BUFFER_SIZE);
            let n = timeout(self.read_timeout, self.stream.read_buf(&mut self.buffer))
                .await
                .context("Request timeout")??;

            if n == 0 {
                return match self.remaining {
                    Some(left) => Err(anyhow::anyhow!(
                        "Connection closed with {left} body bytes outstanding"
                    )),
                    None => Ok(None),
                };
            }
        }

        let mut take = self.buffer.len().min(BODY_CHUNK_SIZE);
        if let Some(left) = self.remaining {
            take = take.min(left);
            self.remaining = Some(left - take);
        }
        Ok(Some(self.buffer.split_to(take).freeze()))
    }
}

/// Read the status line and headers, leaving any body bytes in `buffer`
async fn read_head(stream: &mut TcpStream, buffer: &mut BytesMut) -> Result<(StatusCode, HeaderTable)> {
    let mut status = None;
    let mut headers = HeaderTable::new();

    loop {
        loop {
            match status {
                None => {
                    let Some(end) = find_crlf(buffer) else {
                        break;
                    };
                    status = Some(parse_status_line(&buffer[..end])?);
                    buffer.advance(end + 2);
                }
                Some(status) => {
                    let (n, done) = headers
                        .parse_one_line(buffer)
                        .context("Invalid upstream header")?;
                    buffer.advance(n);
                    if done {
                        return Ok((status, headers));
                    }
                    if n == 0 {
                        break;
                    }
                }
            }
        }

        // Prevent unbounded header growth
        if buffer.len() > MAX_HEAD_SIZE {
            anyhow::bail!("Response headers too large");
        }

        buffer.reserve(BUFFER_SIZE);
        let n = stream.read_buf(buffer).await?;
        if n == 0 {
            anyhow::bail!("Connection closed before complete response received");
        }
    }
}

/// Parse `HTTP/1.x <code> <reason>`
pub fn parse_status_line(line: &[u8]) -> Result<StatusCode> {
    let line = std::str::from_utf8(line).context("Invalid UTF-8 in status line")?;
    let mut parts = line.splitn(3, ' ');

    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        anyhow::bail!("Invalid status line: {}", line);
    }

    let code: u16 = parts
        .next()
        .context("Status line missing code")?
        .parse()
        .context("Invalid status code")?;

    Ok(StatusCode::from(code))
}
