//! Demo request handlers served by the binary.
//!
//! | Target            | Response                                            |
//! |-------------------|-----------------------------------------------------|
//! | `/yourproblem`    | 400 page                                            |
//! | `/myproblem`      | 500 page                                            |
//! | `/httpbin/<rest>` | upstream `<rest>` re-sent chunked, with trailers    |
//! | `/video`          | configured static file as `video/mp4`               |
//! | anything else     | 200 page                                            |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::http::headers::HeaderTable;
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::proxy::Upstream;
use crate::server::Handler;

pub const BAD_REQUEST_HTML: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

pub const INTERNAL_ERROR_HTML: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

pub const OK_HTML: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

const PROXY_PREFIX: &str = "/httpbin";

pub struct Routes {
    upstream: Upstream,
    video: Option<PathBuf>,
}

impl Routes {
    pub fn new(upstream: Upstream, video: Option<PathBuf>) -> Self {
        Self { upstream, video }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            Upstream::from_config(&cfg.upstream)?,
            cfg.static_files.video.clone(),
        ))
    }

    /// Wraps the routes in a [`Handler`] for the server.
    pub fn into_handler(self) -> impl Handler {
        let routes = Arc::new(self);
        move |writer: ResponseWriter, request: Request| {
            let routes = routes.clone();
            async move { routes.handle(writer, request).await }
        }
    }

    pub async fn handle(&self, mut writer: ResponseWriter, request: Request) -> anyhow::Result<()> {
        let target = request.target();

        if let Some(rest) = target.strip_prefix(PROXY_PREFIX) {
            return self.proxy(&mut writer, rest).await;
        }

        let response = match target {
            "/yourproblem" => Response::bad_request(BAD_REQUEST_HTML),
            "/myproblem" => Response::internal_error(INTERNAL_ERROR_HTML),
            "/video" => self.video().await,
            _ => Response::ok(OK_HTML),
        };
        response.write_to(&mut writer).await?;
        writer.close().await?;
        Ok(())
    }

    async fn video(&self) -> Response {
        let Some(path) = &self.video else {
            return ResponseBuilder::new(StatusCode::Other(404)).build();
        };
        match tokio::fs::read(path).await {
            Ok(data) => ResponseBuilder::new(StatusCode::Ok)
                .header("Content-Type", "video/mp4")
                .body(data)
                .build(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read video");
                ResponseBuilder::new(StatusCode::Other(404)).build()
            }
        }
    }

    /// Streams an upstream body back as a chunked response, then reports its
    /// digest and length as trailers.
    async fn proxy(&self, writer: &mut ResponseWriter, target: &str) -> anyhow::Result<()> {
        let mut upstream = match self.upstream.fetch(target).await {
            Ok(upstream) => upstream,
            Err(e) => {
                tracing::error!(error = ?e, path = target, "Upstream request failed");
                Response::internal_error(INTERNAL_ERROR_HTML)
                    .write_to(writer)
                    .await?;
                writer.close().await?;
                return Ok(());
            }
        };

        let mut headers = HeaderTable::new();
        headers.set("Content-Type", upstream.headers.get("content-type").unwrap_or("application/json"))?;
        headers.set("Transfer-Encoding", "chunked")?;
        headers.set("Connection", "close")?;
        headers.set("Trailer", "X-Content-SHA256")?;
        headers.set("Trailer", "X-Content-Length")?;

        writer.write_status_line(StatusCode::Ok).await?;
        writer.write_headers(&headers).await?;

        let mut hasher = Sha256::new();
        let mut length = 0usize;
        while let Some(chunk) = upstream
            .next_chunk()
            .await
            .context("failed to read upstream body")?
        {
            tracing::debug!(bytes = chunk.len(), "Forwarding chunk");
            hasher.update(&chunk);
            length += chunk.len();
            writer.write_chunk(&chunk).await?;
        }
        writer.write_chunked_body_done().await?;

        let mut trailers = HeaderTable::new();
        trailers.set("X-Content-SHA256", &hex(&hasher.finalize()))?;
        trailers.set("X-Content-Length", &length.to_string())?;
        writer.write_trailers(&trailers).await?;
        writer.close().await?;
        Ok(())
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
