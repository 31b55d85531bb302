use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};

use crate::http::parser::{read_request, ParseError};
use crate::http::reader::{IncrementalReader, DEFAULT_CAPACITY};
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::writer::{BoxedSink, ResponseWriter};
use crate::server::Handler;

/// Serves exactly one request on one accepted stream.
pub struct Connection<S> {
    stream: S,
    handler: Arc<dyn Handler>,
    read_buffer_size: usize,
}

enum ConnectionState {
    Reading,
    Processing(Request),
    Rejecting(ParseError),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(stream: S, handler: Arc<dyn Handler>) -> Self {
        Self {
            stream,
            handler,
            read_buffer_size: DEFAULT_CAPACITY,
        }
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Reads the request, hands it to the handler (or answers 400 when it is
    /// malformed) and closes the stream.
    ///
    /// Transport failures are returned. Handler failures are logged here,
    /// since the response may already be half written.
    pub async fn run(self) -> anyhow::Result<()> {
        let (read_half, write_half) = tokio::io::split(self.stream);
        let mut reader = IncrementalReader::with_capacity(read_half, self.read_buffer_size);
        let mut sink = Some(write_half);
        let mut state = ConnectionState::Reading;

        loop {
            state = match state {
                ConnectionState::Reading => match read_request(&mut reader).await {
                    Ok(request) => ConnectionState::Processing(request),
                    Err(ParseError::Io(e)) => {
                        return Err(e).context("failed to read request");
                    }
                    Err(e) => ConnectionState::Rejecting(e),
                },

                ConnectionState::Processing(request) => {
                    tracing::info!(
                        method = %request.method(),
                        path = request.target(),
                        "Handling request"
                    );
                    let Some(sink) = sink.take() else {
                        break;
                    };
                    let writer = ResponseWriter::new(Box::new(sink) as BoxedSink);
                    if let Err(e) = self.handler.call(writer, request).await {
                        tracing::error!(error = %e, "Handler failed");
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Rejecting(err) => {
                    tracing::warn!(error = %err, "Rejecting malformed request");
                    if let Some(sink) = sink.take() {
                        reject(sink, &err).await?;
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }
}

async fn reject<S>(sink: WriteHalf<S>, err: &ParseError) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let response: Response = ResponseBuilder::new(StatusCode::BadRequest)
        .header("Content-Type", "text/plain")
        .body(err.to_string())
        .build();

    let mut writer = ResponseWriter::new(sink);
    response
        .write_to(&mut writer)
        .await
        .context("failed to write 400 response")?;
    writer.close().await.context("failed to close connection")?;
    Ok(())
}
