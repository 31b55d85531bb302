use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use crate::config::ServerConfig;
use crate::http::connection::Connection;
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

/// Pause after a failed accept, so a persistent error such as EMFILE does
/// not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Produces the response for one parsed request.
///
/// The handler owns the writer and is responsible for calling it in order.
/// Any async function or closure with the matching signature is a handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, writer: ResponseWriter, request: Request) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(ResponseWriter, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn call(&self, writer: ResponseWriter, request: Request) -> HandlerFuture {
        Box::pin(self(writer, request))
    }
}

/// Handle to a running accept loop.
///
/// Dropping the handle does not stop the server; call [`Server::close`].
pub struct Server {
    local_addr: SocketAddr,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    accept_loop: JoinHandle<()>,
}

/// Listens on every interface at `port` and serves each connection with
/// `handler`.
pub async fn serve(port: u16, handler: impl Handler) -> anyhow::Result<Server> {
    let cfg = ServerConfig {
        listen_addr: format!("0.0.0.0:{port}"),
        ..ServerConfig::default()
    };
    Server::bind(&cfg, handler).await
}

impl Server {
    /// Binds the listener and starts accepting in the background.
    pub async fn bind(cfg: &ServerConfig, handler: impl Handler) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&cfg.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        let closed = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(Notify::new());
        let accept_loop = tokio::spawn(run(
            listener,
            Arc::new(handler),
            closed.clone(),
            shutdown.clone(),
            cfg.read_buffer_size,
        ));

        Ok(Self {
            local_addr,
            closed,
            shutdown,
            accept_loop,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops accepting. The listener is closed once; connections already
    /// accepted run to completion.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shutdown.notify_one();
        }
    }

    /// Closes the server and waits for the accept loop to release the
    /// listener.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.close();
        self.accept_loop.await.context("accept loop panicked")?;
        Ok(())
    }
}

async fn run(
    listener: TcpListener,
    handler: Arc<dyn Handler>,
    closed: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    read_buffer_size: usize,
) {
    while !closed.load(Ordering::SeqCst) {
        tokio::select! {
            _ = shutdown.notified() => break,

            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    info!("Accepted connection from {}", peer);

                    let conn = Connection::new(socket, handler.clone())
                        .with_read_buffer_size(read_buffer_size);
                    tokio::spawn(
                        async move {
                            if let Err(e) = conn.run().await {
                                tracing::error!("Connection error from {}: {:#}", peer, e);
                            }
                        }
                        .instrument(tracing::info_span!("conn", %peer)),
                    );
                }
                Err(e) => {
                    back_off_after_accept_error(&e).await;
                }
            },
        }
    }

    drop(listener);
    info!("Listener closed");
}

async fn back_off_after_accept_error(e: &std::io::Error) {
    tracing::warn!(error = %e, "Failed to accept connection");
    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn accept_error_waits_before_retrying() {
        let start = Instant::now();
        let err = std::io::Error::from_raw_os_error(24);

        back_off_after_accept_error(&err).await;

        assert!(start.elapsed() >= ACCEPT_ERROR_BACKOFF);
    }
}
