use rawhttp::config::Config;
use rawhttp::routes::Routes;
use rawhttp::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let routes = Routes::from_config(&cfg)?;

    let server = Server::bind(&cfg.server, routes.into_handler()).await?;

    shutdown_signal().await?;
    tracing::info!("Shutdown signal received");

    server.shutdown().await?;
    tracing::info!("Server gracefully stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
