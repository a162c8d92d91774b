use anyhow::Context;
use clap::Parser;
use micro_httpd_server::{Config, Server};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(config.log_level).finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let config = config.validate().context("invalid configuration")?;
    info!(
        doc_root = %config.doc_root.display(),
        timer = ?config.timer,
        idle_timeout = ?config.idle_timeout,
        "starting server"
    );

    let server = Server::new(config).context("invalid configuration")?;
    let listener = server.bind().await.context("bind server error")?;
    info!(address = %listener.local_addr()?, "start listening");

    let shutdown = CancellationToken::new();
    let running = tokio::spawn(server.run(listener, shutdown.clone()));

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    shutdown.cancel();
    running.await?;
    Ok(())
}
