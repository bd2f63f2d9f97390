//! Serve command implementation

use anyhow::{Context as _, Result};
use tokio::runtime::Handle;
use tracing::info;

use learnpath::server::HttpServer;
use learnpath::SubmissionPipeline;

use super::Context;

/// Run the HTTP API until Ctrl-C
pub async fn serve_command(ctx: &Context, port: Option<u16>) -> Result<()> {
    let mut config = ctx.config()?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let store = ctx.open_store(&config)?;
    let pipeline = SubmissionPipeline::new(store, &config.scoring);
    let server = HttpServer::start(&config.server, pipeline, Handle::current())?;

    println!("Listening on http://127.0.0.1:{} (Ctrl-C to stop)", server.port());
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("[learnpath:http] Shutting down");
    tokio::task::spawn_blocking(move || server.shutdown()).await?;
    Ok(())
}
