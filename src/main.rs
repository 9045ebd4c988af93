use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use manga_edge::config::Args;
use manga_edge::{EdgeError, logging, proxy};

#[tokio::main]
async fn main() -> Result<(), EdgeError> {
    logging::init();
    let args = Args::parse();

    let state = args.app_state()?;
    let sweeper = args
        .sweep_interval()
        .map(|every| proxy::spawn_sweeper(&state, every));

    let listener = TcpListener::bind(args.listen).await?;
    info!(addr = %listener.local_addr()?, "manga-edge listening");

    let result = proxy::serve(listener, state, shutdown_signal()).await;
    if let Some(task) = sweeper {
        task.abort();
    }
    if let Err(e) = &result {
        error!(error = %e, "server stopped with an error");
    }
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
