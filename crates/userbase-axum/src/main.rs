use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use userbase_axum::{
    UserClient,
    config::{CliArgs, GatewayConfig},
    http::{AppState, router},
    logging::init_logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = GatewayConfig::try_from(args)?;

    init_logging()?;

    // The gateway starts even if the service is not up yet; calls fail with
    // 502 until it is.
    let client = UserClient::connect_lazy(&config.server_uri, config.client.clone())?;
    let state = Arc::new(AppState {
        client,
        grpc_target: config.server_uri.clone(),
    });

    let listener = TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(
        "Gateway listening on {} and forwarding to {}",
        listener.local_addr()?,
        config.server_uri
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway shut down");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM. A handler that fails to install is logged
/// and never fires.
async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Ctrl+C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
