use clap::Parser;
use snowdrift_server::server::config::{CliArgs, ServerConfig};
use snowdrift_server::server::routes::build_router;
use snowdrift_server::server::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry();

    let app = build_router(&config);
    let listener = TcpListener::bind(&config.server_addr).await?;

    tracing::info!(
        addr = %config.server_addr,
        datacenter_id = config.node.datacenter_id(),
        worker_id = config.node.worker_id(),
        validate_caller_identity = config.validate_caller_identity,
        "starting snowdrift server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
