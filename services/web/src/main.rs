use std::net::SocketAddr;

use anyhow::Context as _;
use tokio::net::TcpListener;
use tracing::info;

use schoolhub_core::config::Config;
use schoolhub_core::tracing::init_tracing;
use schoolhub_web::config::WebConfig;
use schoolhub_web::router::build_router;
use schoolhub_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WebConfig::from_env().context("load configuration from environment")?;
    init_tracing(config.log_format);
    info!(?config, "starting schoolhub");

    let state = AppState::connect(&config).await?;
    let router = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!(%addr, "schoolhub listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server drained, closing database pool");
    state.close().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
