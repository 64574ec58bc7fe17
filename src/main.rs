use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use code_approvals::app_state::AppState;
use code_approvals::build_router;
use code_approvals::config::Config;
use code_approvals::db::pool::get_db_pool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    std::fs::create_dir_all(&config.log_dir).context("failed to create logs directory")?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    tokio::fs::create_dir_all(&config.attachment_storage_path)
        .await
        .with_context(|| {
            format!(
                "failed to create attachment directory {:?}",
                config.attachment_storage_path
            )
        })?;

    let pool = get_db_pool(&config)
        .await
        .context("failed to connect to the database")?;
    let bind_addr = config.bind_addr;
    let state = AppState::new(pool.clone(), config).context("failed to build notifier")?;
    let app = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server encountered an error")?;

    tracing::info!("Closing database pool...");
    pool.close().await;
    tracing::info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down...");
}
