mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use gatehouse_api::facade::DeviceFacade;
use gatehouse_api::sweeper::run_sweep_loop;
use gatehouse_api::{AppState, AppStateInner, routes};
use gatehouse_db::Database;
use gatehouse_lifecycle::policy::describe_window;
use gatehouse_lifecycle::{Lifecycle, SystemClock};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gatehouse_server=debug,gatehouse_api=debug,gatehouse_lifecycle=debug,gatehouse_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    config.warn_if_short();

    // Init database and engine
    let db = Arc::new(Database::open(&config.db_path)?);
    let policy = config.policy();
    let lifecycle = Arc::new(Lifecycle::new(db, Arc::new(SystemClock), policy));

    let state: AppState = Arc::new(AppStateInner::new(DeviceFacade::new(lifecycle)));

    // Background expiration sweep
    tokio::spawn(run_sweep_loop(state.sweeper.clone(), config.sweep_interval));

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Gatehouse listening on {}", addr);
    info!(
        "Approval window: {}, re-approval window: {}, sweep every {}s",
        describe_window(policy.approval_window),
        describe_window(policy.reapproval_window),
        config.sweep_interval.as_secs()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gatehouse stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
