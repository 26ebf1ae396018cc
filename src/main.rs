//! Wake Timer - A persistent countdown timer daemon
//!
//! This is the main entry point for the wake-timer application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use wake_timer::{
    api::create_router,
    config::Config,
    state::{AppState, FileStore, TimerStore},
    timer::{Clock, SystemClock},
    utils::{display_signal_task, shutdown_signal},
    wake::TokioWakeScheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("wake_timer={},tower_http=info", config.log_level()))
        .init();

    info!("Starting wake-timer server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: host={}, port={}, state_dir={}, intervals={}ms/{}ms",
        config.host,
        config.port,
        config.state_dir.display(),
        config.foreground_interval_ms,
        config.background_interval_ms
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = TimerStore::new(Arc::new(FileStore::open(&config.state_dir)?));
    let wake = TokioWakeScheduler::new(Arc::clone(&clock));

    // Create application state; fails on a corrupt state unless told to reset
    let state = AppState::assemble(&config, store, wake, clock)?;

    // The display starts in foreground mode
    state.display()?.resume()?;

    let signal_state = Arc::clone(&state);
    tokio::spawn(async move {
        display_signal_task(signal_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST   /timers              - Start a new timer");
    info!("  GET    /timer               - Active timer");
    info!("  POST   /timer/pause         - Pause the active timer");
    info!("  POST   /timer/resume        - Resume the paused timer");
    info!("  DELETE /timer               - Stop the active timer");
    info!("  GET    /popular             - Most used durations");
    info!("  DELETE /popular/:minutes    - Forget a duration");
    info!("  POST   /display/<mode>      - foreground, background, resume, pause");
    info!("  GET    /countdown           - Latest display tick");
    info!("  POST   /alarm/dismiss       - Stop a ringing alarm");
    info!("  GET    /status              - Check current status");
    info!("  GET    /health              - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    state.shutdown();
    info!("Server shutdown complete");
    Ok(())
}
