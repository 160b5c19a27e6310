//! Countdown Display - a countdown-timer display server
//!
//! This is the main entry point for the countdown-display application.

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use countdown_display::{
    api::create_router,
    config::Config,
    state::AppState,
    store::is_valid_pin,
    tasks::{session_sweeper_task, SWEEP_INTERVAL},
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("countdown_display={},tower_http=info", config.log_level()))
        .init();

    info!("Starting countdown-display server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, timers={}, config={}, uploads={}",
          config.host, config.port, config.timer_count,
          config.config_file.display(), config.upload_dir.display());

    if !is_valid_pin(&config.admin_pin) {
        warn!("Initial admin PIN is not 5 digits; change it from the admin page after logging in");
    }

    // Create application state and make sure the config document exists
    let state = Arc::new(AppState::from_config(&config));
    state.config.load()?;

    // Start the session sweeper background task
    let sweeper_state = Arc::clone(&state);
    tokio::spawn(async move {
        session_sweeper_task(sweeper_state, SWEEP_INTERVAL).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(state);

    // Bind to the specified address
    let addr = config.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /                         - Viewer page");
    info!("  GET  /admin                    - Admin dashboard (login required)");
    info!("  GET  /api/timer_status         - Live timer status and theme");
    info!("  POST /api/control_timer/:id    - Drive a timer (login required)");
    info!("  GET  /health                   - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
