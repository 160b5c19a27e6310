//! Expired admin session cleanup

use std::{sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::state::AppState;

/// How often expired sessions are swept
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that periodically drops expired admin sessions
pub async fn session_sweeper_task(state: Arc<AppState>, every: Duration) {
    info!("Starting session sweeper task");

    let mut interval = interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let removed = state.sessions.prune_expired();
        if removed > 0 {
            info!("Removed {} expired admin sessions", removed);
        } else {
            debug!("No expired admin sessions");
        }
    }
}
