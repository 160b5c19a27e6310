//! Main application state shared by all handlers

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Duration, Utc};

use crate::{
    assets::AssetManager,
    config::Config,
    error::AppResult,
    store::{ConfigRepository, ConfigStore, JsonFileRepository},
};
use super::{Clock, SessionRegistry, SystemClock, TimerAction, TimerBoard, TimerState};

const DEFAULT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;

/// Main application state that owns the timers, config and sessions
pub struct AppState {
    /// Live timers, never persisted
    pub timers: TimerBoard,
    /// Persisted PIN hash, logos and theme
    pub config: Arc<ConfigStore>,
    /// Logo files on disk
    pub assets: AssetManager,
    /// Logged-in admin sessions
    pub sessions: SessionRegistry,
    /// Request body limit applied to uploads
    pub max_upload_bytes: usize,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last admin action tracking
    pub last_action: Mutex<Option<String>>,
    pub last_action_time: Mutex<Option<DateTime<Utc>>>,
}

impl AppState {
    /// Build the state described by the command line configuration
    pub fn from_config(config: &Config) -> Self {
        let repo = Arc::new(JsonFileRepository::new(&config.config_file));
        Self::new(
            repo,
            Arc::new(SystemClock),
            &config.admin_pin,
            config.timer_ids(),
            config.upload_dir.clone(),
            Duration::hours(config.session_hours as i64),
        )
        .with_address(config.host.clone(), config.port)
        .with_upload_limit(config.max_upload_bytes())
    }

    /// Create state over an arbitrary repository and clock
    pub fn new(
        repo: Arc<dyn ConfigRepository>,
        clock: Arc<dyn Clock>,
        initial_pin: &str,
        timer_ids: Vec<String>,
        upload_dir: impl Into<std::path::PathBuf>,
        session_lifetime: Duration,
    ) -> Self {
        let config = Arc::new(ConfigStore::new(repo, initial_pin));

        Self {
            timers: TimerBoard::new(timer_ids, Arc::clone(&clock)),
            assets: AssetManager::new(upload_dir, Arc::clone(&config)),
            config,
            sessions: SessionRegistry::new(session_lifetime, clock),
            max_upload_bytes: DEFAULT_UPLOAD_LIMIT,
            start_time: Instant::now(),
            port: 0,
            host: String::new(),
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
        }
    }

    pub fn with_address(mut self, host: String, port: u16) -> Self {
        self.host = host;
        self.port = port;
        self
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Apply a control action to a timer and record it as the last action
    pub fn control_timer(&self, id: &str, action_name: &str, action: TimerAction) -> AppResult<TimerState> {
        let new_state = self.timers.apply(id, action)?;
        self.record_action(format!("timer {} {}", id, action_name));
        Ok(new_state)
    }

    pub fn record_action(&self, action: impl Into<String>) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.into());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ManualClock;
    use crate::store::MemoryRepository;

    fn state() -> AppState {
        AppState::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(ManualClock::default()),
            "12345",
            vec!["1".to_string(), "2".to_string()],
            std::env::temp_dir().join("countdown-display-test-uploads"),
            Duration::hours(1),
        )
    }

    #[test]
    fn test_control_timer_records_last_action() {
        let state = state();
        assert_eq!(state.get_last_action(), (None, None));

        state
            .control_timer("1", "toggle_enable", TimerAction::ToggleEnable { enabled: true })
            .unwrap();
        let (action, time) = state.get_last_action();
        assert_eq!(action.as_deref(), Some("timer 1 toggle_enable"));
        assert!(time.is_some());
    }

    #[test]
    fn test_failed_control_is_not_recorded() {
        let state = state();
        assert!(state.control_timer("9", "start", TimerAction::Start).is_err());
        assert_eq!(state.get_last_action().0, None);
    }

    #[test]
    fn test_uptime_format() {
        let state = state();
        assert!(state.get_uptime().ends_with('s'));
    }
}
