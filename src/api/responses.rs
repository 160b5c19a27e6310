//! API response structures

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    state::{TimerState, TimerStatus},
    store::{LogoEntry, Theme},
};

/// Body of GET /api/timer_status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timers: BTreeMap<String, TimerStatus>,
    pub theme: Theme,
}

/// Body returned after a timer control action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub message: String,
    #[serde(rename = "newState")]
    pub new_state: TimerState,
}

impl ControlResponse {
    pub fn new(timer_id: &str, action: &str, new_state: TimerState) -> Self {
        Self {
            message: format!("Timer {} action {} processed", timer_id, action),
            new_state,
        }
    }
}

/// Body returned after a logo upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub logo: LogoEntry,
}

/// Plain confirmation, optionally carrying a non-fatal warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            warning: None,
        }
    }

    pub fn with_warning(message: impl Into<String>, warning: Option<String>) -> Self {
        Self {
            message: message.into(),
            warning,
        }
    }
}

/// Body returned after a theme update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeResponse {
    pub message: String,
    pub theme: Theme,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
    pub host: String,
    pub port: u16,
    pub timers: usize,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok(
        uptime: String,
        host: String,
        port: u16,
        timers: usize,
        last_action: Option<String>,
        last_action_time: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime,
            host,
            port,
            timers,
            last_action,
            last_action_time,
        }
    }
}
