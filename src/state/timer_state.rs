//! Timer state structure, transitions and status projection

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Largest span `chrono::Duration::seconds` accepts
const MAX_DELTA_SECONDS: i64 = i64::MAX / 1000;

/// Live state of a single countdown timer
///
/// An enabled timer is always in exactly one sub-state:
/// running with an end time, paused with a remaining count, or inert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub id: String,
    pub label: String,
    pub enabled: bool,
    #[serde(rename = "end_time_utc_iso")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "paused_time_remaining_seconds")]
    pub paused_remaining_seconds: Option<u64>,
    pub is_running: bool,
    pub initial_duration_seconds: u64,
    pub logo_filename: Option<String>,
}

/// What the viewer sees for a timer at a given instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub time_remaining_seconds: u64,
    pub is_running: bool,
    pub times_up: bool,
    pub enabled: bool,
    pub logo_filename: Option<String>,
}

impl TimerState {
    /// Create a disabled timer with no duration
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            enabled: false,
            end_time: None,
            paused_remaining_seconds: None,
            is_running: false,
            initial_duration_seconds: 0,
            logo_filename: None,
        }
    }

    /// Enable or disable the timer; disabling clears duration, countdown and logo
    ///
    /// The paused remainder is zeroed rather than unset, so a timer that is
    /// re-enabled without a new duration reports times up.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.end_time = None;
            self.paused_remaining_seconds = Some(0);
            self.is_running = false;
            self.initial_duration_seconds = 0;
            self.logo_filename = None;
        }
    }

    /// Load a new duration; the timer stops and waits at the full duration
    pub fn set_duration(&mut self, total_seconds: u64) {
        self.initial_duration_seconds = total_seconds;
        self.paused_remaining_seconds = Some(total_seconds);
        self.is_running = false;
        self.end_time = None;
    }

    /// Start counting down from the paused remainder, or the full duration
    ///
    /// Quietly does nothing when disabled, already running or there is nothing to count.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if !self.enabled || self.is_running {
            return;
        }

        let duration = self
            .paused_remaining_seconds
            .unwrap_or(self.initial_duration_seconds);
        if duration > 0 {
            self.run_for(duration, now);
        }
    }

    /// Freeze the countdown at whatever is left
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if !self.is_running {
            return;
        }
        if let Some(end_time) = self.end_time {
            self.paused_remaining_seconds = Some(seconds_until(end_time, now));
            // end_time is left stale; it is ignored while not running
            self.is_running = false;
        }
    }

    /// Continue a paused countdown
    pub fn resume(&mut self, now: DateTime<Utc>) {
        if self.is_running {
            return;
        }
        if let Some(remaining) = self.paused_remaining_seconds.filter(|r| *r > 0) {
            self.run_for(remaining, now);
        }
    }

    /// Stop and rewind to the configured duration
    pub fn reset(&mut self) {
        self.paused_remaining_seconds = Some(self.initial_duration_seconds);
        self.is_running = false;
        self.end_time = None;
    }

    pub fn set_logo(&mut self, logo_filename: Option<String>) {
        self.logo_filename = logo_filename;
    }

    /// Project the state onto what a viewer should display at `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> TimerStatus {
        if !self.enabled {
            return TimerStatus {
                time_remaining_seconds: 0,
                is_running: false,
                times_up: false,
                enabled: false,
                logo_filename: self.logo_filename.clone(),
            };
        }

        let (remaining, times_up) = match (self.is_running, self.end_time, self.paused_remaining_seconds) {
            (true, Some(end_time), _) => {
                let remaining = seconds_until(end_time, now);
                (remaining, remaining == 0)
            }
            (false, _, Some(paused)) => (paused, paused == 0),
            (false, None, None) if self.initial_duration_seconds > 0 => {
                (self.initial_duration_seconds, false)
            }
            _ => (0, false),
        };

        TimerStatus {
            time_remaining_seconds: remaining,
            is_running: self.is_running,
            times_up,
            enabled: true,
            logo_filename: self.logo_filename.clone(),
        }
    }

    fn run_for(&mut self, seconds: u64, now: DateTime<Utc>) {
        if let Some(end_time) = end_time_after(now, seconds) {
            self.end_time = Some(end_time);
            self.is_running = true;
            self.paused_remaining_seconds = None;
        }
    }
}

/// The instant `seconds` after `now`, or `None` past chrono's representable range
pub fn end_time_after(now: DateTime<Utc>, seconds: u64) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(seconds)
        .ok()
        .filter(|s| *s <= MAX_DELTA_SECONDS)?;
    now.checked_add_signed(Duration::seconds(seconds))
}

/// Whole seconds from `now` until `end`, floored and clamped at zero
fn seconds_until(end: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (end - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis / 1000) as u64
    }
}
