//! Keyed collection of timers and the control actions applied to them

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use super::{
    clock::Clock,
    timer_state::{end_time_after, TimerState, TimerStatus},
};

/// A control request for one timer, tagged by its `action` field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TimerAction {
    ToggleEnable {
        #[serde(default, deserialize_with = "truthy")]
        enabled: bool,
    },
    SetTime {
        #[serde(default, deserialize_with = "whole_number")]
        hours: u64,
        #[serde(default, deserialize_with = "whole_number")]
        minutes: u64,
        #[serde(default, deserialize_with = "whole_number")]
        seconds: u64,
    },
    Start,
    Pause,
    Resume,
    Reset,
    SetLogo {
        #[serde(default)]
        logo_filename: Option<String>,
    },
    /// Unrecognized actions leave the timer untouched
    #[serde(other)]
    Unknown,
}

impl TimerAction {
    /// Parse a control body such as `{"action": "set_time", "minutes": 5}`
    pub fn from_payload(payload: Value) -> AppResult<Self> {
        match payload.get("action") {
            Some(Value::String(_)) => {}
            Some(_) => return Err(AppError::validation("Action must be a string")),
            None => return Err(AppError::validation("Missing action in payload")),
        }
        serde_json::from_value(payload)
            .map_err(|e| AppError::validation(format!("Invalid JSON payload: {}", e)))
    }
}

/// Accept integers, integral floats and numeric strings; reject negatives
fn whole_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Null => return Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n >= 0 => Ok(n as u64),
        Some(n) => Err(de::Error::custom(format!("expected a non-negative number, got {}", n))),
        None => Err(de::Error::custom(format!("expected a whole number, got {}", value))),
    }
}

/// Loose truthiness: `0`, `""`, `null`, `false` and empty collections are false
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    })
}

/// Total seconds for an `h:m:s` triple
pub fn total_seconds(hours: u64, minutes: u64, seconds: u64) -> AppResult<u64> {
    hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|hm| hm.checked_add(seconds))
        .ok_or_else(|| AppError::validation("Duration is too long"))
}

/// Owns every timer's in-memory state
pub struct TimerBoard {
    timers: Mutex<BTreeMap<String, TimerState>>,
    clock: Arc<dyn Clock>,
}

impl TimerBoard {
    /// Create one disabled timer per id, labelled `Timer <id>`
    pub fn new<I, S>(ids: I, clock: Arc<dyn Clock>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let timers = ids
            .into_iter()
            .map(|id| {
                let id = id.into();
                let label = format!("Timer {}", id);
                (id.clone(), TimerState::new(id, label))
            })
            .collect();

        Self {
            timers: Mutex::new(timers),
            clock,
        }
    }

    pub fn contains(&self, id: &str) -> AppResult<bool> {
        Ok(self.lock()?.contains_key(id))
    }

    pub fn ids(&self) -> AppResult<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    /// Apply a mutation to one timer and return its new state
    pub fn update<F>(&self, id: &str, updater: F) -> AppResult<TimerState>
    where
        F: FnOnce(&mut TimerState),
    {
        let mut timers = self.lock()?;
        let timer = timers
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("Unknown timer id: {}", id)))?;
        updater(timer);
        Ok(timer.clone())
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> AppResult<TimerState> {
        info!("Setting timer {} enabled to: {}", id, enabled);
        self.update(id, |timer| timer.set_enabled(enabled))
    }

    pub fn set_duration(&self, id: &str, hours: u64, minutes: u64, seconds: u64) -> AppResult<TimerState> {
        let total = total_seconds(hours, minutes, seconds)?;
        if end_time_after(self.clock.now(), total).is_none() {
            return Err(AppError::validation("Duration is too long"));
        }
        info!("Setting timer {} duration to {}s", id, total);
        self.update(id, |timer| timer.set_duration(total))
    }

    pub fn start(&self, id: &str) -> AppResult<TimerState> {
        let now = self.clock.now();
        self.update(id, |timer| timer.start(now))
    }

    pub fn pause(&self, id: &str) -> AppResult<TimerState> {
        let now = self.clock.now();
        self.update(id, |timer| timer.pause(now))
    }

    pub fn resume(&self, id: &str) -> AppResult<TimerState> {
        let now = self.clock.now();
        self.update(id, |timer| timer.resume(now))
    }

    pub fn reset(&self, id: &str) -> AppResult<TimerState> {
        self.update(id, TimerState::reset)
    }

    pub fn set_logo(&self, id: &str, logo_filename: Option<String>) -> AppResult<TimerState> {
        self.update(id, |timer| timer.set_logo(logo_filename))
    }

    /// Dispatch a parsed control action
    pub fn apply(&self, id: &str, action: TimerAction) -> AppResult<TimerState> {
        let new_state = match action {
            TimerAction::ToggleEnable { enabled } => self.set_enabled(id, enabled)?,
            TimerAction::SetTime { hours, minutes, seconds } => {
                self.set_duration(id, hours, minutes, seconds)?
            }
            TimerAction::Start => self.start(id)?,
            TimerAction::Pause => self.pause(id)?,
            TimerAction::Resume => self.resume(id)?,
            TimerAction::Reset => self.reset(id)?,
            TimerAction::SetLogo { logo_filename } => self.set_logo(id, logo_filename)?,
            TimerAction::Unknown => {
                debug!("Ignoring unknown action for timer {}", id);
                self.get(id)?
            }
        };
        debug!("Timer {} new state: {:?}", id, new_state);
        Ok(new_state)
    }

    pub fn get(&self, id: &str) -> AppResult<TimerState> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Unknown timer id: {}", id)))
    }

    /// Status of one timer as of now
    pub fn status_of(&self, id: &str) -> AppResult<TimerStatus> {
        let now = self.clock.now();
        Ok(self.get(id)?.status_at(now))
    }

    /// Status of every timer as of now, ordered by id
    pub fn status_all(&self) -> AppResult<BTreeMap<String, TimerStatus>> {
        let now = self.clock.now();
        Ok(self
            .lock()?
            .iter()
            .map(|(id, timer)| (id.clone(), timer.status_at(now)))
            .collect())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, BTreeMap<String, TimerState>>> {
        self.timers
            .lock()
            .map_err(|e| AppError::internal(format!("Failed to lock timer state: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::clock::ManualClock;
    use serde_json::json;

    fn board() -> (TimerBoard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (TimerBoard::new(["1", "2"], clock.clone()), clock)
    }

    #[test]
    fn test_board_creates_disabled_timers() {
        let (board, _) = board();
        assert_eq!(board.ids().unwrap(), vec!["1", "2"]);
        let timer = board.get("2").unwrap();
        assert_eq!(timer.label, "Timer 2");
        assert!(!timer.enabled);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let (board, _) = board();
        assert!(!board.contains("3").unwrap());
        assert!(board.contains("1").unwrap());
        assert!(matches!(board.start("3"), Err(AppError::NotFound(_))));
        assert!(matches!(board.status_of("3"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_ten_second_countdown_expires() {
        let (board, clock) = board();
        board.set_enabled("1", true).unwrap();
        board.set_duration("1", 0, 0, 10).unwrap();
        board.start("1").unwrap();

        clock.advance_secs(11);
        let status = board.status_of("1").unwrap();
        assert_eq!(status.time_remaining_seconds, 0);
        assert!(status.is_running);
        assert!(status.times_up);
    }

    #[test]
    fn test_status_all_is_recomputed() {
        let (board, clock) = board();
        board.set_enabled("1", true).unwrap();
        board.set_duration("1", 0, 1, 0).unwrap();
        board.start("1").unwrap();

        assert_eq!(board.status_all().unwrap()["1"].time_remaining_seconds, 60);
        clock.advance_secs(15);
        assert_eq!(board.status_all().unwrap()["1"].time_remaining_seconds, 45);
        assert!(!board.status_all().unwrap()["2"].enabled);
    }

    #[test]
    fn test_apply_dispatches_actions() {
        let (board, clock) = board();
        board.apply("1", TimerAction::ToggleEnable { enabled: true }).unwrap();
        board
            .apply("1", TimerAction::SetTime { hours: 1, minutes: 2, seconds: 3 })
            .unwrap();
        assert_eq!(board.get("1").unwrap().initial_duration_seconds, 3723);

        board.apply("1", TimerAction::Start).unwrap();
        clock.advance_secs(23);
        let paused = board.apply("1", TimerAction::Pause).unwrap();
        assert_eq!(paused.paused_remaining_seconds, Some(3700));

        let resumed = board.apply("1", TimerAction::Resume).unwrap();
        assert!(resumed.is_running);

        let reset = board.apply("1", TimerAction::Reset).unwrap();
        assert_eq!(reset.paused_remaining_seconds, Some(3723));

        let with_logo = board
            .apply("1", TimerAction::SetLogo { logo_filename: Some("a.png".into()) })
            .unwrap();
        assert_eq!(with_logo.logo_filename.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_unknown_action_changes_nothing() {
        let (board, _) = board();
        board.set_enabled("1", true).unwrap();
        let before = board.get("1").unwrap();
        let after = board.apply("1", TimerAction::Unknown).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!(
            TimerAction::from_payload(json!({"action": "toggle_enable", "enabled": true})).unwrap(),
            TimerAction::ToggleEnable { enabled: true }
        );
        assert_eq!(
            TimerAction::from_payload(json!({"action": "toggle_enable"})).unwrap(),
            TimerAction::ToggleEnable { enabled: false }
        );
        assert_eq!(
            TimerAction::from_payload(json!({"action": "set_time", "hours": "1", "minutes": 30.0})).unwrap(),
            TimerAction::SetTime { hours: 1, minutes: 30, seconds: 0 }
        );
        assert_eq!(
            TimerAction::from_payload(json!({"action": "set_logo", "logo_filename": null})).unwrap(),
            TimerAction::SetLogo { logo_filename: None }
        );
        assert_eq!(
            TimerAction::from_payload(json!({"action": "explode"})).unwrap(),
            TimerAction::Unknown
        );
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        assert!(matches!(
            TimerAction::from_payload(json!({"hours": 1})),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            TimerAction::from_payload(json!({"action": "set_time", "seconds": -5})),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            TimerAction::from_payload(json!({"action": "set_time", "minutes": "ten"})),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_total_seconds_bounds() {
        assert_eq!(total_seconds(0, 0, 0).unwrap(), 0);
        assert_eq!(total_seconds(2, 0, 5).unwrap(), 7205);
        assert_eq!(total_seconds(10_000, 0, 0).unwrap(), 36_000_000);
        assert!(total_seconds(u64::MAX, 0, 0).is_err());
        assert!(total_seconds(0, u64::MAX, 0).is_err());
    }

    #[test]
    fn test_long_durations_are_accepted() {
        let (board, clock) = board();
        board.set_enabled("1", true).unwrap();
        let timer = board.set_duration("1", 9000, 0, 0).unwrap();
        assert_eq!(timer.initial_duration_seconds, 32_400_000);

        board.start("1").unwrap();
        clock.advance_secs(400);
        assert_eq!(board.status_of("1").unwrap().time_remaining_seconds, 32_399_600);
    }

    #[test]
    fn test_unrepresentable_duration_is_rejected() {
        let (board, _) = board();
        board.set_enabled("1", true).unwrap();
        board.set_duration("1", 0, 0, 30).unwrap();

        let err = board.set_duration("1", 10_000_000_000_000, 0, 0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(board.get("1").unwrap().initial_duration_seconds, 30);
    }

    #[test]
    fn test_toggle_enable_accepts_loose_flags() {
        for (enabled, expected) in [
            (json!(1), true),
            (json!("true"), true),
            (json!("yes"), true),
            (json!(0), false),
            (json!(""), false),
            (json!(null), false),
        ] {
            assert_eq!(
                TimerAction::from_payload(json!({"action": "toggle_enable", "enabled": enabled})).unwrap(),
                TimerAction::ToggleEnable { enabled: expected }
            );
        }
    }

    #[test]
    fn test_poisoned_board_is_internal_error() {
        let (board, _) = board();
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = board.timers.lock().unwrap();
            panic!("poison the timer lock");
        }));
        assert!(poisoned.is_err());

        assert!(matches!(board.contains("1"), Err(AppError::Internal(_))));
        assert!(matches!(board.status_all(), Err(AppError::Internal(_))));
    }
}
