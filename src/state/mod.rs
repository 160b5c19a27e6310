//! State management module
//!
//! This module contains the in-memory timer engine, the admin session
//! registry and the shared application state.

pub mod app_state;
pub mod clock;
pub mod sessions;
pub mod timer_board;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use clock::{Clock, ManualClock, SystemClock};
pub use sessions::SessionRegistry;
pub use timer_board::{TimerAction, TimerBoard};
pub use timer_state::{TimerState, TimerStatus};
