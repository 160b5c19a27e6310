//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.
//! Timers themselves need none: remaining time is derived on every request.

pub mod session_sweeper;

// Re-export main functions
pub use session_sweeper::{session_sweeper_task, SWEEP_INTERVAL};
