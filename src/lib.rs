//! Countdown Display - live countdown timers with a PIN-protected admin panel
//!
//! Viewers poll the public status endpoint; an operator logs in with a PIN to
//! configure and drive the timers, manage logos and edit the viewer theme.

pub mod api;
pub mod assets;
pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
pub use utils::signals::shutdown_signal;
