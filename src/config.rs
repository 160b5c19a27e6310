//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "countdown-display")]
#[command(about = "A countdown-timer display server with a PIN-protected admin panel")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Path of the persisted JSON config document
    #[arg(long, env = "CONFIG_FILE", default_value = "config/config.json")]
    pub config_file: PathBuf,

    /// Directory uploaded logos are written to
    #[arg(long, env = "UPLOAD_DIR", default_value = "static/uploads")]
    pub upload_dir: PathBuf,

    /// Admin PIN used when the config document is first created
    #[arg(long, env = "ADMIN_PIN", default_value = "12345", hide_env_values = true)]
    pub admin_pin: String,

    /// Number of timers to display
    #[arg(long = "timers", env = "TIMER_COUNT", default_value = "2",
          value_parser = clap::value_parser!(u8).range(1..))]
    pub timer_count: u8,

    /// Admin session lifetime in hours
    #[arg(long, env = "SESSION_HOURS", default_value = "12",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub session_hours: u32,

    /// Largest accepted upload in megabytes
    #[arg(long, env = "MAX_UPLOAD_MB", default_value = "10")]
    pub max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Timer ids "1" through the configured count
    pub fn timer_ids(&self) -> Vec<String> {
        (1..=self.timer_count).map(|n| n.to_string()).collect()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["countdown-display"]).unwrap();
        assert_eq!(config.address(), format!("{}:{}", config.host, config.port));
        assert_eq!(config.log_level(), "info");
        assert!(!config.timer_ids().is_empty());
    }

    #[test]
    fn test_sizes() {
        let config = Config::try_parse_from(["countdown-display", "--max-upload-mb", "10"]).unwrap();
        assert_eq!(config.max_upload_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "countdown-display",
            "--port",
            "8080",
            "--timers",
            "4",
            "--config-file",
            "/tmp/c.json",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.timer_ids(), vec!["1", "2", "3", "4"]);
        assert_eq!(config.config_file, PathBuf::from("/tmp/c.json"));
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn test_zero_timers_rejected() {
        assert!(Config::try_parse_from(["countdown-display", "--timers", "0"]).is_err());
    }
}
