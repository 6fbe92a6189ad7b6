use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Command line flags. Each one overrides its environment variable.
#[derive(Parser, Debug, Default)]
#[command(version, about = "Terminal client for the Gemini Multimodal Live API")]
pub struct Cli {
    /// Preference file (LIVE_CONSOLE_PREFS)
    #[arg(long)]
    pub prefs: Option<PathBuf>,
    /// WebSocket endpoint (GEMINI_LIVE_URL)
    #[arg(long)]
    pub endpoint: Option<String>,
    /// Image file or directory used as the camera (CAMERA_SOURCE)
    #[arg(long)]
    pub camera: Option<PathBuf>,
    /// Image file or directory used as the shared screen (SCREEN_SOURCE)
    #[arg(long)]
    pub screen: Option<PathBuf>,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub prefs_path: PathBuf,
    pub endpoint: String,
    pub log_level: Level,
    pub camera_source: Option<PathBuf>,
    pub screen_source: Option<PathBuf>,
    pub reconnect_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let prefs_path = std::env::var("LIVE_CONSOLE_PREFS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".live-console/preferences.json"));

        let endpoint = std::env::var("GEMINI_LIVE_URL")
            .unwrap_or_else(|_| gemini_realtime::DEFAULT_ENDPOINT.to_string());
        if !endpoint.starts_with("ws://") && !endpoint.starts_with("wss://") {
            return Err(ConfigError::InvalidValue(
                "GEMINI_LIVE_URL".to_string(),
                format!("'{}' is not a ws:// or wss:// URL", endpoint),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let camera_source = std::env::var("CAMERA_SOURCE").ok().map(PathBuf::from);
        let screen_source = std::env::var("SCREEN_SOURCE").ok().map(PathBuf::from);

        let reconnect_delay = match std::env::var("RECONNECT_DELAY_MS") {
            Ok(value) => value.parse::<u64>().map(Duration::from_millis).map_err(|_| {
                ConfigError::InvalidValue(
                    "RECONNECT_DELAY_MS".to_string(),
                    format!("'{}' is not a number of milliseconds", value),
                )
            })?,
            Err(_) => live_console_core::controller::RECONNECT_DELAY,
        };

        Ok(Self {
            prefs_path,
            endpoint,
            log_level,
            camera_source,
            screen_source,
            reconnect_delay,
        })
    }

    /// Applies command line flags on top of the environment.
    pub fn with_cli(mut self, cli: Cli) -> Self {
        if let Some(prefs) = cli.prefs {
            self.prefs_path = prefs;
        }
        if let Some(endpoint) = cli.endpoint {
            self.endpoint = endpoint;
        }
        if cli.camera.is_some() {
            self.camera_source = cli.camera;
        }
        if cli.screen.is_some() {
            self.screen_source = cli.screen;
        }
        self
    }
}
