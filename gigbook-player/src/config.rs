//! Configuration for the playback engine
//!
//! TOML file located via [`gigbook_common::config::resolve_config_path`];
//! every key has a built-in default so an absent file is fine.
//!
//! ```toml
//! [playback]
//! status_poll_interval_ms = 500
//! seek_threshold_seconds = 1.0
//! backend_timeout_ms = 5000
//! min_media_bytes = 1000
//! preflight_local_files = true
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::Result;
use gigbook_common::config::{load_toml_or_default, resolve_config_path, LoggingConfig, CONFIG_ENV_VAR};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

const POLL_INTERVAL_RANGE_MS: (u64, u64) = (50, 5_000);
const BACKEND_TIMEOUT_RANGE_MS: (u64, u64) = (100, 60_000);
const MAX_SEEK_THRESHOLD_SECONDS: f64 = 5.0;

/// Top-level config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Resolve, read and validate the config file
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(cli_path, CONFIG_ENV_VAR);
        let config: Config = load_toml_or_default(path.as_deref())?;
        Ok(config.validated())
    }

    /// Clamp out-of-range values, warning about each
    pub fn validated(mut self) -> Self {
        self.playback = self.playback.validated();
        self
    }
}

/// Engine tuning
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Status polling cadence while playing
    #[serde(default = "default_poll_interval_ms")]
    pub status_poll_interval_ms: u64,

    /// Seeks closer than this to the displayed position are ignored
    #[serde(default = "default_seek_threshold")]
    pub seek_threshold_seconds: f64,

    /// Upper bound on any single backend call
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,

    /// Local media smaller than this is treated as corrupted
    #[serde(default = "default_min_media_bytes")]
    pub min_media_bytes: u64,

    /// Check local file references before handing them to the backend
    #[serde(default = "default_true")]
    pub preflight_local_files: bool,
}

impl PlaybackConfig {
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    fn validated(mut self) -> Self {
        let (min, max) = POLL_INTERVAL_RANGE_MS;
        if !(min..=max).contains(&self.status_poll_interval_ms) {
            let clamped = self.status_poll_interval_ms.clamp(min, max);
            warn!(
                "status_poll_interval_ms={} out of range, using {}",
                self.status_poll_interval_ms, clamped
            );
            self.status_poll_interval_ms = clamped;
        }

        let (min, max) = BACKEND_TIMEOUT_RANGE_MS;
        if !(min..=max).contains(&self.backend_timeout_ms) {
            let clamped = self.backend_timeout_ms.clamp(min, max);
            warn!(
                "backend_timeout_ms={} out of range, using {}",
                self.backend_timeout_ms, clamped
            );
            self.backend_timeout_ms = clamped;
        }

        if !self.seek_threshold_seconds.is_finite()
            || !(0.0..=MAX_SEEK_THRESHOLD_SECONDS).contains(&self.seek_threshold_seconds)
        {
            let clamped = if self.seek_threshold_seconds.is_finite() {
                self.seek_threshold_seconds.clamp(0.0, MAX_SEEK_THRESHOLD_SECONDS)
            } else {
                default_seek_threshold()
            };
            warn!(
                "seek_threshold_seconds={} out of range, using {}",
                self.seek_threshold_seconds, clamped
            );
            self.seek_threshold_seconds = clamped;
        }

        self
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            status_poll_interval_ms: default_poll_interval_ms(),
            seek_threshold_seconds: default_seek_threshold(),
            backend_timeout_ms: default_backend_timeout_ms(),
            min_media_bytes: default_min_media_bytes(),
            preflight_local_files: true,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_seek_threshold() -> f64 {
    1.0
}

fn default_backend_timeout_ms() -> u64 {
    5_000
}

fn default_min_media_bytes() -> u64 {
    1_000
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.status_poll_interval(), Duration::from_millis(500));
        assert_eq!(config.seek_threshold_seconds, 1.0);
        assert_eq!(config.min_media_bytes, 1_000);
        assert!(config.preflight_local_files);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[playback]\nbackend_timeout_ms = 250\n").unwrap();
        assert_eq!(config.playback.backend_timeout_ms, 250);
        assert_eq!(config.playback.status_poll_interval_ms, 500);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config: Config = toml::from_str(
            "[playback]\nstatus_poll_interval_ms = 1\nbackend_timeout_ms = 999999\nseek_threshold_seconds = -3.0\n",
        )
        .unwrap();
        let config = config.validated();

        assert_eq!(config.playback.status_poll_interval_ms, 50);
        assert_eq!(config.playback.backend_timeout_ms, 60_000);
        assert_eq!(config.playback.seek_threshold_seconds, 0.0);
    }
}
