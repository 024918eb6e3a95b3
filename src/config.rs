//! Runtime configuration for the radio daemon.
//!
//! Every field has a default matching the stock station: two tracks buffered
//! ahead, 30 s tracks normalized to −14 dBFS with 2 s fades, served on port
//! 5000. A JSON file may override any subset of fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Directory holding finished tracks; also the root of `/tracks/`.
    pub output_dir: PathBuf,

    /// Number of finished tracks kept ready ahead of listeners.
    pub buffer_capacity: usize,

    /// Producer pause when the buffer is full or an iteration failed.
    pub backoff_ms: u64,

    /// Requested length of each generated track in seconds.
    pub track_duration_s: f64,

    /// Loudness target for the post-processor (RMS, full scale = 0 dBFS).
    pub target_dbfs: f32,

    /// Fade-in and fade-out length in milliseconds.
    pub fade_ms: u32,

    /// Address the HTTP/WebSocket server binds to.
    pub bind_addr: String,

    /// Externally reachable base URL used to build `play_track` URLs.
    pub public_url: String,

    /// Generation daemon connection.
    pub daemon: DaemonConfig,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated_tracks"),
            buffer_capacity: 2,
            backoff_ms: 1000,
            track_duration_s: 30.0,
            target_dbfs: -14.0,
            fade_ms: 2000,
            bind_addr: "0.0.0.0:5000".to_string(),
            public_url: "http://localhost:5000".to_string(),
            daemon: DaemonConfig::default(),
        }
    }
}

/// Where and how to reach the ACE-Step generation daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Unix socket the daemon listens on.
    pub socket: PathBuf,

    /// Read timeout for one generation, in seconds. `None` waits forever.
    pub timeout_s: Option<u64>,

    /// Scratch directory for raw daemon output. `None` = platform data dir.
    pub spool_dir: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from("/tmp/ace-step-gen.sock"),
            timeout_s: None,
            spool_dir: None,
        }
    }
}

impl RadioConfig {
    /// Load a config from a JSON file; missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(Error::Config("buffer_capacity must be > 0".into()));
        }
        // Range the generation daemon accepts.
        if !(1.0..=600.0).contains(&self.track_duration_s) {
            return Err(Error::Config(format!(
                "track_duration_s must be between 1 and 600, got {}",
                self.track_duration_s
            )));
        }
        if self.daemon.timeout_s == Some(0) {
            return Err(Error::Config(
                "daemon.timeout_s must be > 0; omit it to wait forever".into(),
            ));
        }
        if !self.target_dbfs.is_finite() || self.target_dbfs > 0.0 {
            return Err(Error::Config(format!(
                "target_dbfs must be a finite value <= 0, got {}",
                self.target_dbfs
            )));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = RadioConfig::default();
        assert_eq!(cfg.buffer_capacity, 2);
        assert_eq!(cfg.backoff(), Duration::from_secs(1));
        assert_eq!(cfg.fade_ms, 2000);
        assert_eq!(cfg.target_dbfs, -14.0);
        assert_eq!(cfg.daemon.socket, PathBuf::from("/tmp/ace-step-gen.sock"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radio.json");
        std::fs::write(&path, r#"{"buffer_capacity": 5, "daemon": {"timeout_s": 600}}"#).unwrap();

        let cfg = RadioConfig::from_file(&path).unwrap();
        assert_eq!(cfg.buffer_capacity, 5);
        assert_eq!(cfg.daemon.timeout_s, Some(600));
        // Untouched fields keep defaults.
        assert_eq!(cfg.fade_ms, 2000);
        assert_eq!(cfg.daemon.socket, PathBuf::from("/tmp/ace-step-gen.sock"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radio.json");
        std::fs::write(&path, r#"{"buffer_capacity": 0}"#).unwrap();
        assert!(matches!(RadioConfig::from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_unusable_values_rejected() {
        let short = RadioConfig {
            track_duration_s: 0.5,
            ..RadioConfig::default()
        };
        assert!(matches!(short.validate(), Err(Error::Config(_))));

        let long = RadioConfig {
            track_duration_s: 601.0,
            ..RadioConfig::default()
        };
        assert!(long.validate().is_err());

        let mut zero_timeout = RadioConfig::default();
        zero_timeout.daemon.timeout_s = Some(0);
        assert!(matches!(zero_timeout.validate(), Err(Error::Config(_))));

        let mut edges = RadioConfig {
            track_duration_s: 1.0,
            ..RadioConfig::default()
        };
        edges.daemon.timeout_s = Some(1);
        assert!(edges.validate().is_ok());
    }
}
