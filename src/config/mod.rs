//! Dashboard configuration.
//!
//! User-level config: `~/.oscprint/config.yaml`. Every field is optional;
//! anything missing takes its default. Command-line flags override the
//! file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DashError, DashResult};

pub const DEFAULT_PORT: u16 = 31415;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// UDP port to listen on.
    pub port: u16,
    /// Width of the label column.
    pub label_width: usize,
    /// Re-sort the board whenever a new label shows up.
    pub autosort: bool,
    /// Longest wait for a datagram per loop iteration.
    pub recv_timeout_ms: u64,
    /// Longest wait for a keypress per loop iteration.
    pub key_poll_ms: u64,
    /// Bar width of faders created without an explicit width.
    pub fader_width: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            label_width: 16,
            autosort: true,
            recv_timeout_ms: 30,
            key_poll_ms: 5,
            fader_width: 40,
            log_file: None,
        }
    }
}

/// Path to `~/.oscprint/config.yaml`.
pub fn user_config_path() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|p| PathBuf::from(p).join(".oscprint").join("config.yaml"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME")
            .ok()
            .map(|p| PathBuf::from(p).join(".oscprint").join("config.yaml"))
    }
}

impl DashConfig {
    /// Load the user-level config, or defaults if there is none.
    pub fn load() -> DashResult<Self> {
        match user_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`. A missing file gives defaults; a malformed one is
    /// an error.
    pub fn load_from(path: &Path) -> DashResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content)
                .map_err(|e| DashError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_yaml(yaml: &str) -> DashResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| DashError::Config(e.to_string()))
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn key_poll(&self) -> Duration {
        Duration::from_millis(self.key_poll_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = DashConfig::from_yaml("port: 9000\nautosort: false\n").unwrap();
        assert_eq!(config.port, 9000);
        assert!(!config.autosort);
        assert_eq!(config.label_width, 16);
        assert_eq!(config.fader_width, 40);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(DashConfig::from_yaml("").unwrap(), DashConfig::default());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = DashConfig::load_from(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "port: [not a number").unwrap();
        let err = DashConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, DashError::Config(_)));
    }

    #[test]
    fn log_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "log_file: /tmp/oscprint.log\nrecv_timeout_ms: 50\n").unwrap();
        let config = DashConfig::load_from(&path).unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/oscprint.log")));
        assert_eq!(config.recv_timeout(), Duration::from_millis(50));
    }
}
