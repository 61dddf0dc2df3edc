//! Playback configuration

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;
use crate::record::MessageId;

pub const DEFAULT_BAUD_RATE: u32 = 38400;
pub const DEFAULT_OPEN_RETRIES: u32 = 10;
pub const DEFAULT_HISTORY_LEN: usize = 300;

/// Where the byte stream comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Recorded file, finite and seekable
    File,
    /// Live receiver on a serial device
    Serial,
}

impl SourceKind {
    pub fn is_live(&self) -> bool {
        matches!(self, SourceKind::Serial)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::File => write!(f, "file"),
            SourceKind::Serial => write!(f, "serial"),
        }
    }
}

/// Immutable settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    pub source_kind: SourceKind,
    pub path_or_device: String,
    /// Delay per navigation epoch during file replay, 0 disables pacing
    pub wait_seconds: f64,
    pub baud_rate: u32,
    /// Serial open attempts, one second apart
    pub open_retries: u32,
    /// Samples kept per plot channel
    pub history_len: usize,
    /// Message that starts a new navigation epoch
    pub epoch_marker: MessageId,
}

impl PlaybackConfig {
    pub fn new(source_kind: SourceKind, path_or_device: impl Into<String>) -> Self {
        PlaybackConfig {
            source_kind,
            path_or_device: path_or_device.into(),
            wait_seconds: 0.0,
            baud_rate: DEFAULT_BAUD_RATE,
            open_retries: DEFAULT_OPEN_RETRIES,
            history_len: DEFAULT_HISTORY_LEN,
            epoch_marker: MessageId::NAV_PVT,
        }
    }

    pub fn with_wait_seconds(mut self, wait_seconds: f64) -> Self {
        self.wait_seconds = wait_seconds;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.wait_seconds.is_finite() || self.wait_seconds < 0.0 {
            return Err(ConfigError::InvalidWait(self.wait_seconds));
        }
        if self.path_or_device.trim().is_empty() {
            return Err(ConfigError::EmptyPath);
        }
        if self.history_len == 0 {
            return Err(ConfigError::InvalidHistoryLen);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::InvalidBaudRate);
        }
        Ok(())
    }

    /// Epoch delay, only meaningful after [`validate`](Self::validate)
    pub fn wait(&self) -> Duration {
        Duration::try_from_secs_f64(self.wait_seconds).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlaybackConfig::new(SourceKind::File, "capture.ubx");
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.wait(), Duration::ZERO);
        assert_eq!(config.epoch_marker, MessageId::NAV_PVT);
        assert_eq!(config.baud_rate, 38400);
    }

    #[test]
    fn test_invalid_wait() {
        for wait in [-0.5, f64::NAN, f64::INFINITY] {
            let config = PlaybackConfig::new(SourceKind::File, "a.ubx").with_wait_seconds(wait);
            assert!(matches!(config.validate(), Err(ConfigError::InvalidWait(_))));
        }
    }

    #[test]
    fn test_empty_path() {
        let config = PlaybackConfig::new(SourceKind::Serial, "  ");
        assert_eq!(config.validate(), Err(ConfigError::EmptyPath));
    }

    #[test]
    fn test_zero_history() {
        let mut config = PlaybackConfig::new(SourceKind::File, "a.ubx");
        config.history_len = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidHistoryLen));
    }

    #[test]
    fn test_fractional_wait() {
        let config = PlaybackConfig::new(SourceKind::File, "a.ubx").with_wait_seconds(0.25);
        assert_eq!(config.wait(), Duration::from_millis(250));
    }
}
