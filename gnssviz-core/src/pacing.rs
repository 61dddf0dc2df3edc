//! Epoch pacing for file replay
//!
//! File replay is slowed to roughly real time by sleeping once per
//! navigation epoch. An epoch starts at each epoch marker record (NAV-PVT by
//! default). The delay owed for an epoch is paid just before the next
//! marker is dispatched, so all records of an epoch go out back to back and
//! nothing is paid after the last epoch of a file.

use std::time::Duration;

use crate::config::{PlaybackConfig, SourceKind};
use crate::record::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub wait: Duration,
    pub epoch_marker: MessageId,
    pub source_kind: SourceKind,
}

impl PacingPolicy {
    pub fn new(config: &PlaybackConfig) -> Self {
        PacingPolicy {
            wait: config.wait(),
            epoch_marker: config.epoch_marker,
            source_kind: config.source_kind,
        }
    }

    /// Live sources and a zero wait are never delayed
    pub fn is_paced(&self) -> bool {
        !self.source_kind.is_live() && !self.wait.is_zero()
    }
}

#[derive(Debug, Clone)]
pub struct EpochPacer {
    policy: PacingPolicy,
    epochs: u64,
}

impl EpochPacer {
    pub fn new(policy: PacingPolicy) -> Self {
        EpochPacer { policy, epochs: 0 }
    }

    /// Delay to apply before dispatching a record of kind `id`
    pub fn delay_before(&mut self, id: MessageId) -> Option<Duration> {
        if id != self.policy.epoch_marker {
            return None;
        }
        self.epochs += 1;
        if self.epochs > 1 && self.policy.is_paced() {
            Some(self.policy.wait)
        } else {
            None
        }
    }

    /// Epoch markers seen so far
    pub fn epochs(&self) -> u64 {
        self.epochs
    }

    /// Forget epoch history, used after a rewind
    pub fn reset(&mut self) {
        self.epochs = 0;
    }
}
