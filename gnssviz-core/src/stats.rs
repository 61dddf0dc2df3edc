use serde::Serialize;

use crate::dispatch::DispatchReport;

/// Counters for a single run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub frames: u64,
    pub records: u64,
    pub decode_skips: u64,
    /// Frames no consumer asked for
    pub filtered: u64,
    pub consumer_errors: u64,
    pub epochs: u64,
    /// Bytes dropped while searching for a frame start
    pub discarded_bytes: u64,
}

impl RunStats {
    pub fn record_dispatch(&mut self, report: DispatchReport) {
        self.records += 1;
        self.consumer_errors += report.failed as u64;
    }
}
