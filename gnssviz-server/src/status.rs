use chrono::{DateTime, Utc};
use gnssviz_core::{PlaybackConfig, RunStats, SourceKind};
use serde::Serialize;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Starting,
    Running,
    Finished,
    Cancelled,
    Failed,
}

/// Pipeline state as shown to the rendering side
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub state: RunState,
    pub source: String,
    pub source_kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stats: RunStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Completed and current runs, incremented on every restart
    pub runs: u32,
}

pub type StatusSender = watch::Sender<PipelineStatus>;
pub type StatusReceiver = watch::Receiver<PipelineStatus>;

pub fn status_channel(config: &PlaybackConfig) -> (StatusSender, StatusReceiver) {
    watch::channel(PipelineStatus {
        state: RunState::Starting,
        source: config.path_or_device.clone(),
        source_kind: config.source_kind,
        error: None,
        stats: RunStats::default(),
        started_at: None,
        runs: 0,
    })
}
