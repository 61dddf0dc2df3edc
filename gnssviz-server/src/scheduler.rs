//! Playback Scheduler
//!
//! Single task that reads frames, decodes them, applies epoch pacing and
//! dispatches the records. Runs until end of stream, cancellation or a
//! source failure, and closes the source on every exit path.

use chrono::Utc;
use gnssviz_core::{
    DecodeSkip, EpochPacer, PacingPolicy, PipelineError, PlaybackConfig, RawFrame,
    RecordDecoder, RecordDispatcher, RunStats, UbxDecoder,
};
use log::{debug, error, info, trace, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::source::SourceReader;
use crate::status::{RunState, StatusSender};

/// Requests from the rendering side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Restart a file replay from the beginning
    Rewind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    EndOfStream,
    Cancelled,
}

enum Step {
    Cancelled,
    Control(Control),
    Frame(Result<Option<RawFrame>, PipelineError>),
}

pub struct PlaybackScheduler {
    reader: SourceReader,
    decoder: Box<dyn RecordDecoder>,
    pacer: EpochPacer,
    dispatcher: RecordDispatcher,
    stats: RunStats,
    status: StatusSender,
}

impl PlaybackScheduler {
    /// The decoder only keeps messages that some consumer asked for
    pub fn new(
        config: &PlaybackConfig,
        reader: SourceReader,
        dispatcher: RecordDispatcher,
        status: StatusSender,
    ) -> Self {
        let decoder = match dispatcher.interests() {
            Some(wanted) => UbxDecoder::with_filter(wanted),
            None => UbxDecoder::new(),
        };
        let policy = PacingPolicy::new(config);
        if policy.is_paced() {
            info!("Pacing {} by {:?} per {}", reader.name(), policy.wait, policy.epoch_marker);
        }
        PlaybackScheduler {
            reader,
            decoder: Box::new(decoder),
            pacer: EpochPacer::new(policy),
            dispatcher,
            stats: RunStats::default(),
            status,
        }
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn is_source_open(&self) -> bool {
        self.reader.is_open()
    }

    /// Hand the consumers back for a later run
    pub fn into_dispatcher(self) -> RecordDispatcher {
        self.dispatcher
    }

    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
        control: &mut mpsc::Receiver<Control>,
    ) -> Result<RunOutcome, PipelineError> {
        self.status.send_modify(|s| {
            s.state = RunState::Running;
            s.error = None;
            s.stats = RunStats::default();
            s.started_at = Some(Utc::now());
            s.runs += 1;
        });

        let result = self.pump(cancel, control).await;
        self.reader.close();

        let stats = self.stats;
        match &result {
            Ok(RunOutcome::EndOfStream) => {
                info!("End of stream after {} records", stats.records);
                self.status.send_modify(|s| {
                    s.state = RunState::Finished;
                    s.stats = stats;
                });
            }
            Ok(RunOutcome::Cancelled) => {
                info!("Ingestion cancelled after {} records", stats.records);
                self.status.send_modify(|s| {
                    s.state = RunState::Cancelled;
                    s.stats = stats;
                });
            }
            Err(e) => {
                error!("Ingestion failed: {}", e);
                let message = e.to_string();
                self.status.send_modify(|s| {
                    s.state = RunState::Failed;
                    s.error = Some(message);
                    s.stats = stats;
                });
            }
        }
        result
    }

    async fn pump(
        &mut self,
        cancel: &CancellationToken,
        control: &mut mpsc::Receiver<Control>,
    ) -> Result<RunOutcome, PipelineError> {
        loop {
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                Some(cmd) = control.recv() => Step::Control(cmd),
                frame = self.reader.read_next_frame() => Step::Frame(frame),
            };

            let frame = match step {
                Step::Cancelled => return Ok(RunOutcome::Cancelled),
                Step::Control(cmd) => {
                    self.handle_control(cmd).await?;
                    continue;
                }
                Step::Frame(frame) => match frame? {
                    Some(frame) => frame,
                    None => return Ok(RunOutcome::EndOfStream),
                },
            };
            self.stats.frames += 1;

            let record = match self.decoder.decode(&frame) {
                Ok(record) => record,
                Err(DecodeSkip::Filtered(id)) => {
                    trace!("Skipping {}", id);
                    self.stats.filtered += 1;
                    self.publish_stats();
                    continue;
                }
                Err(skip) => {
                    warn!("Skipping frame: {}", skip);
                    self.stats.decode_skips += 1;
                    self.publish_stats();
                    continue;
                }
            };

            if let Some(delay) = self.pacer.delay_before(record.id) {
                debug!("Epoch delay {:?} before {} #{}", delay, record.id, record.seq);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(RunOutcome::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let report = self.dispatcher.dispatch(&record);
            self.stats.record_dispatch(report);
            self.stats.epochs = self.pacer.epochs();
            self.publish_stats();
        }
    }

    fn publish_stats(&mut self) {
        self.stats.discarded_bytes = self.reader.discarded_bytes();
        let stats = self.stats;
        self.status.send_modify(|s| s.stats = stats);
    }

    async fn handle_control(&mut self, cmd: Control) -> Result<(), PipelineError> {
        match cmd {
            Control::Rewind => match self.reader.rewind().await {
                Ok(()) => {
                    self.pacer.reset();
                    Ok(())
                }
                Err(PipelineError::RewindUnsupported(name)) => {
                    warn!("Ignoring rewind request, {} cannot be rewound", name);
                    Ok(())
                }
                Err(e) => Err(e),
            },
        }
    }
}
