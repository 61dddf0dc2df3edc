use gnssviz_core::{PipelineError, PlaybackConfig, RecordDispatcher};
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio_graceful_shutdown::SubsystemHandle;
use tokio_util::sync::CancellationToken;

use crate::scheduler::{Control, PlaybackScheduler, RunOutcome};
use crate::source::SourceReader;
use crate::status::{RunState, StatusSender};

/// Ingestion subsystem: runs the scheduler, then waits for a rewind or
/// shutdown once the stream has ended.
pub struct Ingestion {
    config: PlaybackConfig,
    reader: SourceReader,
    dispatcher: RecordDispatcher,
    status: StatusSender,
    control: mpsc::Receiver<Control>,
    exit_on_eof: bool,
}

impl Ingestion {
    pub fn new(
        config: PlaybackConfig,
        reader: SourceReader,
        dispatcher: RecordDispatcher,
        status: StatusSender,
        control: mpsc::Receiver<Control>,
    ) -> Self {
        Ingestion {
            config,
            reader,
            dispatcher,
            status,
            control,
            exit_on_eof: false,
        }
    }

    /// Request a process shutdown as soon as the stream ends
    pub fn exit_on_eof(mut self, exit_on_eof: bool) -> Self {
        self.exit_on_eof = exit_on_eof;
        self
    }

    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), PipelineError> {
        let Ingestion {
            config,
            mut reader,
            mut dispatcher,
            status,
            mut control,
            exit_on_eof,
        } = self;
        let cancel = subsys.create_cancellation_token();

        loop {
            let mut scheduler = PlaybackScheduler::new(&config, reader, dispatcher, status.clone());
            let result = scheduler.run(&cancel, &mut control).await;
            dispatcher = scheduler.into_dispatcher();

            let mut failure = match result {
                Ok(RunOutcome::Cancelled) => return Ok(()),
                Ok(RunOutcome::EndOfStream) => None,
                Err(e) => Some(e),
            };

            if exit_on_eof {
                info!("Stream ended, shutting down");
                subsys.request_shutdown();
                return failure.map_or(Ok(()), Err);
            }

            match wait_for_rewind(&config, &cancel, &mut control, &status, &mut failure).await {
                Some(next) => reader = next,
                None => return failure.map_or(Ok(()), Err),
            }
        }
    }
}

/// Keep the last state on display until a rewind reopens the file or the
/// process shuts down.
async fn wait_for_rewind(
    config: &PlaybackConfig,
    cancel: &CancellationToken,
    control: &mut mpsc::Receiver<Control>,
    status: &StatusSender,
    failure: &mut Option<PipelineError>,
) -> Option<SourceReader> {
    loop {
        let cmd = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            cmd = control.recv() => cmd,
        };
        match cmd {
            Some(Control::Rewind) if config.source_kind.is_live() => {
                warn!("Ignoring rewind request for live source {}", config.path_or_device);
            }
            Some(Control::Rewind) => match SourceReader::open(config).await {
                Ok(reader) => {
                    info!("Restarting replay of {}", config.path_or_device);
                    *failure = None;
                    return Some(reader);
                }
                Err(e) => {
                    error!("Cannot reopen {}: {}", config.path_or_device, e);
                    let message = e.to_string();
                    status.send_modify(|s| {
                        s.state = RunState::Failed;
                        s.error = Some(message);
                    });
                    *failure = Some(e);
                }
            },
            None => {
                cancel.cancelled().await;
                return None;
            }
        }
    }
}
