//! Source Reader
//!
//! Presents a recorded file and a live serial receiver as the same sequence
//! of raw frames. The reader owns its handle exclusively and closes it
//! exactly once.

use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use gnssviz_core::{PipelineError, PlaybackConfig, RawFrame, SourceKind};
use log::{debug, info, warn};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt};
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::FramedRead;

use crate::codec::UbxFrameCodec;

const SERIAL_TIMEOUT: Duration = Duration::from_secs(3);
const OPEN_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// `File` when `path` is a regular file, `Serial` otherwise
pub fn detect_kind(path: &str) -> SourceKind {
    if Path::new(path).is_file() {
        SourceKind::File
    } else {
        SourceKind::Serial
    }
}

pub enum SourceHandle {
    /// Seekable file cursor
    File(FramedRead<File, UbxFrameCodec>),
    /// Anything that can only be read forward (serial port, pipe, test stream)
    Stream(FramedRead<Box<dyn AsyncRead + Send + Unpin>, UbxFrameCodec>),
}

impl SourceHandle {
    fn codec(&self) -> &UbxFrameCodec {
        match self {
            SourceHandle::File(f) => f.decoder(),
            SourceHandle::Stream(s) => s.decoder(),
        }
    }
}

pub struct SourceReader {
    kind: SourceKind,
    name: String,
    handle: Option<SourceHandle>,
    /// Bytes discarded by handles that have been replaced or closed
    discarded: u64,
}

impl SourceReader {
    pub async fn open(config: &PlaybackConfig) -> Result<SourceReader, PipelineError> {
        let path = config.path_or_device.as_str();
        let handle = match config.source_kind {
            SourceKind::File => {
                let file = File::open(path)
                    .await
                    .map_err(|e| PipelineError::SourceUnavailable {
                        path: path.to_string(),
                        reason: e.to_string(),
                    })?;
                info!("Replaying UBX file {}", path);
                SourceHandle::File(FramedRead::new(file, UbxFrameCodec::new()))
            }
            SourceKind::Serial => {
                let port: Box<dyn AsyncRead + Send + Unpin> = Box::new(open_serial(config).await?);
                info!("Reading UBX from {} at {} baud", path, config.baud_rate);
                SourceHandle::Stream(FramedRead::new(port, UbxFrameCodec::new()))
            }
        };

        Ok(SourceReader {
            kind: config.source_kind,
            name: path.to_string(),
            handle: Some(handle),
            discarded: 0,
        })
    }

    /// Reader over an arbitrary forward-only byte stream
    pub fn from_stream(
        kind: SourceKind,
        name: impl Into<String>,
        stream: impl AsyncRead + Send + Unpin + 'static,
    ) -> SourceReader {
        let stream: Box<dyn AsyncRead + Send + Unpin> = Box::new(stream);
        SourceReader {
            kind,
            name: name.into(),
            handle: Some(SourceHandle::Stream(FramedRead::new(stream, UbxFrameCodec::new()))),
            discarded: 0,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn discarded_bytes(&self) -> u64 {
        self.discarded + self.handle.as_ref().map_or(0, |h| h.codec().discarded())
    }

    /// Next complete frame, or `None` at end of stream.
    ///
    /// Waits on live sources until a frame is complete. Cancel safe: bytes
    /// already read stay buffered for the next call.
    pub async fn read_next_frame(&mut self) -> Result<Option<RawFrame>, PipelineError> {
        let next = match self.handle.as_mut() {
            Some(SourceHandle::File(f)) => f.next().await,
            Some(SourceHandle::Stream(s)) => s.next().await,
            None => return Ok(None),
        };
        match next {
            Some(Ok(frame)) => {
                debug!("Read {} byte frame from {}", frame.len(), self.name);
                Ok(Some(frame))
            }
            Some(Err(e)) => Err(PipelineError::SourceFailure(e)),
            None => Ok(None),
        }
    }

    /// Restart a file source from its first byte
    pub async fn rewind(&mut self) -> Result<(), PipelineError> {
        match self.handle.take() {
            Some(SourceHandle::File(framed)) => {
                self.discarded += framed.decoder().discarded();
                let mut file = framed.into_inner();
                file.seek(SeekFrom::Start(0)).await?;
                self.handle = Some(SourceHandle::File(FramedRead::new(file, UbxFrameCodec::new())));
                info!("Rewound {}", self.name);
                Ok(())
            }
            other => {
                self.handle = other;
                Err(PipelineError::RewindUnsupported(self.name.clone()))
            }
        }
    }

    /// Release the handle. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                self.discarded += handle.codec().discarded();
                info!("Closed {} source {}", self.kind, self.name);
                true
            }
            None => false,
        }
    }
}

async fn open_serial(config: &PlaybackConfig) -> Result<tokio_serial::SerialStream, PipelineError> {
    let attempts = config.open_retries.max(1);
    let mut attempt = 1;
    loop {
        match tokio_serial::new(&config.path_or_device, config.baud_rate)
            .timeout(SERIAL_TIMEOUT)
            .open_native_async()
        {
            Ok(port) => return Ok(port),
            Err(e) if attempt < attempts => {
                warn!(
                    "Cannot open {} (attempt {}/{}): {}",
                    config.path_or_device, attempt, attempts, e
                );
                attempt += 1;
                tokio::time::sleep(OPEN_RETRY_INTERVAL).await;
            }
            Err(e) => {
                return Err(PipelineError::SourceUnavailable {
                    path: config.path_or_device.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnssviz_core::framer::encode;
    use std::io::Write;

    #[test]
    fn test_detect_kind() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(detect_kind(file.path().to_str().unwrap()), SourceKind::File);
        assert_eq!(detect_kind("/dev/does-not-exist-gnssviz"), SourceKind::Serial);
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let config = PlaybackConfig::new(SourceKind::File, "/nonexistent/capture.ubx");
        let result = SourceReader::open(&config).await;
        assert!(matches!(result, Err(PipelineError::SourceUnavailable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_serial_device_is_unavailable_after_retries() {
        let mut config = PlaybackConfig::new(SourceKind::Serial, "/dev/does-not-exist-gnssviz");
        config.open_retries = 3;
        let started = tokio::time::Instant::now();
        let result = SourceReader::open(&config).await;
        assert!(matches!(result, Err(PipelineError::SourceUnavailable { .. })));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_file_frames_then_end_of_stream() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encode(0x01, 0x07, &[1])).unwrap();
        file.write_all(&[0xAA, 0xBB]).unwrap();
        file.write_all(&encode(0x01, 0x35, &[2])).unwrap();
        file.flush().unwrap();

        let config = PlaybackConfig::new(SourceKind::File, file.path().to_str().unwrap());
        let mut reader = SourceReader::open(&config).await.unwrap();

        let ids: Vec<_> = [
            reader.read_next_frame().await.unwrap(),
            reader.read_next_frame().await.unwrap(),
        ]
        .into_iter()
        .map(|f| f.unwrap().message_id().unwrap().id)
        .collect();
        assert_eq!(ids, vec![0x07, 0x35]);
        assert!(reader.read_next_frame().await.unwrap().is_none());
        assert_eq!(reader.discarded_bytes(), 2);
    }

    #[tokio::test]
    async fn test_rewind_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encode(0x01, 0x07, &[1])).unwrap();
        file.flush().unwrap();

        let config = PlaybackConfig::new(SourceKind::File, file.path().to_str().unwrap());
        let mut reader = SourceReader::open(&config).await.unwrap();
        assert!(reader.read_next_frame().await.unwrap().is_some());
        assert!(reader.read_next_frame().await.unwrap().is_none());

        reader.rewind().await.unwrap();
        assert!(reader.read_next_frame().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stream_cannot_rewind() {
        let (_device, host) = tokio::io::duplex(64);
        let mut reader = SourceReader::from_stream(SourceKind::Serial, "duplex", host);
        assert!(matches!(
            reader.rewind().await,
            Err(PipelineError::RewindUnsupported(_))
        ));
        assert!(reader.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (_device, host) = tokio::io::duplex(64);
        let mut reader = SourceReader::from_stream(SourceKind::Serial, "duplex", host);

        assert!(reader.close());
        assert!(!reader.close());
        assert!(!reader.is_open());
        assert!(reader.read_next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_live_stream_ends_when_device_closes() {
        use tokio::io::AsyncWriteExt;

        let (mut device, host) = tokio::io::duplex(256);
        let mut reader = SourceReader::from_stream(SourceKind::Serial, "duplex", host);

        device.write_all(&encode(0x01, 0x07, &[9])).await.unwrap();
        assert!(reader.read_next_frame().await.unwrap().is_some());

        drop(device);
        assert!(reader.read_next_frame().await.unwrap().is_none());
    }
}
