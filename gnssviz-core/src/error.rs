//! Error types for the record pipeline

use std::io;

use thiserror::Error;

use crate::record::MessageId;

/// Source level failures. Only these end a run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The file or device could not be opened
    #[error("Source {path} unavailable: {reason}")]
    SourceUnavailable { path: String, reason: String },

    /// I/O fault after the source was opened
    #[error("Source failure: {0}")]
    SourceFailure(#[from] io::Error),

    /// Rewind was requested on a source that cannot seek
    #[error("Source {0} cannot be rewound")]
    RewindUnsupported(String),
}

/// Reasons a single frame did not produce a record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeSkip {
    /// External decoder rejected the frame (checksum, length, layout)
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// Decoder consumed the frame without producing a message
    #[error("Frame produced no message")]
    Empty,

    /// Message is valid but no consumer asked for it
    #[error("{0} not requested by any consumer")]
    Filtered(MessageId),
}

/// Errors reported by a dispatcher consumer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConsumerError {
    /// Consumer received a record kind it cannot handle
    #[error("Unexpected record {0}")]
    UnexpectedRecord(MessageId),

    /// Consumer panicked while handling a record
    #[error("Consumer panicked: {0}")]
    Panicked(String),

    /// Consumer specific failure
    #[error("{0}")]
    Failed(String),
}

/// Invalid playback configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Wait time must be a non-negative finite number of seconds, got {0}")]
    InvalidWait(f64),

    #[error("No input file or device given")]
    EmptyPath,

    #[error("History length must be at least 1")]
    InvalidHistoryLen,

    #[error("Baud rate must be greater than 0")]
    InvalidBaudRate,

    #[error("Unknown UBX message identifier '{0}'")]
    UnknownMessage(String),

    #[error("Unknown plot '{0}'")]
    UnknownPlot(String),
}
