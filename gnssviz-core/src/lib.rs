//! # gnssviz Core
//!
//! Platform-independent record pipeline for u-blox UBX receiver data.
//!
//! This crate contains framing, decoding, pacing, dispatch and plot state
//! logic with **zero I/O dependencies**. The tokio based reader, scheduler
//! loop and web surface live in `gnssviz-server`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  gnssviz-core (no tokio/async deps)                          │
//! │  ├── framer      (UBX envelope boundary scan)                │
//! │  ├── decoder     (ublox::Parser → DecodedRecord)             │
//! │  ├── pacing      (epoch delay policy for file replay)        │
//! │  ├── dispatch    (ordered fan-out with consumer isolation)   │
//! │  └── plots       (bounded histories + snapshots)             │
//! └──────────────────────────────────────────────────────────────┘
//!                 ▲
//!    ┌────────────┴────────────┐
//!    │  gnssviz-server         │
//!    │  (file/serial, axum)    │
//!    └─────────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`framer`] - Frame boundary detection and frame encoding
//! - [`decoder`] - Adapter around the `ublox` crate parser
//! - [`pacing`] - When to sleep during file replay
//! - [`dispatch`] - [`RecordDispatcher`] and the [`Consumer`] trait
//! - [`plots`] - Plot states fed by the dispatcher
//! - [`history`] - Bounded FIFO sample buffers

pub mod config;
pub mod conversions;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod framer;
pub mod history;
pub mod pacing;
pub mod plots;
pub mod record;
pub mod stats;

pub use config::{PlaybackConfig, SourceKind};
pub use decoder::{RecordDecoder, UbxDecoder};
pub use dispatch::{Consumer, DispatchReport, RecordDispatcher};
pub use error::{ConfigError, ConsumerError, DecodeSkip, PipelineError};
pub use frame::RawFrame;
pub use pacing::{EpochPacer, PacingPolicy};
pub use plots::{PlotSnapshot, PlotState};
pub use record::{Constellation, DecodedRecord, FixType, MessageId, RecordPayload};
pub use stats::RunStats;
