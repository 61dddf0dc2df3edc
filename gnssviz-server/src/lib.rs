//! # GNSS Viz Server
//!
//! Replays recorded u-blox UBX captures, or reads a live receiver over a
//! serial port, and serves the resulting plot state over HTTP and WebSocket.
//!
//! ## Architecture
//!
//! The server is built on top of [`gnssviz_core`] for the pipeline logic,
//! with [`tokio`] providing the async runtime.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     gnssviz-server                       │
//! │  ┌──────────────┐   ┌──────────────────┐                 │
//! │  │ SourceReader │──►│ PlaybackScheduler│  Ingestion      │
//! │  │ file/serial  │   │ decode, pace,    │  subsystem      │
//! │  └──────────────┘   │ dispatch         │                 │
//! │                     └────────┬─────────┘                 │
//! │                              ▼                           │
//! │                 PublishedPlot (watch::Sender)            │
//! │                              │                           │
//! │                              ▼                           │
//! │  ┌──────────────────────────────────────────────────┐    │
//! │  │ REST API + WebSocket (axum)          Web         │    │
//! │  └──────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## REST API
//!
//! | Endpoint | Description |
//! |----------|-------------|
//! | `GET /v1/api/status` | Pipeline state and run counters |
//! | `GET /v1/api/plots` | List of plots |
//! | `GET /v1/api/plots/{plot_id}` | Latest snapshot of one plot |
//! | `WS /v1/api/plots/{plot_id}/stream` | Snapshot stream |
//! | `POST /v1/api/playback/rewind` | Restart a file replay |
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Key options:
//!
//! - `-w, --default-simulate-wait-s` - Seconds to wait per epoch during file replay
//! - `--plots` - Comma separated plot ids to show (default: all)
//! - `-p, --port` - HTTP server port (default: 5006)
//! - `-v` - Increase verbosity (use multiple times)

use clap::Parser;
use gnssviz_core::config::{DEFAULT_BAUD_RATE, DEFAULT_HISTORY_LEN, DEFAULT_OPEN_RETRIES};
use gnssviz_core::plots::select_plots;
use gnssviz_core::{ConfigError, MessageId, PlaybackConfig, PlotState, SourceKind};

pub mod codec;
pub mod ingest;
pub mod plots;
pub mod scheduler;
pub mod source;
pub mod status;
pub mod web;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceChoice {
    /// Regular files are replayed, anything else is opened as a serial port
    #[default]
    Auto,
    File,
    Serial,
}

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// UBX capture file or serial device
    pub input: String,

    /// Seconds to wait per navigation epoch when replaying a file
    #[arg(short = 'w', long, default_value_t = 0.0)]
    pub default_simulate_wait_s: f64,

    /// How to open the input
    #[arg(long, default_value_t, value_enum)]
    pub source: SourceChoice,

    /// Serial port baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    /// Attempts to open a serial port before giving up
    #[arg(long, default_value_t = DEFAULT_OPEN_RETRIES)]
    pub open_retries: u32,

    /// Message that starts a navigation epoch, e.g. NAV-PVT or 01-07
    #[arg(long, default_value = "NAV-PVT")]
    pub epoch_message: MessageId,

    /// Samples kept per plot channel
    #[arg(long, default_value_t = DEFAULT_HISTORY_LEN)]
    pub history_len: usize,

    /// Plots to show, e.g. position_map,signal_strength. Defaults to all.
    #[arg(long, value_delimiter = ',')]
    pub plots: Vec<String>,

    /// Port for webserver
    #[arg(short, long, default_value_t = 5006)]
    pub port: u16,

    /// Stop when the input ends instead of serving the last state
    #[arg(long, default_value_t = false)]
    pub exit_on_eof: bool,
}

impl Cli {
    pub fn source_kind(&self) -> SourceKind {
        match self.source {
            SourceChoice::Auto => source::detect_kind(&self.input),
            SourceChoice::File => SourceKind::File,
            SourceChoice::Serial => SourceKind::Serial,
        }
    }

    /// Unvalidated configuration, see [`PlaybackConfig::validate`]
    pub fn playback_config(&self) -> PlaybackConfig {
        let mut config = PlaybackConfig::new(self.source_kind(), self.input.clone())
            .with_wait_seconds(self.default_simulate_wait_s);
        config.baud_rate = self.baud_rate;
        config.open_retries = self.open_retries;
        config.history_len = self.history_len;
        config.epoch_marker = self.epoch_message;
        config
    }

    /// The selected plots; unselected plots' messages are never decoded
    pub fn plot_states(&self) -> Result<Vec<Box<dyn PlotState>>, ConfigError> {
        select_plots(&self.plots, self.history_len)
    }
}
