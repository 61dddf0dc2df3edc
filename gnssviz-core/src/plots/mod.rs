//! Plot State Store
//!
//! Each plot owns its histories outright and is mutated only through
//! [`PlotState::update`], called from the dispatcher. Rendering reads
//! immutable [`PlotSnapshot`]s.

use serde::Serialize;

use crate::error::{ConfigError, ConsumerError};
use crate::record::{DecodedRecord, MessageId};

pub mod position;
pub mod quality;
pub mod signal;

pub use position::{MapView, PositionMapPlot, PositionMapSnapshot};
pub use quality::{NavQualityPlot, NavQualitySnapshot};
pub use signal::{SignalStrengthPlot, SignalStrengthSnapshot};

/// Serializable read-only view of a plot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlotSnapshot {
    PositionMap(PositionMapSnapshot),
    SignalStrength(SignalStrengthSnapshot),
    NavQuality(NavQualitySnapshot),
}

pub trait PlotState: Send {
    /// Stable identifier used in URLs
    fn id(&self) -> &'static str;

    /// Human readable title
    fn title(&self) -> &'static str;

    /// Messages required to draw this plot
    fn messages(&self) -> &[MessageId];

    fn update(&mut self, record: &DecodedRecord) -> Result<(), ConsumerError>;

    fn snapshot(&self) -> PlotSnapshot;
}

/// Every plot the visualizer offers, each keeping `history_len` samples per channel
pub fn default_plots(history_len: usize) -> Vec<Box<dyn PlotState>> {
    vec![
        Box::new(PositionMapPlot::new(history_len)),
        Box::new(SignalStrengthPlot::new(history_len)),
        Box::new(NavQualityPlot::new(history_len)),
    ]
}

/// The plots named in `ids`, in the order given. No ids selects every plot.
///
/// The selection decides which messages get decoded at all, since the
/// decoder filter is built from what the registered plots consume.
pub fn select_plots<S: AsRef<str>>(
    ids: &[S],
    history_len: usize,
) -> Result<Vec<Box<dyn PlotState>>, ConfigError> {
    if ids.is_empty() {
        return Ok(default_plots(history_len));
    }
    let mut available = default_plots(history_len);
    let mut selected: Vec<Box<dyn PlotState>> = Vec::with_capacity(ids.len());
    for id in ids {
        let id = id.as_ref();
        match available.iter().position(|p| p.id() == id) {
            Some(i) => selected.push(available.remove(i)),
            None if selected.iter().any(|p| p.id() == id) => {}
            None => return Err(ConfigError::UnknownPlot(id.to_string())),
        }
    }
    Ok(selected)
}
