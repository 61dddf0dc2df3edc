//! Position map
//!
//! Latest fix and track in Web Mercator meters, plus a suggested view
//! centred on the latest fix and scaled to its horizontal accuracy.

use log::warn;
use serde::Serialize;

use super::{PlotSnapshot, PlotState};
use crate::conversions::lat_lon_to_web_mercator;
use crate::error::ConsumerError;
use crate::history::History;
use crate::record::{DecodedRecord, FixType, MessageId, RecordPayload};

/// View height over width, used when no figure size is known
const MAP_ASPECT_RATIO: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    /// GPS time of week in seconds
    pub t: f64,
    pub lat: f64,
    pub lon: f64,
    pub height_m: f64,
    pub h_acc_m: f64,
    pub fix_type: FixType,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackPoint {
    pub t: f64,
    pub x: f64,
    pub y: f64,
}

/// Suggested map extent in Web Mercator meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub center_x: f64,
    pub center_y: f64,
    pub half_width: f64,
    pub half_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionMapSnapshot {
    pub latest: Option<PositionFix>,
    pub track: Vec<TrackPoint>,
    pub view: Option<MapView>,
}

/// Half width of the view for a given horizontal accuracy.
///
/// Coarse fixes snap to fixed zoom levels. Good fixes keep the previous
/// width so the map does not jitter.
pub fn map_half_width(h_acc_m: f64, previous: Option<f64>) -> f64 {
    match previous {
        _ if h_acc_m > 10_000.0 => 10_000.0e3,
        _ if h_acc_m > 1_000.0 => 100.0e3,
        _ if h_acc_m > 100.0 => 10.0e3,
        Some(previous) if h_acc_m <= 25.0 => previous,
        _ => h_acc_m * 5.0,
    }
}

pub struct PositionMapPlot {
    latest: Option<PositionFix>,
    track: History<TrackPoint>,
    view: Option<MapView>,
}

impl PositionMapPlot {
    pub fn new(history_len: usize) -> Self {
        PositionMapPlot {
            latest: None,
            track: History::new(history_len),
            view: None,
        }
    }
}

impl PlotState for PositionMapPlot {
    fn id(&self) -> &'static str {
        "position_map"
    }

    fn title(&self) -> &'static str {
        "Position"
    }

    fn messages(&self) -> &[MessageId] {
        &[MessageId::NAV_PVT]
    }

    fn update(&mut self, record: &DecodedRecord) -> Result<(), ConsumerError> {
        let sol = match &record.payload {
            RecordPayload::NavPvt(sol) => sol,
            _ => return Err(ConsumerError::UnexpectedRecord(record.id)),
        };
        if !sol.fix_type.has_position() {
            return Ok(());
        }

        let (x, y) = lat_lon_to_web_mercator(sol.lat_deg, sol.lon_deg);
        if !x.is_finite() || !y.is_finite() {
            warn!("Ignoring position {}, {} outside projection", sol.lat_deg, sol.lon_deg);
            return Ok(());
        }

        let t = f64::from(sol.itow_ms) / 1000.0;
        let half_width = map_half_width(sol.h_acc_m, self.view.map(|v| v.half_width));
        self.view = Some(MapView {
            center_x: x,
            center_y: y,
            half_width,
            half_height: half_width * MAP_ASPECT_RATIO,
        });
        self.track.push(TrackPoint { t, x, y });
        self.latest = Some(PositionFix {
            t,
            lat: sol.lat_deg,
            lon: sol.lon_deg,
            height_m: sol.height_m,
            h_acc_m: sol.h_acc_m,
            fix_type: sol.fix_type,
            x,
            y,
        });
        Ok(())
    }

    fn snapshot(&self) -> PlotSnapshot {
        PlotSnapshot::PositionMap(PositionMapSnapshot {
            latest: self.latest.clone(),
            track: self.track.to_vec(),
            view: self.view,
        })
    }
}
