use std::collections::BTreeMap;

use serde::Serialize;

use super::{PlotSnapshot, PlotState};
use crate::error::ConsumerError;
use crate::history::{ChannelHistories, Sample};
use crate::record::{DecodedRecord, MessageId, RecordPayload};

pub const CHANNEL_NUM_SV: &str = "num_sv";
pub const CHANNEL_H_ACC: &str = "h_acc_m";
pub const CHANNEL_GROUND_SPEED: &str = "ground_speed_mps";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavQualitySnapshot {
    pub channels: BTreeMap<String, Vec<Sample>>,
}

/// Satellites used, horizontal accuracy and ground speed over time
pub struct NavQualityPlot {
    channels: ChannelHistories,
}

impl NavQualityPlot {
    pub fn new(history_len: usize) -> Self {
        NavQualityPlot {
            channels: ChannelHistories::new(history_len),
        }
    }
}

impl PlotState for NavQualityPlot {
    fn id(&self) -> &'static str {
        "nav_quality"
    }

    fn title(&self) -> &'static str {
        "Navigation quality"
    }

    fn messages(&self) -> &[MessageId] {
        &[MessageId::NAV_PVT]
    }

    fn update(&mut self, record: &DecodedRecord) -> Result<(), ConsumerError> {
        let RecordPayload::NavPvt(sol) = &record.payload else {
            return Err(ConsumerError::UnexpectedRecord(record.id));
        };
        let t = f64::from(sol.itow_ms) / 1000.0;
        self.channels.push(CHANNEL_NUM_SV, Sample::new(t, f64::from(sol.num_sv)));
        self.channels.push(CHANNEL_H_ACC, Sample::new(t, sol.h_acc_m));
        self.channels
            .push(CHANNEL_GROUND_SPEED, Sample::new(t, sol.ground_speed_mps));
        Ok(())
    }

    fn snapshot(&self) -> PlotSnapshot {
        PlotSnapshot::NavQuality(NavQualitySnapshot {
            channels: self.channels.snapshot(),
        })
    }
}
