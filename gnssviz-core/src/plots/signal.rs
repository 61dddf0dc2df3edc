//! Signal strength per satellite

use std::collections::BTreeMap;

use serde::Serialize;

use super::{PlotSnapshot, PlotState};
use crate::error::ConsumerError;
use crate::history::{ChannelHistories, Sample};
use crate::record::{Constellation, DecodedRecord, MessageId, RecordPayload, SatelliteSignal};

/// C/N0 axis range in dBHz
pub const CNO_RANGE: (f64, f64) = (0.0, 64.0);

/// Display order key: constellation rank, then PRN
type SvKey = (u8, u8);

fn sv_key(sv: &SatelliteSignal) -> SvKey {
    (sv.constellation.display_rank(), sv.sv_id)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalBar {
    pub sv: String,
    pub constellation: Constellation,
    pub cno: u8,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalStrengthSnapshot {
    /// Time of week of the latest epoch
    pub t: Option<f64>,
    /// Strongest C/N0 per satellite in the latest epoch, in display order
    pub bars: Vec<SignalBar>,
    /// Every satellite seen so far, in display order
    pub satellites: Vec<String>,
    pub y_range: (f64, f64),
    pub history: BTreeMap<String, Vec<Sample>>,
}

pub struct SignalStrengthPlot {
    t: Option<f64>,
    bars: BTreeMap<SvKey, SignalBar>,
    seen: BTreeMap<SvKey, String>,
    history: ChannelHistories,
}

impl SignalStrengthPlot {
    pub fn new(history_len: usize) -> Self {
        SignalStrengthPlot {
            t: None,
            bars: BTreeMap::new(),
            seen: BTreeMap::new(),
            history: ChannelHistories::new(history_len),
        }
    }
}

impl PlotState for SignalStrengthPlot {
    fn id(&self) -> &'static str {
        "signal_strength"
    }

    fn title(&self) -> &'static str {
        "Signal strength (live)"
    }

    fn messages(&self) -> &[MessageId] {
        &[MessageId::NAV_SAT]
    }

    fn update(&mut self, record: &DecodedRecord) -> Result<(), ConsumerError> {
        let quality = match &record.payload {
            RecordPayload::SignalQuality(q) => q,
            _ => return Err(ConsumerError::UnexpectedRecord(record.id)),
        };
        let t = f64::from(quality.itow_ms) / 1000.0;

        let mut bars: BTreeMap<SvKey, SignalBar> = BTreeMap::new();
        for sv in quality.satellites.iter().filter(|sv| sv.cno_dbhz > 0) {
            let key = sv_key(sv);
            let stronger = bars.get(&key).map_or(true, |bar| sv.cno_dbhz > bar.cno);
            if stronger {
                bars.insert(
                    key,
                    SignalBar {
                        sv: sv.rinex_id(),
                        constellation: sv.constellation,
                        cno: sv.cno_dbhz,
                        color: sv.constellation.color(),
                    },
                );
            }
        }

        for (key, bar) in &bars {
            self.seen.entry(*key).or_insert_with(|| bar.sv.clone());
            self.history.push(&bar.sv, Sample::new(t, f64::from(bar.cno)));
        }
        self.bars = bars;
        self.t = Some(t);
        Ok(())
    }

    fn snapshot(&self) -> PlotSnapshot {
        PlotSnapshot::SignalStrength(SignalStrengthSnapshot {
            t: self.t,
            bars: self.bars.values().cloned().collect(),
            satellites: self.seen.values().cloned().collect(),
            y_range: CNO_RANGE,
            history: self.history.snapshot(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plots::tests::{nav_pvt, nav_sat};

    fn snapshot(plot: &SignalStrengthPlot) -> SignalStrengthSnapshot {
        match plot.snapshot() {
            PlotSnapshot::SignalStrength(s) => s,
            other => panic!("unexpected snapshot {:?}", other),
        }
    }

    #[test]
    fn test_bars_sorted_by_constellation_then_prn() {
        let mut plot = SignalStrengthPlot::new(10);
        // R3, J1, G20, E7, C11, S131, G2
        let svs = [(6, 3, 30), (5, 1, 31), (0, 20, 32), (2, 7, 33), (3, 11, 34), (1, 131, 35), (0, 2, 36)];
        plot.update(&nav_sat(0, 1000, &svs)).unwrap();

        let s = snapshot(&plot);
        let order: Vec<&str> = s.bars.iter().map(|b| b.sv.as_str()).collect();
        assert_eq!(order, vec!["G2", "G20", "E7", "C11", "R3", "S131", "J1"]);
        assert_eq!(s.bars[0].color, "#2ca02c");
        assert_eq!(s.t, Some(1.0));
        assert_eq!(s.y_range, (0.0, 64.0));
    }

    #[test]
    fn test_strongest_signal_wins_and_zero_is_ignored() {
        let mut plot = SignalStrengthPlot::new(10);
        plot.update(&nav_sat(0, 0, &[(0, 5, 30), (0, 5, 42), (0, 5, 38), (2, 1, 0)]))
            .unwrap();

        let s = snapshot(&plot);
        assert_eq!(s.bars.len(), 1);
        assert_eq!(s.bars[0].cno, 42);
        assert_eq!(s.satellites, vec!["G5"]);
    }

    #[test]
    fn test_seen_satellites_persist_across_epochs() {
        let mut plot = SignalStrengthPlot::new(2);
        plot.update(&nav_sat(0, 0, &[(0, 1, 40)])).unwrap();
        for i in 1..4u32 {
            plot.update(&nav_sat(u64::from(i), i * 1000, &[(2, 3, 35)])).unwrap();
        }

        let s = snapshot(&plot);
        assert_eq!(s.bars.len(), 1);
        assert_eq!(s.satellites, vec!["G1", "E3"]);
        assert_eq!(s.history["E3"].len(), 2);
        assert_eq!(s.history["E3"][0].t, 2.0);
        assert_eq!(s.history["G1"].len(), 1);
    }

    #[test]
    fn test_wrong_record_is_an_error() {
        let mut plot = SignalStrengthPlot::new(2);
        let result = plot.update(&nav_pvt(0, 0, 1.0, 1.0, 1.0));
        assert_eq!(result, Err(ConsumerError::UnexpectedRecord(MessageId::NAV_PVT)));
    }
}
