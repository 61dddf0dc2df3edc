//! Decoded record types
//!
//! A [`DecodedRecord`] is the immutable unit that flows from the decoder
//! through the scheduler into every registered consumer.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Serialize, Serializer};

use crate::error::ConfigError;

/// UBX message class and id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId {
    pub class: u8,
    pub id: u8,
}

/// Message names known to the visualizer, used for display and CLI parsing
const MESSAGE_NAMES: &[(u8, u8, &str)] = &[
    (0x01, 0x03, "NAV-STATUS"),
    (0x01, 0x07, "NAV-PVT"),
    (0x01, 0x21, "NAV-TIMEUTC"),
    (0x01, 0x22, "NAV-CLOCK"),
    (0x01, 0x35, "NAV-SAT"),
    (0x01, 0x43, "NAV-SIG"),
    (0x01, 0x61, "NAV-EOE"),
    (0x02, 0x13, "RXM-SFRBX"),
    (0x02, 0x15, "RXM-RAWX"),
    (0x05, 0x00, "ACK-NAK"),
    (0x05, 0x01, "ACK-ACK"),
    (0x0A, 0x04, "MON-VER"),
    (0x0A, 0x09, "MON-HW"),
];

impl MessageId {
    pub const NAV_PVT: MessageId = MessageId::new(0x01, 0x07);
    pub const NAV_SAT: MessageId = MessageId::new(0x01, 0x35);

    pub const fn new(class: u8, id: u8) -> Self {
        MessageId { class, id }
    }

    /// Short name such as `NAV-PVT`, if the message is in the name table
    pub fn name(&self) -> Option<&'static str> {
        MESSAGE_NAMES
            .iter()
            .find(|(c, i, _)| *c == self.class && *i == self.id)
            .map(|(_, _, n)| *n)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "UBX-{}", name),
            None => write!(f, "UBX-{:02X}-{:02X}", self.class, self.id),
        }
    }
}

impl Serialize for MessageId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Accepts `UBX-NAV-PVT`, `NAV-PVT` or a hex pair such as `01-07`.
impl FromStr for MessageId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("UBX-").unwrap_or(&upper);

        if let Some((class, id, _)) = MESSAGE_NAMES.iter().find(|(_, _, n)| *n == bare) {
            return Ok(MessageId::new(*class, *id));
        }

        let unknown = || ConfigError::UnknownMessage(s.to_string());
        let (class, id) = bare.split_once('-').ok_or_else(unknown)?;
        let parse = |part: &str| {
            u8::from_str_radix(part.trim_start_matches("0X"), 16).map_err(|_| unknown())
        };
        Ok(MessageId::new(parse(class)?, parse(id)?))
    }
}

/// GNSS constellation, identified by the UBX `gnssId`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Constellation {
    Gps,
    Sbas,
    Galileo,
    BeiDou,
    Qzss,
    Glonass,
    Navic,
    Unknown,
}

impl Constellation {
    pub fn from_gnss_id(gnss_id: u8) -> Self {
        match gnss_id {
            0 => Constellation::Gps,
            1 => Constellation::Sbas,
            2 => Constellation::Galileo,
            3 => Constellation::BeiDou,
            5 => Constellation::Qzss,
            6 => Constellation::Glonass,
            7 => Constellation::Navic,
            // 4 is IMES, which has no RINEX letter
            _ => Constellation::Unknown,
        }
    }

    /// RINEX constellation letter
    pub fn rinex_letter(&self) -> char {
        match self {
            Constellation::Gps => 'G',
            Constellation::Sbas => 'S',
            Constellation::Galileo => 'E',
            Constellation::BeiDou => 'C',
            Constellation::Qzss => 'J',
            Constellation::Glonass => 'R',
            Constellation::Navic => 'I',
            Constellation::Unknown => '?',
        }
    }

    /// Bar color used by the signal strength plot
    pub fn color(&self) -> &'static str {
        match self {
            Constellation::Gps => "#2ca02c",
            Constellation::Sbas => "#e377c2",
            Constellation::Galileo => "#1f77b4",
            Constellation::BeiDou => "#ff7f0e",
            Constellation::Qzss => "#9467bd",
            Constellation::Glonass => "#d62728",
            Constellation::Navic => "#7f7f7f",
            Constellation::Unknown => "#bcbd22",
        }
    }

    /// Display order: G, E, C, R, S, J, then everything else
    pub fn display_rank(&self) -> u8 {
        match self {
            Constellation::Gps => 0,
            Constellation::Galileo => 1,
            Constellation::BeiDou => 2,
            Constellation::Glonass => 3,
            Constellation::Sbas => 4,
            Constellation::Qzss => 5,
            Constellation::Navic => 6,
            Constellation::Unknown => 7,
        }
    }
}

/// Receiver fix type as reported in NAV-PVT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FixType {
    NoFix,
    DeadReckoningOnly,
    Fix2D,
    Fix3D,
    GnssPlusDeadReckoning,
    TimeOnly,
}

impl FixType {
    /// Whether latitude and longitude carry a usable position
    pub fn has_position(&self) -> bool {
        !matches!(self, FixType::NoFix | FixType::TimeOnly)
    }
}

/// Navigation solution from UBX-NAV-PVT
#[derive(Debug, Clone, PartialEq)]
pub struct NavSolution {
    /// GPS time of week in milliseconds
    pub itow_ms: u32,
    pub fix_type: FixType,
    pub num_sv: u8,
    pub lat_deg: f64,
    pub lon_deg: f64,
    /// Height above ellipsoid in meters
    pub height_m: f64,
    /// Horizontal accuracy estimate in meters
    pub h_acc_m: f64,
    pub ground_speed_mps: f64,
    pub heading_deg: f64,
}

/// One satellite entry of a signal quality record
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteSignal {
    pub constellation: Constellation,
    pub sv_id: u8,
    /// Carrier to noise density in dBHz
    pub cno_dbhz: u8,
    pub elev_deg: i8,
    pub azim_deg: i16,
}

impl SatelliteSignal {
    /// RINEX style identifier, for example `G12`
    pub fn rinex_id(&self) -> String {
        format!("{}{}", self.constellation.rinex_letter(), self.sv_id)
    }
}

/// Per satellite C/N0 from UBX-NAV-SAT
#[derive(Debug, Clone, PartialEq)]
pub struct SignalQuality {
    pub itow_ms: u32,
    pub satellites: Vec<SatelliteSignal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordPayload {
    NavPvt(NavSolution),
    SignalQuality(SignalQuality),
    /// Valid message outside the kinds the plots understand
    Other,
}

/// One decoded UBX message
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    /// Position in decode order, starting at 0 for each run
    pub seq: u64,
    pub id: MessageId,
    pub received_at: Instant,
    pub payload: RecordPayload,
}

impl DecodedRecord {
    /// GPS time of week in seconds, for records that carry one
    pub fn time_of_week(&self) -> Option<f64> {
        match &self.payload {
            RecordPayload::NavPvt(sol) => Some(f64::from(sol.itow_ms) / 1000.0),
            RecordPayload::SignalQuality(sig) => Some(f64::from(sig.itow_ms) / 1000.0),
            RecordPayload::Other => None,
        }
    }
}
