//! Decoder adapter around the `ublox` crate
//!
//! A frame must be exactly one UBX envelope with a matching checksum, and
//! the `ublox` parser must accept it without error. Anything else becomes a
//! [`DecodeSkip`]; good packets are mapped onto [`DecodedRecord`]s.

use std::collections::BTreeSet;

use log::trace;
use ublox::{GpsFix, PacketRef, Parser};

use crate::error::DecodeSkip;
use crate::frame::RawFrame;
use crate::framer;
use crate::record::{
    Constellation, DecodedRecord, FixType, MessageId, NavSolution, RecordPayload,
    SatelliteSignal, SignalQuality,
};

/// Turns raw frames into typed records
pub trait RecordDecoder: Send {
    fn decode(&mut self, frame: &RawFrame) -> Result<DecodedRecord, DecodeSkip>;
}

/// [`RecordDecoder`] backed by `ublox::Parser`
#[derive(Debug, Default)]
pub struct UbxDecoder {
    /// Messages to keep; empty keeps everything
    wanted: BTreeSet<MessageId>,
    next_seq: u64,
}

impl UbxDecoder {
    pub fn new() -> Self {
        UbxDecoder::default()
    }

    /// Decoder that skips every message not in `wanted`
    pub fn with_filter(wanted: impl IntoIterator<Item = MessageId>) -> Self {
        UbxDecoder {
            wanted: wanted.into_iter().collect(),
            next_seq: 0,
        }
    }

    fn accepts(&self, id: MessageId) -> bool {
        self.wanted.is_empty() || self.wanted.contains(&id)
    }
}

impl RecordDecoder for UbxDecoder {
    fn decode(&mut self, frame: &RawFrame) -> Result<DecodedRecord, DecodeSkip> {
        let id = frame
            .message_id()
            .ok_or_else(|| DecodeSkip::Malformed(format!("{} byte frame has no header", frame.len())))?;
        if !self.accepts(id) {
            trace!("Filtered {}", id);
            return Err(DecodeSkip::Filtered(id));
        }

        framer::validate(&frame.bytes)
            .map_err(|reason| DecodeSkip::Malformed(format!("{}: {}", id, reason)))?;

        // A fresh parser per frame, so a bad frame never leaves bytes behind
        let mut parser: Parser<Vec<u8>> = Parser::default();
        let mut it = parser.consume(&frame.bytes);
        let mut payload = None;
        let mut failure = None;
        while let Some(result) = it.next() {
            match result {
                Ok(packet) if payload.is_none() => payload = Some(convert(packet)),
                Ok(_) => failure = Some("more than one message in frame".to_string()),
                Err(e) => failure = Some(format!("{:?}", e)),
            }
            if failure.is_some() {
                break;
            }
        }

        match (payload, failure) {
            (_, Some(reason)) => Err(DecodeSkip::Malformed(format!("{}: {}", id, reason))),
            (Some(payload), None) => {
                let record = DecodedRecord {
                    seq: self.next_seq,
                    id,
                    received_at: frame.read_at,
                    payload,
                };
                self.next_seq += 1;
                Ok(record)
            }
            (None, None) => Err(DecodeSkip::Empty),
        }
    }
}

fn convert(packet: PacketRef<'_>) -> RecordPayload {
    match packet {
        PacketRef::NavPvt(sol) => RecordPayload::NavPvt(NavSolution {
            itow_ms: sol.itow(),
            fix_type: fix_type(sol.fix_type()),
            num_sv: sol.num_satellites(),
            lat_deg: sol.lat_degrees(),
            lon_deg: sol.lon_degrees(),
            height_m: sol.height_meters(),
            h_acc_m: f64::from(sol.horiz_accuracy()) * 1e-3,
            ground_speed_mps: sol.ground_speed(),
            heading_deg: sol.heading_degrees(),
        }),
        PacketRef::NavSat(sat) => RecordPayload::SignalQuality(SignalQuality {
            itow_ms: sat.itow(),
            satellites: sat
                .svs()
                .map(|sv| SatelliteSignal {
                    constellation: Constellation::from_gnss_id(sv.gnss_id()),
                    sv_id: sv.sv_id(),
                    cno_dbhz: sv.cno(),
                    elev_deg: sv.elev(),
                    azim_deg: sv.azim(),
                })
                .collect(),
        }),
        _ => RecordPayload::Other,
    }
}

fn fix_type(fix: GpsFix) -> FixType {
    match fix {
        GpsFix::DeadReckoningOnly => FixType::DeadReckoningOnly,
        GpsFix::Fix2D => FixType::Fix2D,
        GpsFix::Fix3D => FixType::Fix3D,
        GpsFix::GPSPlusDeadReckoning => FixType::GnssPlusDeadReckoning,
        GpsFix::TimeOnlyFix => FixType::TimeOnly,
        _ => FixType::NoFix,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::framer::encode;

    /// Field values written into [`nav_pvt_frame`]
    #[derive(Clone, Copy)]
    pub(crate) struct PvtFields {
        pub itow_ms: u32,
        pub fix_type: u8,
        pub num_sv: u8,
        pub lat_deg: f64,
        pub lon_deg: f64,
        pub height_mm: i32,
        pub height_msl_mm: i32,
        pub h_acc_mm: u32,
        pub ground_speed_mm_s: i32,
        pub heading_1e5_deg: i32,
    }

    impl Default for PvtFields {
        fn default() -> Self {
            PvtFields {
                itow_ms: 345_600_000,
                fix_type: 3,
                num_sv: 14,
                lat_deg: 48.8566,
                lon_deg: 2.3522,
                height_mm: 80_500,
                height_msl_mm: 35_250,
                h_acc_mm: 1_500,
                ground_speed_mm_s: 2_500,
                heading_1e5_deg: 9_000_000,
            }
        }
    }

    pub(crate) fn nav_pvt_frame(f: PvtFields) -> Vec<u8> {
        let mut payload = vec![0u8; 92];
        payload[0..4].copy_from_slice(&f.itow_ms.to_le_bytes());
        payload[20] = f.fix_type;
        payload[21] = 0x01; // gnssFixOK
        payload[23] = f.num_sv;
        let lon = (f.lon_deg * 1e7).round() as i32;
        let lat = (f.lat_deg * 1e7).round() as i32;
        payload[24..28].copy_from_slice(&lon.to_le_bytes());
        payload[28..32].copy_from_slice(&lat.to_le_bytes());
        payload[32..36].copy_from_slice(&f.height_mm.to_le_bytes());
        payload[36..40].copy_from_slice(&f.height_msl_mm.to_le_bytes());
        payload[40..44].copy_from_slice(&f.h_acc_mm.to_le_bytes());
        payload[60..64].copy_from_slice(&f.ground_speed_mm_s.to_le_bytes());
        payload[64..68].copy_from_slice(&f.heading_1e5_deg.to_le_bytes());
        encode(0x01, 0x07, &payload)
    }

    /// NAV-SAT frame with `(gnss_id, sv_id, cno)` entries
    pub(crate) fn nav_sat_frame(itow_ms: u32, svs: &[(u8, u8, u8)]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(8 + 12 * svs.len());
        payload.extend_from_slice(&itow_ms.to_le_bytes());
        payload.push(1); // version
        payload.push(svs.len() as u8);
        payload.extend_from_slice(&[0, 0]);
        for (gnss_id, sv_id, cno) in svs {
            payload.extend_from_slice(&[*gnss_id, *sv_id, *cno, 45]);
            payload.extend_from_slice(&180i16.to_le_bytes());
            payload.extend_from_slice(&0i16.to_le_bytes());
            payload.extend_from_slice(&0u32.to_le_bytes());
        }
        encode(0x01, 0x35, &payload)
    }

    #[test]
    fn test_decode_nav_pvt() {
        let mut decoder = UbxDecoder::new();
        let frame = RawFrame::new(nav_pvt_frame(PvtFields::default()));
        let record = decoder.decode(&frame).unwrap();

        assert_eq!(record.id, MessageId::NAV_PVT);
        assert_eq!(record.seq, 0);
        assert_eq!(record.time_of_week(), Some(345_600.0));
        match record.payload {
            RecordPayload::NavPvt(sol) => {
                assert_eq!(sol.fix_type, FixType::Fix3D);
                assert_eq!(sol.num_sv, 14);
                assert!((sol.lat_deg - 48.8566).abs() < 1e-7);
                assert!((sol.lon_deg - 2.3522).abs() < 1e-7);
                assert!((sol.height_m - 80.5).abs() < 1e-9);
                assert!((sol.h_acc_m - 1.5).abs() < 1e-9);
                assert!((sol.ground_speed_mps - 2.5).abs() < 1e-9);
                assert!((sol.heading_deg - 90.0).abs() < 1e-9);
            }
            other => panic!("expected NAV-PVT, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_nav_pvt_without_fix() {
        let mut decoder = UbxDecoder::new();
        let frame = RawFrame::new(nav_pvt_frame(PvtFields {
            fix_type: 0,
            num_sv: 0,
            lat_deg: 0.0,
            lon_deg: 0.0,
            h_acc_mm: u32::MAX,
            ..PvtFields::default()
        }));
        match decoder.decode(&frame).unwrap().payload {
            RecordPayload::NavPvt(sol) => {
                assert_eq!(sol.fix_type, FixType::NoFix);
                assert!(!sol.fix_type.has_position());
                assert!((sol.h_acc_m - 4_294_967.295).abs() < 1e-6);
            }
            other => panic!("expected NAV-PVT, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_nav_sat() {
        let mut decoder = UbxDecoder::new();
        let frame = RawFrame::new(nav_sat_frame(2000, &[(0, 12, 40), (2, 5, 33)]));
        let record = decoder.decode(&frame).unwrap();

        assert_eq!(record.id, MessageId::NAV_SAT);
        assert_eq!(record.time_of_week(), Some(2.0));
        match record.payload {
            RecordPayload::SignalQuality(sig) => {
                let ids: Vec<String> = sig.satellites.iter().map(|s| s.rinex_id()).collect();
                assert_eq!(ids, vec!["G12", "E5"]);
                assert_eq!(sig.satellites[1].cno_dbhz, 33);
                assert_eq!(sig.satellites[0].elev_deg, 45);
                assert_eq!(sig.satellites[0].azim_deg, 180);
            }
            other => panic!("expected signal quality, got {:?}", other),
        }
    }

    #[test]
    fn test_sequence_numbers_follow_decode_order() {
        let mut decoder = UbxDecoder::new();
        let frame = RawFrame::new(nav_pvt_frame(PvtFields::default()));
        let seqs: Vec<u64> = (0..3).map(|_| decoder.decode(&frame).unwrap().seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn test_bad_checksum_is_skipped() {
        let good = nav_pvt_frame(PvtFields::default());
        let mut bytes = good.clone();
        bytes[99] ^= 0xFF;
        let mut decoder = UbxDecoder::new();

        let result = decoder.decode(&RawFrame::new(bytes));
        assert!(matches!(result, Err(DecodeSkip::Malformed(_))));

        // The next good frame still decodes and takes the first sequence number
        let record = decoder.decode(&RawFrame::new(good)).unwrap();
        assert_eq!(record.seq, 0);
    }

    #[test]
    fn test_wrong_length_field_is_skipped() {
        let mut decoder = UbxDecoder::new();
        let good = nav_pvt_frame(PvtFields::default());

        // Checksum recomputed so only the length disagrees with the frame
        let mut bytes = good.clone();
        bytes[4] = 200;
        let ck = crate::framer::checksum(&bytes[2..98]);
        bytes[98..].copy_from_slice(&ck);
        let result = decoder.decode(&RawFrame::new(bytes));
        assert!(matches!(result, Err(DecodeSkip::Malformed(_))));

        // Valid frame followed by a second one in the same chunk
        let mut doubled = good.clone();
        doubled.extend_from_slice(&good);
        let result = decoder.decode(&RawFrame::new(doubled));
        assert!(matches!(result, Err(DecodeSkip::Malformed(_))));
    }

    #[test]
    fn test_wrong_payload_size_is_skipped() {
        let mut decoder = UbxDecoder::new();
        let frame = RawFrame::new(encode(0x01, 0x07, &[0; 40]));
        let result = decoder.decode(&frame);
        assert!(matches!(result, Err(DecodeSkip::Malformed(_))));
    }

    #[test]
    fn test_truncated_frame_is_skipped() {
        let mut decoder = UbxDecoder::new();
        let result = decoder.decode(&RawFrame::new(vec![0xB5, 0x62, 0x01]));
        assert!(matches!(result, Err(DecodeSkip::Malformed(_))));
    }

    #[test]
    fn test_unrecognized_message_is_other() {
        let mut decoder = UbxDecoder::new();
        let record = decoder
            .decode(&RawFrame::new(encode(0x66, 0x01, &[1, 2, 3, 4])))
            .unwrap();
        assert_eq!(record.id, MessageId::new(0x66, 0x01));
        assert_eq!(record.payload, RecordPayload::Other);
    }

    #[test]
    fn test_filter_skips_unwanted_messages() {
        let mut decoder = UbxDecoder::with_filter([MessageId::NAV_SAT]);
        let result = decoder.decode(&RawFrame::new(nav_pvt_frame(PvtFields::default())));
        assert_eq!(result.unwrap_err(), DecodeSkip::Filtered(MessageId::NAV_PVT));

        let frame = RawFrame::new(nav_sat_frame(0, &[]));
        assert!(decoder.decode(&frame).is_ok());
    }
}
