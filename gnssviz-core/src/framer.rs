//! UBX envelope framing
//!
//! A UBX frame on the wire:
//!
//! ```text
//! 0xB5 0x62 | class | id | len (u16 LE) | payload (len bytes) | ck_a ck_b
//! ```
//!
//! [`scan`] locates frame boundaries and checks the checksum, so a frame
//! with a damaged length field is cut short at the next valid frame instead
//! of swallowing it. Payload layout is validated by the decoder.

/// Sync characters that start every frame
pub const SYNC: [u8; 2] = [0xB5, 0x62];
/// Sync + class + id + length
pub const HEADER_LEN: usize = 6;
pub const CHECKSUM_LEN: usize = 2;
/// Longest payload accepted before the sync is treated as a false match
pub const MAX_PAYLOAD_LEN: usize = 8192;

/// Result of scanning a buffer for the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// Drop `discard` leading bytes, then wait for more input
    NeedMore { discard: usize },
    /// Drop `discard` leading bytes and scan again
    Resync { discard: usize },
    /// A complete frame occupies `start..start + len`
    Frame { start: usize, len: usize },
    /// `start..start + len` begins with a sync but does not hold a valid
    /// frame. Handed on so the decoder can report it.
    Corrupt { start: usize, len: usize },
}

/// Locate the next frame in `buf`
pub fn scan(buf: &[u8]) -> Scan {
    let start = match buf.windows(2).position(|w| w == SYNC) {
        Some(start) => start,
        None => {
            // Keep a trailing first sync byte, its partner may be in flight
            let keep = usize::from(buf.last() == Some(&SYNC[0]));
            return Scan::NeedMore {
                discard: buf.len() - keep,
            };
        }
    };

    let rest = &buf[start..];
    if rest.len() < HEADER_LEN {
        return Scan::NeedMore { discard: start };
    }

    let payload_len = usize::from(u16::from_le_bytes([rest[4], rest[5]]));
    if payload_len > MAX_PAYLOAD_LEN {
        return Scan::Resync { discard: start + 1 };
    }

    let len = HEADER_LEN + payload_len + CHECKSUM_LEN;
    if rest.len() >= len {
        if has_valid_checksum(&rest[..len]) {
            return Scan::Frame { start, len };
        }
        let len = next_valid_frame(rest).unwrap_or(len);
        return Scan::Corrupt { start, len };
    }

    // A complete valid frame behind an incomplete one means the length
    // field lied, no need to wait for the rest of it
    match next_valid_frame(rest) {
        Some(len) => Scan::Corrupt { start, len },
        None => Scan::NeedMore { discard: start },
    }
}

/// Length of the valid frame at the start of `buf`, if there is one
fn valid_frame_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < HEADER_LEN || buf[..2] != SYNC {
        return None;
    }
    let payload_len = usize::from(u16::from_le_bytes([buf[4], buf[5]]));
    let len = HEADER_LEN + payload_len + CHECKSUM_LEN;
    if payload_len > MAX_PAYLOAD_LEN || buf.len() < len || !has_valid_checksum(&buf[..len]) {
        return None;
    }
    Some(len)
}

/// Offset of the first valid frame after the sync at the start of `buf`
fn next_valid_frame(buf: &[u8]) -> Option<usize> {
    (SYNC.len()..buf.len().saturating_sub(1))
        .filter(|&i| buf[i..i + 2] == SYNC)
        .find(|&i| valid_frame_len(&buf[i..]).is_some())
}

fn has_valid_checksum(frame: &[u8]) -> bool {
    let (body, ck) = frame.split_at(frame.len() - CHECKSUM_LEN);
    checksum(&body[SYNC.len()..]) == ck
}

/// Check that `frame` is exactly one complete UBX envelope
pub fn validate(frame: &[u8]) -> Result<(), String> {
    if frame.len() < HEADER_LEN + CHECKSUM_LEN || frame[..2] != SYNC {
        return Err(format!("{} byte frame has no UBX header", frame.len()));
    }
    let declared = HEADER_LEN + usize::from(u16::from_le_bytes([frame[4], frame[5]])) + CHECKSUM_LEN;
    if declared != frame.len() {
        return Err(format!(
            "length field says {} bytes, frame has {}",
            declared,
            frame.len()
        ));
    }
    if !has_valid_checksum(frame) {
        return Err("checksum mismatch".to_string());
    }
    Ok(())
}

/// 8-bit Fletcher checksum over class, id, length and payload
pub fn checksum(data: &[u8]) -> [u8; 2] {
    let (mut ck_a, mut ck_b) = (0u8, 0u8);
    for byte in data {
        ck_a = ck_a.wrapping_add(*byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }
    [ck_a, ck_b]
}

/// Build a complete frame around `payload`
pub fn encode(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let len = u16::try_from(payload.len()).unwrap_or(u16::MAX);
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    frame.extend_from_slice(&SYNC);
    frame.push(class);
    frame.push(id);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload[..usize::from(len)]);
    let ck = checksum(&frame[2..]);
    frame.extend_from_slice(&ck);
    frame
}
