//! `tokio_util` codec that splits a byte stream into UBX frames

use std::io;

use bytes::{Buf, BytesMut};
use gnssviz_core::framer::{self, Scan};
use gnssviz_core::RawFrame;
use log::{debug, trace, warn};
use tokio_util::codec::Decoder;

#[derive(Debug, Default)]
pub struct UbxFrameCodec {
    discarded: u64,
}

impl UbxFrameCodec {
    pub fn new() -> Self {
        UbxFrameCodec::default()
    }

    /// Bytes dropped so far while looking for a frame start
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn discard(&mut self, src: &mut BytesMut, count: usize) {
        if count > 0 {
            trace!("Discarding {} bytes before frame start", count);
            src.advance(count);
            self.discarded += count as u64;
        }
    }
}

impl Decoder for UbxFrameCodec {
    type Item = RawFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>, io::Error> {
        loop {
            match framer::scan(&src[..]) {
                Scan::Frame { start, len } => {
                    self.discard(src, start);
                    let bytes = src.split_to(len);
                    return Ok(Some(RawFrame::new(bytes.to_vec())));
                }
                Scan::Corrupt { start, len } => {
                    self.discard(src, start);
                    debug!("Passing on {} byte corrupt frame", len);
                    let bytes = src.split_to(len);
                    return Ok(Some(RawFrame::new(bytes.to_vec())));
                }
                Scan::Resync { discard } => self.discard(src, discard),
                Scan::NeedMore { discard } => {
                    self.discard(src, discard);
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>, io::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            warn!("Dropping {} trailing bytes without a complete frame", src.len());
            let remaining = src.len();
            self.discard(src, remaining);
        }
        Ok(None)
    }
}
