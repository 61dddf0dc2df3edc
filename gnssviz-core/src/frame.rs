use std::time::Instant;

use crate::record::MessageId;

/// Bytes believed to hold exactly one UBX message
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    pub bytes: Vec<u8>,
    /// Monotonic time at which the last byte of the frame was read
    pub read_at: Instant,
}

impl RawFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        RawFrame {
            bytes,
            read_at: Instant::now(),
        }
    }

    /// Class and id from the header, if the frame is long enough to have one
    pub fn message_id(&self) -> Option<MessageId> {
        match self.bytes.get(2..4) {
            Some(&[class, id]) => Some(MessageId::new(class, id)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
