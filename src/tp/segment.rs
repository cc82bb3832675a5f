use std::collections::HashMap;

use parking_lot::Mutex;

use crate::err::TpSegmentError;
use crate::header::{MessageId, RequestId, HEADER_LENGTH};
use crate::message::Message;

/// Largest representable total payload length a TP transfer can carry
/// (spec §4.3 "MESSAGE_TOO_LARGE"), bounded by what the `length` field of
/// the reassembled SOME/IP header can express.
pub const MAX_TP_MESSAGE_LENGTH: u32 = u32::MAX - HEADER_LENGTH as u32;

/// The four SOME/IP-TP frame kinds (spec §3 `TpSegment.tp_message_type`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TpSegmentKind {
    SingleMessage,
    FirstSegment,
    ConsecutiveSegment,
    LastSegment,
}

impl TpSegmentKind {
    pub fn more_segments(self) -> bool {
        matches!(self, TpSegmentKind::FirstSegment | TpSegmentKind::ConsecutiveSegment)
    }
}

/// One segment of a (possibly) split message (spec §3 `TpSegment`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TpSegment {
    pub message_id: MessageId,
    pub request_id: RequestId,
    pub message_length: u32,
    pub segment_offset: u32,
    pub sequence_number: u8,
    pub kind: TpSegmentKind,
    pub payload: Vec<u8>,
}

impl TpSegment {
    pub fn segment_length(&self) -> u16 {
        self.payload.len() as u16
    }
}

/// Allocates per-`MessageId` monotonic (wrapping) sequence numbers and
/// splits oversized messages into ordered segments (spec §4.3).
#[derive(Default)]
pub struct TpSegmenter {
    sequence_numbers: Mutex<HashMap<MessageId, u8>>,
}

impl TpSegmenter {
    pub fn new() -> TpSegmenter {
        TpSegmenter::default()
    }

    fn next_sequence_number(&self, message_id: MessageId) -> u8 {
        let mut table = self.sequence_numbers.lock();
        let entry = table.entry(message_id).or_insert(0);
        let current = *entry;
        *entry = entry.wrapping_add(1);
        current
    }

    /// Splits `message` into ordered TP segments, sized to fit within
    /// `max_segment_size` total bytes on the wire (spec §4.3).
    ///
    /// A message whose fully encoded form (header + payload) already fits
    /// in one segment is emitted as a single `SINGLE_MESSAGE` segment
    /// carrying the whole encoded message, unsegmented.
    pub fn segment(
        &self,
        message: &Message,
        max_segment_size: usize,
    ) -> Result<Vec<TpSegment>, TpSegmentError> {
        let message_length = message.payload.len() as u32;
        if message_length > MAX_TP_MESSAGE_LENGTH {
            return Err(TpSegmentError::MessageTooLarge {
                len: message.payload.len(),
                max: MAX_TP_MESSAGE_LENGTH,
            });
        }

        let encoded = message.encode();
        if encoded.len() <= max_segment_size {
            return Ok(vec![TpSegment {
                message_id: message.message_id,
                request_id: message.request_id,
                message_length,
                segment_offset: 0,
                sequence_number: 0,
                kind: TpSegmentKind::SingleMessage,
                payload: encoded,
            }]);
        }

        let sequence_number = self.next_sequence_number(message.message_id);
        let mut segments = Vec::new();

        let first_len = (max_segment_size.saturating_sub(HEADER_LENGTH) / 16) * 16;
        let first_len = first_len.min(message.payload.len());
        let mut first_payload = Vec::with_capacity(HEADER_LENGTH + first_len);
        let header_bytes = {
            let header = crate::header::SomeipHeader {
                message_id: message.message_id,
                request_id: message.request_id,
                interface_version: message.interface_version,
                message_type: message.message_type,
                return_code: message.return_code,
            };
            header.to_bytes(message.payload.len())
        };
        first_payload.extend_from_slice(&header_bytes);
        first_payload.extend_from_slice(&message.payload[..first_len]);

        let mut offset = first_len;
        let more_after_first = offset < message.payload.len();
        segments.push(TpSegment {
            message_id: message.message_id,
            request_id: message.request_id,
            message_length,
            segment_offset: 0,
            sequence_number,
            kind: if more_after_first {
                TpSegmentKind::FirstSegment
            } else {
                TpSegmentKind::LastSegment
            },
            payload: first_payload,
        });

        if !more_after_first {
            return Ok(segments);
        }

        let chunk_len = ((max_segment_size.saturating_sub(HEADER_LENGTH) / 16).max(1)) * 16;
        while message.payload.len() - offset > chunk_len {
            let end = offset + chunk_len;
            segments.push(TpSegment {
                message_id: message.message_id,
                request_id: message.request_id,
                message_length,
                segment_offset: offset as u32,
                sequence_number,
                kind: TpSegmentKind::ConsecutiveSegment,
                payload: message.payload[offset..end].to_vec(),
            });
            offset = end;
        }

        segments.push(TpSegment {
            message_id: message.message_id,
            request_id: message.request_id,
            message_length,
            segment_offset: offset as u32,
            sequence_number,
            kind: TpSegmentKind::LastSegment,
            payload: message.payload[offset..].to_vec(),
        });

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::RequestId;
    use crate::message_type::MessageType;

    fn message_with_payload(len: usize) -> Message {
        Message::new(
            MessageId::new(0x1234, 0x5678),
            RequestId::new(0x1, 0x1),
            MessageType::Request,
            vec![0xab; len],
        )
    }

    #[test]
    fn small_message_is_a_single_segment() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(5);
        let segments = segmenter.segment(&message, 1392).unwrap();
        assert_eq!(1, segments.len());
        assert_eq!(TpSegmentKind::SingleMessage, segments[0].kind);
        assert_eq!(message.encode(), segments[0].payload);
    }

    #[test]
    fn oversized_message_produces_ordered_segments() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(4096);
        let segments = segmenter.segment(&message, 1392).unwrap();

        assert!(segments.len() >= 3);
        assert_eq!(TpSegmentKind::FirstSegment, segments[0].kind);
        assert_eq!(0, segments[0].segment_offset);
        assert_eq!(0, segments[0].segment_offset % 16);

        let last = segments.last().unwrap();
        assert_eq!(TpSegmentKind::LastSegment, last.kind);

        for w in segments.windows(2) {
            assert!(w[0].segment_offset < w[1].segment_offset);
        }

        for segment in &segments[1..] {
            assert_eq!(0, segment.segment_offset % 16);
        }

        let mut reassembled = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            if i == 0 {
                reassembled.extend_from_slice(&segment.payload[HEADER_LENGTH..]);
            } else {
                reassembled.extend_from_slice(&segment.payload);
            }
        }
        assert_eq!(message.payload, reassembled);
    }

    #[test]
    fn all_segments_of_one_message_share_a_sequence_number() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(4096);
        let segments = segmenter.segment(&message, 1392).unwrap();
        let seq = segments[0].sequence_number;
        assert!(segments.iter().all(|s| s.sequence_number == seq));
    }

    #[test]
    fn sequence_numbers_advance_per_message_id() {
        let segmenter = TpSegmenter::new();
        let a = segmenter
            .segment(&message_with_payload(4096), 1392)
            .unwrap();
        let b = segmenter
            .segment(&message_with_payload(4096), 1392)
            .unwrap();
        assert_ne!(a[0].sequence_number, b[0].sequence_number);
    }

}
