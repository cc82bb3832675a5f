use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;

use crate::err::TpReassembleError;
use crate::header::{MessageId, RequestId, HEADER_LENGTH};
use crate::transport::Endpoint;

use super::range::{Coverage, TpRange};
use super::segment::{TpSegment, TpSegmentKind};

/// Key a [`TpReassembler`] tracks buffers under (spec §3 `ReassemblyBuffer`,
/// §4.4).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
struct ReassemblyKey {
    sender: Endpoint,
    message_id: MessageId,
    request_id: RequestId,
}

struct ActiveBuffer {
    sequence_number: u8,
    total_length: u32,
    coverage: Coverage,
    data: Vec<u8>,
    start_time: Instant,
}

impl ActiveBuffer {
    fn new(sequence_number: u8, total_length: u32, now: Instant) -> ActiveBuffer {
        ActiveBuffer {
            sequence_number,
            total_length,
            coverage: Coverage::new(),
            data: vec![0u8; total_length as usize],
            start_time: now,
        }
    }

    fn insert(&mut self, range: TpRange, bytes: &[u8]) {
        if self.coverage.contains(range) {
            return;
        }
        self.data[range.start as usize..range.end as usize].copy_from_slice(bytes);
        self.coverage.insert(range);
    }

    fn is_complete(&self) -> bool {
        self.coverage.is_complete(self.total_length)
    }
}

/// Merges received TP segments into whole messages, tolerating reordering,
/// duplicates and timeouts (spec §4.4). Keyed by `(sender, MessageId,
/// RequestId)`; a sequence-number change for that key supersedes any
/// in-flight buffer (spec §4.4 "Session-change policy").
#[derive(Default)]
pub struct TpReassembler {
    buffers: Mutex<HashMap<ReassemblyKey, ActiveBuffer>>,
    max_message_size: u32,
}

impl TpReassembler {
    pub fn new(max_message_size: u32) -> TpReassembler {
        TpReassembler {
            buffers: Mutex::new(HashMap::new()),
            max_message_size,
        }
    }

    /// Feeds one received segment into the reassembler. Returns the
    /// assembled payload exactly once reassembly completes (spec §4.4 step
    /// 5); `Ok(None)` means the segment was accepted but the message is
    /// still incomplete (including accepted-and-discarded duplicates).
    pub fn on_received(
        &self,
        sender: Endpoint,
        segment: &TpSegment,
        now: Instant,
    ) -> Result<Option<Vec<u8>>, TpReassembleError> {
        self.validate(segment)?;

        if segment.kind == TpSegmentKind::SingleMessage {
            return Ok(Some(segment.payload[HEADER_LENGTH..].to_vec()));
        }

        let key = ReassemblyKey {
            sender,
            message_id: segment.message_id,
            request_id: segment.request_id,
        };

        let mut buffers = self.buffers.lock();

        if let Some(existing) = buffers.get(&key) {
            if existing.sequence_number != segment.sequence_number {
                // new transfer supersedes the stale one (spec §4.4 session-change policy)
                buffers.remove(&key);
            }
        }

        let is_first = segment.kind == TpSegmentKind::FirstSegment;
        if !buffers.contains_key(&key) {
            if !is_first {
                return Err(TpReassembleError::NoMatchingBuffer(segment.sequence_number));
            }
            buffers.insert(
                key,
                ActiveBuffer::new(segment.sequence_number, segment.message_length, now),
            );
        }

        let buffer = buffers.get_mut(&key).expect("inserted above");

        let (range, bytes) = if is_first {
            (
                TpRange::new(0, (segment.payload.len() - HEADER_LENGTH) as u32),
                &segment.payload[HEADER_LENGTH..],
            )
        } else {
            (
                TpRange::new(
                    segment.segment_offset,
                    segment.segment_offset + segment.payload.len() as u32,
                ),
                segment.payload.as_slice(),
            )
        };
        buffer.insert(range, bytes);

        if buffer.is_complete() {
            let completed = buffers.remove(&key).expect("just inserted/updated");
            Ok(Some(completed.data))
        } else {
            Ok(None)
        }
    }

    fn validate(&self, segment: &TpSegment) -> Result<(), TpReassembleError> {
        if segment.payload.len() > u16::MAX as usize {
            return Err(TpReassembleError::LengthMismatch {
                declared: segment.segment_length(),
                actual: segment.payload.len(),
            });
        }
        if segment.message_length > self.max_message_size {
            return Err(TpReassembleError::MessageTooLarge {
                len: segment.message_length,
                max: self.max_message_size,
            });
        }
        let declared_len = if segment.kind == TpSegmentKind::FirstSegment
            || segment.kind == TpSegmentKind::SingleMessage
        {
            segment.payload.len().saturating_sub(HEADER_LENGTH)
        } else {
            segment.payload.len()
        };
        let end = segment.segment_offset as u64 + declared_len as u64;
        if end > segment.message_length as u64 {
            return Err(TpReassembleError::OutOfBounds {
                offset: segment.segment_offset,
                end,
                message_length: segment.message_length,
            });
        }
        if segment.kind != TpSegmentKind::LastSegment
            && segment.kind != TpSegmentKind::SingleMessage
            && segment.segment_offset % 16 != 0
        {
            return Err(TpReassembleError::UnalignedOffset(segment.segment_offset));
        }
        Ok(())
    }

    /// Discards buffers whose reassembly has exceeded `timeout` (spec §4.4
    /// step 6). No partial payload is ever surfaced for a discarded buffer.
    pub fn sweep(&self, now: Instant, timeout: std::time::Duration) -> usize {
        let mut buffers = self.buffers.lock();
        let before = buffers.len();
        buffers.retain(|_, buf| now.duration_since(buf.start_time) <= timeout);
        before - buffers.len()
    }

    pub fn active_count(&self) -> usize {
        self.buffers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{MessageId, RequestId};
    use crate::message::Message;
    use crate::message_type::MessageType;
    use crate::transport::Protocol;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use super::super::segment::TpSegmenter;

    fn sender() -> Endpoint {
        Endpoint::new(Ipv4Addr::new(10, 0, 0, 1), 30509, Protocol::Udp)
    }

    fn message_with_payload(len: usize) -> Message {
        Message::new(
            MessageId::new(0x1234, 0x5678),
            RequestId::new(0x1, 0x1),
            MessageType::Notification,
            (0..len).map(|i| (i & 0xff) as u8).collect(),
        )
    }

    #[test]
    fn reassembles_in_order() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(4096);
        let segments = segmenter.segment(&message, 1392).unwrap();

        let reassembler = TpReassembler::new(1 << 20);
        let now = Instant::now();
        let mut result = None;
        for segment in &segments {
            result = reassembler.on_received(sender(), segment, now).unwrap();
        }
        assert_eq!(Some(message.payload), result);
        assert_eq!(0, reassembler.active_count());
    }

    #[test]
    fn reassembles_out_of_order_and_tolerates_duplicates() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(4096);
        let mut segments = segmenter.segment(&message, 1392).unwrap();
        segments.reverse();

        let reassembler = TpReassembler::new(1 << 20);
        let now = Instant::now();
        let mut result = None;
        for segment in &segments {
            // feed every segment twice to exercise duplicate handling
            reassembler.on_received(sender(), segment, now).unwrap();
            result = reassembler.on_received(sender(), segment, now).unwrap();
        }
        assert_eq!(Some(message.payload), result);
    }

    #[test]
    fn consecutive_without_first_is_dropped() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(4096);
        let segments = segmenter.segment(&message, 1392).unwrap();
        let reassembler = TpReassembler::new(1 << 20);
        let now = Instant::now();

        let consecutive = segments
            .iter()
            .find(|s| s.kind == TpSegmentKind::ConsecutiveSegment)
            .unwrap();
        assert_eq!(
            Err(TpReassembleError::NoMatchingBuffer(consecutive.sequence_number)),
            reassembler.on_received(sender(), consecutive, now)
        );
    }

    #[test]
    fn out_of_bounds_segment_is_rejected() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(4096);
        let mut segments = segmenter.segment(&message, 1392).unwrap();
        let last = segments.last_mut().unwrap();
        last.segment_offset = last.message_length + 16;

        let reassembler = TpReassembler::new(1 << 20);
        let now = Instant::now();
        assert!(matches!(
            reassembler.on_received(sender(), last, now),
            Err(TpReassembleError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn single_message_completes_immediately() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(5);
        let segments = segmenter.segment(&message, 1392).unwrap();
        assert_eq!(1, segments.len());

        let reassembler = TpReassembler::new(1 << 20);
        let now = Instant::now();
        let result = reassembler.on_received(sender(), &segments[0], now).unwrap();
        assert_eq!(Some(message.payload), result);
    }

    #[test]
    fn sweep_purges_stale_buffers_without_emitting_output() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(4096);
        let segments = segmenter.segment(&message, 1392).unwrap();

        let reassembler = TpReassembler::new(1 << 20);
        let now = Instant::now();
        let first = segments
            .iter()
            .find(|s| s.kind == TpSegmentKind::FirstSegment)
            .unwrap();
        let result = reassembler.on_received(sender(), first, now).unwrap();
        assert_eq!(None, result);
        assert_eq!(1, reassembler.active_count());

        let later = now + Duration::from_secs(10);
        let purged = reassembler.sweep(later, Duration::from_secs(5));
        assert_eq!(1, purged);
        assert_eq!(0, reassembler.active_count());
    }

    #[test]
    fn new_sequence_number_supersedes_in_flight_transfer() {
        let segmenter = TpSegmenter::new();
        let message = message_with_payload(4096);
        let first_transfer = segmenter.segment(&message, 1392).unwrap();
        let second_transfer = segmenter.segment(&message, 1392).unwrap();
        assert_ne!(
            first_transfer[0].sequence_number,
            second_transfer[0].sequence_number
        );

        let reassembler = TpReassembler::new(1 << 20);
        let now = Instant::now();

        // start, but never finish, the first transfer
        let first_of_first = first_transfer
            .iter()
            .find(|s| s.kind == TpSegmentKind::FirstSegment)
            .unwrap();
        reassembler.on_received(sender(), first_of_first, now).unwrap();
        assert_eq!(1, reassembler.active_count());

        // the second transfer's segments fully supersede and complete
        let mut result = None;
        for segment in &second_transfer {
            result = reassembler.on_received(sender(), segment, now).unwrap();
        }
        assert_eq!(Some(message.payload), result);
    }
}
