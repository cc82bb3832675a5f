use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::TpConfig;
use crate::err::{TpManagerError, TpSegmentError};
use crate::header::{MessageId, RequestId};
use crate::message::Message;
use crate::transport::Endpoint;

use super::reassembler::TpReassembler;
use super::segment::{TpSegment, TpSegmenter};

/// Lifecycle of a send-side transfer (spec §3 `TpTransfer.state`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransferState {
    Pending,
    Sending,
    Complete,
    Failed,
    Timeout,
}

struct Transfer {
    message_id: MessageId,
    request_id: RequestId,
    sequence_number: u8,
    segments: Vec<TpSegment>,
    cursor: usize,
    last_activity: Instant,
    state: TransferState,
}

/// Snapshot of a transfer's progress, returned by [`TpManager::get_status`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransferStatus {
    pub state: TransferState,
    pub segments_total: usize,
    pub segments_sent: usize,
}

/// Running counters for observability (spec §4.5 `statistics()`).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TpStatistics {
    pub transfers_started: u64,
    pub transfers_completed: u64,
    pub transfers_timed_out: u64,
    pub reassemblies_completed: u64,
    pub invalid_segments_dropped: u64,
    pub reassembly_buffers_timed_out: u64,
}

/// Composes the segmenter and reassembler, owning active send-transfers in
/// a bounded table (spec §4.5).
pub struct TpManager {
    config: TpConfig,
    segmenter: TpSegmenter,
    reassembler: TpReassembler,
    transfers: Mutex<HashMap<u64, Transfer>>,
    next_transfer_id: AtomicU64,
    stats: Mutex<TpStatistics>,
}

impl TpManager {
    pub fn new(config: TpConfig) -> TpManager {
        TpManager {
            reassembler: TpReassembler::new(config.max_message_size),
            segmenter: TpSegmenter::new(),
            config,
            transfers: Mutex::new(HashMap::new()),
            next_transfer_id: AtomicU64::new(1),
            stats: Mutex::new(TpStatistics::default()),
        }
    }

    /// True if `message`'s encoded size exceeds the configured segment
    /// ceiling and therefore requires TP (spec §4.5).
    pub fn needs_segmentation(&self, message: &Message) -> bool {
        Message::encode(message).len() > self.config.max_segment_size
    }

    /// Starts a send-transfer for `message`, pre-building its segments.
    /// Fails with [`TpManagerError::ResourceExhausted`] if
    /// `max_concurrent_transfers` active transfers already exist (spec §4.5).
    pub fn begin_send(&self, message: &Message) -> Result<u64, TpManagerError> {
        let mut transfers = self.transfers.lock();
        let active = transfers
            .values()
            .filter(|t| matches!(t.state, TransferState::Pending | TransferState::Sending))
            .count();
        if active >= self.config.max_concurrent_transfers {
            return Err(TpManagerError::ResourceExhausted {
                active,
                max: self.config.max_concurrent_transfers,
            });
        }

        let segments = self
            .segmenter
            .segment(message, self.config.max_segment_size)
            .map_err(|e| match e {
                TpSegmentError::MessageTooLarge { len, max } => {
                    TpManagerError::Segment(TpSegmentError::MessageTooLarge { len, max })
                }
            })?;
        let sequence_number = segments[0].sequence_number;

        let id = self.next_transfer_id.fetch_add(1, Ordering::Relaxed);
        transfers.insert(
            id,
            Transfer {
                message_id: message.message_id,
                request_id: message.request_id,
                sequence_number,
                segments,
                cursor: 0,
                last_activity: Instant::now(),
                state: TransferState::Pending,
            },
        );
        drop(transfers);
        self.stats.lock().transfers_started += 1;
        log::debug!(
            "TP transfer {id} started for {:?}/{:?}",
            message.message_id,
            message.request_id
        );
        Ok(id)
    }

    /// Returns the next segment to transmit for `transfer_id`, in ascending
    /// offset order (spec §5 ordering guarantee). `None` means the transfer
    /// is complete; the caller should move on to the next transfer.
    pub fn next_segment(&self, transfer_id: u64) -> Result<Option<TpSegment>, TpManagerError> {
        let mut transfers = self.transfers.lock();
        let transfer = transfers
            .get_mut(&transfer_id)
            .ok_or(TpManagerError::UnknownTransfer(transfer_id))?;

        if transfer.cursor >= transfer.segments.len() {
            if transfer.state != TransferState::Complete {
                transfer.state = TransferState::Complete;
                drop(transfers);
                self.stats.lock().transfers_completed += 1;
            }
            return Ok(None);
        }

        let segment = transfer.segments[transfer.cursor].clone();
        transfer.cursor += 1;
        transfer.last_activity = Instant::now();
        transfer.state = TransferState::Sending;
        Ok(Some(segment))
    }

    /// Feeds one received segment to the reassembler. Invalid segments are
    /// dropped and counted, never surfaced as a hard error (spec §7
    /// INVALID_SEGMENT, §4.4 step 1).
    pub fn on_received(&self, sender: Endpoint, segment: &TpSegment) -> Option<Vec<u8>> {
        match self.reassembler.on_received(sender, segment, Instant::now()) {
            Ok(payload @ Some(_)) => {
                self.stats.lock().reassemblies_completed += 1;
                payload
            }
            Ok(None) => None,
            Err(e) => {
                self.stats.lock().invalid_segments_dropped += 1;
                log::debug!("dropping invalid TP segment: {e}");
                None
            }
        }
    }

    pub fn cancel(&self, transfer_id: u64) -> Result<(), TpManagerError> {
        self.transfers
            .lock()
            .remove(&transfer_id)
            .map(|_| ())
            .ok_or(TpManagerError::UnknownTransfer(transfer_id))
    }

    pub fn get_status(&self, transfer_id: u64) -> Result<TransferStatus, TpManagerError> {
        let transfers = self.transfers.lock();
        let transfer = transfers
            .get(&transfer_id)
            .ok_or(TpManagerError::UnknownTransfer(transfer_id))?;
        Ok(TransferStatus {
            state: transfer.state,
            segments_total: transfer.segments.len(),
            segments_sent: transfer.cursor,
        })
    }

    pub fn statistics(&self) -> TpStatistics {
        *self.stats.lock()
    }

    /// Periodic sweep: purges stale reassembly buffers and marks idle
    /// send-transfers as timed out (spec §4.5 `tick(now)`).
    pub fn tick(&self, now: Instant) {
        let timed_out_buffers = self.reassembler.sweep(now, self.config.reassembly_timeout);
        if timed_out_buffers > 0 {
            self.stats.lock().reassembly_buffers_timed_out += timed_out_buffers as u64;
        }

        let mut transfers = self.transfers.lock();
        let mut newly_timed_out = 0u64;
        transfers.retain(|_, transfer| {
            let idle = now.duration_since(transfer.last_activity);
            let stale = matches!(transfer.state, TransferState::Pending | TransferState::Sending)
                && idle > self.config.reassembly_timeout;
            if stale {
                newly_timed_out += 1;
                false
            } else {
                true
            }
        });
        drop(transfers);
        if newly_timed_out > 0 {
            self.stats.lock().transfers_timed_out += newly_timed_out;
        }
    }

    pub fn active_transfer_count(&self) -> usize {
        self.transfers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{MessageId, RequestId};
    use crate::message_type::MessageType;
    use crate::transport::Protocol;
    use std::net::Ipv4Addr;

    fn sender() -> Endpoint {
        Endpoint::new(Ipv4Addr::new(10, 0, 0, 2), 30509, Protocol::Udp)
    }

    fn message_with_payload(len: usize) -> Message {
        Message::new(
            MessageId::new(0x1234, 0x5678),
            RequestId::new(0x1, 0x1),
            MessageType::Notification,
            vec![0xcd; len],
        )
    }

    fn manager() -> TpManager {
        TpManager::new(TpConfig {
            max_segment_size: 1392,
            max_message_size: 1 << 20,
            max_concurrent_transfers: 2,
            reassembly_timeout: Duration::from_millis(50),
        })
    }

    #[test]
    fn needs_segmentation_reflects_encoded_size() {
        let mgr = manager();
        assert!(!mgr.needs_segmentation(&message_with_payload(10)));
        assert!(mgr.needs_segmentation(&message_with_payload(4096)));
    }

    #[test]
    fn send_transfer_drains_segments_in_order() {
        let mgr = manager();
        let message = message_with_payload(4096);
        let id = mgr.begin_send(&message).unwrap();

        let mut offsets = Vec::new();
        while let Some(segment) = mgr.next_segment(id).unwrap() {
            offsets.push(segment.segment_offset);
        }
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(None, mgr.next_segment(id).unwrap());

        let status = mgr.get_status(id).unwrap();
        assert_eq!(TransferState::Complete, status.state);
        assert_eq!(status.segments_total, status.segments_sent);
    }

    #[test]
    fn resource_exhausted_past_concurrent_cap() {
        let mgr = manager();
        let a = message_with_payload(4096);
        let mut b = message_with_payload(4096);
        b.request_id = RequestId::new(0x1, 0x2);

        mgr.begin_send(&a).unwrap();
        mgr.begin_send(&b).unwrap();

        let mut c = message_with_payload(4096);
        c.request_id = RequestId::new(0x1, 0x3);
        assert_eq!(
            Err(TpManagerError::ResourceExhausted { active: 2, max: 2 }),
            mgr.begin_send(&c)
        );
    }

    #[test]
    fn round_trip_through_manager() {
        let mgr = manager();
        let message = message_with_payload(4096);
        let id = mgr.begin_send(&message).unwrap();

        let mut received = None;
        while let Some(segment) = mgr.next_segment(id).unwrap() {
            received = mgr.on_received(sender(), &segment);
        }
        assert_eq!(Some(message.payload), received);
        assert_eq!(1, mgr.statistics().reassemblies_completed);
    }

    #[test]
    fn cancel_removes_transfer() {
        let mgr = manager();
        let message = message_with_payload(4096);
        let id = mgr.begin_send(&message).unwrap();
        mgr.cancel(id).unwrap();
        assert_eq!(
            Err(TpManagerError::UnknownTransfer(id)),
            mgr.get_status(id)
        );
    }

    #[test]
    fn tick_times_out_idle_send_transfers() {
        let mgr = manager();
        let message = message_with_payload(4096);
        let id = mgr.begin_send(&message).unwrap();
        // advance one segment so the transfer is "Sending", then go idle
        mgr.next_segment(id).unwrap();

        mgr.tick(Instant::now() + Duration::from_millis(200));
        assert_eq!(
            Err(TpManagerError::UnknownTransfer(id)),
            mgr.get_status(id)
        );
        assert_eq!(1, mgr.statistics().transfers_timed_out);
    }
}
