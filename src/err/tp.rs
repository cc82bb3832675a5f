use thiserror::Error;

/// Errors from the TP segmenter (spec §4.3).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TpSegmentError {
    /// Payload exceeds the configured segmentation ceiling.
    #[error("message payload of {len} bytes exceeds the maximum TP message size of {max}")]
    MessageTooLarge { len: usize, max: u32 },
}

/// Errors from the TP reassembler (spec §4.4), grounded on the upstream
/// `TpReassembleError` taxonomy but adapted to the offset/length validation
/// contract this spec describes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TpReassembleError {
    /// `segment_length != segment_payload.len()`.
    #[error("segment declared length {declared} does not match actual payload length {actual}")]
    LengthMismatch { declared: u16, actual: usize },

    /// `segment_offset + segment_length > message_length`.
    #[error("segment range {offset}..{end} exceeds declared message length {message_length}")]
    OutOfBounds {
        offset: u32,
        end: u64,
        message_length: u32,
    },

    /// `message_length` exceeds the configured maximum.
    #[error("declared message length {len} exceeds the configured maximum of {max}")]
    MessageTooLarge { len: u32, max: u32 },

    /// A non-multiple-of-16 offset on anything but the last segment.
    #[error("segment offset {0} is not a multiple of 16")]
    UnalignedOffset(u32),

    /// A CONSECUTIVE/LAST segment arrived with no FIRST/SINGLE buffer to
    /// attach to (and was dropped).
    #[error("no reassembly buffer for sequence number {0}")]
    NoMatchingBuffer(u8),
}

/// Errors from the TP manager (spec §4.5).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TpManagerError {
    #[error(transparent)]
    Segment(#[from] TpSegmentError),

    #[error(transparent)]
    Reassemble(#[from] TpReassembleError),

    /// `max_concurrent_transfers` ceiling reached.
    #[error("resource exhausted: {active} transfers already active, limit is {max}")]
    ResourceExhausted { active: usize, max: usize },

    /// `get_status`/`cancel`/`next_segment` referenced an unknown transfer id.
    #[error("unknown transfer id {0}")]
    UnknownTransfer(u64),
}

/// Umbrella error type for anything that flows out of the TP subsystem.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TpError {
    #[error(transparent)]
    Segment(#[from] TpSegmentError),

    #[error(transparent)]
    Reassemble(#[from] TpReassembleError),

    #[error(transparent)]
    Manager(#[from] TpManagerError),
}
