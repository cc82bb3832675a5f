use thiserror::Error;

/// Errors raised decoding a SOME/IP header + payload (spec §4.1, §8 boundary
/// behaviors). All variants are MALFORMED_MESSAGE at the RPC boundary except
/// the protocol/interface version mismatches, which carry their own return
/// codes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderError {
    /// Slice shorter than the 16-byte header.
    #[error("SOME/IP header requires at least 16 bytes, got {0}")]
    TooShort(usize),

    /// `length` field value is below the minimum of 8 (size of request_id +
    /// protocol_version + interface_version + message_type + return_code).
    #[error("length field {0} is smaller than the minimum of 8")]
    LengthFieldTooSmall(u32),

    /// `slice.len() != 16 + (length - 8)`.
    #[error("slice length {actual} does not match the {expected} bytes implied by the header's length field")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("unsupported protocol version {0:#x}, expected 0x01")]
    WrongProtocolVersion(u8),

    #[error("unexpected interface version {0:#x}, configured value is {1:#x}")]
    WrongInterfaceVersion(u8, u8),

    #[error("unknown message type byte {0:#x}")]
    UnknownMessageType(u8),

    #[error("unknown return code {0:#x}")]
    UnknownReturnCode(u8),
}
