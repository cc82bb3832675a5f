use thiserror::Error;

/// Errors from the payload sub-codec (spec §4.1 "payload type system").
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadError {
    /// Reader ran out of bytes before a primitive/composite could be fully read.
    #[error("unexpected end of payload: needed {needed} bytes, {available} remained")]
    UnexpectedEndOfInput { needed: usize, available: usize },

    /// A dynamic-length string or array declared a length that does not
    /// leave enough bytes in the reader.
    #[error("declared length {declared} exceeds remaining payload of {available} bytes")]
    LengthExceedsPayload { declared: usize, available: usize },

    /// A tagged union carried a type tag with no matching variant.
    #[error("unknown union variant tag {0}")]
    UnknownUnionTag(u32),

    /// A string payload was not valid UTF-8 (after stripping the BOM).
    #[error("payload string was not valid UTF-8")]
    InvalidUtf8,
}
