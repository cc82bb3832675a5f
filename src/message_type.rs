use crate::err::HeaderError;

/// Message type of a SOME/IP message (spec §3 `Message.message_type`).
///
/// The `Tp*` variants are the normal variants with the TP flag (`0x20`)
/// folded into the wire byte; `is_tp`/`to_tp`/`to_base` convert between the
/// two forms. Wire values for the five TP-capable variants are fixed by
/// spec §6; the `*Ack` variants have no TP-capable counterpart (ack frames
/// never need segmentation).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MessageType {
    Request,
    RequestNoReturn,
    Notification,
    RequestAck,
    Response,
    Error,
    ResponseAck,
    ErrorAck,
    TpRequest,
    TpRequestNoReturn,
    TpNotification,
    TpResponse,
    TpError,
}

impl MessageType {
    /// Raw wire byte, as it appears in the message-type field of the header.
    pub const fn raw(self) -> u8 {
        use MessageType::*;
        match self {
            Request => 0x00,
            RequestNoReturn => 0x01,
            Notification => 0x02,
            RequestAck => 0x40,
            Response => 0x80,
            Error => 0x81,
            ResponseAck => 0xc0,
            ErrorAck => 0xc1,
            TpRequest => 0x20,
            TpRequestNoReturn => 0x21,
            TpNotification => 0x22,
            TpResponse => 0x23,
            TpError => 0x24,
        }
    }

    /// Parse a raw wire byte. Returns `None` for values outside the
    /// enumerated set (caller maps this to `HeaderError::UnknownMessageType`).
    pub const fn from_raw(raw: u8) -> Option<MessageType> {
        use MessageType::*;
        Some(match raw {
            0x00 => Request,
            0x01 => RequestNoReturn,
            0x02 => Notification,
            0x40 => RequestAck,
            0x80 => Response,
            0x81 => Error,
            0xc0 => ResponseAck,
            0xc1 => ErrorAck,
            0x20 => TpRequest,
            0x21 => TpRequestNoReturn,
            0x22 => TpNotification,
            0x23 => TpResponse,
            0x24 => TpError,
            _ => return None,
        })
    }

    pub fn try_from_raw(raw: u8) -> Result<MessageType, HeaderError> {
        Self::from_raw(raw).ok_or(HeaderError::UnknownMessageType(raw))
    }

    /// True if this frame carries a SOME/IP-TP header (the frame is one
    /// segment of a larger message).
    pub const fn is_tp(self) -> bool {
        use MessageType::*;
        matches!(
            self,
            TpRequest | TpRequestNoReturn | TpNotification | TpResponse | TpError
        )
    }

    /// The TP-flagged form of this variant, if one exists.
    pub const fn to_tp(self) -> Option<MessageType> {
        use MessageType::*;
        Some(match self {
            Request => TpRequest,
            RequestNoReturn => TpRequestNoReturn,
            Notification => TpNotification,
            Response => TpResponse,
            Error => TpError,
            other if other.is_tp() => other,
            _ => return None,
        })
    }

    /// The non-TP form of this variant (identity if already non-TP).
    pub const fn to_base(self) -> MessageType {
        use MessageType::*;
        match self {
            TpRequest => Request,
            TpRequestNoReturn => RequestNoReturn,
            TpNotification => Notification,
            TpResponse => Response,
            TpError => Error,
            other => other,
        }
    }

    /// True for message types that expect a RESPONSE/ERROR reply
    /// (REQUEST and TP_REQUEST only).
    pub const fn expects_reply(self) -> bool {
        matches!(self, MessageType::Request | MessageType::TpRequest)
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> u8 {
        value.raw()
    }
}

impl TryFrom<u8> for MessageType {
    type Error = HeaderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_raw(value)
    }
}
