use crate::err::HeaderError;
use crate::message_type::MessageType;
use crate::return_code::ReturnCode;

/// Number of bytes from the start of `message_id` through the end of
/// `return_code` (spec §6 wire diagram).
pub const HEADER_LENGTH: usize = 16;

/// Number of bytes the `length` field counts from (request_id through the
/// end of payload): `8 + |payload|`.
pub const LEN_OFFSET_TO_PAYLOAD: u32 = 8;

/// Fixed protocol_version byte (spec §3).
pub const PROTOCOL_VERSION: u8 = 0x01;

/// `message_id` reserved for SD (spec §3, §6): service_id=0xFFFF, method_id=0x8100.
pub const SD_MESSAGE_ID: u32 = 0xffff_8100;

/// `(service_id, method_id)` pair identifying the endpoint of an operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MessageId {
    pub service_id: u16,
    pub method_id: u16,
}

impl MessageId {
    pub const SD: MessageId = MessageId {
        service_id: 0xffff,
        method_id: 0x8100,
    };

    pub const fn new(service_id: u16, method_id: u16) -> MessageId {
        MessageId {
            service_id,
            method_id,
        }
    }

    pub const fn is_sd(self) -> bool {
        self.service_id == 0xffff && self.method_id == 0x8100
    }

    pub(crate) const fn to_raw(self) -> u32 {
        ((self.service_id as u32) << 16) | self.method_id as u32
    }

    pub(crate) const fn from_raw(raw: u32) -> MessageId {
        MessageId {
            service_id: (raw >> 16) as u16,
            method_id: (raw & 0xffff) as u16,
        }
    }
}

/// `(client_id, session_id)` pair correlating a response to its request.
/// `session_id == 0x0000` means correlation is disabled (spec §3).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RequestId {
    pub client_id: u16,
    pub session_id: u16,
}

impl RequestId {
    pub const fn new(client_id: u16, session_id: u16) -> RequestId {
        RequestId {
            client_id,
            session_id,
        }
    }

    /// True if `session_id` is the reserved "correlation disabled" value.
    pub const fn is_unsolicited(self) -> bool {
        self.session_id == 0
    }

    pub(crate) const fn to_raw(self) -> u32 {
        ((self.client_id as u32) << 16) | self.session_id as u32
    }

    pub(crate) const fn from_raw(raw: u32) -> RequestId {
        RequestId {
            client_id: (raw >> 16) as u16,
            session_id: (raw & 0xffff) as u16,
        }
    }
}

/// The 16-byte SOME/IP header, decoded field by field (spec §3, §4.1, §6).
///
/// `length` is never stored directly: it is always `8 + payload_len` by
/// construction, so there is nowhere for it to drift out of sync with the
/// payload it describes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SomeipHeader {
    pub message_id: MessageId,
    pub request_id: RequestId,
    pub interface_version: u8,
    pub message_type: MessageType,
    pub return_code: ReturnCode,
}

impl SomeipHeader {
    /// `length` field this header would produce for a payload of `payload_len` bytes.
    pub fn length(&self, payload_len: usize) -> u32 {
        LEN_OFFSET_TO_PAYLOAD + payload_len as u32
    }

    pub fn is_sd(&self) -> bool {
        self.message_id.is_sd()
    }

    /// Serializes the 16-byte header, given the payload length that follows it.
    pub fn write_to(&self, out: &mut [u8; HEADER_LENGTH], payload_len: usize) {
        out[0..4].copy_from_slice(&self.message_id.to_raw().to_be_bytes());
        out[4..8].copy_from_slice(&self.length(payload_len).to_be_bytes());
        out[8..12].copy_from_slice(&self.request_id.to_raw().to_be_bytes());
        out[12] = PROTOCOL_VERSION;
        out[13] = self.interface_version;
        out[14] = self.message_type.raw();
        out[15] = self.return_code.raw();
    }

    pub fn to_bytes(&self, payload_len: usize) -> [u8; HEADER_LENGTH] {
        let mut out = [0u8; HEADER_LENGTH];
        self.write_to(&mut out, payload_len);
        out
    }

    /// Decodes a 16-byte header slice and returns `(header, declared payload length)`.
    ///
    /// Validates `protocol_version`, the enumerated `message_type`/`return_code`
    /// sets, and that `length >= 8` (spec §4.1 decode contract); does not
    /// validate `interface_version` against a configured value, that is left
    /// to the caller (spec §4.1: "implementations may defer this to a higher layer").
    pub fn read(bytes: &[u8]) -> Result<(SomeipHeader, usize), HeaderError> {
        if bytes.len() < HEADER_LENGTH {
            return Err(HeaderError::TooShort(bytes.len()));
        }
        let length = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if length < LEN_OFFSET_TO_PAYLOAD {
            return Err(HeaderError::LengthFieldTooSmall(length));
        }
        let protocol_version = bytes[12];
        if protocol_version != PROTOCOL_VERSION {
            return Err(HeaderError::WrongProtocolVersion(protocol_version));
        }
        let message_type = MessageType::try_from_raw(bytes[14])?;
        let return_code = ReturnCode::try_from_raw(bytes[15])?;
        let message_id_raw = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let request_id_raw = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let payload_len = (length - LEN_OFFSET_TO_PAYLOAD) as usize;
        Ok((
            SomeipHeader {
                message_id: MessageId::from_raw(message_id_raw),
                request_id: RequestId::from_raw(request_id_raw),
                interface_version: bytes[13],
                message_type,
                return_code,
            },
            payload_len,
        ))
    }

    /// Validates `interface_version` against a configured expectation. Call
    /// after `read` when the codec-strict variant described in spec §4.1 is
    /// wanted.
    pub fn check_interface_version(&self, configured: u8) -> Result<(), HeaderError> {
        if self.interface_version == configured {
            Ok(())
        } else {
            Err(HeaderError::WrongInterfaceVersion(
                self.interface_version,
                configured,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> SomeipHeader {
        SomeipHeader {
            message_id: MessageId::new(0x1234, 0x5678),
            request_id: RequestId::new(0x9abc, 0xdef0),
            interface_version: 0x01,
            message_type: MessageType::Request,
            return_code: ReturnCode::Ok,
        }
    }

    #[test]
    fn basic_rpc_round_trip_bytes() {
        let header = sample();
        let payload = [0x01u8, 0x02, 0x03, 0x04, 0x05];
        let bytes = header.to_bytes(payload.len());
        assert_eq!(
            [
                0x12, 0x34, 0x56, 0x78, 0x00, 0x00, 0x00, 0x0d, 0x9a, 0xbc, 0xde, 0xf0, 0x01,
                0x01, 0x00, 0x00,
            ],
            bytes
        );
        let (decoded, payload_len) = SomeipHeader::read(&bytes).unwrap();
        assert_eq!(header, decoded);
        assert_eq!(payload.len(), payload_len);
    }

    #[test]
    fn too_short_is_malformed() {
        let bytes = [0u8; 15];
        assert_eq!(Err(HeaderError::TooShort(15)), SomeipHeader::read(&bytes));
    }

    #[test]
    fn length_field_below_offset_is_malformed() {
        let mut bytes = sample().to_bytes(5);
        bytes[4..8].copy_from_slice(&7u32.to_be_bytes());
        assert_eq!(
            Err(HeaderError::LengthFieldTooSmall(7)),
            SomeipHeader::read(&bytes)
        );
    }

    #[test]
    fn malformed_header_length_five() {
        let mut bytes = vec![0x12, 0x34, 0x56, 0x78, 0x00, 0x00, 0x00, 0x05];
        bytes.extend_from_slice(&[0u8; 8]);
        assert_eq!(
            Err(HeaderError::LengthFieldTooSmall(5)),
            SomeipHeader::read(&bytes)
        );
    }

    #[test]
    fn wrong_protocol_version_is_rejected() {
        let mut bytes = sample().to_bytes(5);
        bytes[12] = 0x02;
        assert_eq!(
            Err(HeaderError::WrongProtocolVersion(0x02)),
            SomeipHeader::read(&bytes)
        );
    }

    #[test]
    fn configured_interface_version_mismatch() {
        let header = sample();
        assert_eq!(
            Err(HeaderError::WrongInterfaceVersion(0x01, 0x02)),
            header.check_interface_version(0x02)
        );
        assert_eq!(Ok(()), header.check_interface_version(0x01));
    }

    #[test]
    fn sd_message_id_detected() {
        let mut header = sample();
        header.message_id = MessageId::SD;
        assert!(header.is_sd());
        assert_eq!(SD_MESSAGE_ID, header.message_id.to_raw());
    }

    proptest! {
        #[test]
        fn message_id_round_trips(service_id: u16, method_id: u16) {
            let id = MessageId::new(service_id, method_id);
            prop_assert_eq!(id, MessageId::from_raw(id.to_raw()));
        }

        #[test]
        fn request_id_round_trips(client_id: u16, session_id: u16) {
            let id = RequestId::new(client_id, session_id);
            prop_assert_eq!(id, RequestId::from_raw(id.to_raw()));
        }
    }
}
