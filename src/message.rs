use crate::err::HeaderError;
use crate::header::{MessageId, RequestId, SomeipHeader, HEADER_LENGTH, LEN_OFFSET_TO_PAYLOAD};
use crate::message_type::MessageType;
use crate::return_code::ReturnCode;

/// An owned SOME/IP message: header plus payload (spec §3 `Message`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub message_id: MessageId,
    pub request_id: RequestId,
    pub interface_version: u8,
    pub message_type: MessageType,
    pub return_code: ReturnCode,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(
        message_id: MessageId,
        request_id: RequestId,
        message_type: MessageType,
        payload: Vec<u8>,
    ) -> Message {
        Message {
            message_id,
            request_id,
            interface_version: 0,
            message_type,
            return_code: ReturnCode::Ok,
            payload,
        }
    }

    fn header(&self) -> SomeipHeader {
        SomeipHeader {
            message_id: self.message_id,
            request_id: self.request_id,
            interface_version: self.interface_version,
            message_type: self.message_type,
            return_code: self.return_code,
        }
    }

    /// The `length` field this message serializes to: `8 + |payload|`.
    pub fn length_field(&self) -> u32 {
        LEN_OFFSET_TO_PAYLOAD + self.payload.len() as u32
    }

    /// Encodes header and payload into `16 + |payload|` bytes. `length` is
    /// always recomputed from `payload.len()` (spec §4.1 encode contract).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LENGTH + self.payload.len());
        let mut header_bytes = [0u8; HEADER_LENGTH];
        self.header().write_to(&mut header_bytes, self.payload.len());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decodes a full message from a byte slice. Fails MALFORMED if the
    /// slice length does not exactly equal what `length` declares (spec
    /// §4.1 decode contract, third bullet).
    pub fn decode(bytes: &[u8]) -> Result<Message, HeaderError> {
        let (header, payload_len) = SomeipHeader::read(bytes)?;
        let expected_total = HEADER_LENGTH + payload_len;
        if bytes.len() != expected_total {
            return Err(HeaderError::LengthMismatch {
                expected: expected_total,
                actual: bytes.len(),
            });
        }
        Ok(Message {
            message_id: header.message_id,
            request_id: header.request_id,
            interface_version: header.interface_version,
            message_type: header.message_type,
            return_code: header.return_code,
            payload: bytes[HEADER_LENGTH..].to_vec(),
        })
    }

    /// Same as [`Message::decode`] but additionally validates
    /// `interface_version` against a configured expectation (spec §4.1,
    /// "the codec-strict variant validates it").
    pub fn decode_strict(bytes: &[u8], configured_interface_version: u8) -> Result<Message, HeaderError> {
        let message = Self::decode(bytes)?;
        if message.interface_version != configured_interface_version {
            return Err(HeaderError::WrongInterfaceVersion(
                message.interface_version,
                configured_interface_version,
            ));
        }
        Ok(message)
    }
}

/// A zero-copy view over a byte slice known to contain exactly one valid
/// SOME/IP message. Grounded on the upstream header-slice pattern: the
/// header fields are read on demand rather than copied out eagerly.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageSlice<'a> {
    slice: &'a [u8],
}

impl<'a> MessageSlice<'a> {
    /// Validates `slice` the same way [`Message::decode`] does, but borrows
    /// rather than copying the payload.
    pub fn from_slice(slice: &'a [u8]) -> Result<MessageSlice<'a>, HeaderError> {
        let (_, payload_len) = SomeipHeader::read(slice)?;
        let expected_total = HEADER_LENGTH + payload_len;
        if slice.len() != expected_total {
            return Err(HeaderError::LengthMismatch {
                expected: expected_total,
                actual: slice.len(),
            });
        }
        Ok(MessageSlice { slice })
    }

    pub fn message_id(&self) -> MessageId {
        MessageId::from_raw(u32::from_be_bytes([
            self.slice[0],
            self.slice[1],
            self.slice[2],
            self.slice[3],
        ]))
    }

    pub fn length(&self) -> u32 {
        u32::from_be_bytes([self.slice[4], self.slice[5], self.slice[6], self.slice[7]])
    }

    pub fn request_id(&self) -> RequestId {
        RequestId::from_raw(u32::from_be_bytes([
            self.slice[8],
            self.slice[9],
            self.slice[10],
            self.slice[11],
        ]))
    }

    pub fn interface_version(&self) -> u8 {
        self.slice[13]
    }

    pub fn message_type(&self) -> MessageType {
        MessageType::from_raw(self.slice[14]).expect("validated by from_slice")
    }

    pub fn return_code(&self) -> ReturnCode {
        ReturnCode::from_raw(self.slice[15]).expect("validated by from_slice")
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.slice[HEADER_LENGTH..]
    }

    pub fn to_owned_message(&self) -> Message {
        Message {
            message_id: self.message_id(),
            request_id: self.request_id(),
            interface_version: self.interface_version(),
            message_type: self.message_type(),
            return_code: self.return_code(),
            payload: self.payload().to_vec(),
        }
    }
}

/// Iterates consecutive SOME/IP messages packed back-to-back in a byte
/// slice, as seen on a TCP stream after framing (spec §4.8). Stops and
/// yields the error on the first malformed message; does not consume past
/// the point of failure.
pub struct MessageSliceIterator<'a> {
    rest: &'a [u8],
}

impl<'a> MessageSliceIterator<'a> {
    pub fn new(slice: &'a [u8]) -> MessageSliceIterator<'a> {
        MessageSliceIterator { rest: slice }
    }
}

impl<'a> Iterator for MessageSliceIterator<'a> {
    type Item = Result<MessageSlice<'a>, HeaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let (_, payload_len) = match SomeipHeader::read(self.rest) {
            Ok(ok) => ok,
            Err(e) => {
                self.rest = &[];
                return Some(Err(e));
            }
        };
        let total = HEADER_LENGTH + payload_len;
        if self.rest.len() < total {
            self.rest = &[];
            return Some(Err(HeaderError::LengthMismatch {
                expected: total,
                actual: self.rest.len(),
            }));
        }
        let (this, rest) = self.rest.split_at(total);
        self.rest = rest;
        Some(MessageSlice::from_slice(this))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message {
            message_id: MessageId::new(0x1234, 0x5678),
            request_id: RequestId::new(0x9abc, 0xdef0),
            interface_version: 0x01,
            message_type: MessageType::Request,
            return_code: ReturnCode::Ok,
            payload: vec![0x01, 0x02, 0x03, 0x04, 0x05],
        }
    }

    #[test]
    fn basic_rpc_round_trip() {
        let message = sample();
        let bytes = message.encode();
        assert_eq!(21, bytes.len());
        assert_eq!(message, Message::decode(&bytes).unwrap());
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let bytes = sample().encode();
        let truncated = &bytes[..bytes.len() - 1];
        assert_eq!(
            Err(HeaderError::LengthMismatch {
                expected: 21,
                actual: 20
            }),
            Message::decode(truncated)
        );
    }

    #[test]
    fn malformed_header_length_five() {
        let mut bytes = vec![0x12, 0x34, 0x56, 0x78, 0x00, 0x00, 0x00, 0x05];
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(Message::decode(&bytes).is_err());
    }

    #[test]
    fn slice_view_matches_owned_decode() {
        let message = sample();
        let bytes = message.encode();
        let view = MessageSlice::from_slice(&bytes).unwrap();
        assert_eq!(message.message_id, view.message_id());
        assert_eq!(message.request_id, view.request_id());
        assert_eq!(message.payload, view.payload());
        assert_eq!(message, view.to_owned_message());
    }

    #[test]
    fn slice_iterator_yields_consecutive_messages() {
        let a = sample();
        let mut b = sample();
        b.request_id = RequestId::new(0x9abc, 0xdef1);
        let mut stream = a.encode();
        stream.extend_from_slice(&b.encode());

        let messages: Vec<_> = MessageSliceIterator::new(&stream)
            .map(|r| r.unwrap().to_owned_message())
            .collect();
        assert_eq!(vec![a, b], messages);
    }

    #[test]
    fn decode_strict_checks_interface_version() {
        let message = sample();
        let bytes = message.encode();
        assert!(Message::decode_strict(&bytes, 0x01).is_ok());
        assert!(Message::decode_strict(&bytes, 0x02).is_err());
    }
}
