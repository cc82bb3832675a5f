use crate::err::HeaderError;

/// Reserved-range boundaries for return codes (spec §3, §7). `0x3f` is a gap
/// reserved by the upstream SOME/IP spec and is not valid on the wire.
mod ranges {
    pub const GENERIC_START: u8 = 0x0b;
    pub const GENERIC_END: u8 = 0x1f;
    pub const E2E_START: u8 = 0x20;
    pub const E2E_END: u8 = 0x3e;
    pub const RESERVED_GAP: u8 = 0x3f;
    pub const APPLICATION_START: u8 = 0x40;
}

/// Return code carried in a RESPONSE/ERROR frame (spec §3).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ReturnCode {
    Ok,
    NotOk,
    UnknownService,
    UnknownMethod,
    NotReady,
    NotReachable,
    Timeout,
    WrongProtocolVersion,
    WrongInterfaceVersion,
    MalformedMessage,
    WrongMessageType,
    /// `0x0b..=0x1f`, reserved for generic SOME/IP errors.
    Generic(u8),
    /// `0x20..=0x3e`, reserved for E2E protection errors (spec §1 Non-goals:
    /// E2E itself is out of scope, but the wire range must still round-trip).
    E2eReserved(u8),
    /// `0x40..=0xff`, application/interface specific errors.
    ApplicationError(u8),
}

impl ReturnCode {
    pub const fn raw(self) -> u8 {
        use ReturnCode::*;
        match self {
            Ok => 0x00,
            NotOk => 0x01,
            UnknownService => 0x02,
            UnknownMethod => 0x03,
            NotReady => 0x04,
            NotReachable => 0x05,
            Timeout => 0x06,
            WrongProtocolVersion => 0x07,
            WrongInterfaceVersion => 0x08,
            MalformedMessage => 0x09,
            WrongMessageType => 0x0a,
            Generic(v) => v,
            E2eReserved(v) => v,
            ApplicationError(v) => v,
        }
    }

    pub fn from_raw(raw: u8) -> Option<ReturnCode> {
        use ranges::*;
        use ReturnCode::*;
        Some(match raw {
            0x00 => Ok,
            0x01 => NotOk,
            0x02 => UnknownService,
            0x03 => UnknownMethod,
            0x04 => NotReady,
            0x05 => NotReachable,
            0x06 => Timeout,
            0x07 => WrongProtocolVersion,
            0x08 => WrongInterfaceVersion,
            0x09 => MalformedMessage,
            0x0a => WrongMessageType,
            v if (GENERIC_START..=GENERIC_END).contains(&v) => Generic(v),
            v if (E2E_START..=E2E_END).contains(&v) => E2eReserved(v),
            RESERVED_GAP => return None,
            v if v >= APPLICATION_START => ApplicationError(v),
            _ => return None,
        })
    }

    pub fn try_from_raw(raw: u8) -> Result<ReturnCode, HeaderError> {
        Self::from_raw(raw).ok_or(HeaderError::UnknownReturnCode(raw))
    }

    pub const fn is_error(self) -> bool {
        !matches!(self, ReturnCode::Ok)
    }
}

impl From<ReturnCode> for u8 {
    fn from(value: ReturnCode) -> u8 {
        value.raw()
    }
}

impl TryFrom<u8> for ReturnCode {
    type Error = HeaderError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_raw(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn into_u8(generic in 0x0bu8..=0x1f, e2e in 0x20u8..=0x3e, app in 0x40u8..=0xff) {
            let values = [
                (ReturnCode::Ok, 0x00),
                (ReturnCode::NotOk, 0x01),
                (ReturnCode::UnknownService, 0x02),
                (ReturnCode::UnknownMethod, 0x03),
                (ReturnCode::NotReady, 0x04),
                (ReturnCode::NotReachable, 0x05),
                (ReturnCode::Timeout, 0x06),
                (ReturnCode::WrongProtocolVersion, 0x07),
                (ReturnCode::WrongInterfaceVersion, 0x08),
                (ReturnCode::MalformedMessage, 0x09),
                (ReturnCode::WrongMessageType, 0x0a),
                (ReturnCode::Generic(generic), generic),
                (ReturnCode::E2eReserved(e2e), e2e),
                (ReturnCode::ApplicationError(app), app),
            ];
            for (value, expected) in values {
                let raw: u8 = value.into();
                prop_assert_eq!(raw, expected);
                prop_assert_eq!(Some(value), ReturnCode::from_raw(expected));
            }
        }
    }

    #[test]
    fn reserved_gap_is_rejected() {
        assert_eq!(None, ReturnCode::from_raw(0x3f));
        assert_eq!(
            Err(HeaderError::UnknownReturnCode(0x3f)),
            ReturnCode::try_from_raw(0x3f)
        );
    }
}
