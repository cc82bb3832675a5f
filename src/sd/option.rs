use std::net::Ipv4Addr;

use crate::err::SdReadError;
use crate::payload::{ByteReader, ByteWriter};

/// L4 protocol carried by endpoint/multicast SD options (spec §3 `Option`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TransportProtocol {
    Udp,
    Tcp,
}

impl TransportProtocol {
    fn raw(self) -> u8 {
        match self {
            TransportProtocol::Udp => 0x11,
            TransportProtocol::Tcp => 0x06,
        }
    }
}

mod option_type {
    pub const CONFIGURATION: u8 = 0x01;
    pub const LOAD_BALANCING: u8 = 0x02;
    pub const IPV4_ENDPOINT: u8 = 0x04;
    pub const IPV4_MULTICAST: u8 = 0x14;
    pub const IPV4_SD_ENDPOINT: u8 = 0x24;
}

/// An `IPv4Endpoint`/`IPv4Multicast`/`IPv4SdEndpoint` option's address and
/// reachability (spec §3 `Option` variants).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Ipv4EndpointData {
    pub address: Ipv4Addr,
    pub protocol: TransportProtocol,
    pub port: u16,
}

impl Ipv4EndpointData {
    fn read(bytes: &[u8; 8]) -> Ipv4EndpointData {
        let protocol = if bytes[5] == TransportProtocol::Tcp.raw() {
            TransportProtocol::Tcp
        } else {
            TransportProtocol::Udp
        };
        Ipv4EndpointData {
            address: Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            protocol,
            port: u16::from_be_bytes([bytes[6], bytes[7]]),
        }
    }

    fn write(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.address.octets());
        writer.write_u8(0); // reserved
        writer.write_u8(self.protocol.raw());
        writer.write_u16(self.port);
    }
}

/// SD options as enumerated in spec §3 (no E2E/vendor extensions; spec §1
/// Non-goals).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SdOption {
    Ipv4Endpoint(Ipv4EndpointData),
    Ipv4Multicast(Ipv4EndpointData),
    Ipv4SdEndpoint(Ipv4EndpointData),
    /// DNS-SD style configuration strings (spec §3).
    Configuration(Vec<u8>),
    LoadBalancing { priority: u16, weight: u16 },
    /// An option whose type byte is not in the enumerated set. Interop
    /// policy keeps its raw bytes so option indices stay aligned, but skips
    /// it for application purposes (spec §4.6: "unknown option types are
    /// skipped but do not abort parsing").
    Unknown { option_type: u8, payload: Vec<u8> },
}

impl SdOption {
    /// Bytes this option occupies on the wire, header included (`type`,
    /// `reserved`, `length` plus the option's own payload).
    pub fn wire_len(&self) -> usize {
        4 + self.payload_len()
    }

    fn payload_len(&self) -> usize {
        match self {
            SdOption::Ipv4Endpoint(_) | SdOption::Ipv4Multicast(_) | SdOption::Ipv4SdEndpoint(_) => 8,
            SdOption::Configuration(s) => s.len(),
            SdOption::LoadBalancing { .. } => 4,
            SdOption::Unknown { payload, .. } => payload.len(),
        }
    }

    fn option_type(&self) -> u8 {
        match self {
            SdOption::Ipv4Endpoint(_) => option_type::IPV4_ENDPOINT,
            SdOption::Ipv4Multicast(_) => option_type::IPV4_MULTICAST,
            SdOption::Ipv4SdEndpoint(_) => option_type::IPV4_SD_ENDPOINT,
            SdOption::Configuration(_) => option_type::CONFIGURATION,
            SdOption::LoadBalancing { .. } => option_type::LOAD_BALANCING,
            SdOption::Unknown { option_type, .. } => *option_type,
        }
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_u16(self.payload_len() as u16);
        writer.write_u8(self.option_type());
        writer.write_u8(0); // reserved
        match self {
            SdOption::Ipv4Endpoint(d) | SdOption::Ipv4Multicast(d) | SdOption::Ipv4SdEndpoint(d) => {
                d.write(writer)
            }
            SdOption::Configuration(s) => writer.write_bytes(s),
            SdOption::LoadBalancing { priority, weight } => {
                writer.write_u16(*priority);
                writer.write_u16(*weight);
            }
            SdOption::Unknown { payload, .. } => writer.write_bytes(payload),
        }
    }

    /// Reads one option from `reader`, returning the option and the number
    /// of bytes consumed (spec §4.6 option header: type, reserved, length).
    pub fn read(reader: &mut ByteReader) -> Result<(usize, SdOption), SdReadError> {
        let offset = reader.position();
        let length = reader
            .read_u16()
            .map_err(|_| SdReadError::OptionLengthOutOfBounds { offset })? as usize;
        let option_type = reader
            .read_u8()
            .map_err(|_| SdReadError::OptionLengthOutOfBounds { offset })?;
        let _reserved = reader
            .read_u8()
            .map_err(|_| SdReadError::OptionLengthOutOfBounds { offset })?;
        let payload = reader
            .read_bytes(length)
            .map_err(|_| SdReadError::OptionLengthOutOfBounds { offset })?;

        let option = match option_type {
            option_type::IPV4_ENDPOINT if length == 8 => {
                SdOption::Ipv4Endpoint(Ipv4EndpointData::read(payload.try_into().unwrap()))
            }
            option_type::IPV4_MULTICAST if length == 8 => {
                SdOption::Ipv4Multicast(Ipv4EndpointData::read(payload.try_into().unwrap()))
            }
            option_type::IPV4_SD_ENDPOINT if length == 8 => {
                SdOption::Ipv4SdEndpoint(Ipv4EndpointData::read(payload.try_into().unwrap()))
            }
            option_type::CONFIGURATION => SdOption::Configuration(payload.to_vec()),
            option_type::LOAD_BALANCING if length == 4 => SdOption::LoadBalancing {
                priority: u16::from_be_bytes([payload[0], payload[1]]),
                weight: u16::from_be_bytes([payload[2], payload[3]]),
            },
            _ => SdOption::Unknown {
                option_type,
                payload: payload.to_vec(),
            },
        };
        Ok((4 + length, option))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(option: SdOption) {
        let mut writer = ByteWriter::new();
        option.write(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), option.wire_len());

        let mut reader = ByteReader::new(&bytes);
        let (consumed, decoded) = SdOption::read(&mut reader).unwrap();
        assert_eq!(bytes.len(), consumed);
        assert_eq!(option, decoded);
    }

    #[test]
    fn ipv4_endpoint_round_trips() {
        round_trip(SdOption::Ipv4Endpoint(Ipv4EndpointData {
            address: Ipv4Addr::new(192, 168, 0, 1),
            protocol: TransportProtocol::Udp,
            port: 30509,
        }));
    }

    #[test]
    fn ipv4_multicast_round_trips() {
        round_trip(SdOption::Ipv4Multicast(Ipv4EndpointData {
            address: Ipv4Addr::new(224, 244, 224, 245),
            protocol: TransportProtocol::Udp,
            port: 30490,
        }));
    }

    #[test]
    fn configuration_round_trips() {
        round_trip(SdOption::Configuration(b"key=value".to_vec()));
    }

    #[test]
    fn load_balancing_round_trips() {
        round_trip(SdOption::LoadBalancing {
            priority: 1,
            weight: 100,
        });
    }

    #[test]
    fn unknown_option_is_skipped_but_preserves_index_alignment() {
        let mut writer = ByteWriter::new();
        writer.write_u16(2);
        writer.write_u8(0xfe);
        writer.write_u8(0);
        writer.write_u16(0xbeef);
        let bytes = writer.into_bytes();

        let mut reader = ByteReader::new(&bytes);
        let (consumed, option) = SdOption::read(&mut reader).unwrap();
        assert_eq!(6, consumed);
        assert_eq!(
            SdOption::Unknown {
                option_type: 0xfe,
                payload: vec![0xbe, 0xef],
            },
            option
        );
    }
}
