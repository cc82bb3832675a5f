use crate::err::SdReadError;
use crate::payload::{ByteReader, ByteWriter};

/// Number of bytes one SD entry occupies on the wire; all entry variants
/// share this size (spec §3 `Entry`, §4.6).
pub const ENTRY_LENGTH: usize = 16;

mod entry_type {
    pub const FIND_SERVICE: u8 = 0x00;
    pub const OFFER_SERVICE: u8 = 0x01;
    pub const SUBSCRIBE_EVENTGROUP: u8 = 0x06;
    pub const SUBSCRIBE_EVENTGROUP_ACK: u8 = 0x07;
}

/// Which options array (first or second option run) and how many entries
/// of it this entry references (spec §3 `index1, index2, num_opts1,
/// num_opts2`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct OptionRun {
    pub index1: u8,
    pub index2: u8,
    pub num_opts1: u8,
    pub num_opts2: u8,
}

impl OptionRun {
    pub const NONE: OptionRun = OptionRun {
        index1: 0,
        index2: 0,
        num_opts1: 0,
        num_opts2: 0,
    };
}

/// Common fields of a FindService/OfferService/StopOfferService entry
/// (spec §3 `Entry`).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ServiceEntry {
    pub options: OptionRun,
    pub service_id: u16,
    pub instance_id: u16,
    pub major_version: u8,
    /// Seconds until expiry; `0xFFFFFF` means infinite (spec §6). Never 0
    /// on a [`SdEntry::FindService`] or [`SdEntry::OfferService`] — a
    /// ttl of 0 decodes as [`SdEntry::StopOfferService`] instead (spec §3
    /// invariant: "an entry with ttl=0 conveys the stop form").
    pub ttl: u32,
    pub minor_version: u32,
}

/// Common fields of a SubscribeEventgroup/.../Ack/Nack entry (spec §3
/// `Entry`). `counter` and `initial_data_requested` are supplemental
/// AUTOSAR SD fields carried in the reserved eventgroup-entry byte; see
/// SPEC_FULL.md.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct EventgroupEntry {
    pub options: OptionRun,
    pub service_id: u16,
    pub instance_id: u16,
    pub major_version: u8,
    pub ttl: u32,
    pub initial_data_requested: bool,
    /// 4-bit counter distinguishing identical subscriptions from the same
    /// subscriber.
    pub counter: u8,
    pub eventgroup_id: u16,
}

/// One SD entry (spec §3 `Entry`). TTL-zero variants are distinct at the
/// type level rather than carried as a TTL of 0 on the base type, per spec
/// §9's guidance to model invalidity/alternate forms explicitly.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SdEntry {
    FindService(ServiceEntry),
    OfferService(ServiceEntry),
    StopOfferService(ServiceEntry),
    SubscribeEventgroup(EventgroupEntry),
    StopSubscribeEventgroup(EventgroupEntry),
    SubscribeEventgroupAck(EventgroupEntry),
    SubscribeEventgroupNack(EventgroupEntry),
}

impl SdEntry {
    pub fn options(&self) -> OptionRun {
        match self {
            SdEntry::FindService(e) | SdEntry::OfferService(e) | SdEntry::StopOfferService(e) => {
                e.options
            }
            SdEntry::SubscribeEventgroup(e)
            | SdEntry::StopSubscribeEventgroup(e)
            | SdEntry::SubscribeEventgroupAck(e)
            | SdEntry::SubscribeEventgroupNack(e) => e.options,
        }
    }

    pub fn service_id(&self) -> u16 {
        match self {
            SdEntry::FindService(e) | SdEntry::OfferService(e) | SdEntry::StopOfferService(e) => {
                e.service_id
            }
            SdEntry::SubscribeEventgroup(e)
            | SdEntry::StopSubscribeEventgroup(e)
            | SdEntry::SubscribeEventgroupAck(e)
            | SdEntry::SubscribeEventgroupNack(e) => e.service_id,
        }
    }

    pub fn instance_id(&self) -> u16 {
        match self {
            SdEntry::FindService(e) | SdEntry::OfferService(e) | SdEntry::StopOfferService(e) => {
                e.instance_id
            }
            SdEntry::SubscribeEventgroup(e)
            | SdEntry::StopSubscribeEventgroup(e)
            | SdEntry::SubscribeEventgroupAck(e)
            | SdEntry::SubscribeEventgroupNack(e) => e.instance_id,
        }
    }

    fn write_service(writer: &mut ByteWriter, type_byte: u8, ttl: u32, e: &ServiceEntry) {
        writer.write_u8(type_byte);
        writer.write_u8(e.options.index1);
        writer.write_u8(e.options.index2);
        writer.write_u8((e.options.num_opts1 << 4) | (e.options.num_opts2 & 0x0f));
        writer.write_u16(e.service_id);
        writer.write_u16(e.instance_id);
        writer.write_u8(e.major_version);
        let ttl_be = ttl.to_be_bytes();
        writer.write_bytes(&ttl_be[1..4]);
        writer.write_u32(e.minor_version);
    }

    fn write_eventgroup(writer: &mut ByteWriter, type_byte: u8, ttl: u32, e: &EventgroupEntry) {
        writer.write_u8(type_byte);
        writer.write_u8(e.options.index1);
        writer.write_u8(e.options.index2);
        writer.write_u8((e.options.num_opts1 << 4) | (e.options.num_opts2 & 0x0f));
        writer.write_u16(e.service_id);
        writer.write_u16(e.instance_id);
        writer.write_u8(e.major_version);
        let ttl_be = ttl.to_be_bytes();
        writer.write_bytes(&ttl_be[1..4]);
        writer.write_u8(0); // reserved
        let mut flags_and_counter = e.counter & 0x0f;
        if e.initial_data_requested {
            flags_and_counter |= 0x80;
        }
        writer.write_u8(flags_and_counter);
        writer.write_u16(e.eventgroup_id);
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        match self {
            SdEntry::FindService(e) => Self::write_service(writer, entry_type::FIND_SERVICE, e.ttl, e),
            SdEntry::OfferService(e) => {
                Self::write_service(writer, entry_type::OFFER_SERVICE, e.ttl, e)
            }
            SdEntry::StopOfferService(e) => {
                Self::write_service(writer, entry_type::OFFER_SERVICE, 0, e)
            }
            SdEntry::SubscribeEventgroup(e) => {
                Self::write_eventgroup(writer, entry_type::SUBSCRIBE_EVENTGROUP, e.ttl, e)
            }
            SdEntry::StopSubscribeEventgroup(e) => {
                Self::write_eventgroup(writer, entry_type::SUBSCRIBE_EVENTGROUP, 0, e)
            }
            SdEntry::SubscribeEventgroupAck(e) => {
                Self::write_eventgroup(writer, entry_type::SUBSCRIBE_EVENTGROUP_ACK, e.ttl, e)
            }
            SdEntry::SubscribeEventgroupNack(e) => {
                Self::write_eventgroup(writer, entry_type::SUBSCRIBE_EVENTGROUP_ACK, 0, e)
            }
        }
    }

    /// Reads exactly [`ENTRY_LENGTH`] bytes. An unenumerated type byte is
    /// skipped by the caller (spec §4.6: "an entry whose declared type byte
    /// is outside the enumerated set is skipped"), signalled here as `None`.
    pub fn read(reader: &mut ByteReader) -> Result<Option<SdEntry>, SdReadError> {
        let bytes = reader
            .read_bytes(ENTRY_LENGTH)
            .map_err(|_| SdReadError::TooShort)?;

        let type_byte = bytes[0];
        let options = OptionRun {
            index1: bytes[1],
            index2: bytes[2],
            num_opts1: bytes[3] >> 4,
            num_opts2: bytes[3] & 0x0f,
        };
        let service_id = u16::from_be_bytes([bytes[4], bytes[5]]);
        let instance_id = u16::from_be_bytes([bytes[6], bytes[7]]);
        let major_version = bytes[8];
        let ttl = u32::from_be_bytes([0, bytes[9], bytes[10], bytes[11]]);

        Ok(Some(match type_byte {
            entry_type::FIND_SERVICE => SdEntry::FindService(ServiceEntry {
                options,
                service_id,
                instance_id,
                major_version,
                ttl,
                minor_version: u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
            }),
            entry_type::OFFER_SERVICE => {
                let service = ServiceEntry {
                    options,
                    service_id,
                    instance_id,
                    major_version,
                    ttl,
                    minor_version: u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
                };
                if ttl == 0 {
                    SdEntry::StopOfferService(service)
                } else {
                    SdEntry::OfferService(service)
                }
            }
            entry_type::SUBSCRIBE_EVENTGROUP | entry_type::SUBSCRIBE_EVENTGROUP_ACK => {
                let eventgroup = EventgroupEntry {
                    options,
                    service_id,
                    instance_id,
                    major_version,
                    ttl,
                    initial_data_requested: bytes[13] & 0x80 != 0,
                    counter: bytes[13] & 0x0f,
                    eventgroup_id: u16::from_be_bytes([bytes[14], bytes[15]]),
                };
                match (type_byte, ttl == 0) {
                    (entry_type::SUBSCRIBE_EVENTGROUP, false) => {
                        SdEntry::SubscribeEventgroup(eventgroup)
                    }
                    (entry_type::SUBSCRIBE_EVENTGROUP, true) => {
                        SdEntry::StopSubscribeEventgroup(eventgroup)
                    }
                    (_, false) => SdEntry::SubscribeEventgroupAck(eventgroup),
                    (_, true) => SdEntry::SubscribeEventgroupNack(eventgroup),
                }
            }
            _ => return Ok(None),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(ttl: u32) -> ServiceEntry {
        ServiceEntry {
            options: OptionRun::NONE,
            service_id: 0x1111,
            instance_id: 0x0001,
            major_version: 1,
            ttl,
            minor_version: 0,
        }
    }

    fn eventgroup(ttl: u32) -> EventgroupEntry {
        EventgroupEntry {
            options: OptionRun::NONE,
            service_id: 0x1111,
            instance_id: 0x0001,
            major_version: 1,
            ttl,
            initial_data_requested: false,
            counter: 0,
            eventgroup_id: 0x0001,
        }
    }

    fn round_trip(entry: SdEntry) {
        let mut writer = ByteWriter::new();
        entry.write(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(ENTRY_LENGTH, bytes.len());

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(Some(entry), SdEntry::read(&mut reader).unwrap());
    }

    #[test]
    fn find_service_round_trips() {
        round_trip(SdEntry::FindService(service(3)));
    }

    #[test]
    fn offer_service_round_trips() {
        round_trip(SdEntry::OfferService(service(10)));
    }

    #[test]
    fn stop_offer_service_is_ttl_zero_offer() {
        round_trip(SdEntry::StopOfferService(service(0)));
    }

    #[test]
    fn subscribe_eventgroup_round_trips() {
        round_trip(SdEntry::SubscribeEventgroup(eventgroup(10)));
    }

    #[test]
    fn subscribe_ack_and_nack_round_trip() {
        round_trip(SdEntry::SubscribeEventgroupAck(eventgroup(10)));
        round_trip(SdEntry::SubscribeEventgroupNack(eventgroup(0)));
    }

    #[test]
    fn unknown_entry_type_is_skipped_not_erroring() {
        let mut bytes = [0u8; ENTRY_LENGTH];
        bytes[0] = 0xff;
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(None, SdEntry::read(&mut reader).unwrap());
    }

    #[test]
    fn too_short_entry_is_rejected() {
        let bytes = [0u8; ENTRY_LENGTH - 1];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(Err(SdReadError::TooShort), SdEntry::read(&mut reader));
    }
}
