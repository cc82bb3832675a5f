use std::net::Ipv4Addr;
use std::time::Duration;

/// Every tunable enumerated in spec §6, collected into one struct. No
/// file/env parsing is in scope (spec §4.9 "Configuration"); callers build
/// this with plain struct literals or the builder methods below, mirroring
/// the teacher's `TpBufConfig::new`.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub sd: SdConfig,
    pub tp: TpConfig,
    /// `interface_version` byte this node expects on every decoded message.
    pub interface_version: u8,
    /// Per-process client_id; must be unique within the ECU (spec §6).
    pub client_id: u16,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            sd: SdConfig::default(),
            tp: TpConfig::default(),
            interface_version: 1,
            client_id: 0,
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    pub fn with_client_id(mut self, client_id: u16) -> Config {
        self.client_id = client_id;
        self
    }

    pub fn with_interface_version(mut self, interface_version: u8) -> Config {
        self.interface_version = interface_version;
        self
    }
}

/// SD multicast/timing tunables (spec §4.7, §6).
#[derive(Clone, Debug, PartialEq)]
pub struct SdConfig {
    pub multicast_address: Ipv4Addr,
    pub multicast_port: u16,
    pub unicast_address: Ipv4Addr,
    pub unicast_port: u16,

    /// Upper bound of the randomized wait before the first offer/find is
    /// sent (spec §4.7 INITIAL_DELAY).
    pub initial_delay: Duration,
    /// First retry interval in the repetition phase; doubles on each
    /// retry up to `repetition_max` (spec §4.7 REPETITION_BASE_DELAY).
    pub repetition_base_delay: Duration,
    /// Ceiling the exponentially growing repetition interval is clamped to.
    pub repetition_max: Duration,
    /// Number of repetition-phase retransmissions before entering Main
    /// (spec §4.7 REPETITIONS_MAX).
    pub repetitions_max: u32,
    /// Steady-state re-announce period once in Main (spec §4.7
    /// CYCLIC_OFFER_DELAY).
    pub cyclic_offer_delay: Duration,
}

impl Default for SdConfig {
    fn default() -> SdConfig {
        SdConfig {
            multicast_address: Ipv4Addr::new(224, 244, 224, 245),
            multicast_port: 30490,
            unicast_address: Ipv4Addr::new(0, 0, 0, 0),
            unicast_port: 30491,
            initial_delay: Duration::from_millis(500),
            repetition_base_delay: Duration::from_millis(200),
            repetition_max: Duration::from_secs(3),
            repetitions_max: 3,
            cyclic_offer_delay: Duration::from_secs(2),
        }
    }
}

/// TP segmentation/reassembly tunables (spec §4.3-4.5, §6).
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct TpConfig {
    /// Largest segment payload-on-the-wire size, header included (spec §6
    /// default 1392 bytes, payload-aligned on 16).
    pub max_segment_size: usize,
    /// Largest total message payload a transfer/reassembly is allowed to
    /// grow to (spec §4.4 step 1, §7 MESSAGE_TOO_LARGE).
    pub max_message_size: u32,
    /// Bound on simultaneously active send-transfers (spec §4.5, §7
    /// RESOURCE_EXHAUSTED).
    pub max_concurrent_transfers: usize,
    /// A reassembly buffer is purged if this much time passes without
    /// completing (spec §4.4 step 6).
    pub reassembly_timeout: Duration,
}

impl Default for TpConfig {
    fn default() -> TpConfig {
        TpConfig {
            max_segment_size: 1392,
            max_message_size: 16 * 1024 * 1024,
            max_concurrent_transfers: 64,
            reassembly_timeout: Duration::from_millis(5000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(1392, config.tp.max_segment_size);
        assert_eq!(Ipv4Addr::new(224, 244, 224, 245), config.sd.multicast_address);
        assert_eq!(30490, config.sd.multicast_port);
    }

    #[test]
    fn builder_methods_set_fields() {
        let config = Config::new().with_client_id(0x1000).with_interface_version(2);
        assert_eq!(0x1000, config.client_id);
        assert_eq!(2, config.interface_version);
    }
}
