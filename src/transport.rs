//! The transport contract the core consumes (spec §4.8). Socket I/O and
//! multicast-group membership are external collaborators, out of scope for
//! this crate (spec §1); this module only defines the interface boundary.

use std::net::Ipv4Addr;

/// Transport-layer protocol an [`Endpoint`] is reachable over.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
    MulticastUdp,
}

/// `(address, port, protocol)` triple identifying a transport peer (spec §4.8).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Endpoint {
    pub address: Ipv4Addr,
    pub port: u16,
    pub protocol: Protocol,
}

impl Endpoint {
    pub const fn new(address: Ipv4Addr, port: u16, protocol: Protocol) -> Endpoint {
        Endpoint {
            address,
            port,
            protocol,
        }
    }
}

/// Errors a transport implementation surfaces to the core (spec §7
/// NETWORK_ERROR). Carries only a message: the concrete transport (sockets,
/// simulated links, ...) owns the richer `std::io::Error`/equivalent.
#[derive(Debug, Clone, Eq, PartialEq, Hash, thiserror::Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// The send/receive/multicast contract the core requires of its transport
/// substrate (spec §4.8). A real implementation wraps UDP/TCP sockets; this
/// crate only depends on the trait.
pub trait Transport {
    /// Sends `bytes` to `endpoint`. For TCP-framed sends, `bytes` is exactly
    /// one SOME/IP message; for UDP, exactly one datagram.
    fn send(&self, bytes: &[u8], endpoint: Endpoint) -> Result<(), TransportError>;

    fn join_multicast(&self, group: Ipv4Addr, port: u16) -> Result<(), TransportError>;

    fn leave_multicast(&self, group: Ipv4Addr, port: u16) -> Result<(), TransportError>;
}

/// Callbacks a [`Transport`] implementation invokes on the core (spec §4.8).
/// Implementors must not re-enter the transport while handling a callback
/// (spec §9 "Callbacks and ownership").
pub trait TransportListener: Send + Sync {
    /// One fully framed payload arrived from `sender`. For TCP, the
    /// transport has already extracted exactly `16 + (length - 8)` bytes
    /// using the header's `length` field (spec §4.8, last bullet).
    fn on_receive(&self, bytes: &[u8], sender: Endpoint);

    fn on_connection_lost(&self, endpoint: Endpoint) {
        let _ = endpoint;
    }

    fn on_connection_established(&self, endpoint: Endpoint) {
        let _ = endpoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_value_comparable() {
        let a = Endpoint::new(Ipv4Addr::new(127, 0, 0, 1), 30509, Protocol::Udp);
        let b = Endpoint::new(Ipv4Addr::new(127, 0, 0, 1), 30509, Protocol::Udp);
        assert_eq!(a, b);
    }
}
