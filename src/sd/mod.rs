//! SOME/IP Service Discovery: wire codec (entries + options) and the
//! Server/Client state machines built on top of it (spec §4.6-§4.7).

mod entry;
mod message;
mod option;
mod service;

pub use entry::{EventgroupEntry, OptionRun, SdEntry, ServiceEntry, ENTRY_LENGTH};
pub use message::{SdFlags, SdMessage};
pub use option::{Ipv4EndpointData, SdOption, TransportProtocol};
pub use service::{RebootTracker, SdClient, SdServer, SdSessionAllocator, ServiceInstance};
