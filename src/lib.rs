//! Core of a SOME/IP middleware stack: wire codec, service discovery,
//! segmentation/reassembly for oversized messages (SOME/IP-TP), and
//! session/RPC correlation.
//!
//! # Usage
//!
//! Add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! someip_core = "0.1.0"
//! ```
//!
//! # Example
//!
//! ```
//! use someip_core::{Message, MessageId, MessageType, RequestId};
//!
//! let message = Message::new(
//!     MessageId::new(0x1234, 0x5678),
//!     RequestId::new(0x9abc, 0xdef0),
//!     MessageType::Request,
//!     vec![0x01, 0x02, 0x03, 0x04, 0x05],
//! );
//! let bytes = message.encode();
//! assert_eq!(message, Message::decode(&bytes).unwrap());
//! ```
//!
//! Raw socket I/O, multicast-group management, and build/CLI scaffolding are
//! out of scope for this crate; see [`transport`] for the interface a
//! transport substrate implements.
//!
//! # References
//! * [SOME/IP Protocol Specification](https://www.autosar.org/fileadmin/standards/R22-11/FO/AUTOSAR_PRS_SOMEIPProtocol.pdf)
//! * [SOME/IP Service Discovery Protocol Specification](https://www.autosar.org/fileadmin/standards/R22-11/FO/AUTOSAR_PRS_SOMEIPServiceDiscoveryProtocol.pdf)

pub mod config;
pub mod err;
pub mod header;
pub mod message;
pub mod message_type;
pub mod payload;
pub mod return_code;
pub mod sd;
pub mod session;
pub mod tp;
pub mod transport;
pub mod worker;

pub use config::{Config, SdConfig, TpConfig};
pub use err::SomeipError;
pub use header::{MessageId, RequestId, SomeipHeader, HEADER_LENGTH, LEN_OFFSET_TO_PAYLOAD, PROTOCOL_VERSION, SD_MESSAGE_ID};
pub use message::{Message, MessageSlice, MessageSliceIterator};
pub use message_type::MessageType;
pub use return_code::ReturnCode;
pub use session::SessionManager;
pub use worker::PeriodicWorker;
