//! Error types, one module per subsystem (mirrors the upstream `err/` layout:
//! small, focused error enums rather than one crate-wide kitchen sink).

mod header;
pub use header::*;

mod payload;
pub use payload::*;

mod session;
pub use session::*;

mod tp;
pub use tp::*;

mod sd;
pub use sd::*;

use thiserror::Error;

/// Umbrella error for call sites that genuinely need to handle failures from
/// more than one subsystem uniformly (e.g. the TP manager, which can surface
/// both header and TP-specific failures from a single `on_received` call).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SomeipError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Tp(#[from] TpError),

    #[error(transparent)]
    Sd(#[from] SdError),
}
