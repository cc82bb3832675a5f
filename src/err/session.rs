use thiserror::Error;

/// Errors from the session manager (spec §4.2).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionError {
    /// `correlate` was called for a (client_id, session_id) pair with no
    /// outstanding entry. The spec treats this as "caller handles as
    /// spurious" rather than a hard error, but callers that want to log it
    /// distinctly can match on this variant.
    #[error("no outstanding request for client {client_id:#06x} session {session_id:#06x}")]
    UnknownCorrelation { client_id: u16, session_id: u16 },
}
