//! Session-level error types (`spec.md` §7).
//!
//! `ProtocolError` (in [`crate::protocol`]) covers codec and framing
//! violations. This module adds the transport and application-visible
//! kinds around it, and marks which ones are terminal for a [`Session`](
//! crate::session::Session).

use crate::protocol::ProtocolError;

/// Errors a [`Session`](crate::session::Session) can surface.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The socket closed or the peer reset the connection. Terminal.
    #[error("transport closed")]
    TransportClosed,

    /// A framing or codec violation, or the handshake magic didn't match.
    /// Terminal.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A `transition()` call's memento exceeded the 10240-byte limit. Not
    /// terminal — the caller observes the failure and the session
    /// continues.
    #[error("memento of {0} bytes exceeds the 10240 byte limit")]
    MementoTooLarge(usize),
}

impl SessionError {
    /// Whether this error forces the session into `Draining`/`Dead`
    /// (`spec.md` §7: "transport and protocol errors immediately
    /// transition the session to Draining").
    pub fn is_terminal(&self) -> bool {
        match self {
            SessionError::TransportClosed | SessionError::Protocol(_) => true,
            SessionError::MementoTooLarge(_) => false,
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Protocol(ProtocolError::Io(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memento_too_large_is_not_terminal() {
        assert!(!SessionError::MementoTooLarge(20_000).is_terminal());
    }

    #[test]
    fn transport_and_protocol_errors_are_terminal() {
        assert!(SessionError::TransportClosed.is_terminal());
        assert!(SessionError::Protocol(ProtocolError::BadChunk).is_terminal());
    }
}
