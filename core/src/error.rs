#![deny(unsafe_code)]
#![deny(warnings)]
//! Socket facade error types

use crate::credentials::CredentialError;

/// Errors surfaced by [`SyncSocket`](crate::SyncSocket) operations
///
/// `ReadTimeout` is the only recoverable kind. Everything else that comes
/// from the transport leaves the connection `Failed` or `Closed`; the caller
/// must reconnect from scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketError {
    /// Hostname lookup produced no address
    DnsFailure,
    /// Transport-level failure reported by the stack
    TransportError(i32),
    /// Handshake did not complete before the connect deadline
    HandshakeTimeout,
    /// Handshake rejected by the stack or the peer
    HandshakeFailure(i32),
    /// No data arrived before the read deadline
    ReadTimeout,
    /// The stack refused outgoing data
    WriteFailure,
    /// Peer closed the connection
    PeerClosed,
    /// Operation needs an established connection
    NotConnected,
    /// `connect` called while a connection is live
    AlreadyConnected,
    /// Certificate bundle failed validation
    InvalidCredentials(CredentialError),
}

impl SocketError {
    /// Whether the connection survives this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ReadTimeout)
    }
}

impl core::fmt::Display for SocketError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DnsFailure => write!(f, "DNS resolution failed"),
            Self::TransportError(code) => write!(f, "Transport error ({})", code),
            Self::HandshakeTimeout => write!(f, "TLS handshake timed out"),
            Self::HandshakeFailure(code) => write!(f, "TLS handshake failed ({})", code),
            Self::ReadTimeout => write!(f, "Read timeout"),
            Self::WriteFailure => write!(f, "Write failed"),
            Self::PeerClosed => write!(f, "Connection closed by peer"),
            Self::NotConnected => write!(f, "Not connected"),
            Self::AlreadyConnected => write!(f, "Already connected"),
            Self::InvalidCredentials(e) => write!(f, "Invalid credentials: {}", e),
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for SocketError {}

impl embedded_io::Error for SocketError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::ReadTimeout | Self::HandshakeTimeout => embedded_io::ErrorKind::TimedOut,
            Self::NotConnected => embedded_io::ErrorKind::NotConnected,
            Self::PeerClosed => embedded_io::ErrorKind::ConnectionReset,
            Self::TransportError(_) | Self::WriteFailure => embedded_io::ErrorKind::BrokenPipe,
            Self::InvalidCredentials(_) => embedded_io::ErrorKind::InvalidInput,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}
