#![deny(unsafe_code)]
#![deny(warnings)]
//! Connection state machine

use crate::error::SocketError;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    /// Fresh context, nothing started
    Idle,

    /// Hostname lookup in flight
    Resolving,

    /// Transport connect + TLS handshake in flight
    Handshaking,

    /// Ready for application data
    Established,

    /// Closed by us or by the peer
    Closed,

    /// Gave up; the reason is what the caller was told
    Failed(SocketError),
}

impl ConnectionState {
    /// `Closed` and `Failed` are never left except by re-creating the context
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }

    pub fn is_established(&self) -> bool {
        matches!(self, Self::Established)
    }

    /// Check if transition is valid
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Idle, Resolving)
                | (Resolving, Handshaking)
                | (Handshaking, Established)
                | (_, Closed)
                | (_, Failed(_))
        )
    }

    /// Transition to new state; returns `false` (state unchanged) if invalid
    pub fn transition(&mut self, next: ConnectionState) -> bool {
        if !self.can_transition_to(next) {
            return false;
        }
        *self = next;
        true
    }
}

impl core::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Resolving => write!(f, "resolving"),
            Self::Handshaking => write!(f, "handshaking"),
            Self::Established => write!(f, "established"),
            Self::Closed => write!(f, "closed"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
