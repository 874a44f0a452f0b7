#![deny(unsafe_code)]
#![deny(warnings)]
//! Facade configuration structures

use core::time::Duration;

/// Bytes the receive backlog can hold (matches a typical MQTT read buffer)
pub const BACKLOG_CAPACITY: usize = 2048;

/// What happens to received bytes that do not fit the armed read buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceivePolicy {
    /// Drop overflow and data that arrives while no read is armed
    Discard,
    /// Queue it in a fixed [`BACKLOG_CAPACITY`] backlog; drop what doesn't fit
    Backlog,
}

/// Timing and buffering knobs for [`SyncSocket`](crate::SyncSocket)
#[derive(Debug, Clone, Copy)]
pub struct FacadeConfig {
    /// Upper bound for DNS + TCP connect + TLS handshake
    pub handshake_timeout: Duration,
    /// Yield between event steps while connecting
    pub connect_poll_interval: Duration,
    /// Yield between event steps while reading
    pub io_poll_interval: Duration,
    /// Timeout used by the `embedded_io` adapter
    pub io_timeout: Duration,
    pub receive_policy: ReceivePolicy,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(50),
            connect_poll_interval: Duration::from_millis(10),
            io_poll_interval: Duration::from_millis(1),
            io_timeout: Duration::from_secs(30),
            receive_policy: ReceivePolicy::Discard,
        }
    }
}

impl FacadeConfig {
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set both poll intervals; zero turns every yield into a no-op delay
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.connect_poll_interval = interval;
        self.io_poll_interval = interval;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_receive_policy(mut self, policy: ReceivePolicy) -> Self {
        self.receive_policy = policy;
        self
    }
}
