//! Platform-agnostic core logic for IoT firmware
//!
//! This crate turns a callback-driven, single-threaded network/TLS stack into
//! a blocking socket (`connect`, `read(timeout)`, `write(timeout)`,
//! `disconnect`) for protocol clients that were written against blocking
//! sockets. It has NO hardware dependencies; boards supply the
//! `hal-abstractions` capabilities.
//!
//! - **`deadline`**: monotonic deadlines and the protocol client's countdown
//! - **`entropy`**: bit-at-a-time hardware noise packed for the TLS RNG
//! - **`credentials`**: mTLS certificate bundle and PEM sanity checks
//! - **`connection`**: connection state, shared context, stack event dispatch
//! - **`facade`**: the blocking socket itself
//! - **`sim`**: simulated stack, clock and delay (tests / `sim` feature)
//!
//! ## Usage
//!
//! ```ignore
//! let mut socket = SyncSocket::new(stack, clock, delay, FacadeConfig::default());
//! socket.connect("broker.example", 8883, &bundle)?;
//! socket.write(&connect_packet, Duration::from_secs(5))?;
//! let n = socket.read(&mut buf, Duration::from_secs(30))?;
//! socket.disconnect();
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This must go FIRST so that all the other modules see its macros.
mod fmt;

pub mod config;
pub mod connection;
pub mod credentials;
pub mod deadline;
pub mod entropy;
pub mod error;
pub mod facade;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::{FacadeConfig, ReceivePolicy};
pub use connection::{ConnectionContext, ConnectionState};
pub use credentials::{CertificateBundle, CredentialError};
pub use deadline::{Countdown, Deadline};
pub use entropy::{EntropyError, HardwareEntropy};
pub use error::SocketError;
pub use facade::SyncSocket;
