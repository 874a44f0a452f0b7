//! Hardware abstraction traits for IoT firmware
//!
//! This crate defines traits that abstract over hardware differences
//! between boards. BSPs implement these traits; the platform-agnostic
//! `sync-socket` crate consumes them.
//!
//! - **`clock`**: monotonic microsecond time base
//! - **`rng`**: raw hardware noise source (one bit per sample)
//! - **`network`**: callback-driven network/TLS stack and its event sink

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod network;
pub mod rng;

pub use clock::MonotonicClock;
pub use network::{EventHandler, NetworkStack, Resolution, StackError, TlsSessionConfig};
pub use rng::RandomBitSource;
