#![deny(unsafe_code)]
#![deny(warnings)]
//! Monotonic deadlines
//!
//! Every timeout in the crate is a [`Deadline`]: an absolute expiry instant
//! on the board's [`MonotonicClock`]. Because the clock is monotonic, an SNTP
//! correction of wall-clock time never stretches or shortens an armed
//! deadline.
//!
//! [`Countdown`] wraps a deadline in the rearmable timer interface that
//! embedded protocol clients (Paho-style `TimerCountdownMS` / `TimerLeftMS`)
//! expect.

use core::time::Duration;

use hal_abstractions::MonotonicClock;

/// Absolute expiry instant in clock microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline {
    expires_at: u64,
}

impl Deadline {
    /// Deadline `duration` from now
    ///
    /// Sub-microsecond remainders round up, so any non-zero duration yields a
    /// deadline that is not yet expired. Saturates instead of wrapping.
    pub fn arm<C: MonotonicClock + ?Sized>(clock: &C, duration: Duration) -> Self {
        let micros = u64::try_from(duration.as_nanos().div_ceil(1_000)).unwrap_or(u64::MAX);
        Self {
            expires_at: clock.now_micros().saturating_add(micros),
        }
    }

    /// Deadline at an absolute clock reading
    pub const fn at(expires_at_micros: u64) -> Self {
        Self {
            expires_at: expires_at_micros,
        }
    }

    pub const fn expires_at_micros(&self) -> u64 {
        self.expires_at
    }

    pub fn is_expired<C: MonotonicClock + ?Sized>(&self, clock: &C) -> bool {
        clock.now_micros() >= self.expires_at
    }

    /// Time left, floored at zero
    pub fn remaining<C: MonotonicClock + ?Sized>(&self, clock: &C) -> Duration {
        Duration::from_micros(self.expires_at.saturating_sub(clock.now_micros()))
    }
}

/// Rearmable countdown timer for protocol clients
///
/// A fresh countdown is already expired.
pub struct Countdown<C> {
    clock: C,
    deadline: Deadline,
}

impl<C: MonotonicClock> Countdown<C> {
    pub const fn new(clock: C) -> Self {
        Self {
            clock,
            deadline: Deadline::at(0),
        }
    }

    pub fn countdown_ms(&mut self, ms: u32) {
        self.deadline = Deadline::arm(&self.clock, Duration::from_millis(u64::from(ms)));
    }

    pub fn countdown(&mut self, secs: u32) {
        self.deadline = Deadline::arm(&self.clock, Duration::from_secs(u64::from(secs)));
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_expired(&self.clock)
    }

    /// Whole milliseconds left, floored at zero
    pub fn left_ms(&self) -> u32 {
        let left = self.deadline.remaining(&self.clock).as_millis();
        u32::try_from(left).unwrap_or(u32::MAX)
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }
}
