#![deny(unsafe_code)]
#![deny(warnings)]
//! Monotonic time base

/// Free-running microsecond counter
///
/// Implementations must never go backwards. Wall-clock corrections (e.g. an
/// SNTP sync writing the RTC) are applied elsewhere and must not touch this
/// counter.
pub trait MonotonicClock {
    /// Microseconds since an arbitrary, fixed origin (usually boot)
    fn now_micros(&self) -> u64;
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for &T {
    fn now_micros(&self) -> u64 {
        (**self).now_micros()
    }
}
