#![deny(unsafe_code)]
#![deny(warnings)]
//! Raw hardware noise source
//!
//! Some parts (e.g. ring-oscillator based generators) only expose a single
//! random bit per register read. The `sync-socket` entropy adapter packs these
//! bits into bytes for the TLS library.

/// A source of hardware random bits
pub trait RandomBitSource {
    /// Whether the noise source is clocked and usable
    ///
    /// Checked once when the entropy adapter is constructed.
    fn is_available(&mut self) -> bool;

    /// Sample one bit. Must return promptly; never blocks.
    fn random_bit(&mut self) -> bool;
}

impl<T: RandomBitSource + ?Sized> RandomBitSource for &mut T {
    fn is_available(&mut self) -> bool {
        (**self).is_available()
    }

    fn random_bit(&mut self) -> bool {
        (**self).random_bit()
    }
}
