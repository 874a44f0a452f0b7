#![deny(unsafe_code)]
#![deny(warnings)]
//! Hardware entropy for the TLS library
//!
//! Wraps a [`RandomBitSource`] (e.g. the RP2040 ring oscillator's
//! `RANDOMBIT` register) and packs eight samples into each output byte, first
//! sample in the most significant bit. The result implements
//! `rand_core::RngCore + CryptoRng`, which is what TLS crypto providers take.
//!
//! Availability is checked once at construction. A missing noise source is a
//! board configuration error, and TLS cannot run without it, so it is
//! reported there instead of on every draw.

use hal_abstractions::RandomBitSource;
use rand_core::{CryptoRng, RngCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntropyError {
    /// The hardware noise source is not clocked or not present
    SourceUnavailable,
}

impl core::fmt::Display for EntropyError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SourceUnavailable => write!(f, "Hardware entropy source unavailable"),
        }
    }
}

impl core::error::Error for EntropyError {}

/// Byte-oriented RNG over a bit-at-a-time hardware source
pub struct HardwareEntropy<B> {
    source: B,
}

impl<B: RandomBitSource> HardwareEntropy<B> {
    pub fn new(mut source: B) -> Result<Self, EntropyError> {
        if !source.is_available() {
            error!("Hardware entropy source unavailable - TLS cannot start");
            return Err(EntropyError::SourceUnavailable);
        }
        info!("Hardware entropy source ready");
        Ok(Self { source })
    }

    /// Fill `buffer` completely and return the number of bytes written
    pub fn fill_random(&mut self, buffer: &mut [u8]) -> usize {
        for byte in buffer.iter_mut() {
            *byte = self.random_byte();
        }
        buffer.len()
    }

    fn random_byte(&mut self) -> u8 {
        let source = &mut self.source;
        (0..8).fold(0u8, |byte, _| (byte << 1) | u8::from(source.random_bit()))
    }

    pub fn into_inner(self) -> B {
        self.source
    }
}

impl<B: RandomBitSource> RngCore for HardwareEntropy<B> {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.fill_random(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_random(dest);
        Ok(())
    }
}

impl<B: RandomBitSource> CryptoRng for HardwareEntropy<B> {}
