use super::{AdcReader, Channel};

/// Oversampling and decimation front-end for an [`AdcReader`].
///
/// With `k` extra bits configured, every reading sums `4^k` raw conversions
/// and shifts the sum right by `k`, trading conversion time for `k` bits of
/// effective resolution. With `k == 0` a reading is a single raw conversion.
pub struct Oversampler<A> {
    adc: A,
    extra_bits: u8,
}

impl<A: AdcReader> Oversampler<A> {
    /// `extra_bits` must keep the result within a word; see
    /// [`StationConfig::validate`](crate::config::StationConfig::validate).
    pub const fn new(adc: A, extra_bits: u8) -> Self {
        Self { adc, extra_bits }
    }

    pub const fn extra_bits(&self) -> u8 {
        self.extra_bits
    }

    /// Take one effective-resolution reading of `channel`.
    pub fn take_sample(&mut self, channel: Channel) -> u16 {
        if self.extra_bits == 0 {
            return self.adc.convert(channel);
        }

        let conversions = 1u32 << (2 * self.extra_bits as u32);
        // 4^k raw 16-bit codes: wide enough for any valid k
        let mut total: u32 = 0;
        for _ in 0..conversions {
            total = total.saturating_add(self.adc.convert(channel) as u32);
        }

        u16::try_from(total >> self.extra_bits).unwrap_or(u16::MAX)
    }

    /// Access the underlying converter.
    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }
}
