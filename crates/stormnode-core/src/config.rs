//! Compile-time station configuration
//!
//! Every tunable of the node lives in one [`StationConfig`] value that is built
//! once (usually as a `const`) and handed to the scheduler and sampler. The
//! derived quantities are `const fn` so the shared [`StationState`] can be built
//! in a `static`.
//!
//! [`StationState`]: crate::app_state::StationState

use embassy_time::Duration;
use thiserror_no_std::Error;

/// Widest effective resolution that still fits a bus word.
pub const MAX_EFFECTIVE_BITS: u8 = 16;

/// Lowest non-reserved 7-bit bus address.
pub const BUS_ADDRESS_MIN: u8 = 0x08;

/// Highest non-reserved 7-bit bus address.
pub const BUS_ADDRESS_MAX: u8 = 0x77;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ADC base resolution of {0} bits is out of range (1..=16)")]
    BaseBits(u8),
    #[error("{base} + {extra} oversampled bits do not fit a 16-bit word")]
    EffectiveBits { base: u8, extra: u8 },
    #[error("epoch threshold must be at least one tick")]
    EpochTicks,
    #[error("tick duration must be non-zero")]
    Tick,
    #[error("bus address {0:#04x} is reserved or not 7-bit")]
    BusAddress(u8),
}

/// Immutable configuration of the sampling engine and bus responder.
///
/// The product `tick * epoch_ticks` must match the interval at which the host
/// polls the node. The core cannot enforce this; see
/// [`StationConfig::matches_poll_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationConfig {
    /// Native resolution of the ADC in bits
    pub base_bits: u8,
    /// Extra bits gained by oversampling (`4^k` conversions per reading)
    pub oversample_bits: u8,
    /// Length of one power-saving sleep
    pub tick: Duration,
    /// Number of ticks between two full sampling passes
    pub epoch_ticks: u16,
    /// 7-bit responder address on the bus
    pub bus_address: u8,
}

impl StationConfig {
    /// Reference node: 10-bit ADC, two extra bits, 120 ms ticks, ~1 s epoch.
    pub const DEFAULT: Self = Self {
        base_bits: 10,
        oversample_bits: 2,
        tick: Duration::from_millis(120),
        epoch_ticks: 8,
        bus_address: 0x21,
    };

    /// Check that every field is within the range the core supports.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.base_bits == 0 || self.base_bits > MAX_EFFECTIVE_BITS {
            return Err(ConfigError::BaseBits(self.base_bits));
        }
        if self.base_bits as u16 + self.oversample_bits as u16 > MAX_EFFECTIVE_BITS as u16 {
            return Err(ConfigError::EffectiveBits {
                base: self.base_bits,
                extra: self.oversample_bits,
            });
        }
        if self.epoch_ticks == 0 {
            return Err(ConfigError::EpochTicks);
        }
        if self.tick.as_ticks() == 0 {
            return Err(ConfigError::Tick);
        }
        if self.bus_address < BUS_ADDRESS_MIN || self.bus_address > BUS_ADDRESS_MAX {
            return Err(ConfigError::BusAddress(self.bus_address));
        }
        Ok(())
    }

    /// Effective resolution in bits after oversampling.
    pub const fn effective_bits(&self) -> u8 {
        self.base_bits + self.oversample_bits
    }

    /// Largest code a channel reading can hold: `2^(base + extra) - 1`.
    ///
    /// Saturates at `u16::MAX` for configurations that [`validate`](Self::validate)
    /// would reject.
    pub const fn resolution_max(&self) -> u16 {
        let bits = self.effective_bits();
        if bits >= MAX_EFFECTIVE_BITS {
            u16::MAX
        } else {
            ((1u32 << bits) - 1) as u16
        }
    }

    /// Raw conversions accumulated per reading (`4^k`).
    pub const fn samples_per_reading(&self) -> u32 {
        1u32 << (2 * self.oversample_bits as u32)
    }

    /// Time between two sampling passes.
    pub const fn epoch_duration(&self) -> Duration {
        Duration::from_ticks(self.tick.as_ticks() * self.epoch_ticks as u64)
    }

    /// Whether the sampling epoch lines up with the host's polling interval.
    pub fn matches_poll_interval(&self, host_interval: Duration, tolerance: Duration) -> bool {
        let epoch = self.epoch_duration();
        let diff = if epoch > host_interval {
            epoch - host_interval
        } else {
            host_interval - epoch
        };
        diff <= tolerance
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(StationConfig::DEFAULT.validate(), Ok(()));
    }

    #[test]
    fn test_resolution_max() {
        assert_eq!(StationConfig::DEFAULT.resolution_max(), 4095);

        let thirteen_bits = StationConfig {
            oversample_bits: 3,
            ..StationConfig::DEFAULT
        };
        assert_eq!(thirteen_bits.resolution_max(), 8191);

        let no_oversampling = StationConfig {
            oversample_bits: 0,
            ..StationConfig::DEFAULT
        };
        assert_eq!(no_oversampling.resolution_max(), 1023);

        let full_word = StationConfig {
            base_bits: 12,
            oversample_bits: 4,
            ..StationConfig::DEFAULT
        };
        assert_eq!(full_word.resolution_max(), u16::MAX);
        assert_eq!(full_word.validate(), Ok(()));
    }

    #[test]
    fn test_samples_per_reading() {
        assert_eq!(StationConfig::DEFAULT.samples_per_reading(), 16);

        let config = StationConfig {
            oversample_bits: 0,
            ..StationConfig::DEFAULT
        };
        assert_eq!(config.samples_per_reading(), 1);
    }

    #[test]
    fn test_rejects_oversized_resolution() {
        let config = StationConfig {
            base_bits: 12,
            oversample_bits: 5,
            ..StationConfig::DEFAULT
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EffectiveBits { base: 12, extra: 5 })
        );
    }

    #[test]
    fn test_rejects_bad_fields() {
        let zero_base = StationConfig {
            base_bits: 0,
            ..StationConfig::DEFAULT
        };
        assert_eq!(zero_base.validate(), Err(ConfigError::BaseBits(0)));

        let no_epoch = StationConfig {
            epoch_ticks: 0,
            ..StationConfig::DEFAULT
        };
        assert_eq!(no_epoch.validate(), Err(ConfigError::EpochTicks));

        let no_tick = StationConfig {
            tick: Duration::from_ticks(0),
            ..StationConfig::DEFAULT
        };
        assert_eq!(no_tick.validate(), Err(ConfigError::Tick));

        let reserved = StationConfig {
            bus_address: 0x78,
            ..StationConfig::DEFAULT
        };
        assert_eq!(reserved.validate(), Err(ConfigError::BusAddress(0x78)));
    }

    #[test]
    fn test_epoch_matches_host_poll() {
        let config = StationConfig::DEFAULT;
        assert_eq!(config.epoch_duration(), Duration::from_millis(960));
        assert!(config.matches_poll_interval(Duration::from_secs(1), Duration::from_millis(50)));
        assert!(!config.matches_poll_interval(Duration::from_secs(5), Duration::from_millis(50)));
    }
}
