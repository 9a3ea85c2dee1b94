//! Firmware configuration and the global station state
//!
//! Re-exports the hardware-independent app state from `stormnode_core` and
//! adds ESP32-S3 hardware bindings.

mod hardware;

pub use hardware::*;

// Re-export all shared app state types from stormnode-core
pub use stormnode_core::app_state::*;

use embassy_time::Duration;
use stormnode_core::config::StationConfig;

/// ESP32-S3 ADC1 is 12-bit; two oversampled bits give a 14-bit reading.
pub const CONFIG: StationConfig = StationConfig {
    base_bits: 12,
    oversample_bits: 2,
    tick: Duration::from_millis(120),
    epoch_ticks: 8,
    bus_address: 0x21,
};

/// Shared by the scheduler, the GPIO interrupt handler and the bus responder.
pub static STATION: StationState = StationState::new(CONFIG.resolution_max());
