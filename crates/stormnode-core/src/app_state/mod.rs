//! Station state shared between the scheduler, edge handlers and the bus
//! responder

mod counters;

pub use counters::*;

use core::sync::atomic::{AtomicU16, Ordering};

use crate::sensors::{CHANNEL_COUNT, Channel};

/// Latest oversampled code of every analog channel.
///
/// Written only by the scheduler, read only by the responder. Each slot is a
/// single word, so loads and stores are atomic without a critical section.
pub struct ChannelReadings {
    words: [AtomicU16; CHANNEL_COUNT],
}

impl ChannelReadings {
    pub const fn new() -> Self {
        Self {
            words: [const { AtomicU16::new(0) }; CHANNEL_COUNT],
        }
    }

    pub fn store(&self, channel: Channel, code: u16) {
        self.words[channel.index()].store(code, Ordering::Relaxed);
    }

    pub fn load(&self, channel: Channel) -> u16 {
        self.words[channel.index()].load(Ordering::Relaxed)
    }

    /// All readings in [`Channel::ALL`] order.
    pub fn load_all(&self) -> [u16; CHANNEL_COUNT] {
        Channel::ALL.map(|channel| self.load(channel))
    }
}

impl Default for ChannelReadings {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the node reports to the host.
///
/// Meant to live in a `static` so the edge interrupt handlers can reach the
/// counters. The scheduler writes the readings, the handlers and the rain
/// detector bump the counters, and the responder reads both.
///
/// ```rust,ignore
/// const CONFIG: StationConfig = StationConfig::DEFAULT;
/// static STATION: StationState = StationState::new(CONFIG.resolution_max());
///
/// // GPIO interrupt handler
/// STATION.counters().on_lightning_edge();
/// ```
pub struct StationState {
    resolution: u16,
    readings: ChannelReadings,
    counters: EventCounters,
}

impl StationState {
    /// Create the zeroed station state for a given resolution constant.
    pub const fn new(resolution: u16) -> Self {
        Self {
            resolution,
            readings: ChannelReadings::new(),
            counters: EventCounters::new(),
        }
    }

    /// Maximum code of the effective ADC resolution.
    pub const fn resolution(&self) -> u16 {
        self.resolution
    }

    pub const fn readings(&self) -> &ChannelReadings {
        &self.readings
    }

    pub const fn counters(&self) -> &EventCounters {
        &self.counters
    }
}
