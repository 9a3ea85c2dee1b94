//! Epoch-scoped event counters shared with interrupt handlers

use core::cell::Cell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;

/// Event counts accumulated since the last successful transfer.
///
/// Each count is one bus word and wraps on overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub lightning: u16,
    pub wind_speed: u16,
    pub rain: u16,
}

impl EventCounts {
    pub const ZERO: Self = Self {
        lightning: 0,
        wind_speed: 0,
        rain: 0,
    };

    /// Field-wise wrapping sum.
    pub const fn merged(self, other: Self) -> Self {
        Self {
            lightning: self.lightning.wrapping_add(other.lightning),
            wind_speed: self.wind_speed.wrapping_add(other.wind_speed),
            rain: self.rain.wrapping_add(other.rain),
        }
    }
}

/// Lightning, wind-speed and rain-flip counters.
///
/// All access goes through a critical section, so an edge handler can never
/// land between the read and the reset performed by [`take`](Self::take).
/// The edge handlers only increment; they are safe to call from interrupt
/// context and never block.
pub struct EventCounters {
    counts: CriticalSectionMutex<Cell<EventCounts>>,
}

impl EventCounters {
    pub const fn new() -> Self {
        Self {
            counts: CriticalSectionMutex::new(Cell::new(EventCounts::ZERO)),
        }
    }

    /// Lightning detector falling edge.
    #[inline]
    pub fn on_lightning_edge(&self) {
        self.update(|c| c.lightning = c.lightning.wrapping_add(1));
    }

    /// Anemometer falling edge.
    #[inline]
    pub fn on_wind_speed_edge(&self) {
        self.update(|c| c.wind_speed = c.wind_speed.wrapping_add(1));
    }

    /// Rain bucket level change, from the polled detector.
    #[inline]
    pub fn on_rain_flip(&self) {
        self.update(|c| c.rain = c.rain.wrapping_add(1));
    }

    /// Read all three counters and reset them to zero in one critical section.
    pub fn take(&self) -> EventCounts {
        self.counts.lock(|cell| cell.replace(EventCounts::ZERO))
    }

    /// Add counts back after a transfer that did not complete.
    pub fn restore(&self, counts: EventCounts) {
        self.update(|c| *c = c.merged(counts));
    }

    /// Current counts, without resetting them.
    pub fn peek(&self) -> EventCounts {
        self.counts.lock(Cell::get)
    }

    #[inline]
    fn update(&self, f: impl FnOnce(&mut EventCounts)) {
        self.counts.lock(|cell| {
            let mut counts = cell.get();
            f(&mut counts);
            cell.set(counts);
        });
    }
}

impl Default for EventCounters {
    fn default() -> Self {
        Self::new()
    }
}
