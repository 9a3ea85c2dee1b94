use embedded_hal::digital::InputPin;
use log::warn;

use crate::app_state::EventCounters;

/// Polled edge detector for the rain-bucket flip switch.
///
/// Polled once per scheduler tick instead of from an interrupt: the tick
/// period is far shorter than a bucket flip yet long enough that contact
/// bounce settles between polls. Every level change counts as one flip, so a
/// switch that closes and re-opens within one tip counts twice.
pub struct RainFlipDetector<P> {
    pin: P,
    last_level: bool,
}

impl<P: InputPin> RainFlipDetector<P> {
    /// The stored level starts low, so a switch already closed at boot
    /// counts one flip on the first poll.
    pub const fn new(pin: P) -> Self {
        Self {
            pin,
            last_level: false,
        }
    }

    /// Compare the pin with the last observed level and count a change.
    ///
    /// Returns whether a flip was counted. A pin read error is treated as no
    /// change for this poll.
    pub fn poll(&mut self, counters: &EventCounters) -> bool {
        let level = match self.pin.is_high() {
            Ok(level) => level,
            Err(e) => {
                warn!("Rain flip pin read failed: {:?}", e);
                return false;
            }
        };

        if level == self.last_level {
            return false;
        }

        self.last_level = level;
        counters.on_rain_flip();
        true
    }

    pub const fn last_level(&self) -> bool {
        self.last_level
    }

    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorKind, ErrorType};

    struct FakePin {
        level: bool,
    }

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.level)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.level)
        }
    }

    struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = ErrorKind;
    }

    impl InputPin for BrokenPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Err(ErrorKind::Other)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    #[test]
    fn test_unchanged_level_never_counts() {
        let counters = EventCounters::new();
        let mut detector = RainFlipDetector::new(FakePin { level: false });

        for _ in 0..50 {
            assert!(!detector.poll(&counters));
        }

        assert_eq!(counters.peek().rain, 0);
    }

    #[test]
    fn test_single_transition_counts_once() {
        let counters = EventCounters::new();
        let mut detector = RainFlipDetector::new(FakePin { level: false });

        detector.poll(&counters);
        detector.pin.level = true;
        assert!(detector.poll(&counters));
        for _ in 0..10 {
            assert!(!detector.poll(&counters));
        }

        assert_eq!(counters.peek().rain, 1);
        assert!(detector.last_level());
    }

    #[test]
    fn test_every_level_change_counts() {
        let counters = EventCounters::new();
        let mut detector = RainFlipDetector::new(FakePin { level: false });

        // close, open, close
        for level in [true, false, true] {
            detector.pin.level = level;
            detector.poll(&counters);
            detector.poll(&counters);
        }

        assert_eq!(counters.peek().rain, 3);
    }

    #[test]
    fn test_high_at_boot_counts_first_poll() {
        let counters = EventCounters::new();
        let mut detector = RainFlipDetector::new(FakePin { level: true });

        assert!(detector.poll(&counters));
        assert_eq!(counters.peek().rain, 1);
    }

    #[test]
    fn test_read_error_is_no_change() {
        let counters = EventCounters::new();
        let mut detector = RainFlipDetector::new(BrokenPin);

        assert!(!detector.poll(&counters));
        assert_eq!(counters.peek().rain, 0);
        assert!(!detector.last_level());
    }
}
