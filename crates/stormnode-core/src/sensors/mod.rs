mod oversampler;
mod rain;

pub use oversampler::Oversampler;
pub use rain::RainFlipDetector;

/// Number of analog channels the node samples.
pub const CHANNEL_COUNT: usize = 4;

/// Analog inputs of the station.
///
/// The discriminant is the channel's slot in
/// [`ChannelReadings`](crate::app_state::ChannelReadings) and its position in
/// the sampling pass. Keep the order in sync with the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Battery voltage divider
    Battery = 0,
    /// LM35 temperature sensor
    Temperature = 1,
    /// Current sense amplifier
    Current = 2,
    /// Wind vane potentiometer
    WindDirection = 3,
}

impl Channel {
    /// All channels, in sampling and wire order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Battery,
        Channel::Temperature,
        Channel::Current,
        Channel::WindDirection,
    ];

    /// Slot of this channel in the readings array.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short label for logs
    pub const fn label(self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::Temperature => "temperature",
            Self::Current => "current",
            Self::WindDirection => "wind_dir",
        }
    }
}

/// Source of raw analog conversions.
///
/// Implementations bind each [`Channel`] to a physical input. A conversion
/// cannot fail at this layer: a broken sensor shows up as an implausible code,
/// which the host is expected to detect.
pub trait AdcReader {
    /// Perform one blocking conversion of `channel` and return the raw code.
    fn convert(&mut self, channel: Channel) -> u16;
}

impl<A: AdcReader + ?Sized> AdcReader for &mut A {
    fn convert(&mut self, channel: Channel) -> u16 {
        (**self).convert(channel)
    }
}
