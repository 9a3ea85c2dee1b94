use crate::app_state::EventCounts;
use crate::sensors::{CHANNEL_COUNT, Channel};

/// Number of words in one transfer.
pub const SNAPSHOT_WORDS: usize = 8;

/// Bytes on the wire for one transfer.
pub const SNAPSHOT_LEN: usize = SNAPSHOT_WORDS * 2;

/// One consistent view of the station, as transferred to the host.
///
/// Binary format (big-endian, one word each, in this order):
/// - resolution: maximum code of the effective ADC resolution
/// - battery, temperature, current, wind_direction: raw channel codes
/// - lightning, wind_speed, rain: events since the previous transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub resolution: u16,
    pub battery: u16,
    pub temperature: u16,
    pub current: u16,
    pub wind_direction: u16,
    pub lightning: u16,
    pub wind_speed: u16,
    pub rain: u16,
}

impl Snapshot {
    /// Assemble a snapshot from readings in [`Channel::ALL`] order and the
    /// counts taken for this transfer.
    pub const fn compose(
        resolution: u16,
        readings: [u16; CHANNEL_COUNT],
        counts: EventCounts,
    ) -> Self {
        Self {
            resolution,
            battery: readings[Channel::Battery.index()],
            temperature: readings[Channel::Temperature.index()],
            current: readings[Channel::Current.index()],
            wind_direction: readings[Channel::WindDirection.index()],
            lightning: counts.lightning,
            wind_speed: counts.wind_speed,
            rain: counts.rain,
        }
    }

    /// The event counts carried by this snapshot.
    pub const fn counts(&self) -> EventCounts {
        EventCounts {
            lightning: self.lightning,
            wind_speed: self.wind_speed,
            rain: self.rain,
        }
    }

    /// Words in wire order.
    pub const fn words(&self) -> [u16; SNAPSHOT_WORDS] {
        [
            self.resolution,
            self.battery,
            self.temperature,
            self.current,
            self.wind_direction,
            self.lightning,
            self.wind_speed,
            self.rain,
        ]
    }

    /// Encode as the 16-byte transfer frame, most significant byte first.
    pub fn encode(&self) -> [u8; SNAPSHOT_LEN] {
        let mut bytes = [0u8; SNAPSHOT_LEN];
        for (chunk, word) in bytes.chunks_exact_mut(2).zip(self.words()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    /// Parse a transfer frame. Used on the host side.
    pub fn decode(bytes: &[u8; SNAPSHOT_LEN]) -> Self {
        let mut words = [0u16; SNAPSHOT_WORDS];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(2)) {
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }

        let [
            resolution,
            battery,
            temperature,
            current,
            wind_direction,
            lightning,
            wind_speed,
            rain,
        ] = words;

        Self {
            resolution,
            battery,
            temperature,
            current,
            wind_direction,
            lightning,
            wind_speed,
            rain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_snapshot() -> Snapshot {
        Snapshot::compose(
            8191,
            [100, 200, 50, 300],
            EventCounts {
                lightning: 2,
                wind_speed: 5,
                rain: 1,
            },
        )
    }

    #[test]
    fn test_frame_length() {
        assert_eq!(SNAPSHOT_LEN, 16);
        assert_eq!(reference_snapshot().encode().len(), SNAPSHOT_LEN);
    }

    #[test]
    fn test_reference_frame_layout() {
        assert_eq!(
            reference_snapshot().encode(),
            [
                0x1F, 0xFF, 0x00, 0x64, 0x00, 0xC8, 0x00, 0x32, 0x01, 0x2C, 0x00, 0x02, 0x00,
                0x05, 0x00, 0x01,
            ]
        );
    }

    #[test]
    fn test_compose_maps_channels() {
        let snapshot = reference_snapshot();

        assert_eq!(snapshot.battery, 100);
        assert_eq!(snapshot.temperature, 200);
        assert_eq!(snapshot.current, 50);
        assert_eq!(snapshot.wind_direction, 300);
        assert_eq!(snapshot.counts().wind_speed, 5);
    }

    #[test]
    fn test_decode_reference_frame() {
        let frame = reference_snapshot().encode();

        assert_eq!(Snapshot::decode(&frame), reference_snapshot());
    }

    #[test]
    fn test_high_byte_first() {
        let snapshot = Snapshot {
            lightning: 0xABCD,
            ..Snapshot::default()
        };

        let frame = snapshot.encode();

        assert_eq!(&frame[10..12], &[0xAB, 0xCD]);
    }
}
