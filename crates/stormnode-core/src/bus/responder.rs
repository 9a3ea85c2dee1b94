use embedded_io::Error as _;
use embedded_io::ErrorKind;
use embedded_io_async::{Read, Write};
use log::{info, trace, warn};
use thiserror_no_std::Error;

use super::snapshot::{SNAPSHOT_LEN, Snapshot};
use crate::app_state::StationState;

/// Request bytes read from the link in one go.
const REQUEST_BUFFER_LEN: usize = 8;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderError {
    #[error("bus link closed")]
    Closed,
    #[error("bus link error: {0:?}")]
    Transport(ErrorKind),
}

/// Fixed-address responder handing [`Snapshot`]s to the host.
///
/// The host requests a transfer by sending the responder's address byte; the
/// responder answers with one 16-byte frame. Taking a snapshot reads and
/// clears the event counters in a single critical section. If the frame
/// cannot be written, the taken counts are put back so the next transfer
/// reports them.
pub struct BusResponder<'a> {
    state: &'a StationState,
    address: u8,
    transfers: u32,
}

impl<'a> BusResponder<'a> {
    pub const fn new(state: &'a StationState, address: u8) -> Self {
        Self {
            state,
            address,
            transfers: 0,
        }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Number of completed transfers.
    pub const fn transfers(&self) -> u32 {
        self.transfers
    }

    /// Callback-style transfer for transports that own the hand-off.
    ///
    /// The counters are cleared as soon as the frame is returned; the caller
    /// must transmit it.
    pub fn on_request(&mut self) -> [u8; SNAPSHOT_LEN] {
        let snapshot = self.take_snapshot();
        self.transfers = self.transfers.wrapping_add(1);
        trace!("Transfer {}: {:?}", self.transfers, snapshot);
        snapshot.encode()
    }

    /// Write one snapshot frame to `link`.
    pub async fn respond<W: Write>(&mut self, link: &mut W) -> Result<Snapshot, ResponderError> {
        let snapshot = self.take_snapshot();

        if let Err(e) = send_frame(link, &snapshot.encode()).await {
            self.state.counters().restore(snapshot.counts());
            warn!("Transfer failed, counts kept for next request: {:?}", e);
            return Err(ResponderError::Transport(e.kind()));
        }

        self.transfers = self.transfers.wrapping_add(1);
        trace!("Transfer {}: {:?}", self.transfers, snapshot);
        Ok(snapshot)
    }

    /// Answer requests on `link` until it fails or closes.
    pub async fn serve<T: Read + Write>(&mut self, link: &mut T) -> Result<(), ResponderError> {
        info!("Bus responder listening at {:#04x}", self.address);

        let mut request = [0u8; REQUEST_BUFFER_LEN];
        loop {
            let n = link
                .read(&mut request)
                .await
                .map_err(|e| ResponderError::Transport(e.kind()))?;
            if n == 0 {
                return Err(ResponderError::Closed);
            }

            for &byte in &request[..n] {
                if byte == self.address {
                    self.respond(link).await?;
                } else {
                    warn!("Ignoring request byte {:#04x}", byte);
                }
            }
        }
    }

    fn take_snapshot(&self) -> Snapshot {
        let counts = self.state.counters().take();
        Snapshot::compose(
            self.state.resolution(),
            self.state.readings().load_all(),
            counts,
        )
    }
}

async fn send_frame<W: Write>(link: &mut W, frame: &[u8]) -> Result<(), W::Error> {
    link.write_all(frame).await?;
    link.flush().await
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::app_state::EventCounts;
    use crate::sensors::Channel;
    use embassy_futures::block_on;
    use embedded_io::ErrorType;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// In-memory link: scripted request bytes in, written frames out.
    #[derive(Default)]
    struct MockLink {
        requests: VecDeque<u8>,
        written: Vec<u8>,
        fail_writes: bool,
    }

    impl MockLink {
        fn with_requests(bytes: &[u8]) -> Self {
            Self {
                requests: bytes.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn frames(&self) -> Vec<Snapshot> {
            self.written
                .chunks_exact(SNAPSHOT_LEN)
                .map(|chunk| {
                    let mut frame = [0u8; SNAPSHOT_LEN];
                    frame.copy_from_slice(chunk);
                    Snapshot::decode(&frame)
                })
                .collect()
        }
    }

    impl ErrorType for MockLink {
        type Error = ErrorKind;
    }

    impl Read for MockLink {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let mut n = 0;
            while n < buf.len() {
                match self.requests.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }
    }

    impl Write for MockLink {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            if self.fail_writes {
                return Err(ErrorKind::BrokenPipe);
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn populated_state() -> StationState {
        let state = StationState::new(8191);
        state.readings().store(Channel::Battery, 100);
        state.readings().store(Channel::Temperature, 200);
        state.readings().store(Channel::Current, 50);
        state.readings().store(Channel::WindDirection, 300);
        for _ in 0..2 {
            state.counters().on_lightning_edge();
        }
        for _ in 0..5 {
            state.counters().on_wind_speed_edge();
        }
        state.counters().on_rain_flip();
        state
    }

    #[test]
    fn test_respond_writes_reference_frame() {
        let state = populated_state();
        let mut responder = BusResponder::new(&state, 0x21);
        let mut link = MockLink::default();

        block_on(responder.respond(&mut link)).unwrap();

        assert_eq!(
            link.written,
            [
                0x1F, 0xFF, 0x00, 0x64, 0x00, 0xC8, 0x00, 0x32, 0x01, 0x2C, 0x00, 0x02, 0x00,
                0x05, 0x00, 0x01,
            ]
        );
        assert_eq!(responder.transfers(), 1);
    }

    #[test]
    fn test_transfer_clears_counters_but_not_readings() {
        let state = populated_state();
        let mut responder = BusResponder::new(&state, 0x21);
        let mut link = MockLink::default();

        block_on(responder.respond(&mut link)).unwrap();
        let second = block_on(responder.respond(&mut link)).unwrap();

        assert_eq!(second.counts(), EventCounts::ZERO);
        assert_eq!(second.battery, 100);
        assert_eq!(second.wind_direction, 300);
        assert_eq!(second.resolution, 8191);
    }

    #[test]
    fn test_events_between_transfers_are_reported_once() {
        let state = StationState::new(8191);
        let mut responder = BusResponder::new(&state, 0x21);
        let mut link = MockLink::default();

        for _ in 0..4 {
            state.counters().on_lightning_edge();
        }
        for _ in 0..9 {
            state.counters().on_wind_speed_edge();
        }
        let first = block_on(responder.respond(&mut link)).unwrap();

        state.counters().on_lightning_edge();
        let second = block_on(responder.respond(&mut link)).unwrap();

        assert_eq!((first.lightning, first.wind_speed), (4, 9));
        assert_eq!((second.lightning, second.wind_speed), (1, 0));
        assert_eq!(state.counters().peek(), EventCounts::ZERO);
    }

    #[test]
    fn test_failed_transfer_keeps_counts() {
        let state = populated_state();
        let mut responder = BusResponder::new(&state, 0x21);
        let mut link = MockLink {
            fail_writes: true,
            ..MockLink::default()
        };

        let result = block_on(responder.respond(&mut link));

        assert_eq!(result, Err(ResponderError::Transport(ErrorKind::BrokenPipe)));
        assert_eq!(responder.transfers(), 0);
        assert_eq!(
            state.counters().peek(),
            EventCounts {
                lightning: 2,
                wind_speed: 5,
                rain: 1,
            }
        );

        link.fail_writes = false;
        let retried = block_on(responder.respond(&mut link)).unwrap();
        assert_eq!(retried.lightning, 2);
    }

    #[test]
    fn test_serve_answers_each_address_byte() {
        let state = populated_state();
        let mut responder = BusResponder::new(&state, 0x21);
        let mut link = MockLink::with_requests(&[0x21, 0x42, 0x21]);

        let result = block_on(responder.serve(&mut link));

        assert_eq!(result, Err(ResponderError::Closed));
        let frames = link.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].lightning, 2);
        assert_eq!(frames[1].lightning, 0);
        assert_eq!(frames[1].battery, 100);
    }

    #[test]
    fn test_on_request_clears_counters() {
        let state = populated_state();
        let mut responder = BusResponder::new(&state, 0x21);

        let frame = responder.on_request();

        assert_eq!(Snapshot::decode(&frame).wind_speed, 5);
        assert_eq!(state.counters().peek(), EventCounts::ZERO);
        assert_eq!(responder.transfers(), 1);
    }
}
