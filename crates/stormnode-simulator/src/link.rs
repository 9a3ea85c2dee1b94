//! In-memory byte-stream link between the simulated host and the responder.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use embedded_io::{ErrorKind, ErrorType};
use embedded_io_async::{Read, Write};
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("link closed")]
pub struct LinkClosed;

impl core::error::Error for LinkClosed {}

impl embedded_io::Error for LinkClosed {
    fn kind(&self) -> ErrorKind {
        ErrorKind::BrokenPipe
    }
}

/// One end of a full-duplex byte pipe.
pub struct ChannelLink {
    rx: Receiver<u8>,
    tx: Sender<u8>,
}

/// Create both ends of a link: `(host, node)`.
pub fn pair() -> (ChannelLink, ChannelLink) {
    let (host_tx, node_rx) = mpsc::channel();
    let (node_tx, host_rx) = mpsc::channel();
    (
        ChannelLink {
            rx: host_rx,
            tx: host_tx,
        },
        ChannelLink {
            rx: node_rx,
            tx: node_tx,
        },
    )
}

impl ChannelLink {
    /// Host side: send a request byte.
    pub fn send_byte(&self, byte: u8) -> Result<(), LinkClosed> {
        self.tx.send(byte).map_err(|_| LinkClosed)
    }

    /// Host side: discard bytes left over from an earlier, abandoned frame.
    ///
    /// Returns how many bytes were dropped.
    pub fn drain(&self) -> usize {
        self.rx.try_iter().count()
    }

    /// Host side: read exactly `buf.len()` bytes or give up after `timeout`.
    pub fn recv_exact(&self, buf: &mut [u8], timeout: Duration) -> Result<bool, LinkClosed> {
        for slot in buf.iter_mut() {
            match self.rx.recv_timeout(timeout) {
                Ok(byte) => *slot = byte,
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => return Err(LinkClosed),
            }
        }
        Ok(true)
    }
}

impl ErrorType for ChannelLink {
    type Error = LinkClosed;
}

impl Read for ChannelLink {
    /// Blocks the calling thread until at least one byte arrives.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        buf[0] = match self.rx.recv() {
            Ok(byte) => byte,
            // Host hung up
            Err(_) => return Ok(0),
        };

        let mut n = 1;
        while n < buf.len() {
            match self.rx.try_recv() {
                Ok(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        Ok(n)
    }
}

impl Write for ChannelLink {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for &byte in buf {
            self.tx.send(byte).map_err(|_| LinkClosed)?;
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
