//! UART link to the host controller
//!
//! Adapts the async esp-hal UART to the `embedded-io-async` traits the bus
//! responder is written against.

use embedded_io::{ErrorKind, ErrorType};
use embedded_io_async::{Read, Write};
use esp_hal::Async;
use esp_hal::uart::Uart;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[error("UART receive failed")]
    Rx,
    #[error("UART transmit failed")]
    Tx,
}

impl embedded_io::Error for LinkError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Rx => ErrorKind::InvalidData,
            Self::Tx => ErrorKind::BrokenPipe,
        }
    }
}

pub struct UartLink<'d> {
    uart: Uart<'d, Async>,
}

impl<'d> UartLink<'d> {
    pub fn new(uart: Uart<'d, Async>) -> Self {
        Self { uart }
    }
}

impl ErrorType for UartLink<'_> {
    type Error = LinkError;
}

impl Read for UartLink<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.uart.read_async(buf).await.map_err(|e| {
            log::warn!("UART receive error: {:?}", e);
            LinkError::Rx
        })
    }
}

impl Write for UartLink<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart.write_async(buf).await.map_err(|e| {
            log::warn!("UART transmit error: {:?}", e);
            LinkError::Tx
        })
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart.flush_async().await.map_err(|e| {
            log::warn!("UART flush error: {:?}", e);
            LinkError::Tx
        })
    }
}
