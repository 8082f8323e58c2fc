//! HAL UART traits over the RP2040 buffered UART
//!
//! Reads never block: a byte is taken only when the receive ring has one.
//! Parity and framing faults come back as read errors, which the engine
//! turns into framing reports.

use embassy_rp::uart::{BufferedUart, Error};
use embedded_io::{Read, ReadReady, Write};

use unobus_hal::{UartRx, UartTx};

pub struct BusUart {
    inner: BufferedUart,
}

impl BusUart {
    pub fn new(inner: BufferedUart) -> Self {
        Self { inner }
    }
}

impl UartTx for BusUart {
    type Error = Error;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Error> {
        Write::write_all(&mut self.inner, data)
    }

    fn flush(&mut self) -> Result<(), Error> {
        Write::flush(&mut self.inner)
    }
}

impl UartRx for BusUart {
    type Error = Error;

    fn try_read_byte(&mut self) -> Result<Option<u8>, Error> {
        if !ReadReady::read_ready(&mut self.inner)? {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        let n = Read::read(&mut self.inner, &mut byte)?;
        Ok((n == 1).then_some(byte[0]))
    }
}
