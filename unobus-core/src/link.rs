//! Bus link driver
//!
//! Binds an [`Engine`] to a HAL UART. The link is the only writer of the
//! bus: it drains received bytes into the engine, ticks it, and writes
//! whatever the scheduler hands out.

use unobus_hal::{UartRx, UartTx};
use unobus_protocol::{FrameGrammar, UnoGrammar};

use crate::engine::Engine;
use crate::observe::ReportSink;

/// Upper bound on reads per poll, so a babbling line cannot starve the tick
pub const MAX_READS_PER_POLL: usize = 64;

/// What happened during one [`BusLink::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollSummary {
    /// Bytes read from the line
    pub bytes: usize,
    /// Events decoded
    pub events: usize,
    /// True if a frame was written
    pub transmitted: bool,
}

pub struct BusLink<U, G: FrameGrammar = UnoGrammar, S: ReportSink = ()> {
    uart: U,
    engine: Engine<G, S>,
}

impl<U, G, S> BusLink<U, G, S>
where
    U: UartTx + UartRx,
    G: FrameGrammar,
    S: ReportSink,
{
    pub fn new(uart: U, engine: Engine<G, S>) -> Self {
        Self { uart, engine }
    }

    /// Service the line once
    ///
    /// Receive faults are absorbed by the engine as framing errors. Only a
    /// failed write is returned, after which the command counts as sent.
    pub fn poll(&mut self, now_ms: u64) -> Result<PollSummary, <U as UartTx>::Error> {
        let mut summary = PollSummary::default();

        for _ in 0..MAX_READS_PER_POLL {
            match self.uart.try_read_byte() {
                Ok(Some(byte)) => {
                    summary.bytes += 1;
                    if self.engine.feed(byte, now_ms).is_some() {
                        summary.events += 1;
                    }
                }
                Ok(None) => break,
                Err(_) => self.engine.line_error(),
            }
        }

        if let Some(tx) = self.engine.tick(now_ms) {
            self.uart.write_blocking(&tx.bytes)?;
            self.uart.flush()?;
            summary.transmitted = true;
        }

        Ok(summary)
    }

    pub fn uart(&self) -> &U {
        &self.uart
    }

    pub fn uart_mut(&mut self) -> &mut U {
        &mut self.uart
    }

    pub fn engine(&self) -> &Engine<G, S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine<G, S> {
        &mut self.engine
    }

    pub fn into_parts(self) -> (U, Engine<G, S>) {
        (self.uart, self.engine)
    }
}
