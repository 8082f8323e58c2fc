//! Observability: reports and bus statistics
//!
//! Reports flow one way, out of the engine. A sink can record or log them but
//! has no handle back into engine state.

use heapless::Deque;
use unobus_protocol::FramingError;

use crate::scheduler::{PendingCommand, RejectReason};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Something a collaborator may want to know about the bus
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Report {
    /// Bytes were discarded; the assembler has already resynchronized
    Framing(FramingError),
    /// A frame for us carried a code with no meaning to this unit
    UnknownEvent { code: u8, destination: u8 },
    /// Queue overflow pushed out this command before it was sent
    BackpressureDropped(PendingCommand),
    /// A command was refused at enqueue time
    Rejected(RejectReason),
}

/// Receiver for engine reports
pub trait ReportSink {
    fn report(&mut self, report: Report);
}

/// Discard all reports
impl ReportSink for () {
    fn report(&mut self, _report: Report) {}
}

/// Bounded report buffer that overwrites its oldest entry when full
#[derive(Debug, Default)]
pub struct ReportLog<const N: usize> {
    entries: Deque<Report, N>,
    overwritten: u32,
}

impl<const N: usize> ReportLog<N> {
    pub fn new() -> Self {
        Self {
            entries: Deque::new(),
            overwritten: 0,
        }
    }

    pub fn pop(&mut self) -> Option<Report> {
        self.entries.pop_front()
    }

    /// Take every buffered report, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = Report> + '_ {
        core::iter::from_fn(move || self.entries.pop_front())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reports lost to overwriting since creation
    pub fn overwritten(&self) -> u32 {
        self.overwritten
    }
}

impl<const N: usize> ReportSink for ReportLog<N> {
    fn report(&mut self, report: Report) {
        if self.entries.is_full() {
            self.entries.pop_front();
            self.overwritten = self.overwritten.saturating_add(1);
        }
        let _ = self.entries.push_back(report);
    }
}

/// Running counters for the bus link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusStats {
    /// Bytes received
    pub bytes: u32,
    /// Valid frames assembled, before filtering
    pub frames: u32,
    /// Bytes that could not start a frame
    pub noise_bytes: u32,
    pub framing_errors: u32,
    /// Frames for other units
    pub filtered: u32,
    pub unknown_events: u32,
    /// Our own transmissions heard back
    pub echoes: u32,
    pub transmitted: u32,
    /// Commands pushed out of a full queue
    pub dropped_commands: u32,
}
