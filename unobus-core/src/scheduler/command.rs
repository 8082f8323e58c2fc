//! Queued outgoing commands

use heapless::Vec;
use unobus_protocol::{BusCommand, Frame, FramingError, MAX_PAYLOAD_SIZE};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of commands in one unlock sequence
pub const UNLOCK_SEQUENCE_LEN: usize = 4;

/// A command waiting for the scheduler gate
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PendingCommand {
    pub code: u8,
    pub destination: u8,
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    pub enqueued_at_ms: u64,
    /// Minimum gap after the previous transmission
    ///
    /// Only ever stretches the gap; the command delay still applies when
    /// this is shorter.
    pub hold_ms: u32,
}

impl PendingCommand {
    /// A payload-free command sent as soon as the gate allows
    pub fn new(command: BusCommand, destination: u8, now_ms: u64) -> Self {
        Self {
            code: command.code(),
            destination,
            payload: Vec::new(),
            enqueued_at_ms: now_ms,
            hold_ms: 0,
        }
    }

    pub fn with_payload(
        code: u8,
        destination: u8,
        payload: &[u8],
        now_ms: u64,
    ) -> Result<Self, FramingError> {
        let payload = Vec::from_slice(payload).map_err(|_| FramingError::PayloadTooLarge)?;
        Ok(Self {
            code,
            destination,
            payload,
            enqueued_at_ms: now_ms,
            hold_ms: 0,
        })
    }

    pub fn held_for(mut self, hold_ms: u32) -> Self {
        self.hold_ms = hold_ms;
        self
    }

    /// Known command for this code, if any
    pub fn command(&self) -> Option<BusCommand> {
        BusCommand::from_code(self.code)
    }

    pub fn to_frame(&self, source: u8) -> Frame {
        Frame {
            source,
            destination: self.destination,
            code: self.code,
            payload: self.payload.clone(),
            integrity_tag: 0,
        }
    }
}

/// The commands that open the door
///
/// Clear the bus, address the concierge, send the unlock, and release the
/// bus again after `bus_release_delay_ms`.
pub fn unlock_sequence(
    destination: u8,
    bus_release_delay_ms: u32,
    now_ms: u64,
) -> [PendingCommand; UNLOCK_SEQUENCE_LEN] {
    [
        PendingCommand::new(BusCommand::ClearBus, destination, now_ms),
        PendingCommand::new(BusCommand::ConciergeCall, destination, now_ms),
        PendingCommand::new(BusCommand::Unlock, destination, now_ms),
        PendingCommand::new(BusCommand::ClearBus, destination, now_ms).held_for(bus_release_delay_ms),
    ]
}
