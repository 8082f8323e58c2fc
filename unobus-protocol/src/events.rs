//! Protocol events decoded from accepted frames

use crate::commands::{CODE_CLEAR_BUS, CODE_INTERCOM_CALL, CODE_UNLOCK};
use crate::frame::Frame;

/// Semantic meaning of a frame addressed to this unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolEvent {
    /// Someone is ringing this unit
    CallStarted,
    /// The bus was cleared, ending the call
    CallEnded,
    /// A door unlock was requested on the bus
    UnlockRequested,
    /// Valid frame with a code this engine does not act on
    Unknown(u8),
}

impl ProtocolEvent {
    /// Map a wire code to an event
    ///
    /// Total: every code maps to exactly one event.
    pub fn from_code(code: u8) -> Self {
        match code {
            CODE_INTERCOM_CALL => ProtocolEvent::CallStarted,
            CODE_CLEAR_BUS => ProtocolEvent::CallEnded,
            CODE_UNLOCK => ProtocolEvent::UnlockRequested,
            other => ProtocolEvent::Unknown(other),
        }
    }

    /// Wire code this event was decoded from
    pub fn code(self) -> u8 {
        match self {
            ProtocolEvent::CallStarted => CODE_INTERCOM_CALL,
            ProtocolEvent::CallEnded => CODE_CLEAR_BUS,
            ProtocolEvent::UnlockRequested => CODE_UNLOCK,
            ProtocolEvent::Unknown(code) => code,
        }
    }

    /// Returns true if the engine ignores this event
    pub fn is_unknown(&self) -> bool {
        matches!(self, ProtocolEvent::Unknown(_))
    }
}

/// Decode a frame into its event
pub fn decode(frame: &Frame) -> ProtocolEvent {
    ProtocolEvent::from_code(frame.code)
}
