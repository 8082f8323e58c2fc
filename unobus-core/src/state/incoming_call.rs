//! Raw incoming-call signal

use unobus_protocol::ProtocolEvent;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IncomingCallState {
    pub active: bool,
}

/// Level flag following call start and end frames, no timeout
#[derive(Debug, Clone, Default)]
pub struct IncomingCall {
    active: bool,
}

impl IncomingCall {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event, returning true if the flag changed
    pub fn handle(&mut self, event: ProtocolEvent) -> bool {
        let next = match event {
            ProtocolEvent::CallStarted => true,
            ProtocolEvent::CallEnded => false,
            _ => return false,
        };
        let changed = self.active != next;
        self.active = next;
        changed
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn snapshot(&self) -> IncomingCallState {
        IncomingCallState {
            active: self.active,
        }
    }
}
