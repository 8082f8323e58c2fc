//! "Someone is calling" indicator
//!
//! The bus does not reliably send an end-of-call frame, so the alert clears
//! itself `call_alert_duration` after the last call frame.

use unobus_protocol::ProtocolEvent;

use super::deadline_reached;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Snapshot of the calling alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CallingAlertState {
    pub active: bool,
    pub deadline_ms: Option<u64>,
}

/// Idle / Alerting machine with a re-armable deadline
#[derive(Debug, Clone)]
pub struct CallingAlert {
    duration_ms: u32,
    deadline_ms: Option<u64>,
}

impl CallingAlert {
    pub fn new(duration_ms: u32) -> Self {
        Self {
            duration_ms,
            deadline_ms: None,
        }
    }

    /// Apply an event, returning true if the state changed
    ///
    /// A repeated `CallStarted` only moves the deadline; it does not count as
    /// a transition.
    pub fn handle(&mut self, event: ProtocolEvent, now_ms: u64) -> bool {
        match event {
            ProtocolEvent::CallStarted => {
                let was_active = self.is_active();
                self.deadline_ms = Some(now_ms + self.duration_ms as u64);
                !was_active
            }
            ProtocolEvent::CallEnded => self.clear(),
            _ => false,
        }
    }

    /// Return to Idle if the deadline has passed
    pub fn expire(&mut self, now_ms: u64) -> bool {
        if deadline_reached(self.deadline_ms, now_ms) {
            self.clear()
        } else {
            false
        }
    }

    fn clear(&mut self) -> bool {
        self.deadline_ms.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    pub fn snapshot(&self) -> CallingAlertState {
        CallingAlertState {
            active: self.is_active(),
            deadline_ms: self.deadline_ms,
        }
    }
}
