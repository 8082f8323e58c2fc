//! Door strike
//!
//! Models a momentary strike: Unlocking lasts `unlock_timeout` and then
//! falls back to Locked unconditionally. The bus never reports a held-open
//! state.

use unobus_protocol::ProtocolEvent;

use super::deadline_reached;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LockState {
    #[default]
    Locked,
    Unlocking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DoorLockState {
    pub state: LockState,
    pub deadline_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct DoorLock {
    timeout_ms: u32,
    deadline_ms: Option<u64>,
}

impl DoorLock {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            deadline_ms: None,
        }
    }

    /// Apply an event; true means Locked became Unlocking
    ///
    /// The caller enqueues the unlock commands on a true return only.
    pub fn handle(&mut self, event: ProtocolEvent, now_ms: u64) -> bool {
        match event {
            ProtocolEvent::UnlockRequested => self.begin_unlock(now_ms),
            _ => false,
        }
    }

    /// Move to Unlocking unless already there
    ///
    /// While unlocking the deadline is left alone so repeated requests cannot
    /// stretch the pulse.
    pub fn begin_unlock(&mut self, now_ms: u64) -> bool {
        if self.is_unlocking() {
            return false;
        }
        self.deadline_ms = Some(now_ms + self.timeout_ms as u64);
        true
    }

    /// The strike command went out; the pulse runs from `now_ms`
    pub fn strike_sent(&mut self, now_ms: u64) {
        self.deadline_ms = Some(now_ms + self.timeout_ms as u64);
    }

    /// Force Locked, dropping the deadline
    pub fn lock(&mut self) -> bool {
        self.deadline_ms.take().is_some()
    }

    pub fn expire(&mut self, now_ms: u64) -> bool {
        if deadline_reached(self.deadline_ms, now_ms) {
            self.lock()
        } else {
            false
        }
    }

    pub fn is_unlocking(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn state(&self) -> LockState {
        if self.is_unlocking() {
            LockState::Unlocking
        } else {
            LockState::Locked
        }
    }

    pub fn snapshot(&self) -> DoorLockState {
        DoorLockState {
            state: self.state(),
            deadline_ms: self.deadline_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_pulse() {
        let mut lock = DoorLock::new(1000);
        assert_eq!(lock.state(), LockState::Locked);
        assert!(lock.handle(ProtocolEvent::UnlockRequested, 0));
        assert_eq!(
            lock.snapshot(),
            DoorLockState {
                state: LockState::Unlocking,
                deadline_ms: Some(1000)
            }
        );
        assert!(!lock.expire(999));
        assert!(lock.expire(1000));
        assert_eq!(lock.state(), LockState::Locked);
    }

    #[test]
    fn test_repeat_request_is_idempotent() {
        let mut lock = DoorLock::new(1000);
        assert!(lock.begin_unlock(0));
        assert!(!lock.begin_unlock(400));
        assert!(!lock.handle(ProtocolEvent::UnlockRequested, 600));
        assert_eq!(lock.snapshot().deadline_ms, Some(1000));
    }

    #[test]
    fn test_explicit_lock() {
        let mut lock = DoorLock::new(1000);
        lock.begin_unlock(0);
        assert!(lock.lock());
        assert_eq!(lock.snapshot(), DoorLockState::default());
        assert!(!lock.lock());
        // can unlock again straight away
        assert!(lock.begin_unlock(10));
    }

    #[test]
    fn test_strike_restarts_pulse() {
        let mut lock = DoorLock::new(1000);
        lock.begin_unlock(0);
        lock.strike_sent(1000);
        assert!(!lock.expire(1000));
        assert!(!lock.begin_unlock(1500));
        assert!(lock.expire(2000));

        // a strike after an explicit lock still opens the door
        lock.strike_sent(3000);
        assert_eq!(lock.state(), LockState::Unlocking);
    }

    #[test]
    fn test_call_events_ignored() {
        let mut lock = DoorLock::new(1000);
        assert!(!lock.handle(ProtocolEvent::CallStarted, 0));
        assert!(!lock.handle(ProtocolEvent::CallEnded, 0));
        assert!(!lock.is_unlocking());
    }
}
