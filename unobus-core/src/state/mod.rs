//! Entity state machines
//!
//! Three independent machines, one per exposed entity. Each advances only on
//! a [`ProtocolEvent`](unobus_protocol::ProtocolEvent) or on an `expire(now)`
//! call from the engine tick.

pub mod calling_alert;
pub mod door_lock;
pub mod incoming_call;

pub use calling_alert::{CallingAlert, CallingAlertState};
pub use door_lock::{DoorLock, DoorLockState, LockState};
pub use incoming_call::{IncomingCall, IncomingCallState};

/// True once `now` has reached `deadline`
#[inline]
pub(crate) fn deadline_reached(deadline: Option<u64>, now_ms: u64) -> bool {
    deadline.is_some_and(|d| now_ms >= d)
}
