//! Outgoing command scheduler
//!
//! Every byte this unit puts on the bus goes through here, one command per
//! gate opening, so two commands can never interleave or arrive closer than
//! the protocol's minimum command delay.

pub mod command;
pub mod executor;

pub use command::{unlock_sequence, PendingCommand, UNLOCK_SEQUENCE_LEN};
pub use executor::{CommandScheduler, Enqueue, RejectReason, COMMAND_QUEUE_CAPACITY};
