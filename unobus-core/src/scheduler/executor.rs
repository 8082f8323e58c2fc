//! Rate-limited FIFO of outgoing commands

use heapless::Deque;

use super::command::PendingCommand;
use crate::config::{ConfigError, MIN_COMMAND_DELAY_MS};

/// Default queue capacity
///
/// One unlock sequence plus room for a second request.
pub const COMMAND_QUEUE_CAPACITY: usize = 8;

/// Why a command was not queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RejectReason {
    /// Payload longer than the active grammar can carry
    PayloadTooLarge,
}

/// Outcome of [`CommandScheduler::enqueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Enqueue {
    /// Queued; if the queue was full the oldest command was dropped
    Accepted { displaced: Option<PendingCommand> },
    Rejected(RejectReason),
}

/// FIFO command queue with a minimum gap between transmissions
#[derive(Debug)]
pub struct CommandScheduler<const N: usize = COMMAND_QUEUE_CAPACITY> {
    queue: Deque<PendingCommand, N>,
    min_delay_ms: u32,
    max_payload: usize,
    last_transmit_ms: Option<u64>,
}

impl<const N: usize> CommandScheduler<N> {
    /// Create a scheduler, refusing delays below the protocol floor
    pub fn new(min_delay_ms: u32, max_payload: usize) -> Result<Self, ConfigError> {
        if min_delay_ms < MIN_COMMAND_DELAY_MS {
            return Err(ConfigError::CommandDelayBelowFloor);
        }
        Ok(Self {
            queue: Deque::new(),
            min_delay_ms,
            max_payload,
            last_transmit_ms: None,
        })
    }

    /// Queue a command behind everything already waiting
    pub fn enqueue(&mut self, command: PendingCommand) -> Enqueue {
        if command.payload.len() > self.max_payload {
            return Enqueue::Rejected(RejectReason::PayloadTooLarge);
        }

        let displaced = if self.queue.is_full() {
            self.queue.pop_front()
        } else {
            None
        };

        // Room was made above, so this cannot fail
        let _ = self.queue.push_back(command);
        Enqueue::Accepted { displaced }
    }

    /// Hand out the head command if the gate is open
    ///
    /// Once returned the command is final: there is no way to retract it.
    pub fn tick(&mut self, now_ms: u64) -> Option<PendingCommand> {
        let head = self.queue.front()?;
        if let Some(last) = self.last_transmit_ms {
            let gap = self.min_delay_ms.max(head.hold_ms) as u64;
            if now_ms.saturating_sub(last) < gap {
                return None;
            }
        }

        self.last_transmit_ms = Some(now_ms);
        self.queue.pop_front()
    }

    /// Remove every waiting command matching `pred`, keeping order
    pub fn cancel<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&PendingCommand) -> bool,
    {
        let mut kept: Deque<PendingCommand, N> = Deque::new();
        let mut removed = 0;
        while let Some(command) = self.queue.pop_front() {
            if pred(&command) {
                removed += 1;
            } else {
                let _ = kept.push_back(command);
            }
        }
        self.queue = kept;
        removed
    }

    /// Earliest time the head command may go out, if any is waiting
    pub fn ready_at(&self) -> Option<u64> {
        let head = self.queue.front()?;
        Some(match self.last_transmit_ms {
            Some(last) => last + self.min_delay_ms.max(head.hold_ms) as u64,
            None => 0,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingCommand> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn last_transmit_ms(&self) -> Option<u64> {
        self.last_transmit_ms
    }

    pub fn min_delay_ms(&self) -> u32 {
        self.min_delay_ms
    }
}
