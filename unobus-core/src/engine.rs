//! Engine facade
//!
//! [`Engine`] owns every piece between the byte stream and the entities:
//! the assembler, the three state machines, the command scheduler and the
//! report sink. It performs no I/O; [`BusLink`](crate::link::BusLink) moves
//! bytes between it and the UART.
//!
//! ```text
//! byte ─▶ assembler ─▶ accept ─▶ echo? ─▶ decode ─▶ state machines
//!                                                       │ unlock
//!                      UART ◀── tick ◀── scheduler ◀────┘
//! ```

use heapless::Vec;
use unobus_protocol::{
    accept, commands::{CODE_CLEAR_BUS, CODE_UNLOCK}, decode, Frame, FrameAssembler, FrameGrammar, FramingError,
    ProtocolEvent, UnoGrammar, MAX_FRAME_SIZE,
};

use crate::config::{ConfigError, EngineConfig};
use crate::observe::{BusStats, Report, ReportSink};
use crate::scheduler::{unlock_sequence, CommandScheduler, Enqueue, PendingCommand};
use crate::state::{
    CallingAlert, CallingAlertState, DoorLock, DoorLockState, IncomingCall, IncomingCallState,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How long after a transmission a matching frame counts as our own echo
pub const ECHO_WINDOW_MS: u64 = 100;

/// All entity states at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntitySnapshot {
    pub calling_alert: CallingAlertState,
    pub incoming_call: IncomingCallState,
    pub door_lock: DoorLockState,
}

/// A frame the caller must write to the bus now
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transmit {
    pub frame: Frame,
    /// Encoded wire bytes
    pub bytes: Vec<u8, MAX_FRAME_SIZE>,
}

/// Result of an unlock request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnlockOutcome {
    /// The unlock sequence was queued
    Queued,
    /// The door is already unlocking; nothing was queued
    AlreadyUnlocking,
}

/// The protocol engine for one bus line
pub struct Engine<G: FrameGrammar = UnoGrammar, S: ReportSink = ()> {
    config: EngineConfig,
    assembler: FrameAssembler<G>,
    calling_alert: CallingAlert,
    incoming_call: IncomingCall,
    door_lock: DoorLock,
    scheduler: CommandScheduler,
    echo: Option<(Vec<u8, MAX_FRAME_SIZE>, u64)>,
    stats: BusStats,
    sink: S,
}

impl Engine {
    /// Engine on the UNO grammar that discards reports
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, UnoGrammar, ())
    }
}

impl<G: FrameGrammar, S: ReportSink> Engine<G, S> {
    pub fn with_parts(config: EngineConfig, grammar: G, sink: S) -> Result<Self, ConfigError> {
        let scheduler = CommandScheduler::new(config.command_delay_ms(), G::MAX_PAYLOAD)?;
        info!(
            "engine up: intercom {=u8:#x}, command target {=u8:#x}",
            config.identity().intercom_id(),
            config.identity().command_target()
        );

        Ok(Self {
            assembler: FrameAssembler::new(grammar, config.inter_byte_timeout_ms()),
            calling_alert: CallingAlert::new(config.call_alert_duration_ms()),
            incoming_call: IncomingCall::new(),
            door_lock: DoorLock::new(config.unlock_timeout_ms()),
            scheduler,
            echo: None,
            stats: BusStats::default(),
            sink,
            config,
        })
    }

    /// Feed one received byte
    ///
    /// Returns the event decoded from a frame this byte completed, if any.
    /// When a byte settles several candidates, the last event is returned.
    /// Nothing here can fail: bad input is counted, reported and dropped.
    pub fn feed(&mut self, byte: u8, now_ms: u64) -> Option<ProtocolEvent> {
        self.stats.bytes = self.stats.bytes.wrapping_add(1);
        let outcome = self.assembler.feed(byte, now_ms);
        let mut event = self.handle_outcome(outcome, now_ms);
        while let Some(queued) = self.assembler.poll(now_ms) {
            event = self.handle_outcome(queued.map(Some), now_ms).or(event);
        }
        event
    }

    /// Feed a run of bytes received together
    ///
    /// Unlike the assembler, every byte is consumed. Returns the last event.
    pub fn feed_bytes(&mut self, bytes: &[u8], now_ms: u64) -> Option<ProtocolEvent> {
        bytes
            .iter()
            .fold(None, |last, &byte| self.feed(byte, now_ms).or(last))
    }

    /// The UART reported a line fault; drop whatever was being assembled
    pub fn line_error(&mut self) {
        self.assembler.reset();
        self.framing_error(FramingError::Parity);
    }

    /// Advance timers and hand out the next command if its gate is open
    ///
    /// Call at a steady interval. The returned bytes must be written to
    /// the bus before the next call.
    pub fn tick(&mut self, now_ms: u64) -> Option<Transmit> {
        while let Some(outcome) = self.assembler.poll(now_ms) {
            self.handle_outcome(outcome.map(Some), now_ms);
        }

        if self.calling_alert.expire(now_ms) {
            debug!("calling alert cleared");
        }
        // The pulse is timed from the strike, so hold it while one is queued
        let strike_pending = self.scheduler.iter().any(|c| c.code == CODE_UNLOCK);
        if !strike_pending && self.door_lock.expire(now_ms) {
            debug!("door locked");
        }

        let command = self.scheduler.tick(now_ms)?;
        let frame = command.to_frame(self.config.identity().intercom_id());
        match self.assembler.grammar().encode_to_vec(&frame) {
            Ok(bytes) => {
                trace!("tx code {=u8:#x} to {=u8:#x}", frame.code, frame.destination);
                if frame.code == CODE_UNLOCK {
                    self.door_lock.strike_sent(now_ms);
                }
                self.echo = Some((bytes.clone(), now_ms));
                self.stats.transmitted = self.stats.transmitted.wrapping_add(1);
                Some(Transmit { frame, bytes })
            }
            Err(e) => {
                self.framing_error(e);
                None
            }
        }
    }

    /// Request the door to open, as from a user-facing switch
    pub fn request_unlock(&mut self, now_ms: u64) -> UnlockOutcome {
        if self.door_lock.begin_unlock(now_ms) {
            self.queue_unlock(now_ms);
            UnlockOutcome::Queued
        } else {
            UnlockOutcome::AlreadyUnlocking
        }
    }

    /// Show the door as locked again
    ///
    /// Commands already queued still go out.
    pub fn lock(&mut self) -> bool {
        self.door_lock.lock()
    }

    fn handle_outcome(
        &mut self,
        outcome: Result<Option<Frame>, FramingError>,
        now_ms: u64,
    ) -> Option<ProtocolEvent> {
        match outcome {
            Ok(Some(frame)) => self.handle_frame(&frame, now_ms),
            Ok(None) => None,
            Err(e) => {
                self.framing_error(e);
                None
            }
        }
    }

    fn handle_frame(&mut self, frame: &Frame, now_ms: u64) -> Option<ProtocolEvent> {
        self.stats.frames = self.stats.frames.wrapping_add(1);

        if !accept(frame, &self.config.identity()) {
            self.stats.filtered = self.stats.filtered.wrapping_add(1);
            return None;
        }

        if self.is_echo(frame, now_ms) {
            self.stats.echoes = self.stats.echoes.wrapping_add(1);
            return None;
        }

        let event = decode(frame);
        match event {
            ProtocolEvent::Unknown(code) => {
                debug!("unknown code {=u8:#x}", code);
                self.stats.unknown_events = self.stats.unknown_events.wrapping_add(1);
                self.sink.report(Report::UnknownEvent {
                    code,
                    destination: frame.destination,
                });
            }
            _ => {
                if self.calling_alert.handle(event, now_ms) {
                    debug!("calling alert raised");
                }
                self.incoming_call.handle(event);
                if self.door_lock.handle(event, now_ms) {
                    debug!("unlock requested on bus");
                    self.queue_unlock(now_ms);
                }
            }
        }
        Some(event)
    }

    /// Consume the pending echo if `frame` is our own last transmission
    fn is_echo(&mut self, frame: &Frame, now_ms: u64) -> bool {
        let Some((sent, sent_at)) = &self.echo else {
            return false;
        };
        if now_ms.saturating_sub(*sent_at) > ECHO_WINDOW_MS {
            self.echo = None;
            return false;
        }
        let heard = match self.assembler.grammar().encode_to_vec(frame) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        if heard != *sent {
            return false;
        }
        self.echo = None;
        true
    }

    fn queue_unlock(&mut self, now_ms: u64) {
        // A new sequence supersedes an old trailing bus release
        let superseded = self
            .scheduler
            .cancel(|c| c.code == CODE_CLEAR_BUS && c.hold_ms > 0);
        if superseded > 0 {
            trace!("dropped {=usize} pending bus release", superseded);
        }

        let sequence = unlock_sequence(
            self.config.identity().command_target(),
            self.config.bus_release_delay_ms(),
            now_ms,
        );
        for command in sequence {
            self.enqueue(command);
        }
    }

    fn enqueue(&mut self, command: PendingCommand) {
        match self.scheduler.enqueue(command) {
            Enqueue::Accepted { displaced: None } => {}
            Enqueue::Accepted {
                displaced: Some(old),
            } => {
                warn!("command queue full, dropped code {=u8:#x}", old.code);
                self.stats.dropped_commands = self.stats.dropped_commands.wrapping_add(1);
                self.sink.report(Report::BackpressureDropped(old));
            }
            Enqueue::Rejected(reason) => {
                warn!("command rejected: {}", reason);
                self.sink.report(Report::Rejected(reason));
            }
        }
    }

    fn framing_error(&mut self, error: FramingError) {
        trace!("framing error: {}", error);
        self.stats.framing_errors = self.stats.framing_errors.wrapping_add(1);
        self.sink.report(Report::Framing(error));
    }

    pub fn calling_alert(&self) -> CallingAlertState {
        self.calling_alert.snapshot()
    }

    pub fn incoming_call(&self) -> IncomingCallState {
        self.incoming_call.snapshot()
    }

    pub fn door_lock(&self) -> DoorLockState {
        self.door_lock.snapshot()
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            calling_alert: self.calling_alert(),
            incoming_call: self.incoming_call(),
            door_lock: self.door_lock(),
        }
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            noise_bytes: self.assembler.noise_bytes(),
            ..self.stats
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Commands waiting for the scheduler, in send order
    pub fn pending_commands(&self) -> impl Iterator<Item = &PendingCommand> {
        self.scheduler.iter()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
