//! Protocol engine for the UNO intercom bus
//!
//! This crate contains everything between the UART and the entities a home
//! automation host exposes:
//!
//! - Engine configuration and its validation
//! - Entity state machines (calling alert, incoming call, door lock)
//! - Rate-limited outgoing command scheduler
//! - Observability reports and bus statistics
//! - The [`Engine`] facade and the [`BusLink`] UART driver
//!
//! Nothing here reads a clock. Every entry point takes `now_ms`, so the same
//! code runs under an embassy ticker on the device and in plain unit tests.

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod engine;
pub mod link;
pub mod observe;
pub mod scheduler;
pub mod state;

pub use config::{parse_config, ConfigBuilder, ConfigError, ConfigValues, EngineConfig};
pub use engine::{Engine, EntitySnapshot, Transmit, UnlockOutcome, ECHO_WINDOW_MS};
pub use link::{BusLink, PollSummary};
pub use observe::{BusStats, Report, ReportLog, ReportSink};
