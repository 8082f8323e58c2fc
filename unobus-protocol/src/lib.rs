//! UNO Intercom Bus Protocol
//!
//! This crate turns the raw byte stream of a shared building intercom bus
//! into validated frames and semantic events, and builds the frames this
//! unit puts back on the line.
//!
//! # Pipeline
//!
//! ```text
//! UART bytes ──► FrameAssembler ──► Address filter ──► Event decoder
//!                 (grammar, quiet         (intercom /        (ProtocolEvent)
//!                  time, integrity)        concierge /
//!                                          broadcast)
//! ```
//!
//! # Frame grammars
//!
//! The byte layout is pluggable through [`FrameGrammar`]. Two grammars ship:
//!
//! ```text
//! UnoGrammar (default, Golmar UNO bus)
//! ┌──────┬──────┬─────────┬─────────┐
//! │ 0x00 │ 0x00 │ ADDRESS │ COMMAND │
//! └──────┴──────┴─────────┴─────────┘
//!
//! ChecksumGrammar
//! ┌──────┬─────┬─────┬──────┬─────┬────────────┬─────┐
//! │ 0xA5 │ DST │ SRC │ CODE │ LEN │ PAYLOAD    │ XOR │
//! │ 1B   │ 1B  │ 1B  │ 1B   │ 1B  │ 0–8B       │ 1B  │
//! └──────┴─────┴─────┴──────┴─────┴────────────┴─────┘
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod address;
pub mod assembler;
pub mod commands;
pub mod events;
pub mod frame;
pub mod grammar;

pub use address::{accept, DeviceIdentity, BROADCAST_ADDRESS, NO_ADDRESS};
pub use assembler::{FrameAssembler, DEFAULT_INTER_BYTE_TIMEOUT_MS};
pub use commands::BusCommand;
pub use events::{decode, ProtocolEvent};
pub use frame::{Frame, FramingError, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use grammar::{ChecksumGrammar, FrameGrammar, Scan, UnoGrammar};
