//! Unobus Hardware Abstraction Layer
//!
//! The protocol engine only ever touches one peripheral: the UART attached to
//! the intercom bus. This crate defines the traits a chip-specific HAL (or a
//! host-side mock) implements so the engine can be driven without knowing
//! which microcontroller sits underneath.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  unobus-core (engine, bus link)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  unobus-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ firmware UART │       │  host mock    │
//! └───────────────┘       └───────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod uart;

pub use uart::{Uart, UartConfig, UartRx, UartTx, BUS_UART_CONFIG};
