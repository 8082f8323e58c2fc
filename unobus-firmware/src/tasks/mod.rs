//! Embassy async tasks
//!
//! The bus task is the only owner of the UART and the engine. Other tasks
//! reach it through the signals in [`crate::channels`].

pub mod bus;
pub mod button;

pub use bus::{bus_task, BusTaskIo, REPORT_LOG_SIZE};
pub use button::button_task;
