//! Inter-task communication channels

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Door button was pressed; the bus task queues the unlock
pub static UNLOCK_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();
