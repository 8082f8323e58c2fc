//! Door button task
//!
//! A falling edge on the (pulled-up) input, still low after the debounce
//! delay, is one unlock request.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::Timer;

use crate::channels::UNLOCK_REQUEST;

/// Debounce delay in milliseconds
const DEBOUNCE_MS: u64 = 30;

#[embassy_executor::task]
pub async fn button_task(mut button: Input<'static>) {
    info!("Button task started");

    loop {
        button.wait_for_falling_edge().await;
        Timer::after_millis(DEBOUNCE_MS).await;
        if button.is_high() {
            continue;
        }

        debug!("Door button pressed");
        UNLOCK_REQUEST.signal(());
        button.wait_for_high().await;
        Timer::after_millis(DEBOUNCE_MS).await;
    }
}
