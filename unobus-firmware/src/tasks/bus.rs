//! Bus service task
//!
//! Polls the line on a fixed ticker, which also drives every engine timer.
//! A 5 ms period is just over one character time at 2600 baud, so the
//! receive ring never holds more than a couple of bytes between polls.

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{Duration, Instant, Ticker};

use unobus_core::state::LockState;
use unobus_core::{BusLink, Report, ReportLog, UnlockOutcome};
use unobus_protocol::UnoGrammar;

use crate::bus_uart::BusUart;
use crate::channels::UNLOCK_REQUEST;

/// Poll interval in milliseconds
pub const POLL_INTERVAL_MS: u64 = 5;

/// Reports buffered between drains
pub const REPORT_LOG_SIZE: usize = 16;

pub type Link = BusLink<BusUart, UnoGrammar, ReportLog<REPORT_LOG_SIZE>>;

/// Status LEDs driven from the entity snapshots
pub struct BusTaskIo {
    pub calling_led: Output<'static>,
    pub unlock_led: Output<'static>,
}

#[embassy_executor::task]
pub async fn bus_task(mut link: Link, mut io: BusTaskIo) {
    info!("Bus task started");

    let mut ticker = Ticker::every(Duration::from_millis(POLL_INTERVAL_MS));

    loop {
        ticker.next().await;
        let now_ms = Instant::now().as_millis();

        if UNLOCK_REQUEST.try_take().is_some() {
            match link.engine_mut().request_unlock(now_ms) {
                UnlockOutcome::Queued => info!("Unlock queued"),
                UnlockOutcome::AlreadyUnlocking => debug!("Already unlocking"),
            }
        }

        match link.poll(now_ms) {
            Ok(summary) if summary.transmitted => trace!("TX at {} ms", now_ms),
            Ok(_) => {}
            Err(e) => warn!("UART write error: {:?}", e),
        }

        update_leds(&link, &mut io);
        drain_reports(&mut link);
    }
}

fn update_leds(link: &Link, io: &mut BusTaskIo) {
    let snapshot = link.engine().snapshot();
    io.calling_led.set_level(snapshot.calling_alert.active.into());
    io.unlock_led
        .set_level((snapshot.door_lock.state == LockState::Unlocking).into());
}

fn drain_reports(link: &mut Link) {
    for report in link.engine_mut().sink_mut().drain() {
        match report {
            Report::Framing(e) => debug!("Framing error: {}", e),
            Report::UnknownEvent { code, destination } => {
                debug!("Unknown code {=u8:#x} for {=u8:#x}", code, destination)
            }
            Report::BackpressureDropped(command) => {
                warn!("Command dropped before sending: {}", command)
            }
            Report::Rejected(reason) => warn!("Command rejected: {}", reason),
        }
    }
}
