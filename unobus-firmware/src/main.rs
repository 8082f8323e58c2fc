//! UNO intercom bus bridge firmware
//!
//! Listens on the building's intercom bus for this apartment's calls,
//! shows them on status LEDs and opens the door on a button press.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{self, BufferedInterruptHandler, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use unobus_core::{parse_config, BusLink, Engine, ReportLog};
use unobus_hal::uart::{DataBits, Parity, StopBits};
use unobus_hal::BUS_UART_CONFIG;
use unobus_protocol::UnoGrammar;

use crate::bus_uart::BusUart;
use crate::tasks::{BusTaskIo, REPORT_LOG_SIZE};

mod bus_uart;
mod channels;
mod tasks;

/// Embedded configuration (compiled into firmware)
/// Edit intercom.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../intercom.toml");

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("unobus firmware starting...");

    let p = embassy_rp::init(Default::default());

    let config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            // A bad config must never reach the bus
            error!("intercom.toml rejected: {}", e);
            halt().await;
        }
    };
    info!("Configuration loaded: {}", config);

    let engine = match Engine::with_parts(config, UnoGrammar, ReportLog::<REPORT_LOG_SIZE>::new()) {
        Ok(engine) => engine,
        Err(e) => {
            error!("engine refused configuration: {}", e);
            halt().await;
        }
    };

    let tx_buf = TX_BUF.init([0u8; 64]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, bus_uart_config());
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    info!("UART initialized at {} baud 8E1", BUS_UART_CONFIG.baudrate);

    let link = BusLink::new(BusUart::new(uart), engine);
    let io = BusTaskIo {
        calling_led: Output::new(p.PIN_25, Level::Low),
        unlock_led: Output::new(p.PIN_15, Level::Low),
    };
    let button = Input::new(p.PIN_14, Pull::Up);

    spawner.spawn(tasks::bus_task(link, io)).unwrap();
    spawner.spawn(tasks::button_task(button)).unwrap();

    info!("All tasks spawned, firmware running");
}

/// RP2040 UART settings matching the bus line
fn bus_uart_config() -> uart::Config {
    let mut cfg = uart::Config::default();
    cfg.baudrate = BUS_UART_CONFIG.baudrate;
    cfg.data_bits = match BUS_UART_CONFIG.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    cfg.parity = match BUS_UART_CONFIG.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    cfg.stop_bits = match BUS_UART_CONFIG.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    cfg
}

/// Park forever without touching the bus
async fn halt() -> ! {
    loop {
        embassy_time::Timer::after_secs(60).await;
    }
}
