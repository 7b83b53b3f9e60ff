#![no_std]
#![no_main]

use esp_backtrace as _;
use esp_hal::delay::Delay;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::uart::{Config as UartConfig, Uart};
use esp_println::println;

use lm75::report::{self, Console, SensorBank, SENSOR_COUNT};

use crate::bus::HalBus;
use crate::console::SerialConsole;

mod bus;
mod console;

const REPORT_INTERVAL_MS: u32 = 1_000;

#[esp_hal::main]
fn main() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let delay = Delay::new();

    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    )
    .unwrap()
    .with_sda(peripherals.GPIO10)
    .with_scl(peripherals.GPIO8);
    let mut bus = HalBus::new(i2c);

    let uart = Uart::new(peripherals.UART0, UartConfig::default())
        .unwrap()
        .with_tx(peripherals.GPIO21)
        .with_rx(peripherals.GPIO20);
    let mut console = SerialConsole::new(uart);

    println!("booted!");

    console.puts("\r\nReady\r\n");
    report::scan(&mut bus, &mut console);

    let mut bank: SensorBank<SENSOR_COUNT> = SensorBank::init(&mut bus);

    loop {
        bank.report(&mut bus, &mut console);
        delay.delay_millis(REPORT_INTERVAL_MS);
    }
}
