//! Sensor bank construction, the periodic report line, and the bus scan.

use core::fmt::Write;

use heapless::String;

use crate::bus::{BusError, I2cBus};
use crate::sensor::{Lm75, BASE_ADDRESS};

/// Sensors installed on the production board.
pub const SENSOR_COUNT: usize = 8;

const SCAN_RETRIES: u8 = 2;
const SCAN_TIMEOUT_MS: u32 = 80;

// Sized for "temp \t" plus eight " -128\t" fields and the trailing CR.
const LINE_CAPACITY: usize = 64;
const INPUT_CAPACITY: usize = 48;

/// Buffered line console the report text goes out on.
pub trait Console {
    /// Queue `text` for transmission. The report routine makes one call per
    /// line so the line stays contiguous on the wire.
    fn puts(&mut self, text: &str);

    /// Copy a pending complete input line into `buf` without blocking.
    fn poll_line(&mut self, buf: &mut [u8]) -> Option<usize>;
}

/// Fixed-capacity bank of sensors at contiguous addresses, created once at
/// startup and polled for the lifetime of the process.
pub struct SensorBank<const N: usize> {
    sensors: heapless::Vec<Lm75, N>,
}

impl<const N: usize> SensorBank<N> {
    /// Probe and wake `N` sensors at `BASE_ADDRESS + slot`. Slots whose probe
    /// fails stay in the bank as absent entries and report 0.
    pub fn init<B: I2cBus>(bus: &mut B) -> Self {
        let mut sensors = heapless::Vec::new();
        for slot in 0..N as u8 {
            let _ = sensors.push(Lm75::probe(bus, BASE_ADDRESS + slot));
        }
        Self { sensors }
    }

    /// Poll every slot in address order and emit one report line, then drain
    /// any pending operator input.
    pub fn report<B: I2cBus, C: Console>(&mut self, bus: &mut B, console: &mut C) {
        let mut line: String<LINE_CAPACITY> = String::new();
        let _ = line.push_str("temp \t");
        for sensor in self.sensors.iter_mut() {
            let temp = sensor.temp_c(bus);
            let _ = write!(line, " {}\t", temp as i32);
        }
        let _ = line.push('\r');
        console.puts(&line);

        // Input is drained to keep the receive buffer moving; commands are
        // not dispatched anywhere yet.
        let mut input = [0u8; INPUT_CAPACITY];
        let _ = console.poll_line(&mut input);
    }
}

/// Sweep the 7-bit address space and report every device that answers. A
/// non-timeout error means the bus itself is unwell, so the sweep stops there.
pub fn scan<B: I2cBus, C: Console>(bus: &mut B, console: &mut C) {
    let mut found = 0u32;
    for address in 0..=0x7Fu8 {
        match bus.probe_ready(address, SCAN_RETRIES, SCAN_TIMEOUT_MS) {
            Ok(()) => {
                let mut line: String<40> = String::new();
                let _ = write!(line, "Found device at address - {}\r\n", address);
                console.puts(&line);
                found += 1;
            }
            Err(BusError::Timeout) => {}
            Err(_) => {
                console.puts("I2C bus problem\r\n");
                return;
            }
        }
    }
    if found == 0 {
        console.puts("No devices found\r\n");
    }
}
