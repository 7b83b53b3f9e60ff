//! The sensor bus contract over any embedded-hal I2C master.

use embedded_hal::i2c::{Error, ErrorKind, I2c};
use lm75::bus::{BusError, I2cBus};

pub struct HalBus<I> {
    i2c: I,
}

impl<I> HalBus<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }
}

// An absent device NACKs its address on this controller; that is the
// "nobody answered" outcome, distinct from a bus-level fault.
fn map_err<E: Error>(err: E) -> BusError {
    match err.kind() {
        ErrorKind::NoAcknowledge(_) => BusError::Timeout,
        _ => BusError::Error,
    }
}

impl<I: I2c> I2cBus for HalBus<I> {
    // The controller's transfer timeout is fixed at peripheral setup, so the
    // per-call budget only bounds the number of attempts here.
    fn probe_ready(&mut self, address: u8, retries: u8, _timeout_ms: u32) -> Result<(), BusError> {
        let mut status = Err(BusError::Timeout);
        for _ in 0..retries.max(1) {
            status = self.i2c.write(address, &[]).map_err(map_err);
            if status.is_ok() {
                break;
            }
        }
        status
    }

    fn register_read(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        _timeout_ms: u32,
    ) -> Result<(), BusError> {
        self.i2c
            .write_read(address, &[register], buf)
            .map_err(map_err)
    }

    fn register_write(
        &mut self,
        address: u8,
        register: u8,
        bytes: &[u8],
        _timeout_ms: u32,
    ) -> Result<(), BusError> {
        // register index plus at most a two-byte data phase
        let mut frame = [0u8; 3];
        frame[0] = register;
        frame[1..1 + bytes.len()].copy_from_slice(bytes);
        self.i2c
            .write(address, &frame[..1 + bytes.len()])
            .map_err(map_err)
    }

    fn receive(&mut self, address: u8, buf: &mut [u8], _timeout_ms: u32) -> Result<(), BusError> {
        self.i2c.read(address, buf).map_err(map_err)
    }
}
