//! I2C transport contract consumed by the sensor driver.

/// Transport-level failure.
///
/// `Timeout` is the "nobody answered" outcome. On controllers where a silent
/// device NACKs its address instead of stretching the clock, the adapter
/// reports that NACK as `Timeout` so callers can tell an absent device from a
/// bus fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    Error,
    Busy,
    Timeout,
}

/// Blocking I2C master primitives with a bounded per-transaction timeout.
///
/// `timeout_ms` caps how long a single transaction may block. Adapters whose
/// controller applies a fixed transfer timeout configured at peripheral setup
/// treat the argument as advisory.
pub trait I2cBus {
    /// Probe `address` with a bounded number of attempts.
    fn probe_ready(&mut self, address: u8, retries: u8, timeout_ms: u32) -> Result<(), BusError>;

    /// Select `register` on the device, then read `buf.len()` bytes.
    fn register_read(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        timeout_ms: u32,
    ) -> Result<(), BusError>;

    /// Select `register` and write `bytes` in the same transaction.
    fn register_write(
        &mut self,
        address: u8,
        register: u8,
        bytes: &[u8],
        timeout_ms: u32,
    ) -> Result<(), BusError>;

    /// Data phase only; the device's internal register pointer picks the
    /// source register.
    fn receive(&mut self, address: u8, buf: &mut [u8], timeout_ms: u32) -> Result<(), BusError>;
}
