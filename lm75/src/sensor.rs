//! Register-level interface to one LM75 digital temperature sensor.

use bitfield::bitfield;

use crate::bus::I2cBus;

/// Address of the first sensor; the bank assigns `BASE_ADDRESS + slot`.
pub const BASE_ADDRESS: u8 = 0x48;

// A device that never answered its probe keeps this address and every
// register operation on it is a no-op.
const ADDRESS_NONE: u8 = 0;

const PROBE_RETRIES: u8 = 3;
const PROBE_TIMEOUT_MS: u32 = 1000;
const TRANSFER_TIMEOUT_MS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Temp = 0x00,
    Config = 0x01,
    THyst = 0x02,
    Tos = 0x03,
}

impl Register {
    /// Width of the data phase. Config is the only one-byte register.
    fn len(self) -> usize {
        match self {
            Register::Config => 1,
            _ => 2,
        }
    }
}

bitfield! {
    struct CfgRegister(u8);
    impl Debug;
    shutdown, set_shutdown: 0;
    interrupt_mode, set_interrupt_mode: 1;
    os_active_high, set_os_active_high: 2;
    fault_queue, set_fault_queue: 4, 3;
    _, set_reserved: 7, 5;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermostatMode {
    /// OS output follows the comparison against the limits.
    Comparator,
    /// OS output latches until a register read clears it.
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsPolarity {
    ActiveLow,
    ActiveHigh,
}

/// Consecutive out-of-limit conversions before the OS output asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultTolerance {
    One = 0b00,
    Two = 0b01,
    Four = 0b10,
    Six = 0b11,
}

impl FaultTolerance {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => FaultTolerance::One,
            0b01 => FaultTolerance::Two,
            0b10 => FaultTolerance::Four,
            _ => FaultTolerance::Six,
        }
    }
}

/// One physical LM75. The shared bus is passed into each call; it has a
/// single owner and outlives every sensor.
pub struct Lm75 {
    address: u8,
    // Last register addressed on this device. Each LM75 latches its own
    // register pointer, so the cache is per-device even though the wires are
    // shared; the first access after construction always runs a full address
    // cycle because this starts out empty.
    last_reg: Option<Register>,
}

impl Lm75 {
    /// Probe `address` and wake the device out of shutdown, confirming the
    /// wakeup with a read-back. A device that never answers is marked absent
    /// rather than reported as an error, so a bank keeps initializing its
    /// remaining slots.
    pub fn probe<B: I2cBus>(bus: &mut B, address: u8) -> Self {
        let mut sensor = match bus.probe_ready(address, PROBE_RETRIES, PROBE_TIMEOUT_MS) {
            Ok(()) => Self {
                address,
                last_reg: None,
            },
            Err(_) => Self {
                address: ADDRESS_NONE,
                last_reg: None,
            },
        };
        if sensor.is_present() {
            sensor.set_shutdown(bus, false);
            let _ = sensor.shutdown(bus);
        }
        sensor
    }

    pub fn is_present(&self) -> bool {
        self.address != ADDRESS_NONE
    }

    /// Raw register read. Re-reading the register addressed last skips the
    /// address phase and receives straight off the device's pointer.
    ///
    /// Transaction status is discarded: a failed transfer yields the
    /// zero-initialized buffer, indistinguishable from real data.
    pub fn get_register<B: I2cBus>(&mut self, bus: &mut B, reg: Register) -> u16 {
        if !self.is_present() {
            return 0;
        }
        let mut data = [0u8; 2];
        let buf = &mut data[..reg.len()];
        let _ = if self.last_reg == Some(reg) {
            bus.receive(self.address, buf, TRANSFER_TIMEOUT_MS)
        } else {
            bus.register_read(self.address, reg as u8, buf, TRANSFER_TIMEOUT_MS)
        };
        self.last_reg = Some(reg);
        match reg.len() {
            1 => data[0] as u16,
            _ => u16::from_be_bytes(data),
        }
    }

    /// Raw register write. Two-byte registers go out high byte first, the
    /// same order reads come back in. Status is discarded; no retry.
    pub fn set_register<B: I2cBus>(&mut self, bus: &mut B, reg: Register, value: u16) {
        if !self.is_present() {
            return;
        }
        let bytes = value.to_be_bytes();
        let data = match reg.len() {
            1 => &bytes[1..],
            _ => &bytes[..],
        };
        let _ = bus.register_write(self.address, reg as u8, data, TRANSFER_TIMEOUT_MS);
        self.last_reg = Some(reg);
    }

    /// Current temperature in degrees Celsius. The register holds a
    /// two's-complement fixed-point value with 1/256 degree resolution.
    pub fn temp_c<B: I2cBus>(&mut self, bus: &mut B) -> f32 {
        Self::to_celsius(self.get_register(bus, Register::Temp))
    }

    /// Hysteresis limit for the OS output.
    pub fn hysteresis_c<B: I2cBus>(&mut self, bus: &mut B) -> f32 {
        Self::to_celsius(self.get_register(bus, Register::THyst))
    }

    pub fn set_hysteresis_c<B: I2cBus>(&mut self, bus: &mut B, celsius: f32) {
        self.set_register(bus, Register::THyst, Self::from_celsius(celsius));
    }

    /// Over-temperature shutdown threshold.
    pub fn overtemp_c<B: I2cBus>(&mut self, bus: &mut B) -> f32 {
        Self::to_celsius(self.get_register(bus, Register::Tos))
    }

    pub fn set_overtemp_c<B: I2cBus>(&mut self, bus: &mut B, celsius: f32) {
        self.set_register(bus, Register::Tos, Self::from_celsius(celsius));
    }

    pub fn shutdown<B: I2cBus>(&mut self, bus: &mut B) -> bool {
        self.config(bus).shutdown()
    }

    pub fn set_shutdown<B: I2cBus>(&mut self, bus: &mut B, shutdown: bool) {
        let mut regv = self.config(bus);
        regv.set_shutdown(shutdown);
        self.write_config(bus, regv);
    }

    pub fn thermostat_mode<B: I2cBus>(&mut self, bus: &mut B) -> ThermostatMode {
        if self.config(bus).interrupt_mode() {
            ThermostatMode::Interrupt
        } else {
            ThermostatMode::Comparator
        }
    }

    pub fn set_thermostat_mode<B: I2cBus>(&mut self, bus: &mut B, mode: ThermostatMode) {
        let mut regv = self.config(bus);
        regv.set_interrupt_mode(mode == ThermostatMode::Interrupt);
        self.write_config(bus, regv);
    }

    pub fn os_polarity<B: I2cBus>(&mut self, bus: &mut B) -> OsPolarity {
        if self.config(bus).os_active_high() {
            OsPolarity::ActiveHigh
        } else {
            OsPolarity::ActiveLow
        }
    }

    pub fn set_os_polarity<B: I2cBus>(&mut self, bus: &mut B, polarity: OsPolarity) {
        let mut regv = self.config(bus);
        regv.set_os_active_high(polarity == OsPolarity::ActiveHigh);
        self.write_config(bus, regv);
    }

    pub fn fault_tolerance<B: I2cBus>(&mut self, bus: &mut B) -> FaultTolerance {
        FaultTolerance::from_bits(self.config(bus).fault_queue())
    }

    pub fn set_fault_tolerance<B: I2cBus>(&mut self, bus: &mut B, tolerance: FaultTolerance) {
        let mut regv = self.config(bus);
        regv.set_fault_queue(tolerance as u8);
        self.write_config(bus, regv);
    }

    fn config<B: I2cBus>(&mut self, bus: &mut B) -> CfgRegister {
        CfgRegister(self.get_register(bus, Register::Config) as u8)
    }

    // Every setter re-reads the byte, mutates one field, and writes the whole
    // byte back. The sequence is not atomic across bus errors: a failed read
    // feeds the subsequent write.
    fn write_config<B: I2cBus>(&mut self, bus: &mut B, mut regv: CfgRegister) {
        regv.set_reserved(0);
        self.set_register(bus, Register::Config, regv.0 as u16);
    }

    fn to_celsius(raw: u16) -> f32 {
        raw as i16 as f32 / 256.0
    }

    fn from_celsius(celsius: f32) -> u16 {
        // truncates toward zero
        (celsius * 256.0) as i16 as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBus, MockDevice, Transfer};

    fn bus_with(address: u8, temp_raw: u16) -> MockBus {
        MockBus::with_devices(vec![MockDevice::with_temp_raw(address, temp_raw)])
    }

    #[test]
    fn probe_wakes_device_and_verifies() {
        let mut bus = MockBus::with_devices(vec![MockDevice::new(0x48)]);
        // asleep out of the box, with junk in the reserved bits
        bus.devices[0].regs[1] = 0xE1;

        let mut sensor = Lm75::probe(&mut bus, 0x48);

        assert!(sensor.is_present());
        assert_eq!(bus.device(0x48).regs[1], 0x00);
        assert_eq!(
            bus.log,
            vec![
                Transfer::Probe { address: 0x48 },
                Transfer::RegisterRead {
                    address: 0x48,
                    register: 0x01,
                    len: 1
                },
                Transfer::RegisterWrite {
                    address: 0x48,
                    register: 0x01,
                    bytes: vec![0x00]
                },
                // read-back lands on the still-selected config register
                Transfer::Receive {
                    address: 0x48,
                    len: 1
                },
            ]
        );
        assert!(!sensor.shutdown(&mut bus));
    }

    #[test]
    fn temp_decodes_fixed_point() {
        let mut bus = bus_with(0x48, 0x1780);
        let mut sensor = Lm75::probe(&mut bus, 0x48);

        assert_eq!(sensor.temp_c(&mut bus), 23.5);
    }

    #[test]
    fn temp_decodes_negative_values() {
        let mut bus = bus_with(0x48, 0xFB00);
        let mut sensor = Lm75::probe(&mut bus, 0x48);

        assert_eq!(sensor.temp_c(&mut bus), -5.0);

        bus.devices[0].regs[0] = 0xFF80;
        assert_eq!(sensor.temp_c(&mut bus), -0.5);
    }

    #[test]
    fn repeat_read_skips_address_phase() {
        let mut bus = bus_with(0x48, 0x1780);
        let mut sensor = Lm75::probe(&mut bus, 0x48);
        bus.log.clear();

        sensor.temp_c(&mut bus);
        sensor.temp_c(&mut bus);
        sensor.hysteresis_c(&mut bus);

        assert_eq!(
            bus.log,
            vec![
                Transfer::RegisterRead {
                    address: 0x48,
                    register: 0x00,
                    len: 2
                },
                Transfer::Receive {
                    address: 0x48,
                    len: 2
                },
                Transfer::RegisterRead {
                    address: 0x48,
                    register: 0x02,
                    len: 2
                },
            ]
        );
    }

    #[test]
    fn address_cache_is_per_device() {
        let mut bus = MockBus::with_devices(vec![
            MockDevice::with_temp_raw(0x48, 0x1780),
            MockDevice::with_temp_raw(0x49, 0xFB00),
        ]);
        let mut first = Lm75::probe(&mut bus, 0x48);
        let mut second = Lm75::probe(&mut bus, 0x49);

        assert_eq!(first.temp_c(&mut bus), 23.5);
        assert_eq!(second.temp_c(&mut bus), -5.0);
        // the first device's pointer latch still holds Temp, so the raw
        // receive reads the right register despite the interleaving
        assert_eq!(first.temp_c(&mut bus), 23.5);
        assert_eq!(
            bus.log.last(),
            Some(&Transfer::Receive {
                address: 0x48,
                len: 2
            })
        );
    }

    #[test]
    fn absent_sensor_is_inert() {
        let mut bus = MockBus::default();
        let mut sensor = Lm75::probe(&mut bus, 0x48);

        assert!(!sensor.is_present());
        bus.log.clear();

        assert_eq!(sensor.temp_c(&mut bus), 0.0);
        assert_eq!(sensor.hysteresis_c(&mut bus), 0.0);
        assert_eq!(sensor.overtemp_c(&mut bus), 0.0);
        assert!(!sensor.shutdown(&mut bus));
        assert_eq!(sensor.thermostat_mode(&mut bus), ThermostatMode::Comparator);
        assert_eq!(sensor.os_polarity(&mut bus), OsPolarity::ActiveLow);
        assert_eq!(sensor.fault_tolerance(&mut bus), FaultTolerance::One);
        sensor.set_shutdown(&mut bus, true);
        sensor.set_overtemp_c(&mut bus, 80.0);
        assert!(bus.log.is_empty());
    }

    #[test]
    fn threshold_write_is_big_endian() {
        let mut bus = bus_with(0x48, 0);
        let mut sensor = Lm75::probe(&mut bus, 0x48);
        bus.log.clear();

        sensor.set_overtemp_c(&mut bus, 80.0);

        assert_eq!(
            bus.log,
            vec![Transfer::RegisterWrite {
                address: 0x48,
                register: 0x03,
                bytes: vec![0x50, 0x00]
            }]
        );
        assert_eq!(sensor.overtemp_c(&mut bus), 80.0);
    }

    #[test]
    fn threshold_set_truncates_toward_zero() {
        let mut bus = bus_with(0x48, 0);
        let mut sensor = Lm75::probe(&mut bus, 0x48);

        sensor.set_hysteresis_c(&mut bus, -4.2);
        // -4.2 * 256 = -1075.2, truncated to -1075
        assert_eq!(bus.device(0x48).regs[2], 0xFBCD);

        sensor.set_hysteresis_c(&mut bus, 23.9);
        // 23.9 * 256 = 6118.4, truncated to 6118
        assert_eq!(bus.device(0x48).regs[2], 6118);
    }

    #[test]
    fn config_fields_are_isolated() {
        let mut bus = bus_with(0x48, 0);
        let mut sensor = Lm75::probe(&mut bus, 0x48);

        sensor.set_thermostat_mode(&mut bus, ThermostatMode::Interrupt);
        sensor.set_fault_tolerance(&mut bus, FaultTolerance::Six);
        sensor.set_shutdown(&mut bus, true);

        assert_eq!(sensor.thermostat_mode(&mut bus), ThermostatMode::Interrupt);
        assert_eq!(sensor.fault_tolerance(&mut bus), FaultTolerance::Six);
        assert_eq!(sensor.os_polarity(&mut bus), OsPolarity::ActiveLow);
        assert!(sensor.shutdown(&mut bus));
        // reserved bits stay clear through every rewrite
        assert_eq!(bus.device(0x48).regs[1] & 0xE0, 0);
    }

    #[test]
    fn config_round_trips_every_field() {
        let mut regv = CfgRegister(0);
        regv.set_shutdown(true);
        regv.set_interrupt_mode(true);
        regv.set_os_active_high(true);
        regv.set_fault_queue(FaultTolerance::Four as u8);

        assert!(regv.shutdown());
        assert!(regv.interrupt_mode());
        assert!(regv.os_active_high());
        assert_eq!(
            FaultTolerance::from_bits(regv.fault_queue()),
            FaultTolerance::Four
        );
        assert_eq!(regv.0, 0b0001_0111);
    }

    #[test]
    fn getters_are_idempotent() {
        let mut bus = bus_with(0x48, 0x1A40);
        let mut sensor = Lm75::probe(&mut bus, 0x48);

        assert_eq!(sensor.temp_c(&mut bus), sensor.temp_c(&mut bus));
        assert_eq!(
            sensor.fault_tolerance(&mut bus),
            sensor.fault_tolerance(&mut bus)
        );
    }
}
