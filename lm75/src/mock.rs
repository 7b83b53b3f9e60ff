//! Simulated bus and console used by the driver and reporting tests.

use crate::bus::{BusError, I2cBus};
use crate::report::Console;

/// Traffic the mock saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Probe {
        address: u8,
    },
    RegisterRead {
        address: u8,
        register: u8,
        len: usize,
    },
    RegisterWrite {
        address: u8,
        register: u8,
        bytes: Vec<u8>,
    },
    Receive {
        address: u8,
        len: usize,
    },
}

/// One simulated LM75: four registers plus the chip's own pointer latch.
pub struct MockDevice {
    pub address: u8,
    pub regs: [u16; 4],
    pointer: u8,
}

impl MockDevice {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            regs: [0; 4],
            pointer: 0,
        }
    }

    pub fn with_temp_raw(address: u8, raw: u16) -> Self {
        let mut device = Self::new(address);
        device.regs[0] = raw;
        device
    }

    fn read_into(&self, buf: &mut [u8]) {
        let value = self.regs[(self.pointer & 0x03) as usize];
        match buf.len() {
            1 => buf[0] = value as u8,
            _ => buf.copy_from_slice(&value.to_be_bytes()),
        }
    }
}

#[derive(Default)]
pub struct MockBus {
    pub devices: Vec<MockDevice>,
    pub log: Vec<Transfer>,
    /// When set, every probe fails with this error instead of consulting the
    /// device list.
    pub fault: Option<BusError>,
}

impl MockBus {
    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            log: Vec::new(),
            fault: None,
        }
    }

    pub fn device(&self, address: u8) -> &MockDevice {
        self.devices.iter().find(|d| d.address == address).unwrap()
    }

    fn device_mut(&mut self, address: u8) -> Option<&mut MockDevice> {
        self.devices.iter_mut().find(|d| d.address == address)
    }
}

impl I2cBus for MockBus {
    fn probe_ready(&mut self, address: u8, _retries: u8, _timeout_ms: u32) -> Result<(), BusError> {
        self.log.push(Transfer::Probe { address });
        if let Some(err) = self.fault {
            return Err(err);
        }
        match self.device_mut(address) {
            Some(_) => Ok(()),
            None => Err(BusError::Timeout),
        }
    }

    fn register_read(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        _timeout_ms: u32,
    ) -> Result<(), BusError> {
        self.log.push(Transfer::RegisterRead {
            address,
            register,
            len: buf.len(),
        });
        match self.device_mut(address) {
            Some(device) => {
                device.pointer = register;
                device.read_into(buf);
                Ok(())
            }
            None => Err(BusError::Timeout),
        }
    }

    fn register_write(
        &mut self,
        address: u8,
        register: u8,
        bytes: &[u8],
        _timeout_ms: u32,
    ) -> Result<(), BusError> {
        self.log.push(Transfer::RegisterWrite {
            address,
            register,
            bytes: bytes.to_vec(),
        });
        match self.device_mut(address) {
            Some(device) => {
                device.pointer = register;
                device.regs[(register & 0x03) as usize] = match bytes.len() {
                    1 => bytes[0] as u16,
                    _ => u16::from_be_bytes([bytes[0], bytes[1]]),
                };
                Ok(())
            }
            None => Err(BusError::Timeout),
        }
    }

    fn receive(&mut self, address: u8, buf: &mut [u8], _timeout_ms: u32) -> Result<(), BusError> {
        self.log.push(Transfer::Receive {
            address,
            len: buf.len(),
        });
        match self.device_mut(address) {
            Some(device) => {
                device.read_into(buf);
                Ok(())
            }
            None => Err(BusError::Timeout),
        }
    }
}

#[derive(Default)]
pub struct MockConsole {
    pub output: String,
    pub input: Vec<&'static str>,
}

impl Console for MockConsole {
    fn puts(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn poll_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        let line = self.input.pop()?;
        let len = line.len().min(buf.len());
        buf[..len].copy_from_slice(&line.as_bytes()[..len]);
        Some(len)
    }
}
