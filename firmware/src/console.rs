//! Line-oriented serial console over embedded-io.

use embedded_io::{Read, ReadReady, Write};
use lm75::report::Console;

const LINE_CAPACITY: usize = 64;

pub struct SerialConsole<U> {
    uart: U,
    pending: heapless::Vec<u8, LINE_CAPACITY>,
    overrun: bool,
}

impl<U> SerialConsole<U> {
    pub fn new(uart: U) -> Self {
        Self {
            uart,
            pending: heapless::Vec::new(),
            overrun: false,
        }
    }
}

impl<U: Read + ReadReady + Write> Console for SerialConsole<U> {
    fn puts(&mut self, text: &str) {
        let _ = self.uart.write_all(text.as_bytes());
        let _ = self.uart.flush();
    }

    fn poll_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        while self.uart.read_ready().unwrap_or(false) {
            let mut byte = [0u8; 1];
            match self.uart.read(&mut byte) {
                Ok(n) if n > 0 => {}
                _ => break,
            }
            match byte[0] {
                b'\r' | b'\n' => {
                    if self.overrun {
                        // a line the buffer could not hold is dropped whole
                        self.overrun = false;
                        self.pending.clear();
                        continue;
                    }
                    if self.pending.is_empty() {
                        continue;
                    }
                    let len = self.pending.len().min(buf.len());
                    buf[..len].copy_from_slice(&self.pending[..len]);
                    self.pending.clear();
                    return Some(len);
                }
                data => {
                    if self.pending.push(data).is_err() {
                        self.overrun = true;
                    }
                }
            }
        }
        None
    }
}
