//! Bit-banged two-wire master on PC1 (SDIO) / PC2 (SCLK)
//!
//! The receiver and the parameter EEPROM share the bus. Both lines are open
//! drain; a line is "written high" by releasing it.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};

use crate::delay::SysTickDelay;
use crate::gpio::Pin;

/// Half-period of the clock, roughly 100 kHz
const HALF_PERIOD_US: u32 = 5;

/// Samples of SDA while waiting for an ACK
const ACK_POLLS: u16 = 255;

#[derive(Copy, Clone)]
pub struct BitBangI2c {
    sda: Pin,
    scl: Pin,
    delay: SysTickDelay,
}

impl BitBangI2c {
    pub fn new(sda: Pin, scl: Pin, delay: SysTickDelay) -> Self {
        Self { sda, scl, delay }
    }

    /// Idle the bus: both lines released
    pub fn init(&self) {
        self.sda.into_open_drain_output();
        self.scl.into_open_drain_output();
    }

    #[inline(always)]
    fn half(&mut self) {
        self.delay.delay_us(HALF_PERIOD_US);
    }

    fn start(&mut self) {
        self.sda.set(true);
        self.scl.set(true);
        self.half();
        self.sda.set(false);
        self.half();
        self.scl.set(false);
        self.half();
    }

    fn stop(&mut self) {
        self.sda.set(false);
        self.half();
        self.scl.set(true);
        self.half();
        self.sda.set(true);
        self.half();
    }

    /// Clock one byte out; true when the target acknowledged
    fn write_byte(&mut self, mut byte: u8) -> bool {
        for _ in 0..8 {
            self.sda.set(byte & 0x80 != 0);
            byte <<= 1;
            self.half();
            self.scl.set(true);
            self.half();
            self.scl.set(false);
        }

        self.sda.set(true);
        self.half();
        self.scl.set(true);
        self.half();
        let mut ack = false;
        for _ in 0..ACK_POLLS {
            if !self.sda.level() {
                ack = true;
                break;
            }
        }
        self.scl.set(false);
        self.half();
        ack
    }

    /// Clock one byte in and answer ACK, or NACK for the final byte
    fn read_byte(&mut self, last: bool) -> u8 {
        let mut byte = 0u8;
        self.sda.set(true);
        for _ in 0..8 {
            self.half();
            self.scl.set(true);
            self.half();
            byte = (byte << 1) | self.sda.level() as u8;
            self.scl.set(false);
        }

        self.sda.set(last);
        self.half();
        self.scl.set(true);
        self.half();
        self.scl.set(false);
        self.sda.set(true);
        byte
    }

    fn run(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        let mut previous_read: Option<bool> = None;

        for index in 0..operations.len() {
            let is_read = matches!(operations[index], Operation::Read(_));
            // Adjacent reads are one read: ACK straight through into the next buffer
            let next_is_read = matches!(operations.get(index + 1), Some(Operation::Read(_)));

            // Repeated start only when the direction changes
            if previous_read != Some(is_read) {
                self.start();
                if !self.write_byte((address << 1) | is_read as u8) {
                    return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                }
            }

            match &mut operations[index] {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        if !self.write_byte(byte) {
                            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
                        }
                    }
                }
                Operation::Read(buffer) => {
                    let len = buffer.len();
                    for (i, slot) in buffer.iter_mut().enumerate() {
                        let last = i + 1 == len && !next_is_read;
                        *slot = self.read_byte(last);
                    }
                }
            }
            previous_read = Some(is_read);
        }
        Ok(())
    }
}

impl ErrorType for BitBangI2c {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for BitBangI2c {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let result = self.run(address, operations);
        self.stop();
        result
    }
}
