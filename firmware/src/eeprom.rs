//! 24C02 parameter EEPROM on the shared two-wire bus
//!
//! 256 bytes, one address byte, 8-byte write pages and up to 5 ms of
//! internal write time after each page.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, I2c};
use embedded_storage::{ReadStorage, Storage};

use crate::delay::SysTickDelay;
use crate::i2c::BitBangI2c;

const ADDRESS: u8 = 0x50;
pub const CAPACITY: usize = 256;
const PAGE_SIZE: usize = 8;
const WRITE_CYCLE_MS: u32 = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EepromError {
    Bus(ErrorKind),
    OutOfRange,
}

pub struct Eeprom24c02 {
    bus: BitBangI2c,
    delay: SysTickDelay,
}

impl Eeprom24c02 {
    pub fn new(bus: BitBangI2c, delay: SysTickDelay) -> Self {
        Self { bus, delay }
    }

    fn check_range(offset: u32, len: usize) -> Result<u8, EepromError> {
        if offset as usize + len > CAPACITY {
            return Err(EepromError::OutOfRange);
        }
        Ok(offset as u8)
    }
}

impl ReadStorage for Eeprom24c02 {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = Self::check_range(offset, bytes.len())?;
        self.bus
            .write_read(ADDRESS, &[start], bytes)
            .map_err(EepromError::Bus)
    }

    fn capacity(&self) -> usize {
        CAPACITY
    }
}

impl Storage for Eeprom24c02 {
    /// Writes never cross a page boundary; the address counter would wrap
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let mut address = Self::check_range(offset, bytes.len())? as usize;
        let mut remaining = bytes;

        while !remaining.is_empty() {
            let room = PAGE_SIZE - address % PAGE_SIZE;
            let (chunk, rest) = remaining.split_at(room.min(remaining.len()));

            let mut frame = [0u8; 1 + PAGE_SIZE];
            frame[0] = address as u8;
            frame[1..=chunk.len()].copy_from_slice(chunk);
            self.bus
                .write(ADDRESS, &frame[..=chunk.len()])
                .map_err(EepromError::Bus)?;
            self.delay.delay_ms(WRITE_CYCLE_MS);

            address += chunk.len();
            remaining = rest;
        }
        Ok(())
    }
}
