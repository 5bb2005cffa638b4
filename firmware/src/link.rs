//! Programming link: asynchronous serial bytes on the SDIO pin
//!
//! The programmer powers the board above the programming threshold and then
//! sends 8N1 frames, LSB first, on PC1. Only used while the receiver is held
//! in reset. The EEPROM sits on the same pin, so the link borrows it while
//! reading and hands it back to the bus on release.

use embedded_hal::delay::DelayNs;
use embedded_io::{ErrorKind, ErrorType, Read};
use radio_core::{HalError, PacketLink};

use crate::delay::SysTickDelay;
use crate::gpio::Pin;

const BAUD: u32 = 1_200;
const BIT_US: u32 = 1_000_000 / BAUD;
const POLL_US: u32 = 10;
/// Give up waiting for a start bit after this long and report no data
const START_TIMEOUT_US: u32 = 250_000;

pub struct ProgrammingLink {
    data: Pin,
    delay: SysTickDelay,
    claimed: bool,
}

impl ProgrammingLink {
    pub fn new(data: Pin, delay: SysTickDelay) -> Self {
        Self {
            data,
            delay,
            claimed: false,
        }
    }

    /// Take the pin away from the bus until the next release
    fn claim(&mut self) {
        if !self.claimed {
            self.data = self.data.into_pull_up_input();
            self.claimed = true;
        }
    }

    fn wait_for_start(&mut self) -> bool {
        let mut waited = 0;
        while self.data.level() {
            if waited >= START_TIMEOUT_US {
                return false;
            }
            self.delay.delay_us(POLL_US);
            waited += POLL_US;
        }
        true
    }

    fn receive_byte(&mut self) -> Result<Option<u8>, ErrorKind> {
        if !self.wait_for_start() {
            return Ok(None);
        }

        // Sample mid-bit; a start bit that is gone again was a glitch
        self.delay.delay_us(BIT_US / 2);
        if self.data.level() {
            return Ok(None);
        }

        let mut byte = 0u8;
        for bit in 0..8 {
            self.delay.delay_us(BIT_US);
            if self.data.level() {
                byte |= 1 << bit;
            }
        }

        self.delay.delay_us(BIT_US);
        if !self.data.level() {
            return Err(ErrorKind::InvalidData);
        }
        Ok(Some(byte))
    }
}

impl ErrorType for ProgrammingLink {
    type Error = ErrorKind;
}

impl Read for ProgrammingLink {
    /// One byte per call; 0 when the line stayed idle
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some(slot) = buf.first_mut() else {
            return Ok(0);
        };
        self.claim();
        match self.receive_byte()? {
            Some(byte) => {
                *slot = byte;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

impl PacketLink for ProgrammingLink {
    /// Back to open drain, released high, as the bus left it
    fn release(&mut self) -> Result<(), HalError> {
        if self.claimed {
            self.data = self.data.into_open_drain_output();
            self.claimed = false;
        }
        Ok(())
    }
}
