//! Raw GPIO pins

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::regs::{self, gpio};

/// One pin of one port. Copyable so shared pins can be handed to several
/// drivers; only one of them uses the pin at a time.
#[derive(Copy, Clone)]
pub struct Pin {
    port: u32,
    pin: u8,
}

impl Pin {
    pub const fn new(port: u32, pin: u8) -> Self {
        Self { port, pin }
    }

    /// Write the CNF:MODE nibble for this pin
    pub fn configure(&self, mode: u32) {
        let shift = self.pin as u32 * 4;
        regs::modify(self.port, gpio::CFGLR, |cfg| (cfg & !(0xF << shift)) | (mode << shift));
    }

    pub fn into_pull_up_input(self) -> Self {
        self.configure(gpio::INPUT_PULL);
        regs::set_bits(self.port, gpio::OUTDR, 1 << self.pin);
        self
    }

    pub fn into_floating_input(self) -> Self {
        self.configure(gpio::INPUT_FLOATING);
        self
    }

    pub fn into_push_pull_output(self) -> Self {
        self.configure(gpio::OUTPUT_PUSH_PULL);
        self
    }

    /// Open drain, released (high) until driven low
    pub fn into_open_drain_output(self) -> Self {
        self.set(true);
        self.configure(gpio::OUTPUT_OPEN_DRAIN);
        self
    }

    pub fn into_alternate_push_pull(self) -> Self {
        self.configure(gpio::ALTERNATE_PUSH_PULL);
        self
    }

    #[inline(always)]
    pub fn set(&self, high: bool) {
        let bit = if high { 1 << self.pin } else { 1 << (self.pin + 16) };
        regs::write(self.port, gpio::BSHR, bit);
    }

    /// Pin level as seen by the input stage, also valid in open-drain mode
    #[inline(always)]
    pub fn level(&self) -> bool {
        regs::read(self.port, gpio::INDR) & (1 << self.pin) != 0
    }
}

impl ErrorType for Pin {
    type Error = Infallible;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level())
    }
}

impl OutputPin for Pin {
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }
}
