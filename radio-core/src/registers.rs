//! Shadow copy of the receiver's sixteen 16-bit registers
//!
//! The chip reads back starting at 0xA and wrapping through 0xF to 0x0..=0x9,
//! and writes starting at 0x2. The bank is stored in read order, which makes
//! the writable range 0x2..=0x9 the contiguous tail of the array, so a write
//! is a single linear transfer. [`storage_slot`] is the only place that
//! mapping is spelled out.

use embedded_hal::i2c::{Error as _, I2c};
use heapless::Vec;

use crate::types::RadioError;

/// Logical register addresses
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    DeviceId = 0x0,
    ChipId = 0x1,
    PowerConfig = 0x2,
    Channel = 0x3,
    SysConfig1 = 0x4,
    SysConfig2 = 0x5,
    SysConfig3 = 0x6,
    Test1 = 0x7,
    Test2 = 0x8,
    BootConfig = 0x9,
    StatusRssi = 0xA,
    ReadChan = 0xB,
    RdsA = 0xC,
    RdsB = 0xD,
    RdsC = 0xE,
    RdsD = 0xF,
}

impl Register {
    pub const ALL: [Register; 16] = [
        Register::DeviceId,
        Register::ChipId,
        Register::PowerConfig,
        Register::Channel,
        Register::SysConfig1,
        Register::SysConfig2,
        Register::SysConfig3,
        Register::Test1,
        Register::Test2,
        Register::BootConfig,
        Register::StatusRssi,
        Register::ReadChan,
        Register::RdsA,
        Register::RdsB,
        Register::RdsC,
        Register::RdsD,
    ];

    /// First register of every write transaction
    pub const WRITE_START: Register = Register::PowerConfig;
    /// Last register a write transaction may reach
    pub const WRITE_LIMIT: Register = Register::BootConfig;

    pub const fn address(self) -> u8 {
        self as u8
    }

    pub const fn from_address(address: u8) -> Option<Register> {
        if address < 16 {
            Some(Self::ALL[address as usize])
        } else {
            None
        }
    }

    pub const fn is_writable(self) -> bool {
        let address = self.address();
        address >= Self::WRITE_START.address() && address <= Self::WRITE_LIMIT.address()
    }
}

/// Register field masks
pub mod bits {
    // POWERCFG
    pub const DSMUTE: u16 = 1 << 15;
    pub const DMUTE: u16 = 1 << 14;
    pub const MONO: u16 = 1 << 13;
    pub const ENABLE: u16 = 1 << 0;

    // CHANNEL
    pub const TUNE: u16 = 1 << 15;
    pub const CHANNEL_MASK: u16 = 0x03FF;

    // SYSCONFIG1
    /// De-emphasis 50 us (set) or 75 us (clear)
    pub const DE: u16 = 1 << 11;

    // SYSCONFIG2
    pub const BAND_SHIFT: u16 = 6;
    pub const SPACE_SHIFT: u16 = 4;
    pub const VOLUME_MASK: u16 = 0x000F;

    // TEST1
    /// Crystal oscillator enable with the recommended companion bits
    pub const XOSC_ENABLE: u16 = 0x8100;

    // STATUSRSSI
    pub const STC: u16 = 1 << 14;
    pub const STEREO: u16 = 1 << 8;
    pub const RSSI_MASK: u16 = 0x00FF;

    // READCHAN
    pub const READCHAN_MASK: u16 = 0x03FF;
}

/// Register the chip sends first on a read
const READ_START: u8 = 0xA;

/// Logical address to storage slot
const STORAGE_SLOT: [usize; 16] = {
    let mut table = [0usize; 16];
    let mut address = 0;
    while address < 16 {
        table[address] = (address + 16 - READ_START as usize) % 16;
        address += 1;
    }
    table
};

/// Storage slot of `register` within the bank
pub const fn storage_slot(register: Register) -> usize {
    STORAGE_SLOT[register.address() as usize]
}

/// In-memory mirror of the receiver registers.
///
/// Single source of truth for what the next write transmits. Setters never
/// touch the bus.
#[derive(Clone, Debug)]
pub struct ShadowRegisters {
    address: u8,
    bank: [u16; 16],
    stale: bool,
}

impl ShadowRegisters {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            bank: [0; 16],
            stale: false,
        }
    }

    /// Bus address of the receiver
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn get(&self, register: Register) -> u16 {
        self.bank[storage_slot(register)]
    }

    pub fn set(&mut self, register: Register, value: u16) {
        self.bank[storage_slot(register)] = value;
    }

    pub fn modify(&mut self, register: Register, f: impl FnOnce(u16) -> u16) {
        let slot = storage_slot(register);
        self.bank[slot] = f(self.bank[slot]);
    }

    /// Set by a failed transaction, cleared by the next successful
    /// [`read_all`](Self::read_all)
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Replace the whole bank with one read transaction
    pub fn read_all<B: I2c>(&mut self, bus: &mut B) -> Result<(), RadioError> {
        let mut raw = [0u8; 32];
        if let Err(err) = bus.read(self.address, &mut raw) {
            self.stale = true;
            warn!("register read failed");
            return Err(RadioError::Bus(err.kind()));
        }

        for (slot, word) in raw.chunks_exact(2).enumerate() {
            self.bank[slot] = u16::from_be_bytes([word[0], word[1]]);
        }
        self.stale = false;
        trace!("registers read");
        Ok(())
    }

    /// Transmit registers 0x2 through `upto` inclusive in one transaction.
    ///
    /// Registers past `upto` keep whatever the chip holds.
    pub fn write_through<B: I2c>(&mut self, bus: &mut B, upto: Register) -> Result<(), RadioError> {
        if !upto.is_writable() {
            return Err(RadioError::RegisterRange(upto));
        }

        let first = storage_slot(Register::WRITE_START);
        let last = storage_slot(upto);
        let mut frame: Vec<u8, 16> = Vec::new();
        for value in &self.bank[first..=last] {
            frame
                .extend_from_slice(&value.to_be_bytes())
                .map_err(|_| RadioError::RegisterRange(upto))?;
        }

        if let Err(err) = bus.write(self.address, &frame) {
            self.stale = true;
            warn!("register write through {} failed", upto);
            return Err(RadioError::Bus(err.kind()));
        }
        trace!("registers written through {}", upto);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::RECEIVER_ADDRESS;
    use crate::test_utils::bus::SimReceiver;

    #[test]
    fn test_storage_slots_follow_read_order() {
        assert_eq!(storage_slot(Register::StatusRssi), 0);
        assert_eq!(storage_slot(Register::RdsD), 5);
        assert_eq!(storage_slot(Register::DeviceId), 6);
        assert_eq!(storage_slot(Register::PowerConfig), 8);
        assert_eq!(storage_slot(Register::BootConfig), 15);
    }

    #[test]
    fn test_writable_range_is_contiguous() {
        let slots: std::vec::Vec<usize> = Register::ALL
            .iter()
            .filter(|reg| reg.is_writable())
            .map(|reg| storage_slot(*reg))
            .collect();
        assert_eq!(slots, (8..16).collect::<std::vec::Vec<_>>());
    }

    #[test]
    fn test_get_set_by_logical_address() {
        let mut shadow = ShadowRegisters::new(RECEIVER_ADDRESS);
        for reg in Register::ALL {
            shadow.set(reg, 0x1000 + reg.address() as u16);
        }
        for reg in Register::ALL {
            assert_eq!(shadow.get(reg), 0x1000 + reg.address() as u16);
        }
        shadow.modify(Register::SysConfig1, |v| v | bits::DE);
        assert_eq!(shadow.get(Register::SysConfig1), 0x1004 | bits::DE);
    }

    #[test]
    fn test_read_all_maps_wrapped_order() {
        let chip = SimReceiver::new();
        for reg in Register::ALL {
            chip.poke(reg, 0xA500 | reg.address() as u16);
        }
        let mut bus = chip.bus();
        let mut shadow = ShadowRegisters::new(RECEIVER_ADDRESS);

        shadow.read_all(&mut bus).unwrap();

        assert!(!shadow.is_stale());
        for reg in Register::ALL {
            assert_eq!(shadow.get(reg), 0xA500 | reg.address() as u16);
        }
    }

    #[test]
    fn test_write_through_sends_prefix_only() {
        let chip = SimReceiver::new();
        chip.poke(Register::Test2, 0xBEEF);
        let mut bus = chip.bus();
        let mut shadow = ShadowRegisters::new(RECEIVER_ADDRESS);
        shadow.set(Register::PowerConfig, 0x0001);
        shadow.set(Register::Channel, 0x8064);
        shadow.set(Register::Test2, 0x1234);

        shadow.write_through(&mut bus, Register::Channel).unwrap();

        assert_eq!(chip.writes(), vec![vec![0x0001, 0x8064]]);
        assert_eq!(chip.peek(Register::Test2), 0xBEEF);
    }

    #[test]
    fn test_write_through_rejects_out_of_range() {
        let chip = SimReceiver::new();
        let mut bus = chip.bus();
        let mut shadow = ShadowRegisters::new(RECEIVER_ADDRESS);

        for reg in [Register::DeviceId, Register::ChipId, Register::StatusRssi] {
            assert_eq!(
                shadow.write_through(&mut bus, reg),
                Err(RadioError::RegisterRange(reg))
            );
        }
        assert!(chip.writes().is_empty());
    }

    #[test]
    fn test_bus_failure_marks_stale() {
        let chip = SimReceiver::new();
        let mut bus = chip.bus();
        let mut shadow = ShadowRegisters::new(RECEIVER_ADDRESS);
        shadow.read_all(&mut bus).unwrap();

        chip.fail_next();
        let result = shadow.write_through(&mut bus, Register::PowerConfig);

        assert!(matches!(result, Err(RadioError::Bus(_))));
        assert!(shadow.is_stale());

        shadow.read_all(&mut bus).unwrap();
        assert!(!shadow.is_stale());
    }
}
