//! CRC protected parameter blocks in non-volatile memory
//!
//! Two 16-byte blocks sit back to back: the working block at offset 0 and the
//! factory block right after it.
//!
//! | byte  | field                         |
//! |-------|-------------------------------|
//! | 0     | band selector                 |
//! | 1     | de-emphasis flag              |
//! | 2     | spacing selector              |
//! | 3..5  | channel, little-endian        |
//! | 5     | volume (0..=15)               |
//! | 6..14 | reserved                      |
//! | 14..16| CRC-16 of bytes 0..14, LE     |

use embedded_storage::Storage;

use crate::types::{Band, RadioError, Spacing};

pub const BLOCK_SIZE: usize = 16;
pub const WORKING_OFFSET: u32 = 0;
pub const FACTORY_OFFSET: u32 = BLOCK_SIZE as u32;

const BAND: usize = 0;
const DE_EMPHASIS: usize = 1;
const SPACING: usize = 2;
const CHANNEL: usize = 3;
const VOLUME: usize = 5;
const CRC: usize = BLOCK_SIZE - 2;

/// One step of CRC-16/ARC (reflected polynomial 0xA001, initial value 0)
pub const fn crc16_update(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ byte as u16;
    let mut bit = 0;
    while bit < 8 {
        crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
        bit += 1;
    }
    crc
}

pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0, |crc, &byte| crc16_update(crc, byte))
}

/// Persisted user settings, stored exactly as laid out on the device
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterBlock([u8; BLOCK_SIZE]);

impl ParameterBlock {
    /// Build a block with a valid CRC
    pub fn new(band: Band, de_emphasis: bool, spacing: Spacing, channel: u16, volume: u8) -> Self {
        let mut bytes = [0u8; BLOCK_SIZE];
        bytes[BAND] = band.bits();
        bytes[DE_EMPHASIS] = de_emphasis as u8;
        bytes[SPACING] = spacing.bits();
        bytes[CHANNEL..CHANNEL + 2].copy_from_slice(&channel.to_le_bytes());
        bytes[VOLUME] = volume & 0x0F;
        let mut block = Self(bytes);
        block.seal();
        block
    }

    /// Raw bytes as read from storage, CRC not checked
    pub const fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    pub fn band(&self) -> Band {
        Band::from_bits(self.0[BAND])
    }

    pub fn de_emphasis(&self) -> bool {
        self.0[DE_EMPHASIS] != 0
    }

    pub fn spacing(&self) -> Spacing {
        Spacing::from_bits(self.0[SPACING])
    }

    pub fn channel(&self) -> u16 {
        u16::from_le_bytes([self.0[CHANNEL], self.0[CHANNEL + 1]])
    }

    pub fn volume(&self) -> u8 {
        self.0[VOLUME] & 0x0F
    }

    pub fn stored_crc(&self) -> u16 {
        u16::from_le_bytes([self.0[CRC], self.0[CRC + 1]])
    }

    /// CRC over every byte preceding the CRC field
    pub fn computed_crc(&self) -> u16 {
        crc16(&self.0[..CRC])
    }

    pub fn is_valid(&self) -> bool {
        self.stored_crc() == self.computed_crc()
    }

    /// Change the channel and recompute the CRC
    pub fn set_channel(&mut self, channel: u16) {
        self.0[CHANNEL..CHANNEL + 2].copy_from_slice(&channel.to_le_bytes());
        self.seal();
    }

    fn seal(&mut self) {
        let crc = self.computed_crc();
        self.0[CRC..].copy_from_slice(&crc.to_le_bytes());
    }

    fn check(self) -> Result<Self, RadioError> {
        let stored = self.stored_crc();
        let computed = self.computed_crc();
        if stored == computed {
            Ok(self)
        } else {
            Err(RadioError::ParameterCrc { stored, computed })
        }
    }
}

impl Default for ParameterBlock {
    /// 87.5 - 108 MHz, 100 kHz steps, 97.5 MHz, volume 5
    fn default() -> Self {
        Self::new(Band::Wide, false, Spacing::Khz100, 100, 5)
    }
}

/// Working / factory block pair on a byte addressable storage
pub struct ParameterStore<S> {
    storage: S,
}

impl<S: Storage> ParameterStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn release(self) -> S {
        self.storage
    }

    fn read_block(&mut self, offset: u32) -> Result<ParameterBlock, RadioError> {
        let mut bytes = [0u8; BLOCK_SIZE];
        self.storage
            .read(offset, &mut bytes)
            .map_err(|_| RadioError::Storage)?;
        Ok(ParameterBlock::from_bytes(bytes))
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), RadioError> {
        self.storage
            .write(offset, bytes)
            .map_err(|_| RadioError::Storage)
    }

    /// Read and validate the working block
    pub fn load_working(&mut self) -> Result<ParameterBlock, RadioError> {
        let block = self.read_block(WORKING_OFFSET)?;
        match block.check() {
            Ok(block) => {
                debug!("working block ok, channel {}", block.channel());
                Ok(block)
            }
            Err(err) => {
                warn!("working block CRC mismatch");
                Err(err)
            }
        }
    }

    /// Factory block as stored, not validated
    pub fn read_factory(&mut self) -> Result<ParameterBlock, RadioError> {
        self.read_block(FACTORY_OFFSET)
    }

    /// Copy the factory block over the working block byte by byte
    pub fn restore_factory_defaults(&mut self) -> Result<(), RadioError> {
        for index in 0..BLOCK_SIZE as u32 {
            let mut byte = [0u8; 1];
            self.storage
                .read(FACTORY_OFFSET + index, &mut byte)
                .map_err(|_| RadioError::Storage)?;
            self.write(WORKING_OFFSET + index, &byte)?;
        }
        info!("factory defaults restored");
        Ok(())
    }

    /// Store `channel` in the working block and rewrite its CRC.
    ///
    /// The other fields are kept as stored. Power loss between the two writes
    /// leaves a block that fails [`load_working`](Self::load_working).
    pub fn save_channel(&mut self, channel: u16) -> Result<(), RadioError> {
        let mut block = self.read_block(WORKING_OFFSET)?;
        block.set_channel(channel);

        let bytes = *block.as_bytes();
        self.write(WORKING_OFFSET + CHANNEL as u32, &bytes[CHANNEL..CHANNEL + 2])?;
        self.write(WORKING_OFFSET + CRC as u32, &bytes[CRC..])?;
        info!("channel {} saved", channel);
        Ok(())
    }

    /// Write `block` to both areas. Manufacture time only.
    pub fn provision(&mut self, block: &ParameterBlock) -> Result<(), RadioError> {
        self.write(FACTORY_OFFSET, block.as_bytes())?;
        self.write(WORKING_OFFSET, block.as_bytes())
    }
}
