//! Core data types for the radio control core

use crate::hal::{Duration, HalError};
use crate::registers::Register;

/// Receiver band selector (SYSCONFIG2 bits 7:6)
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Band {
    /// 87.5 - 108 MHz (US / Europe)
    Wide,
    /// 76 - 108 MHz (Japan wide band)
    JapanWide,
    /// 76 - 90 MHz (Japan)
    Japan,
    /// Reserved selector, tuned like [`Band::JapanWide`]
    Reserved,
}

impl Band {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Band::Wide,
            1 => Band::JapanWide,
            2 => Band::Japan,
            _ => Band::Reserved,
        }
    }

    pub const fn bits(&self) -> u8 {
        match self {
            Band::Wide => 0,
            Band::JapanWide => 1,
            Band::Japan => 2,
            Band::Reserved => 3,
        }
    }

    /// Bottom and top of band in kHz
    pub const fn range_khz(&self) -> (u32, u32) {
        match self {
            Band::Wide => (87_500, 108_000),
            Band::JapanWide | Band::Reserved => (76_000, 108_000),
            Band::Japan => (76_000, 90_000),
        }
    }
}

/// Channel spacing selector (SYSCONFIG2 bits 5:4)
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Spacing {
    Khz200,
    Khz100,
    Khz50,
    /// Reserved selector, stepped like [`Spacing::Khz200`]
    Reserved,
}

impl Spacing {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Spacing::Khz200,
            1 => Spacing::Khz100,
            2 => Spacing::Khz50,
            _ => Spacing::Reserved,
        }
    }

    pub const fn bits(&self) -> u8 {
        match self {
            Spacing::Khz200 => 0,
            Spacing::Khz100 => 1,
            Spacing::Khz50 => 2,
            Spacing::Reserved => 3,
        }
    }

    pub const fn khz(&self) -> u32 {
        match self {
            Spacing::Khz200 | Spacing::Reserved => 200,
            Spacing::Khz100 => 100,
            Spacing::Khz50 => 50,
        }
    }
}

/// Highest channel number reachable in `band` with `spacing`
pub const fn top_channel(band: Band, spacing: Spacing) -> u16 {
    let (bottom, top) = band.range_khz();
    ((top - bottom) / spacing.khz()) as u16
}

/// Channel one step above `channel`, wrapping to the bottom of band
pub const fn next_channel(channel: u16, band: Band, spacing: Spacing) -> u16 {
    if channel >= top_channel(band, spacing) {
        0
    } else {
        channel + 1
    }
}

/// Classified button press
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gesture {
    /// Released before the long-press threshold: scan one channel up
    Short,
    /// Held past the long-press threshold: save the current channel
    Long,
    /// Held past the very-long threshold: factory reset path
    VeryLong,
}

/// States of the press-handling machine
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GestureState {
    Idle,
    DebouncingDown,
    /// Counting down, `elapsed` since sampling began
    Timing { elapsed: Duration },
    ShortAction,
    LongAction,
    VeryLongAction,
    DebouncingUp,
}

/// Operating mode chosen at boot
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    LowBattery,
    Programming,
    NormalInit,
    NormalBreathing,
    NormalSleeping,
}

/// Wake sources armed before entering sleep
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeSource {
    /// Nothing armed: sleep until power cycle
    Nothing,
    Button,
    /// Button edge or a timer expiring after the given duration
    ButtonOrTimer(Duration),
}

/// Why sleep returned
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeReason {
    Button,
    Timer,
    Spurious,
}

/// Terminal conditions that end a boot cycle in deep sleep
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HaltReason {
    LowBattery,
    BadParameters,
    BusFault,
}

/// Errors raised by the control core
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// Receiver bus transaction did not complete; the shadow bank is stale
    Bus(embedded_hal::i2c::ErrorKind),
    /// Non-volatile storage access failed
    Storage,
    /// Pin, timer or converter failure
    Hal(HalError),
    /// Working block failed its integrity check
    ParameterCrc { stored: u16, computed: u16 },
    /// Write-through bound outside 0x2..=0x9
    RegisterRange(Register),
    /// Programming link read failed
    Link,
}

impl From<HalError> for RadioError {
    fn from(err: HalError) -> Self {
        RadioError::Hal(err)
    }
}

#[cfg(feature = "std")]
impl core::fmt::Display for RadioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RadioError::Bus(kind) => write!(f, "receiver bus transaction failed: {}", kind),
            RadioError::Storage => write!(f, "non-volatile storage access failed"),
            RadioError::Hal(err) => write!(f, "hardware error: {}", err),
            RadioError::ParameterCrc { stored, computed } => write!(
                f,
                "parameter block CRC mismatch (stored {:#06x}, computed {:#06x})",
                stored, computed
            ),
            RadioError::RegisterRange(reg) => {
                write!(f, "write-through bound {:?} outside 0x2..=0x9", reg)
            }
            RadioError::Link => write!(f, "programming link read failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RadioError {}
