//! Host-side scenario and property tests for radio-core

use radio_core::{Band, ParameterBlock, Spacing};

pub mod fixtures {
    use super::*;

    /// 87.5 - 108 MHz, 100 kHz steps, channel 100 (97.5 MHz), volume 5
    pub fn normal_block() -> ParameterBlock {
        ParameterBlock::new(Band::Wide, false, Spacing::Khz100, 100, 5)
    }

    pub fn block_on(channel: u16) -> ParameterBlock {
        ParameterBlock::new(Band::Wide, false, Spacing::Khz100, channel, 5)
    }

    /// Big-endian register words as they travel on the bus
    pub fn words(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_be_bytes()).collect()
    }
}

#[cfg(test)]
mod boot_scenarios;

#[cfg(test)]
mod bus_protocol;

#[cfg(test)]
mod gesture_tests;

#[cfg(test)]
mod properties;
