//! Supply sensing through the internal 1.2 V reference
//!
//! The ADC converts against VDD, so the reading of the fixed reference falls
//! as the supply rises: `vdd = 1200 mV * 1023 / raw`.

use radio_core::{HalError, SupplyMonitor};

use crate::regs::{self, adc, rcc, ADC1_BASE, RCC_BASE};

const VREF_CHANNEL: u32 = 8;
const VREF_MV: u32 = 1_200;
const FULL_SCALE: u32 = 1_023;
/// Conversion polls before giving up
const EOC_POLLS: u32 = 10_000;

pub struct VrefSupply {
    powered: bool,
}

impl VrefSupply {
    pub fn new() -> Self {
        // ADC clock HCLK / 2, longest sample time on the reference channel
        regs::clear_bits(RCC_BASE, rcc::CFGR0, rcc::ADCPRE_MASK);
        regs::write(ADC1_BASE, adc::SAMPTR2, 0b111 << (VREF_CHANNEL * 3));
        regs::write(ADC1_BASE, adc::RSQR3, VREF_CHANNEL);
        Self { powered: false }
    }

    fn power_up(&mut self) -> Result<(), HalError> {
        if self.powered {
            return Ok(());
        }
        regs::write(ADC1_BASE, adc::CTLR2, adc::ADON | adc::EXTTRIG_SWSTART);
        regs::set_bits(ADC1_BASE, adc::CTLR2, adc::RSTCAL);
        wait_clear(adc::RSTCAL)?;
        regs::set_bits(ADC1_BASE, adc::CTLR2, adc::CAL);
        wait_clear(adc::CAL)?;
        self.powered = true;
        Ok(())
    }

    fn sample(&mut self) -> Result<u32, HalError> {
        self.power_up()?;
        regs::set_bits(ADC1_BASE, adc::CTLR2, adc::SWSTART);
        for _ in 0..EOC_POLLS {
            if regs::read(ADC1_BASE, adc::STATR) & adc::EOC != 0 {
                return Ok(regs::read(ADC1_BASE, adc::RDATAR) & 0x3FF);
            }
        }
        Err(HalError::AdcError)
    }

    /// Supply in millivolts
    pub fn millivolts(&mut self) -> Result<u16, HalError> {
        let raw = self.sample()?;
        if raw == 0 {
            return Err(HalError::AdcError);
        }
        Ok((VREF_MV * FULL_SCALE / raw).min(u16::MAX as u32) as u16)
    }
}

fn wait_clear(bit: u32) -> Result<(), HalError> {
    for _ in 0..EOC_POLLS {
        if regs::read(ADC1_BASE, adc::CTLR2) & bit == 0 {
            return Ok(());
        }
    }
    Err(HalError::AdcError)
}

impl SupplyMonitor for VrefSupply {
    fn supply_above(&mut self, threshold_mv: u16) -> Result<bool, HalError> {
        Ok(self.millivolts()? > threshold_mv)
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        regs::write(ADC1_BASE, adc::CTLR2, 0);
        self.powered = false;
        Ok(())
    }
}
