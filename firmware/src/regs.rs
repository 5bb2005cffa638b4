//! CH32V003 memory map and volatile register access

pub const RCC_BASE: u32 = 0x4002_1000;
pub const PWR_BASE: u32 = 0x4000_7000;
pub const AFIO_BASE: u32 = 0x4001_0000;
pub const EXTI_BASE: u32 = 0x4001_0400;
pub const GPIOA_BASE: u32 = 0x4001_0800;
pub const GPIOC_BASE: u32 = 0x4001_1000;
pub const GPIOD_BASE: u32 = 0x4001_1400;
pub const ADC1_BASE: u32 = 0x4001_2400;
pub const TIM1_BASE: u32 = 0x4001_2C00;
pub const PFIC_BASE: u32 = 0xE000_E000;
pub const STK_BASE: u32 = 0xE000_F000;

/// RCC register offsets
pub mod rcc {
    pub const CFGR0: u32 = 0x04;
    pub const APB2PCENR: u32 = 0x18;
    pub const APB1PCENR: u32 = 0x1C;
    pub const RSTSCKR: u32 = 0x24;

    pub const APB2_AFIO: u32 = 1 << 0;
    pub const APB2_GPIOA: u32 = 1 << 2;
    pub const APB2_GPIOC: u32 = 1 << 4;
    pub const APB2_GPIOD: u32 = 1 << 5;
    pub const APB2_ADC1: u32 = 1 << 9;
    pub const APB2_TIM1: u32 = 1 << 11;
    pub const APB1_PWR: u32 = 1 << 28;

    pub const LSION: u32 = 1 << 0;
    pub const LSIRDY: u32 = 1 << 1;
    pub const ADCPRE_MASK: u32 = 0x1F << 11;
}

/// GPIO register offsets
pub mod gpio {
    pub const CFGLR: u32 = 0x00;
    pub const INDR: u32 = 0x08;
    pub const OUTDR: u32 = 0x0C;
    pub const BSHR: u32 = 0x10;

    /// CNF:MODE nibbles
    pub const INPUT_FLOATING: u32 = 0x4;
    pub const INPUT_PULL: u32 = 0x8;
    pub const OUTPUT_PUSH_PULL: u32 = 0x1;
    pub const OUTPUT_OPEN_DRAIN: u32 = 0x5;
    pub const ALTERNATE_PUSH_PULL: u32 = 0x9;
}

/// AFIO register offsets
pub mod afio {
    pub const EXTICR: u32 = 0x08;
}

/// EXTI register offsets
pub mod exti {
    pub const INTENR: u32 = 0x00;
    pub const FTENR: u32 = 0x0C;
    pub const INTFR: u32 = 0x14;

    /// Auto-wakeup is routed through EXTI line 9
    pub const AWU_LINE: u32 = 9;
}

/// PWR register offsets
pub mod pwr {
    pub const CTLR: u32 = 0x00;
    pub const AWUCSR: u32 = 0x08;
    pub const AWUWR: u32 = 0x0C;
    pub const AWUPSC: u32 = 0x10;

    pub const PDDS: u32 = 1 << 1;
    pub const AWUEN: u32 = 1 << 1;
    /// LSI / 61440
    pub const AWUPSC_61440: u32 = 0b1111;
    pub const AWUWR_MAX: u32 = 0x3F;
}

/// ADC register offsets
pub mod adc {
    pub const STATR: u32 = 0x00;
    pub const CTLR2: u32 = 0x08;
    pub const SAMPTR2: u32 = 0x10;
    pub const RSQR3: u32 = 0x34;
    pub const RDATAR: u32 = 0x4C;

    pub const EOC: u32 = 1 << 1;
    pub const ADON: u32 = 1 << 0;
    pub const CAL: u32 = 1 << 2;
    pub const RSTCAL: u32 = 1 << 3;
    pub const EXTTRIG_SWSTART: u32 = (0b111 << 17) | (1 << 20);
    pub const SWSTART: u32 = 1 << 22;
}

/// TIM1 register offsets
pub mod tim {
    pub const CTLR1: u32 = 0x00;
    pub const SWEVGR: u32 = 0x14;
    pub const CHCTLR1: u32 = 0x18;
    pub const CCER: u32 = 0x20;
    pub const PSC: u32 = 0x28;
    pub const ATRLR: u32 = 0x2C;
    pub const CH2CVR: u32 = 0x38;
    pub const BDTR: u32 = 0x44;

    pub const CEN: u32 = 1 << 0;
    pub const ARPE: u32 = 1 << 7;
    pub const UG: u32 = 1 << 0;
    /// PWM mode 1 with preload on channel 2
    pub const OC2_PWM1: u32 = (0b110 << 12) | (1 << 11);
    pub const CC2E: u32 = 1 << 4;
    pub const MOE: u32 = 1 << 15;
}

/// Interrupt controller and system control
pub mod pfic {
    pub const IENR1: u32 = 0x100;
    pub const SCTLR: u32 = 0xD10;

    pub const SLEEPDEEP: u32 = 1 << 2;
    pub const IRQ_EXTI7_0: u32 = 20;
    pub const IRQ_AWU: u32 = 21;
}

/// SysTick register offsets
pub mod stk {
    pub const CTLR: u32 = 0x00;
    pub const CNTR: u32 = 0x08;

    pub const STE: u32 = 1 << 0;
}

#[inline(always)]
pub fn read(base: u32, offset: u32) -> u32 {
    // SAFETY: callers pass a base/offset pair from the tables above
    unsafe { core::ptr::read_volatile((base + offset) as *const u32) }
}

#[inline(always)]
pub fn write(base: u32, offset: u32, value: u32) {
    // SAFETY: callers pass a base/offset pair from the tables above
    unsafe { core::ptr::write_volatile((base + offset) as *mut u32, value) }
}

#[inline(always)]
pub fn modify(base: u32, offset: u32, f: impl FnOnce(u32) -> u32) {
    write(base, offset, f(read(base, offset)));
}

#[inline(always)]
pub fn set_bits(base: u32, offset: u32, bits: u32) {
    modify(base, offset, |value| value | bits);
}

#[inline(always)]
pub fn clear_bits(base: u32, offset: u32, bits: u32) {
    modify(base, offset, |value| value & !bits);
}
