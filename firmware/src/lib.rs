#![no_std]

//! Public Radio board support for the CH32V003J4M6 (SOP-8)
//!
//! Binds the `radio-core` control flow to raw peripheral registers.
//!
//! Pin map:
//!
//! | Pin | Use                                                        |
//! |-----|------------------------------------------------------------|
//! | PC1 | two-wire SDIO, programming data while externally powered   |
//! | PC2 | two-wire SCLK                                              |
//! | PC4 | receiver and amplifier reset, low = held in reset          |
//! | PA2 | button to ground, internal pull-up, EXTI line 2            |
//! | PA1 | LED, TIM1_CH2 PWM or direct GPIO                           |
//! | PD6 | bonded to the LED pin in this package, left floating       |

pub mod adc;
pub mod delay;
pub mod eeprom;
pub mod gpio;
pub mod i2c;
pub mod led;
pub mod link;
pub mod power;
pub mod regs;

use radio_core::{Board, DelayClock, EmbeddedHalButton, PwmIndicator, RadioHal};

use crate::adc::VrefSupply;
use crate::delay::SysTickDelay;
use crate::eeprom::Eeprom24c02;
use crate::gpio::Pin;
use crate::i2c::BitBangI2c;
use crate::led::Tim1Led;
use crate::link::ProgrammingLink;
use crate::power::StandbyPower;
use crate::regs::{afio, rcc, AFIO_BASE, GPIOA_BASE, GPIOC_BASE, GPIOD_BASE, RCC_BASE};

/// Internal 24 MHz RC oscillator, no PLL
pub const HCLK_HZ: u32 = 24_000_000;

pub const SDIO: Pin = Pin::new(GPIOC_BASE, 1);
pub const SCLK: Pin = Pin::new(GPIOC_BASE, 2);
pub const RECEIVER_RESET: Pin = Pin::new(GPIOC_BASE, 4);
pub const BUTTON: Pin = Pin::new(GPIOA_BASE, 2);
pub const LED: Pin = Pin::new(GPIOA_BASE, 1);
pub const LED_TWIN: Pin = Pin::new(GPIOD_BASE, 6);

// Single hart, so masking interrupts is a complete critical section
struct SingleHartCriticalSection;
critical_section::set_impl!(SingleHartCriticalSection);

unsafe impl critical_section::Impl for SingleHartCriticalSection {
    unsafe fn acquire() -> critical_section::RawRestoreState {
        let mstatus = riscv::register::mstatus::read();
        riscv::register::mstatus::clear_mie();
        mstatus.mie() as u8
    }

    unsafe fn release(was_enabled: critical_section::RawRestoreState) {
        if was_enabled != 0 {
            riscv::register::mstatus::set_mie();
        }
    }
}

/// Peripheral type family of this board
pub struct PublicRadioHal;

impl RadioHal for PublicRadioHal {
    type Bus = BitBangI2c;
    type Storage = Eeprom24c02;
    type Button = EmbeddedHalButton<Pin>;
    type Indicator = PwmIndicator<Tim1Led>;
    type Supply = VrefSupply;
    type Power = StandbyPower;
    type Clock = DelayClock<SysTickDelay>;
    type Link = ProgrammingLink;
}

fn enable_clocks() {
    regs::set_bits(
        RCC_BASE,
        rcc::APB2PCENR,
        rcc::APB2_AFIO
            | rcc::APB2_GPIOA
            | rcc::APB2_GPIOC
            | rcc::APB2_GPIOD
            | rcc::APB2_ADC1
            | rcc::APB2_TIM1,
    );
    regs::set_bits(RCC_BASE, rcc::APB1PCENR, rcc::APB1_PWR);
}

/// Bring up clocks and pins and hand every peripheral over as a [`Board`].
///
/// The reset line goes low before anything else is touched.
pub fn init() -> Board<PublicRadioHal> {
    enable_clocks();
    let power = StandbyPower::new(RECEIVER_RESET, SDIO, BUTTON);

    LED_TWIN.into_floating_input();
    // EXTI line 2 from port A
    regs::clear_bits(AFIO_BASE, afio::EXTICR, 0b11 << 4);

    let delay = SysTickDelay::new();
    let bus = BitBangI2c::new(SDIO, SCLK, delay);
    bus.init();

    Board {
        bus,
        storage: Eeprom24c02::new(bus, delay),
        button: EmbeddedHalButton::new(BUTTON.into_pull_up_input()),
        indicator: PwmIndicator::new(Tim1Led::new(LED)),
        supply: VrefSupply::new(),
        power,
        clock: DelayClock::new(delay),
        link: ProgrammingLink::new(SDIO, delay),
    }
}
