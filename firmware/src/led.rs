//! LED on PA1: TIM1 channel 2 PWM for in-between levels, plain GPIO for
//! fully off and fully on so the timer can stay stopped

use core::convert::Infallible;

use embedded_hal::pwm::{ErrorType, SetDutyCycle};

use crate::gpio::Pin;
use crate::regs::{self, tim, TIM1_BASE};
use crate::HCLK_HZ;

/// 8-bit duty resolution
const TOP: u16 = u8::MAX as u16;
/// About 1 kHz, well above visible flicker
const PWM_HZ: u32 = 1_000;

pub struct Tim1Led {
    pin: Pin,
    running: bool,
}

impl Tim1Led {
    /// Configure TIM1 CH2 for PWM mode 1; the counter stays stopped and the
    /// pin low until a duty between off and full is requested
    pub fn new(pin: Pin) -> Self {
        let prescaler = HCLK_HZ / (PWM_HZ * (TOP as u32 + 1)) - 1;
        regs::write(TIM1_BASE, tim::PSC, prescaler);
        regs::write(TIM1_BASE, tim::ATRLR, TOP as u32);
        regs::write(TIM1_BASE, tim::CH2CVR, 0);
        regs::write(TIM1_BASE, tim::CHCTLR1, tim::OC2_PWM1);
        regs::write(TIM1_BASE, tim::CCER, tim::CC2E);
        regs::write(TIM1_BASE, tim::BDTR, tim::MOE);
        regs::write(TIM1_BASE, tim::SWEVGR, tim::UG);

        let pin = pin.into_push_pull_output();
        pin.set(false);
        Self { pin, running: false }
    }

    fn stop(&mut self, level: bool) {
        if self.running {
            regs::clear_bits(TIM1_BASE, tim::CTLR1, tim::CEN);
            self.running = false;
        }
        self.pin.set(level);
        self.pin.into_push_pull_output();
    }

    fn run(&mut self, duty: u16) {
        regs::write(TIM1_BASE, tim::CH2CVR, duty as u32);
        if !self.running {
            self.pin.into_alternate_push_pull();
            regs::write(TIM1_BASE, tim::CTLR1, tim::ARPE | tim::CEN);
            self.running = true;
        }
    }
}

impl ErrorType for Tim1Led {
    type Error = Infallible;
}

impl SetDutyCycle for Tim1Led {
    fn max_duty_cycle(&self) -> u16 {
        TOP
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        match duty {
            0 => self.stop(false),
            d if d >= TOP => self.stop(true),
            d => self.run(d),
        }
        Ok(())
    }
}
