//! Receiver reset line, standby sleep and the wake interrupts

use radio_core::{Duration, HalError, PowerControl, WakeReason, WakeSignal, WakeSource};

use crate::gpio::Pin;
use crate::regs::{self, exti, pfic, pwr, rcc, EXTI_BASE, PFIC_BASE, PWR_BASE, RCC_BASE};

/// Button edge, set from `EXTI7_0_IRQHandler`
pub static BUTTON_WAKE: WakeSignal = WakeSignal::new();

const BUTTON_LINE: u32 = 2;
/// LSI 128 kHz / 61440 per auto-wakeup count
const AWU_TICK_US: u64 = 480_000;

pub struct StandbyPower {
    reset: Pin,
    sdio: Pin,
    /// Pulled up, low while pressed
    button: Pin,
}

impl StandbyPower {
    /// `reset` is driven low straight away: receiver and amplifier held quiet
    pub fn new(reset: Pin, sdio: Pin, button: Pin) -> Self {
        let reset = reset.into_push_pull_output();
        reset.set(false);
        Self { reset, sdio, button }
    }

    fn button_down(&self) -> bool {
        !self.button.level()
    }

    fn arm_button(&self) {
        regs::set_bits(EXTI_BASE, exti::FTENR, 1 << BUTTON_LINE);
        regs::write(EXTI_BASE, exti::INTFR, 1 << BUTTON_LINE);
        regs::set_bits(EXTI_BASE, exti::INTENR, 1 << BUTTON_LINE);
        regs::set_bits(PFIC_BASE, pfic::IENR1, 1 << pfic::IRQ_EXTI7_0);
    }

    fn disarm_button(&self) {
        regs::clear_bits(EXTI_BASE, exti::INTENR, 1 << BUTTON_LINE);
    }

    /// Arm the auto-wakeup for the longest period not past `remaining_us`.
    /// Returns the armed period.
    fn arm_timer(&self, remaining_us: u64) -> u64 {
        let counts = (remaining_us / AWU_TICK_US).clamp(1, pwr::AWUWR_MAX as u64);
        regs::set_bits(RCC_BASE, rcc::RSTSCKR, rcc::LSION);
        while regs::read(RCC_BASE, rcc::RSTSCKR) & rcc::LSIRDY == 0 {}

        regs::write(PWR_BASE, pwr::AWUPSC, pwr::AWUPSC_61440);
        regs::write(PWR_BASE, pwr::AWUWR, counts as u32);
        regs::set_bits(PWR_BASE, pwr::AWUCSR, pwr::AWUEN);
        regs::set_bits(EXTI_BASE, exti::INTENR, 1 << exti::AWU_LINE);
        regs::set_bits(PFIC_BASE, pfic::IENR1, 1 << pfic::IRQ_AWU);
        counts * AWU_TICK_US
    }

    fn disarm_timer(&self) {
        regs::clear_bits(PWR_BASE, pwr::AWUCSR, pwr::AWUEN);
        regs::clear_bits(EXTI_BASE, exti::INTENR, 1 << exti::AWU_LINE);
        regs::clear_bits(RCC_BASE, rcc::RSTSCKR, rcc::LSION);
    }

    /// Standby until any armed interrupt or event fires
    fn standby(&self) {
        regs::set_bits(PWR_BASE, pwr::CTLR, pwr::PDDS);
        regs::set_bits(PFIC_BASE, pfic::SCTLR, pfic::SLEEPDEEP);
        #[allow(unused_unsafe)]
        unsafe {
            riscv::asm::wfi();
        }
        regs::clear_bits(PFIC_BASE, pfic::SCTLR, pfic::SLEEPDEEP);
    }

    /// Standby unless the button is already down or its edge already fired.
    ///
    /// MIE stays clear from the check through `wfi`. A pending edge still
    /// ends `wfi`, and its handler runs once MIE is set again.
    fn standby_unless_pressed(&self) {
        #[allow(unused_unsafe)]
        unsafe {
            riscv::interrupt::disable();
        }
        if !BUTTON_WAKE.is_pending() && !self.button_down() {
            self.standby();
        }
        // SAFETY: single hart, only the wake handlers are unmasked
        unsafe { riscv::interrupt::enable() };
    }

    fn woken_by_button(&self) -> bool {
        BUTTON_WAKE.take() || self.button_down()
    }

    fn sleep_for_button(&self) -> WakeReason {
        BUTTON_WAKE.take();
        self.arm_button();
        self.standby_unless_pressed();
        if self.woken_by_button() {
            WakeReason::Button
        } else {
            WakeReason::Spurious
        }
    }

    /// AWU periods are short, so long intervals are several standbys in a row
    fn sleep_for_button_or(&self, interval: Duration) -> WakeReason {
        let mut remaining_us = interval.as_millis() * 1_000;
        BUTTON_WAKE.take();
        self.arm_button();
        let reason = loop {
            let armed = self.arm_timer(remaining_us);
            self.standby_unless_pressed();
            if self.woken_by_button() {
                break WakeReason::Button;
            }
            remaining_us = remaining_us.saturating_sub(armed);
            if remaining_us == 0 {
                break WakeReason::Timer;
            }
        };
        self.disarm_timer();
        reason
    }
}

impl PowerControl for StandbyPower {
    fn set_receiver_reset(&mut self, asserted: bool) -> Result<(), HalError> {
        if asserted {
            self.reset.set(false);
            return Ok(());
        }
        // SDIO sampled low on the rising reset edge selects the two-wire bus
        self.sdio.into_open_drain_output().set(false);
        self.reset.set(true);
        self.sdio.set(true);
        Ok(())
    }

    fn sleep(&mut self, wake: WakeSource) -> WakeReason {
        match wake {
            WakeSource::Nothing => {
                self.disarm_button();
                self.disarm_timer();
                loop {
                    self.standby();
                }
            }
            WakeSource::Button => self.sleep_for_button(),
            WakeSource::ButtonOrTimer(interval) => self.sleep_for_button_or(interval),
        }
    }
}

#[no_mangle]
extern "C" fn EXTI7_0_IRQHandler() {
    let pending = regs::read(EXTI_BASE, exti::INTFR);
    if pending & (1 << BUTTON_LINE) != 0 {
        regs::write(EXTI_BASE, exti::INTFR, 1 << BUTTON_LINE);
        BUTTON_WAKE.signal();
    }
}

#[no_mangle]
extern "C" fn AWU_IRQHandler() {
    regs::write(EXTI_BASE, exti::INTFR, 1 << exti::AWU_LINE);
}
