//! Busy-wait delays on the free-running SysTick counter

use embedded_hal::delay::DelayNs;

use crate::regs::{self, stk, STK_BASE};
use crate::HCLK_HZ;

/// SysTick clocked from HCLK / 8
const TICKS_PER_US: u32 = HCLK_HZ / 8 / 1_000_000;

#[derive(Copy, Clone)]
pub struct SysTickDelay {
    _private: (),
}

impl SysTickDelay {
    /// Start the counter counting up from HCLK / 8
    pub fn new() -> Self {
        regs::write(STK_BASE, stk::CTLR, stk::STE);
        Self { _private: () }
    }

    #[inline(always)]
    fn now(&self) -> u32 {
        regs::read(STK_BASE, stk::CNTR)
    }

    fn wait_ticks(&self, ticks: u32) {
        let start = self.now();
        while self.now().wrapping_sub(start) < ticks {}
    }
}

impl DelayNs for SysTickDelay {
    fn delay_ns(&mut self, ns: u32) {
        // Rounded up so short bus delays never collapse to zero
        self.wait_ticks((ns / 1_000 + 1) * TICKS_PER_US);
    }

    fn delay_us(&mut self, us: u32) {
        self.wait_ticks(us.saturating_mul(TICKS_PER_US));
    }

    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.wait_ticks(1_000 * TICKS_PER_US);
        }
    }
}
