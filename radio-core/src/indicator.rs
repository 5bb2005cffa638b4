//! LED patterns: diagnostic blink codes and the breathing ramp

use crate::hal::{Clock, Duration, HalError, Indicator};

/// Brightness ramp traversed once per breath, one entry per step
pub const BREATH_TABLE: [u8; 91] = [
    1, 1, 2, 3, 5, 8, 11, 15, 20, 25, 30, 36, 43, 49, 56, 64, 72, 80, 88, 97, 105, 114, 123, 132,
    141, 150, 158, 167, 175, 183, 191, 199, 206, 212, 219, 225, 230, 235, 240, 244, 247, 250, 252,
    253, 254, 255, 254, 253, 252, 250, 247, 244, 240, 235, 230, 225, 219, 212, 206, 199, 191, 183,
    175, 167, 158, 150, 141, 132, 123, 114, 105, 97, 88, 80, 72, 64, 56, 49, 43, 36, 30, 25, 20,
    15, 11, 8, 5, 3, 2, 1, 0,
];

/// How a pattern lights the LED
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Drive {
    /// Pin driven straight, PWM stage may be powered down
    Direct,
    /// Full brightness through the PWM stage
    Pwm,
}

/// `pulses` x (`on_ms` lit, `off_ms` dark) followed by `gap_ms` dark
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlinkPattern {
    pub pulses: u8,
    pub on_ms: u16,
    pub off_ms: u16,
    pub gap_ms: u16,
    pub drive: Drive,
}

impl BlinkPattern {
    /// Short flashes counted out, as used for diagnostics
    pub const fn count(pulses: u8) -> Self {
        Self {
            pulses,
            on_ms: 10,
            off_ms: 200,
            gap_ms: 1_000,
            drive: Drive::Direct,
        }
    }

    pub const fn period(&self) -> Duration {
        Duration::from_millis(
            self.pulses as u64 * (self.on_ms as u64 + self.off_ms as u64) + self.gap_ms as u64,
        )
    }

    /// (lit, milliseconds) segments of one period
    pub fn segments(&self) -> impl Iterator<Item = (bool, u16)> {
        let (on, off) = (self.on_ms, self.off_ms);
        (0..self.pulses)
            .flat_map(move |_| [(true, on), (false, off)])
            .chain(core::iter::once((false, self.gap_ms)))
            .filter(|(_, ms)| *ms > 0)
    }
}

/// User visible codes
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlinkCode {
    /// Working block failed its CRC at boot
    BadParameters,
    /// Receiver did not answer during power-up
    BusFault,
    LowBattery,
    /// Channel stored, solid flash
    SaveAccepted,
    PacketAccepted,
    PacketRejected,
    /// Button held at boot, shown until release
    FactoryPending,
    /// Waiting for the press that confirms a factory reset
    FactoryConfirm,
}

impl BlinkCode {
    pub const fn pattern(&self) -> BlinkPattern {
        match self {
            BlinkCode::BadParameters => BlinkPattern::count(3),
            BlinkCode::BusFault => BlinkPattern::count(4),
            BlinkCode::PacketAccepted => BlinkPattern::count(2),
            BlinkCode::PacketRejected => BlinkPattern::count(1),
            BlinkCode::LowBattery => BlinkPattern {
                pulses: 1,
                on_ms: 100,
                off_ms: 900,
                gap_ms: 0,
                drive: Drive::Direct,
            },
            BlinkCode::SaveAccepted => BlinkPattern {
                pulses: 1,
                on_ms: 500,
                off_ms: 0,
                gap_ms: 0,
                drive: Drive::Pwm,
            },
            BlinkCode::FactoryPending => BlinkPattern {
                pulses: 2,
                on_ms: 100,
                off_ms: 100,
                gap_ms: 800,
                drive: Drive::Pwm,
            },
            BlinkCode::FactoryConfirm => BlinkPattern {
                pulses: 1,
                on_ms: 160,
                off_ms: 160,
                gap_ms: 0,
                drive: Drive::Pwm,
            },
        }
    }
}

fn light<I: Indicator>(indicator: &mut I, drive: Drive, lit: bool) -> Result<(), HalError> {
    match drive {
        Drive::Direct => indicator.set_direct(lit),
        Drive::Pwm => indicator.set_brightness(if lit { u8::MAX } else { 0 }),
    }
}

/// Play one period of `pattern`, leaving the LED dark
pub fn play_once<I, C>(indicator: &mut I, clock: &mut C, pattern: &BlinkPattern) -> Result<(), HalError>
where
    I: Indicator,
    C: Clock,
{
    for (lit, ms) in pattern.segments() {
        light(indicator, pattern.drive, lit)?;
        clock.delay_ms(ms as u64);
    }
    light(indicator, pattern.drive, false)
}

/// Repeat `pattern` until at least `window` has passed
pub fn play_for<I, C>(
    indicator: &mut I,
    clock: &mut C,
    pattern: &BlinkPattern,
    window: Duration,
) -> Result<(), HalError>
where
    I: Indicator,
    C: Clock,
{
    let start = clock.now();
    loop {
        play_once(indicator, clock, pattern)?;
        if clock.now().duration_since(start) >= window {
            return Ok(());
        }
    }
}

/// Repeat `pattern` in 1 ms ticks until `stop` returns true or `window`
/// expires. Returns whether `stop` fired; the LED is left dark either way.
pub fn play_until<I, C, F, E>(
    indicator: &mut I,
    clock: &mut C,
    pattern: &BlinkPattern,
    window: Duration,
    mut stop: F,
) -> Result<bool, E>
where
    I: Indicator,
    C: Clock,
    F: FnMut() -> Result<bool, E>,
    E: From<HalError>,
{
    let start = clock.now();
    loop {
        for (lit, ms) in pattern.segments() {
            light(indicator, pattern.drive, lit)?;
            for _ in 0..ms {
                if stop()? {
                    light(indicator, pattern.drive, false)?;
                    return Ok(true);
                }
                if clock.now().duration_since(start) >= window {
                    light(indicator, pattern.drive, false)?;
                    return Ok(false);
                }
                clock.delay_ms(1);
            }
        }
    }
}

/// Hold the LED at `level` through the PWM stage for `duration`, then dark
pub fn flash<I, C>(indicator: &mut I, clock: &mut C, level: u8, duration: Duration) -> Result<(), HalError>
where
    I: Indicator,
    C: Clock,
{
    indicator.set_brightness(level)?;
    clock.delay(duration);
    indicator.set_brightness(0)
}
