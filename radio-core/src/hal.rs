//! Hardware Abstraction Layer for the radio control core

// Re-export time types based on feature
#[cfg(feature = "embassy-time")]
pub use embassy_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
pub use self::ms_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
mod ms_time {
    /// Millisecond instant used when embassy-time is not linked in
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Instant(u64);

    impl Instant {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }

        pub fn duration_since(&self, earlier: Instant) -> Duration {
            Duration::from_millis(self.0.saturating_sub(earlier.0))
        }
    }

    impl core::ops::Add<Duration> for Instant {
        type Output = Instant;

        fn add(self, rhs: Duration) -> Instant {
            Instant(self.0 + rhs.as_millis())
        }
    }

    /// Millisecond duration used when embassy-time is not linked in
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Duration(u64);

    impl Duration {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub const fn from_secs(secs: u64) -> Self {
            Self(secs * 1000)
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }
    }

    impl core::ops::Add for Duration {
        type Output = Duration;

        fn add(self, rhs: Duration) -> Duration {
            Duration(self.0 + rhs.0)
        }
    }

    impl core::ops::Sub for Duration {
        type Output = Duration;

        fn sub(self, rhs: Duration) -> Duration {
            Duration(self.0 - rhs.0)
        }
    }

    impl core::ops::Mul<u32> for Duration {
        type Output = Duration;

        fn mul(self, rhs: u32) -> Duration {
            Duration(self.0 * rhs as u64)
        }
    }

    impl core::ops::Div<u32> for Duration {
        type Output = Duration;

        fn div(self, rhs: u32) -> Duration {
            Duration(self.0 / rhs as u64)
        }
    }
}

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::types::{WakeReason, WakeSource};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Analog conversion failed or timed out
    AdcError,
    /// Timer / PWM operation failed
    TimerError,
    /// Interrupt configuration failed
    InterruptError,
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::AdcError => write!(f, "ADC conversion failed"),
            HalError::TimerError => write!(f, "Timer operation failed"),
            HalError::InterruptError => write!(f, "Interrupt configuration failed"),
            HalError::NotInitialized => write!(f, "Hardware not initialized"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// The single user button
pub trait ButtonInput {
    /// Check if the button is currently held down
    fn is_pressed(&mut self) -> Result<bool, HalError>;

    /// Arm the edge notification used to leave low-power sleep
    fn enable_wake_interrupt(&mut self) -> Result<(), HalError>;
}

/// The status LED and its PWM drive stage
pub trait Indicator {
    /// Set PWM brightness, 0 = off, 255 = brightest.
    /// Level 0 stops the PWM output and leaves the pin low.
    fn set_brightness(&mut self, level: u8) -> Result<(), HalError>;

    /// Power the PWM timer up or down
    fn set_drive_enabled(&mut self, enabled: bool) -> Result<(), HalError>;

    /// Drive the pin directly at full level, bypassing the PWM stage
    fn set_direct(&mut self, on: bool) -> Result<(), HalError>;
}

/// Supply voltage comparison against fixed thresholds
pub trait SupplyMonitor {
    /// Returns true when the supply is above `threshold_mv`
    fn supply_above(&mut self, threshold_mv: u16) -> Result<bool, HalError>;

    /// Power the converter down once no more samples are needed
    fn shutdown(&mut self) -> Result<(), HalError> {
        Ok(())
    }
}

/// Receiver reset line and processor sleep
pub trait PowerControl {
    /// Hold (true) or release (false) the receiver and amplifier reset line
    fn set_receiver_reset(&mut self, asserted: bool) -> Result<(), HalError>;

    /// Enter low-power sleep with only `wake` armed.
    ///
    /// A button already down when a button wake is armed returns
    /// [`WakeReason::Button`] without sleeping. With [`WakeSource::Nothing`]
    /// real hardware never returns; simulated hardware returns
    /// [`WakeReason::Spurious`].
    fn sleep(&mut self, wake: WakeSource) -> WakeReason;
}

/// Monotonic millisecond clock with blocking waits
pub trait Clock {
    /// Current time since boot
    fn now(&mut self) -> Instant;

    /// Block for `duration`
    fn delay(&mut self, duration: Duration);

    fn delay_ms(&mut self, ms: u64) {
        self.delay(Duration::from_millis(ms));
    }
}

/// Byte stream carrying programming packets.
///
/// A link may borrow a pin from the two-wire bus while it reads.
pub trait PacketLink: embedded_io::Read {
    /// Hand any borrowed pin back to the bus
    fn release(&mut self) -> Result<(), HalError>;
}

/// Type family naming every peripheral the control core needs
pub trait RadioHal {
    /// Two-wire bus to the receiver chip
    type Bus: embedded_hal::i2c::I2c;
    /// Byte-addressable non-volatile memory holding the parameter blocks
    type Storage: embedded_storage::Storage;
    type Button: ButtonInput;
    type Indicator: Indicator;
    type Supply: SupplyMonitor;
    type Power: PowerControl;
    type Clock: Clock;
    type Link: PacketLink;
}

/// [`Clock`] built from a blocking delay, counting elapsed time itself.
///
/// Time only advances inside [`Clock::delay`], which is exact for a control
/// flow that does nothing but wait between bus and pin operations.
pub struct DelayClock<D> {
    delay: D,
    elapsed_ms: u64,
}

impl<D: DelayNs> DelayClock<D> {
    pub fn new(delay: D) -> Self {
        Self { delay, elapsed_ms: 0 }
    }
}

impl<D: DelayNs> Clock for DelayClock<D> {
    fn now(&mut self) -> Instant {
        Instant::from_millis(self.elapsed_ms)
    }

    fn delay(&mut self, duration: Duration) {
        let mut remaining = duration.as_millis();
        while remaining > 0 {
            let chunk = remaining.min(u32::MAX as u64) as u32;
            self.delay.delay_ms(chunk);
            remaining -= chunk as u64;
        }
        self.elapsed_ms += duration.as_millis();
    }
}

/// Button on an embedded-hal input pin
pub struct EmbeddedHalButton<P> {
    pin: P,
    active_low: bool,
}

impl<P> EmbeddedHalButton<P>
where
    P: InputPin,
{
    /// Pulled-up pin, shorted to ground when pressed
    pub fn new(pin: P) -> Self {
        Self { pin, active_low: true }
    }

    pub fn active_high(pin: P) -> Self {
        Self { pin, active_low: false }
    }
}

impl<P> ButtonInput for EmbeddedHalButton<P>
where
    P: InputPin,
{
    fn is_pressed(&mut self) -> Result<bool, HalError> {
        let level = if self.active_low {
            self.pin.is_low()
        } else {
            self.pin.is_high()
        };
        level.map_err(|_| HalError::GpioError)
    }

    fn enable_wake_interrupt(&mut self) -> Result<(), HalError> {
        // Edge routing is board specific and lives with PowerControl::sleep
        Ok(())
    }
}

/// LED on an embedded-hal PWM channel.
///
/// Direct drive maps to 100 % duty, since a plain PWM channel has no
/// separate GPIO mode.
pub struct PwmIndicator<P> {
    channel: P,
    enabled: bool,
}

impl<P> PwmIndicator<P>
where
    P: SetDutyCycle,
{
    pub fn new(channel: P) -> Self {
        Self { channel, enabled: true }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl<P> Indicator for PwmIndicator<P>
where
    P: SetDutyCycle,
{
    fn set_brightness(&mut self, level: u8) -> Result<(), HalError> {
        let level = if self.enabled { level } else { 0 };
        self.channel
            .set_duty_cycle_fraction(level as u16, u8::MAX as u16)
            .map_err(|_| HalError::TimerError)
    }

    fn set_drive_enabled(&mut self, enabled: bool) -> Result<(), HalError> {
        self.enabled = enabled;
        if !enabled {
            self.channel
                .set_duty_cycle_fully_off()
                .map_err(|_| HalError::TimerError)?;
        }
        Ok(())
    }

    fn set_direct(&mut self, on: bool) -> Result<(), HalError> {
        let result = if on {
            self.channel.set_duty_cycle_fully_on()
        } else {
            self.channel.set_duty_cycle_fully_off()
        };
        result.map_err(|_| HalError::TimerError)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use core::cell::RefCell;

    #[derive(Default)]
    pub struct MockButton {
        pressed: RefCell<bool>,
        wake_armed: RefCell<bool>,
    }

    impl MockButton {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_pressed(&self, pressed: bool) {
            *self.pressed.borrow_mut() = pressed;
        }

        pub fn wake_armed(&self) -> bool {
            *self.wake_armed.borrow()
        }
    }

    impl ButtonInput for MockButton {
        fn is_pressed(&mut self) -> Result<bool, HalError> {
            Ok(*self.pressed.borrow())
        }

        fn enable_wake_interrupt(&mut self) -> Result<(), HalError> {
            *self.wake_armed.borrow_mut() = true;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct MockIndicator {
        brightness: RefCell<u8>,
        drive_enabled: RefCell<bool>,
        direct: RefCell<bool>,
    }

    impl MockIndicator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn brightness(&self) -> u8 {
            *self.brightness.borrow()
        }

        pub fn drive_enabled(&self) -> bool {
            *self.drive_enabled.borrow()
        }

        pub fn is_lit(&self) -> bool {
            *self.direct.borrow() || (self.drive_enabled() && self.brightness() > 0)
        }
    }

    impl Indicator for MockIndicator {
        fn set_brightness(&mut self, level: u8) -> Result<(), HalError> {
            *self.brightness.borrow_mut() = level;
            Ok(())
        }

        fn set_drive_enabled(&mut self, enabled: bool) -> Result<(), HalError> {
            *self.drive_enabled.borrow_mut() = enabled;
            Ok(())
        }

        fn set_direct(&mut self, on: bool) -> Result<(), HalError> {
            *self.direct.borrow_mut() = on;
            Ok(())
        }
    }

    /// Supply fixed at one voltage
    pub struct MockSupply {
        pub millivolts: u16,
        pub shut_down: bool,
    }

    impl MockSupply {
        pub fn new(millivolts: u16) -> Self {
            Self { millivolts, shut_down: false }
        }
    }

    impl SupplyMonitor for MockSupply {
        /// Sampling powers the converter back up
        fn supply_above(&mut self, threshold_mv: u16) -> Result<bool, HalError> {
            self.shut_down = false;
            Ok(self.millivolts > threshold_mv)
        }

        fn shutdown(&mut self) -> Result<(), HalError> {
            self.shut_down = true;
            Ok(())
        }
    }
}
