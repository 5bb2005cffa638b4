//! Timing and threshold configuration

use crate::hal::Duration;

/// Constants table. Every runtime default in [`RadioConfig`] comes from here.
pub mod consts {
    /// Seven-bit bus address of the receiver
    pub const RECEIVER_ADDRESS: u8 = 0x10;

    pub const DEBOUNCE_MS: u64 = 50;
    pub const LONG_PRESS_MS: u64 = 2_000;
    pub const VERY_LONG_PRESS_MS: u64 = 4_000;
    /// Window for the confirming press after a very-long press
    pub const FACTORY_CONFIRM_MS: u64 = 10_000;

    pub const BREATH_STEP_MS: u64 = 20;
    pub const BREATH_CYCLES: u16 = 60;

    /// Below this the battery is considered flat
    pub const LOW_BATTERY_MV: u16 = 2_100;
    /// Only an external programmer supplies more than this
    pub const PROGRAMMER_MV: u16 = 3_600;
    /// How long diagnostic and low-battery codes repeat before halting
    pub const DIAGNOSTIC_WINDOW_MS: u64 = 120_000;

    pub const RESET_RELEASE_MS: u64 = 1;
    pub const OSCILLATOR_SETTLE_MS: u64 = 600;
    pub const POWER_UP_SETTLE_MS: u64 = 110;
    /// Datasheet says 60 ms; shorter than 100 ms pops before unmute
    pub const INIT_TUNE_SETTLE_MS: u64 = 100;
    pub const DIRECT_TUNE_SETTLE_MS: u64 = 160;
    /// Gap between a good programming packet and the save
    pub const PACKET_SETTLE_MS: u64 = 50;
}

/// Gesture timing
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GestureConfig {
    pub debounce: Duration,
    pub long_press: Duration,
    /// `None` disables the third tier: long press saves immediately
    pub very_long_press: Option<Duration>,
    pub factory_confirm_window: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(consts::DEBOUNCE_MS),
            long_press: Duration::from_millis(consts::LONG_PRESS_MS),
            very_long_press: Some(Duration::from_millis(consts::VERY_LONG_PRESS_MS)),
            factory_confirm_window: Duration::from_millis(consts::FACTORY_CONFIRM_MS),
        }
    }
}

/// Complete core configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    pub gesture: GestureConfig,
    /// Interval between breath ramp steps
    pub breath_step: Duration,
    /// Ramp traversals before the first sleep
    pub breath_cycles: u16,
    pub low_battery_mv: u16,
    pub programmer_mv: u16,
    pub diagnostic_window: Duration,
    pub direct_tune_settle: Duration,
    /// Timer wake for supply re-checks during sleep; `None` = button only
    pub battery_check_interval: Option<Duration>,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            breath_step: Duration::from_millis(consts::BREATH_STEP_MS),
            breath_cycles: consts::BREATH_CYCLES,
            low_battery_mv: consts::LOW_BATTERY_MV,
            programmer_mv: consts::PROGRAMMER_MV,
            diagnostic_window: Duration::from_millis(consts::DIAGNOSTIC_WINDOW_MS),
            direct_tune_settle: Duration::from_millis(consts::DIRECT_TUNE_SETTLE_MS),
            battery_check_interval: None,
        }
    }
}

impl RadioConfig {
    /// Create a new configuration with validation
    pub fn new(
        gesture: GestureConfig,
        breath_cycles: u16,
        low_battery_mv: u16,
        programmer_mv: u16,
        battery_check_interval: Option<Duration>,
    ) -> Result<Self, &'static str> {
        if gesture.debounce.as_millis() > 500 {
            return Err("Debounce must be <= 500ms");
        }
        if gesture.long_press <= gesture.debounce {
            return Err("Long press must be longer than debounce");
        }
        if let Some(very_long) = gesture.very_long_press {
            if very_long <= gesture.long_press {
                return Err("Very long press must be longer than long press");
            }
        }
        if low_battery_mv >= programmer_mv {
            return Err("Programmer threshold must exceed low battery threshold");
        }
        if let Some(interval) = battery_check_interval {
            if interval.as_millis() < 1_000 {
                return Err("Battery check interval must be >= 1s");
            }
        }

        Ok(Self {
            gesture,
            breath_cycles,
            low_battery_mv,
            programmer_mv,
            battery_check_interval,
            ..Self::default()
        })
    }

    /// Same configuration with the very-long tier switched off
    pub fn two_tier(mut self) -> Self {
        self.gesture.very_long_press = None;
        self
    }
}
