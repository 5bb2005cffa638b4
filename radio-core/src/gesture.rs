//! Button press classification and the actions bound to each gesture
//!
//! A press runs to completion before anything else happens:
//!
//! ```text
//! Idle -> DebouncingDown -> Timing -> {Short|Long|VeryLong}Action -> DebouncingUp -> Idle
//! ```
//!
//! Timing samples the pin once per millisecond. When the countdown expires in
//! the same tick the pin is released, the countdown wins.

use embedded_hal::i2c::I2c;
use embedded_storage::Storage;

use crate::config::GestureConfig;
use crate::hal::{ButtonInput, Clock, Duration, Indicator};
use crate::indicator::{self, BlinkCode};
use crate::params::ParameterStore;
use crate::receiver::Receiver;
use crate::types::{next_channel, Band, Gesture, GestureState, RadioError, Spacing};

/// Millisecond countdown for a single press
#[derive(Copy, Clone, Debug)]
pub struct PressTimer {
    long_ms: u64,
    very_long_ms: Option<u64>,
    elapsed_ms: u64,
}

impl PressTimer {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            long_ms: config.long_press.as_millis(),
            very_long_ms: config.very_long_press.map(|d| d.as_millis()),
            elapsed_ms: 0,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// True exactly on the tick the long threshold is crossed
    pub fn at_long_threshold(&self) -> bool {
        self.elapsed_ms == self.long_ms
    }

    /// Classification for a release observed now
    pub fn release(&self) -> Gesture {
        if self.elapsed_ms < self.long_ms {
            Gesture::Short
        } else {
            Gesture::Long
        }
    }

    /// One millisecond held. Returns the gesture once a countdown expires.
    pub fn tick(&mut self) -> Option<Gesture> {
        self.elapsed_ms += 1;
        match self.very_long_ms {
            Some(very_long) if self.elapsed_ms >= very_long => Some(Gesture::VeryLong),
            Some(_) => None,
            None if self.elapsed_ms >= self.long_ms => Some(Gesture::Long),
            None => None,
        }
    }

    /// Feed one pin sample; a held sample is followed by one tick
    pub fn step(&mut self, pressed: bool) -> Option<Gesture> {
        if pressed {
            self.tick()
        } else {
            Some(self.release())
        }
    }
}

/// What a handled press did
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GestureAction {
    /// Short press: tuned one channel up, nothing persisted
    Tuned(u16),
    /// Long press: current channel saved
    Saved(u16),
    /// Confirmed very-long press: working block restored, tuned to its channel
    FactoryRestored(u16),
    /// Very-long press without confirmation
    ResetAborted,
}

/// Press handler. Holds the band layout used for scan wrap-around.
pub struct GestureMachine {
    config: GestureConfig,
    tune_settle: Duration,
    band: Band,
    spacing: Spacing,
    state: GestureState,
}

impl GestureMachine {
    pub fn new(config: GestureConfig, tune_settle: Duration) -> Self {
        Self {
            config,
            tune_settle,
            band: Band::Wide,
            spacing: Spacing::Khz100,
            state: GestureState::Idle,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn set_band(&mut self, band: Band, spacing: Spacing) {
        self.band = band;
        self.spacing = spacing;
    }

    /// Handle a press whose leading edge has just been seen.
    ///
    /// Blocks until the button is released and debounced. The machine is
    /// back in [`GestureState::Idle`] afterwards, whether or not the press
    /// succeeded.
    pub fn handle_press<B, S, K, I, C>(
        &mut self,
        receiver: &mut Receiver<B>,
        store: &mut ParameterStore<S>,
        button: &mut K,
        indicator: &mut I,
        clock: &mut C,
    ) -> Result<GestureAction, RadioError>
    where
        B: I2c,
        S: Storage,
        K: ButtonInput,
        I: Indicator,
        C: Clock,
    {
        let result = self.run_press(receiver, store, button, indicator, clock);
        self.state = GestureState::Idle;
        result
    }

    fn run_press<B, S, K, I, C>(
        &mut self,
        receiver: &mut Receiver<B>,
        store: &mut ParameterStore<S>,
        button: &mut K,
        indicator: &mut I,
        clock: &mut C,
    ) -> Result<GestureAction, RadioError>
    where
        B: I2c,
        S: Storage,
        K: ButtonInput,
        I: Indicator,
        C: Clock,
    {
        let entry_channel = receiver.current_channel();
        let gesture = self.classify(button, indicator, clock)?;
        info!("gesture {} on channel {}", gesture, entry_channel);

        let action = match gesture {
            Gesture::Short => {
                self.state = GestureState::ShortAction;
                let next = next_channel(entry_channel, self.band, self.spacing);
                receiver.tune_direct(next, self.tune_settle, clock)?;
                GestureAction::Tuned(next)
            }
            Gesture::Long => {
                self.state = GestureState::LongAction;
                save_flash(indicator, clock)?;
                store.save_channel(entry_channel)?;
                GestureAction::Saved(entry_channel)
            }
            Gesture::VeryLong => {
                self.state = GestureState::VeryLongAction;
                indicator.set_brightness(0)?;
                self.await_release(button, clock)?;
                self.confirm_factory_reset(receiver, store, button, indicator, clock)?
            }
        };

        self.await_release(button, clock)?;
        Ok(action)
    }

    fn classify<K, I, C>(&mut self, button: &mut K, indicator: &mut I, clock: &mut C) -> Result<Gesture, RadioError>
    where
        K: ButtonInput,
        I: Indicator,
        C: Clock,
    {
        // LED off straight away so the press is visibly registered
        self.state = GestureState::DebouncingDown;
        indicator.set_brightness(0)?;
        clock.delay(self.config.debounce);

        let mut timer = PressTimer::new(&self.config);
        self.state = GestureState::Timing {
            elapsed: Duration::from_millis(0),
        };
        loop {
            if !button.is_pressed()? {
                return Ok(timer.release());
            }
            clock.delay_ms(1);
            let expired = timer.tick();
            self.state = GestureState::Timing {
                elapsed: Duration::from_millis(timer.elapsed_ms()),
            };
            if let Some(gesture) = expired {
                return Ok(gesture);
            }
            if timer.at_long_threshold() {
                // Long is armed; keep holding for the very-long tier
                indicator.set_brightness(u8::MAX)?;
            }
        }
    }

    fn await_release<K, C>(&mut self, button: &mut K, clock: &mut C) -> Result<(), RadioError>
    where
        K: ButtonInput,
        C: Clock,
    {
        self.state = GestureState::DebouncingUp;
        while button.is_pressed()? {
            clock.delay_ms(1);
        }
        clock.delay(self.config.debounce);
        Ok(())
    }

    fn confirm_factory_reset<B, S, K, I, C>(
        &mut self,
        receiver: &mut Receiver<B>,
        store: &mut ParameterStore<S>,
        button: &mut K,
        indicator: &mut I,
        clock: &mut C,
    ) -> Result<GestureAction, RadioError>
    where
        B: I2c,
        S: Storage,
        K: ButtonInput,
        I: Indicator,
        C: Clock,
    {
        info!("factory reset armed");
        let pressed = indicator::play_until(
            indicator,
            clock,
            &BlinkCode::FactoryConfirm.pattern(),
            self.config.factory_confirm_window,
            || button.is_pressed().map_err(RadioError::from),
        )?;
        if !pressed {
            info!("factory reset timed out");
            return Ok(GestureAction::ResetAborted);
        }

        let confirmation = self.classify(button, indicator, clock)?;
        self.state = GestureState::VeryLongAction;
        if confirmation == Gesture::Short {
            indicator.set_brightness(0)?;
            info!("factory reset cancelled");
            return Ok(GestureAction::ResetAborted);
        }

        store.restore_factory_defaults()?;
        let params = store.load_working()?;
        self.set_band(params.band(), params.spacing());
        receiver.apply_parameters(&params)?;
        receiver.tune_direct(params.channel(), self.tune_settle, clock)?;
        save_flash(indicator, clock)?;
        Ok(GestureAction::FactoryRestored(params.channel()))
    }
}

fn save_flash<I: Indicator, C: Clock>(indicator: &mut I, clock: &mut C) -> Result<(), RadioError> {
    let pattern = BlinkCode::SaveAccepted.pattern();
    indicator::flash(indicator, clock, u8::MAX, pattern.period())?;
    Ok(())
}
