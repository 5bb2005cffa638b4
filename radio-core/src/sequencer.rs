//! Power mode sequencer: boot mode selection and the idle loop
//!
//! Boot picks exactly one of
//!
//! - low battery: slow blink, then sleep with nothing armed
//! - programming: receive packets forever
//! - normal: optional factory restore, CRC check, receiver power-up
//!
//! Normal operation breathes the LED for a while and then sleeps, waking on
//! the button (and optionally a timer for supply re-checks).

use crate::config::{consts, RadioConfig};
use crate::gesture::{GestureAction, GestureMachine};
use crate::hal::{ButtonInput, Clock, Indicator, PacketLink, PowerControl, RadioHal, SupplyMonitor};
use crate::indicator::{self as led, BlinkCode, BREATH_TABLE};
use crate::params::ParameterStore;
use crate::programming::{PacketError, PacketOutcome, ProgrammingPacket};
use crate::receiver::Receiver;
use crate::types::{HaltReason, OperatingMode, RadioError, WakeReason, WakeSource};

/// Every peripheral the core drives
pub struct Board<H: RadioHal> {
    pub bus: H::Bus,
    pub storage: H::Storage,
    pub button: H::Button,
    pub indicator: H::Indicator,
    pub supply: H::Supply,
    pub power: H::Power,
    pub clock: H::Clock,
    pub link: H::Link,
}

/// Mode selected by [`Sequencer::boot`]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootOutcome {
    /// Receiver playing, continue with [`Sequencer::breathe`]
    Ready,
    /// Externally powered, continue with [`Sequencer::programming_step`]
    Programming,
    /// Diagnostic shown, nothing left but [`Sequencer::halt`]
    Halted(HaltReason),
}

/// Result of one [`Sequencer::sleep_cycle`]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepOutcome {
    /// Spurious wake or supply still fine
    Idle,
    Pressed(GestureAction),
    Halted(HaltReason),
}

pub struct Sequencer<H: RadioHal> {
    config: RadioConfig,
    mode: OperatingMode,
    receiver: Receiver<H::Bus>,
    store: ParameterStore<H::Storage>,
    gestures: GestureMachine,
    button: H::Button,
    indicator: H::Indicator,
    supply: H::Supply,
    power: H::Power,
    clock: H::Clock,
    link: H::Link,
}

impl<H: RadioHal> Sequencer<H> {
    pub fn new(board: Board<H>, config: RadioConfig) -> Self {
        Self {
            config,
            mode: OperatingMode::NormalInit,
            receiver: Receiver::new(board.bus, consts::RECEIVER_ADDRESS),
            store: ParameterStore::new(board.storage),
            gestures: GestureMachine::new(config.gesture, config.direct_tune_settle),
            button: board.button,
            indicator: board.indicator,
            supply: board.supply,
            power: board.power,
            clock: board.clock,
            link: board.link,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn receiver(&mut self) -> &mut Receiver<H::Bus> {
        &mut self.receiver
    }

    pub fn store(&mut self) -> &mut ParameterStore<H::Storage> {
        &mut self.store
    }

    /// Select the operating mode and, for normal mode, bring the receiver up
    pub fn boot(&mut self) -> Result<BootOutcome, RadioError> {
        // Keep receiver and amplifier quiet before anything else moves
        self.power.set_receiver_reset(true)?;

        if !self.supply.supply_above(self.config.low_battery_mv)? {
            self.supply.shutdown()?;
            return self.fail(HaltReason::LowBattery).map(BootOutcome::Halted);
        }

        if self.supply.supply_above(self.config.programmer_mv)? {
            info!("programmer voltage present");
            self.mode = OperatingMode::Programming;
            return Ok(BootOutcome::Programming);
        }
        self.supply.shutdown()?;

        self.mode = OperatingMode::NormalInit;
        self.indicator.set_drive_enabled(true)?;

        if self.button.is_pressed()? {
            info!("button held at boot, factory defaults pending");
            let pending = BlinkCode::FactoryPending.pattern();
            while self.button.is_pressed()? {
                led::play_once(&mut self.indicator, &mut self.clock, &pending)?;
            }
            self.store.restore_factory_defaults()?;
        }

        let params = match self.store.load_working() {
            Ok(params) => params,
            Err(RadioError::ParameterCrc { .. }) => {
                return self.fail(HaltReason::BadParameters).map(BootOutcome::Halted);
            }
            Err(err) => return Err(err),
        };
        self.gestures.set_band(params.band(), params.spacing());

        match self
            .receiver
            .power_up(&params, &mut self.power, &mut self.clock)
        {
            Ok(()) => {}
            Err(RadioError::Bus(kind)) => {
                warn!("receiver power-up failed: {}", kind);
                self.power.set_receiver_reset(true)?;
                return self.fail(HaltReason::BusFault).map(BootOutcome::Halted);
            }
            Err(err) => return Err(err),
        }

        self.button.enable_wake_interrupt()?;
        self.mode = OperatingMode::NormalBreathing;
        Ok(BootOutcome::Ready)
    }

    /// Run the breathing ramp `breath_cycles` times, handling presses.
    ///
    /// A press that fails is logged and the ramp restarts as usual; a bus
    /// failure only leaves the shadow stale.
    pub fn breathe(&mut self) -> Result<(), RadioError> {
        self.mode = OperatingMode::NormalBreathing;
        self.indicator.set_drive_enabled(true)?;

        for _ in 0..self.config.breath_cycles {
            let mut step = 0;
            while step < BREATH_TABLE.len() {
                self.indicator.set_brightness(BREATH_TABLE[step])?;
                self.clock.delay(self.config.breath_step);
                step += 1;

                if self.button.is_pressed()? {
                    if let Err(err) = self.press() {
                        warn!("press during breathing failed: {}", err);
                    }
                    step = 0;
                }
            }
        }
        self.indicator.set_brightness(0)?;
        Ok(())
    }

    /// Sleep once and handle whatever woke the processor
    pub fn sleep_cycle(&mut self) -> Result<SleepOutcome, RadioError> {
        self.mode = OperatingMode::NormalSleeping;
        self.indicator.set_drive_enabled(false)?;

        let wake = match self.config.battery_check_interval {
            Some(interval) => WakeSource::ButtonOrTimer(interval),
            None => WakeSource::Button,
        };

        match self.power.sleep(wake) {
            WakeReason::Timer => {
                let healthy = self.supply.supply_above(self.config.low_battery_mv)?;
                self.supply.shutdown()?;
                if healthy {
                    trace!("supply ok");
                    return Ok(SleepOutcome::Idle);
                }
                warn!("battery low during playback");
                self.power.set_receiver_reset(true)?;
                self.fail(HaltReason::LowBattery).map(SleepOutcome::Halted)
            }
            WakeReason::Button | WakeReason::Spurious => {
                // Only presses matter, lifts and glitches go back to sleep
                if !self.button.is_pressed()? {
                    return Ok(SleepOutcome::Idle);
                }
                self.indicator.set_drive_enabled(true)?;
                let action = self.press()?;
                self.mode = OperatingMode::NormalSleeping;
                Ok(SleepOutcome::Pressed(action))
            }
        }
    }

    /// Take one packet from the programming link and apply it
    pub fn programming_step(&mut self) -> Result<PacketOutcome, RadioError> {
        self.mode = OperatingMode::Programming;
        let received = ProgrammingPacket::read_from(&mut self.link);
        // Storage is on the same data line
        self.link.release()?;
        let packet = match received {
            Ok(packet) => packet,
            Err(PacketError::Incomplete) => return Ok(PacketOutcome::Incomplete),
            Err(PacketError::Link) => return Err(RadioError::Link),
        };

        if !packet.is_valid() {
            warn!("packet rejected, crc {}", packet.crc());
            led::play_once(
                &mut self.indicator,
                &mut self.clock,
                &BlinkCode::PacketRejected.pattern(),
            )?;
            return Ok(PacketOutcome::Rejected);
        }

        self.clock.delay_ms(consts::PACKET_SETTLE_MS);
        self.store.save_channel(packet.channel())?;
        led::play_once(
            &mut self.indicator,
            &mut self.clock,
            &BlinkCode::PacketAccepted.pattern(),
        )?;
        info!("packet accepted, channel {}", packet.channel());
        Ok(PacketOutcome::Accepted(packet.channel()))
    }

    /// Sleep with nothing armed, forever
    pub fn halt(&mut self) -> ! {
        let _ = self.indicator.set_brightness(0);
        let _ = self.indicator.set_direct(false);
        let _ = self.indicator.set_drive_enabled(false);
        loop {
            self.power.sleep(WakeSource::Nothing);
        }
    }

    /// Boot and run whichever mode was selected. Never returns.
    pub fn run(mut self) -> ! {
        let outcome = match self.boot() {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("boot failed: {}", err);
                self.halt();
            }
        };
        info!("boot outcome {}", outcome);

        match outcome {
            BootOutcome::Halted(_) => self.halt(),
            BootOutcome::Programming => loop {
                if let Err(err) = self.programming_step() {
                    warn!("programming step failed: {}", err);
                }
            },
            BootOutcome::Ready => {
                if let Err(err) = self.breathe() {
                    warn!("breathing interrupted: {}", err);
                }
                loop {
                    match self.sleep_cycle() {
                        Ok(SleepOutcome::Halted(_)) => self.halt(),
                        Ok(_) => {}
                        Err(err) => warn!("wake handling failed: {}", err),
                    }
                }
            }
        }
    }

    fn press(&mut self) -> Result<GestureAction, RadioError> {
        self.gestures.handle_press(
            &mut self.receiver,
            &mut self.store,
            &mut self.button,
            &mut self.indicator,
            &mut self.clock,
        )
    }

    /// Show the diagnostic for `reason` for the configured window
    fn fail(&mut self, reason: HaltReason) -> Result<HaltReason, RadioError> {
        let code = match reason {
            HaltReason::LowBattery => {
                self.mode = OperatingMode::LowBattery;
                BlinkCode::LowBattery
            }
            HaltReason::BadParameters => BlinkCode::BadParameters,
            HaltReason::BusFault => BlinkCode::BusFault,
        };
        warn!("halting: {}", reason);
        // Direct drive only, the PWM stage stays powered down
        self.indicator.set_brightness(0)?;
        self.indicator.set_drive_enabled(false)?;
        led::play_for(
            &mut self.indicator,
            &mut self.clock,
            &code.pattern(),
            self.config.diagnostic_window,
        )?;
        Ok(reason)
    }
}
