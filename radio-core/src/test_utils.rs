//! Simulated peripherals for host tests
//!
//! Every simulator is a cheap clonable handle over shared state, so a test can
//! hand one clone to the core and keep another to script inputs and inspect
//! what the core did. All of them share one [`time::SimClock`].

pub mod time {
    //! Virtual millisecond time

    use crate::hal::{Clock, Duration, Instant};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Clock that only moves when someone waits on it
    #[derive(Clone, Default)]
    pub struct SimClock {
        now_ms: Rc<Cell<u64>>,
    }

    impl SimClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn now_ms(&self) -> u64 {
            self.now_ms.get()
        }

        pub fn advance(&self, duration: Duration) {
            self.now_ms.set(self.now_ms.get() + duration.as_millis());
        }

        /// Jump forward to `ms`; never moves backwards
        pub fn advance_to(&self, ms: u64) {
            if ms > self.now_ms.get() {
                self.now_ms.set(ms);
            }
        }
    }

    impl Clock for SimClock {
        fn now(&mut self) -> Instant {
            Instant::from_millis(self.now_ms.get())
        }

        fn delay(&mut self, duration: Duration) {
            self.advance(duration);
        }
    }
}

pub mod button {
    //! Button driven by a script of press intervals

    use super::time::SimClock;
    use crate::hal::{ButtonInput, HalError};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Clone)]
    pub struct ScriptedButton {
        clock: SimClock,
        /// Half-open [start, end) intervals in ms during which the pin is down
        presses: Rc<RefCell<Vec<(u64, u64)>>>,
        wake_armed: Rc<Cell<bool>>,
    }

    impl ScriptedButton {
        pub fn new(clock: SimClock) -> Self {
            Self {
                clock,
                presses: Rc::new(RefCell::new(Vec::new())),
                wake_armed: Rc::new(Cell::new(false)),
            }
        }

        /// Hold the button from `at_ms` for `hold_ms`
        pub fn press(&self, at_ms: u64, hold_ms: u64) -> &Self {
            self.presses.borrow_mut().push((at_ms, at_ms + hold_ms));
            self
        }

        pub fn is_down_at(&self, ms: u64) -> bool {
            self.presses
                .borrow()
                .iter()
                .any(|&(start, end)| start <= ms && ms < end)
        }

        /// First press edge at or after `ms`
        pub fn next_press_from(&self, ms: u64) -> Option<u64> {
            self.presses
                .borrow()
                .iter()
                .map(|&(start, _)| start)
                .filter(|&start| start >= ms)
                .min()
        }

        pub fn wake_armed(&self) -> bool {
            self.wake_armed.get()
        }
    }

    impl ButtonInput for ScriptedButton {
        fn is_pressed(&mut self) -> Result<bool, HalError> {
            Ok(self.is_down_at(self.clock.now_ms()))
        }

        fn enable_wake_interrupt(&mut self) -> Result<(), HalError> {
            self.wake_armed.set(true);
            Ok(())
        }
    }
}

pub mod bus {
    //! Receiver chip on a simulated two-wire bus

    use super::time::SimClock;
    use crate::config::consts::RECEIVER_ADDRESS;
    use crate::registers::Register;
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Default)]
    struct ChipState {
        registers: [u16; 16],
        /// (time, values written starting at 0x2)
        writes: Vec<(u64, Vec<u16>)>,
        reads: usize,
        fail_next: bool,
        unresponsive: bool,
    }

    /// Register file of the receiver plus a log of every write transaction
    #[derive(Clone, Default)]
    pub struct SimReceiver {
        state: Rc<RefCell<ChipState>>,
        clock: Option<SimClock>,
    }

    impl SimReceiver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Stamp writes with `clock`
        pub fn with_clock(clock: SimClock) -> Self {
            Self {
                clock: Some(clock),
                ..Self::default()
            }
        }

        pub fn bus(&self) -> SimBus {
            SimBus { chip: self.clone() }
        }

        pub fn poke(&self, register: Register, value: u16) {
            self.state.borrow_mut().registers[register.address() as usize] = value;
        }

        pub fn peek(&self, register: Register) -> u16 {
            self.state.borrow().registers[register.address() as usize]
        }

        pub fn writes(&self) -> Vec<Vec<u16>> {
            self.state
                .borrow()
                .writes
                .iter()
                .map(|(_, values)| values.clone())
                .collect()
        }

        pub fn timed_writes(&self) -> Vec<(u64, Vec<u16>)> {
            self.state.borrow().writes.clone()
        }

        /// Last register reached by each write transaction
        pub fn write_bounds(&self) -> Vec<Register> {
            self.state
                .borrow()
                .writes
                .iter()
                .filter_map(|(_, values)| Register::from_address(1 + values.len() as u8))
                .collect()
        }

        pub fn reads(&self) -> usize {
            self.state.borrow().reads
        }

        pub fn clear_writes(&self) {
            self.state.borrow_mut().writes.clear();
        }

        /// NACK the next transaction
        pub fn fail_next(&self) {
            self.state.borrow_mut().fail_next = true;
        }

        /// NACK every transaction while set
        pub fn set_unresponsive(&self, unresponsive: bool) {
            self.state.borrow_mut().unresponsive = unresponsive;
        }

        fn now(&self) -> u64 {
            self.clock.as_ref().map(SimClock::now_ms).unwrap_or(0)
        }
    }

    /// Bus handle given to the code under test
    #[derive(Clone)]
    pub struct SimBus {
        chip: SimReceiver,
    }

    impl ErrorType for SimBus {
        type Error = ErrorKind;
    }

    impl I2c for SimBus {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
            let now = self.chip.now();
            let mut state = self.chip.state.borrow_mut();
            if address != RECEIVER_ADDRESS || state.unresponsive {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            if state.fail_next {
                state.fail_next = false;
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
            }

            for operation in operations.iter_mut() {
                match operation {
                    Operation::Write(bytes) => {
                        let values: Vec<u16> = bytes
                            .chunks_exact(2)
                            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                            .collect();
                        for (offset, value) in values.iter().enumerate() {
                            let index = (Register::WRITE_START.address() as usize + offset) % 16;
                            state.registers[index] = *value;
                        }
                        state.writes.push((now, values));
                    }
                    Operation::Read(buffer) => {
                        for (index, byte) in buffer.iter_mut().enumerate() {
                            let register = (0xA + index / 2) % 16;
                            let [hi, lo] = state.registers[register].to_be_bytes();
                            *byte = if index % 2 == 0 { hi } else { lo };
                        }
                        state.reads += 1;
                    }
                }
            }
            Ok(())
        }
    }
}

pub mod eeprom {
    //! Byte addressable non-volatile memory with power-loss injection

    use super::link::SharedLine;
    use crate::params::{ParameterBlock, FACTORY_OFFSET, WORKING_OFFSET};
    use embedded_storage::{ReadStorage, Storage};
    use std::cell::RefCell;
    use std::ops::Range;
    use std::rc::Rc;
    use std::vec::Vec;

    pub const CAPACITY: usize = 256;

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum EepromError {
        OutOfBounds,
        /// Write budget exhausted, remaining bytes were not written
        PowerLoss,
        /// Data line still held by the programming link: no acknowledge
        LineBusy,
    }

    struct EepromState {
        data: Vec<u8>,
        written: Vec<u32>,
        budget: Option<usize>,
        line: Option<SharedLine>,
    }

    impl EepromState {
        fn check_line(&self) -> Result<(), EepromError> {
            match &self.line {
                Some(line) if line.is_claimed() => Err(EepromError::LineBusy),
                _ => Ok(()),
            }
        }
    }

    #[derive(Clone)]
    pub struct MemoryEeprom {
        state: Rc<RefCell<EepromState>>,
    }

    impl Default for MemoryEeprom {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryEeprom {
        /// Erased part, every byte 0xFF
        pub fn new() -> Self {
            Self {
                state: Rc::new(RefCell::new(EepromState {
                    data: vec![0xFF; CAPACITY],
                    written: Vec::new(),
                    budget: None,
                    line: None,
                })),
            }
        }

        /// Both areas holding `block`, write log empty
        pub fn provisioned(block: &ParameterBlock) -> Self {
            let eeprom = Self::new();
            {
                let mut state = eeprom.state.borrow_mut();
                for offset in [WORKING_OFFSET, FACTORY_OFFSET] {
                    let start = offset as usize;
                    state.data[start..start + block.as_bytes().len()].copy_from_slice(block.as_bytes());
                }
            }
            eeprom
        }

        pub fn bytes(&self, range: Range<usize>) -> Vec<u8> {
            self.state.borrow().data[range].to_vec()
        }

        /// Flip the bits of `mask` at `offset` behind the writer's back
        pub fn corrupt(&self, offset: usize, mask: u8) {
            self.state.borrow_mut().data[offset] ^= mask;
        }

        /// Offsets of every byte written, in order
        pub fn written_offsets(&self) -> Vec<u32> {
            self.state.borrow().written.clone()
        }

        pub fn clear_log(&self) {
            self.state.borrow_mut().written.clear();
        }

        /// Accept `bytes` more byte writes, then fail all further writes
        pub fn fail_after(&self, bytes: usize) {
            self.state.borrow_mut().budget = Some(bytes);
        }

        /// Sit on `line`: every access fails while the link holds it
        pub fn share_line(&self, line: SharedLine) {
            self.state.borrow_mut().line = Some(line);
        }
    }

    impl ReadStorage for MemoryEeprom {
        type Error = EepromError;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let state = self.state.borrow();
            state.check_line()?;
            let start = offset as usize;
            let source = state
                .data
                .get(start..start + bytes.len())
                .ok_or(EepromError::OutOfBounds)?;
            bytes.copy_from_slice(source);
            Ok(())
        }

        fn capacity(&self) -> usize {
            CAPACITY
        }
    }

    impl Storage for MemoryEeprom {
        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            let mut state = self.state.borrow_mut();
            state.check_line()?;
            if offset as usize + bytes.len() > CAPACITY {
                return Err(EepromError::OutOfBounds);
            }
            for (index, byte) in bytes.iter().enumerate() {
                match state.budget {
                    Some(0) => return Err(EepromError::PowerLoss),
                    Some(ref mut left) => *left -= 1,
                    None => {}
                }
                let address = offset + index as u32;
                state.data[address as usize] = *byte;
                state.written.push(address);
            }
            Ok(())
        }
    }
}

pub mod indicator {
    //! LED that records every command

    use super::time::SimClock;
    use crate::hal::{HalError, Indicator};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum IndicatorEvent {
        Brightness(u8),
        Drive(bool),
        Direct(bool),
    }

    #[derive(Clone)]
    pub struct TraceIndicator {
        clock: SimClock,
        events: Rc<RefCell<Vec<(u64, IndicatorEvent)>>>,
    }

    impl TraceIndicator {
        pub fn new(clock: SimClock) -> Self {
            Self {
                clock,
                events: Rc::new(RefCell::new(Vec::new())),
            }
        }

        pub fn events(&self) -> Vec<(u64, IndicatorEvent)> {
            self.events.borrow().clone()
        }

        pub fn last(&self) -> Option<IndicatorEvent> {
            self.events.borrow().last().map(|(_, event)| *event)
        }

        pub fn clear(&self) {
            self.events.borrow_mut().clear();
        }

        /// Directly driven flashes
        pub fn direct_pulses(&self) -> usize {
            self.count(IndicatorEvent::Direct(true))
        }

        /// Full brightness flashes through the PWM stage
        pub fn pwm_pulses(&self) -> usize {
            self.count(IndicatorEvent::Brightness(u8::MAX))
        }

        pub fn drive_enabled(&self) -> bool {
            self.events
                .borrow()
                .iter()
                .rev()
                .find_map(|(_, event)| match event {
                    IndicatorEvent::Drive(enabled) => Some(*enabled),
                    _ => None,
                })
                .unwrap_or(false)
        }

        pub fn is_lit(&self) -> bool {
            let events = self.events.borrow();
            let direct = events.iter().rev().find_map(|(_, event)| match event {
                IndicatorEvent::Direct(on) => Some(*on),
                _ => None,
            });
            let level = events.iter().rev().find_map(|(_, event)| match event {
                IndicatorEvent::Brightness(level) => Some(*level),
                _ => None,
            });
            direct.unwrap_or(false) || level.unwrap_or(0) > 0
        }

        fn count(&self, wanted: IndicatorEvent) -> usize {
            self.events
                .borrow()
                .iter()
                .filter(|(_, event)| *event == wanted)
                .count()
        }

        fn record(&self, event: IndicatorEvent) {
            self.events.borrow_mut().push((self.clock.now_ms(), event));
        }
    }

    impl Indicator for TraceIndicator {
        fn set_brightness(&mut self, level: u8) -> Result<(), HalError> {
            self.record(IndicatorEvent::Brightness(level));
            Ok(())
        }

        fn set_drive_enabled(&mut self, enabled: bool) -> Result<(), HalError> {
            self.record(IndicatorEvent::Drive(enabled));
            Ok(())
        }

        fn set_direct(&mut self, on: bool) -> Result<(), HalError> {
            self.record(IndicatorEvent::Direct(on));
            Ok(())
        }
    }
}

pub mod power {
    //! Reset line and sleep against virtual time

    use super::button::ScriptedButton;
    use super::time::SimClock;
    use crate::hal::{HalError, PowerControl};
    use crate::types::{WakeReason, WakeSource};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Default)]
    struct PowerState {
        reset_log: Vec<(u64, bool)>,
        sleeps: Vec<WakeSource>,
        halted: bool,
    }

    /// Sleep jumps the clock to the next scripted press or timer expiry
    #[derive(Clone)]
    pub struct SimPower {
        clock: SimClock,
        button: Option<ScriptedButton>,
        state: Rc<RefCell<PowerState>>,
    }

    impl SimPower {
        pub fn new(clock: SimClock) -> Self {
            Self {
                clock,
                button: None,
                state: Rc::default(),
            }
        }

        pub fn with_button(clock: SimClock, button: ScriptedButton) -> Self {
            Self {
                button: Some(button),
                ..Self::new(clock)
            }
        }

        /// (time, asserted) for every reset line change
        pub fn reset_log(&self) -> Vec<(u64, bool)> {
            self.state.borrow().reset_log.clone()
        }

        pub fn sleeps(&self) -> Vec<WakeSource> {
            self.state.borrow().sleeps.clone()
        }

        /// Entered sleep with nothing armed
        pub fn halted(&self) -> bool {
            self.state.borrow().halted
        }

        /// Now if the button is already down, else the next scripted edge
        fn next_press(&self) -> Option<u64> {
            let now = self.clock.now_ms();
            let button = self.button.as_ref()?;
            if button.is_down_at(now) {
                return Some(now);
            }
            button.next_press_from(now)
        }
    }

    impl PowerControl for SimPower {
        fn set_receiver_reset(&mut self, asserted: bool) -> Result<(), HalError> {
            self.state
                .borrow_mut()
                .reset_log
                .push((self.clock.now_ms(), asserted));
            Ok(())
        }

        fn sleep(&mut self, wake: WakeSource) -> WakeReason {
            self.state.borrow_mut().sleeps.push(wake);
            match wake {
                WakeSource::Nothing => {
                    self.state.borrow_mut().halted = true;
                    WakeReason::Spurious
                }
                WakeSource::Button => match self.next_press() {
                    Some(at) => {
                        self.clock.advance_to(at);
                        WakeReason::Button
                    }
                    None => WakeReason::Spurious,
                },
                WakeSource::ButtonOrTimer(interval) => {
                    let deadline = self.clock.now_ms() + interval.as_millis();
                    match self.next_press() {
                        Some(at) if at <= deadline => {
                            self.clock.advance_to(at);
                            WakeReason::Button
                        }
                        _ => {
                            self.clock.advance_to(deadline);
                            WakeReason::Timer
                        }
                    }
                }
            }
        }
    }
}

pub mod supply {
    //! Adjustable supply voltage

    use crate::hal::{HalError, SupplyMonitor};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    pub struct SimSupply {
        millivolts: Rc<Cell<u16>>,
        shut_down: Rc<Cell<bool>>,
    }

    impl SimSupply {
        pub fn new(millivolts: u16) -> Self {
            Self {
                millivolts: Rc::new(Cell::new(millivolts)),
                shut_down: Rc::new(Cell::new(false)),
            }
        }

        pub fn set_millivolts(&self, millivolts: u16) {
            self.millivolts.set(millivolts);
        }

        pub fn is_shut_down(&self) -> bool {
            self.shut_down.get()
        }
    }

    impl SupplyMonitor for SimSupply {
        /// Powers the converter back up if needed
        fn supply_above(&mut self, threshold_mv: u16) -> Result<bool, HalError> {
            self.shut_down.set(false);
            Ok(self.millivolts.get() > threshold_mv)
        }

        fn shutdown(&mut self) -> Result<(), HalError> {
            self.shut_down.set(true);
            Ok(())
        }
    }
}

pub mod link {
    //! Programming link fed from a byte queue

    use crate::hal::{HalError, PacketLink};
    use embedded_io::{ErrorKind, ErrorType, Read};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Data pin shared by the link and the storage bus
    #[derive(Clone, Default)]
    pub struct SharedLine {
        held_by_link: Rc<Cell<bool>>,
    }

    impl SharedLine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn claim(&self) {
            self.held_by_link.set(true);
        }

        pub fn release(&self) {
            self.held_by_link.set(false);
        }

        pub fn is_claimed(&self) -> bool {
            self.held_by_link.get()
        }
    }

    /// Reading claims the line until [`PacketLink::release`]
    #[derive(Clone, Default)]
    pub struct ScriptedLink {
        bytes: Rc<RefCell<VecDeque<u8>>>,
        line: SharedLine,
    }

    impl ScriptedLink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on_line(line: SharedLine) -> Self {
            Self {
                line,
                ..Self::default()
            }
        }

        pub fn push(&self, bytes: &[u8]) {
            self.bytes.borrow_mut().extend(bytes.iter().copied());
        }

        pub fn remaining(&self) -> usize {
            self.bytes.borrow().len()
        }
    }

    impl ErrorType for ScriptedLink {
        type Error = ErrorKind;
    }

    impl Read for ScriptedLink {
        /// Returns 0 once the queue is drained
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            self.line.claim();
            let mut queue = self.bytes.borrow_mut();
            let count = buf.len().min(queue.len());
            for slot in buf.iter_mut().take(count) {
                if let Some(byte) = queue.pop_front() {
                    *slot = byte;
                }
            }
            Ok(count)
        }
    }

    impl PacketLink for ScriptedLink {
        fn release(&mut self) -> Result<(), HalError> {
            self.line.release();
            Ok(())
        }
    }
}

pub mod rig {
    //! Complete simulated board

    use super::bus::{SimBus, SimReceiver};
    use super::button::ScriptedButton;
    use super::eeprom::MemoryEeprom;
    use super::indicator::TraceIndicator;
    use super::link::{ScriptedLink, SharedLine};
    use super::power::SimPower;
    use super::supply::SimSupply;
    use super::time::SimClock;
    use crate::config::RadioConfig;
    use crate::hal::RadioHal;
    use crate::params::ParameterBlock;
    use crate::sequencer::{Board, Sequencer};

    /// Healthy two-cell supply
    pub const BATTERY_MV: u16 = 3_000;

    pub struct SimHal;

    impl RadioHal for SimHal {
        type Bus = SimBus;
        type Storage = MemoryEeprom;
        type Button = ScriptedButton;
        type Indicator = TraceIndicator;
        type Supply = SimSupply;
        type Power = SimPower;
        type Clock = SimClock;
        type Link = ScriptedLink;
    }

    /// Handles onto every simulated peripheral
    #[derive(Clone)]
    pub struct SimRig {
        pub clock: SimClock,
        pub chip: SimReceiver,
        pub eeprom: MemoryEeprom,
        pub button: ScriptedButton,
        pub led: TraceIndicator,
        pub supply: SimSupply,
        pub power: SimPower,
        pub link: ScriptedLink,
        /// SDIO, shared by the EEPROM and the programming link
        pub line: SharedLine,
    }

    impl SimRig {
        /// Board with `block` provisioned as both working and factory block
        pub fn new(block: ParameterBlock) -> Self {
            let clock = SimClock::new();
            let button = ScriptedButton::new(clock.clone());
            let line = SharedLine::new();
            let eeprom = MemoryEeprom::provisioned(&block);
            eeprom.share_line(line.clone());
            Self {
                chip: SimReceiver::with_clock(clock.clone()),
                eeprom,
                led: TraceIndicator::new(clock.clone()),
                supply: SimSupply::new(BATTERY_MV),
                power: SimPower::with_button(clock.clone(), button.clone()),
                link: ScriptedLink::on_line(line.clone()),
                line,
                button,
                clock,
            }
        }

        pub fn board(&self) -> Board<SimHal> {
            Board {
                bus: self.chip.bus(),
                storage: self.eeprom.clone(),
                button: self.button.clone(),
                indicator: self.led.clone(),
                supply: self.supply.clone(),
                power: self.power.clone(),
                clock: self.clock.clone(),
                link: self.link.clone(),
            }
        }

        pub fn sequencer(&self, config: RadioConfig) -> Sequencer<SimHal> {
            Sequencer::new(self.board(), config)
        }
    }
}
