#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Radio Core
//!
//! Receiver control and persistence core for a single-button, battery powered
//! FM radio built around an Si4702-class receiver.
//!
//! The core owns four pieces:
//!
//! - [`registers`]: the shadow copy of the receiver's 16 configuration registers
//! - [`params`]: the CRC protected working / factory parameter blocks
//! - [`gesture`]: the press classifier (short = scan, long = save,
//!   very long = factory reset)
//! - [`sequencer`]: the boot mode selector and the breathe / sleep idle loop
//!
//! Hardware is reached only through the traits in [`hal`], so the whole control
//! flow runs unchanged on the host against simulated peripherals.

#[macro_use]
mod fmt;

pub mod types;
pub mod config;
pub mod hal;
pub mod registers;
pub mod receiver;
pub mod params;
pub mod indicator;
pub mod gesture;
pub mod programming;
pub mod sequencer;
pub mod wake;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use types::*;
pub use config::*;
pub use hal::{Duration, Instant, *};
pub use registers::{Register, ShadowRegisters};
pub use receiver::{Receiver, ReceiverStatus};
pub use params::{ParameterBlock, ParameterStore};
pub use indicator::{BlinkCode, BlinkPattern};
pub use gesture::{GestureAction, GestureMachine, PressTimer};
pub use programming::{PacketError, PacketOutcome, ProgrammingPacket};
pub use sequencer::{Board, BootOutcome, Sequencer, SleepOutcome};
pub use wake::WakeSignal;

/// Radio core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration: the constants table from [`config::consts`]
pub fn default_config() -> RadioConfig {
    RadioConfig::default()
}
