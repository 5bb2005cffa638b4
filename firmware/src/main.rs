#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;
use panic_halt as _;

use riscv_rt::entry;

use publicradio_firmware as board;
use radio_core::{RadioConfig, Sequencer};

#[cfg(feature = "battery-watch")]
fn config() -> RadioConfig {
    RadioConfig {
        battery_check_interval: Some(radio_core::Duration::from_secs(15 * 60)),
        ..radio_core::default_config()
    }
}

#[cfg(not(feature = "battery-watch"))]
fn config() -> RadioConfig {
    radio_core::default_config()
}

#[entry]
fn main() -> ! {
    let peripherals = board::init();

    // Only the button and auto-wakeup interrupts are ever unmasked
    unsafe { riscv::interrupt::enable() };

    #[cfg(feature = "defmt")]
    defmt::info!("publicradio {}", radio_core::VERSION);

    Sequencer::new(peripherals, config()).run()
}
