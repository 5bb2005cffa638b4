// Host simulation of one listening session on the simulated board

use radio_core::test_utils::rig::SimRig;
use radio_core::{BootOutcome, RadioConfig, SleepOutcome, VERSION};
use radio_tests::fixtures::normal_block;

fn main() {
    println!("📻 radio-core {} session simulation", VERSION);

    let rig = SimRig::new(normal_block());
    let config = RadioConfig {
        breath_cycles: 2,
        ..RadioConfig::default()
    };
    let mut seq = rig.sequencer(config);

    match seq.boot() {
        Ok(BootOutcome::Ready) => println!("[{:>6} ms] receiver ready", rig.clock.now_ms()),
        Ok(other) => {
            println!("[{:>6} ms] boot stopped: {:?}", rig.clock.now_ms(), other);
            return;
        }
        Err(err) => {
            println!("boot failed: {}", err);
            return;
        }
    }

    if let Err(err) = seq.breathe() {
        println!("breathing failed: {}", err);
        return;
    }
    println!("[{:>6} ms] breathing done, going to sleep", rig.clock.now_ms());

    // Two scans, a save, then a very-long press that is never confirmed
    let start = rig.clock.now_ms();
    let script = [(5_000, 150), (9_000, 150), (14_000, 2_600), (20_000, 4_300)];
    for (offset, hold) in script {
        rig.button.press(start + offset, hold);
    }

    for _ in 0..script.len() {
        match seq.sleep_cycle() {
            Ok(SleepOutcome::Pressed(action)) => {
                println!("[{:>6} ms] {:?}", rig.clock.now_ms(), action)
            }
            Ok(outcome) => println!("[{:>6} ms] {:?}", rig.clock.now_ms(), outcome),
            Err(err) => println!("[{:>6} ms] wake failed: {}", rig.clock.now_ms(), err),
        }
    }

    let status = seq.receiver().status();
    println!("final receiver status: {:?}", status);
    println!("bus writes: {}", rig.chip.writes().len());
    println!("eeprom bytes written: {}", rig.eeprom.written_offsets().len());
    println!("✅ session complete");
}
