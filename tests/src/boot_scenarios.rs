//! End-to-end boot and idle-loop scenarios on the simulated board

use crate::fixtures::{block_on, normal_block};
use radio_core::test_utils::indicator::IndicatorEvent;
use radio_core::test_utils::rig::SimRig;
use radio_core::{
    BootOutcome, GestureAction, HaltReason, OperatingMode, RadioConfig, Register, SleepOutcome,
};
use rstest::rstest;

#[rstest]
#[case::flat(2_000, BootOutcome::Halted(HaltReason::LowBattery))]
#[case::at_threshold(2_100, BootOutcome::Halted(HaltReason::LowBattery))]
#[case::weak(2_101, BootOutcome::Ready)]
#[case::fresh(3_600, BootOutcome::Ready)]
#[case::programmer(3_601, BootOutcome::Programming)]
#[case::usb(5_000, BootOutcome::Programming)]
fn boot_mode_follows_supply(#[case] millivolts: u16, #[case] expected: BootOutcome) {
    let rig = SimRig::new(normal_block());
    rig.supply.set_millivolts(millivolts);
    let mut seq = rig.sequencer(RadioConfig::default());

    assert_eq!(seq.boot().unwrap(), expected);

    let receiver_touched = !rig.chip.writes().is_empty();
    assert_eq!(receiver_touched, expected == BootOutcome::Ready);
}

#[test]
fn normal_boot_init_sequence() {
    let rig = SimRig::new(normal_block());
    let mut seq = rig.sequencer(RadioConfig::default());

    assert_eq!(seq.boot().unwrap(), BootOutcome::Ready);

    assert_eq!(
        rig.chip.write_bounds(),
        vec![
            Register::Test1,
            Register::PowerConfig,
            Register::SysConfig2,
            Register::Channel,
            Register::Channel,
        ]
    );
    let writes = rig.chip.writes();
    // Tune, then unmute with TUNE cleared
    assert_eq!(writes[3], vec![0x0001, 0x8000 | 100]);
    assert_eq!(writes[4], vec![0x6001, 100]);
    // Nothing past 0x7 is ever sent
    assert!(writes.iter().all(|w| w.len() <= 6));
    assert_eq!(rig.chip.peek(Register::Test2), 0);
    assert_eq!(rig.chip.peek(Register::BootConfig), 0);
}

#[test]
fn normal_boot_releases_reset_before_first_write() {
    let rig = SimRig::new(normal_block());
    let mut seq = rig.sequencer(RadioConfig::default());
    seq.boot().unwrap();

    assert_eq!(rig.power.reset_log(), vec![(0, true), (0, false)]);
    let first_write = rig.chip.timed_writes()[0].0;
    assert!(first_write >= 1);
}

#[test]
fn bad_crc_blinks_and_never_inits_receiver() {
    let rig = SimRig::new(normal_block());
    rig.eeprom.corrupt(14, 0x01);
    let mut seq = rig.sequencer(RadioConfig::default());

    assert_eq!(
        seq.boot().unwrap(),
        BootOutcome::Halted(HaltReason::BadParameters)
    );

    assert!(rig.chip.writes().is_empty());
    assert_eq!(rig.chip.reads(), 0);
    assert_eq!(rig.power.reset_log(), vec![(0, true)]);

    let flashes: Vec<u64> = rig
        .led
        .events()
        .iter()
        .filter(|(_, event)| *event == IndicatorEvent::Direct(true))
        .map(|(at, _)| *at)
        .collect();
    // Three flashes per 1.63 s period, repeated past the two minute window
    assert_eq!(&flashes[..4], &[0, 210, 420, 1_630]);
    assert_eq!(flashes.len(), 74 * 3);
    // Working block left alone
    assert_eq!(rig.eeprom.written_offsets(), Vec::<u32>::new());
}

#[test]
fn short_then_long_press() {
    let rig = SimRig::new(block_on(50));
    let mut seq = rig.sequencer(RadioConfig::default());
    seq.boot().unwrap();

    let t = rig.clock.now_ms();
    rig.button.press(t + 1_000, 200);
    assert_eq!(
        seq.sleep_cycle().unwrap(),
        SleepOutcome::Pressed(GestureAction::Tuned(51))
    );
    assert_eq!(seq.receiver().current_channel(), 51);
    assert!(rig.eeprom.written_offsets().is_empty());

    let t = rig.clock.now_ms();
    rig.button.press(t + 5_000, 2_500);
    assert_eq!(
        seq.sleep_cycle().unwrap(),
        SleepOutcome::Pressed(GestureAction::Saved(51))
    );
    let block = seq.store().load_working().unwrap();
    assert_eq!(block.channel(), 51);
    assert!(block.is_valid());
    assert_eq!(rig.eeprom.written_offsets(), vec![3, 4, 14, 15]);
}

#[test]
fn press_during_breathing_then_sleep() {
    let rig = SimRig::new(normal_block());
    let config = RadioConfig {
        breath_cycles: 3,
        ..RadioConfig::default()
    };
    let mut seq = rig.sequencer(config);
    seq.boot().unwrap();
    let t = rig.clock.now_ms();
    rig.button.press(t + 1_000, 150);

    seq.breathe().unwrap();
    assert_eq!(seq.receiver().current_channel(), 101);

    assert_eq!(seq.sleep_cycle().unwrap(), SleepOutcome::Idle);
    assert_eq!(seq.mode(), OperatingMode::NormalSleeping);
    assert!(!rig.led.drive_enabled());
}

#[test]
fn failed_press_keeps_breathing() {
    let rig = SimRig::new(normal_block());
    let config = RadioConfig {
        breath_cycles: 10,
        ..RadioConfig::default()
    };
    let mut seq = rig.sequencer(config);
    seq.boot().unwrap();
    let start = rig.clock.now_ms();
    rig.chip.fail_next();
    rig.button.press(start + 200, 100);

    seq.breathe().unwrap();

    assert!(seq.receiver().shadow().is_stale());
    assert_eq!(seq.mode(), OperatingMode::NormalBreathing);
    // Press seen at +200, debounce and hold end at +300, then every ramp runs in full
    assert_eq!(rig.clock.now_ms() - start, 300 + 10 * 91 * 20);
}

#[test]
fn factory_reset_at_boot_recovers_corrupt_block() {
    let rig = SimRig::new(block_on(7));
    rig.eeprom.corrupt(0, 0xFF);
    rig.button.press(0, 3_000);
    let mut seq = rig.sequencer(RadioConfig::default());

    assert_eq!(seq.boot().unwrap(), BootOutcome::Ready);
    assert_eq!(rig.eeprom.bytes(0..16), rig.eeprom.bytes(16..32));
    assert_eq!(seq.receiver().current_channel(), 7);
}

#[test]
fn factory_reset_gesture_during_playback() {
    let rig = SimRig::new(block_on(20));
    let mut seq = rig.sequencer(RadioConfig::default());
    seq.boot().unwrap();
    seq.store().save_channel(90).unwrap();

    let t = rig.clock.now_ms();
    rig.button.press(t + 100, 4_200);
    rig.button.press(t + 7_000, 2_300);

    assert_eq!(
        seq.sleep_cycle().unwrap(),
        SleepOutcome::Pressed(GestureAction::FactoryRestored(20))
    );
    assert_eq!(seq.store().load_working().unwrap().channel(), 20);
    assert_eq!(seq.receiver().current_channel(), 20);
}

#[test]
fn programming_mode_session() {
    use radio_core::{PacketOutcome, ProgrammingPacket};

    let rig = SimRig::new(normal_block());
    rig.supply.set_millivolts(5_000);
    let mut seq = rig.sequencer(RadioConfig::default());
    assert_eq!(seq.boot().unwrap(), BootOutcome::Programming);

    let mut corrupted = *ProgrammingPacket::new(33).as_bytes();
    corrupted[3] ^= 0x80;
    rig.link.push(&corrupted);
    rig.link.push(ProgrammingPacket::new(33).as_bytes());

    assert_eq!(seq.programming_step().unwrap(), PacketOutcome::Rejected);
    assert_eq!(seq.programming_step().unwrap(), PacketOutcome::Accepted(33));
    assert_eq!(seq.store().load_working().unwrap().channel(), 33);
    assert_eq!(seq.mode(), OperatingMode::Programming);
}
