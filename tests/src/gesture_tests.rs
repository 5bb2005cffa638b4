//! Press classification at the tier boundaries, driven through the sequencer

use crate::fixtures::{block_on, normal_block};
use radio_core::test_utils::indicator::IndicatorEvent;
use radio_core::test_utils::rig::{SimHal, SimRig};
use radio_core::{
    top_channel, Band, GestureAction, ParameterBlock, RadioConfig, Sequencer, SleepOutcome, Spacing,
};
use rstest::rstest;

/// Booted rig plus the time the next press should start
fn booted(block: ParameterBlock, config: RadioConfig) -> (SimRig, Sequencer<SimHal>, u64) {
    let rig = SimRig::new(block);
    let mut seq = rig.sequencer(config);
    seq.boot().unwrap();
    let press_at = rig.clock.now_ms() + 1_000;
    (rig, seq, press_at)
}

fn press_once(block: ParameterBlock, config: RadioConfig, hold_ms: u64) -> GestureAction {
    let (rig, mut seq, at) = booted(block, config);
    rig.button.press(at, hold_ms);
    match seq.sleep_cycle().unwrap() {
        SleepOutcome::Pressed(action) => action,
        other => panic!("expected a press, got {:?}", other),
    }
}

// Holds include the 50 ms debounce before timing starts
#[rstest]
#[case::tap(120, GestureAction::Tuned(101))]
#[case::just_short(50 + 1_999, GestureAction::Tuned(101))]
#[case::just_long(50 + 2_000, GestureAction::Saved(100))]
#[case::long(50 + 3_000, GestureAction::Saved(100))]
#[case::just_under_very_long(50 + 3_999, GestureAction::Saved(100))]
#[case::very_long_unconfirmed(50 + 4_000, GestureAction::ResetAborted)]
fn three_tier_boundaries(#[case] hold_ms: u64, #[case] expected: GestureAction) {
    assert_eq!(
        press_once(normal_block(), RadioConfig::default(), hold_ms),
        expected
    );
}

#[rstest]
#[case::just_short(50 + 1_999, GestureAction::Tuned(101))]
#[case::on_expiry_tick(50 + 2_000, GestureAction::Saved(100))]
#[case::held_far_past(50 + 9_000, GestureAction::Saved(100))]
fn two_tier_boundaries(#[case] hold_ms: u64, #[case] expected: GestureAction) {
    let config = RadioConfig::default().two_tier();
    assert_eq!(press_once(normal_block(), config, hold_ms), expected);
}

#[test]
fn long_threshold_lights_led_while_held() {
    let (rig, mut seq, at) = booted(normal_block(), RadioConfig::default());
    rig.button.press(at, 3_000);
    rig.led.clear();

    assert_eq!(
        seq.sleep_cycle().unwrap(),
        SleepOutcome::Pressed(GestureAction::Saved(100))
    );

    let events = rig.led.events();
    // Drive back on at wake, off on the leading edge, full on at the long threshold
    assert_eq!(
        &events[1..3],
        &[
            (at, IndicatorEvent::Drive(true)),
            (at, IndicatorEvent::Brightness(0)),
        ]
    );
    assert!(events.contains(&(at + 50 + 2_000, IndicatorEvent::Brightness(u8::MAX))));
}

#[test]
fn save_flash_precedes_write() {
    let (rig, mut seq, at) = booted(block_on(64), RadioConfig::default().two_tier());
    rig.button.press(at, 2_500);
    rig.eeprom.clear_log();

    seq.sleep_cycle().unwrap();

    let flash_end = rig
        .led
        .events()
        .iter()
        .filter(|(_, event)| *event == IndicatorEvent::Brightness(0))
        .map(|(t, _)| *t)
        .last()
        .unwrap();
    // Held until expiry at +2050, then 500 ms of light before anything is written
    assert_eq!(flash_end, at + 50 + 2_000 + 500);
    assert_eq!(rig.eeprom.written_offsets(), vec![3, 4, 14, 15]);
}

#[rstest]
#[case::wide(Band::Wide, Spacing::Khz100)]
#[case::wide_fine(Band::Wide, Spacing::Khz50)]
#[case::japan(Band::Japan, Spacing::Khz100)]
#[case::japan_wide(Band::JapanWide, Spacing::Khz200)]
fn short_press_wraps_at_top_of_band(#[case] band: Band, #[case] spacing: Spacing) {
    let top = top_channel(band, spacing);
    let block = ParameterBlock::new(band, false, spacing, top, 5);

    assert_eq!(
        press_once(block, RadioConfig::default(), 100),
        GestureAction::Tuned(0)
    );
}

#[test]
fn repeated_short_presses_step_through_channels() {
    let (rig, mut seq, at) = booted(block_on(10), RadioConfig::default());
    for i in 0..5 {
        rig.button.press(at + i * 2_000, 100);
    }

    let actions: Vec<_> = (0..5).map(|_| seq.sleep_cycle().unwrap()).collect();

    let tuned: Vec<_> = actions
        .iter()
        .map(|outcome| match outcome {
            SleepOutcome::Pressed(GestureAction::Tuned(channel)) => *channel,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(tuned, vec![11, 12, 13, 14, 15]);
    // Nothing persisted by scanning
    assert_eq!(seq.store().load_working().unwrap().channel(), 10);
}

#[test]
fn very_long_confirmation_window_expires() {
    let (rig, mut seq, at) = booted(block_on(20), RadioConfig::default());
    seq.store().save_channel(90).unwrap();
    rig.button.press(at, 4_300);
    // Second press lands after the ten second window
    rig.button.press(at + 4_300 + 50 + 10_500, 2_500);

    assert_eq!(
        seq.sleep_cycle().unwrap(),
        SleepOutcome::Pressed(GestureAction::ResetAborted)
    );
    assert_eq!(seq.store().load_working().unwrap().channel(), 90);
    assert!(rig.led.pwm_pulses() > 0);
}
