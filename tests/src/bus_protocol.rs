//! Register bus traffic checked transaction by transaction

use crate::fixtures::{normal_block, words};
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use radio_core::consts::RECEIVER_ADDRESS;
use radio_core::test_utils::power::SimPower;
use radio_core::test_utils::time::SimClock;
use radio_core::{Band, Duration, ParameterBlock, RadioError, Receiver, Register, ShadowRegisters, Spacing};

#[test]
fn power_up_transactions() {
    let expectations = [
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0, 0, 0, 0, 0, 0x8100])),
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0x0001])),
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0x0001, 0, 0, 0x0015])),
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0x0001, 0x8064])),
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0x6001, 0x0064])),
    ];
    let clock = SimClock::new();
    let mut power = SimPower::new(clock.clone());
    let mut receiver = Receiver::new(I2cMock::new(&expectations), RECEIVER_ADDRESS);

    receiver
        .power_up(&normal_block(), &mut power, &mut clock.clone())
        .unwrap();

    assert_eq!(clock.now_ms(), 1 + 600 + 110 + 100);
    let mut bus = receiver.release();
    bus.done();
}

#[test]
fn power_up_with_de_emphasis_and_japan_band() {
    let params = ParameterBlock::new(Band::Japan, true, Spacing::Khz50, 0x0123, 12);
    let sys_config2 = (2 << 6) | (2 << 4) | 12;
    let expectations = [
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0, 0, 0, 0, 0, 0x8100])),
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0x0001])),
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0x0001, 0, 0x0800, sys_config2])),
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0x0001, 0x8123])),
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0x6001, 0x0123])),
    ];
    let clock = SimClock::new();
    let mut power = SimPower::new(clock.clone());
    let mut receiver = Receiver::new(I2cMock::new(&expectations), RECEIVER_ADDRESS);

    receiver.power_up(&params, &mut power, &mut clock.clone()).unwrap();

    let mut bus = receiver.release();
    bus.done();
}

#[test]
fn read_all_consumes_wrapped_frame() {
    // 0xA..=0xF first, then 0x0..=0x9
    let frame: Vec<u16> = (0..16u16).map(|i| 0x1100 + (0xA + i) % 16).collect();
    let expectations = [I2cTransaction::read(RECEIVER_ADDRESS, words(&frame))];
    let mut bus = I2cMock::new(&expectations);
    let mut shadow = ShadowRegisters::new(RECEIVER_ADDRESS);

    shadow.read_all(&mut bus).unwrap();

    for register in Register::ALL {
        assert_eq!(shadow.get(register), 0x1100 + register.address() as u16);
    }
    bus.done();
}

#[test]
fn tune_direct_transactions() {
    let expectations = [
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0, 0x8000 | 205])),
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0, 205])),
    ];
    let mut clock = SimClock::new();
    let mut receiver = Receiver::new(I2cMock::new(&expectations), RECEIVER_ADDRESS);

    receiver
        .tune_direct(205, Duration::from_millis(160), &mut clock)
        .unwrap();

    assert_eq!(clock.now_ms(), 160);
    let mut bus = receiver.release();
    bus.done();
}

#[test]
fn nack_stops_power_up_and_marks_stale() {
    let nack = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);
    let expectations = [
        I2cTransaction::write(RECEIVER_ADDRESS, words(&[0, 0, 0, 0, 0, 0x8100])).with_error(nack),
    ];
    let clock = SimClock::new();
    let mut power = SimPower::new(clock.clone());
    let mut receiver = Receiver::new(I2cMock::new(&expectations), RECEIVER_ADDRESS);

    let result = receiver.power_up(&normal_block(), &mut power, &mut clock.clone());

    assert_eq!(result, Err(RadioError::Bus(nack)));
    assert!(receiver.shadow().is_stale());
    let mut bus = receiver.release();
    bus.done();
}
