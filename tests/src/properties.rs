//! Property tests over parameter storage, scanning and packet integrity

use crate::fixtures::{block_on, normal_block};
use proptest::prelude::*;
use radio_core::params::crc16;
use radio_core::test_utils::eeprom::MemoryEeprom;
use radio_core::test_utils::rig::SimRig;
use radio_core::{
    next_channel, top_channel, Band, ParameterBlock, ParameterStore, PacketOutcome,
    ProgrammingPacket, RadioConfig, Spacing,
};

fn band() -> impl Strategy<Value = Band> {
    prop_oneof![Just(Band::Wide), Just(Band::JapanWide), Just(Band::Japan)]
}

fn spacing() -> impl Strategy<Value = Spacing> {
    prop_oneof![Just(Spacing::Khz200), Just(Spacing::Khz100), Just(Spacing::Khz50)]
}

proptest! {
    #[test]
    fn saved_channel_reloads_with_valid_crc(
        band in band(),
        spacing in spacing(),
        de in any::<bool>(),
        volume in 0u8..16,
        start in 0u16..1024,
        saved in 0u16..1024,
    ) {
        let block = ParameterBlock::new(band, de, spacing, start, volume);
        let eeprom = MemoryEeprom::provisioned(&block);
        let mut store = ParameterStore::new(eeprom.clone());

        store.save_channel(saved).unwrap();
        let loaded = store.load_working().unwrap();

        prop_assert_eq!(loaded.channel(), saved);
        prop_assert_eq!(loaded.band(), band);
        prop_assert_eq!(loaded.volume(), volume);
        prop_assert_eq!(crc16(loaded.as_bytes()), 0);
        // Factory area untouched
        prop_assert_eq!(eeprom.bytes(16..32), block.as_bytes().to_vec());
    }

    #[test]
    fn scanning_never_leaves_band(
        band in band(),
        spacing in spacing(),
        start in 0u16..1024,
        steps in 1usize..600,
    ) {
        let top = top_channel(band, spacing);
        let mut channel = start;
        for _ in 0..steps {
            channel = next_channel(channel, band, spacing);
            prop_assert!(channel <= top);
        }
    }

    #[test]
    fn any_corrupted_bit_rejects_working_block(
        byte in 0usize..16,
        bit in 0u8..8,
    ) {
        let eeprom = MemoryEeprom::provisioned(&normal_block());
        eeprom.corrupt(byte, 1 << bit);
        let mut store = ParameterStore::new(eeprom);

        prop_assert!(store.load_working().is_err());
    }

    #[test]
    fn corrupted_packet_never_reaches_storage(
        channel in 0u16..1024,
        byte in 0usize..4,
        bit in 0u8..8,
    ) {
        let rig = SimRig::new(block_on(7));
        rig.supply.set_millivolts(5_000);
        let mut seq = rig.sequencer(RadioConfig::default());
        seq.boot().unwrap();

        let mut bytes = *ProgrammingPacket::new(channel).as_bytes();
        bytes[byte] ^= 1 << bit;
        rig.link.push(&bytes);

        prop_assert_eq!(seq.programming_step().unwrap(), PacketOutcome::Rejected);
        prop_assert!(rig.eeprom.written_offsets().is_empty());
        prop_assert_eq!(seq.store().load_working().unwrap().channel(), 7);
    }

    #[test]
    fn factory_restore_recovers_any_working_damage(
        garbage in proptest::collection::vec(any::<u8>(), 16),
    ) {
        let factory = block_on(42);
        let eeprom = MemoryEeprom::provisioned(&factory);
        for (offset, byte) in garbage.iter().enumerate() {
            eeprom.corrupt(offset, *byte);
        }
        let mut store = ParameterStore::new(eeprom.clone());

        store.restore_factory_defaults().unwrap();

        prop_assert_eq!(eeprom.bytes(0..16), eeprom.bytes(16..32));
        prop_assert_eq!(store.load_working().unwrap(), factory);
    }

    #[test]
    fn debounce_swallows_short_flicker(
        flickers in proptest::collection::vec((1u64..20, 1u64..10), 1..4),
    ) {
        let rig = SimRig::new(normal_block());
        let config = RadioConfig { breath_cycles: 1, ..RadioConfig::default() };
        let mut seq = rig.sequencer(config);
        seq.boot().unwrap();
        rig.chip.clear_writes();

        // Bounces packed inside one 50 ms window after the first edge
        let edge = rig.clock.now_ms() + 200;
        let mut at = edge;
        for (gap, hold) in flickers {
            rig.button.press(at, hold);
            at = (at + hold + gap).min(edge + 40);
        }

        seq.breathe().unwrap();

        let channel = seq.receiver().current_channel();
        prop_assert!(channel == 100 || channel == 101);
        prop_assert!(rig.chip.writes().len() <= 2);
    }
}
