//! Receiver chip driver built on the shadow registers

use embedded_hal::i2c::I2c;

use crate::config::consts;
use crate::hal::{Clock, Duration, PowerControl};
use crate::params::ParameterBlock;
use crate::registers::{bits, Register, ShadowRegisters};
use crate::types::RadioError;

/// Decoded STATUSRSSI / READCHAN
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReceiverStatus {
    pub rssi: u8,
    /// Seek/tune complete
    pub tune_complete: bool,
    pub stereo: bool,
    pub channel: u16,
}

impl ReceiverStatus {
    pub fn decode(status_rssi: u16, read_chan: u16) -> Self {
        Self {
            rssi: (status_rssi & bits::RSSI_MASK) as u8,
            tune_complete: status_rssi & bits::STC != 0,
            stereo: status_rssi & bits::STEREO != 0,
            channel: read_chan & bits::READCHAN_MASK,
        }
    }
}

/// FM receiver on a two-wire bus
pub struct Receiver<B> {
    bus: B,
    shadow: ShadowRegisters,
}

impl<B: I2c> Receiver<B> {
    pub fn new(bus: B, address: u8) -> Self {
        Self {
            bus,
            shadow: ShadowRegisters::new(address),
        }
    }

    pub fn shadow(&self) -> &ShadowRegisters {
        &self.shadow
    }

    pub fn release(self) -> B {
        self.bus
    }

    /// Bring the chip out of reset and tune it from `params`.
    ///
    /// The order and the waits are the chip's power-up contract; audio stays
    /// muted until the tune has settled.
    pub fn power_up<P, C>(
        &mut self,
        params: &ParameterBlock,
        power: &mut P,
        clock: &mut C,
    ) -> Result<(), RadioError>
    where
        P: PowerControl,
        C: Clock,
    {
        power.set_receiver_reset(false)?;
        clock.delay_ms(consts::RESET_RELEASE_MS);

        self.shadow.set(Register::Test1, bits::XOSC_ENABLE);
        self.shadow.write_through(&mut self.bus, Register::Test1)?;
        clock.delay_ms(consts::OSCILLATOR_SETTLE_MS);

        // Powered but muted
        self.shadow.set(Register::PowerConfig, bits::ENABLE);
        self.shadow.write_through(&mut self.bus, Register::PowerConfig)?;
        clock.delay_ms(consts::POWER_UP_SETTLE_MS);

        // Must be its own write ahead of the tune, batched there is no audio
        self.apply_parameters(params)?;

        let channel = params.channel() & bits::CHANNEL_MASK;
        self.shadow.set(Register::Channel, bits::TUNE | channel);
        self.shadow.write_through(&mut self.bus, Register::Channel)?;
        clock.delay_ms(consts::INIT_TUNE_SETTLE_MS);

        // Unmute goes out with the TUNE clear
        self.shadow
            .set(Register::PowerConfig, bits::DMUTE | bits::MONO | bits::ENABLE);
        self.shadow.set(Register::Channel, channel);
        self.shadow.write_through(&mut self.bus, Register::Channel)?;

        info!("receiver up on channel {}", channel);
        Ok(())
    }

    /// Load de-emphasis, band, spacing and volume and write through SYSCONFIG2
    pub fn apply_parameters(&mut self, params: &ParameterBlock) -> Result<(), RadioError> {
        let de = if params.de_emphasis() { bits::DE } else { 0 };
        self.shadow
            .modify(Register::SysConfig1, |value| (value & !bits::DE) | de);

        let sys_config2 = ((params.band().bits() as u16) << bits::BAND_SHIFT)
            | ((params.spacing().bits() as u16) << bits::SPACE_SHIFT)
            | (params.volume() as u16 & bits::VOLUME_MASK);
        self.shadow.set(Register::SysConfig2, sys_config2);
        self.shadow.write_through(&mut self.bus, Register::SysConfig2)
    }

    /// Tune to `channel` without touching the stored parameters.
    ///
    /// TUNE is cleared again afterwards so the next tune can start.
    pub fn tune_direct<C: Clock>(
        &mut self,
        channel: u16,
        settle: Duration,
        clock: &mut C,
    ) -> Result<(), RadioError> {
        let channel = channel & bits::CHANNEL_MASK;
        self.shadow.set(Register::Channel, bits::TUNE | channel);
        self.shadow.write_through(&mut self.bus, Register::Channel)?;
        clock.delay(settle);

        self.shadow.set(Register::Channel, channel);
        self.shadow.write_through(&mut self.bus, Register::Channel)?;
        debug!("tuned to channel {}", channel);
        Ok(())
    }

    /// Channel currently held in the shadow
    pub fn current_channel(&self) -> u16 {
        self.shadow.get(Register::Channel) & bits::CHANNEL_MASK
    }

    /// Read the chip back and decode its status registers
    pub fn status(&mut self) -> Result<ReceiverStatus, RadioError> {
        self.shadow.read_all(&mut self.bus)?;
        Ok(ReceiverStatus::decode(
            self.shadow.get(Register::StatusRssi),
            self.shadow.get(Register::ReadChan),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::RECEIVER_ADDRESS;
    use crate::test_utils::bus::SimReceiver;
    use crate::test_utils::power::SimPower;
    use crate::test_utils::time::SimClock;
    use crate::types::{Band, Spacing};

    #[test]
    fn test_power_up_sequence() {
        let clock = SimClock::new();
        let chip = SimReceiver::with_clock(clock.clone());
        let mut power = SimPower::new(clock.clone());
        let mut receiver = Receiver::new(chip.bus(), RECEIVER_ADDRESS);
        let params = ParameterBlock::new(Band::Wide, true, Spacing::Khz100, 100, 5);
        let mut clk = clock.clone();

        receiver.power_up(&params, &mut power, &mut clk).unwrap();

        let writes = chip.timed_writes();
        let lengths: std::vec::Vec<usize> = writes.iter().map(|(_, w)| w.len()).collect();
        // Through 0x7, 0x2, 0x5, 0x3, 0x3
        assert_eq!(lengths, vec![6, 1, 4, 2, 2]);
        let times: std::vec::Vec<u64> = writes.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![1, 601, 711, 711, 811]);

        assert_eq!(writes[0].1[5], 0x8100);
        assert_eq!(writes[1].1, vec![0x0001]);
        assert_eq!(writes[2].1[2], 0x0800);
        assert_eq!(writes[2].1[3], (1 << 4) | 5);
        assert_eq!(writes[3].1, vec![0x0001, 0x8000 | 100]);
        assert_eq!(writes[4].1, vec![0x6001, 100]);
        assert_eq!(power.reset_log(), vec![(0, false)]);
        assert_eq!(receiver.current_channel(), 100);
    }

    #[test]
    fn test_tune_direct_uses_channel() {
        let clock = SimClock::new();
        let chip = SimReceiver::with_clock(clock.clone());
        let mut receiver = Receiver::new(chip.bus(), RECEIVER_ADDRESS);
        let mut clk = clock.clone();

        receiver
            .tune_direct(0x1ff + 3, Duration::from_millis(160), &mut clk)
            .unwrap();

        let writes = chip.timed_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], (0, vec![0, 0x8000 | 0x202]));
        assert_eq!(writes[1], (160, vec![0, 0x202]));
        assert_eq!(receiver.current_channel(), 0x202);
    }

    #[test]
    fn test_apply_parameters_clears_de_emphasis() {
        let chip = SimReceiver::new();
        let mut receiver = Receiver::new(chip.bus(), RECEIVER_ADDRESS);
        receiver
            .apply_parameters(&ParameterBlock::new(Band::Japan, true, Spacing::Khz50, 0, 15))
            .unwrap();
        receiver
            .apply_parameters(&ParameterBlock::new(Band::Japan, false, Spacing::Khz50, 0, 15))
            .unwrap();

        assert_eq!(chip.peek(Register::SysConfig1) & bits::DE, 0);
        assert_eq!(chip.peek(Register::SysConfig2), (2 << 6) | (2 << 4) | 15);
    }

    #[test]
    fn test_status_decodes_readback() {
        let chip = SimReceiver::new();
        chip.poke(Register::StatusRssi, bits::STC | bits::STEREO | 0x2A);
        chip.poke(Register::ReadChan, 0xFC00 | 101);
        let mut receiver = Receiver::new(chip.bus(), RECEIVER_ADDRESS);

        let status = receiver.status().unwrap();

        assert_eq!(
            status,
            ReceiverStatus {
                rssi: 0x2A,
                tune_complete: true,
                stereo: true,
                channel: 101,
            }
        );
    }
}
