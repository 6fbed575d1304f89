use crate::mts::{ChannelMask, OctaveTuning};
use polytone_ports::types::{clamp_channel, clamp_data, MIDI_CHANNELS, PITCH_CLASSES};
use serde::Serialize;

/// RPN latch value meaning "no parameter selected".
pub const RPN_NULL: u8 = 0x7f;
pub const DEFAULT_BEND_RANGE: f32 = 2.0;

const RPN_BEND_RANGE: (u8, u8) = (0, 0);
const RPN_FINE_TUNING: (u8, u8) = (0, 1);
const RPN_COARSE_TUNING: (u8, u8) = (0, 2);

/// What applying the latched RPN data changed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RpnEffect {
    /// Unknown or null RPN.
    None,
    BendRange(f32),
    /// Master tuning changed; sounding notes need new frequencies.
    Retuned(f32),
}

/// Tuning and controller protocol state of one MIDI channel.
///
/// All pitch quantities are in semitones.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChannelState {
    pub bend: f32,
    pub bend_range: f32,
    pub coarse: f32,
    pub fine: f32,
    /// `coarse + fine`
    pub tune: f32,
    pub pitch_classes: [f32; PITCH_CLASSES],
    rpn_msb: u8,
    rpn_lsb: u8,
    data_msb: u8,
    data_lsb: u8,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            bend: 0.0,
            bend_range: DEFAULT_BEND_RANGE,
            coarse: 0.0,
            fine: 0.0,
            tune: 0.0,
            pitch_classes: [0.0; PITCH_CLASSES],
            rpn_msb: RPN_NULL,
            rpn_lsb: RPN_NULL,
            data_msb: 0,
            data_lsb: 0,
        }
    }
}

impl ChannelState {
    pub fn rpn(&self) -> (u8, u8) {
        (self.rpn_msb, self.rpn_lsb)
    }

    pub fn data(&self) -> (u8, u8) {
        (self.data_msb, self.data_lsb)
    }

    pub fn set_rpn_msb(&mut self, value: u8) {
        self.rpn_msb = clamp_data(value);
    }

    pub fn set_rpn_lsb(&mut self, value: u8) {
        self.rpn_lsb = clamp_data(value);
    }

    pub fn set_data_msb(&mut self, value: u8) {
        self.data_msb = clamp_data(value);
    }

    pub fn set_data_lsb(&mut self, value: u8) {
        self.data_lsb = clamp_data(value);
    }

    /// Data increment (CC96). Coarse tuning steps the MSB, everything else
    /// the LSB.
    pub fn increment_data(&mut self) {
        let target = self.step_target();
        if *target < 0x7f {
            *target += 1;
        }
    }

    /// Data decrement (CC97), same targeting as [`Self::increment_data`].
    pub fn decrement_data(&mut self) {
        let target = self.step_target();
        if *target > 0 {
            *target -= 1;
        }
    }

    fn step_target(&mut self) -> &mut u8 {
        if self.rpn() == RPN_COARSE_TUNING {
            &mut self.data_msb
        } else {
            &mut self.data_lsb
        }
    }

    /// Applies the latched data entry to the selected RPN.
    pub fn apply_rpn(&mut self) -> RpnEffect {
        match self.rpn() {
            RPN_BEND_RANGE => {
                self.bend_range = self.data_msb as f32 + self.data_lsb as f32 / 100.0;
                log::debug!("pitch bend range: {} cent", self.bend_range * 100.0);
                RpnEffect::BendRange(self.bend_range)
            }
            RPN_FINE_TUNING => {
                let value = ((self.data_msb as u16) << 7) | self.data_lsb as u16;
                self.fine = (value as f32 - 8192.0) / 8192.0;
                self.retune()
            }
            RPN_COARSE_TUNING => {
                self.coarse = self.data_msb as f32 - 64.0;
                self.retune()
            }
            _ => RpnEffect::None,
        }
    }

    fn retune(&mut self) -> RpnEffect {
        self.tune = self.coarse + self.fine;
        log::debug!("master tuning: {} cent", self.tune * 100.0);
        RpnEffect::Retuned(self.tune)
    }

    /// All-controllers-off: only the RPN and data entry latches are reset.
    pub fn reset_controllers(&mut self) {
        self.rpn_msb = RPN_NULL;
        self.rpn_lsb = RPN_NULL;
        self.data_msb = 0;
        self.data_lsb = 0;
    }

    /// Sets the bend from a 14-bit pitch wheel value (center 0x2000).
    pub fn set_pitch_bend(&mut self, value: u16) {
        let value = value.min(0x3fff);
        self.bend = (value as f32 - 8192.0) / 8192.0 * self.bend_range;
    }

    pub fn reset_bend(&mut self) {
        self.bend = 0.0;
    }

    /// Effective pitch of `note` in (fractional) MIDI note numbers.
    pub fn pitch(&self, note: u8) -> f32 {
        let note = clamp_data(note);
        note as f32 + self.tune + self.pitch_classes[note as usize % PITCH_CLASSES] + self.bend
    }

    pub fn frequency(&self, note: u8) -> f32 {
        440.0 * 2.0_f32.powf((self.pitch(note) - 69.0) / 12.0)
    }
}

/// Channel state for all sixteen MIDI channels.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ChannelBank {
    channels: [ChannelState; MIDI_CHANNELS],
}

impl ChannelBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, channel: u8) -> &ChannelState {
        &self.channels[clamp_channel(channel) as usize]
    }

    pub fn channel_mut(&mut self, channel: u8) -> &mut ChannelState {
        &mut self.channels[clamp_channel(channel) as usize]
    }

    pub fn frequency(&self, channel: u8, note: u8) -> f32 {
        self.channel(channel).frequency(note)
    }

    pub fn reset_bends(&mut self) {
        for state in &mut self.channels {
            state.reset_bend();
        }
    }

    /// Writes the pitch class offsets into every selected channel and returns
    /// the selection.
    pub fn apply_octave_tuning(&mut self, tuning: &OctaveTuning) -> ChannelMask {
        for ch in tuning.channels.channels() {
            self.channels[ch as usize].pitch_classes = tuning.offsets;
        }
        tuning.channels
    }

    /// Back to equal temperament on every channel. Master tuning is kept.
    pub fn clear_pitch_classes(&mut self) {
        for state in &mut self.channels {
            state.pitch_classes = [0.0; PITCH_CLASSES];
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelState> {
        self.channels.iter()
    }
}
