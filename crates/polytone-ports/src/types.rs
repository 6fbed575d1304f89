use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of MIDI channels tracked per processor.
pub const MIDI_CHANNELS: usize = 16;
/// Number of note numbers per MIDI channel.
pub const MIDI_NOTES: usize = 128;
/// Pitch classes per octave, as addressed by MTS octave tunings.
pub const PITCH_CLASSES: usize = 12;

pub type SampleRateHz = u32;

/// Out-of-range channel numbers pin to the last channel.
pub fn clamp_channel(channel: u8) -> u8 {
    channel.min(MIDI_CHANNELS as u8 - 1)
}

/// Out-of-range note, controller and data values pin to 127.
pub fn clamp_data(value: u8) -> u8 {
    value.min(0x7f)
}
pub type VoiceIndex = usize;

/// A (channel, note) pair, clamped into the 4/7-bit MIDI ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteKey {
    pub channel: u8,
    pub note: u8,
}

impl NoteKey {
    pub fn new(channel: u8, note: u8) -> Self {
        Self {
            channel: clamp_channel(channel),
            note: clamp_data(note),
        }
    }

    pub fn slot(self) -> usize {
        self.channel as usize * MIDI_NOTES + self.note as usize
    }
}

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.channel + 1, self.note)
    }
}
