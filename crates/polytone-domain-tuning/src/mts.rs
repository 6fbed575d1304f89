use polytone_ports::types::{clamp_channel, MIDI_CHANNELS, PITCH_CLASSES};
use serde::{Deserialize, Serialize};

pub const SYSEX_START: u8 = 0xf0;
pub const SYSEX_END: u8 = 0xf7;

const UNIVERSAL_NON_REALTIME: u8 = 0x7e;
const UNIVERSAL_REALTIME: u8 = 0x7f;
const SUB_ID_TUNING: u8 = 0x08;
const OCTAVE_ONE_BYTE: u8 = 0x08;
const OCTAVE_TWO_BYTE: u8 = 0x09;

// Unframed payload sizes: id, device, sub-id, format, 3 mask bytes, data.
const ONE_BYTE_LEN: usize = 7 + PITCH_CLASSES;
const TWO_BYTE_LEN: usize = 7 + 2 * PITCH_CLASSES;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MtsError {
    #[error("not a sysex message")]
    NotSysex,
    #[error("message too short ({0} bytes)")]
    Truncated(usize),
    #[error("not a universal sysex message (id {0:#04x})")]
    NotUniversal(u8),
    #[error("not a tuning message (sub-id {0:#04x})")]
    NotTuning(u8),
    #[error("unsupported tuning format {0:#04x}")]
    UnsupportedFormat(u8),
    #[error("bad length {len} for tuning format {format:#04x}")]
    BadLength { format: u8, len: usize },
}

/// MTS channel selection, bit `i` selects MIDI channel `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMask(pub u16);

impl ChannelMask {
    pub const ALL: ChannelMask = ChannelMask(0xffff);
    pub const NONE: ChannelMask = ChannelMask(0);

    pub fn single(channel: u8) -> Self {
        Self(1 << clamp_channel(channel))
    }

    pub fn contains(self, channel: u8) -> bool {
        channel < MIDI_CHANNELS as u8 && self.0 & (1 << channel) != 0
    }

    pub fn channels(self) -> impl Iterator<Item = u8> {
        (0..MIDI_CHANNELS as u8).filter(move |&ch| self.contains(ch))
    }

    fn from_bytes(hi: u8, mid: u8, lo: u8) -> Self {
        let bits = ((hi as u32 & 0x7f) << 14) | ((mid as u32 & 0x7f) << 7) | (lo as u32 & 0x7f);
        Self((bits & 0xffff) as u16)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OctaveFormat {
    /// One byte per pitch class, 1 cent resolution.
    OneByte,
    /// 14 bits per pitch class, ±1 semitone range.
    TwoByte,
}

/// A decoded scale/octave tuning message.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OctaveTuning {
    pub realtime: bool,
    pub format: OctaveFormat,
    pub channels: ChannelMask,
    /// Offset per pitch class, in semitones.
    pub offsets: [f32; PITCH_CLASSES],
}

/// Decodes a live MTS octave tuning message. The F0/F7 framing is optional.
pub fn parse_octave_tuning(data: &[u8]) -> Result<OctaveTuning, MtsError> {
    let body = strip_framing(data);
    if body.len() < 4 {
        return Err(MtsError::Truncated(body.len()));
    }

    let realtime = match body[0] {
        UNIVERSAL_REALTIME => true,
        UNIVERSAL_NON_REALTIME => false,
        other => return Err(MtsError::NotUniversal(other)),
    };
    if body[2] != SUB_ID_TUNING {
        return Err(MtsError::NotTuning(body[2]));
    }

    let format = body[3];
    let (format_kind, expected_len) = match format {
        OCTAVE_ONE_BYTE => (OctaveFormat::OneByte, ONE_BYTE_LEN),
        OCTAVE_TWO_BYTE => (OctaveFormat::TwoByte, TWO_BYTE_LEN),
        other => return Err(MtsError::UnsupportedFormat(other)),
    };
    if body.len() != expected_len {
        return Err(MtsError::BadLength {
            format,
            len: body.len(),
        });
    }

    let channels = ChannelMask::from_bytes(body[4], body[5], body[6]);
    let data = &body[7..];
    let mut offsets = [0.0; PITCH_CLASSES];
    for (pc, offset) in offsets.iter_mut().enumerate() {
        *offset = match format_kind {
            OctaveFormat::OneByte => ((data[pc] & 0x7f) as f32 - 64.0) / 100.0,
            OctaveFormat::TwoByte => {
                let value = ((data[2 * pc] as u16 & 0x7f) << 7) | (data[2 * pc + 1] as u16 & 0x7f);
                (value as f32 - 8192.0) / 8192.0
            }
        };
    }

    Ok(OctaveTuning {
        realtime,
        format: format_kind,
        channels,
        offsets,
    })
}

/// Validates the contents of a tuning bank file: a complete F0 … F7 message
/// holding a 1- or 2-byte octave tuning.
pub fn parse_bank_file(data: &[u8]) -> Result<OctaveTuning, MtsError> {
    if data.len() < 2 || data[0] != SYSEX_START || data[data.len() - 1] != SYSEX_END {
        return Err(MtsError::NotSysex);
    }
    parse_octave_tuning(data)
}

fn strip_framing(data: &[u8]) -> &[u8] {
    match data.split_first() {
        Some((&SYSEX_START, rest)) => match rest.split_last() {
            Some((&SYSEX_END, body)) => body,
            _ => rest,
        },
        _ => data,
    }
}
