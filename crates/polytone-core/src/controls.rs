use polytone_ports::control::{ControlDescriptor, ControlKind};
use polytone_ports::types::{clamp_channel, MIDI_CHANNELS};
use polytone_ports::voice::{VoiceUnit, ZoneId, ZoneSpec};

pub const FREQ_LABEL: &str = "freq";
pub const GAIN_LABEL: &str = "gain";
pub const GATE_LABEL: &str = "gate";

/// Zones the allocator drives directly in instrument mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoiceControls {
    pub freq: Option<ZoneId>,
    pub gain: Option<ZoneId>,
    pub gate: Option<ZoneId>,
}

/// Ordered control descriptors plus the input/output views the processor
/// iterates every block.
#[derive(Clone, Debug)]
pub struct ControlTable {
    descriptors: Vec<ControlDescriptor>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    voice: VoiceControls,
    port_count: usize,
}

impl ControlTable {
    /// Builds the table from a unit's zone declarations. Ports are numbered
    /// in declaration order over every non-group control, skipping the first
    /// `freq`/`gain`/`gate` controls of an instrument.
    pub fn build(zones: &[ZoneSpec], instrument: bool) -> Self {
        let mut descriptors = Vec::with_capacity(zones.len());
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut voice = VoiceControls::default();
        let mut port_count = 0;

        for (index, spec) in zones.iter().enumerate() {
            let zone = ZoneId(index);
            let is_voice_control = instrument
                && spec.kind.is_input()
                && match spec.label.as_str() {
                    FREQ_LABEL => claim(&mut voice.freq, zone),
                    GAIN_LABEL => claim(&mut voice.gain, zone),
                    GATE_LABEL => claim(&mut voice.gate, zone),
                    _ => false,
                };

            let port = if spec.kind == ControlKind::Group || is_voice_control {
                None
            } else {
                port_count += 1;
                Some(port_count - 1)
            };

            if port.is_some() {
                if spec.kind.is_output() {
                    outputs.push(index);
                } else {
                    inputs.push(index);
                }
            }

            descriptors.push(ControlDescriptor {
                kind: spec.kind,
                label: spec.label.clone(),
                port,
                zone,
                init: spec.init,
                min: spec.min,
                max: spec.max,
                step: spec.step,
                midi_ctrls: midi_ctrl_hints(spec).collect(),
            });
        }

        Self {
            descriptors,
            inputs,
            outputs,
            voice,
            port_count,
        }
    }

    pub fn descriptors(&self) -> &[ControlDescriptor] {
        &self.descriptors
    }

    pub fn voice_controls(&self) -> VoiceControls {
        self.voice
    }

    pub fn port_count(&self) -> usize {
        self.port_count
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Exported input controls, indexed by input number.
    pub fn input(&self, input: usize) -> &ControlDescriptor {
        &self.descriptors[self.inputs[input]]
    }

    pub fn inputs(&self) -> impl Iterator<Item = &ControlDescriptor> {
        self.inputs.iter().map(|&i| &self.descriptors[i])
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ControlDescriptor> {
        self.outputs.iter().map(|&i| &self.descriptors[i])
    }

    pub fn manifest_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.descriptors)
    }
}

fn claim(slot: &mut Option<ZoneId>, zone: ZoneId) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(zone);
    true
}

/// Controller numbers declared through `midi: ctrl N` metadata.
pub fn midi_ctrl_hints(spec: &ZoneSpec) -> impl Iterator<Item = u8> + '_ {
    spec.meta_values("midi").filter_map(parse_ctrl_hint)
}

fn parse_ctrl_hint(value: &str) -> Option<u8> {
    let rest = value.trim_start().strip_prefix("ctrl")?.trim_start();
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| &rest[..end]);
    digits.parse::<u32>().ok().filter(|&n| n < 128).map(|n| n as u8)
}

/// Last value of every input control per MIDI channel, so that notes started
/// later pick up the current controller state of their channel.
#[derive(Clone, Debug)]
pub struct ControlCache {
    zones: Vec<ZoneId>,
    values: Vec<f32>,
}

impl ControlCache {
    pub fn new(table: &ControlTable) -> Self {
        let zones: Vec<ZoneId> = table.inputs().map(|d| d.zone).collect();
        let mut values = Vec::with_capacity(zones.len() * MIDI_CHANNELS);
        for _ in 0..MIDI_CHANNELS {
            values.extend(table.inputs().map(|d| d.init));
        }
        Self { zones, values }
    }

    pub fn width(&self) -> usize {
        self.zones.len()
    }

    pub fn channel(&self, channel: u8) -> &[f32] {
        let width = self.width();
        let start = clamp_channel(channel) as usize * width;
        &self.values[start..start + width]
    }

    pub fn set(&mut self, channel: u8, input: usize, value: f32) {
        let width = self.width();
        self.values[clamp_channel(channel) as usize * width + input] = value;
    }

    /// Manual (host) input is omni.
    pub fn set_all_channels(&mut self, input: usize, value: f32) {
        let width = self.width();
        for ch in 0..MIDI_CHANNELS {
            self.values[ch * width + input] = value;
        }
    }

    pub fn apply_to<U: VoiceUnit + ?Sized>(&self, channel: u8, unit: &mut U) {
        for (zone, value) in self.zones.iter().zip(self.channel(channel)) {
            unit.set_zone(*zone, *value);
        }
    }
}
