use crate::peak;
use polytone_ports::types::SampleRateHz;
use polytone_ports::voice::{VoiceUnit, ZoneId, ZoneSpec};

const GAIN: usize = 0;
const MUTE: usize = 1;
const LEVEL: usize = 2;

/// Mono gain stage, the smallest useful effect.
#[derive(Clone, Debug)]
pub struct SimpleGain {
    zones: Vec<f32>,
}

impl SimpleGain {
    pub fn new() -> Self {
        let mut unit = Self { zones: Vec::new() };
        unit.reset_parameters_to_default();
        unit
    }

    fn zone_specs() -> Vec<ZoneSpec> {
        vec![
            ZoneSpec::slider("gain", 1.0, 0.0, 2.0, 0.01).meta("midi", "ctrl 7"),
            ZoneSpec::toggle("mute").meta("midi", "ctrl 9"),
            ZoneSpec::meter("level", 0.0, 2.0),
        ]
    }
}

impl Default for SimpleGain {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceUnit for SimpleGain {
    fn init(&mut self, _sample_rate_hz: SampleRateHz) {
        self.reset_parameters_to_default();
    }

    fn reset_state(&mut self) {}

    fn reset_parameters_to_default(&mut self) {
        self.zones = Self::zone_specs().iter().map(|spec| spec.init).collect();
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn declare_zones(&self) -> Vec<ZoneSpec> {
        Self::zone_specs()
    }

    fn zone(&self, id: ZoneId) -> f32 {
        self.zones.get(id.0).copied().unwrap_or(0.0)
    }

    fn set_zone(&mut self, id: ZoneId, value: f32) {
        if let Some(zone) = self.zones.get_mut(id.0) {
            *zone = value;
        }
    }

    fn compute(&mut self, frames: usize, inputs: &[f32], outputs: &mut [f32]) {
        let gain = if self.zones[MUTE] >= 0.5 {
            0.0
        } else {
            self.zones[GAIN]
        };
        let out = &mut outputs[..frames];
        for (out, input) in out.iter_mut().zip(&inputs[..frames]) {
            *out = input * gain;
        }
        self.zones[LEVEL] = peak(out);
    }
}
