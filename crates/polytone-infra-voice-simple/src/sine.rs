use crate::peak;
use polytone_ports::types::SampleRateHz;
use polytone_ports::voice::{VoiceUnit, ZoneId, ZoneSpec};
use std::f32::consts::TAU;

const FREQ: usize = 1;
const GAIN: usize = 2;
const GATE: usize = 3;
const VOLUME: usize = 4;
const RELEASE: usize = 5;
const LEVEL: usize = 6;

const ATTACK_SECONDS: f32 = 0.005;
const AMPLITUDE: f32 = 0.2;

/// Sine voice with a linear attack/release envelope.
///
/// The envelope restarts whenever the gate goes from 0 to 1 between two
/// compute calls.
#[derive(Clone, Debug)]
pub struct SimpleVoice {
    sample_rate_hz: f32,
    zones: Vec<f32>,
    phase: f32,
    env: f32,
    last_gate: f32,
    attacks: u64,
}

impl SimpleVoice {
    pub fn new() -> Self {
        let mut voice = Self {
            sample_rate_hz: 48_000.0,
            zones: Vec::new(),
            phase: 0.0,
            env: 0.0,
            last_gate: 0.0,
            attacks: 0,
        };
        voice.reset_parameters_to_default();
        voice
    }

    /// Number of envelope restarts seen so far.
    pub fn attacks(&self) -> u64 {
        self.attacks
    }

    pub fn envelope(&self) -> f32 {
        self.env
    }

    fn zone_specs() -> Vec<ZoneSpec> {
        vec![
            ZoneSpec::group("voice"),
            ZoneSpec::num_entry("freq", 440.0, 20.0, 20_000.0, 0.01),
            ZoneSpec::slider("gain", 0.5, 0.0, 1.0, 0.01),
            ZoneSpec::toggle("gate"),
            ZoneSpec::slider("volume", 0.8, 0.0, 1.0, 0.01).meta("midi", "ctrl 7"),
            ZoneSpec::slider("release", 0.2, 0.01, 5.0, 0.01).meta("midi", "ctrl 72"),
            ZoneSpec::meter("level", 0.0, 1.0),
        ]
    }
}

impl Default for SimpleVoice {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceUnit for SimpleVoice {
    fn init(&mut self, sample_rate_hz: SampleRateHz) {
        self.sample_rate_hz = sample_rate_hz.max(1) as f32;
        self.reset_state();
        self.reset_parameters_to_default();
    }

    fn reset_state(&mut self) {
        self.phase = 0.0;
        self.env = 0.0;
        self.last_gate = 0.0;
    }

    fn reset_parameters_to_default(&mut self) {
        self.zones = Self::zone_specs().iter().map(|spec| spec.init).collect();
    }

    fn num_inputs(&self) -> usize {
        0
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

    fn compute(&mut self, frames: usize, _inputs: &[f32], outputs: &mut [f32]) {
        let out = &mut outputs[..frames];
        let gate = self.zones[GATE];
        if gate > 0.0 && self.last_gate <= 0.0 {
            self.attacks += 1;
            self.phase = 0.0;
            self.env = 0.0;
        }
        self.last_gate = gate;

        let attack_step = 1.0 / (ATTACK_SECONDS * self.sample_rate_hz);
        let release_step = 1.0 / (self.zones[RELEASE].max(0.001) * self.sample_rate_hz);
        let phase_step = TAU * self.zones[FREQ] / self.sample_rate_hz;
        let level = self.zones[GAIN] * self.zones[VOLUME] * AMPLITUDE;

        for sample in out.iter_mut() {
            if gate > 0.0 {
                self.env = (self.env + attack_step).min(1.0);
            } else {
                self.env = (self.env - release_step).max(0.0);
            }
            *sample = self.phase.sin() * self.env * level;
            self.phase += phase_step;
            if self.phase >= TAU {
                self.phase -= TAU;
            }
        }

        self.zones[LEVEL] = peak(out);
    }
}
