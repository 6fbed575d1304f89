#![allow(dead_code)]

use polytone_core::{ControlCache, ControlTable, VoiceAllocator};
use polytone_ports::types::SampleRateHz;
use polytone_ports::voice::{VoiceUnit, ZoneId, ZoneSpec};

pub const FREQ: ZoneId = ZoneId(0);
pub const GAIN: ZoneId = ZoneId(1);
pub const GATE: ZoneId = ZoneId(2);
pub const CUTOFF: ZoneId = ZoneId(3);
pub const LEVEL: ZoneId = ZoneId(4);

/// Port numbers of the recorder in instrument mode.
pub const CUTOFF_PORT: usize = 0;
pub const LEVEL_PORT: usize = 1;

/// Records every compute call as `(frames, gate)` and outputs `gain * gate`.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    pub zones: Vec<f32>,
    pub calls: Vec<(usize, f32)>,
    pub sample_rate_hz: SampleRateHz,
}

impl Recorder {
    pub fn new() -> Self {
        let mut recorder = Self::default();
        recorder.reset_parameters_to_default();
        recorder
    }

    pub fn specs() -> Vec<ZoneSpec> {
        vec![
            ZoneSpec::num_entry("freq", 440.0, 20.0, 20_000.0, 0.01),
            ZoneSpec::slider("gain", 0.5, 0.0, 1.0, 0.01),
            ZoneSpec::toggle("gate"),
            ZoneSpec::slider("cutoff", 0.5, 0.0, 1.0, 0.01).meta("midi", "ctrl 74"),
            ZoneSpec::meter("level", 0.0, 1.0),
        ]
    }
}

impl VoiceUnit for Recorder {
    fn init(&mut self, sample_rate_hz: SampleRateHz) {
        self.sample_rate_hz = sample_rate_hz;
        self.reset_parameters_to_default();
    }

    fn reset_state(&mut self) {
        self.calls.clear();
    }

    fn reset_parameters_to_default(&mut self) {
        self.zones = Self::specs().iter().map(|s| s.init).collect();
    }

    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn declare_zones(&self) -> Vec<ZoneSpec> {
        Self::specs()
    }

    fn zone(&self, id: ZoneId) -> f32 {
        self.zones[id.0]
    }

    fn set_zone(&mut self, id: ZoneId, value: f32) {
        self.zones[id.0] = value;
    }

    fn compute(&mut self, frames: usize, _inputs: &[f32], outputs: &mut [f32]) {
        let gate = self.zones[GATE.0];
        self.calls.push((frames, gate));
        let level = self.zones[GAIN.0] * gate;
        outputs[..frames].fill(level);
        self.zones[LEVEL.0] = level;
    }
}

pub fn recorder_table() -> ControlTable {
    ControlTable::build(&Recorder::specs(), true)
}

pub fn recorder_allocator(voices: usize) -> (VoiceAllocator<Recorder>, ControlCache) {
    let table = recorder_table();
    let units = (0..voices).map(|_| Recorder::new()).collect();
    (
        VoiceAllocator::new(units, table.voice_controls()),
        ControlCache::new(&table),
    )
}
