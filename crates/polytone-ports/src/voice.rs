use crate::control::ControlKind;
use crate::types::SampleRateHz;
use serde::{Deserialize, Serialize};

/// Position of a zone in the unit's declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub usize);

/// Declaration of one addressable parameter slot of a voice unit.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoneSpec {
    pub kind: ControlKind,
    pub label: String,
    pub init: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    /// Free-form `key: value` metadata, e.g. `("midi", "ctrl 7")`.
    pub meta: Vec<(String, String)>,
}

impl ZoneSpec {
    pub fn new(kind: ControlKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            init: 0.0,
            min: 0.0,
            max: 1.0,
            step: 0.0,
            meta: Vec::new(),
        }
    }

    pub fn group(label: impl Into<String>) -> Self {
        Self::new(ControlKind::Group, label)
    }

    pub fn toggle(label: impl Into<String>) -> Self {
        Self::new(ControlKind::Toggle, label).range(0.0, 0.0, 1.0, 1.0)
    }

    pub fn slider(label: impl Into<String>, init: f32, min: f32, max: f32, step: f32) -> Self {
        Self::new(ControlKind::Slider, label).range(init, min, max, step)
    }

    pub fn num_entry(label: impl Into<String>, init: f32, min: f32, max: f32, step: f32) -> Self {
        Self::new(ControlKind::NumEntry, label).range(init, min, max, step)
    }

    pub fn meter(label: impl Into<String>, min: f32, max: f32) -> Self {
        Self::new(ControlKind::Meter, label).range(min, min, max, 0.0)
    }

    pub fn range(mut self, init: f32, min: f32, max: f32, step: f32) -> Self {
        self.init = init;
        self.min = min;
        self.max = max;
        self.step = step;
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.push((key.into(), value.into()));
        self
    }

    pub fn meta_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.meta
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One-frame buffers for the throwaway compute call of
/// [`VoiceUnit::force_edge_reset`]. Sized once per unit layout.
#[derive(Clone, Debug)]
pub struct EdgeScratch {
    inputs: Vec<f32>,
    outputs: Vec<f32>,
}

impl EdgeScratch {
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            inputs: vec![0.0; num_inputs],
            outputs: vec![0.0; num_outputs],
        }
    }

    pub fn for_unit<U: VoiceUnit + ?Sized>(unit: &U) -> Self {
        Self::new(unit.num_inputs(), unit.num_outputs())
    }
}

/// One instance of an opaque synthesis algorithm.
///
/// Thread model:
/// - `init` / `declare_zones` are called during setup (may allocate)
/// - everything else is called from the audio thread and must be realtime-safe
///
/// Audio buffers are planar: channel `c` of a `frames`-long block occupies
/// `[c * frames, (c + 1) * frames)`.
pub trait VoiceUnit: Send {
    fn init(&mut self, sample_rate_hz: SampleRateHz);

    /// Clears internal DSP state (delay lines, envelopes, phases).
    fn reset_state(&mut self);

    /// Restores every zone to its declared init value.
    fn reset_parameters_to_default(&mut self);

    fn num_inputs(&self) -> usize;
    fn num_outputs(&self) -> usize;

    /// Zones in declaration order; `ZoneId(i)` addresses entry `i`.
    fn declare_zones(&self) -> Vec<ZoneSpec>;

    fn zone(&self, id: ZoneId) -> f32;
    fn set_zone(&mut self, id: ZoneId, value: f32);

    fn compute(&mut self, frames: usize, inputs: &[f32], outputs: &mut [f32]);

    /// Makes the unit observe a falling gate edge: gate goes to 0 and one
    /// silent frame is computed and discarded. The caller raises the gate
    /// again afterwards.
    fn force_edge_reset(&mut self, gate: ZoneId, scratch: &mut EdgeScratch) {
        self.set_zone(gate, 0.0);
        let EdgeScratch { inputs, outputs } = scratch;
        inputs.fill(0.0);
        self.compute(1, inputs, outputs);
    }
}
