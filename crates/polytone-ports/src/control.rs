use crate::voice::ZoneId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// Buttons and check boxes.
    Toggle,
    Slider,
    NumEntry,
    /// Passive display (bargraph); becomes an output port.
    Meter,
    /// Layout marker only, never a port.
    Group,
}

impl ControlKind {
    pub fn is_toggle(self) -> bool {
        self == ControlKind::Toggle
    }

    pub fn is_output(self) -> bool {
        self == ControlKind::Meter
    }

    pub fn is_input(self) -> bool {
        matches!(
            self,
            ControlKind::Toggle | ControlKind::Slider | ControlKind::NumEntry
        )
    }
}

/// One entry of the ordered control list handed to port manifest generators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlDescriptor {
    pub kind: ControlKind,
    pub label: String,
    /// Host port index; `None` for groups and for the allocator-driven voice
    /// controls of an instrument.
    pub port: Option<usize>,
    pub zone: ZoneId,
    pub init: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub midi_ctrls: Vec<u8>,
}

impl ControlDescriptor {
    pub fn is_exported(&self) -> bool {
        self.port.is_some()
    }
}
