use crate::controls::ControlTable;
use polytone_ports::control::{ControlDescriptor, ControlKind};
use polytone_ports::types::clamp_data;

const CONTROLLERS: usize = 128;

/// Controller number to input control table, built once from the `midi`
/// metadata of the declared controls. The first declaration of a controller
/// number wins.
#[derive(Clone, Debug)]
pub struct ControllerMap {
    inputs: [Option<u16>; CONTROLLERS],
}

impl ControllerMap {
    pub fn new(table: &ControlTable) -> Self {
        let mut inputs = [None; CONTROLLERS];
        for (input, descriptor) in table.inputs().enumerate() {
            for &cc in &descriptor.midi_ctrls {
                let slot = &mut inputs[clamp_data(cc) as usize];
                if slot.is_none() {
                    *slot = Some(input as u16);
                }
            }
        }
        Self { inputs }
    }

    pub fn lookup(&self, controller: u8) -> Option<usize> {
        self.inputs[clamp_data(controller) as usize].map(usize::from)
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.iter().all(Option::is_none)
    }

    pub fn mapped(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        self.inputs
            .iter()
            .enumerate()
            .filter_map(|(cc, input)| input.map(|i| (cc as u8, usize::from(i))))
    }
}

/// Maps a 7-bit controller value onto the range of `descriptor`.
///
/// Continuous controls divide by 128 so that 64 lands on the center, and 127
/// is pinned to `max` to keep the full range reachable.
pub fn controller_value(descriptor: &ControlDescriptor, raw: u8) -> f32 {
    let raw = clamp_data(raw);
    match descriptor.kind {
        ControlKind::Toggle => {
            if raw >= 64 {
                1.0
            } else {
                0.0
            }
        }
        _ if raw == 127 => descriptor.max,
        _ => descriptor.min + (descriptor.max - descriptor.min) * raw as f32 / 128.0,
    }
}
