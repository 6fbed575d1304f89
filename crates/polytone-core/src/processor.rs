use crate::allocator::{NoteContext, VoiceAllocator};
use crate::controller_map::{controller_value, ControllerMap};
use crate::controls::{ControlCache, ControlTable};
use crate::diagnostics::ProcessorSnapshot;
use crate::tuning_store::MtsTuningStore;
use midly::live::LiveEvent;
use midly::MidiMessage;
use polytone_domain_tuning::{parse_octave_tuning, ChannelBank, OctaveTuning, RpnEffect, SYSEX_START};
use polytone_ports::control::ControlDescriptor;
use polytone_ports::storage::EngineSettings;
use polytone_ports::types::{SampleRateHz, MIDI_CHANNELS};
use polytone_ports::voice::{VoiceUnit, ZoneId};

const CC_DATA_ENTRY_MSB: u8 = 6;
const CC_DATA_ENTRY_LSB: u8 = 38;
const CC_DATA_INCREMENT: u8 = 96;
const CC_DATA_DECREMENT: u8 = 97;
const CC_RPN_LSB: u8 = 100;
const CC_RPN_MSB: u8 = 101;
const CC_ALL_SOUND_OFF: u8 = 120;
const CC_RESET_ALL_CONTROLLERS: u8 = 121;
const CC_ALL_NOTES_OFF: u8 = 123;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SetupError {
    #[error("voice {voice} declares {found} zones, expected {expected}")]
    ZoneLayoutMismatch {
        voice: usize,
        expected: usize,
        found: usize,
    },
    #[error("voice {voice} has {found:?} channels, expected {expected:?}")]
    ChannelLayoutMismatch {
        voice: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },
}

enum Engine<U> {
    Instrument(VoiceAllocator<U>),
    Effect(U),
}

/// Drives a pool of voice units (or a single effect unit) from host audio
/// blocks, host control ports and MIDI.
///
/// Thread model: every method except [`BlockProcessor::new`] is meant to be
/// called from the audio thread, one block at a time. MIDI for a block must be
/// delivered before the block's [`BlockProcessor::process_audio_block`].
pub struct BlockProcessor<U> {
    engine: Engine<U>,
    table: ControlTable,
    controller_map: ControllerMap,
    cache: ControlCache,
    channels: ChannelBank,
    tunings: MtsTuningStore,
    sample_rate_hz: SampleRateHz,
    active: bool,
    num_inputs: usize,
    num_outputs: usize,
    /// Host port values, indexed by port number.
    ports: Vec<f32>,
    /// Last host value applied to each input control.
    applied: Vec<f32>,
    requested_voices: usize,
    requested_tuning: usize,
    tuning_index: usize,
    mix: Vec<f32>,
}

impl<U: VoiceUnit> BlockProcessor<U> {
    /// Builds `settings.max_voices` units (one when that is zero) with
    /// `factory`, initialised at the configured sample rate.
    ///
    /// The processor starts inactive.
    pub fn new(
        settings: &EngineSettings,
        mut factory: impl FnMut() -> U,
        tunings: MtsTuningStore,
    ) -> Result<Self, SetupError> {
        let instrument = settings.is_instrument();
        let count = settings.max_voices.max(1);
        let mut units: Vec<U> = (0..count).map(|_| factory()).collect();
        for unit in &mut units {
            unit.init(settings.sample_rate_hz);
        }

        let zones = units[0].declare_zones();
        let num_inputs = units[0].num_inputs();
        let num_outputs = units[0].num_outputs();
        for (voice, unit) in units.iter().enumerate().skip(1) {
            let found = unit.declare_zones().len();
            if found != zones.len() {
                return Err(SetupError::ZoneLayoutMismatch {
                    voice,
                    expected: zones.len(),
                    found,
                });
            }
            let channels = (unit.num_inputs(), unit.num_outputs());
            if channels != (num_inputs, num_outputs) {
                return Err(SetupError::ChannelLayoutMismatch {
                    voice,
                    expected: (num_inputs, num_outputs),
                    found: channels,
                });
            }
        }

        let table = ControlTable::build(&zones, instrument);
        let controller_map = ControllerMap::new(&table);
        let cache = ControlCache::new(&table);

        let mut ports = vec![0.0; table.port_count()];
        for descriptor in table.descriptors() {
            if let Some(port) = descriptor.port {
                ports[port] = descriptor.init;
            }
        }
        let applied = table.inputs().map(|d| d.init).collect();

        let engine = if instrument {
            Engine::Instrument(VoiceAllocator::new(units, table.voice_controls()))
        } else {
            Engine::Effect(units.swap_remove(0))
        };

        log::debug!(
            "{} with {} voices, {} ports, {} mapped controllers, {} tunings",
            if instrument { "instrument" } else { "effect" },
            settings.max_voices,
            table.port_count(),
            controller_map.mapped().count(),
            tunings.len()
        );

        Ok(Self {
            engine,
            table,
            controller_map,
            cache,
            channels: ChannelBank::new(),
            tunings,
            sample_rate_hz: settings.sample_rate_hz,
            active: false,
            num_inputs,
            num_outputs,
            ports,
            applied,
            requested_voices: settings.max_voices,
            requested_tuning: 0,
            tuning_index: 0,
            mix: Vec::with_capacity(settings.initial_block_frames * num_outputs),
        })
    }

    pub fn is_instrument(&self) -> bool {
        matches!(self.engine, Engine::Instrument(_))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn sample_rate_hz(&self) -> SampleRateHz {
        self.sample_rate_hz
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn controls(&self) -> &[ControlDescriptor] {
        self.table.descriptors()
    }

    pub fn control_table(&self) -> &ControlTable {
        &self.table
    }

    pub fn controller_map(&self) -> &ControllerMap {
        &self.controller_map
    }

    pub fn channels(&self) -> &ChannelBank {
        &self.channels
    }

    pub fn allocator(&self) -> Option<&VoiceAllocator<U>> {
        match &self.engine {
            Engine::Instrument(allocator) => Some(allocator),
            Engine::Effect(_) => None,
        }
    }

    /// Re-initialises every unit and forgets the last applied port values, so
    /// the next block pushes all host values into the units again.
    pub fn activate(&mut self) {
        let rate = self.sample_rate_hz;
        self.for_each_unit(|unit| unit.init(rate));
        for (applied, descriptor) in self.applied.iter_mut().zip(self.table.inputs()) {
            *applied = descriptor.init;
        }
        self.active = true;
        log::debug!("activated at {rate} Hz");
    }

    pub fn deactivate(&mut self) {
        if let Engine::Instrument(allocator) = &mut self.engine {
            allocator.all_notes_off(&mut self.channels);
        }
        self.active = false;
        log::debug!("deactivated");
    }

    pub fn set_sample_rate(&mut self, sample_rate_hz: SampleRateHz) {
        self.sample_rate_hz = sample_rate_hz;
        self.for_each_unit(|unit| unit.init(sample_rate_hz));
    }

    /// Polyphony control value. Invalid requests are replaced by the
    /// effective voice count at the next block.
    pub fn voice_count(&self) -> usize {
        self.requested_voices
    }

    /// Requests a new polyphony, applied at the start of the next block.
    pub fn set_voice_count(&mut self, voice_count: usize) {
        if self.is_instrument() {
            self.requested_voices = voice_count;
        }
    }

    pub fn max_voices(&self) -> usize {
        self.allocator().map_or(0, VoiceAllocator::max_voices)
    }

    pub fn tuning_index(&self) -> usize {
        self.requested_tuning
    }

    /// Requests a tuning bank, applied at the start of the next block.
    pub fn set_tuning_index(&mut self, index: usize) {
        if self.is_instrument() {
            self.requested_tuning = index;
        }
    }

    pub fn tuning_label(&self) -> &str {
        self.tunings.label(self.tuning_index).unwrap_or_default()
    }

    pub fn tunings(&self) -> &MtsTuningStore {
        &self.tunings
    }

    /// Host port value; meters are updated at the end of every block.
    pub fn port(&self, port: usize) -> Option<f32> {
        self.ports.get(port).copied()
    }

    pub fn set_port(&mut self, port: usize, value: f32) {
        if let Some(slot) = self.ports.get_mut(port) {
            *slot = value;
        }
    }

    /// Renders one block of planar audio.
    ///
    /// If the mix buffer cannot grow to `frames`, or the buffers are shorter
    /// than the channel layout needs, the whole block is written as silence
    /// and an error is logged.
    pub fn process_audio_block(&mut self, frames: usize, inputs: &[f32], outputs: &mut [f32]) {
        if let Engine::Instrument(allocator) = &mut self.engine {
            allocator.flush_queued();
        }

        let in_len = self.num_inputs * frames;
        let out_len = self.num_outputs * frames;
        if inputs.len() < in_len || outputs.len() < out_len {
            log::error!(
                "block of {frames} frames needs {in_len}/{out_len} samples, got {}/{}",
                inputs.len(),
                outputs.len()
            );
            outputs.fill(0.0);
            return;
        }
        let inputs = &inputs[..in_len];
        let outputs = &mut outputs[..out_len];

        if !self.active {
            if self.num_inputs == self.num_outputs {
                outputs.copy_from_slice(inputs);
            } else {
                outputs.fill(0.0);
            }
            return;
        }

        self.apply_requests();
        self.apply_host_controls();

        match &mut self.engine {
            Engine::Instrument(allocator) => {
                outputs.fill(0.0);
                if self.mix.len() < out_len {
                    let additional = out_len - self.mix.len();
                    if let Err(e) = self.mix.try_reserve_exact(additional) {
                        log::error!("cannot grow mix buffer to {out_len} samples: {e}");
                        allocator.record_gates();
                        return;
                    }
                    self.mix.resize(out_len, 0.0);
                }
                let mix = &mut self.mix[..out_len];
                for voice in allocator.active_voices_mut() {
                    voice.unit_mut().compute(frames, inputs, mix);
                    for (out, sample) in outputs.iter_mut().zip(mix.iter()) {
                        *out += *sample;
                    }
                }
            }
            Engine::Effect(unit) => unit.compute(frames, inputs, outputs),
        }

        self.publish_meters();

        if let Engine::Instrument(allocator) = &mut self.engine {
            allocator.record_gates();
        }
    }

    pub fn process_midi_messages<'a>(&mut self, messages: impl IntoIterator<Item = &'a [u8]>) {
        for message in messages {
            self.process_midi_message(message);
        }
    }

    /// Handles one complete MIDI message. Sysex is forwarded to
    /// [`Self::process_sysex_message`]; anything undecodable is dropped.
    pub fn process_midi_message(&mut self, data: &[u8]) {
        if data.first() == Some(&SYSEX_START) {
            self.process_sysex_message(data);
            return;
        }
        match LiveEvent::parse(data) {
            Ok(LiveEvent::Midi { channel, message }) => {
                self.handle_channel_message(channel.as_int(), message)
            }
            Ok(_) => {}
            Err(e) => log::trace!("ignoring midi message {data:02x?}: {e}"),
        }
    }

    /// Applies an MTS octave tuning message. Effects have no tuning state and
    /// ignore sysex.
    pub fn process_sysex_message(&mut self, data: &[u8]) {
        if !self.is_instrument() {
            return;
        }
        match parse_octave_tuning(data) {
            Ok(tuning) => self.apply_tuning(&tuning),
            Err(e) => log::trace!("ignoring sysex: {e}"),
        }
    }

    /// Switches to tuning bank `index` (0 = equal temperament), clamped to the
    /// loaded banks. Sounding notes follow immediately.
    pub fn select_tuning(&mut self, index: usize) {
        let index = index.min(self.tunings.len());
        self.requested_tuning = index;
        if index == self.tuning_index {
            return;
        }
        self.tuning_index = index;

        match self.tunings.bank(index).map(|bank| bank.tuning) {
            Some(tuning) => {
                log::debug!("tuning bank {index}: {}", self.tuning_label());
                self.apply_tuning(&OctaveTuning {
                    realtime: true,
                    ..tuning
                });
            }
            None => {
                log::debug!("tuning bank 0: equal temperament");
                self.channels.clear_pitch_classes();
                for channel in 0..MIDI_CHANNELS as u8 {
                    self.update_running_voices(channel);
                }
            }
        }
    }

    pub fn snapshot(&self) -> ProcessorSnapshot {
        ProcessorSnapshot {
            active: self.active,
            sample_rate_hz: self.sample_rate_hz,
            tuning_index: self.tuning_index,
            tuning_label: self.tuning_label().to_string(),
            allocator: self.allocator().map(VoiceAllocator::snapshot),
            channels: self.channels.clone(),
        }
    }

    fn apply_requests(&mut self) {
        let Engine::Instrument(allocator) = &mut self.engine else {
            return;
        };
        if self.requested_voices != allocator.voice_count()
            && !allocator.reconfigure(self.requested_voices)
        {
            log::debug!(
                "rejected polyphony {}, keeping {}",
                self.requested_voices,
                allocator.voice_count()
            );
            self.requested_voices = allocator.voice_count();
        }
        if self.requested_tuning != self.tuning_index {
            self.select_tuning(self.requested_tuning);
        }
    }

    /// Pushes host port changes into the units. Manual input is omni, so the
    /// per-channel cache of every channel follows it too.
    fn apply_host_controls(&mut self) {
        for input in 0..self.table.input_count() {
            let descriptor = self.table.input(input);
            let (zone, port) = match descriptor.port {
                Some(port) => (descriptor.zone, port),
                None => continue,
            };
            let value = self.ports[port];
            if value == self.applied[input] {
                continue;
            }
            self.applied[input] = value;
            self.cache.set_all_channels(input, value);
            match &mut self.engine {
                Engine::Instrument(allocator) => allocator.set_used_zone(zone, value),
                Engine::Effect(unit) => unit.set_zone(zone, value),
            }
        }
    }

    /// Meter ports show voice 0, raised to the maximum over the active pool.
    fn publish_meters(&mut self) {
        for descriptor in self.table.outputs() {
            let Some(port) = descriptor.port else {
                continue;
            };
            let value = match &self.engine {
                Engine::Instrument(allocator) => {
                    let voices = allocator.active_voices();
                    let first = voices[0].unit().zone(descriptor.zone);
                    voices[1..]
                        .iter()
                        .map(|v| v.unit().zone(descriptor.zone))
                        .fold(first, f32::max)
                }
                Engine::Effect(unit) => unit.zone(descriptor.zone),
            };
            self.ports[port] = value;
        }
    }

    fn handle_channel_message(&mut self, channel: u8, message: MidiMessage) {
        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => {
                self.note_off(channel, key.as_int(), 0)
            }
            MidiMessage::NoteOn { key, vel } => self.note_on(channel, key.as_int(), vel.as_int()),
            MidiMessage::NoteOff { key, vel } => {
                self.note_off(channel, key.as_int(), vel.as_int())
            }
            MidiMessage::Controller { controller, value } => {
                self.handle_controller(channel, controller.as_int(), value.as_int())
            }
            MidiMessage::PitchBend { bend } => self.pitch_bend(channel, bend.0.as_int()),
            _ => {}
        }
    }

    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        if let Engine::Instrument(allocator) = &mut self.engine {
            let ctx = NoteContext {
                channels: &self.channels,
                controls: &self.cache,
            };
            allocator.allocate(channel, note, velocity, ctx);
        }
    }

    fn note_off(&mut self, channel: u8, note: u8, velocity: u8) {
        if let Engine::Instrument(allocator) = &mut self.engine {
            allocator.release(channel, note, velocity);
        }
    }

    fn pitch_bend(&mut self, channel: u8, value: u16) {
        if !self.is_instrument() {
            return;
        }
        let state = self.channels.channel_mut(channel);
        state.set_pitch_bend(value);
        log::trace!("pitch bend [{}]: {} cent", channel + 1, state.bend * 100.0);
        self.update_running_voices(channel);
    }

    fn handle_controller(&mut self, channel: u8, controller: u8, value: u8) {
        let state = self.channels.channel_mut(channel);
        match controller {
            CC_ALL_SOUND_OFF | CC_ALL_NOTES_OFF => {
                if let Engine::Instrument(allocator) = &mut self.engine {
                    allocator.all_notes_off_channel(channel, &mut self.channels);
                    log::debug!("all notes off [{}]", channel + 1);
                }
            }
            CC_RESET_ALL_CONTROLLERS => state.reset_controllers(),
            CC_RPN_MSB => state.set_rpn_msb(value),
            CC_RPN_LSB => state.set_rpn_lsb(value),
            CC_DATA_ENTRY_MSB => {
                state.set_data_msb(value);
                self.apply_rpn(channel);
            }
            CC_DATA_ENTRY_LSB => {
                state.set_data_lsb(value);
                self.apply_rpn(channel);
            }
            CC_DATA_INCREMENT => {
                state.increment_data();
                self.apply_rpn(channel);
            }
            CC_DATA_DECREMENT => {
                state.decrement_data();
                self.apply_rpn(channel);
            }
            _ => self.mapped_controller(channel, controller, value),
        }
    }

    fn apply_rpn(&mut self, channel: u8) {
        if !self.is_instrument() {
            return;
        }
        if let RpnEffect::Retuned(_) = self.channels.channel_mut(channel).apply_rpn() {
            self.update_running_voices(channel);
        }
    }

    fn mapped_controller(&mut self, channel: u8, controller: u8, raw: u8) {
        let Some(input) = self.controller_map.lookup(controller) else {
            return;
        };
        let descriptor = self.table.input(input);
        let zone: ZoneId = descriptor.zone;
        let value = controller_value(descriptor, raw);
        self.cache.set(channel, input, value);
        match &mut self.engine {
            Engine::Instrument(allocator) => allocator.set_channel_zone(channel, zone, value),
            Engine::Effect(unit) => unit.set_zone(zone, value),
        }
        log::trace!("cc {controller} [{}] -> {} = {value}", channel + 1, descriptor.label);
    }

    fn apply_tuning(&mut self, tuning: &OctaveTuning) {
        let mask = self.channels.apply_octave_tuning(tuning);
        log::debug!(
            "octave tuning ({}) on channels {:016b}: {:?}",
            if tuning.realtime { "realtime" } else { "bulk" },
            mask.0,
            tuning.offsets
        );
        if tuning.realtime {
            for channel in mask.channels() {
                self.update_running_voices(channel);
            }
        }
    }

    fn update_running_voices(&mut self, channel: u8) {
        if let Engine::Instrument(allocator) = &mut self.engine {
            allocator.update_running_voices(channel, &self.channels);
        }
    }

    fn for_each_unit(&mut self, mut f: impl FnMut(&mut U)) {
        match &mut self.engine {
            Engine::Instrument(allocator) => allocator.units_mut().for_each(f),
            Engine::Effect(unit) => f(unit),
        }
    }
}
