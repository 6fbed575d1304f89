use crate::controls::{ControlCache, VoiceControls};
use crate::diagnostics::{AllocatorSnapshot, MappedNote};
use polytone_domain_tuning::ChannelBank;
use polytone_ports::types::{clamp_channel, clamp_data, NoteKey, VoiceIndex, MIDI_CHANNELS, MIDI_NOTES};
use polytone_ports::voice::{EdgeScratch, VoiceUnit, ZoneId};
use std::collections::VecDeque;

/// Channel state a note picks up when it is (re)started.
#[derive(Clone, Copy)]
pub struct NoteContext<'a> {
    pub channels: &'a ChannelBank,
    pub controls: &'a ControlCache,
}

/// One slot of the voice arena.
pub struct Voice<U> {
    index: VoiceIndex,
    key: Option<NoteKey>,
    last_gate: f32,
    unit: U,
}

impl<U: VoiceUnit> Voice<U> {
    fn new(index: VoiceIndex, unit: U) -> Self {
        Self {
            index,
            key: None,
            last_gate: 0.0,
            unit,
        }
    }

    pub fn index(&self) -> VoiceIndex {
        self.index
    }

    /// Note this voice was last started for. Kept while a zero-length note
    /// waits in the release queue.
    pub fn key(&self) -> Option<NoteKey> {
        self.key
    }

    /// Gate value observed at the end of the previous block.
    pub fn last_gate(&self) -> f32 {
        self.last_gate
    }

    pub fn unit(&self) -> &U {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut U {
        &mut self.unit
    }
}

/// Fixed-pool voice allocator with FIFO stealing.
///
/// Bookkeeping is three index collections over the arena:
/// - `free`: ring of voices available for new notes
/// - `used`: sounding voices, oldest (re)trigger first
/// - `queued`: used voices whose note-off arrived before the note was ever
///   rendered; they are freed at the start of the next block
///
/// Every voice below the current voice count is in exactly one of `free` and
/// `used`; queued voices are a subset of `used`.
pub struct VoiceAllocator<U> {
    voices: Vec<Voice<U>>,
    voice_count: usize,
    free: VecDeque<VoiceIndex>,
    used: VecDeque<VoiceIndex>,
    queued: Vec<bool>,
    notes: Vec<Option<VoiceIndex>>,
    controls: VoiceControls,
    edge: EdgeScratch,
}

impl<U: VoiceUnit> VoiceAllocator<U> {
    /// Takes ownership of the pre-built units; their count is the maximum
    /// polyphony. The pool must not be empty.
    pub fn new(units: Vec<U>, controls: VoiceControls) -> Self {
        assert!(!units.is_empty(), "an instrument needs at least one voice");
        let max_voices = units.len();
        let edge = EdgeScratch::for_unit(&units[0]);
        let voices: Vec<Voice<U>> = units
            .into_iter()
            .enumerate()
            .map(|(index, unit)| Voice::new(index, unit))
            .collect();

        let mut allocator = Self {
            voices,
            voice_count: max_voices,
            free: VecDeque::with_capacity(max_voices),
            used: VecDeque::with_capacity(max_voices),
            queued: vec![false; max_voices],
            notes: vec![None; MIDI_CHANNELS * MIDI_NOTES],
            controls,
            edge,
        };
        allocator.reset_bookkeeping();
        allocator
    }

    pub fn max_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn voice_count(&self) -> usize {
        self.voice_count
    }

    pub fn controls(&self) -> VoiceControls {
        self.controls
    }

    pub fn voice(&self, index: VoiceIndex) -> &Voice<U> {
        &self.voices[index]
    }

    /// The voices of the current pool, indexed `0..voice_count`.
    pub fn active_voices(&self) -> &[Voice<U>] {
        &self.voices[..self.voice_count]
    }

    pub fn active_voices_mut(&mut self) -> &mut [Voice<U>] {
        &mut self.voices[..self.voice_count]
    }

    /// Every unit of the arena, including voices above the current count.
    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut U> {
        self.voices.iter_mut().map(|v| &mut v.unit)
    }

    pub fn voice_for(&self, channel: u8, note: u8) -> Option<VoiceIndex> {
        self.notes[NoteKey::new(channel, note).slot()]
    }

    pub fn mapped_count(&self) -> usize {
        self.notes.iter().filter(|n| n.is_some()).count()
    }

    pub fn used(&self) -> impl Iterator<Item = VoiceIndex> + '_ {
        self.used.iter().copied()
    }

    pub fn free(&self) -> impl Iterator<Item = VoiceIndex> + '_ {
        self.free.iter().copied()
    }

    pub fn is_free(&self, index: VoiceIndex) -> bool {
        self.free.contains(&index)
    }

    pub fn is_queued(&self, index: VoiceIndex) -> bool {
        self.queued.get(index).copied().unwrap_or(false)
    }

    /// Starts `note` on `channel` and returns the voice playing it.
    ///
    /// A note that is already mapped is retriggered on the same voice. Otherwise
    /// a free voice is taken, or the oldest used voice is stolen.
    pub fn allocate(&mut self, channel: u8, note: u8, velocity: u8, ctx: NoteContext<'_>) -> VoiceIndex {
        let key = NoteKey::new(channel, note);
        let slot = key.slot();

        if let Some(index) = self.notes[slot] {
            self.voice_off(index);
            self.voice_on(index, key, velocity, ctx);
            self.remove_used(index);
            self.used.push_back(index);
            log::trace!("retrigger {key} on voice #{index}");
            return index;
        }

        if let Some(index) = self.free.pop_front() {
            self.used.push_back(index);
            self.voice_on(index, key, velocity, ctx);
            self.notes[slot] = Some(index);
            log::trace!("alloc {key} on voice #{index}");
            return index;
        }

        let index = match self.used.pop_front() {
            Some(index) => index,
            // Unreachable with a non-empty pool: every voice is free or used.
            None => 0,
        };
        let old_key = self.voices[index].key;
        self.voice_off(index);
        if let Some(old_key) = old_key {
            self.unmap(old_key, index);
        }
        self.queued[index] = false;
        self.used.push_back(index);
        self.voice_on(index, key, velocity, ctx);
        self.notes[slot] = Some(index);
        log::trace!("steal voice #{index} for {key}");
        index
    }

    /// Stops `note` on `channel`. Returns the voice that was playing it, if any.
    ///
    /// A voice whose gate was never rendered high is queued instead of freed;
    /// the next [`Self::flush_queued`] frees it.
    pub fn release(&mut self, channel: u8, note: u8, _velocity: u8) -> Option<VoiceIndex> {
        let key = NoteKey::new(channel, note);
        let slot = key.slot();
        let index = self.notes[slot]?;

        if self.voices[index].last_gate == 0.0 && self.controls.gate.is_some() {
            self.queued[index] = true;
            self.notes[slot] = None;
            log::trace!("release {key} on voice #{index} (queued)");
            return Some(index);
        }

        self.free.push_back(index);
        self.voice_off(index);
        self.notes[slot] = None;
        self.voices[index].key = None;
        self.remove_used(index);
        log::trace!("release {key} on voice #{index}");
        Some(index)
    }

    /// Frees every queued voice. Called first thing every block.
    pub fn flush_queued(&mut self) {
        for index in 0..self.voice_count {
            if self.queued[index] {
                self.queued[index] = false;
                self.free_used(index);
                log::trace!("release voice #{index} (unqueued)");
            }
        }
    }

    /// Silences every voice and resets the pitch bend of all channels.
    pub fn all_notes_off(&mut self, channels: &mut ChannelBank) {
        for index in 0..self.voice_count {
            self.voice_off(index);
        }
        channels.reset_bends();
        self.reset_bookkeeping();
    }

    /// Silences the voices of one channel and resets its pitch bend.
    pub fn all_notes_off_channel(&mut self, channel: u8, channels: &mut ChannelBank) {
        let channel = clamp_channel(channel);
        let mut pos = 0;
        while pos < self.used.len() {
            let index = self.used[pos];
            if self.voices[index].key.map(|k| k.channel) == Some(channel) {
                self.used.remove(pos);
                self.queued[index] = false;
                self.release_slot(index);
            } else {
                pos += 1;
            }
        }
        channels.channel_mut(channel).reset_bend();
    }

    /// Changes the polyphony. Requests outside `1..=max_voices` and no-op
    /// requests return `false`. Every sounding note is cut.
    pub fn reconfigure(&mut self, voice_count: usize) -> bool {
        if voice_count == 0 || voice_count > self.max_voices() || voice_count == self.voice_count {
            return false;
        }
        for index in 0..self.voice_count {
            self.voice_off(index);
        }
        self.voice_count = voice_count;
        self.reset_bookkeeping();
        log::debug!("polyphony set to {voice_count} voices");
        true
    }

    /// Rewrites the frequency of every sounding voice on `channel` after a
    /// bend or tuning change. Gates and gains are left alone.
    pub fn update_running_voices(&mut self, channel: u8, channels: &ChannelBank) {
        let Some(freq) = self.controls.freq else {
            return;
        };
        let channel = clamp_channel(channel);
        for &index in &self.used {
            let voice = &mut self.voices[index];
            if let Some(key) = voice.key.filter(|k| k.channel == channel) {
                voice.unit.set_zone(freq, channels.frequency(channel, key.note));
            }
        }
    }

    /// Writes a control value into every used voice on `channel`.
    pub fn set_channel_zone(&mut self, channel: u8, zone: ZoneId, value: f32) {
        let channel = clamp_channel(channel);
        for &index in &self.used {
            let voice = &mut self.voices[index];
            if voice.key.map(|k| k.channel) == Some(channel) {
                voice.unit.set_zone(zone, value);
            }
        }
    }

    /// Writes a control value into every used voice.
    pub fn set_used_zone(&mut self, zone: ZoneId, value: f32) {
        for &index in &self.used {
            self.voices[index].unit.set_zone(zone, value);
        }
    }

    /// Remembers each voice's gate for the retrigger and zero-length checks
    /// of the next block.
    pub fn record_gates(&mut self) {
        let Some(gate) = self.controls.gate else {
            return;
        };
        for voice in &mut self.voices[..self.voice_count] {
            voice.last_gate = voice.unit.zone(gate);
        }
    }

    pub fn snapshot(&self) -> AllocatorSnapshot {
        let notes = self
            .notes
            .iter()
            .enumerate()
            .filter_map(|(slot, voice)| {
                voice.map(|voice| MappedNote {
                    key: NoteKey::new((slot / MIDI_NOTES) as u8, (slot % MIDI_NOTES) as u8),
                    voice,
                })
            })
            .collect();
        AllocatorSnapshot {
            voice_count: self.voice_count,
            notes,
            used: self.used.iter().copied().collect(),
            free: self.free.iter().copied().collect(),
            queued: (0..self.voice_count).filter(|&i| self.queued[i]).collect(),
        }
    }

    fn voice_on(&mut self, index: VoiceIndex, key: NoteKey, velocity: u8, ctx: NoteContext<'_>) {
        let controls = self.controls;
        let voice = &mut self.voices[index];
        if let Some(gate) = controls.gate {
            if voice.last_gate == 1.0 {
                voice.unit.force_edge_reset(gate, &mut self.edge);
            }
        }
        if let Some(freq) = controls.freq {
            voice
                .unit
                .set_zone(freq, ctx.channels.frequency(key.channel, key.note));
        }
        if let Some(gate) = controls.gate {
            voice.unit.set_zone(gate, 1.0);
        }
        if let Some(gain) = controls.gain {
            voice.unit.set_zone(gain, clamp_data(velocity) as f32 / 127.0);
        }
        ctx.controls.apply_to(key.channel, &mut voice.unit);
        voice.key = Some(key);
    }

    fn voice_off(&mut self, index: VoiceIndex) {
        if let Some(gate) = self.controls.gate {
            self.voices[index].unit.set_zone(gate, 0.0);
        }
    }

    fn free_used(&mut self, index: VoiceIndex) {
        self.remove_used(index);
        self.release_slot(index);
    }

    /// Gate off, back on the free ring, mapping dropped. The caller has already
    /// taken the voice out of `used`.
    fn release_slot(&mut self, index: VoiceIndex) {
        self.free.push_back(index);
        self.voice_off(index);
        if let Some(key) = self.voices[index].key.take() {
            self.unmap(key, index);
        }
    }

    /// Drops the mapping of `key` only if it still points at `index`; a queued
    /// voice's note may already have been restarted elsewhere.
    fn unmap(&mut self, key: NoteKey, index: VoiceIndex) {
        let slot = &mut self.notes[key.slot()];
        if *slot == Some(index) {
            *slot = None;
        }
    }

    fn remove_used(&mut self, index: VoiceIndex) {
        if let Some(pos) = self.used.iter().position(|&i| i == index) {
            self.used.remove(pos);
        }
    }

    fn reset_bookkeeping(&mut self) {
        self.notes.fill(None);
        self.free.clear();
        self.free.extend(0..self.voice_count);
        self.used.clear();
        self.queued.fill(false);
        for voice in &mut self.voices {
            voice.key = None;
        }
    }
}
