use polytone_domain_tuning::ChannelBank;
use polytone_ports::control::ControlDescriptor;
use polytone_ports::storage::{EngineSettings, StorageError};
use polytone_ports::types::{NoteKey, VoiceIndex};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MappedNote {
    pub key: NoteKey,
    pub voice: VoiceIndex,
}

/// Allocator bookkeeping at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AllocatorSnapshot {
    pub voice_count: usize,
    pub notes: Vec<MappedNote>,
    /// Oldest (re)trigger first.
    pub used: Vec<VoiceIndex>,
    pub free: Vec<VoiceIndex>,
    pub queued: Vec<VoiceIndex>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProcessorSnapshot {
    pub active: bool,
    pub sample_rate_hz: u32,
    pub tuning_index: usize,
    pub tuning_label: String,
    /// `None` in effect mode.
    pub allocator: Option<AllocatorSnapshot>,
    pub channels: ChannelBank,
}

#[derive(Serialize)]
struct AppVersion {
    name: String,
    version: String,
}

/// Writes a debugging bundle into `dir`.
pub fn export_diagnostics(
    dir: &Path,
    settings: &EngineSettings,
    controls: &[ControlDescriptor],
    snapshot: &ProcessorSnapshot,
) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::Io(e.to_string()))?;

    let app_version = AppVersion {
        name: "Polytone".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    write_json(&dir.join("app_version.json"), &app_version)?;
    write_json(&dir.join("settings.json"), settings)?;
    write_json(&dir.join("controls.json"), &controls)?;
    write_json(&dir.join("processor.json"), snapshot)?;

    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
}
