use polytone_core::{load_settings, load_tunings, BlockProcessor};
use polytone_infra_storage_fs::{FsSettingsStore, FsTuningDirectory};
use polytone_infra_voice_simple::SimpleVoice;
use polytone_ports::storage::{EngineSettings, SettingsPort, StorageError};
use pretty_assertions::assert_eq;
use std::fs;

const EQUAL_BANK: [u8; 33] = [
    0xf0, 0x7e, 0x7f, 0x08, 0x09, 0x03, 0x7f, 0x7f, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00, 0x40,
    0x00, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00, 0x40, 0x00,
    0x40, 0x00, 0xf7,
];

struct BrokenStore;

impl SettingsPort for BrokenStore {
    fn load_settings(&self) -> Result<EngineSettings, StorageError> {
        Err(StorageError::Io("disk on fire".to_string()))
    }

    fn save_settings(&self, _s: &EngineSettings) -> Result<(), StorageError> {
        Err(StorageError::Io("disk on fire".to_string()))
    }
}

#[test]
fn stored_settings_pick_the_pool_and_the_tuning_directory() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = tempfile::tempdir().unwrap();
    let tunings = tempfile::tempdir().unwrap();
    fs::write(tunings.path().join("pythagorean.syx"), EQUAL_BANK).unwrap();
    fs::write(tunings.path().join("just.syx"), EQUAL_BANK).unwrap();

    let store = FsSettingsStore::new(config.path().to_path_buf());
    store
        .save_settings(&EngineSettings {
            sample_rate_hz: 44_100,
            max_voices: 6,
            initial_block_frames: 128,
            tuning_dir: Some(tunings.path().display().to_string()),
        })
        .unwrap();

    let processor = BlockProcessor::from_storage(
        Some(&store),
        FsTuningDirectory::from_settings,
        SimpleVoice::new,
    )
    .unwrap();

    assert!(processor.is_instrument());
    assert!(!processor.is_active());
    assert_eq!(processor.max_voices(), 6);
    assert_eq!(processor.sample_rate_hz(), 44_100);
    assert_eq!(
        processor.tunings().names().collect::<Vec<_>>(),
        vec!["just", "pythagorean"]
    );
}

#[test]
fn effect_settings_build_an_effect() {
    let config = tempfile::tempdir().unwrap();
    let store = FsSettingsStore::new(config.path().to_path_buf());
    fs::write(store.path(), br#"{ "max_voices": 0 }"#).unwrap();

    let processor = BlockProcessor::from_storage(
        Some(&store),
        |_: &EngineSettings| FsTuningDirectory::new(config.path().join("none")),
        SimpleVoice::new,
    )
    .unwrap();

    assert!(!processor.is_instrument());
    assert!(processor.tunings().is_empty());
}

#[test]
fn unreadable_settings_fall_back_to_defaults() {
    let _ = env_logger::builder().is_test(true).try_init();
    assert_eq!(load_settings(Some(&BrokenStore)), EngineSettings::default());
    assert_eq!(load_settings(None), EngineSettings::default());
}

#[test]
fn missing_tuning_directory_leaves_equal_temperament() {
    let dir = tempfile::tempdir().unwrap();
    let store = load_tunings(&FsTuningDirectory::new(dir.path().join("missing")));
    assert!(store.is_empty());
}
