use crate::processor::{BlockProcessor, SetupError};
use crate::tuning_store::MtsTuningStore;
use polytone_ports::storage::{EngineSettings, SettingsPort};
use polytone_ports::tuning::TuningSource;
use polytone_ports::voice::VoiceUnit;

/// Stored settings, or the defaults when there is no store or it cannot be
/// read.
pub fn load_settings(storage: Option<&dyn SettingsPort>) -> EngineSettings {
    match storage.map(|storage| storage.load_settings()) {
        Some(Ok(settings)) => settings,
        Some(Err(e)) => {
            log::warn!("falling back to default settings: {e}");
            EngineSettings::default()
        }
        None => EngineSettings::default(),
    }
}

/// Banks from `source`. When no bank directory can be read only equal
/// temperament is available.
pub fn load_tunings(source: &dyn TuningSource) -> MtsTuningStore {
    MtsTuningStore::load(source).unwrap_or_else(|e| {
        log::warn!("no tuning banks loaded: {e}");
        MtsTuningStore::empty()
    })
}

impl<U: VoiceUnit> BlockProcessor<U> {
    /// Startup path for hosts: reads settings from `storage`, opens the tuning
    /// source those settings point at and builds the processor.
    pub fn from_storage<T: TuningSource>(
        storage: Option<&dyn SettingsPort>,
        tuning_source: impl FnOnce(&EngineSettings) -> T,
        factory: impl FnMut() -> U,
    ) -> Result<Self, SetupError> {
        let settings = load_settings(storage);
        let tunings = load_tunings(&tuning_source(&settings));
        log::info!(
            "starting with {} voices at {} Hz, {} tuning banks",
            settings.max_voices,
            settings.sample_rate_hz,
            tunings.len()
        );
        Self::new(&settings, factory, tunings)
    }
}
