mod settings;
mod tuning;

pub use settings::FsSettingsStore;
pub use tuning::FsTuningDirectory;
