use crate::types::SampleRateHz;
use serde::{Deserialize, Serialize};

fn default_sample_rate_hz() -> SampleRateHz {
    48_000
}

fn default_max_voices() -> usize {
    16
}

fn default_initial_block_frames() -> usize {
    512
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: SampleRateHz,
    /// Zero turns the processor into a single-instance effect.
    #[serde(default = "default_max_voices")]
    pub max_voices: usize,
    /// Mix buffer capacity reserved up front, in frames.
    #[serde(default = "default_initial_block_frames")]
    pub initial_block_frames: usize,
    pub tuning_dir: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate_hz(),
            max_voices: default_max_voices(),
            initial_block_frames: default_initial_block_frames(),
            tuning_dir: None,
        }
    }
}

impl EngineSettings {
    pub fn is_instrument(&self) -> bool {
        self.max_voices > 0
    }
}

pub trait SettingsPort: Send + Sync {
    fn load_settings(&self) -> Result<EngineSettings, StorageError>;
    fn save_settings(&self, s: &EngineSettings) -> Result<(), StorageError>;
}
