#[derive(thiserror::Error, Debug)]
pub enum TuningError {
    #[error("tuning directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("io error: {0}")]
    Io(String),
}

/// Unvalidated contents of one tuning file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTuningBank {
    pub name: String,
    pub data: Vec<u8>,
}

/// Thread model: called once at startup, never from the audio thread.
pub trait TuningSource: Send + Sync {
    fn load_banks(&self) -> Result<Vec<RawTuningBank>, TuningError>;
}
