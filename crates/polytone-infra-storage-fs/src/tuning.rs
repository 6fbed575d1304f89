use polytone_ports::storage::EngineSettings;
use polytone_ports::tuning::{RawTuningBank, TuningError, TuningSource};
use std::fs;
use std::path::{Path, PathBuf};

const SYSEX_EXTENSION: &str = ".syx";

/// Directories searched for `*.syx` tuning banks, in order. The first
/// directory holding at least one bank file wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsTuningDirectory {
    dirs: Vec<PathBuf>,
}

impl FsTuningDirectory {
    pub fn new(dir: PathBuf) -> Self {
        Self { dirs: vec![dir] }
    }

    pub fn with_fallbacks(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// `$POLYTONE_HOME/tuning`, else `~/.polytone/tuning`, then
    /// `<data dir>/Polytone/Tuning`.
    pub fn default_dirs() -> Vec<PathBuf> {
        let primary = match std::env::var_os("POLYTONE_HOME") {
            Some(home) => PathBuf::from(home),
            None => dirs_next::home_dir()
                .map(|home| home.join(".polytone"))
                .unwrap_or_else(|| PathBuf::from(".polytone")),
        };
        let mut dirs = vec![primary.join("tuning")];
        if let Some(data) = dirs_next::data_dir() {
            dirs.push(data.join("Polytone").join("Tuning"));
        }
        dirs
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        match &settings.tuning_dir {
            Some(dir) => Self::new(PathBuf::from(dir)),
            None => Self::with_fallbacks(Self::default_dirs()),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn read_dir(dir: &Path) -> Result<Vec<RawTuningBank>, TuningError> {
        let entries = fs::read_dir(dir).map_err(|e| TuningError::Io(e.to_string()))?;
        let mut banks = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    log::warn!("skipping entry in {}: {e}", dir.display());
                    continue;
                }
            };
            let Some(name) = bank_name(&path) else {
                continue;
            };
            match fs::read(&path) {
                Ok(data) => banks.push(RawTuningBank { name, data }),
                Err(e) => log::warn!("skipping tuning file {}: {e}", path.display()),
            }
        }
        Ok(banks)
    }
}

impl TuningSource for FsTuningDirectory {
    fn load_banks(&self) -> Result<Vec<RawTuningBank>, TuningError> {
        let mut found_dir = false;
        for dir in &self.dirs {
            if !dir.is_dir() {
                log::debug!("no tuning directory at {}", dir.display());
                continue;
            }
            found_dir = true;
            let banks = Self::read_dir(dir)?;
            if !banks.is_empty() {
                log::debug!("{} tuning files in {}", banks.len(), dir.display());
                return Ok(banks);
            }
        }
        if found_dir {
            return Ok(Vec::new());
        }
        Err(TuningError::DirectoryNotFound(
            self.dirs
                .first()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        ))
    }
}

/// File name without the `.syx` suffix; `None` for anything else.
fn bank_name(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(SYSEX_EXTENSION)?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}
