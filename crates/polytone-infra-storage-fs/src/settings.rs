use polytone_ports::storage::{EngineSettings, SettingsPort, StorageError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

/// Engine settings kept as pretty-printed JSON in a single file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsSettingsStore {
    path: PathBuf,
}

impl FsSettingsStore {
    /// `settings.json` inside `dir`.
    pub fn new(dir: PathBuf) -> Self {
        Self::at(dir.join(SETTINGS_FILE))
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// `$POLYTONE_HOME/settings.json`, else `<config dir>/Polytone/settings.json`.
    pub fn default_path() -> Result<PathBuf, StorageError> {
        if let Some(home) = std::env::var_os("POLYTONE_HOME") {
            return Ok(PathBuf::from(home).join(SETTINGS_FILE));
        }
        let config = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("no config directory on this platform".to_string()))?;
        Ok(config.join("Polytone").join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FsSettingsStore {
    fn default() -> Self {
        let path = Self::default_path().unwrap_or_else(|e| {
            log::warn!("{e}; keeping settings in the working directory");
            PathBuf::from(SETTINGS_FILE)
        });
        Self::at(path)
    }
}

impl SettingsPort for FsSettingsStore {
    fn load_settings(&self) -> Result<EngineSettings, StorageError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("no settings at {}, using defaults", self.path.display());
                return Ok(EngineSettings::default());
            }
            Err(e) => return Err(StorageError::Io(format!("{}: {e}", self.path.display()))),
        };
        serde_json::from_slice(&data)
            .map_err(|e| StorageError::Serde(format!("{}: {e}", self.path.display())))
    }

    /// Writes a staging file next to the target, then renames it into place.
    fn save_settings(&self, s: &EngineSettings) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let data = serde_json::to_vec_pretty(s).map_err(|e| StorageError::Serde(e.to_string()))?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, data).map_err(|e| StorageError::Io(e.to_string()))?;
        fs::rename(&staging, &self.path).map_err(|e| StorageError::Io(e.to_string()))?;
        log::debug!("saved settings to {}", self.path.display());
        Ok(())
    }
}
