use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::credential::CredentialBackend;
use crate::crypto::KdfParams;
use crate::error::{Error, Result};
use crate::guard::MAX_ARCHIVE_BYTES;

const CONFIG_FILE: &str = "config.json";
const CREDENTIAL_FILE: &str = "credentials.json";

/// Runtime settings, read from `config.json` in the platform config directory
/// unless a path is given explicitly.
///
/// ```json
/// {
///   "credential_backend": "auto",
///   "credential_file": "/home/me/.local/share/sereto/credentials.json",
///   "max_archive_bytes": 1073741824,
///   "kdf": { "memory_cost_kib": 1048576, "time_cost": 4, "parallelism": 8 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credential_backend: CredentialBackend,
    pub credential_file: PathBuf,
    pub max_archive_bytes: u64,
    pub kdf: KdfParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credential_backend: CredentialBackend::default(),
            credential_file: default_credential_file(),
            max_archive_bytes: MAX_ARCHIVE_BYTES,
            kdf: KdfParams::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read '{}': {e}", path.display()))
        })?;

        let config: Self = serde_json::from_str(&data).map_err(|e| {
            Error::Config(format!("failed to parse '{}': {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, else the default config file if it exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match default_config_file() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.kdf.validate()?;
        if self.max_archive_bytes == 0 {
            return Err(Error::Config("max_archive_bytes must be positive".to_string()));
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "sereto")
}

pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

pub fn default_credential_file() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(CREDENTIAL_FILE))
        .unwrap_or_else(|| PathBuf::from(".sereto").join(CREDENTIAL_FILE))
}
