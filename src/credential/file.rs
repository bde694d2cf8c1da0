use std::collections::BTreeMap;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::CredentialSource;
use crate::error::{Error, Result};
use crate::storage::Storage;

/// Secrets kept unencrypted in a JSON file.
///
/// Used when no OS keyring is reachable. The file is written with owner-only
/// permissions, which is the only protection it gets.
#[derive(Debug, Clone)]
pub struct PlaintextFileStore {
    storage: Storage,
}

#[derive(Serialize, Deserialize, Default)]
struct CredentialFile {
    services: BTreeMap<String, BTreeMap<String, SecretEntry>>,
}

#[derive(Serialize, Deserialize)]
struct SecretEntry {
    secret: String,
    updated: String,
}

impl SecretEntry {
    fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            updated: Local::now().to_rfc3339(),
        }
    }
}

impl PlaintextFileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            storage: Storage::private(path.to_path_buf()),
        }
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    fn read(&self) -> Result<CredentialFile> {
        if !self.storage.exists() {
            return Ok(CredentialFile::default());
        }

        let data = Zeroizing::new(self.storage.load()?);
        serde_json::from_slice(&data).map_err(|e| {
            Error::Credential(format!(
                "failed to parse credential file '{}': {e}",
                self.path().display()
            ))
        })
    }
}

impl CredentialSource for PlaintextFileStore {
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<Zeroizing<String>>> {
        let file = self.read()?;
        Ok(file
            .services
            .get(service)
            .and_then(|accounts| accounts.get(account))
            .map(|entry| Zeroizing::new(entry.secret.clone())))
    }

    fn set_secret(&self, service: &str, account: &str, value: &str) -> Result<()> {
        let mut file = self.read()?;
        file.services
            .entry(service.to_string())
            .or_default()
            .insert(account.to_string(), SecretEntry::new(value));

        let data = Zeroizing::new(
            serde_json::to_vec_pretty(&file)
                .map_err(|e| Error::Credential(format!("failed to serialize credentials: {e}")))?,
        );
        self.storage.save(&data)
    }

    fn name(&self) -> &'static str {
        "plaintext file"
    }

    fn is_secure(&self) -> bool {
        false
    }
}
