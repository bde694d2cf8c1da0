use std::collections::HashMap;
use std::sync::Mutex;

use zeroize::Zeroizing;

use super::CredentialSource;
use crate::error::{Error, Result};

/// Process-local credential store, mainly for tests and embedding.
#[derive(Default)]
pub struct MemoryStore {
    secrets: Mutex<HashMap<(String, String), Zeroizing<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with the archive password.
    pub fn with_password(password: &str) -> Self {
        let mut secrets = HashMap::new();
        secrets.insert(
            (super::SERVICE.to_string(), super::ACCOUNT.to_string()),
            Zeroizing::new(password.to_string()),
        );
        Self {
            secrets: Mutex::new(secrets),
        }
    }
}

impl CredentialSource for MemoryStore {
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<Zeroizing<String>>> {
        let secrets = self
            .secrets
            .lock()
            .map_err(|_| Error::Credential("memory store poisoned".to_string()))?;
        Ok(secrets
            .get(&(service.to_string(), account.to_string()))
            .cloned())
    }

    fn set_secret(&self, service: &str, account: &str, value: &str) -> Result<()> {
        let mut secrets = self
            .secrets
            .lock()
            .map_err(|_| Error::Credential("memory store poisoned".to_string()))?;
        secrets.insert(
            (service.to_string(), account.to_string()),
            Zeroizing::new(value.to_string()),
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
