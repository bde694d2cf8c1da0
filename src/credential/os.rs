use keyring::Entry;
use zeroize::Zeroizing;

use super::CredentialSource;
use crate::error::{Error, Result};

const PROBE_ACCOUNT: &str = "availability_probe";

/// Password storage in the platform keyring (Keychain, Credential Manager,
/// kernel keyutils).
#[derive(Debug, Clone, Copy)]
pub struct OsKeyringStore;

impl OsKeyringStore {
    /// Returns the store if the platform keyring answers a lookup.
    pub fn probe() -> Result<Self> {
        let entry = entry(super::SERVICE, PROBE_ACCOUNT)?;
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(Self),
            Err(e) => Err(Error::Credential(format!("OS keyring unavailable: {e}"))),
        }
    }
}

fn entry(service: &str, account: &str) -> Result<Entry> {
    Entry::new(service, account)
        .map_err(|e| Error::Credential(format!("OS keyring unavailable: {e}")))
}

impl CredentialSource for OsKeyringStore {
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<Zeroizing<String>>> {
        match entry(service, account)?.get_password() {
            Ok(secret) => Ok(Some(Zeroizing::new(secret))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Credential(e.to_string())),
        }
    }

    fn set_secret(&self, service: &str, account: &str, value: &str) -> Result<()> {
        entry(service, account)?
            .set_password(value)
            .map_err(|e| Error::Credential(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "OS keyring"
    }
}
