//! Sources of the archive encryption password.
//!
//! The backend is picked once by [`select_credential_store`] and then passed
//! to [`crate::ArchiveCipher`] as a capability.

mod file;
mod memory;
mod os;

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

pub use file::PlaintextFileStore;
pub use memory::MemoryStore;
pub use os::OsKeyringStore;

/// Service name the archive password is stored under.
pub const SERVICE: &str = "sereto";
/// Account name the archive password is stored under.
pub const ACCOUNT: &str = "encrypt_attached_archive";

pub trait CredentialSource {
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<Zeroizing<String>>>;

    fn set_secret(&self, service: &str, account: &str, value: &str) -> Result<()>;

    /// Human readable backend name.
    fn name(&self) -> &'static str;

    /// `false` when secrets are kept unencrypted at rest.
    fn is_secure(&self) -> bool {
        true
    }
}

impl<T: CredentialSource + ?Sized> CredentialSource for Box<T> {
    fn get_secret(&self, service: &str, account: &str) -> Result<Option<Zeroizing<String>>> {
        (**self).get_secret(service, account)
    }

    fn set_secret(&self, service: &str, account: &str, value: &str) -> Result<()> {
        (**self).set_secret(service, account, value)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn is_secure(&self) -> bool {
        (**self).is_secure()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// OS keyring, falling back to the plaintext file when it is unavailable.
    #[default]
    Auto,
    /// OS keyring only.
    Os,
    /// Plaintext file only.
    File,
}

impl FromStr for CredentialBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "os" => Ok(Self::Os),
            "file" => Ok(Self::File),
            other => Err(Error::Config(format!(
                "unknown credential backend '{other}' (expected auto, os or file)"
            ))),
        }
    }
}

/// Chooses the credential store for this process.
///
/// With [`CredentialBackend::Auto`] an unavailable OS keyring degrades to the
/// plaintext file at `fallback_file`, reported as a warning.
pub fn select_credential_store(
    backend: CredentialBackend,
    fallback_file: &Path,
) -> Result<Box<dyn CredentialSource>> {
    match backend {
        CredentialBackend::Os => Ok(Box::new(OsKeyringStore::probe()?)),
        CredentialBackend::File => Ok(Box::new(PlaintextFileStore::new(fallback_file))),
        CredentialBackend::Auto => match OsKeyringStore::probe() {
            Ok(store) => {
                debug!("using OS keyring for the archive password");
                Ok(Box::new(store))
            }
            Err(e) => {
                warn!(
                    "{e}; falling back to plaintext credential file '{}'",
                    fallback_file.display()
                );
                Ok(Box::new(PlaintextFileStore::new(fallback_file)))
            }
        },
    }
}
