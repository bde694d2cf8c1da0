//! Password-based encryption of SeReTo project source archives.
//!
//! A plaintext archive (`.tgz`) is sealed into a `.sereto` container:
//! a fixed 64-byte header carrying the nonce and salt, followed by the
//! AES-256-GCM ciphertext. The key is derived from a password held by a
//! [`CredentialSource`] using Argon2id.

pub mod config;
pub mod credential;
pub mod crypto;
mod error;
pub mod format;
pub mod guard;
mod password;
pub mod retrieval;
mod storage;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zeroize::Zeroizing;

pub use crate::config::Config;
pub use crate::credential::{CredentialBackend, CredentialSource, select_credential_store};
pub use crate::crypto::KdfParams;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::guard::{AlwaysConfirm, Confirm, NeverConfirm, SizeRange, TerminalConfirm};
pub use crate::password::Password;
pub use crate::retrieval::{
    ArchiveSource, AttachmentStore, Attachments, ResolvedArchive, embed_archive, resolve_archive,
    retrieve_to_file,
};
pub use crate::storage::Storage;

use crate::crypto::Header;
use crate::format::{ARCHIVE_EXTENSION, CONTAINER_EXTENSION, MIN_CONTAINER_LEN};
use crate::guard::MAX_ARCHIVE_BYTES;

/// Encrypts and decrypts source archives with the password from a credential store.
pub struct ArchiveCipher {
    credentials: Box<dyn CredentialSource>,
    confirm: Box<dyn Confirm>,
    kdf: KdfParams,
    max_bytes: u64,
}

impl ArchiveCipher {
    /// Cipher with default Argon2 parameters, a 1 GiB limit and terminal confirmation.
    pub fn new(credentials: Box<dyn CredentialSource>) -> Self {
        Self {
            credentials,
            confirm: Box::new(TerminalConfirm),
            kdf: KdfParams::default(),
            max_bytes: MAX_ARCHIVE_BYTES,
        }
    }

    pub fn from_config(config: &Config, credentials: Box<dyn CredentialSource>) -> Self {
        Self::new(credentials)
            .with_kdf(config.kdf)
            .with_max_bytes(config.max_archive_bytes)
    }

    /// Argon2 parameters used for new containers.
    ///
    /// Decryption always uses the parameters recorded in the container.
    pub fn with_kdf(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    pub fn with_confirm(mut self, confirm: Box<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn credentials(&self) -> &dyn CredentialSource {
        self.credentials.as_ref()
    }

    fn load_password(&self) -> Result<Password> {
        let secret = self
            .credentials
            .get_secret(credential::SERVICE, credential::ACCOUNT)?
            .ok_or_else(|| {
                warn!("no password for archive encryption found in {}", self.credentials.name());
                Error::Encryption("password not found".to_string())
            })?;

        Password::new(secret.as_str()).inspect_err(|e| {
            warn!("invalid password for archive encryption: {e}");
        })
    }

    fn plaintext_range(&self) -> SizeRange {
        SizeRange::clamped(1, self.max_bytes)
    }

    fn container_range(&self) -> SizeRange {
        SizeRange::clamped(MIN_CONTAINER_LEN as u64, self.max_bytes)
    }

    fn seal(&self, password: &Password, plaintext: &[u8]) -> Result<Vec<u8>> {
        let derived = crypto::derive_key(password.expose(), None, self.kdf)?;
        let (ciphertext, nonce) = crypto::encrypt(&derived.key, plaintext)?;

        let header = Header::new(self.kdf, derived.salt, nonce);
        Ok(format::encode(&header, &ciphertext))
    }

    fn open(&self, password: &Password, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let container = format::decode(data)?;
        let header = container.header();

        crypto::ensure_non_zero(header.nonce(), "nonce")?;

        // header is unauthenticated, bound the work it can request
        let ceiling = self.kdf.componentwise_max(KdfParams::default());
        if !header.kdf().fits_within(&ceiling) {
            warn!(
                "container requests Argon2 costs {:?} above the allowed {:?}",
                header.kdf(),
                ceiling
            );
            return Err(Error::CorruptedContainer(
                "key derivation parameters exceed the allowed cost",
            ));
        }

        let derived = crypto::derive_key(password.expose(), Some(*header.salt()), *header.kdf())?;

        crypto::decrypt(&derived.key, header.nonce(), container.ciphertext())
    }

    /// Seals `plaintext` into container bytes.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let password = self.load_password()?;
        self.plaintext_range()
            .check("archive", plaintext.len() as u64, self.confirm.as_ref())?;

        self.seal(&password, plaintext)
    }

    /// Opens container bytes. Returns nothing unless authentication succeeds.
    pub fn decrypt_bytes(&self, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let password = self.load_password()?;
        self.container_range()
            .check("encrypted archive", data.len() as u64, self.confirm.as_ref())?;

        self.open(&password, data)
    }

    /// Encrypts `file` into a sibling `.sereto` file and returns its path.
    ///
    /// The plaintext file is deleted unless `keep_original` is set.
    pub fn encrypt_file(&self, file: &Path, keep_original: bool) -> Result<PathBuf> {
        if !file.is_file() {
            return Err(Error::FileNotFound(file.to_path_buf()));
        }

        let password = self.load_password()?;
        self.plaintext_range().check_file(file, self.confirm.as_ref())?;

        info!("found password for archive encryption, encrypting '{}'", file.display());

        let plaintext = Zeroizing::new(fs::read(file)?);
        let container = self.seal(&password, &plaintext)?;
        drop(password);

        let output = file.with_extension(CONTAINER_EXTENSION);
        Storage::new(output.clone()).publish(&container)?;
        info!("archive successfully encrypted to '{}'", output.display());

        if !keep_original {
            fs::remove_file(file)?;
            info!("deleted original file '{}'", file.display());
        }

        Ok(output)
    }

    /// Decrypts a `.sereto` file into a sibling `.tgz` file and returns its path.
    ///
    /// The encrypted file is deleted only when `keep_original` is `false`.
    pub fn decrypt_file(&self, file: &Path, keep_original: bool) -> Result<PathBuf> {
        if !file.is_file() {
            return Err(Error::FileNotFound(file.to_path_buf()));
        }

        if file.extension().and_then(|ext| ext.to_str()) != Some(CONTAINER_EXTENSION) {
            return Err(Error::UnsupportedFormat(file.to_path_buf()));
        }

        let password = self.load_password()?;
        info!("found password for archive decryption, decrypting '{}'", file.display());

        self.container_range().check_file(file, self.confirm.as_ref())?;

        let data = fs::read(file)?;
        let plaintext = self.open(&password, &data)?;
        drop(password);

        let output = file.with_extension(ARCHIVE_EXTENSION);
        Storage::private(output.clone()).publish(&plaintext)?;
        info!("decrypted archive to '{}'", output.display());

        if !keep_original {
            fs::remove_file(file)?;
            info!("deleted encrypted archive '{}'", file.display());
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::MemoryStore;
    use tempfile::tempdir;

    fn cipher_with(password: &str) -> ArchiveCipher {
        ArchiveCipher::new(Box::new(MemoryStore::with_password(password)))
            .with_kdf(KdfParams::new(256, 1, 1).unwrap())
            .with_confirm(Box::new(NeverConfirm))
    }

    #[test]
    fn bytes_roundtrip() {
        let cipher = cipher_with("password123");
        let container = cipher.encrypt_bytes(b"secret data").unwrap();

        assert_eq!(container.len(), 64 + b"secret data".len() + 16);
        assert_eq!(*cipher.decrypt_bytes(&container).unwrap(), b"secret data");
    }

    #[test]
    fn wrong_password_fails_authentication() {
        let container = cipher_with("password123").encrypt_bytes(b"data").unwrap();

        assert!(matches!(
            cipher_with("password456").decrypt_bytes(&container),
            Err(Error::AuthenticationFailure)
        ));
    }

    #[test]
    fn missing_password_is_encryption_error() {
        let cipher = ArchiveCipher::new(Box::new(MemoryStore::new()))
            .with_kdf(KdfParams::new(256, 1, 1).unwrap());

        let err = cipher.encrypt_bytes(b"data").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encryption);
    }

    #[test]
    fn short_password_is_encryption_error() {
        let err = cipher_with("short").encrypt_bytes(b"data").unwrap_err();
        assert!(matches!(err, Error::Encryption(_)));
    }

    #[test]
    fn empty_plaintext_needs_confirmation() {
        assert!(matches!(
            cipher_with("password123").encrypt_bytes(b""),
            Err(Error::SizeOutOfRange { size: 0, .. })
        ));

        let cipher = cipher_with("password123").with_confirm(Box::new(AlwaysConfirm));
        let container = cipher.encrypt_bytes(b"").unwrap();
        assert!(cipher.decrypt_bytes(&container).unwrap().is_empty());
    }

    #[test]
    fn custom_params_are_recorded_in_header() {
        let cipher = cipher_with("password123");
        let container = cipher.encrypt_bytes(b"data").unwrap();
        let parsed = format::decode(&container).unwrap();

        assert_eq!(parsed.header().kdf(), cipher.kdf());
        assert_eq!(&container[34..38], b"KDFP");
    }

    #[test]
    fn encrypt_file_replaces_plaintext() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("source.tgz");
        fs::write(&input, b"tarball").unwrap();

        let output = cipher_with("password123").encrypt_file(&input, false).unwrap();

        assert_eq!(output, dir.path().join("source.sereto"));
        assert!(!input.exists());
        assert_eq!(&fs::read(&output).unwrap()[..6], b"SeReTo");
    }

    #[test]
    fn encrypt_file_keeps_original_on_request() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("source.tgz");
        fs::write(&input, b"tarball").unwrap();

        cipher_with("password123").encrypt_file(&input, true).unwrap();

        assert!(input.exists());
    }

    #[test]
    fn encrypt_missing_file_is_path_error() {
        let dir = tempdir().unwrap();
        let err = cipher_with("password123")
            .encrypt_file(&dir.path().join("missing.tgz"), false)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Path);
    }

    #[test]
    fn decrypt_file_roundtrip() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("source.tgz");
        fs::write(&input, b"tarball").unwrap();

        let cipher = cipher_with("password123");
        let encrypted = cipher.encrypt_file(&input, false).unwrap();
        let decrypted = cipher.decrypt_file(&encrypted, true).unwrap();

        assert_eq!(decrypted, input);
        assert_eq!(fs::read(&decrypted).unwrap(), b"tarball");
        assert!(encrypted.exists());
    }

    #[test]
    fn decrypt_file_can_remove_container() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("source.tgz");
        fs::write(&input, b"tarball").unwrap();

        let cipher = cipher_with("password123");
        let encrypted = cipher.encrypt_file(&input, false).unwrap();
        cipher.decrypt_file(&encrypted, false).unwrap();

        assert!(!encrypted.exists());
    }

    #[test]
    fn decrypt_rejects_wrong_extension() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("source.tgz");
        fs::write(&input, [1u8; 128]).unwrap();

        assert!(matches!(
            cipher_with("password123").decrypt_file(&input, true),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn decrypt_rejects_header_only_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("source.sereto");
        let mut data = vec![0u8; 64];
        data[..6].copy_from_slice(b"SeReTo");
        fs::write(&input, data).unwrap();

        assert!(matches!(
            cipher_with("password123").decrypt_file(&input, true),
            Err(Error::SizeOutOfRange { size: 64, .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn decrypted_archive_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let input = dir.path().join("source.tgz");
        fs::write(&input, b"tarball").unwrap();

        let cipher = cipher_with("password123");
        let encrypted = cipher.encrypt_file(&input, false).unwrap();
        let decrypted = cipher.decrypt_file(&encrypted, true).unwrap();

        let mode = fs::metadata(decrypted).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn costly_kdf_block_is_rejected_before_derivation() {
        let cipher = cipher_with("password123");
        let mut container = cipher.encrypt_bytes(b"data").unwrap();

        container[34..38].copy_from_slice(b"KDFP");
        container[38..42].copy_from_slice(&4_194_304u32.to_le_bytes());
        container[42..46].copy_from_slice(&64u32.to_le_bytes());
        container[46..50].copy_from_slice(&64u32.to_le_bytes());

        assert!(matches!(
            cipher.decrypt_bytes(&container),
            Err(Error::CorruptedContainer(_))
        ));
    }

    #[test]
    fn configured_costs_above_defaults_still_open() {
        let cipher = cipher_with("password123").with_kdf(KdfParams::new(256, 5, 1).unwrap());
        let container = cipher.encrypt_bytes(b"data").unwrap();

        assert_eq!(*cipher.decrypt_bytes(&container).unwrap(), b"data");
        assert!(matches!(
            cipher_with("password123").decrypt_bytes(&container),
            Err(Error::CorruptedContainer(_))
        ));
    }

    #[test]
    fn decrypt_does_not_overwrite_existing_output() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("source.tgz");
        fs::write(&input, b"tarball").unwrap();

        let cipher = cipher_with("password123");
        let encrypted = cipher.encrypt_file(&input, true).unwrap();

        assert!(matches!(
            cipher.decrypt_file(&encrypted, false),
            Err(Error::OutputExists(_))
        ));
        assert!(encrypted.exists());
    }
}
