use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use getrandom::fill;
use zeroize::Zeroizing;

use super::{KEY_LEN, NONCE_LEN, SALT_LEN};
use crate::error::{Error, Result};

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| Error::Random)
}

/// Reject values made only of zero bytes.
pub fn ensure_non_zero(bytes: &[u8], field: &'static str) -> Result<()> {
    if bytes.iter().all(|&b| b == 0) {
        return Err(Error::ZeroBytes { field });
    }
    Ok(())
}

/// Generate salt
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    secure_random(&mut salt)?;
    ensure_non_zero(&salt, "salt")?;
    Ok(salt)
}

/// Generate a 96-bit GCM nonce
pub fn generate_nonce() -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    secure_random(&mut nonce)?;
    ensure_non_zero(&nonce, "nonce")?;
    Ok(nonce)
}

/// Encrypt plaintext with AES-256-GCM under a fresh nonce.
///
/// The returned ciphertext carries the 16-byte tag at its end.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN])> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let nonce = generate_nonce()?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| Error::Encryption("AES-GCM encryption failed".to_string()))?;

    Ok((ciphertext, nonce))
}

/// Decrypt ciphertext
///
/// Nothing is returned unless the tag verifies.
pub fn decrypt(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::AuthenticationFailure)?;
    Ok(Zeroizing::new(plaintext))
}
