//! Cryptographic primitives for source archive containers.
//!
//! Provides Argon2id key derivation, AES-256-GCM sealing and the fixed
//! 64-byte container header.

pub mod aead;
pub mod header;
pub mod kdf;

pub use aead::{decrypt, encrypt, ensure_non_zero, generate_nonce, generate_salt};
pub use header::Header;
pub use kdf::{DerivedKey, KdfParams, derive_key};

/// Length of the salt (16 bytes).
pub const SALT_LEN: usize = 16;
/// Length of the nonce (12 bytes, the 96-bit IV recommended for GCM).
pub const NONCE_LEN: usize = 12;
/// Length of the encryption key (32 bytes / AES-256).
pub const KEY_LEN: usize = 32;
/// Length of the GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;
/// Length of the magic bytes (6 bytes "SeReTo").
pub const MAGIC_LEN: usize = 6;
/// Total length of the container header, padding included.
pub const HEADER_LEN: usize = 64;
