use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Broad classification of [`Error`] values.
///
/// Callers that only care whether a failure was caused by a bad path, bad
/// data, or a missing password can match on this instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Path,
    Value,
    Encryption,
    Credential,
    Io,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("file '{}' does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("output file '{}' already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("unsupported file format for decryption (not a .sereto): '{}'", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("encrypted data is corrupted or not encrypted with SeReTo ({0})")]
    CorruptedContainer(&'static str),

    #[error("decryption failed: invalid password or corrupted data")]
    AuthenticationFailure,

    #[error("size of {size} bytes is not within the allowed range {min} - {max} bytes")]
    SizeOutOfRange { size: u64, min: u64, max: u64 },

    #[error("multiple '{name}' attachments found ({count})")]
    AmbiguousAttachment { name: String, count: usize },

    #[error("no {} attachment found", .names.iter().map(|n| format!("'{n}'")).collect::<Vec<_>>().join(" or "))]
    MissingAttachment { names: Vec<String> },

    #[error("encryption password is invalid: {0}")]
    Encryption(String),

    #[error("invalid Argon2 parameters: {0}")]
    InvalidKdfParams(String),

    #[error("{field} must contain at least one non-zero byte")]
    ZeroBytes { field: &'static str },

    #[error("OS random generator unavailable")]
    Random,

    #[error("credential store error: {0}")]
    Credential(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileNotFound(_) | Error::OutputExists(_) => ErrorKind::Path,
            Error::UnsupportedFormat(_)
            | Error::CorruptedContainer(_)
            | Error::AuthenticationFailure
            | Error::SizeOutOfRange { .. }
            | Error::AmbiguousAttachment { .. }
            | Error::MissingAttachment { .. }
            | Error::InvalidKdfParams(_)
            | Error::ZeroBytes { .. }
            | Error::Config(_) => ErrorKind::Value,
            Error::Encryption(_) => ErrorKind::Encryption,
            Error::Credential(_) => ErrorKind::Credential,
            Error::Random | Error::Io(_) => ErrorKind::Io,
        }
    }
}
