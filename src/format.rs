//! Container codec for `.sereto` files.
//!
//! ```text
//! HEADER (64) | CIPHERTEXT + GCM TAG
//! ```

use crate::crypto::Header;
use crate::error::{Error, Result};

/// File extension of encrypted archives.
pub const CONTAINER_EXTENSION: &str = "sereto";
/// File extension of plaintext archives.
pub const ARCHIVE_EXTENSION: &str = "tgz";
/// Header plus at least one tag byte.
pub const MIN_CONTAINER_LEN: usize = Header::LEN + 1;

/// A parsed container borrowing its ciphertext from the input buffer.
#[derive(Debug)]
pub struct Container<'a> {
    header: Header,
    ciphertext: &'a [u8],
}

impl<'a> Container<'a> {
    /// Returns the header carrying nonce, salt and KDF parameters.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the ciphertext with the authentication tag.
    pub fn ciphertext(&self) -> &'a [u8] {
        self.ciphertext
    }
}

/// Serializes a header followed by `ciphertext`.
pub fn encode(header: &Header, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(Header::LEN + ciphertext.len());
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(ciphertext);
    buf
}

/// Parses a container.
///
/// # Errors
///
/// Returns [`Error::CorruptedContainer`] if:
/// - The magic bytes are invalid
/// - The data is shorter than [`MIN_CONTAINER_LEN`]
pub fn decode(data: &[u8]) -> Result<Container<'_>> {
    let header = Header::from_bytes(data)?;

    if data.len() < MIN_CONTAINER_LEN {
        return Err(Error::CorruptedContainer("missing authentication tag"));
    }

    Ok(Container {
        header,
        ciphertext: &data[Header::LEN..],
    })
}
