//! Locating the project source archive among a report's attachments.
//!
//! An encrypted `source.sereto` takes precedence over a plain `source.tgz`.
//! A name that occurs more than once is an error, never a guess.

use std::path::{Path, PathBuf};

use tracing::info;
use zeroize::Zeroizing;

use crate::ArchiveCipher;
use crate::error::{Error, Result};
use crate::storage::Storage;

/// Attachment name of the encrypted archive.
pub const ENCRYPTED_ARCHIVE_NAME: &str = "source.sereto";
/// Attachment name of the plain archive.
pub const PLAIN_ARCHIVE_NAME: &str = "source.tgz";

/// Named binary attachments of a document. Names are not unique.
pub trait AttachmentStore {
    /// Every blob attached under exactly `name`.
    fn attachments(&self, name: &str) -> Result<Vec<Vec<u8>>>;

    fn add_attachment(&mut self, name: &str, data: Vec<u8>) -> Result<()>;
}

/// In-memory attachment table.
#[derive(Debug, Default, Clone)]
pub struct Attachments {
    entries: Vec<(String, Vec<u8>)>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.entries.push((name.to_string(), data.into()));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AttachmentStore for Attachments {
    fn attachments(&self, name: &str) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .entries
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, data)| data.clone())
            .collect())
    }

    fn add_attachment(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        self.entries.push((name.to_string(), data));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveSource {
    /// Decrypted from `source.sereto`.
    Encrypted,
    /// Taken verbatim from `source.tgz`.
    Plain,
}

/// The plaintext archive and where it came from.
pub struct ResolvedArchive {
    pub source: ArchiveSource,
    pub bytes: Zeroizing<Vec<u8>>,
}

fn single_attachment<D: AttachmentStore + ?Sized>(document: &D, name: &str) -> Result<Option<Vec<u8>>> {
    let mut found = document.attachments(name)?;
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        count => Err(Error::AmbiguousAttachment {
            name: name.to_string(),
            count,
        }),
    }
}

/// Produces the plaintext source archive carried by `document`.
pub fn resolve_archive<D: AttachmentStore + ?Sized>(
    document: &D,
    cipher: &ArchiveCipher,
) -> Result<ResolvedArchive> {
    if let Some(container) = single_attachment(document, ENCRYPTED_ARCHIVE_NAME)? {
        info!("found '{ENCRYPTED_ARCHIVE_NAME}' attachment");
        let bytes = cipher.decrypt_bytes(&container)?;
        return Ok(ResolvedArchive {
            source: ArchiveSource::Encrypted,
            bytes,
        });
    }

    if let Some(archive) = single_attachment(document, PLAIN_ARCHIVE_NAME)? {
        info!("found unencrypted '{PLAIN_ARCHIVE_NAME}' attachment");
        return Ok(ResolvedArchive {
            source: ArchiveSource::Plain,
            bytes: Zeroizing::new(archive),
        });
    }

    Err(Error::MissingAttachment {
        names: vec![
            ENCRYPTED_ARCHIVE_NAME.to_string(),
            PLAIN_ARCHIVE_NAME.to_string(),
        ],
    })
}

/// Writes the resolved archive to `dir/source.tgz` and returns its path.
pub fn retrieve_to_file<D: AttachmentStore + ?Sized>(
    document: &D,
    cipher: &ArchiveCipher,
    dir: &Path,
) -> Result<PathBuf> {
    let resolved = resolve_archive(document, cipher)?;
    let path = dir.join(PLAIN_ARCHIVE_NAME);

    Storage::private(path.clone()).publish(&resolved.bytes)?;
    info!("extracted source archive to '{}'", path.display());

    Ok(path)
}

/// Attaches an encrypted container as `source.sereto`.
///
/// Refuses when the document already carries one, since a second copy would
/// make retrieval ambiguous.
pub fn embed_archive<D: AttachmentStore + ?Sized>(document: &mut D, container: Vec<u8>) -> Result<()> {
    let existing = document.attachments(ENCRYPTED_ARCHIVE_NAME)?.len();
    if existing > 0 {
        return Err(Error::AmbiguousAttachment {
            name: ENCRYPTED_ARCHIVE_NAME.to_string(),
            count: existing + 1,
        });
    }

    document.add_attachment(ENCRYPTED_ARCHIVE_NAME, container)?;
    info!("embedded '{ENCRYPTED_ARCHIVE_NAME}' attachment");
    Ok(())
}
