//! Crash-safe file output.

use getrandom::fill;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A single output file written through a temporary sibling.
///
/// Data is first written to `<name>.tmp.<randomhex>` in the same directory
/// and only appears under the final name once it is complete, so readers
/// never observe a partial file.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
    private: bool,
}

impl Storage {
    /// Creates a new Storage instance with the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            private: false,
        }
    }

    /// Like [`Storage::new`], but the file is readable by its owner only (unix).
    pub fn private(path: PathBuf) -> Self {
        Self {
            path,
            private: true,
        }
    }

    /// Returns `true` if the storage file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns the path to the storage file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the entire storage file into memory.
    pub fn load(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// Writes `data`, replacing any existing file atomically.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, data: &[u8]) -> Result<()> {
        let tmp_path = self.write_tmp(data)?;

        if let Err(e) = self.atomic_replace(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        self.sync_parent()
    }

    /// Writes `data` under a name that must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputExists`] if the target is already present. No
    /// file is left behind in that case.
    pub fn publish(&self, data: &[u8]) -> Result<()> {
        if self.exists() {
            return Err(Error::OutputExists(self.path.clone()));
        }

        let tmp_path = self.write_tmp(data)?;

        // hard_link refuses to overwrite, rename would silently replace
        let published = match fs::hard_link(&tmp_path, &self.path) {
            Ok(()) => fs::remove_file(&tmp_path).map_err(Error::from),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(Error::OutputExists(self.path.clone()))
            }
            Err(_) if self.exists() => Err(Error::OutputExists(self.path.clone())),
            Err(_) => fs::rename(&tmp_path, &self.path).map_err(Error::from),
        };

        if let Err(e) = published {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        self.sync_parent()
    }

    fn write_tmp(&self, data: &[u8]) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.random_tmp_path()?;

        let mut options = OpenOptions::new();
        // securely create temp file (fail if exists)
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            if self.private {
                options.mode(0o600);
            }
        }

        let mut tmp_file = options.open(&tmp_path)?;

        let written = tmp_file.write_all(data).and_then(|_| tmp_file.sync_all());
        drop(tmp_file);

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        Ok(tmp_path)
    }

    #[cfg(not(target_os = "windows"))]
    fn sync_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                File::open(parent)?.sync_all()?;
            }
        }
        Ok(())
    }

    #[cfg(target_os = "windows")]
    fn sync_parent(&self) -> Result<()> {
        Ok(())
    }

    /// Generates a unique temporary file path in the same directory.
    ///
    /// Format: `filename.tmp.<randomhex>`
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let mut buf = [0u8; 8]; // 64 bit entropy
        fill(&mut buf).map_err(|_| Error::Random)?;

        let rand_string = buf.iter().map(|b| format!("{:02x}", b)).collect::<String>();

        let file_name = self.path.file_name().ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' has no file name", self.path.display()),
            ))
        })?;

        let tmp_name = format!("{}.tmp.{}", file_name.to_string_lossy(), rand_string);

        Ok(self.path.with_file_name(tmp_name))
    }

    /// Atomically replaces the target file with the temporary file.
    ///
    /// Uses Windows `ReplaceFileW` API with `REPLACEFILE_WRITE_THROUGH` flag
    /// when the target already exists.
    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{REPLACEFILE_WRITE_THROUGH, ReplaceFileW};

        if !self.exists() {
            fs::rename(tmp_path, &self.path)?;
            return Ok(());
        }

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

        // SAFETY:
        // - Strings are valid UTF-16 and null-terminated
        // - Pointers remain valid during the call
        // - Windows does not retain the pointers after return
        let result = unsafe {
            ReplaceFileW(
                target_w.as_ptr(),
                tmp_w.as_ptr(),
                std::ptr::null(),
                REPLACEFILE_WRITE_THROUGH,
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        if result == 0 {
            return Err(io::Error::last_os_error().into());
        }

        Ok(())
    }

    /// Atomically replaces the target file with the temporary file.
    ///
    /// On Unix, `rename()` is atomic when both paths are on the same filesystem.
    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}
