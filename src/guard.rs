//! Size limits for archives and the confirmation hook used when they are exceeded.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

use tracing::warn;

use crate::error::{Error, Result};

/// Default upper bound for archives (1 GiB).
pub const MAX_ARCHIVE_BYTES: u64 = 1_073_741_824;

/// Asks whether to continue despite a violated limit.
pub trait Confirm {
    fn confirm(&self, message: &str) -> bool;
}

/// Prompts on the terminal; declines when stdin is not interactive.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, message: &str) -> bool {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return false;
        }

        let mut stderr = io::stderr();
        if write!(stderr, "{message} [y/N]: ").and_then(|_| stderr.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }

        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}

/// Inclusive byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRange {
    min: u64,
    max: u64,
}

impl SizeRange {
    pub fn new(min: u64, max: u64) -> Result<Self> {
        if min > max {
            return Err(Error::Config(format!(
                "invalid size threshold range: {min} - {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Range `min..=max`, raising `max` to `min` if it is smaller.
    pub fn clamped(min: u64, max: u64) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn contains(&self, size: u64) -> bool {
        (self.min..=self.max).contains(&size)
    }

    /// Passes when `size` is in range or the user agrees to continue.
    ///
    /// `subject` names the data in log output and in the prompt.
    pub fn check(&self, subject: &str, size: u64, confirm: &dyn Confirm) -> Result<()> {
        if self.contains(size) {
            return Ok(());
        }

        warn!(
            "{subject} size is {size} bytes, which is not within the allowed range {} - {} bytes",
            self.min, self.max
        );

        if confirm.confirm("Do you want to continue?") {
            return Ok(());
        }

        Err(Error::SizeOutOfRange {
            size,
            min: self.min,
            max: self.max,
        })
    }

    pub fn check_file(&self, path: &Path, confirm: &dyn Confirm) -> Result<()> {
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let size = path.metadata()?.len();
        self.check(&format!("file '{}'", path.display()), size, confirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn in_range_passes_without_prompt() {
        let range = SizeRange::new(1, 10).unwrap();
        assert!(range.check("data", 5, &NeverConfirm).is_ok());
        assert!(range.check("data", 1, &NeverConfirm).is_ok());
        assert!(range.check("data", 10, &NeverConfirm).is_ok());
    }

    #[test]
    fn out_of_range_declined_fails() {
        let range = SizeRange::new(1, 10).unwrap();
        match range.check("data", 0, &NeverConfirm) {
            Err(Error::SizeOutOfRange { size, min, max }) => {
                assert_eq!((size, min, max), (0, 1, 10));
            }
            other => panic!("expected SizeOutOfRange, got: {other:?}"),
        }
        assert!(range.check("data", 11, &NeverConfirm).is_err());
    }

    #[test]
    fn out_of_range_confirmed_passes() {
        let range = SizeRange::new(1, 10).unwrap();
        assert!(range.check("data", 11, &AlwaysConfirm).is_ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(SizeRange::new(10, 1).is_err());
        assert_eq!(SizeRange::clamped(10, 1).max(), 10);
    }

    #[test]
    fn check_file_uses_file_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archive.tgz");
        std::fs::write(&path, [0u8; 64]).unwrap();

        let range = SizeRange::new(65, 100).unwrap();
        assert!(range.check_file(&path, &NeverConfirm).is_err());

        let range = SizeRange::new(64, 100).unwrap();
        assert!(range.check_file(&path, &NeverConfirm).is_ok());
    }

    #[test]
    fn check_file_missing_is_path_error() {
        let dir = tempdir().unwrap();
        let range = SizeRange::new(0, 1).unwrap();
        assert!(matches!(
            range.check_file(&dir.path().join("missing"), &AlwaysConfirm),
            Err(Error::FileNotFound(_))
        ));
    }
}
