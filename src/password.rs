use std::fmt;

use zeroize::Zeroizing;

use crate::error::{Error, Result};

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 100;

/// Archive encryption password, 8 to 100 characters long.
///
/// The value is wiped on drop and never shows up in `Debug` output.
#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = Zeroizing::new(value.into());
        let chars = value.chars().count();

        if chars < MIN_PASSWORD_CHARS {
            return Err(Error::Encryption(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters long"
            )));
        }
        if chars > MAX_PASSWORD_CHARS {
            return Err(Error::Encryption(format!(
                "password must be at most {MAX_PASSWORD_CHARS} characters long"
            )));
        }

        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}
