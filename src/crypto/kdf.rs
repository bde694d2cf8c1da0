use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{KEY_LEN, SALT_LEN, aead};
use crate::error::{Error, Result};

const MAX_MEMORY_COST_KIB: u32 = 4 * 1024 * 1024; // 4 GiB
const MAX_TIME_COST: u32 = 64;
const MAX_PARALLELISM: u32 = 64;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    memory_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            // 1 GiB working set
            memory_cost_kib: 1_048_576,
            time_cost: 4,
            parallelism: 8,
        }
    }
}

impl KdfParams {
    pub fn new(memory_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            memory_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn memory_cost_kib(&self) -> u32 {
        self.memory_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    /// Returns `true` for the parameters legacy containers were created with.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Component-wise maximum of `self` and `other`.
    pub fn componentwise_max(self, other: Self) -> Self {
        Self {
            memory_cost_kib: self.memory_cost_kib.max(other.memory_cost_kib),
            time_cost: self.time_cost.max(other.time_cost),
            parallelism: self.parallelism.max(other.parallelism),
        }
    }

    /// Returns `true` when no cost exceeds the matching cost of `ceiling`.
    pub fn fits_within(&self, ceiling: &Self) -> bool {
        self.memory_cost_kib <= ceiling.memory_cost_kib
            && self.time_cost <= ceiling.time_cost
            && self.parallelism <= ceiling.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::InvalidKdfParams(msg.to_string()));

        if self.time_cost < 1 {
            return invalid("time cost must be >= 1");
        }
        if self.time_cost > MAX_TIME_COST {
            return invalid("time cost is unreasonably high");
        }
        if self.parallelism < 1 {
            return invalid("parallelism must be >= 1");
        }
        if self.parallelism > MAX_PARALLELISM {
            return invalid("parallelism is unreasonably high");
        }
        if self.memory_cost_kib < 8 * self.parallelism {
            return invalid("memory cost must be at least 8 * parallelism");
        }
        if self.memory_cost_kib > MAX_MEMORY_COST_KIB {
            return invalid("memory cost exceeds 4 GiB");
        }
        Ok(())
    }
}

/// Output of [`derive_key`]: the key together with the salt it was derived from.
pub struct DerivedKey {
    pub key: Zeroizing<[u8; KEY_LEN]>,
    pub salt: [u8; SALT_LEN],
}

/// Derive a 32-byte key from `password` with Argon2id.
///
/// A fresh random salt is generated when `salt` is `None`. For a fixed salt
/// the result is deterministic, which is what lets decryption rebuild the key
/// from the salt stored in the container header.
pub fn derive_key(password: &str, salt: Option<[u8; SALT_LEN]>, kdf: KdfParams) -> Result<DerivedKey> {
    kdf.validate()?;

    let salt = match salt {
        Some(salt) => {
            aead::ensure_non_zero(&salt, "salt")?;
            salt
        }
        None => aead::generate_salt()?,
    };

    let params = Params::new(
        kdf.memory_cost_kib,
        kdf.time_cost,
        kdf.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| Error::InvalidKdfParams(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), &salt, &mut key[..])
        .map_err(|e| Error::InvalidKdfParams(format!("argon2 key derivation failed: {e}")))?;

    Ok(DerivedKey { key, salt })
}
