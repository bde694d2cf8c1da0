//! Fixed 64-byte container header.
//!
//! ```text
//! MAGIC "SeReTo" (6) | NONCE (12) | SALT (16) | PADDING (30)
//! ```
//!
//! The padding is all zeros for containers sealed with the default Argon2
//! parameters, which keeps them byte-identical to older `.sereto` files.
//! Non-default parameters are recorded in the padding as a tagged block:
//!
//! ```text
//! "KDFP" (4) | MEM_COST u32 LE (4) | TIME_COST u32 LE (4) | PARALLELISM u32 LE (4) | ZEROS (14)
//! ```

use super::kdf::KdfParams;
use crate::crypto::{HEADER_LEN, MAGIC_LEN, NONCE_LEN, SALT_LEN};
use crate::error::{Error, Result};

pub const MAGIC: &[u8; MAGIC_LEN] = b"SeReTo";

const NONCE_OFFSET: usize = MAGIC_LEN;
const SALT_OFFSET: usize = NONCE_OFFSET + NONCE_LEN;
const PADDING_OFFSET: usize = SALT_OFFSET + SALT_LEN;

const KDF_TAG: &[u8; 4] = b"KDFP";
const KDF_TAG_LEN: usize = 4;
const U32_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    nonce: [u8; NONCE_LEN],
    salt: [u8; SALT_LEN],
    kdf: KdfParams,
}

impl Header {
    pub const LEN: usize = HEADER_LEN;

    pub fn new(kdf: KdfParams, salt: [u8; SALT_LEN], nonce: [u8; NONCE_LEN]) -> Self {
        Self { nonce, salt, kdf }
    }

    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];

        buf[..MAGIC_LEN].copy_from_slice(MAGIC);
        buf[NONCE_OFFSET..SALT_OFFSET].copy_from_slice(&self.nonce);
        buf[SALT_OFFSET..PADDING_OFFSET].copy_from_slice(&self.salt);

        if !self.kdf.is_default() {
            let mut offset = PADDING_OFFSET;
            buf[offset..offset + KDF_TAG_LEN].copy_from_slice(KDF_TAG);
            offset += KDF_TAG_LEN;

            for value in [
                self.kdf.memory_cost_kib(),
                self.kdf.time_cost(),
                self.kdf.parallelism(),
            ] {
                buf[offset..offset + U32_LEN].copy_from_slice(&value.to_le_bytes());
                offset += U32_LEN;
            }
        }

        buf
    }

    /// Parses the first [`Header::LEN`] bytes of `data`.
    ///
    /// Padding without the KDF tag is opaque and yields the default parameters.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < MAGIC_LEN || &data[..MAGIC_LEN] != MAGIC {
            return Err(Error::CorruptedContainer("invalid magic"));
        }

        if data.len() < Self::LEN {
            return Err(Error::CorruptedContainer("header too short"));
        }

        let nonce: [u8; NONCE_LEN] = data[NONCE_OFFSET..SALT_OFFSET]
            .try_into()
            .map_err(|_| Error::CorruptedContainer("invalid nonce length"))?;

        let salt: [u8; SALT_LEN] = data[SALT_OFFSET..PADDING_OFFSET]
            .try_into()
            .map_err(|_| Error::CorruptedContainer("invalid salt length"))?;

        let kdf = parse_kdf_block(&data[PADDING_OFFSET..Self::LEN])?;

        Ok(Header { nonce, salt, kdf })
    }
}

fn parse_kdf_block(padding: &[u8]) -> Result<KdfParams> {
    if &padding[..KDF_TAG_LEN] != KDF_TAG {
        return Ok(KdfParams::default());
    }

    let read_u32 = |at: usize| -> Result<u32> {
        let bytes: [u8; U32_LEN] = padding[at..at + U32_LEN]
            .try_into()
            .map_err(|_| Error::CorruptedContainer("truncated key derivation parameters"))?;
        Ok(u32::from_le_bytes(bytes))
    };

    let mut offset = KDF_TAG_LEN;
    let memory_cost_kib = read_u32(offset)?;
    offset += U32_LEN;
    let time_cost = read_u32(offset)?;
    offset += U32_LEN;
    let parallelism = read_u32(offset)?;

    KdfParams::new(memory_cost_kib, time_cost, parallelism)
        .map_err(|_| Error::CorruptedContainer("invalid key derivation parameters"))
}
