// Consensus-critical. Changes require review + tests.
//! Canonical value types.
//!
//! Hashes are stored big-endian: byte 0 is the most significant byte when a
//! hash is compared against a difficulty target.

use crate::constants::*;
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors raised while parsing hashes or extending the chain index.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A hash string was valid hex but not 32 bytes long.
    #[error("hash must be 32 bytes, got {0}")]
    HashLength(usize),

    /// A hash string was not hex.
    #[error("hash is not hex: {0}")]
    HashHex(#[from] hex::FromHexError),

    /// An appended entry did not sit directly on top of the current tip.
    #[error("unexpected height: expected {expected}, got {got}")]
    UnexpectedHeight {
        /// Height the index expected next.
        expected: u64,
        /// Height carried by the rejected entry.
        got: u64,
    },

    /// An appended entry does not link to the current tip hash.
    #[error("previous hash mismatch at height {height}")]
    PrevMismatch {
        /// Height of the rejected entry.
        height: u64,
    },
}

/// Block hash as a big-endian 256-bit number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hash32(pub [u8; HASH32_LEN]);

impl Hash32 {
    /// All-zero hash, used as the previous hash of the first entry.
    pub const fn zero() -> Self {
        Self([0u8; HASH32_LEN])
    }

    /// Big-endian bytes, most significant first.
    pub const fn as_bytes(&self) -> &[u8; HASH32_LEN] {
        &self.0
    }

    /// Builds a hash from little-endian bytes (least significant byte first),
    /// the order most hash functions emit for Bitcoin-style block hashes.
    pub fn from_le_bytes(mut bytes: [u8; HASH32_LEN]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    /// True for the all-zero hash.
    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash32").field(&format_args!("{self}")).finish()
    }
}

/// Parses 64 hex digits, with or without a `0x` prefix, most significant byte
/// first.
impl FromStr for Hash32 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)?;
        let len = bytes.len();
        <[u8; HASH32_LEN]>::try_from(bytes)
            .map(Self)
            .map_err(|_| CoreError::HashLength(len))
    }
}

/// Block hash type.
pub type BlockHash = Hash32;
