// Consensus-critical. Changes require review + tests.
//! Compact target codec and 256-bit target arithmetic.
//!
//! Block records carry difficulty as Bitcoin-style "compact" bits:
//! `bits = (size << 24) | mantissa`, where `size` is a byte count and the
//! mantissa holds 3 bytes with bit 23 acting as a sign flag. The target is
//! `mantissa * 256^(size - 3)`.
//!
//! Targets are held in `BigUint` but always behave as fixed-width 256-bit
//! values: every operation that can grow a value truncates to 256 bits and
//! reports whether it did, so results match a wrapping `uint256`.

use crate::error::ConsensusError;
use hashgate_core::Hash32;
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Width of a target in bits.
pub const TARGET_WIDTH_BITS: u64 = 256;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// Result of decoding compact bits, with the codec's diagnostic flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedCompact {
    /// Decoded value, truncated to 256 bits.
    pub target: BigUint,
    /// The sign bit was set on a non-zero mantissa.
    pub negative: bool,
    /// The encoded value does not fit in 256 bits.
    pub overflow: bool,
}

/// Decode compact `bits`, reporting negative and overflow conditions instead
/// of rejecting them.
pub fn decode_compact(bits: u32) -> DecodedCompact {
    let size = bits >> 24;
    let mut word = bits & MANTISSA_MASK;

    let target = if size <= 3 {
        word >>= 8 * (3 - size);
        BigUint::from(word)
    } else {
        truncate_256(BigUint::from(word) << (8 * (size - 3)))
    };

    let negative = word != 0 && (bits & SIGN_BIT) != 0;
    let overflow = word != 0
        && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

    DecodedCompact {
        target,
        negative,
        overflow,
    }
}

/// Encode a target into normalized compact bits.
///
/// The result never carries the sign bit. Zero encodes as `0`.
pub fn encode_compact(target: &BigUint) -> u32 {
    // Size never exceeds 33 for a value of at most 256 bits.
    let mut size = ((target.bits() + 7) / 8) as u32;

    let mut compact = if size <= 3 {
        low_u32(target) << (8 * (3 - size))
    } else {
        low_u32(&(target >> (8 * (size - 3))))
    };

    if compact & SIGN_BIT != 0 {
        compact >>= 8;
        size += 1;
    }

    compact | (size << 24)
}

/// Decode compact `bits` to a usable target.
///
/// Rejects encodings that are negative, overflow 256 bits, or represent zero.
pub fn bits_to_target(bits: u32) -> Result<BigUint, ConsensusError> {
    let decoded = decode_compact(bits);
    if decoded.negative {
        return Err(ConsensusError::NegativeTarget);
    }
    if decoded.overflow {
        return Err(ConsensusError::TargetOverflow);
    }
    if decoded.target.is_zero() {
        return Err(ConsensusError::InvalidTarget);
    }
    Ok(decoded.target)
}

/// Encode a non-zero target of at most 256 bits into compact `bits`.
pub fn target_to_bits(target: &BigUint) -> Result<u32, ConsensusError> {
    if target.is_zero() {
        return Err(ConsensusError::InvalidTarget);
    }
    if target.bits() > TARGET_WIDTH_BITS {
        return Err(ConsensusError::InvalidBits);
    }
    Ok(encode_compact(target))
}

/// Compare a 32-byte hash (big-endian) with a target.
/// Returns `true` if `hash <= target`.
pub fn hash_meets_target(hash: &Hash32, target: &BigUint) -> bool {
    BigUint::from_bytes_be(hash.as_bytes()) <= *target
}

/// Multiply by `rhs` modulo 2^256. The flag is set when bits were discarded.
pub fn wrapping_mul_u64(value: &BigUint, rhs: u64) -> (BigUint, bool) {
    fit_256(value * rhs)
}

/// Shift left modulo 2^256. The flag is set when bits were discarded.
pub fn wrapping_shl(value: &BigUint, shift: u32) -> (BigUint, bool) {
    fit_256(value << shift)
}

/// Parse a big-endian hex target of at most 32 bytes.
pub fn target_from_hex(s: &str) -> Option<BigUint> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).ok()?;
    if bytes.len() > 32 {
        return None;
    }
    Some(BigUint::from_bytes_be(&bytes))
}

/// Render a target as 64 hex characters (big-endian, zero-padded).
pub fn target_to_hex(target: &BigUint) -> String {
    let bytes = target.to_bytes_be();
    let mut out = [0u8; 32];
    let len = bytes.len().min(32);
    out[32 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    hex::encode(out)
}

fn fit_256(value: BigUint) -> (BigUint, bool) {
    if value.bits() > TARGET_WIDTH_BITS {
        (truncate_256(value), true)
    } else {
        (value, false)
    }
}

fn truncate_256(value: BigUint) -> BigUint {
    if value.bits() <= TARGET_WIDTH_BITS {
        return value;
    }
    let mask = (BigUint::one() << TARGET_WIDTH_BITS) - BigUint::one();
    value & mask
}

fn low_u32(value: &BigUint) -> u32 {
    value.iter_u32_digits().next().unwrap_or(0)
}
