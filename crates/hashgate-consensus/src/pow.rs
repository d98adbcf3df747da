// Consensus-critical. Changes require review + tests.
//! Proof-of-work validation.
//!
//! The PoW condition is:
//!     hash_as_u256 <= target(bits) <= pow_limit
//!
//! Hashes are produced outside this crate and compared big-endian, the same
//! byte order used for targets.

use crate::compact::{decode_compact, hash_meets_target, DecodedCompact};
use crate::error::ConsensusError;
use crate::params::ConsensusParams;
use hashgate_core::Hash32;
use num_traits::Zero;

/// Check that `hash` satisfies the target encoded in `bits`.
///
/// Fails when the bits are negative, zero, overflow 256 bits or are easier
/// than `pow_limit`, and when the hash exceeds the target.
pub fn check_proof_of_work(
    hash: &Hash32,
    bits: u32,
    params: &ConsensusParams,
) -> Result<(), ConsensusError> {
    let DecodedCompact {
        target,
        negative,
        overflow,
    } = decode_compact(bits);

    if negative {
        return Err(ConsensusError::NegativeTarget);
    }
    if target.is_zero() {
        return Err(ConsensusError::InvalidTarget);
    }
    if overflow {
        return Err(ConsensusError::TargetOverflow);
    }
    if target > params.pow_limit {
        return Err(ConsensusError::TargetAboveLimit);
    }

    if !hash_meets_target(hash, &target) {
        return Err(ConsensusError::InsufficientPoW);
    }
    Ok(())
}

/// Boolean form of [`check_proof_of_work`] for the block-acceptance pipeline.
pub fn is_valid_proof_of_work(hash: &Hash32, bits: u32, params: &ConsensusParams) -> bool {
    check_proof_of_work(hash, bits, params).is_ok()
}
