// Consensus-critical. Changes require review + tests.
//! Chain work accounting.

use crate::compact::bits_to_target;
use crate::error::ConsensusError;
use hashgate_core::{ChainIndexEntry, ChainView};
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Compute per-block work from compact `bits`.
///
/// Work is defined as `work = floor((2^256) / (target + 1))`.
pub fn work_from_bits(bits: u32) -> Result<BigUint, ConsensusError> {
    let target = bits_to_target(bits)?;
    let two_256 = BigUint::one() << 256u32;
    Ok(&two_256 / (&target + BigUint::one()))
}

/// Sum the work of `tip` and every ancestor reachable in `chain`.
pub fn chain_work<V: ChainView + ?Sized>(
    chain: &V,
    tip: &ChainIndexEntry,
) -> Result<BigUint, ConsensusError> {
    let mut total = BigUint::zero();
    let mut cur = Some(tip);
    while let Some(entry) = cur {
        total += work_from_bits(entry.bits)?;
        cur = chain.previous(entry);
    }
    Ok(total)
}
