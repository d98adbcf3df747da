// Consensus-critical. Changes require review + tests.
//! Difficulty retargeting.
//!
//! Two regimes exist, selected by the height of the block being built:
//!
//! - **Legacy**: the target is recomputed once per adjustment interval from
//!   the time the whole window took, and carried over unchanged in between.
//! - **Per-block**: past `per_block_difficulty_activation_height` the target
//!   is recomputed every block from the last single block interval.
//!
//! Both regimes finish with the same fixed-width scaling step
//! (`retarget_bits`), whose results are those of a wrapping 256-bit
//! integer. The shift-before-multiply guard buys exactly one bit of
//! headroom; a product that needs more wraps. With a 236-bit `pow_limit`
//! and a window clamped to four timespans, a chain sitting at the easiest
//! target therefore retargets to a *harder* one.

use crate::compact::{decode_compact, encode_compact, wrapping_mul_u64, wrapping_shl};
use crate::error::ConsensusError;
use crate::params::ConsensusParams;
use hashgate_core::{ChainIndexEntry, ChainView};
use num_bigint::BigUint;
use tracing::{debug, warn};

/// Retarget algorithm in force for a given block height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetargetRegime {
    /// Interval retargeting with stall relief on test networks.
    Legacy,
    /// Retarget on every block from the last block interval.
    PerBlock,
}

impl RetargetRegime {
    /// Regime that governs the block at `next_height`.
    pub fn for_next_height(next_height: u64, params: &ConsensusParams) -> Self {
        if next_height >= params.per_block_difficulty_activation_height {
            Self::PerBlock
        } else {
            Self::Legacy
        }
    }
}

/// Compute the compact bits required for the block built on top of `last`.
///
/// `chain` must be a consistent snapshot containing `last` and its ancestors;
/// `candidate_time` is the candidate header's timestamp.
pub fn next_required_bits<V: ChainView + ?Sized>(
    chain: &V,
    last: &ChainIndexEntry,
    candidate_time: i64,
    params: &ConsensusParams,
) -> Result<u32, ConsensusError> {
    params.validate()?;

    let next_height = last.height.saturating_add(1);
    let regime = RetargetRegime::for_next_height(next_height, params);
    let bits = match regime {
        RetargetRegime::Legacy => legacy_bits(chain, last, candidate_time, params),
        RetargetRegime::PerBlock => per_block_bits(chain, last, candidate_time, params),
    };

    debug!(
        height = next_height,
        ?regime,
        prev_bits = format_args!("{:#010x}", last.bits),
        bits = format_args!("{bits:#010x}"),
        "required difficulty"
    );
    Ok(bits)
}

/// Interval retarget from the window ending at `last` and starting at
/// `first_block_time`.
pub fn calculate_next_work_required(
    last: &ChainIndexEntry,
    first_block_time: i64,
    params: &ConsensusParams,
) -> Result<u32, ConsensusError> {
    params.validate()?;
    Ok(interval_bits(last, first_block_time, params))
}

/// Clamp an observed single-block interval to the per-block band
/// `[0.9 * spacing, 1.2 * spacing]`.
pub fn clamp_per_block_timespan(actual: i64, params: &ConsensusParams) -> i64 {
    let spacing = params.pow_target_spacing;
    let min = (spacing * 9) / 10;
    let max = (spacing * 12) / 10;

    let mut clamped = actual;
    if clamped < min {
        clamped = min;
    }
    if clamped > max {
        clamped = max;
    }
    clamped
}

/// Clamp an observed window duration to the interval band in force at
/// `last_height`: `[timespan/4, timespan*4]` before the difficulty-change
/// activation, `[timespan*2/3, timespan*6]` from it onwards.
pub fn clamp_interval_timespan(actual: i64, last_height: u64, params: &ConsensusParams) -> i64 {
    let timespan = params.pow_target_timespan;
    let (min, max) = if last_height >= params.difficulty_change_activation_height {
        ((timespan * 2) / 3, timespan * 6)
    } else {
        (timespan / 4, timespan * 4)
    };

    let mut clamped = actual;
    if clamped < min {
        clamped = min;
    }
    if clamped > max {
        clamped = max;
    }
    clamped
}

fn legacy_bits<V: ChainView + ?Sized>(
    chain: &V,
    last: &ChainIndexEntry,
    candidate_time: i64,
    params: &ConsensusParams,
) -> u32 {
    let interval = params.difficulty_adjustment_interval();
    let next_height = last.height.saturating_add(1);

    if next_height % interval != 0 {
        if !params.allow_min_difficulty_blocks {
            return last.bits;
        }
        let limit_bits = params.pow_limit_bits();
        if is_stalled(last, candidate_time, params) {
            debug!(height = next_height, "stall relief: easiest target allowed");
            return limit_bits;
        }

        // Skip back over stall-relief blocks to the last real difficulty.
        let mut cur = last;
        while cur.height % interval != 0 && cur.bits == limit_bits {
            match chain.previous(cur) {
                Some(prev) => cur = prev,
                None => break,
            }
        }
        return cur.bits;
    }

    // The first retarget after genesis looks back one block less; every later
    // window spans a full interval of block times.
    let blocks_to_go_back = if next_height == interval {
        interval - 1
    } else {
        interval
    };
    let first = chain.walk_back(last, blocks_to_go_back);
    if last.height.saturating_sub(first.height) != blocks_to_go_back {
        warn!(
            height = last.height,
            reached = first.height,
            wanted = blocks_to_go_back,
            "retarget window truncated at start of chain view"
        );
    }

    interval_bits(last, first.timestamp, params)
}

fn per_block_bits<V: ChainView + ?Sized>(
    chain: &V,
    last: &ChainIndexEntry,
    candidate_time: i64,
    params: &ConsensusParams,
) -> u32 {
    let Some(prev) = chain.previous(last) else {
        return last.bits;
    };
    // First block under the per-block rule keeps the inherited target.
    if last.height.saturating_add(1) == params.per_block_difficulty_activation_height {
        return last.bits;
    }

    if params.allow_min_difficulty_blocks && is_stalled(last, candidate_time, params) {
        return params.pow_limit_bits();
    }

    let mut actual = last.timestamp.saturating_sub(prev.timestamp);
    if actual < 0 {
        actual = params.pow_target_spacing;
    }
    let actual = clamp_per_block_timespan(actual, params);

    retarget_bits(last.bits, actual, params.pow_target_spacing, params)
}

fn interval_bits(last: &ChainIndexEntry, first_block_time: i64, params: &ConsensusParams) -> u32 {
    if params.no_retargeting {
        return last.bits;
    }

    let actual = last.timestamp.saturating_sub(first_block_time);
    let actual = clamp_interval_timespan(actual, last.height, params);

    retarget_bits(last.bits, actual, params.pow_target_timespan, params)
}

fn is_stalled(last: &ChainIndexEntry, candidate_time: i64, params: &ConsensusParams) -> bool {
    candidate_time > last.timestamp.saturating_add(params.pow_target_spacing * 2)
}

/// Scale the target in `bits` by `actual / expected` and cap it at `pow_limit`.
///
/// A target that already uses all of `pow_limit`'s width is halved first and
/// doubled after the division. The product is still truncated to 256 bits
/// whenever `target * actual` needs more, and the truncated value is what gets
/// divided and capped.
fn retarget_bits(bits: u32, actual: i64, expected: i64, params: &ConsensusParams) -> u32 {
    let pow_limit = &params.pow_limit;
    let mut target = decode_compact(bits).target;

    let shift = pow_limit
        .bits()
        .checked_sub(1)
        .is_some_and(|max| target.bits() > max);
    if shift {
        target >>= 1u32;
    }

    let factor = u64::try_from(actual).unwrap_or(0);
    let (product, overflowed) = wrapping_mul_u64(&target, factor);
    if overflowed {
        warn!(
            bits = format_args!("{bits:#010x}"),
            factor, "retarget product truncated to 256 bits"
        );
    }
    let divisor = BigUint::from(u64::try_from(expected).unwrap_or(1).max(1));
    target = product / divisor;

    if shift {
        let (doubled, overflowed) = wrapping_shl(&target, 1);
        if overflowed {
            warn!(bits = format_args!("{bits:#010x}"), "retarget unshift truncated to 256 bits");
        }
        target = doubled;
    }

    if target > *pow_limit {
        target = pow_limit.clone();
    }

    encode_compact(&target)
}
