//! Network consensus parameters.
//!
//! A `ConsensusParams` value is built once per process (from a preset or a
//! JSON document) and passed by reference into every consensus call.

use crate::compact::{encode_compact, target_from_hex, target_to_hex, TARGET_WIDTH_BITS};
use crate::error::ConsensusError;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Target block spacing shared by the built-in networks (2.5 minutes).
pub const DEFAULT_TARGET_SPACING_SECS: i64 = 150;

/// Retarget window shared by the built-in networks (two weeks).
pub const DEFAULT_TARGET_TIMESPAN_SECS: i64 = 14 * 24 * 60 * 60;

/// Easiest target on mainnet and testnet (`0x1e0fffff`).
pub const MAINNET_POW_LIMIT_HEX: &str =
    "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

/// Easiest target on regtest (`0x207fffff`).
pub const REGTEST_POW_LIMIT_HEX: &str =
    "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";

/// Consensus parameters that drive difficulty retargeting and PoW checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsensusParams {
    /// Easiest (largest) target a block may carry.
    #[serde(with = "hex_target")]
    pub pow_limit: BigUint,
    /// Expected seconds between blocks.
    pub pow_target_spacing: i64,
    /// Seconds covered by one legacy retarget window.
    pub pow_target_timespan: i64,
    /// Allow an easiest-target block once production stalls (test networks).
    #[serde(default)]
    pub allow_min_difficulty_blocks: bool,
    /// Keep the previous target forever (fixed-difficulty test networks).
    #[serde(default)]
    pub no_retargeting: bool,
    /// First height whose target is recomputed every block.
    pub per_block_difficulty_activation_height: u64,
    /// First height at which legacy retargets use the asymmetric clamp band.
    pub difficulty_change_activation_height: u64,
}

impl ConsensusParams {
    /// Production network.
    pub fn mainnet() -> Self {
        Self {
            pow_limit: preset_limit(MAINNET_POW_LIMIT_HEX),
            pow_target_spacing: DEFAULT_TARGET_SPACING_SECS,
            pow_target_timespan: DEFAULT_TARGET_TIMESPAN_SECS,
            allow_min_difficulty_blocks: false,
            no_retargeting: false,
            per_block_difficulty_activation_height: 280_000,
            difficulty_change_activation_height: 225_000,
        }
    }

    /// Public test network: stall relief on, forks activate early.
    pub fn testnet() -> Self {
        Self {
            pow_limit: preset_limit(MAINNET_POW_LIMIT_HEX),
            pow_target_spacing: DEFAULT_TARGET_SPACING_SECS,
            pow_target_timespan: DEFAULT_TARGET_TIMESPAN_SECS,
            allow_min_difficulty_blocks: true,
            no_retargeting: false,
            per_block_difficulty_activation_height: 20_000,
            difficulty_change_activation_height: 10_000,
        }
    }

    /// Local regression network with fixed difficulty.
    pub fn regtest() -> Self {
        Self {
            pow_limit: preset_limit(REGTEST_POW_LIMIT_HEX),
            pow_target_spacing: DEFAULT_TARGET_SPACING_SECS,
            pow_target_timespan: DEFAULT_TARGET_TIMESPAN_SECS,
            allow_min_difficulty_blocks: true,
            no_retargeting: true,
            per_block_difficulty_activation_height: u64::MAX,
            difficulty_change_activation_height: 0,
        }
    }

    /// Load and validate parameters from a JSON document.
    ///
    /// `pow_limit` is a big-endian hex string of at most 32 bytes.
    pub fn from_json_str(json: &str) -> Result<Self, ConsensusError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Serialize to a JSON document accepted by [`Self::from_json_str`].
    pub fn to_json_string(&self) -> Result<String, ConsensusError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the constraints the retarget arithmetic relies on.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.pow_limit.is_zero() {
            return Err(ConsensusError::InvalidParams("pow_limit must be non-zero"));
        }
        if self.pow_limit.bits() > TARGET_WIDTH_BITS {
            return Err(ConsensusError::InvalidParams("pow_limit wider than 256 bits"));
        }
        if self.pow_target_spacing <= 0 {
            return Err(ConsensusError::InvalidParams(
                "pow_target_spacing must be positive",
            ));
        }
        if self.pow_target_timespan < self.pow_target_spacing {
            return Err(ConsensusError::InvalidParams(
                "pow_target_timespan shorter than pow_target_spacing",
            ));
        }
        // Clamped timespans multiply the target as 32-bit factors.
        if self.pow_target_timespan > i64::from(u32::MAX) / 6 {
            return Err(ConsensusError::InvalidParams("pow_target_timespan too large"));
        }
        Ok(())
    }

    /// Number of blocks in one legacy retarget window.
    pub fn difficulty_adjustment_interval(&self) -> u64 {
        u64::try_from(self.pow_target_timespan / self.pow_target_spacing).unwrap_or(0)
    }

    /// Compact encoding of `pow_limit`.
    pub fn pow_limit_bits(&self) -> u32 {
        encode_compact(&self.pow_limit)
    }
}

fn preset_limit(hex: &str) -> BigUint {
    target_from_hex(hex).unwrap_or_default()
}

mod hex_target {
    use super::*;
    use serde::{de, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(target: &BigUint, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&target_to_hex(target))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(d)?;
        target_from_hex(&s)
            .ok_or_else(|| de::Error::custom("pow_limit must be hex of at most 32 bytes"))
    }
}
