//! Consensus error types.

use thiserror::Error;

/// Errors returned by proof-of-work validation, difficulty retargeting and
/// parameter loading.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// Compact bits carry the sign bit with a non-zero mantissa.
    #[error("compact target is negative")]
    NegativeTarget,

    /// Compact bits describe a value wider than 256 bits.
    #[error("compact target overflows 256 bits")]
    TargetOverflow,

    /// Target decoded to zero or otherwise unusable.
    #[error("invalid difficulty target")]
    InvalidTarget,

    /// Target is easier than the network's proof-of-work limit.
    #[error("difficulty target above proof-of-work limit")]
    TargetAboveLimit,

    /// A target could not be packed into compact bits.
    #[error("invalid compact target bits")]
    InvalidBits,

    /// Proof-of-work hash did not meet the required target.
    #[error("insufficient proof of work")]
    InsufficientPoW,

    /// Consensus parameters violate basic constraints.
    #[error("invalid consensus params: {0}")]
    InvalidParams(&'static str),

    /// Consensus parameter document could not be parsed.
    #[error("malformed consensus params: {0}")]
    ParamsFormat(#[from] serde_json::Error),
}
