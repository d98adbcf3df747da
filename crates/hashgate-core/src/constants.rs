//! Protocol-wide constants.

/// Length in bytes of a 32-byte hash.
pub const HASH32_LEN: usize = 32;

/// Height of the genesis block.
pub const GENESIS_HEIGHT: u64 = 0;
