#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Hashgate consensus rules for proof-of-work admission.
//!
//! This crate is responsible for:
//! - compact difficulty target encoding/decoding (Bitcoin-style `bits`)
//! - the difficulty a new block must carry (interval and per-block retargeting)
//! - proof-of-work validation against the target
//! - chain work accounting
//!
//! It intentionally does **not** hash headers, mine, store blocks or choose
//! between forks. Every function is pure over its inputs and the chain view.

pub mod compact;
pub mod difficulty;
pub mod error;
pub mod params;
pub mod pow;
pub mod work;

pub use compact::*;
pub use difficulty::*;
pub use error::*;
pub use params::*;
pub use pow::*;
pub use work::*;
