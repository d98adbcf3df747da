#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Hashgate core: canonical value types and the chain index consumed by the
//! consensus rules.
//!
//! Consensus logic lives in `hashgate-consensus`; this crate only defines the
//! data the rules read and a height-indexed store that serves it.

pub mod chain;
pub mod constants;
pub mod types;

pub use chain::*;
pub use constants::*;
pub use types::*;
