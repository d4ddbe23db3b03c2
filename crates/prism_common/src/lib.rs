//! Shared value types used across the prism export toolchain.
//!
//! This crate provides the content hashes that key the export cache, the
//! artifact hashes used for staleness detection, and the small numeric
//! identities bound to exported subtrees.

#![warn(missing_docs)]

pub mod hash;
pub mod identity;

pub use hash::{ArtifactHash, ContentHash, ParseHashError};
pub use identity::{Identity, ParseIdentityError, ReservedCategory};
