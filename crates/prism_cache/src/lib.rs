//! Persistence for the incremental export cache.
//!
//! Each pass keeps a plain-text file mapping a subtree's content hash to the
//! identities it was exported under and the hash of each emitted visual
//! artifact. [`CacheStore`] reads and writes those files, [`PassLedger`]
//! holds a running pass's working set, and [`ArtifactStore`] owns the visual
//! artifacts whose on-disk hashes decide staleness.

#![warn(missing_docs)]

pub mod artifact;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod store;

pub use artifact::ArtifactStore;
pub use entry::{Binding, CacheEntry, PassKey, SceneNamespace};
pub use error::CacheError;
pub use ledger::PassLedger;
pub use store::CacheStore;
