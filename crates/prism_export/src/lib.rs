//! Incremental, content-addressed identity assignment and artifact export.
//!
//! Given a host graph (a scene or a library of templates), this crate picks
//! the subtrees that need a stable small [`Identity`](prism_common::Identity),
//! hashes them, and re-exports only what changed since the previous run:
//!
//! - [`HierarchyWalker`] selects candidates;
//! - [`ContentHasher`] computes each subtree's content hash;
//! - [`IdentityAllocator`] keeps identities stable and collision-free across
//!   the scene and template passes;
//! - [`ComponentStripper`] reduces a duplicate to visual-only content;
//! - [`GeometryExporter`] is the host's geometry capability;
//! - [`ExportSession`] and [`ExportPass`] drive it all one candidate at a time.

#![warn(missing_docs)]

pub mod allocator;
pub mod error;
pub mod exporter;
pub mod hasher;
pub mod marker;
pub mod pipeline;
pub mod stripper;
pub mod walker;

pub use allocator::{AllocationRequest, IdentityAllocator};
pub use error::ExportError;
pub use exporter::{ArtifactHandle, GeometryError, GeometryExporter, JsonGeometryExporter};
pub use hasher::ContentHasher;
pub use marker::{identity_marker, read_marker, reserved_category, IdentityMarkerState, MarkerRead};
pub use pipeline::{
    CancelToken, CandidateReport, ExportPass, ExportSession, PassSummary, RunStatus, Step,
};
pub use prism_cache::PassKey;
pub use stripper::{ComponentStripper, StripReport};
pub use walker::HierarchyWalker;
