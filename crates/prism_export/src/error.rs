//! Error types for export passes.

use prism_cache::CacheError;
use prism_common::Identity;
use prism_graph::GraphError;

/// Errors that stop an export pass or a single candidate.
///
/// [`NotAllowedInCurrentMode`](Self::NotAllowedInCurrentMode),
/// [`MissingRequiredMarkerType`](Self::MissingRequiredMarkerType) and
/// [`IdentitySpaceExhausted`](Self::IdentitySpaceExhausted) abort the pass.
/// [`DependencyCycleOnStrip`](Self::DependencyCycleOnStrip) and
/// [`ArtifactWriteFailure`](Self::ArtifactWriteFailure) only skip the
/// candidate that raised them; the pipeline turns them into diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The host is simulating and its graph must not be exported.
    #[error("export is not allowed while the host is simulating")]
    NotAllowedInCurrentMode,

    /// No identity marker component type is configured.
    #[error("no identity marker type configured (set `markers.identity`)")]
    MissingRequiredMarkerType,

    /// Every non-reserved identity up to the 16-bit limit is taken.
    #[error("identity space exhausted: no free identity after {last}")]
    IdentitySpaceExhausted {
        /// The last identity the counter reached.
        last: Identity,
    },

    /// Stripping could not reach a fixed point.
    #[error("dependency cycle while stripping '{subject}' after {iterations} iteration(s): {remaining:?} cannot be removed")]
    DependencyCycleOnStrip {
        /// Path of the stripped subtree's root.
        subject: String,
        /// Non-visual component types left behind.
        remaining: Vec<String>,
        /// Iterations run before giving up.
        iterations: u32,
    },

    /// Writing the visual or geometry artifact failed.
    #[error("failed to write artifact for identity {identity}: {reason}")]
    ArtifactWriteFailure {
        /// The identity whose artifact could not be written.
        identity: Identity,
        /// What went wrong.
        reason: String,
    },

    /// Persisting the cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The graph was addressed with an invalid node.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl ExportError {
    /// Returns `true` if the error only affects the current candidate.
    pub fn is_candidate_local(&self) -> bool {
        matches!(
            self,
            ExportError::DependencyCycleOnStrip { .. } | ExportError::ArtifactWriteFailure { .. }
        )
    }
}
