//! Error types for graph access.

use crate::node::NodeId;

/// Errors raised when a graph is addressed with an invalid node.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The node does not exist (never added, or removed).
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}
