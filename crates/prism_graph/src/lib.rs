//! Host graph model consumed by the export core.
//!
//! The export core never owns the live scene. It reads it through the
//! [`SceneGraph`] trait and writes only to transient duplicates, which are
//! plain [`Scene`] arenas owned by the pipeline. [`Scene`] also implements
//! [`SceneGraph`], so hosts without their own graph type (and tests) can
//! build scenes directly.

#![warn(missing_docs)]

pub mod component;
pub mod error;
pub mod node;
pub mod scene;

pub use component::Component;
pub use error::GraphError;
pub use node::{Node, NodeId};
pub use scene::{Scene, SceneGraph};
