//! Typed units of state attached to nodes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A typed unit of state on a node.
///
/// The state is kept as canonical JSON text so that it hashes and serializes
/// deterministically regardless of how the host produced it. `requires` lists
/// the component types this one depends on; those are dependency edges, never
/// ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// The component type tag, e.g. `MeshRenderer`.
    pub type_tag: String,
    /// Serialized state snapshot.
    pub state: String,
    /// Component types that must stay present while this one exists.
    pub requires: Vec<String>,
}

impl Component {
    /// Creates a component with empty state and no dependencies.
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            state: "{}".to_string(),
            requires: Vec::new(),
        }
    }

    /// Creates a component whose state is the JSON form of `state`.
    pub fn with_state<T: Serialize>(
        type_tag: impl Into<String>,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            type_tag: type_tag.into(),
            state: serde_json::to_string(state)?,
            requires: Vec::new(),
        })
    }

    /// Adds a dependency on another component type.
    pub fn requiring(mut self, type_tag: impl Into<String>) -> Self {
        self.requires.push(type_tag.into());
        self
    }

    /// Decodes the state snapshot, returning `None` if it does not match `T`.
    pub fn decode_state<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_str(&self.state).ok()
    }

    /// Returns `true` if this component has the given type tag.
    pub fn is(&self, type_tag: &str) -> bool {
        self.type_tag == type_tag
    }
}
