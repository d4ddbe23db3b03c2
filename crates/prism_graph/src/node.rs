//! Nodes of the host graph.

use crate::component::Component;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node inside a [`Scene`](crate::Scene) arena.
///
/// Indices are stable: removing a node leaves a hole rather than shifting
/// later nodes, so ids collected before a mutation stay valid after it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single node: identifying attributes, components, and tree links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Display name.
    pub name: String,
    /// Category label (a tag).
    pub category: String,
    /// Classification value (a layer).
    pub layer: i32,
    /// Whether the node itself is active.
    pub active: bool,
    /// Components in declaration order.
    pub components: Vec<Component>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    /// Creates an active, untagged node on layer 0 with no components.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: "Untagged".to_string(),
            layer: 0,
            active: true,
            components: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Sets the category label.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the classification value.
    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    /// Marks the node inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Appends a component.
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Returns `true` if any component has the given type tag.
    pub fn has_component(&self, type_tag: &str) -> bool {
        self.components.iter().any(|c| c.is(type_tag))
    }

    /// Returns `true` if any component's type tag is in `type_tags`.
    pub fn has_any_component(&self, type_tags: &[String]) -> bool {
        self.components
            .iter()
            .any(|c| type_tags.iter().any(|t| c.is(t)))
    }

    /// Returns the first component with the given type tag.
    pub fn component(&self, type_tag: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.is(type_tag))
    }

    /// Returns the parent link.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the ordered child links.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}
