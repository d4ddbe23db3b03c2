//! The graph trait and its arena implementation.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::node::{Node, NodeId};

/// Read access to a host graph, plus duplication into a pipeline-owned copy.
///
/// Implementors provide the four required methods; traversal helpers are
/// derived from them. All traversals are deterministic: child order is the
/// order the host reports.
pub trait SceneGraph {
    /// Top-level nodes in host order.
    fn roots(&self) -> Vec<NodeId>;

    /// Looks up a node.
    fn node(&self, id: NodeId) -> Option<&Node>;

    /// Returns `true` while the host is actively simulating.
    fn is_simulating(&self) -> bool;

    /// Every node, depth-first pre-order from the roots.
    fn nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.roots().into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Parent of a node, `None` for roots and unknown nodes.
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    /// Ordered children of a node.
    fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    /// The subtree rooted at `root`, breadth-first.
    fn subtree_bfs(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.node(root).is_none() {
            return out;
        }
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            out.push(id);
            queue.extend(self.children(id).iter().copied());
        }
        out
    }

    /// Ancestors of a node, nearest first.
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Slash-separated name path from the root, used in diagnostics.
    fn path(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = self
            .ancestors(id)
            .into_iter()
            .rev()
            .filter_map(|a| self.node(a).map(|n| n.name.as_str()))
            .collect();
        if let Some(node) = self.node(id) {
            names.push(&node.name);
        }
        names.join("/")
    }

    /// Copies the subtree rooted at `root` into a fresh [`Scene`].
    ///
    /// Nodes are renumbered breadth-first, so the copy's root is always
    /// `NodeId(0)` and child order is preserved.
    fn duplicate(&self, root: NodeId) -> Result<Scene, GraphError> {
        let source = self.node(root).ok_or(GraphError::UnknownNode(root))?;
        let mut copy = Scene::new(source.name.clone());
        let mut queue: VecDeque<(NodeId, Option<NodeId>)> = VecDeque::from([(root, None)]);
        while let Some((id, parent)) = queue.pop_front() {
            let Some(node) = self.node(id) else {
                continue;
            };
            let new_id = match parent {
                None => copy.add_root(node.clone()),
                Some(p) => copy.add_child(p, node.clone())?,
            };
            queue.extend(node.children().iter().map(|&c| (c, Some(new_id))));
        }
        Ok(copy)
    }
}

/// An index-stable arena of nodes.
///
/// Removed nodes leave `None` holes so that every previously handed-out
/// [`NodeId`] either still refers to the same node or to nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    name: String,
    nodes: Vec<Option<Node>>,
    roots: Vec<NodeId>,
    simulating: bool,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The scene name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a top-level node.
    pub fn add_root(&mut self, node: Node) -> NodeId {
        let id = self.insert(node, None);
        self.roots.push(id);
        id
    }

    /// Adds `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId, GraphError> {
        if self.node(parent).is_none() {
            return Err(GraphError::UnknownNode(parent));
        }
        let id = self.insert(node, Some(parent));
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        Ok(id)
    }

    fn insert(&mut self, mut node: Node, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = parent;
        node.children.clear();
        self.nodes.push(Some(node));
        id
    }

    /// Mutable access to a node.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Sets the simulating flag reported through [`SceneGraph::is_simulating`].
    pub fn set_simulating(&mut self, simulating: bool) {
        self.simulating = simulating;
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns `true` if the scene has no live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes `id` and all of its descendants, returning how many nodes went away.
    ///
    /// The subtree is collected first and deleted afterwards, so no traversal
    /// ever observes a half-removed tree.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<usize, GraphError> {
        if self.node(id).is_none() {
            return Err(GraphError::UnknownNode(id));
        }
        let doomed = self.subtree_bfs(id);
        match self.parent(id) {
            Some(parent) => {
                if let Some(p) = self.node_mut(parent) {
                    p.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
        for node in &doomed {
            self.nodes[node.index()] = None;
        }
        Ok(doomed.len())
    }
}

impl SceneGraph for Scene {
    fn roots(&self) -> Vec<NodeId> {
        self.roots.clone()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn is_simulating(&self) -> bool {
        self.simulating
    }
}
