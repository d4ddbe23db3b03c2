//! Candidate selection over a host graph.

use prism_config::MarkerConfig;
use prism_graph::{Node, NodeId, SceneGraph};

use crate::error::ExportError;

/// Selects the nodes an export pass works on.
///
/// Selection is read-only and deterministic: results follow the graph's
/// depth-first pre-order.
pub struct HierarchyWalker<'a> {
    markers: &'a MarkerConfig,
}

impl<'a> HierarchyWalker<'a> {
    /// Creates a walker using the given marker types.
    pub fn new(markers: &'a MarkerConfig) -> Self {
        Self { markers }
    }

    /// Returns the minimal set of coverage roots.
    ///
    /// A coverage root is an active node (with only active ancestors) that
    /// carries neither the identity marker nor an excluded marker, has no
    /// such marker on any ancestor, has no ancestor that is itself a coverage
    /// root, and has a renderable component on itself or on an active
    /// descendant outside any marked region.
    pub fn coverage_roots<G: SceneGraph + ?Sized>(
        &self,
        graph: &G,
    ) -> Result<Vec<NodeId>, ExportError> {
        ensure_editable(graph)?;

        let mut roots = Vec::new();
        let mut stack: Vec<NodeId> = graph.roots().into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = graph.node(id) else {
                continue;
            };
            // Everything below an inactive or marked node is out of reach.
            if !node.active || self.is_blocking(node) {
                continue;
            }
            if self.has_renderable(graph, id) {
                roots.push(id);
                continue;
            }
            stack.extend(graph.children(id).iter().rev().copied());
        }
        Ok(roots)
    }

    /// Returns every node carrying the identity marker, inactive ones included.
    pub fn tracked_nodes<G: SceneGraph + ?Sized>(
        &self,
        graph: &G,
    ) -> Result<Vec<NodeId>, ExportError> {
        ensure_editable(graph)?;
        Ok(graph
            .nodes()
            .into_iter()
            .filter(|&id| graph.node(id).is_some_and(|n| self.is_tracked(n)))
            .collect())
    }

    /// Returns the top-level nodes whose subtree contains at least one tracked node.
    pub fn template_roots<G: SceneGraph + ?Sized>(
        &self,
        graph: &G,
    ) -> Result<Vec<NodeId>, ExportError> {
        ensure_editable(graph)?;
        Ok(graph
            .roots()
            .into_iter()
            .filter(|&root| !self.tracked_in(graph, root).is_empty())
            .collect())
    }

    /// Tracked nodes of the subtree at `root`, breadth-first.
    pub fn tracked_in<G: SceneGraph + ?Sized>(&self, graph: &G, root: NodeId) -> Vec<NodeId> {
        graph
            .subtree_bfs(root)
            .into_iter()
            .filter(|&id| graph.node(id).is_some_and(|n| self.is_tracked(n)))
            .collect()
    }

    /// Returns `true` if the node carries the identity marker.
    pub fn is_tracked(&self, node: &Node) -> bool {
        node.has_component(&self.markers.identity)
    }

    fn is_blocking(&self, node: &Node) -> bool {
        self.is_tracked(node) || node.has_any_component(&self.markers.excluded)
    }

    fn has_renderable<G: SceneGraph + ?Sized>(&self, graph: &G, id: NodeId) -> bool {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = graph.node(current) else {
                continue;
            };
            if !node.active || (current != id && self.is_blocking(node)) {
                continue;
            }
            if node.has_any_component(&self.markers.renderable) {
                return true;
            }
            stack.extend(graph.children(current).iter().copied());
        }
        false
    }
}

fn ensure_editable<G: SceneGraph + ?Sized>(graph: &G) -> Result<(), ExportError> {
    if graph.is_simulating() {
        return Err(ExportError::NotAllowedInCurrentMode);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_graph::{Component, Scene};

    fn markers() -> MarkerConfig {
        MarkerConfig {
            identity: "TrackObject".to_string(),
            ..MarkerConfig::default()
        }
    }

    fn mesh() -> Component {
        Component::new("MeshRenderer")
    }

    #[test]
    fn selects_topmost_renderable_nodes() {
        let mut scene = Scene::new("s");
        let world = scene.add_root(Node::new("World"));
        let house = scene.add_child(world, Node::new("House")).unwrap();
        let wall = scene
            .add_child(house, Node::new("Wall").with_component(mesh()))
            .unwrap();
        scene
            .add_child(wall, Node::new("Window").with_component(mesh()))
            .unwrap();
        let tree = scene.add_root(Node::new("Tree").with_component(mesh()));

        let markers = markers();
        let walker = HierarchyWalker::new(&markers);
        assert_eq!(walker.coverage_roots(&scene).unwrap(), vec![world, tree]);
    }

    #[test]
    fn tracked_and_excluded_nodes_block_their_subtrees() {
        let mut scene = Scene::new("s");
        let cart = scene.add_root(Node::new("Cart").with_component(Component::new("TrackObject")));
        scene
            .add_child(cart, Node::new("Wheel").with_component(mesh()))
            .unwrap();
        let rig = scene.add_root(Node::new("Rig").with_component(Component::new("TrackingManager")));
        scene
            .add_child(rig, Node::new("Controller").with_component(mesh()))
            .unwrap();
        let rock = scene.add_root(Node::new("Rock").with_component(mesh()));

        let markers = markers();
        let walker = HierarchyWalker::new(&markers);
        assert_eq!(walker.coverage_roots(&scene).unwrap(), vec![rock]);
    }

    #[test]
    fn renderables_inside_blocked_regions_do_not_count() {
        let mut scene = Scene::new("s");
        let shelf = scene.add_root(Node::new("Shelf"));
        let cup = scene
            .add_child(shelf, Node::new("Cup").with_component(Component::new("TrackObject")))
            .unwrap();
        scene
            .add_child(cup, Node::new("Handle").with_component(mesh()))
            .unwrap();
        let book = scene.add_child(shelf, Node::new("Book")).unwrap();
        let page = scene
            .add_child(book, Node::new("Page").with_component(mesh()))
            .unwrap();

        let markers = markers();
        let walker = HierarchyWalker::new(&markers);
        assert_eq!(walker.coverage_roots(&scene).unwrap(), vec![shelf]);

        scene.remove_subtree(book).unwrap();
        assert!(walker.coverage_roots(&scene).unwrap().is_empty());
        assert!(scene.node(page).is_none());
    }

    #[test]
    fn inactive_nodes_are_not_covered() {
        let mut scene = Scene::new("s");
        let hidden = scene.add_root(Node::new("Hidden").inactive());
        scene
            .add_child(hidden, Node::new("Mesh").with_component(mesh()))
            .unwrap();
        let shell = scene.add_root(Node::new("Shell"));
        scene
            .add_child(shell, Node::new("Ghost").with_component(mesh()).inactive())
            .unwrap();

        let markers = markers();
        let walker = HierarchyWalker::new(&markers);
        assert!(walker.coverage_roots(&scene).unwrap().is_empty());
    }

    #[test]
    fn renderable_on_the_node_itself_counts() {
        let mut scene = Scene::new("s");
        let rock = scene.add_root(
            Node::new("Rock").with_component(Component::new("SkinnedMeshRenderer")),
        );
        let markers = markers();
        let walker = HierarchyWalker::new(&markers);
        assert_eq!(walker.coverage_roots(&scene).unwrap(), vec![rock]);
    }

    #[test]
    fn tracked_nodes_include_nested_and_inactive() {
        let mut scene = Scene::new("s");
        let a = scene.add_root(Node::new("A").with_component(Component::new("TrackObject")));
        let b = scene
            .add_child(
                a,
                Node::new("B")
                    .with_component(Component::new("TrackObject"))
                    .inactive(),
            )
            .unwrap();
        scene.add_root(Node::new("C"));

        let markers = markers();
        let walker = HierarchyWalker::new(&markers);
        assert_eq!(walker.tracked_nodes(&scene).unwrap(), vec![a, b]);
    }

    #[test]
    fn template_roots_contain_a_tracked_node() {
        let mut scene = Scene::new("library");
        let crate_root = scene.add_root(Node::new("Crate"));
        scene
            .add_child(crate_root, Node::new("Lid").with_component(Component::new("TrackObject")))
            .unwrap();
        scene.add_root(Node::new("Decor").with_component(mesh()));

        let markers = markers();
        let walker = HierarchyWalker::new(&markers);
        assert_eq!(walker.template_roots(&scene).unwrap(), vec![crate_root]);
    }

    #[test]
    fn simulating_graph_is_rejected() {
        let mut scene = Scene::new("s");
        scene.add_root(Node::new("Rock").with_component(mesh()));
        scene.set_simulating(true);

        let markers = markers();
        let walker = HierarchyWalker::new(&markers);
        assert!(matches!(
            walker.coverage_roots(&scene),
            Err(ExportError::NotAllowedInCurrentMode)
        ));
        assert!(matches!(
            walker.tracked_nodes(&scene),
            Err(ExportError::NotAllowedInCurrentMode)
        ));
    }
}
