//! Deterministic content hashing of subtrees.
//!
//! The digest is built from two ordered folds over the same breadth-first
//! enumeration of the subtree:
//!
//! 1. **structure**: each node's name, category, layer, active flag and
//!    child count;
//! 2. **state**: each node's components as (type tag, state snapshot).
//!
//! Each fold starts with its own domain tag and every variable-length field
//! is length-prefixed, so neither fold can be confused with the other and
//! adjacent fields cannot run into each other. The final digest hashes the
//! structural digest followed by the state digest.

use prism_common::ContentHash;
use prism_graph::{NodeId, SceneGraph};
use xxhash_rust::xxh3::Xxh3;

const STRUCTURE_DOMAIN: &[u8] = b"prism:structure:v1";
const STATE_DOMAIN: &[u8] = b"prism:state:v1";
const ROOT_DOMAIN: &[u8] = b"prism:subtree:v1";

/// Computes [`ContentHash`]es of subtrees of a [`SceneGraph`].
///
/// The hash depends only on what the nodes contain and the order the graph
/// reports children in, never on node ids.
pub struct ContentHasher;

impl ContentHasher {
    /// Hashes the subtree rooted at `root`.
    ///
    /// An unknown `root` hashes like an empty subtree.
    pub fn hash<G: SceneGraph + ?Sized>(graph: &G, root: NodeId) -> ContentHash {
        let order = graph.subtree_bfs(root);

        let mut structure = Xxh3::new();
        structure.update(STRUCTURE_DOMAIN);
        for &id in &order {
            let Some(node) = graph.node(id) else {
                continue;
            };
            write_field(&mut structure, node.name.as_bytes());
            write_field(&mut structure, node.category.as_bytes());
            structure.update(&node.layer.to_le_bytes());
            structure.update(&[u8::from(node.active)]);
            structure.update(&(node.children().len() as u64).to_le_bytes());
        }

        let mut state = Xxh3::new();
        state.update(STATE_DOMAIN);
        for &id in &order {
            let Some(node) = graph.node(id) else {
                continue;
            };
            state.update(&(node.components.len() as u64).to_le_bytes());
            for component in &node.components {
                write_field(&mut state, component.type_tag.as_bytes());
                write_field(&mut state, component.state.as_bytes());
            }
        }

        let mut folded = Xxh3::new();
        folded.update(ROOT_DOMAIN);
        folded.update(&structure.digest128().to_le_bytes());
        folded.update(&state.digest128().to_le_bytes());
        ContentHash::from_u128(folded.digest128())
    }
}

/// Length prefix (64-bit little-endian) followed by the bytes.
fn write_field(hasher: &mut Xxh3, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
