//! Reading identity markers and reserved-category markers from nodes.

use prism_common::{Identity, ReservedCategory};
use prism_config::ReservedMarkers;
use prism_graph::{Component, Node};
use serde::{Deserialize, Serialize};

/// State snapshot carried by an identity marker component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMarkerState {
    /// The identity the host last stored on the marker; 0 when unassigned.
    pub identity: u16,
}

/// What a node's identity marker says about its prior identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRead {
    /// The node has no identity marker.
    Absent,
    /// The marker exists but its state has no readable identity.
    Unreadable,
    /// The marker holds this identity (possibly [`Identity::UNASSIGNED`]).
    Holds(Identity),
}

/// Builds an identity marker component holding `identity`.
pub fn identity_marker(type_tag: &str, identity: Identity) -> Component {
    Component {
        type_tag: type_tag.to_string(),
        state: format!(r#"{{"identity":{identity}}}"#),
        requires: Vec::new(),
    }
}

/// Reads the prior identity from the first identity marker on `node`.
pub fn read_marker(node: &Node, type_tag: &str) -> MarkerRead {
    match node.component(type_tag) {
        None => MarkerRead::Absent,
        Some(marker) => match marker.decode_state::<IdentityMarkerState>() {
            Some(state) => MarkerRead::Holds(Identity::new(state.identity)),
            None => MarkerRead::Unreadable,
        },
    }
}

/// Returns the reserved category `node` is marked with, if any.
///
/// Categories are checked in identity order, so a node marked for several
/// categories receives the lowest reserved identity.
pub fn reserved_category(node: &Node, reserved: &ReservedMarkers) -> Option<ReservedCategory> {
    ReservedCategory::ALL.into_iter().find(|&category| {
        let tag = match category {
            ReservedCategory::PrimaryViewpoint => &reserved.primary_viewpoint,
            ReservedCategory::LeftManipulator => &reserved.left_manipulator,
            ReservedCategory::RightManipulator => &reserved.right_manipulator,
        };
        !tag.is_empty() && node.has_component(tag)
    })
}
