#![allow(dead_code)]

use std::path::Path;

use prism_cache::CacheEntry;
use prism_common::Identity;
use prism_config::{load_config_from_str, ExportConfig};
use prism_diagnostics::DiagnosticSink;
use prism_export::{
    identity_marker, CancelToken, ExportSession, JsonGeometryExporter, PassKey, PassSummary,
    RunStatus,
};
use prism_graph::{Component, Node, SceneGraph};

pub const MARKER: &str = "TrackObject";

pub fn config(checkpoint: bool) -> ExportConfig {
    load_config_from_str(&format!(
        r#"
[cache]
dir = "cache"
version = "1.0.0"
checkpoint = {checkpoint}

[markers]
identity = "{MARKER}"
"#
    ))
    .unwrap()
}

pub fn session(dir: &Path) -> ExportSession {
    ExportSession::new(config(true), dir).unwrap()
}

pub fn mesh() -> Component {
    Component::new("MeshRenderer")
}

/// A node carrying the identity marker with the given stored identity.
pub fn tracked(name: &str, identity: u16) -> Node {
    Node::new(name).with_component(identity_marker(MARKER, Identity::new(identity)))
}

/// Runs a whole pass with the JSON exporter and saves its cache.
pub fn run_pass<G: SceneGraph + ?Sized>(
    session: &mut ExportSession,
    key: PassKey,
    graph: &G,
) -> PassSummary {
    let mut exporter = JsonGeometryExporter;
    let mut pass = session.begin_pass(key, graph, &mut exporter).unwrap();
    assert_eq!(pass.run(&CancelToken::new()).unwrap(), RunStatus::Completed);
    pass.finish().unwrap()
}

pub fn entries(session: &ExportSession, key: &PassKey) -> Vec<CacheEntry> {
    session.cache().load(key, &DiagnosticSink::new()).unwrap()
}

pub fn identities(session: &ExportSession, key: &PassKey) -> Vec<u16> {
    entries(session, key)
        .iter()
        .flat_map(|e| e.identities())
        .map(Identity::get)
        .collect()
}

pub fn cache_bytes(session: &ExportSession, key: &PassKey) -> Vec<u8> {
    std::fs::read(session.cache().path_for(key)).unwrap()
}
