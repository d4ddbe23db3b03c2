//! Reduction of a duplicated subtree to visual-only content.
//!
//! Stripping runs on a pipeline-owned [`Scene`] copy, never on the host
//! graph. Node removals collect their targets breadth-first into a worklist
//! before deleting anything, and component removal repeats until a fixed
//! point: a component that another present component declares as a
//! dependency is kept until that dependent is gone.

use std::collections::{BTreeSet, HashSet};

use prism_config::StripConfig;
use prism_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use prism_graph::{Node, NodeId, Scene, SceneGraph};

use crate::error::ExportError;

/// What one strip removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StripReport {
    /// Nodes removed (inactive descendants and nested identity regions).
    pub nodes_removed: usize,
    /// Components removed, identity markers included.
    pub components_removed: usize,
    /// Fixed-point iterations run.
    pub iterations: u32,
}

/// Strips non-visual components from duplicated subtrees.
pub struct ComponentStripper<'a> {
    identity_marker: &'a str,
    config: &'a StripConfig,
}

impl<'a> ComponentStripper<'a> {
    /// Creates a stripper for the given identity marker type and settings.
    pub fn new(identity_marker: &'a str, config: &'a StripConfig) -> Self {
        Self {
            identity_marker,
            config,
        }
    }

    /// Returns `true` if components of this type are never removed.
    pub fn is_allowed(&self, type_tag: &str) -> bool {
        self.config.visual.iter().any(|v| v == type_tag)
            || self
                .config
                .tolerated_prefixes
                .iter()
                .any(|p| !p.is_empty() && type_tag.starts_with(p.as_str()))
    }

    /// Strips every root of `scene` in place.
    ///
    /// On success every remaining component is either allowed or a
    /// dependency (direct or transitive) of an allowed component.
    pub fn strip(
        &self,
        scene: &mut Scene,
        sink: &DiagnosticSink,
    ) -> Result<StripReport, ExportError> {
        let mut report = StripReport::default();
        for root in scene.roots() {
            if self.config.drop_inactive {
                report.nodes_removed +=
                    remove_descendants(scene, root, |n| !n.active)?;
            }
            report.components_removed += self.remove_root_markers(scene, root, sink);
            let marker = self.identity_marker;
            report.nodes_removed +=
                remove_descendants(scene, root, |n| n.has_component(marker))?;
        }
        self.reduce(scene, &mut report)?;
        tracing::trace!(
            scene = scene.name(),
            nodes_removed = report.nodes_removed,
            components_removed = report.components_removed,
            iterations = report.iterations,
            "stripped duplicate"
        );
        Ok(report)
    }

    fn remove_root_markers(&self, scene: &mut Scene, root: NodeId, sink: &DiagnosticSink) -> usize {
        let subject = scene.path(root);
        let Some(node) = scene.node_mut(root) else {
            return 0;
        };
        let before = node.components.len();
        node.components.retain(|c| !c.is(self.identity_marker));
        let removed = before - node.components.len();
        if removed > 1 {
            sink.emit(
                Diagnostic::warning(
                    DiagnosticCode::MULTIPLE_IDENTITY_MARKERS,
                    format!("{removed} identity markers on one object"),
                )
                .with_subject(subject)
                .with_note("only the first marker's identity is used"),
            );
        }
        removed
    }

    fn reduce(&self, scene: &mut Scene, report: &mut StripReport) -> Result<(), ExportError> {
        while report.iterations < self.config.max_iterations {
            report.iterations += 1;
            let live = scene.nodes();
            let required: HashSet<String> = live
                .iter()
                .filter_map(|&id| scene.node(id))
                .flat_map(|n| n.components.iter())
                .flat_map(|c| c.requires.iter().cloned())
                .collect();

            let mut removed = 0;
            for &id in &live {
                if let Some(node) = scene.node_mut(id) {
                    let before = node.components.len();
                    node.components
                        .retain(|c| self.is_allowed(&c.type_tag) || required.contains(&c.type_tag));
                    removed += before - node.components.len();
                }
            }
            report.components_removed += removed;
            if removed == 0 {
                break;
            }
        }

        let remaining = self.unanchored(scene);
        if remaining.is_empty() {
            return Ok(());
        }
        Err(ExportError::DependencyCycleOnStrip {
            subject: scene.name().to_string(),
            remaining,
            iterations: report.iterations,
        })
    }

    /// Non-allowed component types that no allowed component depends on.
    fn unanchored(&self, scene: &Scene) -> Vec<String> {
        let components: Vec<_> = scene
            .nodes()
            .into_iter()
            .filter_map(|id| scene.node(id))
            .flat_map(|n| n.components.iter())
            .collect();

        let mut anchored: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&str> = components
            .iter()
            .filter(|c| self.is_allowed(&c.type_tag))
            .flat_map(|c| c.requires.iter().map(String::as_str))
            .collect();
        while let Some(tag) = pending.pop() {
            if anchored.insert(tag) {
                pending.extend(
                    components
                        .iter()
                        .filter(|c| c.is(tag))
                        .flat_map(|c| c.requires.iter().map(String::as_str)),
                );
            }
        }

        components
            .iter()
            .filter(|c| !self.is_allowed(&c.type_tag) && !anchored.contains(c.type_tag.as_str()))
            .map(|c| c.type_tag.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Removes every descendant of `root` (not `root` itself) matching `doomed`,
/// with its whole subtree. Returns the number of nodes removed.
fn remove_descendants(
    scene: &mut Scene,
    root: NodeId,
    doomed: impl Fn(&Node) -> bool,
) -> Result<usize, ExportError> {
    let targets: Vec<NodeId> = scene
        .subtree_bfs(root)
        .into_iter()
        .skip(1)
        .filter(|&id| scene.node(id).is_some_and(&doomed))
        .collect();
    let mut removed = 0;
    for id in targets {
        // An earlier target may already have taken this one with it.
        if scene.node(id).is_some() {
            removed += scene.remove_subtree(id)?;
        }
    }
    Ok(removed)
}
