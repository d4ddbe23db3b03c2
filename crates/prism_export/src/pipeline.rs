//! Pass orchestration: from candidates to cached artifacts.
//!
//! An [`ExportSession`] owns the configuration, the cache and artifact
//! stores, and the diagnostic sink. [`ExportSession::begin_pass`] selects the
//! pass's candidates and returns an [`ExportPass`] that mutably borrows the
//! session, so two passes can never run at the same time.
//!
//! A pass processes one candidate per [`ExportPass::step`]: hash the
//! subtree, reuse the cached identities if every bound artifact is still on
//! disk unchanged, otherwise allocate identities, duplicate and strip the
//! subtree, and emit its visual and geometry artifacts. The host yields
//! between steps; [`ExportPass::run`] loops steps and honors a
//! [`CancelToken`] between candidates only.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use prism_cache::{ArtifactStore, Binding, CacheStore, PassKey, PassLedger};
use prism_common::{ContentHash, Identity};
use prism_config::ExportConfig;
use prism_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use prism_graph::{NodeId, SceneGraph};
use tracing::{debug, info, info_span, trace, Span};

use crate::allocator::{AllocationRequest, IdentityAllocator};
use crate::error::ExportError;
use crate::exporter::GeometryExporter;
use crate::hasher::ContentHasher;
use crate::marker::{read_marker, reserved_category, MarkerRead};
use crate::stripper::ComponentStripper;
use crate::walker::HierarchyWalker;

/// A cooperative cancellation flag shared between the host and a pass.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; the pass stops before its next candidate.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How [`ExportPass::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every candidate was visited.
    Completed,
    /// The token was cancelled before the pass ran out of candidates.
    Cancelled,
}

/// The outcome of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReport {
    /// The candidate's root in the host graph.
    pub root: NodeId,
    /// Name path of the root.
    pub path: String,
    /// Content hash of the subtree.
    pub hash: ContentHash,
    /// Identity of each slot node. The host stores these on the identity
    /// markers. Empty when the candidate failed.
    pub assignments: Vec<(NodeId, Identity)>,
}

/// What one [`ExportPass::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Artifacts were (re)emitted and the cache entry recorded.
    Exported(CandidateReport),
    /// The cached entry was still valid; nothing was written.
    Skipped(CandidateReport),
    /// A candidate-local error was reported as a diagnostic; nothing was recorded.
    Failed(CandidateReport),
    /// No candidates are left.
    Done,
}

/// Counters reported when a pass finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Candidates whose artifacts were emitted.
    pub exported: usize,
    /// Candidates reused from the cache.
    pub skipped: usize,
    /// Candidates skipped because of a candidate-local error.
    pub failed: usize,
    /// Identities drawn from the counter.
    pub allocated: usize,
    /// Whether every candidate was visited.
    pub completed: bool,
}

/// Export state shared by consecutive passes.
pub struct ExportSession {
    config: ExportConfig,
    cache: CacheStore,
    artifacts: ArtifactStore,
    sink: DiagnosticSink,
    producer_version: String,
}

impl ExportSession {
    /// Creates a session; the cache directory is resolved against `project_dir`.
    ///
    /// Fails with [`ExportError::MissingRequiredMarkerType`] if no identity
    /// marker type is configured.
    pub fn new(config: ExportConfig, project_dir: &Path) -> Result<Self, ExportError> {
        if config.markers.identity.trim().is_empty() {
            return Err(ExportError::MissingRequiredMarkerType);
        }
        let cache = CacheStore::new(&project_dir.join(&config.cache.dir), &config.cache.version);
        let artifacts = ArtifactStore::new(cache.root());
        Ok(Self {
            config,
            cache,
            artifacts,
            sink: DiagnosticSink::new(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// The session configuration.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// The pass cache files.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// The emitted artifacts.
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Everything reported so far.
    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.sink
    }

    /// Selects the candidates of a pass over `graph` and loads its caches.
    ///
    /// A scene pass covers every node carrying the identity marker (one
    /// slot each), then every coverage root. The template pass covers every
    /// library root containing identity markers, with one slot per marker.
    pub fn begin_pass<'a, G, E>(
        &'a mut self,
        key: PassKey,
        graph: &'a G,
        exporter: &'a mut E,
    ) -> Result<ExportPass<'a, G, E>, ExportError>
    where
        G: SceneGraph + ?Sized,
        E: GeometryExporter + ?Sized,
    {
        let span = info_span!("export_pass", pass = %key);
        let candidates = {
            let _entered = span.enter();
            self.select(&key, graph)?
        };

        let prior = self.cache.load(&key, &self.sink)?;
        let sibling = self.cache.load_sibling(&key, &self.sink)?;
        let ledger = PassLedger::new(prior);
        let allocator = IdentityAllocator::new(
            ledger.prior_bindings(),
            sibling
                .iter()
                .flat_map(|e| e.identities().map(move |id| (id, e.hash))),
        );
        span.in_scope(|| {
            info!(
                candidates = candidates.len(),
                cached = ledger.prior_entries().len(),
                "pass started"
            )
        });

        Ok(ExportPass {
            session: self,
            graph,
            exporter,
            key,
            candidates,
            cursor: 0,
            ledger,
            allocator,
            summary: PassSummary::default(),
            span,
        })
    }

    /// Removes artifacts whose identity no cache of this version binds.
    ///
    /// Run between passes, after both kinds of pass have saved their caches.
    pub fn collect_garbage(&self) -> Result<usize, ExportError> {
        let mut entries = self.cache.load(&PassKey::Templates, &self.sink)?;
        entries.extend(self.cache.load_sibling(&PassKey::Templates, &self.sink)?);
        let live: HashSet<Identity> = entries.iter().flat_map(|e| e.identities()).collect();
        let removed = self.artifacts.gc(&live)?;
        info!(removed, "collected stale artifacts");
        Ok(removed)
    }

    fn select<G: SceneGraph + ?Sized>(
        &self,
        key: &PassKey,
        graph: &G,
    ) -> Result<Vec<Candidate>, ExportError> {
        let walker = HierarchyWalker::new(&self.config.markers);
        let mut candidates = Vec::new();
        match key {
            PassKey::Scene(_) => {
                for node in walker.tracked_nodes(graph)? {
                    candidates.push(Candidate {
                        root: node,
                        slots: vec![self.slot(graph, node)],
                    });
                }
                for root in walker.coverage_roots(graph)? {
                    candidates.push(Candidate {
                        root,
                        slots: vec![self.slot(graph, root)],
                    });
                }
            }
            PassKey::Templates => {
                for root in walker.template_roots(graph)? {
                    let slots = walker
                        .tracked_in(graph, root)
                        .into_iter()
                        .map(|node| self.slot(graph, node))
                        .collect();
                    candidates.push(Candidate { root, slots });
                }
            }
        }
        debug!(count = candidates.len(), "selected candidates");
        Ok(candidates)
    }

    fn slot<G: SceneGraph + ?Sized>(&self, graph: &G, node: NodeId) -> Slot {
        let subject = graph.path(node);
        let (prior, reserved) = match graph.node(node) {
            Some(n) => {
                let prior = match read_marker(n, &self.config.markers.identity) {
                    MarkerRead::Holds(identity) => Some(identity),
                    MarkerRead::Absent => None,
                    MarkerRead::Unreadable => {
                        self.sink.emit(
                            Diagnostic::warning(
                                DiagnosticCode::UNREADABLE_IDENTITY_MARKER,
                                "identity marker state has no readable identity",
                            )
                            .with_subject(subject.clone())
                            .with_note("treated as unassigned"),
                        );
                        None
                    }
                };
                (prior, reserved_category(n, &self.config.markers.reserved))
            }
            None => (None, None),
        };
        Slot {
            node,
            request: AllocationRequest {
                prior,
                reserved,
                subject,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    node: NodeId,
    request: AllocationRequest,
}

#[derive(Debug, Clone)]
struct Candidate {
    root: NodeId,
    slots: Vec<Slot>,
}

/// One running pass.
///
/// Dropping a pass without calling [`finish`](Self::finish) abandons it: the
/// cache file keeps whatever the last checkpoint wrote.
pub struct ExportPass<'a, G: SceneGraph + ?Sized, E: GeometryExporter + ?Sized> {
    session: &'a mut ExportSession,
    graph: &'a G,
    exporter: &'a mut E,
    key: PassKey,
    candidates: Vec<Candidate>,
    cursor: usize,
    ledger: PassLedger,
    allocator: IdentityAllocator,
    summary: PassSummary,
    span: Span,
}

impl<'a, G: SceneGraph + ?Sized, E: GeometryExporter + ?Sized> ExportPass<'a, G, E> {
    /// Which pass this is.
    pub fn key(&self) -> &PassKey {
        &self.key
    }

    /// Number of candidates selected for this pass.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Number of candidates not yet visited.
    pub fn remaining(&self) -> usize {
        self.candidates.len() - self.cursor
    }

    /// Counters so far.
    pub fn summary(&self) -> &PassSummary {
        &self.summary
    }

    /// Processes the next candidate.
    ///
    /// Returns `Err` only for errors that abort the whole pass.
    pub fn step(&mut self) -> Result<Step, ExportError> {
        let span = self.span.clone();
        let _entered = span.enter();
        if self.graph.is_simulating() {
            return Err(ExportError::NotAllowedInCurrentMode);
        }
        let Some(candidate) = self.candidates.get(self.cursor).cloned() else {
            return Ok(Step::Done);
        };
        self.cursor += 1;
        self.process(candidate)
    }

    /// Steps until every candidate is visited or `token` is cancelled.
    ///
    /// The token is checked before each candidate, never during one.
    pub fn run(&mut self, token: &CancelToken) -> Result<RunStatus, ExportError> {
        loop {
            if token.is_cancelled() {
                self.span
                    .in_scope(|| info!(remaining = self.remaining(), "pass cancelled"));
                return Ok(RunStatus::Cancelled);
            }
            if self.step()? == Step::Done {
                return Ok(RunStatus::Completed);
            }
        }
    }

    /// Saves the cache and returns the pass counters.
    ///
    /// A completed pass writes exactly the entries it processed, so entries
    /// for content that disappeared are dropped. An unfinished pass also keeps
    /// the prior entries it never reached.
    pub fn finish(self) -> Result<PassSummary, ExportError> {
        let _entered = self.span.enter();
        let completed = self.cursor >= self.candidates.len();
        let entries = if completed {
            self.ledger.into_final_entries()
        } else {
            self.ledger.checkpoint_entries()
        };
        self.session.cache.save(&entries, &self.key)?;

        let summary = PassSummary {
            allocated: self.allocator.allocated(),
            completed,
            ..self.summary
        };
        info!(
            exported = summary.exported,
            skipped = summary.skipped,
            failed = summary.failed,
            allocated = summary.allocated,
            entries = entries.len(),
            completed,
            "pass finished"
        );
        Ok(summary)
    }

    fn process(&mut self, candidate: Candidate) -> Result<Step, ExportError> {
        let path = self.graph.path(candidate.root);
        let hash = ContentHasher::hash(self.graph, candidate.root);
        let report = |identities: &[Identity]| CandidateReport {
            root: candidate.root,
            path: path.clone(),
            hash,
            assignments: candidate
                .slots
                .iter()
                .map(|s| s.node)
                .zip(identities.iter().copied())
                .collect(),
        };

        if let Some(identities) = self.reusable(hash, candidate.slots.len()) {
            self.allocator.claim(hash, &identities);
            if let Some(entry) = self.ledger.prior(&hash).cloned() {
                self.ledger.keep(entry);
            }
            self.summary.skipped += 1;
            debug!(candidate = %path, %hash, "unchanged, reusing cached artifacts");
            return Ok(Step::Skipped(report(&identities)));
        }

        // A stale entry for the same content still tells us which identities
        // the slots had.
        let cached: Vec<Identity> = self
            .ledger
            .prior(&hash)
            .map(|e| e.identities().collect())
            .unwrap_or_default();
        let requests: Vec<AllocationRequest> = candidate
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| AllocationRequest {
                prior: slot.request.prior.or_else(|| cached.get(i).copied()),
                ..slot.request.clone()
            })
            .collect();
        let identities = self
            .allocator
            .allocate(hash, &requests, &self.session.sink)?;

        let mut bindings = Vec::with_capacity(identities.len());
        for (slot, &identity) in candidate.slots.iter().zip(&identities) {
            match self.emit(slot.node, identity) {
                Ok(binding) => bindings.push(binding),
                Err(err) if err.is_candidate_local() => {
                    let code = match err {
                        ExportError::DependencyCycleOnStrip { .. } => {
                            DiagnosticCode::DEPENDENCY_CYCLE_ON_STRIP
                        }
                        _ => DiagnosticCode::ARTIFACT_WRITE_FAILURE,
                    };
                    self.session.sink.emit(
                        Diagnostic::error(code, err.to_string())
                            .with_subject(slot.request.subject.clone())
                            .with_note("the object was skipped and keeps no cache entry"),
                    );
                    self.summary.failed += 1;
                    return Ok(Step::Failed(report(&[])));
                }
                Err(err) => return Err(err),
            }
        }

        self.allocator.claim(hash, &identities);
        for binding in bindings {
            self.ledger.bind(hash, binding);
        }
        self.summary.exported += 1;
        if self.session.config.cache.checkpoint {
            self.session
                .cache
                .save(&self.ledger.checkpoint_entries(), &self.key)?;
        }
        debug!(candidate = %path, %hash, identities = ?identities, "exported");
        Ok(Step::Exported(report(&identities)))
    }

    /// The identities to reuse for `hash`, if its entry is still valid.
    fn reusable(&self, hash: ContentHash, slots: usize) -> Option<Vec<Identity>> {
        if let Some(entry) = self.ledger.current(&hash) {
            return (entry.bindings.len() == slots).then(|| entry.identities().collect());
        }
        let entry = self.ledger.prior(&hash)?;
        if entry.bindings.len() != slots {
            return None;
        }
        let ext = &self.session.config.exporter.extension;
        let valid = entry.bindings.iter().all(|b| {
            self.allocator.is_free_for(b.identity, hash)
                && self.session.artifacts.artifact_hash(b.identity) == Some(b.artifact)
                && self.session.artifacts.geometry_path(b.identity, ext).is_file()
        });
        valid.then(|| entry.identities().collect())
    }

    /// Duplicates, strips and emits the artifacts of one slot.
    fn emit(&mut self, node: NodeId, identity: Identity) -> Result<Binding, ExportError> {
        let session = &*self.session;
        let mut visual = self.graph.duplicate(node)?;
        let report = ComponentStripper::new(&session.config.markers.identity, &session.config.strip)
            .strip(&mut visual, &session.sink)?;

        // Geometry first: a visual on disk marks the slot as emitted.
        let write_failure = |reason: String| ExportError::ArtifactWriteFailure { identity, reason };
        let destination = session
            .artifacts
            .geometry_destination(identity, &session.config.exporter.extension)
            .map_err(|e| write_failure(e.to_string()))?;
        let handle = self
            .exporter
            .export_geometry(&visual, &session.config.exporter, &destination)
            .map_err(|e| write_failure(e.to_string()))?;
        let artifact = match session
            .artifacts
            .write_visual(identity, &visual, &session.producer_version)
        {
            Ok(artifact) => artifact,
            Err(e) => {
                let _ = std::fs::remove_file(&handle.path);
                return Err(write_failure(e.to_string()));
            }
        };

        trace!(
            %identity,
            %artifact,
            geometry = %handle.path.display(),
            geometry_hash = %handle.hash,
            components_removed = report.components_removed,
            "emitted artifacts"
        );
        Ok(Binding { identity, artifact })
    }
}
