//! Collision-safe assignment of identities within one pass.
//!
//! The allocator is per-pass context state. It knows three things:
//!
//! - which identity each content hash claimed so far this pass;
//! - which identities the *other* pass's cache binds, and to which hashes;
//! - which identities this pass's own previous cache binds.
//!
//! Reserved categories always get their fixed identity. Otherwise a prior
//! identity is kept unless another hash already holds it, and fresh values
//! come from a counter that starts after the reserved range and skips every
//! value that is taken.

use std::collections::{HashMap, HashSet};

use prism_common::{ContentHash, Identity, ReservedCategory};
use prism_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

use crate::error::ExportError;

/// What one slot of a candidate asks the allocator for.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    /// The identity the slot held before this pass, if any.
    pub prior: Option<Identity>,
    /// The reserved category the slot is marked with, if any.
    pub reserved: Option<ReservedCategory>,
    /// Path of the slot node, used in diagnostics.
    pub subject: String,
}

/// Per-pass identity allocation state.
#[derive(Debug)]
pub struct IdentityAllocator {
    claimed: HashMap<Identity, ContentHash>,
    sibling: HashMap<Identity, HashSet<ContentHash>>,
    previous: HashMap<Identity, HashSet<ContentHash>>,
    counter: u16,
    allocated: usize,
}

impl IdentityAllocator {
    /// Creates an allocator from the bindings of this pass's previous cache
    /// and of the other pass's cache.
    pub fn new(
        previous: impl IntoIterator<Item = (Identity, ContentHash)>,
        sibling: impl IntoIterator<Item = (Identity, ContentHash)>,
    ) -> Self {
        Self {
            claimed: HashMap::new(),
            sibling: group(sibling),
            previous: group(previous),
            counter: Identity::LAST_RESERVED.get(),
            allocated: 0,
        }
    }

    /// Returns `true` if `hash` may hold `identity` without colliding.
    ///
    /// Reserved identities are always free for their category.
    pub fn is_free_for(&self, identity: Identity, hash: ContentHash) -> bool {
        if identity.is_reserved() {
            return true;
        }
        let claimed_elsewhere = self.claimed.get(&identity).is_some_and(|h| *h != hash);
        !claimed_elsewhere && !bound_to_other(&self.sibling, identity, hash)
    }

    /// Decides the identities of every slot of one candidate.
    ///
    /// Nothing is claimed yet: call [`claim`](Self::claim) once the
    /// candidate's artifacts are written. Slots of the same candidate never
    /// share a non-reserved identity.
    pub fn allocate(
        &mut self,
        hash: ContentHash,
        requests: &[AllocationRequest],
        sink: &DiagnosticSink,
    ) -> Result<Vec<Identity>, ExportError> {
        let mut decided: Vec<Identity> = Vec::with_capacity(requests.len());
        for request in requests {
            if let Some(category) = request.reserved {
                decided.push(category.identity());
                continue;
            }
            let prior = request.prior.filter(|p| !p.is_unassigned());
            let identity = match prior {
                None => {
                    let (fresh, skipped) = self.next(hash, &decided)?;
                    if !skipped.is_empty() {
                        sink.emit(
                            Diagnostic::warning(
                                DiagnosticCode::DUPLICATE_IDENTITY,
                                format!(
                                    "identities {} are bound to different content in another pass's cache",
                                    join(&skipped)
                                ),
                            )
                            .with_subject(request.subject.clone())
                            .with_note(format!("assigned identity {fresh}")),
                        );
                    }
                    fresh
                }
                Some(p) if p.is_reserved() => {
                    sink.emit(
                        Diagnostic::warning(
                            DiagnosticCode::DUPLICATE_IDENTITY,
                            format!("identity {p} is reserved for a fixed category"),
                        )
                        .with_subject(request.subject.clone())
                        .with_note("a new identity was assigned"),
                    );
                    self.next(hash, &decided)?.0
                }
                Some(p) if self.is_free_for(p, hash) && !decided.contains(&p) => p,
                Some(p) => {
                    let (fresh, _) = self.next(hash, &decided)?;
                    sink.emit(
                        Diagnostic::warning(
                            DiagnosticCode::DUPLICATE_IDENTITY,
                            format!("identity {p} is already bound to different content"),
                        )
                        .with_subject(request.subject.clone())
                        .with_note(format!("reassigned to identity {fresh}")),
                    );
                    fresh
                }
            };
            decided.push(identity);
        }
        Ok(decided)
    }

    /// Records that `hash` holds `identities` for the rest of the pass.
    pub fn claim(&mut self, hash: ContentHash, identities: &[Identity]) {
        for &identity in identities {
            if !identity.is_reserved() {
                self.claimed.insert(identity, hash);
            }
        }
    }

    /// The last value the counter reached.
    pub fn counter(&self) -> Identity {
        Identity::new(self.counter)
    }

    /// How many identities were drawn from the counter.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Draws the next free counter value.
    ///
    /// Also returns the values passed over because a sibling cache binds them
    /// to other content.
    fn next(
        &mut self,
        hash: ContentHash,
        decided: &[Identity],
    ) -> Result<(Identity, Vec<Identity>), ExportError> {
        let mut bound_elsewhere = Vec::new();
        loop {
            if self.counter == u16::MAX {
                return Err(ExportError::IdentitySpaceExhausted {
                    last: Identity::new(self.counter),
                });
            }
            self.counter += 1;
            let candidate = Identity::new(self.counter);
            if candidate.is_reserved()
                || self.claimed.contains_key(&candidate)
                || decided.contains(&candidate)
            {
                continue;
            }
            if bound_to_other(&self.sibling, candidate, hash) {
                bound_elsewhere.push(candidate);
                continue;
            }
            if !bound_to_other(&self.previous, candidate, hash) {
                self.allocated += 1;
                return Ok((candidate, bound_elsewhere));
            }
        }
    }
}

fn group(
    bindings: impl IntoIterator<Item = (Identity, ContentHash)>,
) -> HashMap<Identity, HashSet<ContentHash>> {
    let mut grouped: HashMap<Identity, HashSet<ContentHash>> = HashMap::new();
    for (identity, hash) in bindings {
        if !identity.is_unassigned() {
            grouped.entry(identity).or_default().insert(hash);
        }
    }
    grouped
}

fn join(identities: &[Identity]) -> String {
    identities
        .iter()
        .map(Identity::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn bound_to_other(
    bindings: &HashMap<Identity, HashSet<ContentHash>>,
    identity: Identity,
    hash: ContentHash,
) -> bool {
    bindings
        .get(&identity)
        .is_some_and(|hashes| hashes.iter().any(|h| *h != hash))
}
