//! In-memory working set of a running pass.

use std::collections::HashMap;

use prism_common::{ContentHash, Identity};

use crate::entry::{Binding, CacheEntry};

/// The entries a pass loaded at start and the entries it has produced so far.
///
/// The ledger is owned exclusively by one pass. Entries are kept in the order
/// candidates were processed so that an unchanged rerun writes a
/// byte-identical file.
#[derive(Debug, Default)]
pub struct PassLedger {
    prior: Vec<CacheEntry>,
    prior_index: HashMap<ContentHash, usize>,
    current: Vec<CacheEntry>,
    current_index: HashMap<ContentHash, usize>,
}

impl PassLedger {
    /// Creates a ledger over the entries loaded from this pass's cache file.
    ///
    /// If the file contained the same hash twice, the first record wins.
    pub fn new(prior: Vec<CacheEntry>) -> Self {
        let mut prior_index = HashMap::with_capacity(prior.len());
        for (i, entry) in prior.iter().enumerate() {
            prior_index.entry(entry.hash).or_insert(i);
        }
        Self {
            prior,
            prior_index,
            current: Vec::new(),
            current_index: HashMap::new(),
        }
    }

    /// Looks up the entry the previous run recorded for `hash`.
    pub fn prior(&self, hash: &ContentHash) -> Option<&CacheEntry> {
        self.prior_index.get(hash).map(|&i| &self.prior[i])
    }

    /// All entries loaded at pass start.
    pub fn prior_entries(&self) -> &[CacheEntry] {
        &self.prior
    }

    /// Looks up the entry produced this pass for `hash`.
    pub fn current(&self, hash: &ContentHash) -> Option<&CacheEntry> {
        self.current_index.get(hash).map(|&i| &self.current[i])
    }

    /// Entries produced so far this pass, in processing order.
    pub fn current_entries(&self) -> &[CacheEntry] {
        &self.current
    }

    /// Carries a still-valid prior entry over unchanged.
    ///
    /// A second candidate with the same hash does not duplicate the record.
    pub fn keep(&mut self, entry: CacheEntry) {
        if self.current_index.contains_key(&entry.hash) {
            return;
        }
        self.current_index.insert(entry.hash, self.current.len());
        self.current.push(entry);
    }

    /// Appends a fresh binding to the entry for `hash`, creating it if needed.
    pub fn bind(&mut self, hash: ContentHash, binding: Binding) {
        match self.current_index.get(&hash) {
            Some(&i) => self.current[i].bindings.push(binding),
            None => {
                self.current_index.insert(hash, self.current.len());
                self.current.push(CacheEntry {
                    hash,
                    bindings: vec![binding],
                });
            }
        }
    }

    /// Every identity bound by the previous run, with its hash.
    pub fn prior_bindings(&self) -> impl Iterator<Item = (Identity, ContentHash)> + '_ {
        self.prior
            .iter()
            .flat_map(|e| e.identities().map(move |id| (id, e.hash)))
    }

    /// What a checkpoint writes: processed entries, then prior entries not yet revisited.
    ///
    /// Keeping the unvisited prior entries means an interrupted pass still
    /// remembers every artifact the previous run produced.
    pub fn checkpoint_entries(&self) -> Vec<CacheEntry> {
        let mut out = self.current.clone();
        out.extend(
            self.prior
                .iter()
                .filter(|e| !self.current_index.contains_key(&e.hash))
                .cloned(),
        );
        out
    }

    /// What the final save writes: processed entries only.
    pub fn into_final_entries(self) -> Vec<CacheEntry> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_common::ArtifactHash;

    fn h(seed: &str) -> ContentHash {
        ContentHash::from_bytes(seed.as_bytes())
    }

    fn binding(id: u16) -> Binding {
        Binding {
            identity: Identity::new(id),
            artifact: ArtifactHash::from_bytes(&id.to_le_bytes()),
        }
    }

    #[test]
    fn prior_lookup_first_record_wins() {
        let first = CacheEntry {
            hash: h("a"),
            bindings: vec![binding(4)],
        };
        let dup = CacheEntry {
            hash: h("a"),
            bindings: vec![binding(9)],
        };
        let ledger = PassLedger::new(vec![first.clone(), dup]);
        assert_eq!(ledger.prior(&h("a")), Some(&first));
        assert!(ledger.prior(&h("b")).is_none());
    }

    #[test]
    fn bind_appends_to_existing_hash() {
        let mut ledger = PassLedger::default();
        ledger.bind(h("root"), binding(4));
        ledger.bind(h("root"), binding(5));
        ledger.bind(h("other"), binding(6));
        assert_eq!(ledger.current_entries().len(), 2);
        let ids: Vec<u16> = ledger
            .current(&h("root"))
            .unwrap()
            .identities()
            .map(Identity::get)
            .collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn keep_does_not_duplicate() {
        let entry = CacheEntry {
            hash: h("a"),
            bindings: vec![binding(4)],
        };
        let mut ledger = PassLedger::new(vec![entry.clone()]);
        ledger.keep(entry.clone());
        ledger.keep(entry);
        assert_eq!(ledger.current_entries().len(), 1);
    }

    #[test]
    fn checkpoint_keeps_unvisited_prior_entries() {
        let a = CacheEntry {
            hash: h("a"),
            bindings: vec![binding(4)],
        };
        let b = CacheEntry {
            hash: h("b"),
            bindings: vec![binding(5)],
        };
        let mut ledger = PassLedger::new(vec![a.clone(), b.clone()]);
        ledger.keep(b.clone());
        ledger.bind(h("c"), binding(6));

        let checkpoint = ledger.checkpoint_entries();
        let hashes: Vec<ContentHash> = checkpoint.iter().map(|e| e.hash).collect();
        assert_eq!(hashes, vec![h("b"), h("c"), h("a")]);

        let finals: Vec<ContentHash> = ledger.into_final_entries().iter().map(|e| e.hash).collect();
        assert_eq!(finals, vec![h("b"), h("c")]);
    }

    #[test]
    fn prior_bindings_flatten_all_identities() {
        let ledger = PassLedger::new(vec![CacheEntry {
            hash: h("a"),
            bindings: vec![binding(4), binding(7)],
        }]);
        let ids: Vec<(u16, ContentHash)> = ledger
            .prior_bindings()
            .map(|(id, hash)| (id.get(), hash))
            .collect();
        assert_eq!(ids, vec![(4, h("a")), (7, h("a"))]);
    }
}
