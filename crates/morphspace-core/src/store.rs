//! The concurrent candidate store: the shared exploration tree state.

use std::collections::BTreeMap;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::molecule::Molecule;

/// Shared read handle on one candidate. Mutators of the same key block
/// until it is released.
pub type CandidateRef<'a> = dashmap::mapref::one::Ref<'a, String, Molecule>;

/// Exclusive write handle on one candidate. Concurrent mutators of the
/// same key are serialized; other keys proceed in parallel.
pub type CandidateRefMut<'a> = dashmap::mapref::one::RefMut<'a, String, Molecule>;

/// Concurrent map from SMILES to [`Molecule`]: the exploration tree.
///
/// Backed by a sharded hash map: per-key handles serialize writers of the
/// same key without blocking readers of other keys. Handles are not
/// re-entrant across keys; a caller walking parent/child links must drop
/// the current handle before acquiring the next one, or two walkers whose
/// keys share a shard can deadlock.
#[derive(Debug, Default)]
pub struct CandidateStore {
    map: DashMap<String, Molecule>,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, smiles: &str) -> bool {
        self.map.contains_key(smiles)
    }

    /// Acquires a shared handle.
    pub fn get(&self, smiles: &str) -> Option<CandidateRef<'_>> {
        self.map.get(smiles)
    }

    /// Acquires an exclusive handle.
    pub fn get_mut(&self, smiles: &str) -> Option<CandidateRefMut<'_>> {
        self.map.get_mut(smiles)
    }

    /// Inserts (or replaces) a candidate keyed by its own SMILES.
    ///
    /// Insertion is all-or-nothing: concurrent readers observe either the
    /// previous value or the new one, never a partial write.
    pub fn insert(&self, molecule: Molecule) -> Option<Molecule> {
        self.map.insert(molecule.smiles.clone(), molecule)
    }

    /// Inserts only when the key is vacant. Returns false when an entry
    /// already existed (the existing value is left untouched).
    pub fn insert_new(&self, molecule: Molecule) -> bool {
        match self.map.entry(molecule.smiles.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(molecule);
                true
            }
        }
    }

    /// Removes a candidate, returning it when present.
    pub fn remove(&self, smiles: &str) -> Option<Molecule> {
        self.map.remove(smiles).map(|(_, molecule)| molecule)
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    /// Snapshot of the current key set.
    ///
    /// Parallel stages traverse the store by snapshotting the keys and then
    /// acquiring per-key handles, which keeps every mutation under the
    /// per-key handle contract.
    pub fn keys(&self) -> Vec<String> {
        self.map.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Visits every candidate under a shared handle.
    pub fn for_each(&self, mut visit: impl FnMut(&Molecule)) {
        for entry in self.map.iter() {
            visit(entry.value());
        }
    }

    /// Copies the store into an ordered plain map (snapshot support).
    pub fn to_map(&self) -> BTreeMap<String, Molecule> {
        self.map
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Rebuilds the store from a plain map (snapshot restore).
    pub fn from_map(map: BTreeMap<String, Molecule>) -> Self {
        let store = Self::new();
        for (_, molecule) in map {
            store.insert(molecule);
        }
        store
    }
}
