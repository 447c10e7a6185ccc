//! Deduplicating sink for generated morphs.

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashSet;
use parking_lot::Mutex;

use morphspace_core::molecule::Molecule;
use morphspace_core::traits::MorphSink;

/// Collects morphs delivered by the morphing kernel on arbitrary worker
/// threads, keeping only the first arrival of each SMILES.
///
/// The attempt counter counts every delivery, duplicates included, so the
/// producing parent is charged even for morphs it failed to make unique.
/// The dedup set spans the collector's lifetime: one iteration.
#[derive(Debug, Default)]
pub struct MorphCollector {
    seen: DashSet<String>,
    morphs: Mutex<Vec<Molecule>>,
    attempts: AtomicU32,
}

impl MorphCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the attempt count accumulated since the last withdrawal and
    /// resets it. Called once per morphed candidate to charge its
    /// derivation budget.
    pub fn withdraw_attempt_count(&self) -> u32 {
        self.attempts.swap(0, Ordering::Relaxed)
    }

    /// Number of unique morphs collected so far.
    pub fn len(&self) -> usize {
        self.morphs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.morphs.lock().is_empty()
    }

    /// Consumes the collector, yielding the unique morphs in arrival order.
    pub fn into_morphs(self) -> Vec<Molecule> {
        self.morphs.into_inner()
    }
}

impl MorphSink for MorphCollector {
    fn on_morph(&self, morph: Molecule) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if self.seen.insert(morph.smiles.clone()) {
            self.morphs.lock().push(morph);
        }
        // duplicate: dropped silently, only the attempt is charged
    }
}
