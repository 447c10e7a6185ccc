//! The shared per-job exploration state.

use std::collections::BTreeMap;

use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::molecule::Molecule;
use crate::params::MorphingParams;
use crate::selectors::{
    ChemOper, DimRedSelector, FingerprintSelector, ScaffoldSelector, SimCoefSelector,
};
use crate::store::CandidateStore;

/// Everything one job carries between and across iterations.
///
/// The candidate store and the auxiliary indexes are the only structures
/// mutated concurrently within a stage; parameters, selectors and decoys
/// are read-only during a stage and refreshed from the job manager only
/// between iterations.
#[derive(Debug, Default)]
pub struct Context {
    pub job_id: Uuid,
    pub iter_idx: u32,
    pub elapsed_seconds: u64,

    pub fingerprint_selector: FingerprintSelector,
    pub sim_coef_selector: SimCoefSelector,
    pub dim_red_selector: DimRedSelector,
    pub chem_oper_selectors: Vec<ChemOper>,
    pub scaffold_selector: ScaffoldSelector,

    pub params: MorphingParams,

    /// Source molecule (path mode).
    pub source: Molecule,
    /// Target molecule (path mode).
    pub target: Molecule,
    /// Decoys biasing the distance scoring along the decoy-target arc.
    pub decoys: Vec<Molecule>,

    /// Seed pool for activity mode, keyed by SMILES.
    pub source_mols: BTreeMap<String, Molecule>,
    /// SMILES actually seeded into the tree (activity mode).
    pub start_mols: Vec<String>,
    /// The etalon point in normalized descriptor space.
    pub etalon_values: Vec<f64>,
    /// Per-descriptor weights applied to etalon distances.
    pub descriptor_weights: Vec<f64>,
    /// Per-descriptor linear rescaling `(a, b)` so that `norm = a*x + b`.
    pub normalization_coefficients: Vec<(f64, f64)>,
    /// Replacement values for descriptors the backend failed to compute.
    pub imputed_values: Vec<f64>,
    /// Names of the descriptors relevant to this job, in vector order.
    pub relevant_descriptor_names: Vec<String>,

    /// Synthetic root of the tree in scaffold mode.
    pub temp_source: Molecule,
    /// Molecules on the already-committed path (scaffold mode).
    pub path_molecules: Vec<Molecule>,

    /// The exploration tree.
    pub candidates: CandidateStore,
    /// Cumulative morph attempts charged to each node.
    pub morph_derivations: DashMap<String, u32>,
    /// scaffold SMILES -> representative candidate SMILES (scaffold mode).
    pub candidate_scaffolds: DashMap<String, String>,
    /// scaffold SMILES -> committed-path molecule SMILES (scaffold mode).
    pub path_scaffolds: DashMap<String, String>,
    /// Candidates removed during the current iteration, in erase order.
    pub pruned_this_iter: Mutex<Vec<String>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scaffold mode is on when the job selected a scaffold level.
    pub fn scaffold_mode(&self) -> bool {
        self.scaffold_selector != ScaffoldSelector::Off
    }

    /// Charges `attempts` morph attempts to a node. The per-node count only
    /// grows for the lifetime of the node.
    pub fn charge_derivations(&self, smiles: &str, attempts: u32) {
        *self
            .morph_derivations
            .entry(smiles.to_string())
            .or_insert(0) += attempts;
    }

    /// Cumulative morph attempts charged to a node, 0 when never morphed.
    pub fn derivation_count(&self, smiles: &str) -> u32 {
        self.morph_derivations
            .get(smiles)
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Records an erased candidate for the iteration report.
    pub fn record_pruned(&self, smiles: String) {
        self.pruned_this_iter.lock().push(smiles);
    }

    /// Clears the per-iteration prune trace.
    pub fn clear_pruned(&self) {
        self.pruned_this_iter.lock().clear();
    }

    /// Copy of the per-iteration prune trace.
    pub fn pruned(&self) -> Vec<String> {
        self.pruned_this_iter.lock().clone()
    }

    /// Smallest structural distance to the target across the tree, together
    /// with the molecules at distance zero (path-mode reporting).
    pub fn min_dist_to_target(&self) -> (f64, Vec<String>) {
        let mut min = 1.0f64;
        let mut at_zero = Vec::new();
        self.candidates.for_each(|mol| {
            if mol.dist_to_target < min {
                min = mol.dist_to_target;
            }
            if mol.dist_to_target == 0.0 {
                at_zero.push(mol.smiles.clone());
            }
        });
        (min, at_zero)
    }

    /// Smallest etalon distance across the tree (activity-mode reporting).
    pub fn min_dist_to_etalon(&self) -> f64 {
        let mut min = f64::MAX;
        self.candidates.for_each(|mol| {
            if mol.dist_to_etalon < min {
                min = mol.dist_to_etalon;
            }
        });
        min
    }
}
