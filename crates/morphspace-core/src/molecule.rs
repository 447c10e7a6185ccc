//! The candidate molecule: one node of the exploration tree.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// A candidate molecule in the exploration tree.
///
/// The canonical SMILES string is the node identity: parent/child linkage is
/// by SMILES value, not by reference, so the tree contains no cyclic
/// ownership. A molecule with an empty `parent_smiles` is a source and is
/// never pruned.
///
/// `descendants` holds the children currently attached to this node;
/// `historic_descendants` additionally remembers every child ever produced
/// from it, so the same morph is not re-tried after its branch was pruned.
/// The historic set only grows for the lifetime of the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    /// Canonical SMILES, the unique identity within a job.
    pub smiles: String,
    /// Human-readable label. May be empty in path mode; activity mode
    /// assigns `MORPH_<iter>_<n>` ids during descriptor computation.
    pub id: String,
    /// SMILES of the parent node; empty for a source.
    pub parent_smiles: String,
    /// Children currently attached to this node.
    pub descendants: BTreeSet<String>,
    /// Every child ever produced with this node as parent.
    pub historic_descendants: BTreeSet<String>,
    /// Structural distance to the target (path mode).
    pub dist_to_target: f64,
    /// Structural distance to the nearest decoy (path mode).
    pub dist_to_closest_decoy: f64,
    /// Molecular weight, bounded by the filter policy.
    pub molecular_weight: f64,
    /// Synthetic-accessibility score (Ertl).
    pub sascore: f64,
    /// Iterations since an improvement was observed in this subtree.
    pub iters_without_dist_improvement: u32,
    /// Age counter (activity mode).
    pub iters_fresh: u32,
    /// Once true the node is inert: no morphing, no pruning (activity mode).
    pub decayed: bool,
    /// Scaffold SMILES, the secondary identity in scaffold mode; empty
    /// when scaffold mode is off.
    pub scaffold_smiles: String,
    /// Normalized values of the relevant descriptors (activity mode).
    pub descriptor_values: Vec<f64>,
    /// Per-descriptor weighted distance from the etalon (activity mode).
    pub etalon_distances: Vec<f64>,
    /// Scalar summary of `etalon_distances` (activity mode).
    pub dist_to_etalon: f64,
}

impl Default for Molecule {
    /// An empty, invalid molecule; placeholder until a job fills it in.
    fn default() -> Self {
        Self::new("")
    }
}

impl Molecule {
    /// Creates a molecule with the given SMILES and neutral scores.
    pub fn new(smiles: impl Into<String>) -> Self {
        Self {
            smiles: smiles.into(),
            id: String::new(),
            parent_smiles: String::new(),
            descendants: BTreeSet::new(),
            historic_descendants: BTreeSet::new(),
            dist_to_target: 1.0,
            dist_to_closest_decoy: 0.0,
            molecular_weight: 0.0,
            sascore: 0.0,
            iters_without_dist_improvement: 0,
            iters_fresh: 0,
            decayed: false,
            scaffold_smiles: String::new(),
            descriptor_values: Vec::new(),
            etalon_distances: Vec::new(),
            dist_to_etalon: f64::MAX,
        }
    }

    /// Creates a molecule with a human-readable id.
    pub fn with_id(smiles: impl Into<String>, id: impl Into<String>) -> Self {
        let mut mol = Self::new(smiles);
        mol.id = id.into();
        mol
    }

    /// A source molecule has no parent.
    pub fn is_source(&self) -> bool {
        self.parent_smiles.is_empty()
    }

    /// A molecule is usable as job input when it has an identity.
    pub fn is_valid(&self) -> bool {
        !self.smiles.is_empty()
    }

    /// Adopts a computed descriptor row, in the order given by `names`.
    ///
    /// Descriptors absent from `values` become NaN and are later replaced
    /// by [`Molecule::normalize_descriptors`] imputation.
    pub fn save_descriptors(&mut self, values: &HashMap<String, f64>, names: &[String]) {
        self.descriptor_values = names
            .iter()
            .map(|name| values.get(name).copied().unwrap_or(f64::NAN))
            .collect();
    }

    /// Applies per-descriptor linear rescaling `a*x + b`.
    ///
    /// Non-finite raw values are replaced from `imputations` (when provided)
    /// before scaling, so a single failed descriptor does not poison the
    /// whole vector.
    pub fn normalize_descriptors(&mut self, coefficients: &[(f64, f64)], imputations: &[f64]) {
        for (idx, value) in self.descriptor_values.iter_mut().enumerate() {
            if !value.is_finite() {
                if let Some(imputed) = imputations.get(idx) {
                    *value = *imputed;
                }
            }
            if let Some((a, b)) = coefficients.get(idx) {
                *value = a * *value + b;
            }
        }
    }

    /// Computes per-descriptor weighted distances from the etalon point and
    /// their scalar summary.
    ///
    /// A missing or non-finite descriptor makes `dist_to_etalon` `f64::MAX`
    /// so the morph sorts and filters worst.
    pub fn compute_etalon_distances(&mut self, etalon: &[f64], weights: &[f64]) {
        if self.descriptor_values.len() != etalon.len() {
            self.etalon_distances.clear();
            self.dist_to_etalon = f64::MAX;
            return;
        }

        self.etalon_distances = self
            .descriptor_values
            .iter()
            .zip(etalon.iter())
            .enumerate()
            .map(|(idx, (value, reference))| {
                let weight = weights.get(idx).copied().unwrap_or(1.0);
                weight * (value - reference).abs()
            })
            .collect();

        self.dist_to_etalon = if self.etalon_distances.iter().all(|d| d.is_finite()) {
            self.etalon_distances.iter().sum()
        } else {
            f64::MAX
        };
    }

    /// Weighted L1 distance between two molecules' normalized descriptor
    /// vectors. Returns `f64::MAX` on dimension mismatch.
    pub fn distance_from(&self, other: &Molecule, weights: &[f64]) -> f64 {
        if self.descriptor_values.len() != other.descriptor_values.len()
            || self.descriptor_values.is_empty()
        {
            return f64::MAX;
        }
        self.descriptor_values
            .iter()
            .zip(other.descriptor_values.iter())
            .enumerate()
            .map(|(idx, (a, b))| weights.get(idx).copied().unwrap_or(1.0) * (a - b).abs())
            .sum()
    }
}
