//! Iteration snapshots: the persistable image of a job's [`Context`].
//!
//! The concurrent runtime structures of the context are flattened into
//! ordered plain maps so a snapshot serializes deterministically. The job
//! manager owns snapshot storage and scheduling; this module only provides
//! the representation, the conversions and file helpers.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::Context;
use crate::error::CoreResult;
use crate::molecule::Molecule;
use crate::params::MorphingParams;
use crate::selectors::{
    ChemOper, DimRedSelector, FingerprintSelector, ScaffoldSelector, SimCoefSelector,
};
use crate::store::CandidateStore;

/// Serializable image of one job between iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationSnapshot {
    pub job_id: Uuid,
    pub iter_idx: u32,
    pub elapsed_seconds: u64,
    pub created_at: DateTime<Utc>,

    pub fingerprint_selector: FingerprintSelector,
    pub sim_coef_selector: SimCoefSelector,
    pub dim_red_selector: DimRedSelector,
    pub chem_oper_selectors: Vec<ChemOper>,
    pub scaffold_selector: ScaffoldSelector,

    pub params: MorphingParams,

    pub source: Molecule,
    pub target: Molecule,
    pub decoys: Vec<Molecule>,

    pub source_mols: BTreeMap<String, Molecule>,
    pub start_mols: Vec<String>,
    pub etalon_values: Vec<f64>,
    pub descriptor_weights: Vec<f64>,
    pub normalization_coefficients: Vec<(f64, f64)>,
    pub imputed_values: Vec<f64>,
    pub relevant_descriptor_names: Vec<String>,

    pub temp_source: Molecule,
    pub path_molecules: Vec<Molecule>,

    pub candidates: BTreeMap<String, Molecule>,
    pub morph_derivations: BTreeMap<String, u32>,
    pub candidate_scaffolds: BTreeMap<String, String>,
    pub path_scaffolds: BTreeMap<String, String>,
    pub pruned_this_iter: Vec<String>,
}

impl IterationSnapshot {
    /// Captures the persistable state of a context.
    pub fn from_context(ctx: &Context) -> Self {
        Self {
            job_id: ctx.job_id,
            iter_idx: ctx.iter_idx,
            elapsed_seconds: ctx.elapsed_seconds,
            created_at: Utc::now(),
            fingerprint_selector: ctx.fingerprint_selector,
            sim_coef_selector: ctx.sim_coef_selector,
            dim_red_selector: ctx.dim_red_selector,
            chem_oper_selectors: ctx.chem_oper_selectors.clone(),
            scaffold_selector: ctx.scaffold_selector,
            params: ctx.params.clone(),
            source: ctx.source.clone(),
            target: ctx.target.clone(),
            decoys: ctx.decoys.clone(),
            source_mols: ctx.source_mols.clone(),
            start_mols: ctx.start_mols.clone(),
            etalon_values: ctx.etalon_values.clone(),
            descriptor_weights: ctx.descriptor_weights.clone(),
            normalization_coefficients: ctx.normalization_coefficients.clone(),
            imputed_values: ctx.imputed_values.clone(),
            relevant_descriptor_names: ctx.relevant_descriptor_names.clone(),
            temp_source: ctx.temp_source.clone(),
            path_molecules: ctx.path_molecules.clone(),
            candidates: ctx.candidates.to_map(),
            morph_derivations: ctx
                .morph_derivations
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
            candidate_scaffolds: ctx
                .candidate_scaffolds
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
            path_scaffolds: ctx
                .path_scaffolds
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
            pruned_this_iter: ctx.pruned(),
        }
    }

    /// Rebuilds a context, including the concurrent runtime structures.
    pub fn into_context(self) -> Context {
        let ctx = Context {
            job_id: self.job_id,
            iter_idx: self.iter_idx,
            elapsed_seconds: self.elapsed_seconds,
            fingerprint_selector: self.fingerprint_selector,
            sim_coef_selector: self.sim_coef_selector,
            dim_red_selector: self.dim_red_selector,
            chem_oper_selectors: self.chem_oper_selectors,
            scaffold_selector: self.scaffold_selector,
            params: self.params,
            source: self.source,
            target: self.target,
            decoys: self.decoys,
            source_mols: self.source_mols,
            start_mols: self.start_mols,
            etalon_values: self.etalon_values,
            descriptor_weights: self.descriptor_weights,
            normalization_coefficients: self.normalization_coefficients,
            imputed_values: self.imputed_values,
            relevant_descriptor_names: self.relevant_descriptor_names,
            temp_source: self.temp_source,
            path_molecules: self.path_molecules,
            candidates: CandidateStore::from_map(self.candidates),
            ..Context::default()
        };
        for (smiles, count) in self.morph_derivations {
            ctx.morph_derivations.insert(smiles, count);
        }
        for (scaffold, smiles) in self.candidate_scaffolds {
            ctx.candidate_scaffolds.insert(scaffold, smiles);
        }
        for (scaffold, smiles) in self.path_scaffolds {
            ctx.path_scaffolds.insert(scaffold, smiles);
        }
        *ctx.pruned_this_iter.lock() = self.pruned_this_iter;
        ctx
    }

    /// Job-intake validation: a snapshot describes a runnable job.
    pub fn is_valid(&self) -> bool {
        if self.chem_oper_selectors.is_empty() || self.params.validate().is_err() {
            return false;
        }
        if self.decoys.iter().any(|decoy| !decoy.is_valid()) {
            return false;
        }

        if self.params.activity_morphing {
            return !self.source_mols.is_empty()
                && !self.etalon_values.is_empty()
                && !self.relevant_descriptor_names.is_empty();
        }

        let scaffolds_valid = self.scaffold_selector == ScaffoldSelector::Off
            || (self.temp_source.is_valid() && !self.path_molecules.is_empty());
        self.source.is_valid()
            && self.target.is_valid()
            && self.source.smiles != self.target.smiles
            && scaffolds_valid
    }

    /// Writes the snapshot as pretty JSON.
    pub fn save_json(&self, path: &Path) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::debug!(job = %self.job_id, iter = self.iter_idx, path = %path.display(), "snapshot written");
        Ok(())
    }

    /// Reads a JSON snapshot.
    pub fn load_json(path: &Path) -> CoreResult<Self> {
        let json = fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&json)?;
        tracing::debug!(job = %snapshot.job_id, iter = snapshot.iter_idx, path = %path.display(), "snapshot restored");
        Ok(snapshot)
    }

    /// Writes the snapshot in the compact binary format.
    pub fn save_binary(&self, path: &Path) -> CoreResult<()> {
        let bytes = bincode::serialize(self)?;
        fs::write(path, bytes)?;
        tracing::debug!(job = %self.job_id, iter = self.iter_idx, path = %path.display(), "snapshot written");
        Ok(())
    }

    /// Reads a binary snapshot.
    pub fn load_binary(path: &Path) -> CoreResult<Self> {
        let bytes = fs::read(path)?;
        let snapshot: Self = bincode::deserialize(&bytes)?;
        tracing::debug!(job = %snapshot.job_id, iter = snapshot.iter_idx, path = %path.display(), "snapshot restored");
        Ok(snapshot)
    }
}
