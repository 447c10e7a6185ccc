//! Contracts for the external collaborators of the engine.
//!
//! The engine consumes chemistry, descriptor computation, visualization and
//! job scheduling purely through these traits; implementations live in the
//! host application (RDKit bindings, a PaDEL subprocess wrapper, a database
//! backed job queue, ...). Test suites plug in lightweight in-memory
//! implementations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::context::Context;
use crate::error::CoreResult;
use crate::molecule::Molecule;
use crate::params::MorphingParams;
use crate::selectors::{
    ChemOper, DimRedSelector, FingerprintSelector, ScaffoldSelector, SimCoefSelector,
};

/// Capability object receiving generated morphs.
///
/// The morphing kernel invokes `on_morph` once per produced morph, from
/// arbitrary worker threads.
pub trait MorphSink: Send + Sync {
    fn on_morph(&self, morph: Molecule);
}

/// The external morphing kernel: applies randomized structural operators to
/// a candidate and scores the results.
pub trait MorphingKernel: Send + Sync {
    /// Generates up to `attempts` morphs of `candidate` and feeds them to
    /// `sink`. Implementations must honor the cancel token and may deliver
    /// morphs from multiple threads concurrently.
    ///
    /// Every delivered morph carries the candidate's SMILES as its parent
    /// and the distances/scores the kernel computed for it.
    #[allow(clippy::too_many_arguments)]
    fn generate_morphs(
        &self,
        candidate: &Molecule,
        attempts: u32,
        fingerprint: FingerprintSelector,
        sim_coef: SimCoefSelector,
        operators: &[ChemOper],
        target: Option<&Molecule>,
        decoys: &[Molecule],
        cancel: &CancelToken,
        sink: &dyn MorphSink,
        scaffold: Option<&dyn ScaffoldExtractor>,
    );
}

/// Fingerprint similarity between two molecules.
pub trait SimilarityMeasure: Send + Sync {
    /// Similarity coefficient in `[0, 1]`.
    fn sim_coef(&self, a: &Molecule, b: &Molecule) -> f64;

    /// Converts a similarity coefficient into a distance.
    fn to_distance(&self, sim: f64) -> f64 {
        1.0 - sim
    }
}

/// Extracts the scaffold identity of a molecule.
pub trait ScaffoldExtractor: Send + Sync {
    /// Canonical scaffold SMILES for the given molecule.
    fn scaffold_of(&self, smiles: &str) -> CoreResult<String>;

    /// Operators that preserve membership in this scaffold level.
    fn useful_operators(&self) -> Vec<ChemOper>;
}

/// Provides scaffold extractors per selected scaffold level.
pub trait ScaffoldProvider: Send + Sync {
    fn extractor(&self, selector: ScaffoldSelector) -> Option<Box<dyn ScaffoldExtractor>>;
}

/// One batch of external descriptor computation (PaDEL-style subprocess).
pub trait DescriptorBatch {
    /// Queues a molecule for computation.
    fn add(&mut self, molecule: &Molecule);

    /// Runs the computation for every queued molecule.
    fn compute(&mut self) -> CoreResult<()>;

    /// Computed descriptor values for one molecule, keyed by name.
    fn get(&self, molecule: &Molecule) -> CoreResult<HashMap<String, f64>>;
}

/// Factory for descriptor computation batches.
pub trait DescriptorBackend: Send + Sync {
    /// Creates a batch writing its scratch files under `output_dir`.
    fn create_batch(
        &self,
        output_dir: &Path,
        descriptor_names: &[String],
        threads: usize,
    ) -> CoreResult<Box<dyn DescriptorBatch>>;
}

/// Dimensionality reduction of the current tree for visualization.
pub trait DimensionReducer: Send + Sync {
    fn reduce(
        &self,
        molecules: &[Molecule],
        fingerprint: FingerprintSelector,
        sim_coef: SimCoefSelector,
        cancel: &CancelToken,
    ) -> CoreResult<()>;
}

/// The job manager the exploration thread hands off to.
///
/// `get_job` blocks until a job is available (returning true and populating
/// the context, possibly from a restored snapshot) or shuts the thread down
/// by returning false. Between iterations the engine re-reads the mutable
/// job inputs through the getter methods, and `commit_iteration` returns
/// the updated continue flag: the manager may cancel, pause or reconfigure
/// the job there.
pub trait JobManager: Send + Sync {
    /// Blocking poll for the next job. Returns false to request shutdown.
    fn get_job(&self, ctx: &mut Context) -> bool;

    /// Root directory for per-iteration scratch output.
    fn storage_dir(&self) -> PathBuf;

    fn fingerprint_selector(&self) -> FingerprintSelector;
    fn sim_coef_selector(&self) -> SimCoefSelector;
    fn dim_red_selector(&self) -> DimRedSelector;
    fn chem_oper_selectors(&self) -> Vec<ChemOper>;
    fn params(&self) -> MorphingParams;
    fn decoys(&self) -> Vec<Molecule>;

    /// Molecules the user marked for deferred pruning in the front end.
    fn pruned(&self) -> Vec<Molecule>;

    /// Hands the iteration result back. The return value replaces the
    /// engine's continue flag.
    fn commit_iteration(&self, ctx: &mut Context, can_continue: bool, path_found: bool) -> bool;
}
