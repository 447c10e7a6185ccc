//! In-memory stand-ins for the external collaborators, used by the
//! integration suite. The kernel replays a scripted morph table and the
//! job manager serves a single snapshot-seeded job while recording every
//! committed iteration.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use morphspace_core::cancel::CancelToken;
use morphspace_core::context::Context;
use morphspace_core::error::{CoreError, CoreResult};
use morphspace_core::molecule::Molecule;
use morphspace_core::params::MorphingParams;
use morphspace_core::selectors::{
    ChemOper, DimRedSelector, FingerprintSelector, SimCoefSelector,
};
use morphspace_core::snapshot::IterationSnapshot;
use morphspace_core::traits::{
    DescriptorBackend, DescriptorBatch, JobManager, MorphSink, MorphingKernel, ScaffoldExtractor,
};

/// A morph with plausible filter-passing defaults.
pub fn viable_morph(smiles: &str, dist_to_target: f64) -> Molecule {
    let mut mol = Molecule::new(smiles);
    mol.molecular_weight = 300.0;
    mol.sascore = 3.0;
    mol.dist_to_target = dist_to_target;
    mol
}

/// Replays a fixed parent-SMILES -> children table. Every listed child is
/// delivered `repeats` times, so duplicate suppression and attempt
/// charging stay observable.
#[derive(Default)]
pub struct TableKernel {
    children: HashMap<String, Vec<Molecule>>,
    repeats: usize,
}

impl TableKernel {
    pub fn new() -> Self {
        Self {
            children: HashMap::new(),
            repeats: 1,
        }
    }

    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn produces(mut self, parent: &str, children: Vec<Molecule>) -> Self {
        self.children.insert(parent.to_string(), children);
        self
    }
}

impl MorphingKernel for TableKernel {
    fn generate_morphs(
        &self,
        candidate: &Molecule,
        _attempts: u32,
        _fingerprint: FingerprintSelector,
        _sim_coef: SimCoefSelector,
        _operators: &[ChemOper],
        _target: Option<&Molecule>,
        _decoys: &[Molecule],
        cancel: &CancelToken,
        sink: &dyn MorphSink,
        scaffold: Option<&dyn ScaffoldExtractor>,
    ) {
        let Some(children) = self.children.get(&candidate.smiles) else {
            return;
        };
        for child in children {
            if cancel.is_cancelled() {
                return;
            }
            for _ in 0..self.repeats {
                let mut morph = child.clone();
                morph.parent_smiles = candidate.smiles.clone();
                if let Some(extractor) = scaffold {
                    if let Ok(scaffold_smiles) = extractor.scaffold_of(&morph.smiles) {
                        morph.scaffold_smiles = scaffold_smiles;
                    }
                }
                sink.on_morph(morph);
            }
        }
    }
}

/// One committed iteration as observed by the job manager.
pub struct CommitRecord {
    pub can_continue: bool,
    pub path_found: bool,
    pub snapshot: IterationSnapshot,
}

/// Serves one snapshot-seeded job and records every commit. A safety cap
/// on the number of commits keeps a runaway engine from spinning forever.
pub struct ScriptedJobManager {
    job: Mutex<Option<IterationSnapshot>>,
    params: MorphingParams,
    decoys: Vec<Molecule>,
    deferred: Mutex<Vec<Molecule>>,
    pub commits: Mutex<Vec<CommitRecord>>,
    safety_cap: usize,
    _storage: TempDir,
    storage_dir: PathBuf,
}

impl ScriptedJobManager {
    pub fn single_job(snapshot: IterationSnapshot, safety_cap: usize) -> Self {
        let storage = TempDir::new().expect("scratch directory");
        let storage_dir = storage.path().to_path_buf();
        Self {
            params: snapshot.params.clone(),
            decoys: snapshot.decoys.clone(),
            job: Mutex::new(Some(snapshot)),
            deferred: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
            safety_cap,
            _storage: storage,
            storage_dir,
        }
    }

    /// Queues molecules the "front end" marked for deferred pruning; they
    /// are handed out once, on the next iteration.
    pub fn defer_prune(&self, molecules: Vec<Molecule>) {
        *self.deferred.lock() = molecules;
    }

    pub fn last_snapshot(&self) -> IterationSnapshot {
        self.commits
            .lock()
            .last()
            .expect("at least one committed iteration")
            .snapshot
            .clone()
    }
}

impl JobManager for ScriptedJobManager {
    fn get_job(&self, ctx: &mut Context) -> bool {
        match self.job.lock().take() {
            Some(snapshot) => {
                assert!(snapshot.is_valid(), "scripted job must be valid");
                *ctx = snapshot.into_context();
                true
            }
            None => false,
        }
    }

    fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone()
    }

    fn fingerprint_selector(&self) -> FingerprintSelector {
        FingerprintSelector::Morgan
    }

    fn sim_coef_selector(&self) -> SimCoefSelector {
        SimCoefSelector::Tanimoto
    }

    fn dim_red_selector(&self) -> DimRedSelector {
        DimRedSelector::Pca
    }

    fn chem_oper_selectors(&self) -> Vec<ChemOper> {
        ChemOper::all()
    }

    fn params(&self) -> MorphingParams {
        self.params.clone()
    }

    fn decoys(&self) -> Vec<Molecule> {
        self.decoys.clone()
    }

    fn pruned(&self) -> Vec<Molecule> {
        std::mem::take(&mut self.deferred.lock())
    }

    fn commit_iteration(&self, ctx: &mut Context, can_continue: bool, path_found: bool) -> bool {
        let mut commits = self.commits.lock();
        commits.push(CommitRecord {
            can_continue,
            path_found,
            snapshot: IterationSnapshot::from_context(ctx),
        });
        can_continue && commits.len() < self.safety_cap
    }
}

/// Descriptor backend answering from a fixed SMILES -> row table.
pub struct TableDescriptorBackend {
    rows: HashMap<String, HashMap<String, f64>>,
}

impl TableDescriptorBackend {
    pub fn new(rows: Vec<(&str, Vec<(&str, f64)>)>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .map(|(smiles, row)| {
                    (
                        smiles.to_string(),
                        row.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
                    )
                })
                .collect(),
        }
    }
}

struct TableBatch {
    rows: HashMap<String, HashMap<String, f64>>,
    queued: Vec<String>,
}

impl DescriptorBatch for TableBatch {
    fn add(&mut self, molecule: &Molecule) {
        self.queued.push(molecule.smiles.clone());
    }

    fn compute(&mut self) -> CoreResult<()> {
        Ok(())
    }

    fn get(&self, molecule: &Molecule) -> CoreResult<HashMap<String, f64>> {
        self.rows
            .get(&molecule.smiles)
            .cloned()
            .ok_or_else(|| CoreError::validation("descriptors", "no row for molecule"))
    }
}

impl DescriptorBackend for TableDescriptorBackend {
    fn create_batch(
        &self,
        _output_dir: &Path,
        _descriptor_names: &[String],
        _threads: usize,
    ) -> CoreResult<Box<dyn DescriptorBatch>> {
        Ok(Box::new(TableBatch {
            rows: self.rows.clone(),
            queued: Vec::new(),
        }))
    }
}

/// Dimension reducer that only records how many molecules it was handed.
#[derive(Default)]
pub struct RecordingReducer {
    pub batches: Mutex<Vec<usize>>,
}

impl morphspace_core::traits::DimensionReducer for RecordingReducer {
    fn reduce(
        &self,
        molecules: &[Molecule],
        _fingerprint: FingerprintSelector,
        _sim_coef: SimCoefSelector,
        _cancel: &CancelToken,
    ) -> CoreResult<()> {
        self.batches.lock().push(molecules.len());
        Ok(())
    }
}

/// Provider handing out [`FirstAtomScaffold`] for every scaffold level.
pub struct FirstAtomScaffoldProvider;

impl morphspace_core::traits::ScaffoldProvider for FirstAtomScaffoldProvider {
    fn extractor(
        &self,
        _selector: morphspace_core::selectors::ScaffoldSelector,
    ) -> Option<Box<dyn ScaffoldExtractor>> {
        Some(Box::new(FirstAtomScaffold))
    }
}

/// Scaffold extractor for tests: the scaffold is the first character of
/// the SMILES.
pub struct FirstAtomScaffold;

impl ScaffoldExtractor for FirstAtomScaffold {
    fn scaffold_of(&self, smiles: &str) -> CoreResult<String> {
        smiles
            .chars()
            .next()
            .map(|c| c.to_string())
            .ok_or_else(|| CoreError::validation("smiles", "empty molecule"))
    }

    fn useful_operators(&self) -> Vec<ChemOper> {
        vec![ChemOper::AddAtom, ChemOper::MutateAtom]
    }
}

/// Builds a path-mode snapshot from source/target plus overrides.
pub fn path_snapshot(
    source: Molecule,
    target: Molecule,
    tweak: impl FnOnce(&mut Context),
) -> IterationSnapshot {
    let mut ctx = Context::new();
    ctx.job_id = uuid::Uuid::new_v4();
    ctx.chem_oper_selectors = ChemOper::all();
    ctx.params.min_acceptable_weight = 100.0;
    ctx.params.max_acceptable_weight = 500.0;
    ctx.source = source;
    ctx.target = target;
    tweak(&mut ctx);
    IterationSnapshot::from_context(&ctx)
}

/// Builds an activity-mode snapshot seeded from `sources`.
pub fn activity_snapshot(
    sources: Vec<Molecule>,
    tweak: impl FnOnce(&mut Context),
) -> IterationSnapshot {
    let mut ctx = Context::new();
    ctx.job_id = uuid::Uuid::new_v4();
    ctx.chem_oper_selectors = ChemOper::all();
    ctx.params.activity_morphing = true;
    ctx.params.min_acceptable_weight = 100.0;
    ctx.params.max_acceptable_weight = 500.0;
    ctx.source_mols = sources
        .into_iter()
        .map(|mol| (mol.smiles.clone(), mol))
        .collect::<BTreeMap<_, _>>();
    ctx.etalon_values = vec![0.0, 0.0];
    ctx.descriptor_weights = vec![1.0, 1.0];
    ctx.normalization_coefficients = vec![(1.0, 0.0), (1.0, 0.0)];
    ctx.relevant_descriptor_names = vec!["d1".to_string(), "d2".to_string()];
    tweak(&mut ctx);
    IterationSnapshot::from_context(&ctx)
}

/// Structural invariants of the candidate tree, checked on a snapshot:
/// every non-source candidate hangs off an existing parent whose
/// descendant set names it, descendant links point at existing candidates,
/// and the historic set contains the current one.
pub fn assert_tree_invariants(snapshot: &IterationSnapshot) {
    for (smiles, molecule) in &snapshot.candidates {
        assert_eq!(smiles, &molecule.smiles, "store key mismatch");

        if !molecule.parent_smiles.is_empty() {
            let parent = snapshot
                .candidates
                .get(&molecule.parent_smiles)
                .unwrap_or_else(|| panic!("{smiles} lost its parent {}", molecule.parent_smiles));
            assert!(
                parent.descendants.contains(smiles),
                "parent of {smiles} does not list it as descendant"
            );
        }

        for child in &molecule.descendants {
            assert!(
                snapshot.candidates.contains_key(child),
                "descendant link {smiles} -> {child} is dangling"
            );
            assert!(
                molecule.historic_descendants.contains(child),
                "historic set of {smiles} misses live child {child}"
            );
        }
    }
}

/// Convenience: run one explorer to completion over a single scripted job.
pub fn run_job(
    manager: Arc<ScriptedJobManager>,
    kernel: Arc<dyn MorphingKernel>,
    configure: impl FnOnce(morphspace_engine::Explorer) -> morphspace_engine::Explorer,
) {
    let explorer = morphspace_engine::Explorer::new(
        manager,
        kernel,
        CancelToken::new(),
        0,
    )
    .expect("explorer construction");
    configure(explorer).run();
}
