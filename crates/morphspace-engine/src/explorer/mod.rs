//! The iteration driver and job loop.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashSet;
use rayon::ThreadPool;

use morphspace_core::cancel::CancelToken;
use morphspace_core::context::Context;
use morphspace_core::molecule::Molecule;
use morphspace_core::selectors::{ChemOper, ScaffoldSelector};
use morphspace_core::traits::{
    DescriptorBackend, DimensionReducer, JobManager, MorphingKernel, ScaffoldExtractor,
    ScaffoldProvider,
};

use crate::collect::MorphCollector;
use crate::error::{EngineError, EngineResult};
use crate::runtime::{build_pool, ErrorSlot, StageStopwatch};
use crate::stages::{accept, filter, moop, order, prune, select, update};

mod descriptors;

/// Which exploration variant a job runs under.
///
/// Both variants share the stage pipeline; the mode decides frontier
/// selection, the distance metric, the stochastic filter gate, the
/// acceptance cap, the root behavior of the update walk and decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Explore from one source toward a target molecule.
    Path,
    /// Explore from a source pool toward the etalon in descriptor space.
    Activity,
}

impl Mode {
    fn of(ctx: &Context) -> Mode {
        if ctx.params.activity_morphing {
            Mode::Activity
        } else {
            Mode::Path
        }
    }
}

/// Drives exploration jobs pulled from a [`JobManager`].
///
/// One explorer owns one worker pool and one cancellation token. The
/// [`Explorer::run`] loop blocks on the job manager, seeds fresh jobs,
/// iterates until the job's budgets run out (or the target is reached, or
/// the manager stops the job) and commits every iteration back.
pub struct Explorer {
    job_manager: Arc<dyn JobManager>,
    morphing: Arc<dyn MorphingKernel>,
    scaffolds: Option<Arc<dyn ScaffoldProvider>>,
    descriptors: Option<Arc<dyn DescriptorBackend>>,
    reducer: Option<Arc<dyn DimensionReducer>>,
    cancel: CancelToken,
    pool: Option<ThreadPool>,
    thread_count: usize,
}

impl Explorer {
    /// Creates an explorer on a dedicated pool of `thread_count` workers
    /// (0 uses the process-default pool).
    pub fn new(
        job_manager: Arc<dyn JobManager>,
        morphing: Arc<dyn MorphingKernel>,
        cancel: CancelToken,
        thread_count: usize,
    ) -> EngineResult<Self> {
        Ok(Self {
            job_manager,
            morphing,
            scaffolds: None,
            descriptors: None,
            reducer: None,
            cancel,
            pool: build_pool(thread_count)?,
            thread_count,
        })
    }

    /// Enables scaffold mode support.
    pub fn with_scaffold_provider(mut self, provider: Arc<dyn ScaffoldProvider>) -> Self {
        self.scaffolds = Some(provider);
        self
    }

    /// Enables activity-mode descriptor computation.
    pub fn with_descriptor_backend(mut self, backend: Arc<dyn DescriptorBackend>) -> Self {
        self.descriptors = Some(backend);
        self
    }

    /// Enables the visualization step.
    pub fn with_dimension_reducer(mut self, reducer: Arc<dyn DimensionReducer>) -> Self {
        self.reducer = Some(reducer);
        self
    }

    /// The job loop: blocks on the manager for work and iterates each job
    /// until the manager or the budgets stop it. Returns when the manager
    /// requests thread shutdown.
    pub fn run(&self) {
        tracing::info!("exploration thread started");

        let mut ctx = Context::new();
        let mut can_continue = false;
        let mut path_found = false;

        loop {
            if !can_continue {
                if !self.job_manager.get_job(&mut ctx) {
                    break;
                }
                can_continue = true;
                path_found = false;

                if ctx.candidates.is_empty() {
                    if let Err(err) = self.seed_job(&mut ctx) {
                        tracing::error!(job = %ctx.job_id, error = %err, "failed to seed job");
                        can_continue =
                            self.job_manager.commit_iteration(&mut ctx, false, false);
                        continue;
                    }
                }
            }

            let outcome = match &self.pool {
                Some(pool) => pool.install(|| self.iterate(&mut ctx, &mut path_found)),
                None => self.iterate(&mut ctx, &mut path_found),
            };
            can_continue = match outcome {
                Ok(can_continue) => can_continue,
                Err(err) => {
                    tracing::error!(
                        job = %ctx.job_id,
                        iter = ctx.iter_idx,
                        error = %err,
                        "iteration failed"
                    );
                    false
                }
            };

            can_continue = self
                .job_manager
                .commit_iteration(&mut ctx, can_continue, path_found);
        }

        tracing::info!("exploration thread terminated");
    }

    /// Seeds the first iteration of a fresh context.
    fn seed_job(&self, ctx: &mut Context) -> EngineResult<()> {
        if ctx.scaffold_mode() {
            let extractor = self.scaffold_extractor(ctx)?;

            let source_scaffold = extractor.scaffold_of(&ctx.source.smiles)?;
            let target_scaffold = extractor.scaffold_of(&ctx.target.smiles)?;
            ctx.temp_source.scaffold_smiles = source_scaffold.clone();
            ctx.target.scaffold_smiles = target_scaffold.clone();

            ctx.candidates.insert(ctx.temp_source.clone());
            ctx.candidate_scaffolds
                .insert(source_scaffold.clone(), ctx.source.smiles.clone());
            ctx.path_scaffolds
                .insert(source_scaffold, ctx.source.smiles.clone());
            ctx.path_scaffolds
                .insert(target_scaffold, ctx.target.smiles.clone());

            for decoy in &mut ctx.decoys {
                decoy.scaffold_smiles = extractor.scaffold_of(&decoy.smiles)?;
            }
            return Ok(());
        }

        match Mode::of(ctx) {
            Mode::Path => {
                ctx.candidates.insert(ctx.source.clone());
            }
            Mode::Activity => {
                let limit = match ctx.params.start_mol_max_count {
                    0 => ctx.source_mols.len(),
                    capped => capped,
                };
                ctx.start_mols.clear();
                for (smiles, molecule) in ctx.source_mols.iter().take(limit) {
                    ctx.candidates.insert(molecule.clone());
                    ctx.start_mols.push(smiles.clone());
                }
                tracing::info!(
                    job = %ctx.job_id,
                    seeds = ctx.start_mols.len(),
                    "seeded activity job"
                );
            }
        }
        Ok(())
    }

    fn scaffold_extractor(&self, ctx: &Context) -> EngineResult<Box<dyn ScaffoldExtractor>> {
        let provider = self
            .scaffolds
            .as_ref()
            .ok_or(EngineError::ScaffoldUnavailable(ctx.scaffold_selector))?;
        provider
            .extractor(ctx.scaffold_selector)
            .ok_or(EngineError::ScaffoldUnavailable(ctx.scaffold_selector))
    }

    /// One full iteration. Returns the engine-side continue flag; the job
    /// manager has the final word at commit time.
    fn iterate(&self, ctx: &mut Context, path_found: &mut bool) -> EngineResult<bool> {
        if !self.cancel.is_cancelled() {
            ctx.fingerprint_selector = self.job_manager.fingerprint_selector();
            ctx.sim_coef_selector = self.job_manager.sim_coef_selector();
            ctx.dim_red_selector = self.job_manager.dim_red_selector();
            ctx.chem_oper_selectors = self.job_manager.chem_oper_selectors();
            ctx.params = self.job_manager.params();
            ctx.decoys = self.job_manager.decoys();
            ctx.clear_pruned();
        }

        let mode = Mode::of(ctx);
        let total_stopwatch = StageStopwatch::start(ctx.job_id, ctx.iter_idx);
        let mut stopwatch = StageStopwatch::start(ctx.job_id, ctx.iter_idx);
        let errors = ErrorSlot::new();

        // frontier selection
        let frontier = if !self.cancel.is_cancelled() {
            let frontier = match mode {
                Mode::Path => select::find_leaves(ctx, &self.cancel),
                Mode::Activity => select::find_next_bag(ctx, &self.cancel),
            };
            stopwatch.report(match mode {
                Mode::Path => "find_leaves",
                Mode::Activity => "find_next_bag",
            });
            frontier
        } else {
            Vec::new()
        };

        // morph generation
        let mut morphs = self.generate_morphs(ctx, mode, &frontier)?;
        if !self.cancel.is_cancelled() {
            tracing::info!(
                job = %ctx.job_id,
                iter = ctx.iter_idx,
                frontier = frontier.len(),
                morphs = morphs.len(),
                "morph generation finished"
            );
            stopwatch.report("generate_morphs");
        }

        // path mode orders morphs along the decoy-target arc
        if mode == Mode::Path && !self.cancel.is_cancelled() {
            order::sort_morphs(&mut morphs);
            stopwatch.report("sort_morphs");
        }

        // filtering
        let mut survivors = if !self.cancel.is_cancelled() {
            let survivors = filter::filter_morphs(ctx, &morphs, mode, &self.cancel, &errors);
            stopwatch.report("filter_morphs");
            errors.check()?;
            survivors
        } else {
            vec![false; morphs.len()]
        };

        // activity mode scores survivors and reduces to the Pareto frontier
        if mode == Mode::Activity && !self.cancel.is_cancelled() {
            self.compute_descriptors(ctx, &mut morphs, &survivors)?;
            stopwatch.report("compute_descriptors");

            moop::pareto_filter(&morphs, &mut survivors, ctx.params.max_moop_runs, &self.cancel);
            stopwatch.report("moop_filter");
        }

        // acceptance
        let modified_parents = DashSet::new();
        if !self.cancel.is_cancelled() {
            let cap = match mode {
                Mode::Path => Some(ctx.params.cnt_candidates_to_keep_max),
                Mode::Activity => None,
            };
            accept::accept_morphs(ctx, &morphs, &survivors, cap, &modified_parents, &errors);
            errors.check()?;
            if mode == Mode::Activity {
                let kept = survivors.iter().filter(|s| **s).count();
                tracing::info!(
                    job = %ctx.job_id,
                    iter = ctx.iter_idx,
                    kept,
                    total = morphs.len(),
                    "acceptance ratio"
                );
            }
            stopwatch.report("accept_morphs");
        }

        // improvement back-propagation
        if !self.cancel.is_cancelled() {
            let parents: Vec<String> = modified_parents
                .iter()
                .map(|entry| entry.key().clone())
                .collect();
            update::update_tree(ctx, mode, &parents, &errors);
            errors.check()?;
            stopwatch.report("update_tree");
        }

        // termination detection (path mode only; activity runs on budgets)
        if mode == Mode::Path && !self.cancel.is_cancelled() {
            *path_found = if ctx.scaffold_mode() {
                ctx.candidate_scaffolds
                    .contains_key(&ctx.target.scaffold_smiles)
            } else {
                ctx.candidates.contains(&ctx.target.smiles)
            };
            if *path_found {
                tracing::info!(job = %ctx.job_id, iter = ctx.iter_idx, "path found");
            }
        }

        // pruning
        if !*path_found && !self.cancel.is_cancelled() {
            let deferred = self.deferred_smiles(ctx, mode);
            let seeds = match mode {
                Mode::Path => {
                    if ctx.scaffold_mode() {
                        vec![ctx.temp_source.smiles.clone()]
                    } else {
                        vec![ctx.source.smiles.clone()]
                    }
                }
                Mode::Activity => ctx.start_mols.clone(),
            };
            prune::prune_tree(ctx, mode, seeds, &deferred, &errors);
            errors.check()?;
            if ctx.scaffold_mode() && ctx.candidates.len() != ctx.candidate_scaffolds.len() {
                return Err(EngineError::ScaffoldIndexSize {
                    candidates: ctx.candidates.len(),
                    scaffolds: ctx.candidate_scaffolds.len(),
                });
            }
            stopwatch.report("prune_tree");
        }

        // visualization (path mode, when the job asks for it)
        if mode == Mode::Path && ctx.params.use_visualization && !self.cancel.is_cancelled() {
            self.reduce_dimensions(ctx);
            stopwatch.report("dimension_reduction");
        }

        // iteration report
        if !self.cancel.is_cancelled() {
            match mode {
                Mode::Path => {
                    let (min_distance, at_zero) = ctx.min_dist_to_target();
                    for smiles in at_zero {
                        tracing::info!(job = %ctx.job_id, iter = ctx.iter_idx, molecule = %smiles, "zero distance to target");
                    }
                    tracing::info!(
                        job = %ctx.job_id,
                        iter = ctx.iter_idx,
                        min_distance,
                        candidates = ctx.candidates.len(),
                        "min distance to target"
                    );
                }
                Mode::Activity => {
                    tracing::info!(
                        job = %ctx.job_id,
                        iter = ctx.iter_idx,
                        min_distance = ctx.min_dist_to_etalon(),
                        candidates = ctx.candidates.len(),
                        "min distance to etalon"
                    );
                }
            }
        }

        // budget accounting; a cancelled iteration leaves the counters and
        // the continue flag for the job manager to roll back
        if self.cancel.is_cancelled() {
            return Ok(true);
        }
        ctx.iter_idx += 1;
        ctx.elapsed_seconds += total_stopwatch.elapsed_seconds();

        let iters_depleted = ctx.params.cnt_iterations <= ctx.iter_idx;
        let time_depleted = ctx.params.time_max_seconds <= ctx.elapsed_seconds;
        if iters_depleted {
            tracing::info!(job = %ctx.job_id, iter = ctx.iter_idx, "iteration budget exhausted");
        }
        if time_depleted {
            tracing::info!(job = %ctx.job_id, iter = ctx.iter_idx, "time budget exhausted");
        }
        Ok(!iters_depleted && !time_depleted && !*path_found)
    }

    /// Serially morphs every frontier candidate, feeding the shared
    /// deduplicating collector; the kernel parallelizes internally.
    fn generate_morphs(
        &self,
        ctx: &Context,
        mode: Mode,
        frontier: &[Molecule],
    ) -> EngineResult<Vec<Molecule>> {
        let collector = MorphCollector::new();

        let scaffold_extractor = if ctx.scaffold_mode() {
            Some(self.scaffold_extractor(ctx)?)
        } else {
            None
        };
        let operators: Vec<ChemOper> = match &scaffold_extractor {
            Some(extractor) if ctx.scaffold_selector != ScaffoldSelector::OriginalMolecule => {
                extractor.useful_operators()
            }
            _ => ctx.chem_oper_selectors.clone(),
        };
        let target = match mode {
            Mode::Path => Some(&ctx.target),
            Mode::Activity => None,
        };

        for candidate in frontier {
            if self.cancel.is_cancelled() {
                break;
            }
            let mut attempts = ctx.params.cnt_morphs;
            if mode == Mode::Path && candidate.dist_to_target < ctx.params.dist_to_target_depth_switch
            {
                attempts = ctx.params.cnt_morphs_in_depth;
            }

            self.morphing.generate_morphs(
                candidate,
                attempts,
                ctx.fingerprint_selector,
                ctx.sim_coef_selector,
                &operators,
                target,
                &ctx.decoys,
                &self.cancel,
                &collector,
                scaffold_extractor.as_deref(),
            );
            ctx.charge_derivations(&candidate.smiles, collector.withdraw_attempt_count());
        }

        Ok(collector.into_morphs())
    }

    /// Deferred prune requests from the front end; sources are exempt.
    fn deferred_smiles(&self, ctx: &Context, mode: Mode) -> HashSet<String> {
        if mode == Mode::Activity {
            return HashSet::new();
        }
        self.job_manager
            .pruned()
            .into_iter()
            .filter(|molecule| {
                molecule.smiles != ctx.source.smiles
                    && !(ctx.scaffold_mode() && molecule.smiles == ctx.temp_source.smiles)
            })
            .map(|molecule| molecule.smiles)
            .collect()
    }

    /// Hands the whole tree (plus job anchors) to the external reducer.
    /// Reducer failures are logged and skipped.
    fn reduce_dimensions(&self, ctx: &Context) {
        let Some(reducer) = &self.reducer else {
            return;
        };

        let mut molecules: Vec<Molecule> =
            Vec::with_capacity(ctx.candidates.len() + ctx.decoys.len() + 3);
        ctx.candidates
            .for_each(|molecule| molecules.push(molecule.clone()));
        molecules.extend(ctx.decoys.iter().cloned());
        molecules.push(ctx.source.clone());
        molecules.push(ctx.target.clone());
        if ctx.scaffold_mode() {
            molecules.extend(ctx.path_molecules.iter().cloned());
            molecules.push(ctx.temp_source.clone());
        }

        if let Err(err) = reducer.reduce(
            &molecules,
            ctx.fingerprint_selector,
            ctx.sim_coef_selector,
            &self.cancel,
        ) {
            tracing::warn!(job = %ctx.job_id, error = %err, "dimension reduction failed");
        }
    }
}
