//! Per-job morphing parameters.
//!
//! Parameters are frozen for the duration of one iteration (the driver
//! refreshes them from the job manager between iterations) and persist as
//! part of the snapshot.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Tunable parameters of the exploration algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphingParams {
    /// Morph attempts per selected candidate.
    pub cnt_morphs: u32,
    /// Attempts once a candidate is closer to the target than
    /// `dist_to_target_depth_switch` (path mode).
    pub cnt_morphs_in_depth: u32,
    /// Distance threshold that switches to in-depth morphing.
    pub dist_to_target_depth_switch: f64,
    /// Number of best-sorted morphs accepted with probability 1 (path mode).
    pub cnt_candidates_to_keep: usize,
    /// Hard cap on morphs accepted per iteration (path mode).
    pub cnt_candidates_to_keep_max: usize,
    /// Cumulative morph-attempt cap per node; exceeding it makes a stale
    /// node eligible for whole-subtree pruning.
    pub cnt_max_morphs: u32,
    /// Iterations without improvement before a branch may be pruned.
    pub it_threshold: u32,
    /// Iterations of freshness before a node decays (activity mode).
    pub decay_threshold: u32,
    /// Lower bound on acceptable molecular weight.
    pub min_acceptable_weight: f64,
    /// Upper bound on acceptable molecular weight.
    pub max_acceptable_weight: f64,
    /// Enables the synthetic-accessibility predicate (sascore <= 6).
    pub use_synthesis_feasibility: bool,
    /// Pass budget for the Pareto filter (activity mode).
    pub max_moop_runs: u32,
    /// Iteration budget of the job.
    pub cnt_iterations: u32,
    /// Wall-clock budget of the job, in seconds.
    pub time_max_seconds: u64,
    /// Cap on activity-mode seed molecules; 0 seeds the whole pool.
    pub start_mol_max_count: usize,
    /// Batch size for external descriptor computation.
    pub padel_batch_size: usize,
    /// Routes the job to the activity variant of the engine.
    pub activity_morphing: bool,
    /// Enables the dimensionality-reduction visualization step.
    pub use_visualization: bool,
}

impl Default for MorphingParams {
    fn default() -> Self {
        Self {
            cnt_morphs: 90,
            cnt_morphs_in_depth: 200,
            dist_to_target_depth_switch: 0.1,
            cnt_candidates_to_keep: 50,
            cnt_candidates_to_keep_max: 100,
            cnt_max_morphs: 1500,
            it_threshold: 5,
            decay_threshold: 10,
            min_acceptable_weight: 250.0,
            max_acceptable_weight: 500.0,
            use_synthesis_feasibility: true,
            max_moop_runs: 10,
            cnt_iterations: 500,
            time_max_seconds: 21_600,
            start_mol_max_count: 0,
            padel_batch_size: 200,
            activity_morphing: false,
            use_visualization: false,
        }
    }
}

impl MorphingParams {
    /// Validates parameter consistency before a job is admitted.
    pub fn validate(&self) -> CoreResult<()> {
        if self.cnt_morphs == 0 {
            return Err(CoreError::validation("cnt_morphs", "must be positive"));
        }
        if self.cnt_morphs_in_depth == 0 {
            return Err(CoreError::validation(
                "cnt_morphs_in_depth",
                "must be positive",
            ));
        }
        if !self.dist_to_target_depth_switch.is_finite() || self.dist_to_target_depth_switch < 0.0 {
            return Err(CoreError::validation(
                "dist_to_target_depth_switch",
                "must be a finite non-negative distance",
            ));
        }
        if self.cnt_candidates_to_keep == 0 {
            return Err(CoreError::validation(
                "cnt_candidates_to_keep",
                "must be positive",
            ));
        }
        if self.cnt_candidates_to_keep_max < self.cnt_candidates_to_keep {
            return Err(CoreError::validation(
                "cnt_candidates_to_keep_max",
                "must be >= cnt_candidates_to_keep",
            ));
        }
        if self.cnt_max_morphs == 0 {
            return Err(CoreError::validation("cnt_max_morphs", "must be positive"));
        }
        if self.it_threshold == 0 {
            return Err(CoreError::validation("it_threshold", "must be positive"));
        }
        if self.decay_threshold == 0 {
            return Err(CoreError::validation("decay_threshold", "must be positive"));
        }
        if self.min_acceptable_weight < 0.0 || self.max_acceptable_weight < self.min_acceptable_weight
        {
            return Err(CoreError::validation(
                "max_acceptable_weight",
                "weight window must be ordered and non-negative",
            ));
        }
        if self.max_moop_runs == 0 {
            return Err(CoreError::validation("max_moop_runs", "must be positive"));
        }
        if self.cnt_iterations == 0 {
            return Err(CoreError::validation("cnt_iterations", "must be positive"));
        }
        if self.time_max_seconds == 0 {
            return Err(CoreError::validation("time_max_seconds", "must be positive"));
        }
        if self.padel_batch_size == 0 {
            return Err(CoreError::validation("padel_batch_size", "must be positive"));
        }
        Ok(())
    }
}
