//! Parallel-runtime helpers shared by the stage kernels.
//!
//! Thin adapters over rayon: thread-pool construction, a work-feeding
//! parallel worklist (the traversal primitive behind pruning), the chunked
//! prefix counts behind the acceptance scan, a per-stage stopwatch and a
//! first-error slot for reporting invariant violations out of parallel
//! sections.

use std::time::Instant;

use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Builds a dedicated worker pool, or returns `None` to use the process
/// default when `threads` is zero.
pub fn build_pool(threads: usize) -> EngineResult<Option<ThreadPool>> {
    if threads == 0 {
        return Ok(None);
    }
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map(Some)
        .map_err(|err| EngineError::Runtime(err.to_string()))
}

/// Runs `body(item, feed)` for every seed and for every item fed back by a
/// body invocation, with work-stealing parallelism across items.
///
/// Items fed from a body run as independent tasks; there is no ordering
/// between sibling items. The call returns once the worklist is drained.
pub fn parallel_worklist<T, F>(seeds: Vec<T>, body: F)
where
    T: Send,
    F: Fn(T, &mut Vec<T>) + Sync,
{
    fn visit<'a, T, F>(scope: &Scope<'a>, item: T, body: &'a F)
    where
        T: Send + 'a,
        F: Fn(T, &mut Vec<T>) + Sync,
    {
        let mut feed = Vec::new();
        body(item, &mut feed);
        for next in feed {
            scope.spawn(move |scope| visit(scope, next, body));
        }
    }

    rayon::scope(|scope| {
        let body = &body;
        for seed in seeds {
            scope.spawn(move |scope| visit(scope, seed, body));
        }
    });
}

/// Exclusive prefix counts of set flags per fixed-size chunk.
///
/// `result[i]` is the number of set flags before chunk `i`: the pre-scan
/// half of the two-pass acceptance scan. The counting pass is parallel;
/// combining per-chunk counts is associative, so the serial combine over
/// chunk totals preserves the element order of the flags.
pub fn chunk_prefix_counts(flags: &[bool], chunk_size: usize) -> Vec<usize> {
    let counts: Vec<usize> = flags
        .par_chunks(chunk_size)
        .map(|chunk| chunk.iter().filter(|flag| **flag).count())
        .collect();

    let mut bases = Vec::with_capacity(counts.len());
    let mut running = 0usize;
    for count in counts {
        bases.push(running);
        running += count;
    }
    bases
}

/// Stopwatch reporting per-stage timings through tracing.
pub struct StageStopwatch {
    job_id: Uuid,
    iter_idx: u32,
    timestamp: Instant,
}

impl StageStopwatch {
    pub fn start(job_id: Uuid, iter_idx: u32) -> Self {
        Self {
            job_id,
            iter_idx,
            timestamp: Instant::now(),
        }
    }

    /// Logs the time consumed since the last report and resets.
    pub fn report(&mut self, stage: &str) {
        let elapsed_ms = self.timestamp.elapsed().as_millis();
        tracing::debug!(
            job = %self.job_id,
            iter = self.iter_idx,
            stage,
            elapsed_ms,
            "stage complete"
        );
        self.timestamp = Instant::now();
    }

    /// Whole seconds elapsed since construction, without reset.
    pub fn elapsed_seconds(&self) -> u64 {
        self.timestamp.elapsed().as_secs()
    }
}

/// Keeps the first error recorded from a parallel section.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    slot: Mutex<Option<EngineError>>,
}

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error; later errors are dropped.
    pub fn record(&self, err: EngineError) {
        let mut slot = self.slot.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    /// Returns `Err` with the recorded error, if any.
    pub fn check(&self) -> EngineResult<()> {
        match self.slot.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
