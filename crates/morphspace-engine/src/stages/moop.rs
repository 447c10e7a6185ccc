//! Pareto (multi-objective) filtering for activity mode.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use morphspace_core::cancel::CancelToken;
use morphspace_core::molecule::Molecule;

/// `first` is dominated when `second` is no worse in every descriptor and
/// strictly better in at least one.
fn is_dominated(first: &Molecule, second: &Molecule) -> bool {
    let features = first.etalon_distances.len();
    if features == 0 || second.etalon_distances.len() != features {
        return false;
    }
    let mut worse_or_equal = 0usize;
    let mut equal = 0usize;
    for k in 0..features {
        let f = first.etalon_distances[k];
        let s = second.etalon_distances[k];
        if f >= s {
            worse_or_equal += 1;
        }
        if f == s {
            equal += 1;
        }
    }
    worse_or_equal == features && equal != features
}

/// Iterated non-domination filtering over the survivor mask.
///
/// Each pass marks a morph non-optimal when some other morph still in the
/// frontier dominates it in descriptor space. The non-optimal flags become
/// the next pass's frontier; successive passes peel off dominated layers,
/// re-examining the rejected front until it is empty or the pass budget is
/// spent. `survivors[i]` ends true exactly for the morphs that won their
/// layer's comparison.
pub fn pareto_filter(
    morphs: &[Molecule],
    survivors: &mut [bool],
    max_runs: u32,
    cancel: &CancelToken,
) {
    debug_assert_eq!(morphs.len(), survivors.len());

    // the original scans the flag vectors while rewriting them from other
    // workers; relaxed atomics reproduce that access pattern soundly
    let next: Vec<AtomicBool> = survivors.iter().map(|s| AtomicBool::new(*s)).collect();
    let optimal: Vec<AtomicBool> = survivors.iter().map(|s| AtomicBool::new(*s)).collect();

    let mut runs = 0u32;
    while runs < max_runs && !cancel.is_cancelled() {
        let frontier = next.iter().filter(|n| n.load(Ordering::Relaxed)).count();
        let kept = optimal.iter().filter(|s| s.load(Ordering::Relaxed)).count();
        tracing::debug!(pass = runs + 1, frontier, kept, "non-domination pass");
        if frontier == 0 {
            break;
        }

        (0..morphs.len()).into_par_iter().for_each(|idx| {
            if cancel.is_cancelled() || !next[idx].load(Ordering::Relaxed) {
                return;
            }
            let non_optimal = (0..morphs.len()).any(|other| {
                other != idx
                    && next[other].load(Ordering::Relaxed)
                    && is_dominated(&morphs[idx], &morphs[other])
            });
            next[idx].store(non_optimal, Ordering::Relaxed);
            optimal[idx].store(!non_optimal, Ordering::Relaxed);
        });
        runs += 1;
    }

    let remaining = next.iter().filter(|n| n.load(Ordering::Relaxed)).count();
    let kept = optimal.iter().filter(|s| s.load(Ordering::Relaxed)).count();
    tracing::debug!(passes = runs, remaining, kept, "non-domination finished");

    for (slot, flag) in survivors.iter_mut().zip(optimal.iter()) {
        *slot = flag.load(Ordering::Relaxed);
    }
}
