//! Leaf and bag selection: picks the frontier to morph this iteration.

use rayon::prelude::*;

use morphspace_core::cancel::CancelToken;
use morphspace_core::context::Context;
use morphspace_core::molecule::Molecule;

/// Path-mode frontier: the current leaves of the tree.
///
/// While scanning, every non-source candidate ages by one iteration; the
/// staleness counters are reset later by the update stage wherever an
/// improvement arrived.
pub fn find_leaves(ctx: &Context, cancel: &CancelToken) -> Vec<Molecule> {
    ctx.candidates
        .keys()
        .into_par_iter()
        .filter_map(|smiles| {
            if cancel.is_cancelled() {
                return None;
            }
            let mut candidate = ctx.candidates.get_mut(&smiles)?;
            if !candidate.is_source() {
                candidate.iters_without_dist_improvement += 1;
            }
            if candidate.descendants.is_empty() {
                Some(candidate.clone())
            } else {
                None
            }
        })
        .collect()
}

/// Activity-mode frontier: every non-decayed candidate.
///
/// Decayed nodes are skipped entirely: they neither age nor morph.
pub fn find_next_bag(ctx: &Context, cancel: &CancelToken) -> Vec<Molecule> {
    ctx.candidates
        .keys()
        .into_par_iter()
        .filter_map(|smiles| {
            if cancel.is_cancelled() {
                return None;
            }
            let mut candidate = ctx.candidates.get_mut(&smiles)?;
            if candidate.decayed {
                return None;
            }
            candidate.iters_without_dist_improvement += 1;
            candidate.iters_fresh += 1;
            Some(candidate.clone())
        })
        .collect()
}
