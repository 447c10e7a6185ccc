//! Morph filtering: stochastic survival and the rejection predicates.

use rayon::prelude::*;

use morphspace_core::cancel::CancelToken;
use morphspace_core::context::Context;
use morphspace_core::molecule::Molecule;

use crate::error::EngineError;
use crate::explorer::Mode;
use crate::rng;
use crate::runtime::ErrorSlot;

/// Recommended synthetic-accessibility ceiling (Ertl).
const MAX_SASCORE: f64 = 6.0;

/// Filters the morph list in parallel, producing the survivor mask.
///
/// Path mode rolls a stochastic survival gate first: the best
/// `cnt_candidates_to_keep` sorted morphs (and any morph equal to the
/// target) survive with probability one, the rest on a decaying
/// probability; a failed roll marks the morph dead without running the
/// predicates. Activity mode sends every morph through the predicates.
///
/// Predicates run cheapest first and short-circuit: weight window,
/// synthetic feasibility, already-present identity, already tried by the
/// parent, and the cumulative morph-attempt cap. A morph whose claimed
/// parent is missing from the tree is a structural invariant violation and
/// is reported through `errors`.
pub fn filter_morphs(
    ctx: &Context,
    morphs: &[Molecule],
    mode: Mode,
    cancel: &CancelToken,
    errors: &ErrorSlot,
) -> Vec<bool> {
    let total = morphs.len();
    (0..total)
        .into_par_iter()
        .map(|idx| {
            if cancel.is_cancelled() {
                return false;
            }
            let morph = &morphs[idx];

            if mode == Mode::Path && !passes_survival_roll(ctx, morph, idx, total) {
                return false;
            }
            passes_predicates(ctx, morph, errors)
        })
        .collect()
}

/// The stochastic gate of path mode. Probability 1 inside the guaranteed
/// window, then a linear decay capped at 0.25 over the remaining tail.
fn passes_survival_roll(ctx: &Context, morph: &Molecule, idx: usize, total: usize) -> bool {
    let keep = ctx.params.cnt_candidates_to_keep;
    let is_target = if ctx.scaffold_mode() {
        morph.scaffold_smiles == ctx.target.scaffold_smiles
    } else {
        morph.smiles == ctx.target.smiles
    };

    let mut accept_probability = 1.0;
    if idx >= keep && !is_target {
        accept_probability = 0.25 - (idx - keep) as f64 / ((total - keep) as f64 * 4.0);
    }

    rng::uniform(0, 99) < (accept_probability * 100.0) as i32
}

fn passes_predicates(ctx: &Context, morph: &Molecule, errors: &ErrorSlot) -> bool {
    let bad_weight = morph.molecular_weight < ctx.params.min_acceptable_weight
        || morph.molecular_weight > ctx.params.max_acceptable_weight;
    if bad_weight {
        tracing::debug!(
            morph = %morph.smiles,
            weight = morph.molecular_weight,
            "rejected: weight outside acceptable window"
        );
        return false;
    }

    if ctx.params.use_synthesis_feasibility && morph.sascore > MAX_SASCORE {
        tracing::debug!(
            morph = %morph.smiles,
            sascore = morph.sascore,
            "rejected: poor synthetic accessibility"
        );
        return false;
    }

    let already_exists = if !ctx.scaffold_mode() {
        ctx.candidates.contains(&morph.smiles)
    } else {
        let in_candidates = ctx
            .candidate_scaffolds
            .contains_key(&morph.scaffold_smiles);
        let on_path = ctx.path_scaffolds.contains_key(&morph.scaffold_smiles);
        in_candidates || (on_path && morph.scaffold_smiles != ctx.target.scaffold_smiles)
    };
    if already_exists {
        return false;
    }

    let already_tried = match ctx.candidates.get(&morph.parent_smiles) {
        Some(parent) => parent.historic_descendants.contains(&morph.smiles),
        None => {
            errors.record(EngineError::MissingParent {
                smiles: morph.smiles.clone(),
                parent: morph.parent_smiles.clone(),
            });
            return false;
        }
    };
    if already_tried {
        return false;
    }

    ctx.derivation_count(&morph.smiles) <= ctx.params.cnt_max_morphs
}
