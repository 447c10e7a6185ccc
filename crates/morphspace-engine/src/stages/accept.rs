//! Acceptance scan: commits surviving morphs into the candidate tree.

use dashmap::mapref::entry::Entry;
use dashmap::DashSet;
use rayon::prelude::*;

use morphspace_core::context::Context;
use morphspace_core::molecule::Molecule;

use crate::error::EngineError;
use crate::runtime::{chunk_prefix_counts, ErrorSlot};

/// Elements per scan chunk; chosen small enough to load-balance and large
/// enough to amortize the per-chunk rank bookkeeping.
const SCAN_CHUNK: usize = 128;

/// Two-pass prefix scan over the survivor mask.
///
/// The pre-pass counts survivors per chunk, giving every chunk its base
/// rank; the final pass commits survivors whose rank is below `cap`
/// (path mode; pass `None` to disable the gate in activity mode), so the
/// morphs that count against the cap are exactly the best ones in sorted
/// order. Combining chunks is a plain sum, which keeps the scan
/// associative.
///
/// Committing a morph inserts it into the tree, registers its scaffold in
/// scaffold mode (a scaffold collision skips the morph without consuming a
/// rank), links it into its parent's descendant sets and records the
/// parent for the update stage. The parent handle is acquired only after
/// the insert's handle has been released.
pub fn accept_morphs(
    ctx: &Context,
    morphs: &[Molecule],
    survivors: &[bool],
    cap: Option<usize>,
    modified_parents: &DashSet<String>,
    errors: &ErrorSlot,
) {
    debug_assert_eq!(morphs.len(), survivors.len());

    let bases = chunk_prefix_counts(survivors, SCAN_CHUNK);
    bases.par_iter().enumerate().for_each(|(chunk_idx, base)| {
        let start = chunk_idx * SCAN_CHUNK;
        let end = (start + SCAN_CHUNK).min(morphs.len());
        let mut rank = *base;

        for idx in start..end {
            if !survivors[idx] {
                continue;
            }
            if cap.map_or(true, |cap| rank < cap) {
                let morph = &morphs[idx];

                if ctx.scaffold_mode() {
                    let registered = match ctx
                        .candidate_scaffolds
                        .entry(morph.scaffold_smiles.clone())
                    {
                        Entry::Occupied(_) => false,
                        Entry::Vacant(slot) => {
                            slot.insert(morph.smiles.clone());
                            true
                        }
                    };
                    if !registered {
                        // scaffold already claimed by another candidate;
                        // drop this morph without consuming a rank
                        continue;
                    }
                }

                ctx.candidates.insert(morph.clone());

                match ctx.candidates.get_mut(&morph.parent_smiles) {
                    Some(mut parent) => {
                        parent.descendants.insert(morph.smiles.clone());
                        parent.historic_descendants.insert(morph.smiles.clone());
                        let parent_smiles = parent.smiles.clone();
                        drop(parent);
                        modified_parents.insert(parent_smiles);
                    }
                    None => errors.record(EngineError::MissingParent {
                        smiles: morph.smiles.clone(),
                        parent: morph.parent_smiles.clone(),
                    }),
                }
            }
            rank += 1;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use morphspace_core::selectors::ScaffoldSelector;

    fn context_with_source() -> Context {
        let ctx = Context::new();
        ctx.candidates.insert(Molecule::new("CC"));
        ctx
    }

    fn morph_of(parent: &str, smiles: &str) -> Molecule {
        let mut morph = Molecule::new(smiles);
        morph.parent_smiles = parent.to_string();
        morph
    }

    #[test]
    fn survivors_are_linked_into_the_tree() {
        let ctx = context_with_source();
        let morphs = vec![morph_of("CC", "CCO"), morph_of("CC", "CCN")];
        let modified = DashSet::new();
        let errors = ErrorSlot::new();

        accept_morphs(&ctx, &morphs, &[true, true], None, &modified, &errors);
        errors.check().unwrap();

        assert_eq!(ctx.candidates.len(), 3);
        let parent = ctx.candidates.get("CC").unwrap();
        assert!(parent.descendants.contains("CCO"));
        assert!(parent.descendants.contains("CCN"));
        assert!(parent.historic_descendants.contains("CCO"));
        assert!(modified.contains("CC"));
    }

    #[test]
    fn cap_bounds_accepted_morphs_in_order() {
        let ctx = context_with_source();
        let morphs: Vec<Molecule> = (0..400)
            .map(|i| morph_of("CC", &format!("C{i}")))
            .collect();
        let survivors = vec![true; morphs.len()];
        let modified = DashSet::new();
        let errors = ErrorSlot::new();

        accept_morphs(&ctx, &morphs, &survivors, Some(3), &modified, &errors);
        errors.check().unwrap();

        // source + exactly the first three in scan order
        assert_eq!(ctx.candidates.len(), 4);
        assert!(ctx.candidates.contains("C0"));
        assert!(ctx.candidates.contains("C1"));
        assert!(ctx.candidates.contains("C2"));
        assert!(!ctx.candidates.contains("C3"));
    }

    #[test]
    fn cap_counts_survivors_not_positions() {
        let ctx = context_with_source();
        let morphs: Vec<Molecule> = (0..6)
            .map(|i| morph_of("CC", &format!("C{i}")))
            .collect();
        let survivors = vec![false, true, false, true, true, true];
        let modified = DashSet::new();
        let errors = ErrorSlot::new();

        accept_morphs(&ctx, &morphs, &survivors, Some(2), &modified, &errors);
        errors.check().unwrap();

        assert!(ctx.candidates.contains("C1"));
        assert!(ctx.candidates.contains("C3"));
        assert!(!ctx.candidates.contains("C4"));
        assert!(!ctx.candidates.contains("C5"));
    }

    #[test]
    fn missing_parent_is_a_reported_invariant_violation() {
        let ctx = context_with_source();
        let morphs = vec![morph_of("GONE", "CCO")];
        let modified = DashSet::new();
        let errors = ErrorSlot::new();

        accept_morphs(&ctx, &morphs, &[true], None, &modified, &errors);
        assert!(errors.check().is_err());
    }

    #[test]
    fn scaffold_collision_skips_without_consuming_rank() {
        let mut ctx = Context::new();
        ctx.scaffold_selector = ScaffoldSelector::MostGeneral;
        ctx.candidates.insert(Molecule::new("CC"));

        let mut colliding = morph_of("CC", "CCO");
        colliding.scaffold_smiles = "ring".to_string();
        let mut second = morph_of("CC", "CCN");
        second.scaffold_smiles = "ring".to_string();
        let mut third = morph_of("CC", "CCF");
        third.scaffold_smiles = "chain".to_string();

        let modified = DashSet::new();
        let errors = ErrorSlot::new();
        accept_morphs(
            &ctx,
            &[colliding, second, third],
            &[true, true, true],
            Some(2),
            &modified,
            &errors,
        );
        errors.check().unwrap();

        // CCN lost the scaffold race and consumed no rank, so CCF
        // still fits under the cap
        assert!(ctx.candidates.contains("CCO"));
        assert!(!ctx.candidates.contains("CCN"));
        assert!(ctx.candidates.contains("CCF"));
        assert_eq!(ctx.candidate_scaffolds.len(), 2);
    }
}
