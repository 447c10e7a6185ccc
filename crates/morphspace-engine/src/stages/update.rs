//! Improvement back-propagation along the ancestor chain.

use rayon::prelude::*;

use morphspace_core::context::Context;

use crate::error::EngineError;
use crate::explorer::Mode;
use crate::runtime::ErrorSlot;

/// For every parent that gained children this iteration, finds the best
/// child distance and walks toward the root resetting the staleness
/// counter of every ancestor the new minimum improves on. Only branches
/// without such a signal remain eligible for pruning.
///
/// The walk holds at most one handle at a time: the current handle is
/// released before the next ancestor's is acquired, so walks from
/// different parents cannot deadlock. Walk length is bounded by tree
/// depth.
///
/// Path mode terminates at the root (the scaffold root in scaffold mode)
/// without touching its counter; activity mode additionally resets the
/// root's counter unconditionally. The asymmetry is deliberate.
pub fn update_tree(ctx: &Context, mode: Mode, modified_parents: &[String], errors: &ErrorSlot) {
    modified_parents.par_iter().for_each(|parent_smiles| {
        let descendants = match ctx.candidates.get(parent_smiles) {
            Some(parent) => parent.descendants.clone(),
            None => {
                errors.record(EngineError::MissingCandidate {
                    smiles: parent_smiles.clone(),
                });
                return;
            }
        };

        let mut min_distance = f64::MAX;
        for child_smiles in &descendants {
            match ctx.candidates.get(child_smiles) {
                Some(child) => {
                    let dist = match mode {
                        Mode::Path => child.dist_to_target,
                        Mode::Activity => child.dist_to_etalon,
                    };
                    if dist < min_distance {
                        min_distance = dist;
                    }
                }
                None => errors.record(EngineError::MissingCandidate {
                    smiles: child_smiles.clone(),
                }),
            }
        }

        let scaffold_mode = ctx.scaffold_mode();
        let mut current = parent_smiles.clone();
        loop {
            let mut node = match ctx.candidates.get_mut(&current) {
                Some(node) => node,
                None => {
                    errors.record(EngineError::MissingCandidate { smiles: current });
                    return;
                }
            };

            match mode {
                Mode::Path => {
                    let at_root = node.parent_smiles.is_empty()
                        || (scaffold_mode && node.smiles == ctx.temp_source.smiles);
                    if at_root {
                        break;
                    }
                    if min_distance < node.dist_to_target {
                        node.iters_without_dist_improvement = 0;
                    }
                    let next = node.parent_smiles.clone();
                    drop(node);
                    current = next;
                }
                Mode::Activity => {
                    if min_distance < node.dist_to_etalon {
                        node.iters_without_dist_improvement = 0;
                    }
                    if node.parent_smiles.is_empty() {
                        node.iters_without_dist_improvement = 0;
                        break;
                    }
                    let next = node.parent_smiles.clone();
                    drop(node);
                    current = next;
                }
            }
        }
    });
}
