//! Tree pruning: decay, stale-branch removal and deferred erases.

use std::collections::{HashSet, VecDeque};

use morphspace_core::context::Context;

use crate::error::EngineError;
use crate::explorer::Mode;
use crate::runtime::{parallel_worklist, ErrorSlot};

/// Parallel worklist traversal from the tree roots.
///
/// For each visited node:
/// - activity mode first handles decay: a decayed node only forwards its
///   descendants, and a node past the freshness budget decays now;
/// - a node that is deferred (user-marked) or stale (no improvement for
///   more than `it_threshold` iterations) is pruned: the whole subtree
///   when deferred or past its morph-attempt budget, otherwise only its
///   descendant subtrees ("keep the node, purge its children", giving it a
///   clean slate);
/// - everything else forwards its descendants to the worklist.
///
/// Sources are never erased.
pub fn prune_tree(
    ctx: &Context,
    mode: Mode,
    seeds: Vec<String>,
    deferred: &HashSet<String>,
    errors: &ErrorSlot,
) {
    parallel_worklist(seeds, |smiles: String, feed: &mut Vec<String>| {
        let mut node = match ctx.candidates.get_mut(&smiles) {
            Some(node) => node,
            None => {
                errors.record(EngineError::MissingCandidate { smiles });
                return;
            }
        };

        if mode == Mode::Activity {
            if node.decayed {
                let kids: Vec<String> = node.descendants.iter().cloned().collect();
                drop(node);
                feed.extend(kids);
                return;
            }
            if node.iters_fresh > ctx.params.decay_threshold {
                tracing::info!(molecule = %node.smiles, id = %node.id, "branch root decayed");
                node.decayed = true;
                let kids: Vec<String> = node.descendants.iter().cloned().collect();
                drop(node);
                feed.extend(kids);
                return;
            }
        }

        let is_deferred = deferred.contains(&smiles);
        let stale = node.iters_without_dist_improvement > ctx.params.it_threshold;
        if (is_deferred || stale) && !node.is_source() {
            let overdrawn = ctx.derivation_count(&smiles) > ctx.params.cnt_max_morphs;

            if is_deferred || overdrawn {
                tracing::info!(molecule = %node.smiles, id = %node.id, "pruning subtree");
                let parent_smiles = node.parent_smiles.clone();
                drop(node);
                match ctx.candidates.get_mut(&parent_smiles) {
                    Some(mut parent) => {
                        parent.descendants.remove(&smiles);
                    }
                    None => errors.record(EngineError::MissingCandidate {
                        smiles: parent_smiles,
                    }),
                }
                erase_subtree(ctx, smiles, errors);
            } else {
                tracing::info!(molecule = %node.smiles, id = %node.id, "pruning descendants");
                let kids: Vec<String> = node.descendants.iter().cloned().collect();
                node.descendants.clear();
                node.iters_without_dist_improvement = 0;
                drop(node);
                for kid in kids {
                    erase_subtree(ctx, kid, errors);
                }
            }
        } else {
            let kids: Vec<String> = node.descendants.iter().cloned().collect();
            drop(node);
            feed.extend(kids);
        }
    });
}

/// Breadth-first erase of a whole subtree. Every removed node is appended
/// to the iteration's prune trace and unregistered from the scaffold index
/// in scaffold mode.
fn erase_subtree(ctx: &Context, root: String, errors: &ErrorSlot) {
    let mut queue = VecDeque::new();
    queue.push_back(root);

    while let Some(current) = queue.pop_front() {
        match ctx.candidates.remove(&current) {
            Some(molecule) => {
                queue.extend(molecule.descendants.iter().cloned());
                ctx.record_pruned(current);
                if ctx.scaffold_mode()
                    && ctx
                        .candidate_scaffolds
                        .remove(&molecule.scaffold_smiles)
                        .is_none()
                {
                    errors.record(EngineError::ScaffoldIndexDesync {
                        scaffold: molecule.scaffold_smiles.clone(),
                    });
                }
            }
            None => errors.record(EngineError::MissingCandidate { smiles: current }),
        }
    }
}
