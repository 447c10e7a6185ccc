//! Activity-mode exploration scenarios: descriptor scoring, Pareto
//! reduction, decay.

mod common;

use std::sync::Arc;

use common::*;

#[test]
fn seeding_respects_the_start_molecule_cap() {
    let sources: Vec<_> = (0..5)
        .map(|i| viable_morph(&format!("S{i}"), 1.0))
        .collect();
    let snapshot = activity_snapshot(sources, |ctx| {
        ctx.params.start_mol_max_count = 2;
        ctx.params.cnt_iterations = 1;
    });
    let manager = Arc::new(ScriptedJobManager::single_job(snapshot, 5));
    run_job(Arc::clone(&manager), Arc::new(TableKernel::new()), |e| e);

    let snapshot = manager.last_snapshot();
    assert_eq!(snapshot.candidates.len(), 2);
    assert_eq!(snapshot.start_mols.len(), 2);
    for smiles in &snapshot.start_mols {
        assert!(snapshot.candidates.contains_key(smiles));
    }
}

#[test]
fn pareto_front_alone_is_accepted_with_one_moop_pass() {
    let snapshot = activity_snapshot(vec![viable_morph("S", 1.0)], |ctx| {
        ctx.params.cnt_iterations = 1;
        ctx.params.max_moop_runs = 1;
    });
    let kernel = TableKernel::new().produces(
        "S",
        vec![
            viable_morph("P", 1.0),
            viable_morph("Q", 1.0),
            viable_morph("R", 1.0),
        ],
    );
    let descriptors = TableDescriptorBackend::new(vec![
        ("P", vec![("d1", 1.0), ("d2", 2.0)]),
        ("Q", vec![("d1", 2.0), ("d2", 3.0)]),
        ("R", vec![("d1", 0.0), ("d2", 0.0)]),
    ]);

    let manager = Arc::new(ScriptedJobManager::single_job(snapshot, 5));
    run_job(Arc::clone(&manager), Arc::new(kernel), |explorer| {
        explorer.with_descriptor_backend(Arc::new(descriptors))
    });

    let snapshot = manager.last_snapshot();
    // only the non-dominated morph joined the tree
    assert!(snapshot.candidates.contains_key("R"));
    assert!(!snapshot.candidates.contains_key("P"));
    assert!(!snapshot.candidates.contains_key("Q"));

    let winner = &snapshot.candidates["R"];
    assert_eq!(winner.etalon_distances, vec![0.0, 0.0]);
    assert_eq!(winner.dist_to_etalon, 0.0);
    assert!(winner.id.starts_with("MORPH_0_"));
    assert_tree_invariants(&snapshot);
}

#[test]
fn nodes_past_the_freshness_budget_decay_but_remain() {
    let snapshot = activity_snapshot(vec![viable_morph("M", 1.0)], |ctx| {
        ctx.params.decay_threshold = 2;
        ctx.params.cnt_iterations = 6;
    });
    let manager = Arc::new(ScriptedJobManager::single_job(snapshot, 10));
    run_job(Arc::clone(&manager), Arc::new(TableKernel::new()), |e| e);

    let commits = manager.commits.lock();
    assert_eq!(commits.len(), 6);

    let last = &commits.last().unwrap().snapshot;
    let molecule = &last.candidates["M"];
    assert!(molecule.decayed);
    // decay is inert, not an erase
    assert_eq!(last.candidates.len(), 1);
    assert!(last.pruned_this_iter.is_empty());
    // once decayed the node left the bag: its age froze just past the
    // budget and it never produced a descendant
    assert_eq!(molecule.iters_fresh, 3);
    assert!(molecule.historic_descendants.is_empty());
}

#[test]
fn decayed_sources_contribute_no_further_morphs() {
    let snapshot = activity_snapshot(vec![viable_morph("M", 1.0)], |ctx| {
        ctx.params.decay_threshold = 1;
        ctx.params.cnt_iterations = 5;
        ctx.params.max_moop_runs = 1;
    });
    // the kernel would happily keep emitting children forever
    let kernel = TableKernel::new().produces("M", vec![viable_morph("C1", 1.0)]);
    let descriptors = TableDescriptorBackend::new(vec![("C1", vec![("d1", 1.0), ("d2", 1.0)])]);

    let manager = Arc::new(ScriptedJobManager::single_job(snapshot, 10));
    run_job(Arc::clone(&manager), Arc::new(kernel), |explorer| {
        explorer.with_descriptor_backend(Arc::new(descriptors))
    });

    let commits = manager.commits.lock();
    let last = &commits.last().unwrap().snapshot;

    // the child joined while M was fresh
    assert!(last.candidates.contains_key("C1"));
    // derivation charges stop growing once M decayed
    let decay_iter = commits
        .iter()
        .position(|c| c.snapshot.candidates["M"].decayed)
        .expect("M must decay");
    let charged_at_decay = commits[decay_iter].snapshot.morph_derivations["M"];
    let charged_finally = commits.last().unwrap().snapshot.morph_derivations["M"];
    assert_eq!(charged_at_decay, charged_finally);
    assert_tree_invariants(last);
}
