//! Morph ordering for path mode.

use std::cmp::Ordering;

use rayon::prelude::*;

use morphspace_core::molecule::Molecule;

/// Tolerance window treating two distance sums as equal: 32 ulps scaled by
/// the larger magnitude.
fn approximately_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= 32.0 * f64::EPSILON * a.abs().max(b.abs())
}

/// Orders morphs along the decoy-target arc.
///
/// Morphs are rated by the sum of their distance to the target and to
/// their closest decoy; that sum is minimal on the connecting line between
/// a decoy and the target. When the sums are (approximately) equal, both
/// morphs may lie on the same connecting line, so the tie breaks on target
/// proximity alone, which keeps convergence going in late stages when
/// most morphs sit on the arc through the decoy closest to the target.
pub fn compare_morphs(a: &Molecule, b: &Molecule) -> Ordering {
    let a_sum = a.dist_to_target + a.dist_to_closest_decoy;
    let b_sum = b.dist_to_target + b.dist_to_closest_decoy;

    if approximately_equal(a_sum, b_sum) {
        a.dist_to_target
            .partial_cmp(&b.dist_to_target)
            .unwrap_or(Ordering::Equal)
    } else {
        a_sum.partial_cmp(&b_sum).unwrap_or(Ordering::Equal)
    }
}

/// Parallel sort realizing the comparator's total order.
pub fn sort_morphs(morphs: &mut [Molecule]) {
    morphs.par_sort_unstable_by(compare_morphs);
}
