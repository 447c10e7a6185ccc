//! Activity-mode descriptor scoring of filter survivors.

use morphspace_core::context::Context;
use morphspace_core::molecule::Molecule;

use crate::error::EngineResult;

use super::Explorer;

impl Explorer {
    /// Computes descriptors for every filter survivor through the external
    /// backend, in batches of `padel_batch_size`, then normalizes them and
    /// derives the etalon distances.
    ///
    /// Every morph in a processed batch range receives its iteration id,
    /// survivors or not. Backend failures skip the batch (the affected
    /// morphs keep `dist_to_etalon = f64::MAX` and lose in the Pareto
    /// stage); they never abort the iteration.
    pub(super) fn compute_descriptors(
        &self,
        ctx: &Context,
        morphs: &mut [Molecule],
        survivors: &[bool],
    ) -> EngineResult<()> {
        let Some(backend) = &self.descriptors else {
            tracing::warn!(
                job = %ctx.job_id,
                "no descriptor backend configured; morphs stay unscored"
            );
            return Ok(());
        };

        let job_dir = self
            .job_manager
            .storage_dir()
            .join(format!("{}_{}", ctx.job_id, ctx.iter_idx));
        let batch_size = ctx.params.padel_batch_size;
        let total = morphs.len();
        let steps = total / batch_size + 1;

        for step in 0..steps {
            let start = step * batch_size;
            let end = ((step + 1) * batch_size).min(total);

            for idx in start..end {
                morphs[idx].id = format!("MORPH_{}_{}", ctx.iter_idx, idx + 1);
            }
            if !(start..end).any(|idx| survivors[idx]) {
                continue;
            }

            let run_dir = job_dir.join(format!("run_{step}"));
            if let Err(err) = std::fs::create_dir_all(&run_dir) {
                tracing::warn!(
                    job = %ctx.job_id,
                    dir = %run_dir.display(),
                    error = %err,
                    "could not create descriptor scratch directory"
                );
            }

            let mut batch = match backend.create_batch(
                &run_dir,
                &ctx.relevant_descriptor_names,
                self.thread_count,
            ) {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::warn!(
                        job = %ctx.job_id,
                        step,
                        error = %err,
                        "descriptor batch creation failed; batch skipped"
                    );
                    continue;
                }
            };

            for idx in start..end {
                if survivors[idx] {
                    batch.add(&morphs[idx]);
                }
            }
            if let Err(err) = batch.compute() {
                tracing::warn!(
                    job = %ctx.job_id,
                    step,
                    error = %err,
                    "descriptor computation failed; batch skipped"
                );
                continue;
            }

            for idx in start..end {
                if !survivors[idx] {
                    continue;
                }
                match batch.get(&morphs[idx]) {
                    Ok(values) => {
                        let morph = &mut morphs[idx];
                        morph.save_descriptors(&values, &ctx.relevant_descriptor_names);
                        morph.normalize_descriptors(
                            &ctx.normalization_coefficients,
                            &ctx.imputed_values,
                        );
                        morph.compute_etalon_distances(
                            &ctx.etalon_values,
                            &ctx.descriptor_weights,
                        );
                    }
                    Err(err) => {
                        tracing::warn!(
                            job = %ctx.job_id,
                            morph = %morphs[idx].smiles,
                            error = %err,
                            "descriptor retrieval failed; morph stays unscored"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}
