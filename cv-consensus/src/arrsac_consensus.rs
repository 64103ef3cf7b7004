use crate::{
    confidence, new_rng, Consensus, ConsensusError, Estimator, RansacParameters, RansacSummary,
};
use arrsac::Arrsac;
use core::cell::Cell;
use log::debug;
use sample_consensus::Consensus as _;

/// Runs ARRSAC from the [`arrsac`] crate on an [`Estimator`] of this crate.
///
/// ARRSAC decides on its own how many hypotheses to evaluate, so only
/// [`RansacParameters::error_thresh`], [`RansacParameters::min_inlier_ratio`] and
/// [`RansacParameters::seed`] are used. The iteration count in the summary is the number of
/// minimal samples ARRSAC asked for.
pub struct ArrsacConsensus<E> {
    params: RansacParameters,
    estimator: E,
}

impl<E: Estimator> ArrsacConsensus<E> {
    pub fn new(params: RansacParameters, estimator: E) -> Self {
        Self { params, estimator }
    }
}

impl<E: Estimator> Consensus<E> for ArrsacConsensus<E> {
    fn estimate(&mut self, data: &[E::Datum]) -> Result<(E::Model, RansacSummary), ConsensusError> {
        let sample_size = E::SAMPLE_SIZE;
        if data.len() < sample_size {
            return Err(ConsensusError::InsufficientData {
                required: sample_size,
                actual: data.len(),
            });
        }

        // A fresh generator per call keeps calls independent.
        let mut arrsac = Arrsac::new(self.params.error_thresh, new_rng(self.params.seed));
        let adapter = Adapter {
            estimator: &self.estimator,
            samples: Cell::new(0),
        };
        let found = arrsac.model_inliers(&adapter, data.iter().cloned());

        let mut summary = RansacSummary {
            num_input_data_points: data.len(),
            num_iterations: adapter.samples.get(),
            ..RansacSummary::default()
        };
        let (hypothesis, inliers) = match found {
            Some(found) => found,
            None => {
                debug!("arrsac found no model in {} samples", summary.num_iterations);
                return Err(ConsensusError::NoConsensus { summary });
            }
        };
        summary.inliers = inliers.into_iter().collect();
        summary.inliers.sort_unstable();
        let inlier_ratio = summary.inlier_ratio();
        summary.confidence = confidence(inlier_ratio, sample_size, summary.num_iterations);
        if summary.inliers.len() < sample_size || inlier_ratio < self.params.min_inlier_ratio {
            debug!(
                "arrsac model has only {} of {} inliers",
                summary.inliers.len(),
                data.len()
            );
            return Err(ConsensusError::NoConsensus { summary });
        }
        Ok((hypothesis.model, summary))
    }

    fn parameters(&self) -> &RansacParameters {
        &self.params
    }
}

/// Presents an [`Estimator`] through the traits of the `sample-consensus` crate.
struct Adapter<'a, E> {
    estimator: &'a E,
    samples: Cell<usize>,
}

/// A candidate model that carries the estimator needed to score it.
struct Hypothesis<'a, E: Estimator> {
    estimator: &'a E,
    model: E::Model,
}

impl<'a, E: Estimator> Clone for Hypothesis<'a, E> {
    fn clone(&self) -> Self {
        Self {
            estimator: self.estimator,
            model: self.model.clone(),
        }
    }
}

impl<'a, E: Estimator> sample_consensus::Model<E::Datum> for Hypothesis<'a, E> {
    fn residual(&self, data: &E::Datum) -> f64 {
        self.estimator.error(data, &self.model)
    }
}

impl<'a, E: Estimator> sample_consensus::Estimator<E::Datum> for Adapter<'a, E> {
    type Model = Hypothesis<'a, E>;
    type ModelIter = Vec<Hypothesis<'a, E>>;
    const MIN_SAMPLES: usize = E::SAMPLE_SIZE;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = E::Datum> + Clone,
    {
        self.samples.set(self.samples.get() + 1);
        let sample: Vec<E::Datum> = data.take(E::SAMPLE_SIZE).collect();
        if sample.len() < E::SAMPLE_SIZE {
            return Vec::new();
        }
        let mut models = Vec::new();
        self.estimator.generate(&sample, &mut models);
        models
            .into_iter()
            .map(|model| Hypothesis {
                estimator: self.estimator,
                model,
            })
            .collect()
    }
}
