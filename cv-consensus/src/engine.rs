use crate::{
    confidence, new_rng, Consensus, ConsensusError, Estimator, QualityMeasurement,
    RansacParameters, RansacSummary, Sampler,
};
use log::{debug, trace};
use rand::{rngs::SmallRng, seq::index};

/// The best model seen so far in a search.
struct Best<M> {
    model: M,
    cost: f64,
    inliers: Vec<usize>,
}

/// A sample consensus search, generic over how samples are drawn and how candidates are scored.
///
/// RANSAC, LMedS and exhaustive search are all this struct with a different [`Sampler`] and
/// [`QualityMeasurement`]. Buffers for samples, candidates and residuals are kept between calls to
/// avoid reallocating, but no search state survives from one call to [`Consensus::estimate`] to the next.
pub struct SampleConsensusEstimator<E: Estimator, S, Q> {
    params: RansacParameters,
    estimator: E,
    sampler: S,
    quality: Q,
    lo_rng: SmallRng,
    sample: Vec<usize>,
    sample_data: Vec<E::Datum>,
    candidates: Vec<E::Model>,
    residuals: Vec<f64>,
    inliers: Vec<usize>,
}

impl<E, S, Q> SampleConsensusEstimator<E, S, Q>
where
    E: Estimator,
    S: Sampler,
    Q: QualityMeasurement,
{
    pub fn new(params: RansacParameters, estimator: E, sampler: S, quality: Q) -> Self {
        let lo_rng = new_rng(params.seed);
        Self {
            params,
            estimator,
            sampler,
            quality,
            lo_rng,
            sample: Vec::with_capacity(E::SAMPLE_SIZE),
            sample_data: Vec::with_capacity(E::SAMPLE_SIZE),
            candidates: Vec::new(),
            residuals: Vec::new(),
            inliers: Vec::new(),
        }
    }

    /// Number of iterations needed to draw an outlier-free sample with the configured confidence,
    /// clamped to at least [`RansacParameters::min_iterations`].
    pub fn compute_max_iterations(&self, inlier_ratio: f64) -> usize {
        if inlier_ratio >= 1.0 {
            return self.params.min_iterations;
        }
        let log_failure_prob = self.params.failure_probability.ln();
        let log_prob = (1.0 - inlier_ratio.powi(E::SAMPLE_SIZE as i32)).ln() - f64::EPSILON;
        let iterations = (log_failure_prob / log_prob).ceil();
        let iterations = if iterations.is_finite() && iterations < usize::MAX as f64 {
            iterations.max(0.0) as usize
        } else {
            usize::MAX
        };
        iterations.max(self.params.min_iterations)
    }

    /// Scores `model` on all of `data`, leaving its inliers in `self.inliers`.
    fn score(&mut self, data: &[E::Datum], model: &E::Model) -> f64 {
        self.estimator.residuals(data, model, &mut self.residuals);
        self.quality.compute_cost(&self.residuals, &mut self.inliers)
    }

    /// Generates candidates from the data at the indices in `self.sample` into `self.candidates`.
    fn generate_from_sample(&mut self, data: &[E::Datum]) {
        self.sample_data.clear();
        self.sample_data.extend(self.sample.iter().map(|&ix| data[ix].clone()));
        self.estimator.generate(&self.sample_data, &mut self.candidates);
    }

    /// Draws minimal samples from the inliers of `best` and keeps any candidate that lowers the cost
    /// on the full data. Returns the number of inner samples drawn.
    fn locally_optimize(&mut self, data: &[E::Datum], best: &mut Best<E::Model>) -> usize {
        let mut drawn = 0;
        for _ in 0..self.params.lo_iterations {
            // Resampling the only possible sample cannot improve anything.
            if best.inliers.len() <= E::SAMPLE_SIZE {
                break;
            }
            let picks = index::sample(&mut self.lo_rng, best.inliers.len(), E::SAMPLE_SIZE);
            self.sample.clear();
            self.sample.extend(picks.iter().map(|pick| best.inliers[pick]));
            self.generate_from_sample(data);
            drawn += 1;

            let candidates = core::mem::take(&mut self.candidates);
            for candidate in &candidates {
                let cost = self.score(data, candidate);
                if cost < best.cost {
                    trace!(
                        "local optimization lowered cost from {} to {} ({} inliers)",
                        best.cost,
                        cost,
                        self.inliers.len()
                    );
                    best.model = candidate.clone();
                    best.cost = cost;
                    best.inliers.clone_from(&self.inliers);
                }
            }
            self.candidates = candidates;
        }
        drawn
    }

    fn run(&mut self, data: &[E::Datum]) -> Result<(E::Model, RansacSummary), ConsensusError> {
        let sample_size = E::SAMPLE_SIZE;
        if data.len() < sample_size {
            return Err(ConsensusError::InsufficientData {
                required: sample_size,
                actual: data.len(),
            });
        }

        // Nothing from a previous search may influence this one.
        self.sampler.initialize(data.len());
        self.lo_rng = new_rng(self.params.seed);
        self.candidates.clear();

        let mut best: Option<Best<E::Model>> = None;
        let mut max_iterations = self.params.max_iterations;
        let mut num_iterations = 0;
        let mut num_lo_iterations = 0;

        while num_iterations < max_iterations {
            self.sample.clear();
            self.sample.resize(sample_size, 0);
            if !self.sampler.sample(&mut self.sample) {
                debug!("sampler exhausted after {} iterations", num_iterations);
                break;
            }
            num_iterations += 1;

            self.generate_from_sample(data);
            if self.candidates.is_empty() {
                trace!("degenerate sample {:?}", self.sample);
                continue;
            }

            let candidates = core::mem::take(&mut self.candidates);
            for candidate in &candidates {
                let cost = self.score(data, candidate);
                if best.as_ref().map_or(false, |best| cost >= best.cost) {
                    continue;
                }
                let mut improved = Best {
                    model: candidate.clone(),
                    cost,
                    inliers: self.inliers.clone(),
                };
                trace!(
                    "iteration {}: new best cost {} with {} inliers",
                    num_iterations,
                    cost,
                    improved.inliers.len()
                );
                if self.params.use_lo && num_iterations >= self.params.lo_start_iterations {
                    num_lo_iterations += self.locally_optimize(data, &mut improved);
                }

                let inlier_ratio = improved.inliers.len() as f64 / data.len() as f64;
                if inlier_ratio > 0.0 && inlier_ratio >= self.params.min_inlier_ratio {
                    max_iterations = max_iterations.min(self.compute_max_iterations(inlier_ratio));
                }
                best = Some(improved);
            }
            self.candidates = candidates;
        }

        let mut summary = RansacSummary {
            num_input_data_points: data.len(),
            num_iterations,
            num_lo_iterations,
            ..RansacSummary::default()
        };
        let best = match best {
            Some(best) => best,
            None => {
                debug!(
                    "no candidate model in {} iterations, every sample was degenerate",
                    num_iterations
                );
                return Err(ConsensusError::NoConsensus { summary });
            }
        };

        summary.inliers = best.inliers;
        let inlier_ratio = summary.inlier_ratio();
        summary.confidence = confidence(inlier_ratio, sample_size, num_iterations);
        if summary.inliers.len() < sample_size || inlier_ratio < self.params.min_inlier_ratio {
            debug!(
                "best model has only {} of {} inliers after {} iterations",
                summary.inliers.len(),
                data.len(),
                num_iterations
            );
            return Err(ConsensusError::NoConsensus { summary });
        }

        debug!(
            "consensus after {} iterations ({} local): {} of {} inliers, confidence {:.6}",
            num_iterations,
            num_lo_iterations,
            summary.inliers.len(),
            data.len(),
            summary.confidence
        );
        Ok((best.model, summary))
    }
}

impl<E, S, Q> Consensus<E> for SampleConsensusEstimator<E, S, Q>
where
    E: Estimator,
    S: Sampler,
    Q: QualityMeasurement,
{
    fn estimate(&mut self, data: &[E::Datum]) -> Result<(E::Model, RansacSummary), ConsensusError> {
        self.run(data)
    }

    fn parameters(&self) -> &RansacParameters {
        &self.params
    }
}
