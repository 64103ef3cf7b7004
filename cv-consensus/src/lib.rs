//! Sample consensus engines for robust model estimation.
//!
//! A problem plugs into this crate by implementing [`Estimator`]: it says how many data points
//! a minimal sample needs, turns a minimal sample into zero or more candidate models, and scores a
//! single datum against a candidate. The engines then search for the candidate with the best
//! consensus and report it along with a [`RansacSummary`].
//!
//! Several variants are available and can be chosen at runtime through [`RansacType`] and
//! [`create_and_initialize_ransac_variant`]:
//!
//! * [`RansacType::Ransac`] - random minimal samples with an adaptive iteration bound
//! * [`RansacType::Lmeds`] - least median of squares, no inlier threshold needed for scoring
//! * [`RansacType::Exhaustive`] - every minimal sample in order, useful for tiny inputs
//! * [`RansacType::Arrsac`] - the [`arrsac`] crate driven through the same [`Estimator`]
//!
//! Every call to [`Consensus::estimate`] starts from a clean slate: the iteration count,
//! best model, inlier set and random number generator are all reset, so one engine can be
//! reused across unrelated inputs.

mod arrsac_consensus;
mod engine;
mod error;
mod estimator;
mod parameters;
mod quality;
mod sampler;
mod variant;

pub use arrsac_consensus::ArrsacConsensus;
pub use engine::SampleConsensusEstimator;
pub use error::{ConsensusError, ParseRansacTypeError};
pub use estimator::Estimator;
pub use parameters::{RansacParameters, RansacSummary};
pub use quality::{InlierSupport, Lmeds, Mle, QualityMeasurement};
pub use sampler::{ExhaustiveSampler, RandomSampler, Sampler};
pub use variant::{create_and_initialize_ransac_variant, Consensus, RansacType};

use rand::{rngs::SmallRng, SeedableRng};

/// Creates the generator used for one estimation run.
///
/// With a seed every run draws the same samples. Without one the generator is seeded from entropy.
pub(crate) fn new_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    }
}

/// Probability that at least one of `iterations` samples of size `sample_size` was free of
/// outliers, given the observed `inlier_ratio`.
pub(crate) fn confidence(inlier_ratio: f64, sample_size: usize, iterations: usize) -> f64 {
    let sample_inlier_probability = inlier_ratio.powi(sample_size as i32);
    1.0 - (1.0 - sample_inlier_probability).powf(iterations as f64)
}
