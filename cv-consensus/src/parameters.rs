#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Configuration shared by every consensus variant.
///
/// This struct is marked as `#[non_exhaustive]` to allow the backwards-compatible addition of new fields.
/// Use [`RansacParameters::new`] or [`Default`] and the builder methods to construct it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub struct RansacParameters {
    /// A datum is an inlier when its error is strictly below this threshold.
    ///
    /// The unit is whatever [`Estimator::error`](crate::Estimator::error) returns. For squared
    /// reprojection errors in normalized coordinates, this is a squared distance on the image plane
    /// at unit focal length.
    pub error_thresh: f64,
    /// Acceptable probability that every sample drawn contained an outlier.
    /// The target confidence is `1 - failure_probability`.
    pub failure_probability: f64,
    /// Minimum fraction of the data that must be inliers for a model to be accepted.
    pub min_inlier_ratio: f64,
    /// The adaptive iteration bound is never lowered below this.
    pub min_iterations: usize,
    /// Hard cap on the number of minimal samples drawn.
    pub max_iterations: usize,
    /// Score with the truncated (MSAC-style) cost instead of counting outliers.
    pub use_mle: bool,
    /// Run local optimization whenever a new best model is found.
    pub use_lo: bool,
    /// Local optimization only kicks in once this many samples were drawn.
    pub lo_start_iterations: usize,
    /// Number of inner samples drawn from the inliers per local optimization.
    pub lo_iterations: usize,
    /// Seed for the sampling generator. Every estimation is reseeded with it.
    /// Without a seed each estimation draws fresh entropy.
    pub seed: Option<u64>,
}

impl RansacParameters {
    /// Creates default parameters with the given inlier threshold.
    pub fn new(error_thresh: f64) -> Self {
        Self {
            error_thresh,
            ..Self::default()
        }
    }

    /// Sets the [`RansacParameters::error_thresh`].
    #[must_use]
    pub fn error_thresh(self, error_thresh: f64) -> Self {
        Self {
            error_thresh,
            ..self
        }
    }

    /// Sets the [`RansacParameters::failure_probability`].
    #[must_use]
    pub fn failure_probability(self, failure_probability: f64) -> Self {
        Self {
            failure_probability,
            ..self
        }
    }

    /// Sets the [`RansacParameters::min_inlier_ratio`].
    #[must_use]
    pub fn min_inlier_ratio(self, min_inlier_ratio: f64) -> Self {
        Self {
            min_inlier_ratio,
            ..self
        }
    }

    /// Sets the [`RansacParameters::min_iterations`].
    #[must_use]
    pub fn min_iterations(self, min_iterations: usize) -> Self {
        Self {
            min_iterations,
            ..self
        }
    }

    /// Sets the [`RansacParameters::max_iterations`].
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// Sets the [`RansacParameters::use_mle`].
    #[must_use]
    pub fn use_mle(self, use_mle: bool) -> Self {
        Self { use_mle, ..self }
    }

    /// Sets the [`RansacParameters::use_lo`].
    #[must_use]
    pub fn use_lo(self, use_lo: bool) -> Self {
        Self { use_lo, ..self }
    }

    /// Sets the [`RansacParameters::lo_start_iterations`].
    #[must_use]
    pub fn lo_start_iterations(self, lo_start_iterations: usize) -> Self {
        Self {
            lo_start_iterations,
            ..self
        }
    }

    /// Sets the [`RansacParameters::lo_iterations`].
    #[must_use]
    pub fn lo_iterations(self, lo_iterations: usize) -> Self {
        Self {
            lo_iterations,
            ..self
        }
    }

    /// Sets the [`RansacParameters::seed`].
    #[must_use]
    pub fn seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    /// The confidence `1 - failure_probability` the adaptive bound aims for.
    pub fn confidence(&self) -> f64 {
        1.0 - self.failure_probability
    }
}

impl Default for RansacParameters {
    fn default() -> Self {
        Self {
            error_thresh: 1e-4,
            failure_probability: 0.01,
            min_inlier_ratio: 0.0,
            min_iterations: 100,
            max_iterations: 10_000,
            use_mle: false,
            use_lo: false,
            lo_start_iterations: 10,
            lo_iterations: 10,
            seed: None,
        }
    }
}

/// What happened during one consensus search.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct RansacSummary {
    /// Indices into the input of the data consistent with the returned model, in increasing order.
    pub inliers: Vec<usize>,
    /// Number of data the search was given.
    pub num_input_data_points: usize,
    /// Number of minimal samples drawn, including degenerate ones.
    pub num_iterations: usize,
    /// Number of inner samples drawn by local optimization.
    pub num_lo_iterations: usize,
    /// Probability that at least one drawn sample was outlier-free, given the final inlier ratio.
    pub confidence: f64,
}

impl RansacSummary {
    /// Fraction of the input that ended up as inliers.
    pub fn inlier_ratio(&self) -> f64 {
        if self.num_input_data_points == 0 {
            0.0
        } else {
            self.inliers.len() as f64 / self.num_input_data_points as f64
        }
    }
}
