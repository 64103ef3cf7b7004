//! Robust estimation of the absolute pose of a calibrated camera.
//!
//! The input is a set of [`FeatureWorldMatch`]: each one pairs a normalized image coordinate with
//! the world point observed there. Some of them may be wrong. Minimal samples of three matches are
//! solved with [`LambdaTwist`], every candidate is scored by its squared reprojection error, and a
//! sample consensus search from [`cv_consensus`] picks the pose agreed upon by the most matches.
//!
//! ```
//! use absolute_pose::{estimate_calibrated_absolute_pose, RansacParameters, RansacType};
//! use cv_core::nalgebra::{Point3, Rotation3};
//! use cv_core::{CalibratedAbsolutePose, FeatureWorldMatch, WorldPoint};
//!
//! let truth = CalibratedAbsolutePose::from_parts(
//!     Rotation3::from_euler_angles(0.1, -0.2, 0.05),
//!     Point3::new(0.5, -0.25, -4.0),
//! );
//! let matches: Vec<FeatureWorldMatch> = (0..12)
//!     .map(|i| {
//!         let i = i as f64;
//!         let world = WorldPoint(Point3::new(i.sin(), (1.7 * i).cos(), 0.3 * i - 1.0));
//!         FeatureWorldMatch(truth.project(world), world)
//!     })
//!     .collect();
//!
//! let params = RansacParameters::new(1e-8).seed(0);
//! let (pose, summary) =
//!     estimate_calibrated_absolute_pose(params, RansacType::Ransac, &matches).unwrap();
//! assert_eq!(summary.inliers.len(), 12);
//! assert!((pose.position - truth.position).norm() < 1e-3);
//! ```

pub use cv_consensus::{ConsensusError, RansacParameters, RansacSummary, RansacType};
pub use cv_core::{CalibratedAbsolutePose, FeatureWorldMatch};

use cv_consensus::{create_and_initialize_ransac_variant, Consensus, Estimator};
use cv_core::{NormalizedKeyPoint, WorldPoint};
use lambda_twist::LambdaTwist;
use log::debug;

/// Plugs P3P and reprojection error into the consensus engines.
///
/// A minimal sample is three [`FeatureWorldMatch`]. The error of a match under a pose is the
/// squared distance between the feature and the reprojected world point on the normalized image
/// plane, so [`RansacParameters::error_thresh`] is a squared distance in normalized coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibratedAbsolutePoseEstimator {
    p3p: LambdaTwist,
}

impl CalibratedAbsolutePoseEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a P3P solver with non-default refinement settings.
    pub fn with_solver(p3p: LambdaTwist) -> Self {
        Self { p3p }
    }
}

impl Estimator for CalibratedAbsolutePoseEstimator {
    type Datum = FeatureWorldMatch;
    type Model = CalibratedAbsolutePose;
    const SAMPLE_SIZE: usize = 3;

    /// Solves P3P on the sample and converts every solution into a camera center and rotation.
    ///
    /// Collinear or coincident world points produce no candidates.
    ///
    /// # Panics
    ///
    /// Panics if `sample` does not contain exactly three matches.
    fn generate(&self, sample: &[FeatureWorldMatch], models: &mut Vec<CalibratedAbsolutePose>) {
        assert_eq!(
            sample.len(),
            Self::SAMPLE_SIZE,
            "P3P needs exactly {} correspondences",
            Self::SAMPLE_SIZE
        );
        models.clear();
        let features: [NormalizedKeyPoint; 3] = [sample[0].0, sample[1].0, sample[2].0];
        let world_points: [WorldPoint; 3] = [sample[0].1, sample[1].1, sample[2].1];
        models.extend(
            self.p3p
                .solve(&features, &world_points)
                .into_iter()
                .map(CalibratedAbsolutePose::from),
        );
    }

    /// Squared reprojection error.
    ///
    /// Points behind the camera are not treated specially. They usually reproject far from the
    /// feature and get a large error. A point in the plane of the camera center reprojects to
    /// infinity, and an undefined reprojection is reported as an infinite error.
    fn error(
        &self,
        &FeatureWorldMatch(feature, world): &FeatureWorldMatch,
        pose: &CalibratedAbsolutePose,
    ) -> f64 {
        let residual = (pose.project(world).0 - feature.0).norm_squared();
        if residual.is_nan() {
            f64::INFINITY
        } else {
            residual
        }
    }
}

/// A robust pose estimator that is configured once and then run on many sets of matches.
///
/// Each call to [`ReusableCalibratedAbsolutePoseEstimator::estimate`] is independent: iteration
/// counts, inliers, the best pose and the random number generator are all reset first. With
/// [`RansacParameters::seed`] set, the same input always gives the same result.
pub struct ReusableCalibratedAbsolutePoseEstimator {
    ransac_type: RansacType,
    consensus: Box<dyn Consensus<CalibratedAbsolutePoseEstimator> + Send>,
}

impl ReusableCalibratedAbsolutePoseEstimator {
    /// Builds the consensus search selected by `ransac_type` around a default P3P solver.
    pub fn build(params: RansacParameters, ransac_type: RansacType) -> Self {
        Self::with_estimator(params, ransac_type, CalibratedAbsolutePoseEstimator::new())
    }

    pub fn with_estimator(
        params: RansacParameters,
        ransac_type: RansacType,
        estimator: CalibratedAbsolutePoseEstimator,
    ) -> Self {
        Self {
            ransac_type,
            consensus: create_and_initialize_ransac_variant(ransac_type, params, estimator),
        }
    }

    /// Estimates the camera pose best supported by `matches`.
    ///
    /// Fails with [`ConsensusError::InsufficientData`] when there are fewer than three matches and
    /// with [`ConsensusError::NoConsensus`] when no pose meets the configured criteria.
    pub fn estimate(
        &mut self,
        matches: &[FeatureWorldMatch],
    ) -> Result<(CalibratedAbsolutePose, RansacSummary), ConsensusError> {
        let result = self.consensus.estimate(matches);
        match &result {
            Ok((pose, summary)) => debug!(
                "{}: camera at {:?} with {} of {} inliers",
                self.ransac_type,
                pose.position,
                summary.inliers.len(),
                summary.num_input_data_points
            ),
            Err(e) => debug!("{}: {}", self.ransac_type, e),
        }
        result
    }

    pub fn parameters(&self) -> &RansacParameters {
        self.consensus.parameters()
    }

    pub fn ransac_type(&self) -> RansacType {
        self.ransac_type
    }
}

/// Estimates the camera pose best supported by `matches` in one go.
///
/// Equivalent to [`ReusableCalibratedAbsolutePoseEstimator::build`] followed by a single
/// [`ReusableCalibratedAbsolutePoseEstimator::estimate`].
pub fn estimate_calibrated_absolute_pose(
    params: RansacParameters,
    ransac_type: RansacType,
    matches: &[FeatureWorldMatch],
) -> Result<(CalibratedAbsolutePose, RansacSummary), ConsensusError> {
    ReusableCalibratedAbsolutePoseEstimator::build(params, ransac_type).estimate(matches)
}
