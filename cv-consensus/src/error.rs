use crate::RansacSummary;
use thiserror::Error;

/// Reasons a consensus search can fail to produce a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsensusError {
    /// Not even a single minimal sample can be drawn.
    #[error("sample consensus requires at least {required} data points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// The search ran out of iterations without a model meeting the inlier criteria.
    ///
    /// The summary describes the best attempt and how many iterations were spent.
    #[error(
        "no model reached consensus after {} iterations ({} inliers of {} data points)",
        .summary.num_iterations,
        .summary.inliers.len(),
        .summary.num_input_data_points
    )]
    NoConsensus { summary: RansacSummary },
}

/// Returned when parsing a [`RansacType`](crate::RansacType) from an unknown name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sample consensus variant `{0}`, expected one of ransac, lmeds, exhaustive, arrsac")]
pub struct ParseRansacTypeError(pub String);
