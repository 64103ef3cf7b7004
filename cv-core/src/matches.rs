use crate::{NormalizedKeyPoint, WorldPoint};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Normalized keypoint to world point match.
///
/// The keypoint is the observed feature and the world point is the 3d point it is believed to be
/// the projection of.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FeatureWorldMatch(pub NormalizedKeyPoint, pub WorldPoint);
