use crate::CameraPoint;
use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Point2, UnitVector3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A point in normalized image coordinates. This keypoint has been corrected
/// for distortion and normalized based on the camera intrinsic matrix, meaning
/// the focal length has been divided out and the principal point sits at the origin.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct NormalizedKeyPoint(pub Point2<f64>);

impl NormalizedKeyPoint {
    /// Tries to convert the [`CameraPoint`] into a [`NormalizedKeyPoint`] by perspective division.
    ///
    /// Returns `None` when the point has zero depth.
    pub fn from_camera_point(point: CameraPoint) -> Option<Self> {
        Point2::from_homogeneous(point.0.coords).map(Self)
    }

    /// Conceptually appends a `1.0` component to the normalized keypoint to create
    /// a [`CameraPoint`] on the virtual image plane and then multiplies
    /// the point by `depth`.
    pub fn with_depth(self, depth: f64) -> CameraPoint {
        CameraPoint((self.coords * depth).push(depth).into())
    }

    /// Retrieve the unnormalized bearing `(x, y, 1)` of the keypoint.
    pub fn bearing_unnormalized(self) -> Vector3<f64> {
        self.coords.push(1.0)
    }

    /// Retrieve the unit bearing of the keypoint.
    pub fn bearing(self) -> UnitVector3<f64> {
        UnitVector3::new_normalize(self.bearing_unnormalized())
    }
}
