use crate::{CameraPoint, NormalizedKeyPoint, WorldPoint};
use derive_more::{AsMut, AsRef, From, Into};
use nalgebra::{IsometryMatrix3, Point2, Point3, Rotation3, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This contains a world pose, which is a pose of the world relative to the camera.
/// This maps [`WorldPoint`] into [`CameraPoint`] as `R * X + t`.
///
/// This is the convention minimal solvers produce. It is converted into a
/// [`CalibratedAbsolutePose`] before being handed to users of the estimators.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct WorldToCamera(pub IsometryMatrix3<f64>);

impl WorldToCamera {
    /// Create the pose from rotation and translation.
    pub fn from_parts(translation: Vector3<f64>, rotation: Rotation3<f64>) -> Self {
        Self(IsometryMatrix3::from_parts(translation.into(), rotation))
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        self.0.rotation
    }

    pub fn translation(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    /// Transforms the world point into the camera frame.
    pub fn transform(&self, point: WorldPoint) -> CameraPoint {
        CameraPoint(self.0 * point.0)
    }
}

/// The absolute pose of a calibrated camera: its orientation and the position of its optical
/// center, both expressed in world coordinates.
///
/// A world point `X` is seen in the camera frame at `rotation * (X - position)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CalibratedAbsolutePose {
    /// Rotation from the world frame into the camera frame.
    pub rotation: Rotation3<f64>,
    /// Optical center of the camera in world coordinates.
    pub position: Point3<f64>,
}

impl CalibratedAbsolutePose {
    pub fn from_parts(rotation: Rotation3<f64>, position: Point3<f64>) -> Self {
        Self { rotation, position }
    }

    /// Camera at the world origin looking down the world Z axis.
    pub fn identity() -> Self {
        Self::from_parts(Rotation3::identity(), Point3::origin())
    }

    /// Converts back into the solver convention, with `t = -R * C`.
    pub fn world_to_camera(&self) -> WorldToCamera {
        WorldToCamera::from_parts(-(self.rotation * self.position.coords), self.rotation)
    }

    /// Transforms the world point into the camera frame.
    pub fn transform(&self, point: WorldPoint) -> CameraPoint {
        let translated = point.0 - self.position;
        CameraPoint((self.rotation * translated).into())
    }

    /// Projects the world point onto the virtual image plane.
    ///
    /// No cheirality check is performed. Points behind the camera are divided by their negative
    /// depth like any other point, and a point at zero depth produces non-finite coordinates.
    pub fn project(&self, point: WorldPoint) -> NormalizedKeyPoint {
        let rotated = self.transform(point).0;
        NormalizedKeyPoint(Point2::new(rotated.x / rotated.z, rotated.y / rotated.z))
    }
}

impl Default for CalibratedAbsolutePose {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<WorldToCamera> for CalibratedAbsolutePose {
    fn from(pose: WorldToCamera) -> Self {
        let rotation = pose.rotation();
        let position = -(rotation.inverse() * pose.translation());
        Self::from_parts(rotation, position.into())
    }
}
