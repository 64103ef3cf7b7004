//! # Rust CV Core
//!
//! Common types shared by the absolute pose crates in this workspace: normalized keypoints,
//! world points, 2D-3D correspondences and the two pose conventions used when estimating
//! where a calibrated camera sits in the world.
//!
//! ## Pose conventions
//!
//! Minimal solvers naturally produce a [`WorldToCamera`] transform, which maps a world point `X`
//! into the camera frame as `R * X + t`. Callers usually want to know where the camera is instead,
//! which is what [`CalibratedAbsolutePose`] stores: the same rotation `R` and the camera center `C`
//! in world coordinates. The two are related by `C = -Rᵀ * t`, and conversion goes through
//! [`From`] so that the relationship is only written down once.
//!
//! ```text
//!   world point X
//!         \
//!          \        camera frame: x_cam = R * (X - C)
//!           \
//!   @@@@@@@@@f@@@@@@@@   <- virtual image plane at z = 1, f = x_cam.xy / x_cam.z
//!             \
//!              C
//! ```
//!
//! The crate is `#![no_std]` and re-exports [`nalgebra`] so that downstream crates agree on versions.

#![no_std]

mod keypoint;
mod matches;
mod point;
mod pose;

pub use keypoint::*;
pub use matches::*;
pub use nalgebra;
pub use point::*;
pub use pose::*;
