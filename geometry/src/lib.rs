//! Geometry value objects describing where the volume sits and how it is
//! seen by the detector.
//!
//! Volume geometries describe the reconstruction grid; projection geometries
//! describe the acquisition. The projection geometries form closed sum types
//! (`ProjectionGeometry2D`, `ProjectionGeometry3D`), so code that needs to
//! treat the variants differently does so by exhaustive `match`.
//!
//! All lengths are `f32` millimetres and all angles `f32` radians.

mod error;
mod volume;
mod projection2d;
mod projection3d;

pub use error::GeometryError;
pub use volume::{VolumeGeometry2D, VolumeGeometry3D};
pub use projection2d::{
    ProjectionGeometry2D,
    ParallelGeometry2D,
    FanFlatGeometry2D,
    FanFlatVecGeometry2D, FanVector,
};
pub use projection3d::{
    ProjectionGeometry3D,
    ParallelGeometry3D,
    ConeGeometry3D,
    ConeVecGeometry3D, ConeVector,
    Detector,
};

pub type Vector2 = nalgebra::Vector2<Lengthf32>;
pub type Vector3 = nalgebra::Vector3<Lengthf32>;

/// `count` angles evenly spaced over `[start, stop)`
pub fn linspace_angles(start: Anglef32, stop: Anglef32, count: usize) -> Vec<Anglef32> {
    let step = (stop - start) / count as Anglef32;
    (0..count).map(|i| start + i as Anglef32 * step).collect()
}

pub(crate) fn positive(what: &'static str, value: f32) -> Result<f32, GeometryError> {
    if value > 0.0 && value.is_finite() { Ok(value) }
    else { Err(GeometryError::NonPositive { what, value }) }
}

pub(crate) fn nonzero(what: &'static str, count: usize) -> Result<usize, GeometryError> {
    if count > 0 { Ok(count) }
    else { Err(GeometryError::ZeroCount { what }) }
}

use units::todo::{Anglef32, Lengthf32};
