//! Lowering of geometry objects into the flat parameter sets consumed by
//! `Backend`s.
//!
//! Each conversion moves the volume centre to the origin, rescales lengths so
//! that volume pixels (voxels) have unit size, and reports the factor needed
//! to return the backend's output to world units.

use float_eq::float_eq;
use thiserror::Error;

use geometry::{
    ConeGeometry3D, FanFlatGeometry2D, FanFlatVecGeometry2D, ParallelGeometry2D,
    VolumeGeometry2D, VolumeGeometry3D,
};
use units::todo::Lengthf32;

use super::{ConeParams, FanParams, FanProjection, ParallelParams};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("volume pixels must be square, got {x} × {y}")]
    NonSquarePixels { x: Lengthf32, y: Lengthf32 },

    #[error("volume voxels must be cubic, got {x} × {y} × {z}")]
    NonCubicVoxels { x: Lengthf32, y: Lengthf32, z: Lengthf32 },
}

const REL_TOLERANCE: f32 = 1e-5;

fn square_pixel(volume: &VolumeGeometry2D) -> Result<Lengthf32, ConversionError> {
    let (x, y) = (volume.pixel_length_x(), volume.pixel_length_y());
    if float_eq!(x, y, r2nd <= REL_TOLERANCE) { Ok(x) }
    else { Err(ConversionError::NonSquarePixels { x, y }) }
}

fn cubic_voxel(volume: &VolumeGeometry3D) -> Result<Lengthf32, ConversionError> {
    let (x, y, z) = (volume.voxel_length_x(), volume.voxel_length_y(), volume.voxel_length_z());
    if float_eq!(x, y, r2nd <= REL_TOLERANCE) && float_eq!(x, z, r2nd <= REL_TOLERANCE) { Ok(x) }
    else { Err(ConversionError::NonCubicVoxels { x, y, z }) }
}

pub fn parallel_params(volume: &VolumeGeometry2D, geometry: &ParallelGeometry2D) -> Result<ParallelParams, ConversionError> {
    let pixel = square_pixel(volume)?;
    let centre = volume.centre();
    let angles = geometry.angles().to_vec();
    // Where the world origin's detector centre lands, once the volume centre
    // has been moved to the origin
    let offsets = match geometry.extra_detector_offsets() {
        Some(extra) => angles.iter().zip(extra).map(|(&a, &e)| (e - project(centre.x, centre.y, a)) / pixel).collect(),
        None        => angles.iter()                .map(|&a     | (  - project(centre.x, centre.y, a)) / pixel).collect(),
    };
    Ok(ParallelParams {
        detector_count: geometry.detector_count(),
        angles,
        offsets,
        detector_size: geometry.detector_width() / pixel,
        output_scale: pixel,
    })
}

/// Component of `(x, y)` along the parallel-beam detector axis at angle `a`
fn project(x: Lengthf32, y: Lengthf32, a: f32) -> Lengthf32 {
    let (s, c) = a.sin_cos();
    x * c + y * s
}

pub fn fan_params(volume: &VolumeGeometry2D, geometry: &FanFlatGeometry2D) -> Result<FanParams, ConversionError> {
    fan_vec_params(volume, &geometry.to_vec_geometry())
}

pub fn fan_vec_params(volume: &VolumeGeometry2D, geometry: &FanFlatVecGeometry2D) -> Result<FanParams, ConversionError> {
    let pixel = square_pixel(volume)?;
    let centre = volume.centre();
    let half_detector = geometry.detector_count() as Lengthf32 / 2.0;
    let projections = geometry.vectors().iter()
        .map(|v| FanProjection {
            source        : (v.source - centre) / pixel,
            detector_start: (v.detector_centre - v.detector_step * half_detector - centre) / pixel,
            detector_step :  v.detector_step / pixel,
        })
        .collect();
    Ok(FanParams { detector_count: geometry.detector_count(), projections, output_scale: pixel })
}

pub fn cone_params(volume: &VolumeGeometry3D, geometry: &ConeGeometry3D) -> Result<ConeParams, ConversionError> {
    let voxel = cubic_voxel(volume)?;
    let centre = volume.centre() / voxel;
    Ok(ConeParams {
        volume_cols  : volume.cols(),
        volume_rows  : volume.rows(),
        volume_slices: volume.slices(),
        volume_centre: [centre.x, centre.y, centre.z],
        projection_count  : geometry.projection_count(),
        detector_cols     : geometry.detector_cols(),
        detector_rows     : geometry.detector_rows(),
        origin_source     : geometry.origin_source()      / voxel,
        origin_detector   : geometry.origin_detector()    / voxel,
        detector_spacing_x: geometry.detector_spacing_x() / voxel,
        detector_spacing_y: geometry.detector_spacing_y() / voxel,
        angles: geometry.angles().to_vec(),
        output_scale: 1.0 / voxel,
    })
}
