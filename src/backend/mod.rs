//! The boundary between algorithm control and numerical work.
//!
//! Algorithms convert their geometry into the flat parameter sets defined here
//! (see `convert`) and call one of the `Backend` routines. Every routine works
//! in a normalized frame: the volume is centred on the origin (any offset is
//! carried explicitly) and volume pixels/voxels have unit size. The
//! `output_scale` in each parameter set maps results back to world units.
//!
//! `CpuBackend` is the reference implementation. A GPU implementation would
//! implement the same trait.

pub mod convert;
pub mod cpu;

pub use convert::ConversionError;
pub use cpu::CpuBackend;

use ndarray::{ArrayView2, ArrayView3, ArrayViewMut2, ArrayViewMut3};
use thiserror::Error;

use geometry::Vector2;
use units::todo::{Anglef32, Intensityf32, Lengthf32, Ratiof32};

/// Which compute device to run on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    /// Whatever the backend considers its default
    Default,
    Index(u32),
}

impl Device {
    /// Configuration convention: `-1` is the default device, non-negative
    /// values select a device, anything else is invalid.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            -1 => Some(Self::Default),
            i if i >= 0 => u32::try_from(i).ok().map(Self::Index),
            _ => None,
        }
    }

    pub fn index(self) -> i64 {
        match self {
            Self::Default  => -1,
            Self::Index(i) => i as i64,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("device {index} requested, but only {available} available")]
    DeviceUnavailable { index: u32, available: usize },

    #[error("{what} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch { what: &'static str, expected: Vec<usize>, found: Vec<usize> },

    #[error("invalid {what}: {value}")]
    InvalidParameter { what: &'static str, value: String },

    #[error("could not start worker threads: {0}")]
    ThreadPool(String),
}

/// Flat description of a 2-D parallel-beam acquisition.
///
/// Detector offsets and size are in volume-pixel units. For angle θ the
/// detector axis is `(cos θ, sin θ)`, its centre sits at `offset · axis` and
/// the rays travel along `(-sin θ, cos θ)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParallelParams {
    pub detector_count: usize,
    pub angles: Vec<Anglef32>,
    pub offsets: Vec<Lengthf32>,
    pub detector_size: Lengthf32,
    pub output_scale: Ratiof32,
}

/// One fan-beam projection in the normalized frame: the source and the
/// position of the *start* of the detector (the outer edge of pixel 0), with
/// the vector from one detector pixel edge to the next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FanProjection {
    pub source: Vector2,
    pub detector_start: Vector2,
    pub detector_step: Vector2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FanParams {
    pub detector_count: usize,
    pub projections: Vec<FanProjection>,
    pub output_scale: Ratiof32,
}

/// Flat description of a circular cone-beam acquisition, in voxel units.
#[derive(Clone, Debug, PartialEq)]
pub struct ConeParams {
    pub volume_cols: usize,
    pub volume_rows: usize,
    pub volume_slices: usize,
    /// Centre of the volume relative to the rotation axis
    pub volume_centre: [Lengthf32; 3],
    pub projection_count: usize,
    pub detector_cols: usize,
    pub detector_rows: usize,
    pub origin_source: Lengthf32,
    pub origin_detector: Lengthf32,
    pub detector_spacing_x: Lengthf32,
    pub detector_spacing_y: Lengthf32,
    pub angles: Vec<Anglef32>,
    pub output_scale: Ratiof32,
}

/// The numeric routines an algorithm can dispatch to.
pub trait Backend {

    fn name(&self) -> &str;

    /// Cone-beam filtered back-projection of `projections`
    /// (angles × detector rows × detector columns) into `volume`
    /// (slices × rows × columns), overwriting it.
    fn fdk(
        &self,
        volume             : ArrayViewMut3<Intensityf32>,
        projections        : ArrayView3<Intensityf32>,
        params             : &ConeParams,
        short_scan         : bool,
        device             : Device,
        voxel_supersampling: u32,
    ) -> Result<(), BackendError>;

    /// Parallel-beam forward projection of `volume` (rows × columns) into
    /// `sinogram` (angles × detectors), overwriting it.
    fn forward_project_parallel(
        &self,
        volume                : ArrayView2<Intensityf32>,
        sinogram              : ArrayViewMut2<Intensityf32>,
        params                : &ParallelParams,
        detector_supersampling: u32,
        device                : Device,
    ) -> Result<(), BackendError>;

    /// Fan-beam forward projection of `volume` into `sinogram`, overwriting it.
    fn forward_project_fan(
        &self,
        volume                : ArrayView2<Intensityf32>,
        sinogram              : ArrayViewMut2<Intensityf32>,
        params                : &FanParams,
        detector_supersampling: u32,
        device                : Device,
    ) -> Result<(), BackendError>;
}

pub(crate) fn check_shape(what: &'static str, found: &[usize], expected: &[usize]) -> Result<(), BackendError> {
    if found == expected { Ok(()) }
    else { Err(BackendError::ShapeMismatch { what, expected: expected.to_vec(), found: found.to_vec() }) }
}

pub(crate) fn check_supersampling(what: &'static str, n: u32) -> Result<(), BackendError> {
    if n >= 1 { Ok(()) }
    else { Err(BackendError::InvalidParameter { what, value: n.to_string() }) }
}
