//! Reference `Backend` running on the CPU.
//!
//! Each simulated device is a separate `rayon` thread pool; work submitted for
//! a device runs inside that pool, so algorithms sharing a device index share
//! its threads.

mod fdk;
mod siddon;

pub use siddon::line_integral;

use ndarray::{ArrayView2, ArrayView3, ArrayViewMut2, ArrayViewMut3, Axis};
use ndarray::parallel::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use geometry::Vector2;
use units::todo::{Intensityf32, Lengthf32};

use super::{
    Backend, BackendError, ConeParams, Device, FanParams, ParallelParams,
    check_shape, check_supersampling,
};

#[derive(Debug)]
pub struct CpuBackend {
    devices: Vec<ThreadPool>,
}

impl CpuBackend {

    /// A single device using as many threads as `rayon` thinks sensible
    pub fn new() -> Result<Self, BackendError> { Self::with_devices(1, 0) }

    /// `devices` independent thread pools of `threads_per_device` threads
    /// each (`0` lets `rayon` choose).
    pub fn with_devices(devices: usize, threads_per_device: usize) -> Result<Self, BackendError> {
        let devices = (0..devices.max(1))
            .map(|d| ThreadPoolBuilder::new()
                 .num_threads(threads_per_device)
                 .thread_name(move |t| format!("cpu{d}-worker{t}"))
                 .build()
                 .map_err(|e| BackendError::ThreadPool(e.to_string())))
            .collect::<Result<_, _>>()?;
        Ok(Self { devices })
    }

    fn pool(&self, device: Device) -> Result<&ThreadPool, BackendError> {
        let index = match device {
            Device::Default  => 0,
            Device::Index(i) => i,
        };
        self.devices
            .get(index as usize)
            .ok_or(BackendError::DeviceUnavailable { index, available: self.devices.len() })
    }
}

impl Backend for CpuBackend {

    fn name(&self) -> &str { "cpu" }

    fn fdk(
        &self,
        volume             : ArrayViewMut3<Intensityf32>,
        projections        : ArrayView3<Intensityf32>,
        params             : &ConeParams,
        short_scan         : bool,
        device             : Device,
        voxel_supersampling: u32,
    ) -> Result<(), BackendError> {
        check_supersampling("voxel supersampling", voxel_supersampling)?;
        check_shape("projections", projections.shape(),
                    &[params.projection_count, params.detector_rows, params.detector_cols])?;
        check_shape("volume", volume.shape(),
                    &[params.volume_slices, params.volume_rows, params.volume_cols])?;
        check_shape("angles", &[params.angles.len()], &[params.projection_count])?;
        let pool = self.pool(device)?;
        debug!(short_scan, voxel_supersampling, "cpu fdk");
        pool.install(|| fdk::reconstruct(volume, projections, params, short_scan, voxel_supersampling));
        Ok(())
    }

    fn forward_project_parallel(
        &self,
        volume                : ArrayView2<Intensityf32>,
        sinogram              : ArrayViewMut2<Intensityf32>,
        params                : &ParallelParams,
        detector_supersampling: u32,
        device                : Device,
    ) -> Result<(), BackendError> {
        check_supersampling("detector supersampling", detector_supersampling)?;
        check_shape("sinogram", sinogram.shape(), &[params.angles.len(), params.detector_count])?;
        check_shape("detector offsets", &[params.offsets.len()], &[params.angles.len()])?;
        let pool = self.pool(device)?;

        // Long enough to cross the whole grid from any point on the detector axis
        let (rows, cols) = volume.dim();
        let reach = 0.5 * ((rows * rows + cols * cols) as Lengthf32).sqrt() + 1.0;
        let ParallelParams { detector_count, ref angles, ref offsets, detector_size, output_scale } = *params;

        pool.install(|| project_rows(sinogram, detector_supersampling, output_scale, |i, u| {
            let (s, c) = angles[i].sin_cos();
            let axis = Vector2::new(c, s);
            let ray  = Vector2::new(-s, c);
            let along = offsets[i] + (u - detector_count as Lengthf32 / 2.0) * detector_size;
            let centre = axis * along;
            line_integral(volume, centre - ray * reach, centre + ray * reach)
        }));
        Ok(())
    }

    fn forward_project_fan(
        &self,
        volume                : ArrayView2<Intensityf32>,
        sinogram              : ArrayViewMut2<Intensityf32>,
        params                : &FanParams,
        detector_supersampling: u32,
        device                : Device,
    ) -> Result<(), BackendError> {
        check_supersampling("detector supersampling", detector_supersampling)?;
        check_shape("sinogram", sinogram.shape(), &[params.projections.len(), params.detector_count])?;
        let pool = self.pool(device)?;

        let (rows, cols) = volume.dim();
        let half_diagonal = 0.5 * ((rows * rows + cols * cols) as Lengthf32).sqrt();
        let projections = &params.projections;

        pool.install(|| project_rows(sinogram, detector_supersampling, params.output_scale, |i, u| {
            let p = &projections[i];
            let target = p.detector_start + p.detector_step * u;
            // Rays continue past the detector: it may sit inside the volume
            let direction = (target - p.source).normalize();
            let reach = p.source.norm() + half_diagonal + 1.0;
            line_integral(volume, p.source, p.source + direction * reach)
        }));
        Ok(())
    }
}

/// Fill each sinogram row in parallel. `ray_sum(i, u)` gives the integral for
/// projection `i` at detector position `u`, measured in detector pixels from
/// the start of the detector; each pixel is sampled `supersampling` times.
fn project_rows<F>(mut sinogram: ArrayViewMut2<Intensityf32>, supersampling: u32, output_scale: f32, ray_sum: F)
where
    F: Fn(usize, Lengthf32) -> Intensityf32 + Sync,
{
    let n = supersampling as Lengthf32;
    sinogram
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            for (j, value) in row.iter_mut().enumerate() {
                let total: Intensityf32 = (0..supersampling)
                    .map(|k| ray_sum(i, j as Lengthf32 + (k as Lengthf32 + 0.5) / n))
                    .sum();
                *value = total / n * output_scale;
            }
        });
}
