//! 2-D forward projection: volume in, sinogram out.

use tracing::{debug, info, warn};

use geometry::ProjectionGeometry2D;

use crate::backend::{Backend, Device, FanParams, ParallelParams, convert};
use crate::config::AlgorithmConfig;
use crate::config::algorithm::{DETECTOR_SUPERSAMPLING, GPU_INDEX};
use crate::data::{ProjectionData2D, VolumeData2D};
use crate::error::{Error, Result, config_check};
use crate::manager::{Handle, Managers};
use crate::projector::Projector2D;

use super::{Algorithm, Info, Lifecycle, describe, read, registered, write};

const NAME: &str = "FP";

const KEYS: &[&str] = &[
    "Initialized",
    "ProjectionGeometry",
    "ReconstructionGeometry",
    "ProjectionDataId",
    "VolumeDataId",
    GPU_INDEX,
    DETECTOR_SUPERSAMPLING,
];

#[derive(Debug)]
pub struct ForwardProjection {
    lifecycle: Lifecycle,
    volume: Option<Handle<VolumeData2D>>,
    sinogram: Option<Handle<ProjectionData2D>>,
    /// Only ever inspected, to warn about unsuitable projectors
    projector: Option<Handle<Projector2D>>,
    gpu_index: i64,
    detector_supersampling: i64,
    /// Device and supersampling, resolved when validation succeeds
    launch: Option<(Device, u32)>,
}

impl Default for ForwardProjection {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            volume: None,
            sinogram: None,
            projector: None,
            gpu_index: -1,
            detector_supersampling: 1,
            launch: None,
        }
    }
}

/// A geometry lowered to what one of the backend routines consumes
enum Lowered {
    Parallel(ParallelParams),
    Fan(FanParams),
}

impl ForwardProjection {

    /// Initialize from handles rather than through a registry
    pub fn initialize_with(
        &mut self,
        volume: Handle<VolumeData2D>,
        sinogram: Handle<ProjectionData2D>,
        gpu_index: i64,
        detector_supersampling: i64,
    ) -> Result<()> {
        self.clear();
        self.volume = Some(volume);
        self.sinogram = Some(sinogram);
        self.gpu_index = gpu_index;
        self.detector_supersampling = detector_supersampling;
        self.lifecycle = Lifecycle::Initialized;
        self.validate()
    }

    pub fn set_gpu_index(&mut self, gpu_index: i64) -> Result<()> {
        let device = device(gpu_index)?;
        self.gpu_index = gpu_index;
        if let Some((current, _)) = &mut self.launch { *current = device }
        Ok(())
    }

    fn store(&mut self, config: &AlgorithmConfig, managers: &Managers) -> Result<()> {
        let id = config.projection_data
            .ok_or_else(|| Error::config(NAME, "No ProjectionDataId tag specified."))?;
        self.sinogram = managers.projections2d.get(id.0);

        let id = config.volume_data
            .ok_or_else(|| Error::config(NAME, "No VolumeDataId tag specified."))?;
        self.volume = managers.volumes2d.get(id.0);

        let options = &config.options;
        self.gpu_index = options.gpu_index.unwrap_or(-1);
        self.detector_supersampling = options.detector_supersampling.unwrap_or(1);

        // Accepted, but only worth a warning if unsuitable
        if let Some(id) = config.projector {
            self.projector = managers.projectors2d.get(id.0);
            let gpu = match &self.projector {
                Some(p) => read(p, "projector")?.is_gpu(),
                None    => false,
            };
            if !gpu { warn!(projector = %id, "non-GPU projector passed to {NAME}") }
        }
        for option in options.unused(&[GPU_INDEX, DETECTOR_SUPERSAMPLING]) {
            warn!(option, "{NAME} ignores option");
        }
        self.lifecycle = Lifecycle::Initialized;
        Ok(())
    }

    /// Check the stored references and settings; on failure, forget them
    fn validate(&mut self) -> Result<()> {
        match self.check() {
            Ok(launch) => {
                self.launch = Some(launch);
                self.lifecycle = Lifecycle::Ready;
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    fn check(&self) -> Result<(Device, u32)> {
        let sinogram = self.sinogram.as_ref()
            .ok_or_else(|| Error::config(NAME, "No valid projection data object found."))?;
        config_check!(read(sinogram, "projection data")?.is_initialized(), NAME, "Projection data not initialized.");
        let volume = self.volume.as_ref()
            .ok_or_else(|| Error::config(NAME, "No valid volume data object found."))?;
        config_check!(read(volume, "volume data")?.is_initialized(), NAME, "Volume data not initialized.");
        let device = device(self.gpu_index)?;
        let supersampling = u32::try_from(self.detector_supersampling).ok().filter(|&n| n >= 1)
            .ok_or_else(|| Error::config(NAME, "DetectorSuperSampling must be a positive integer."))?;
        Ok((device, supersampling))
    }
}

fn device(gpu_index: i64) -> Result<Device> {
    Device::from_index(gpu_index)
        .ok_or_else(|| Error::config(NAME, "GPUIndex must be -1 or a valid device index."))
}

impl Algorithm for ForwardProjection {

    fn name(&self) -> &'static str { NAME }

    fn initialize(&mut self, config: &AlgorithmConfig, managers: &Managers) -> Result<()> {
        self.clear();
        if let Err(e) = self.store(config, managers) {
            self.clear();
            return Err(e);
        }
        self.validate()
    }

    fn run(&mut self, _iterations: usize, backend: &dyn Backend) -> Result<()> {
        let (Lifecycle::Ready, Some(volume), Some(sinogram), Some((device, supersampling))) =
            (self.lifecycle, &self.volume, &self.sinogram, self.launch)
        else { return Err(Error::NotInitialized(NAME)) };

        let volume = read(volume, "volume data")?;
        let mut sinogram = write(sinogram, "projection data")?;
        let volume_geometry = volume.geometry()
            .ok_or_else(|| Error::config(NAME, "Volume data not initialized."))?;

        let lowered = match sinogram.geometry() {
            Some(ProjectionGeometry2D::Parallel  (g)) => Lowered::Parallel(convert::parallel_params(volume_geometry, g)?),
            Some(ProjectionGeometry2D::FanFlat   (g)) => Lowered::Fan     (convert::fan_params     (volume_geometry, g)?),
            Some(ProjectionGeometry2D::FanFlatVec(g)) => Lowered::Fan     (convert::fan_vec_params (volume_geometry, g)?),
            None => return Err(Error::config(NAME, "Projection data not initialized.")),
        };

        info!(backend = backend.name(), ?device, supersampling, "{NAME} run");
        match lowered {
            Lowered::Parallel(params) => {
                debug!(projections = params.angles.len(), detectors = params.detector_count, "parallel beam");
                backend.forward_project_parallel(volume.view(), sinogram.view_mut(), &params, supersampling, device)?;
            }
            Lowered::Fan(params) => {
                debug!(projections = params.projections.len(), detectors = params.detector_count, "fan beam");
                backend.forward_project_fan(volume.view(), sinogram.view_mut(), &params, supersampling, device)?;
            }
        }
        info!("{NAME} finished");
        Ok(())
    }

    fn info_keys(&self) -> &'static [&'static str] { KEYS }

    fn info(&self, key: &str, managers: &Managers) -> Info {
        match key {
            "Initialized"            => Info::Bool(self.is_initialized()),
            "ProjectionGeometry"     => describe(self.sinogram.as_ref(), |g| g.kind().into()),
            "ReconstructionGeometry" => describe(self.volume.as_ref(), |g| format!("{} × {}", g.cols(), g.rows())),
            "ProjectionDataId"       => registered(&managers.projections2d, self.sinogram.as_ref()),
            "VolumeDataId"           => registered(&managers.volumes2d, self.volume.as_ref()),
            GPU_INDEX                => Info::Int(self.gpu_index),
            DETECTOR_SUPERSAMPLING   => Info::Int(self.detector_supersampling),
            _                        => Info::Unknown,
        }
    }

    fn clear(&mut self) { *self = Self::default() }

    fn lifecycle(&self) -> Lifecycle { self.lifecycle }
}
