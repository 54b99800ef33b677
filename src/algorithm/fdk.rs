//! Cone-beam FDK reconstruction: projections in, volume out.

use tracing::{debug, info, warn};

use geometry::ProjectionGeometry3D;

use crate::backend::{Backend, Device, convert};
use crate::config::AlgorithmConfig;
use crate::config::algorithm::{GPU_INDEX, SHORT_SCAN, VOXEL_SUPERSAMPLING};
use crate::data::{ProjectionData3D, VolumeData3D};
use crate::error::{Error, Result, config_check};
use crate::manager::{Handle, Managers};
use crate::projector::Projector3D;

use super::{Algorithm, Info, Lifecycle, describe, read, registered, write};

const NAME: &str = "FDK";

const KEYS: &[&str] = &[
    "Initialized",
    "ProjectorId",
    "ProjectionDataId",
    "ReconstructionDataId",
    "ProjectionGeometry",
    GPU_INDEX,
    VOXEL_SUPERSAMPLING,
    SHORT_SCAN,
];

#[derive(Debug)]
pub struct Fdk {
    lifecycle: Lifecycle,
    projector: Option<Handle<Projector3D>>,
    projections: Option<Handle<ProjectionData3D>>,
    volume: Option<Handle<VolumeData3D>>,
    gpu_index: i64,
    voxel_supersampling: i64,
    short_scan: bool,
    /// Device and supersampling, resolved when validation succeeds
    launch: Option<(Device, u32)>,
}

impl Default for Fdk {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            projector: None,
            projections: None,
            volume: None,
            gpu_index: -1,
            voxel_supersampling: 1,
            short_scan: false,
            launch: None,
        }
    }
}

impl Fdk {

    /// Initialize from handles rather than through a registry
    pub fn initialize_with(
        &mut self,
        projections: Handle<ProjectionData3D>,
        volume: Handle<VolumeData3D>,
        gpu_index: i64,
        voxel_supersampling: i64,
        short_scan: bool,
    ) -> Result<()> {
        self.clear();
        self.projections = Some(projections);
        self.volume = Some(volume);
        self.gpu_index = gpu_index;
        self.voxel_supersampling = voxel_supersampling;
        self.short_scan = short_scan;
        self.lifecycle = Lifecycle::Initialized;
        self.validate()
    }

    fn store(&mut self, config: &AlgorithmConfig, managers: &Managers) -> Result<()> {
        if let Some(id) = config.projector {
            self.projector = managers.projectors3d.get(id.0);
            let gpu = match &self.projector {
                Some(p) => read(p, "projector")?.is_gpu(),
                None    => false,
            };
            if !gpu { warn!(projector = %id, "non-GPU projector passed to {NAME}") }
        }

        let id = config.projection_data
            .ok_or_else(|| Error::config(NAME, "No ProjectionDataId tag specified."))?;
        self.projections = managers.projections3d.get(id.0);

        let id = config.volume_data
            .ok_or_else(|| Error::config(NAME, "No ReconstructionDataId tag specified."))?;
        self.volume = managers.volumes3d.get(id.0);

        let options = &config.options;
        self.gpu_index           = options.gpu_index          .unwrap_or(-1);
        self.voxel_supersampling = options.voxel_supersampling.unwrap_or(1);
        self.short_scan          = options.short_scan         .unwrap_or(false);
        for option in options.unused(&[GPU_INDEX, VOXEL_SUPERSAMPLING, SHORT_SCAN]) {
            warn!(option, "{NAME} ignores option");
        }
        self.lifecycle = Lifecycle::Initialized;
        Ok(())
    }

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
        let projections = self.projections.as_ref()
            .ok_or_else(|| Error::config(NAME, "No valid projection data object found."))?;
        let projections = read(projections, "projection data")?;
        config_check!(projections.is_initialized(), NAME, "Projection data not initialized.");
        let volume = self.volume.as_ref()
            .ok_or_else(|| Error::config(NAME, "No valid reconstruction data object found."))?;
        config_check!(read(volume, "reconstruction data")?.is_initialized(), NAME, "Reconstruction data not initialized.");
        config_check!(matches!(projections.geometry(), Some(ProjectionGeometry3D::Cone(_))), NAME, "Error setting FDK geometry");
        let device = Device::from_index(self.gpu_index)
            .ok_or_else(|| Error::config(NAME, "GPUIndex must be -1 or a valid device index."))?;
        let supersampling = u32::try_from(self.voxel_supersampling).ok().filter(|&n| n >= 1)
            .ok_or_else(|| Error::config(NAME, "VoxelSuperSampling must be a positive integer."))?;
        Ok((device, supersampling))
    }
}

impl Algorithm for Fdk {

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
        let (Lifecycle::Ready, Some(projections), Some(volume), Some((device, supersampling))) =
            (self.lifecycle, &self.projections, &self.volume, self.launch)
        else { return Err(Error::NotInitialized(NAME)) };

        let projections = read(projections, "projection data")?;
        let mut volume = write(volume, "reconstruction data")?;
        let Some(ProjectionGeometry3D::Cone(cone)) = projections.geometry()
        else { return Err(Error::config(NAME, "Error setting FDK geometry")) };
        let volume_geometry = volume.geometry()
            .ok_or_else(|| Error::config(NAME, "Reconstruction data not initialized."))?;
        let params = convert::cone_params(volume_geometry, cone)?;

        info!(backend = backend.name(), ?device, supersampling, short_scan = self.short_scan, "{NAME} run");
        debug!(
            projections = params.projection_count,
            detector = ?(params.detector_cols, params.detector_rows),
            volume = ?(params.volume_cols, params.volume_rows, params.volume_slices),
            "cone beam",
        );
        backend.fdk(volume.view_mut(), projections.view(), &params, self.short_scan, device, supersampling)?;
        info!("{NAME} finished");
        Ok(())
    }

    fn info_keys(&self) -> &'static [&'static str] { KEYS }

    fn info(&self, key: &str, managers: &Managers) -> Info {
        match key {
            "Initialized"          => Info::Bool(self.is_initialized()),
            "ProjectorId"          => registered(&managers.projectors3d, self.projector.as_ref()),
            "ProjectionDataId"     => registered(&managers.projections3d, self.projections.as_ref()),
            "ReconstructionDataId" => registered(&managers.volumes3d, self.volume.as_ref()),
            "ProjectionGeometry"   => describe(self.projections.as_ref(), |g| g.kind().into()),
            GPU_INDEX              => Info::Int(self.gpu_index),
            VOXEL_SUPERSAMPLING    => Info::Int(self.voxel_supersampling),
            SHORT_SCAN             => Info::Bool(self.short_scan),
            _                      => Info::Unknown,
        }
    }

    fn clear(&mut self) { *self = Self::default() }

    fn lifecycle(&self) -> Lifecycle { self.lifecycle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::recording::{Call, RecordingBackend};
    use crate::backend::CpuBackend;
    use crate::config::Options;
    use crate::manager::{DataId, ProjectorId, handle};
    use crate::phantom::ball_projections;
    use crate::projector::ProjectorKind;
    use float_eq::assert_float_eq;
    use geometry::{ConeGeometry3D, Detector, ParallelGeometry3D, VolumeGeometry3D, linspace_angles};
    use rstest::rstest;
    use std::f32::consts::TAU;
    use std::sync::Arc;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    const DETECTOR: Detector = Detector { cols: 16, rows: 12, spacing_x: 2.0, spacing_y: 2.0 };

    fn cone() -> ConeGeometry3D {
        ConeGeometry3D::new(DETECTOR, linspace_angles(0.0, TAU, 8), 100.0, 50.0).unwrap()
    }

    fn volume() -> VolumeData3D { VolumeData3D::new(VolumeGeometry3D::with_voxel_size(8, 8, 4, 2.0).unwrap()) }

    /// Registry holding projections 1 and volume 2
    fn registry(geometry: ProjectionGeometry3D) -> Managers {
        let mut m = Managers::new();
        m.store_projection3d(ProjectionData3D::new(geometry));
        m.store_volume3d(volume());
        m
    }

    fn config() -> AlgorithmConfig {
        AlgorithmConfig {
            kind: NAME.into(),
            projection_data: Some(DataId(1)),
            volume_data: Some(DataId(2)),
            ..AlgorithmConfig::default()
        }
    }

    #[test]
    fn defaults_are_reported() {
        let managers = registry(cone().into());
        let mut fdk = Fdk::default();
        fdk.initialize(&config(), &managers).unwrap();
        assert_eq!(fdk.info(GPU_INDEX, &managers), Info::Int(-1));
        assert_eq!(fdk.info(VOXEL_SUPERSAMPLING, &managers), Info::Int(1));
        assert_eq!(fdk.info(SHORT_SCAN, &managers), Info::Bool(false));
        assert_eq!(fdk.info("ProjectionDataId", &managers), Info::Id(1));
        assert_eq!(fdk.info("ReconstructionDataId", &managers), Info::Id(2));
        assert_eq!(fdk.info("ProjectorId", &managers), Info::NotInManager);
        assert_eq!(fdk.info("ProjectionGeometry", &managers), Info::Text("cone".into()));
        assert_eq!(fdk.information(&managers).len(), KEYS.len());
    }

    #[test]
    fn cone_run_passes_geometry_through() {
        let mut managers = registry(cone().into());
        let (projector, _) = managers.store_projector3d(Projector3D::new(ProjectorKind::Gpu));
        let config = AlgorithmConfig {
            projector: Some(projector),
            options: Options {
                gpu_index: Some(2),
                voxel_supersampling: Some(3),
                short_scan: Some(true),
                ..Options::default()
            },
            ..config()
        };
        let mut fdk = Fdk::default();
        fdk.initialize(&config, &managers).unwrap();
        assert_eq!(fdk.info("ProjectorId", &managers), Info::Id(projector.0));

        let backend = RecordingBackend::default();
        fdk.run(1, &backend).unwrap();
        let calls = backend.calls.borrow();
        let [Call::Fdk { params, short_scan, device, supersampling }] = calls.as_slice()
        else { panic!("expected a single FDK call, got {calls:?}") };
        assert_eq!((*short_scan, *device, *supersampling), (true, Device::Index(2), 3));
        assert_eq!((params.volume_cols, params.volume_rows, params.volume_slices), (8, 8, 4));
        assert_eq!((params.projection_count, params.detector_cols, params.detector_rows), (8, 16, 12));
        // Voxels of 2 mm
        assert_eq!((params.origin_source, params.origin_detector), (50.0, 25.0));
        assert_eq!((params.detector_spacing_x, params.detector_spacing_y), (1.0, 1.0));
        assert_eq!(params.angles, cone().angles());
        assert_eq!(params.output_scale, 0.5);
    }

    #[test]
    fn parallel_projections_are_rejected() {
        let parallel = ParallelGeometry3D::new(DETECTOR, vec![0.0, 1.0]).unwrap();
        let managers = registry(parallel.into());
        let mut fdk = Fdk::default();
        match fdk.initialize(&config(), &managers) {
            Err(Error::Config { algorithm, reason }) => {
                assert_eq!(algorithm, NAME);
                assert_eq!(reason, "Error setting FDK geometry");
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert_eq!(fdk.lifecycle(), Lifecycle::Uninitialized);
        let backend = RecordingBackend::default();
        assert!(matches!(fdk.run(1, &backend), Err(Error::NotInitialized(NAME))));
        assert!(backend.calls.borrow().is_empty());
    }

    #[test]
    fn missing_tags() {
        let managers = registry(cone().into());
        let mut fdk = Fdk::default();
        let err = fdk.initialize(&AlgorithmConfig { volume_data: None, ..config() }, &managers).unwrap_err();
        assert!(matches!(err, Error::Config { reason, .. } if reason == "No ReconstructionDataId tag specified."));
        let err = fdk.initialize(&AlgorithmConfig { projection_data: None, ..config() }, &managers).unwrap_err();
        assert!(matches!(err, Error::Config { reason, .. } if reason == "No ProjectionDataId tag specified."));
        // Swapped ids: each names the wrong kind of object
        let swapped = AlgorithmConfig { projection_data: Some(DataId(2)), volume_data: Some(DataId(1)), ..config() };
        let err = fdk.initialize(&swapped, &managers).unwrap_err();
        assert!(matches!(err, Error::Config { reason, .. } if reason == "No valid projection data object found."));
    }

    #[rstest(/**/ gpu_index, supersampling, reason,
             case(-2        , 1         , "GPUIndex must be -1 or a valid device index."),
             case(1 << 40   , 1         , "GPUIndex must be -1 or a valid device index."),
             case(0         , 0         , "VoxelSuperSampling must be a positive integer."),
             case(0         , 1 << 40   , "VoxelSuperSampling must be a positive integer."),
    )]
    fn unusable_settings_fail_validation(gpu_index: i64, supersampling: i64, reason: &str) {
        let managers = registry(cone().into());
        let config = AlgorithmConfig {
            options: Options { gpu_index: Some(gpu_index), voxel_supersampling: Some(supersampling), ..Options::default() },
            ..config()
        };
        let mut fdk = Fdk::default();
        match fdk.initialize(&config, &managers) {
            Err(Error::Config { algorithm, reason: r }) => {
                assert_eq!(algorithm, NAME);
                assert_eq!(r, reason);
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
        assert_eq!(fdk.lifecycle(), Lifecycle::Uninitialized);
        let backend = RecordingBackend::default();
        assert!(matches!(fdk.run(1, &backend), Err(Error::NotInitialized(NAME))));
        assert!(backend.calls.borrow().is_empty());
    }

    #[test]
    fn non_gpu_projector_is_only_a_warning() {
        let mut managers = registry(cone().into());
        let (projector, _) = managers.store_projector3d(Projector3D::new(ProjectorKind::Strip));
        let mut fdk = Fdk::default();
        fdk.initialize(&AlgorithmConfig { projector: Some(ProjectorId(projector.0)), ..config() }, &managers).unwrap();
        assert!(fdk.is_initialized());
    }

    #[test]
    fn reinitialization_releases_previous_objects() {
        let projections = handle(ProjectionData3D::new(cone().into()));
        let volume = handle(volume());
        let mut fdk = Fdk::default();
        fdk.initialize_with(projections.clone(), volume.clone(), 0, 2, true).unwrap();
        assert_eq!(Arc::strong_count(&volume), 2);

        let parallel = ParallelGeometry3D::new(DETECTOR, vec![0.0]).unwrap();
        let other = handle(ProjectionData3D::new(parallel.into()));
        assert!(fdk.initialize_with(other, handle(self::volume()), -1, 1, false).is_err());
        assert_eq!(Arc::strong_count(&projections), 1);
        assert_eq!(Arc::strong_count(&volume), 1);
        assert_eq!(fdk.info(SHORT_SCAN, &Managers::new()), Info::Bool(false));
    }

    #[test]
    fn backend_failure_leaves_algorithm_ready() {
        let managers = registry(cone().into());
        let mut fdk = Fdk::default();
        fdk.initialize(&config(), &managers).unwrap();
        assert!(matches!(fdk.run(1, &RecordingBackend::failing()), Err(Error::Backend(_))));
        assert!(fdk.is_initialized());
    }

    #[test]
    fn ball_through_the_cpu_backend() {
        let voxel = 1.0;
        let detector = Detector { cols: 48, rows: 40, spacing_x: 1.5, spacing_y: 1.5 };
        let geometry = ConeGeometry3D::new(detector, linspace_angles(0.0, TAU, 90), 200.0, 100.0).unwrap();
        let projections = ProjectionData3D::from_array(geometry.clone().into(), ball_projections(&geometry, 6.0)).unwrap();
        let volume = VolumeData3D::new(VolumeGeometry3D::with_voxel_size(24, 24, 24, voxel).unwrap());
        let (projections, volume) = (handle(projections), handle(volume));

        let mut fdk = Fdk::default();
        fdk.initialize_with(projections, volume.clone(), -1, 1, false).unwrap();
        fdk.run(1, &CpuBackend::new().unwrap()).unwrap();

        let volume = volume.read().unwrap();
        let centre = volume.view()[[12, 12, 12]];
        let outside = volume.view()[[12, 12, 22]];
        assert_float_eq!(centre, 1.0, abs <= 0.15);
        assert_float_eq!(outside, 0.0, abs <= 0.15);
    }
}
