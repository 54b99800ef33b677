use std::error::Error;
use std::path::Path;

use clap::Parser;
use ndarray::{Ix2, Ix3};
use tracing::info;
use tracing_subscriber::EnvFilter;

use geometry::ProjectionGeometry3D;
use tomoproj::algorithm::{self, Algorithm};
use tomoproj::backend::CpuBackend;
use tomoproj::config::{AlgorithmConfig, Scene, SceneGeometry, read_scene_file};
use tomoproj::data::{ProjectionData2D, ProjectionData3D, VolumeData2D, VolumeData3D};
use tomoproj::io::raw;
use tomoproj::manager::{Handle, Managers};
use tomoproj::phantom::{ball_projections, shepp_logan_2d};
use tomoproj::utils::{group_digits, timing::Progress};

mod cli;
use cli::*;

fn main() -> Result<(), Box<dyn Error>> {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Cli { command, devices, threads } = Cli::parse();
    let backend = CpuBackend::with_devices(devices, threads)?;

    let (mode, Args { scene, input, output, info: show_info }) = match command {
        Command::Fp (args) => ("FP" , args),
        Command::Fdk(args) => ("FDK", args),
    };

    let mut progress = Progress::new();
    progress.start(&format!("Reading scene {}", scene.display()));
    let scene = read_scene_file(&scene)?;
    progress.done();

    let mut managers = Managers::new();
    let config = algorithm_config(&scene, mode)?;
    let (mut algorithm, result) = match mode {
        "FP" => forward_projection(&scene, config, input.as_deref(), &mut managers, &mut progress)?,
        _    => reconstruction    (&scene, config, input.as_deref(), &mut managers, &mut progress)?,
    };

    progress.start(&format!("Running {}", algorithm.name()));
    algorithm.run(1, &backend)?;
    progress.done();
    if show_info {
        for (key, value) in algorithm.information(&managers) {
            info!("{key:>24}: {value}");
        }
    }

    progress.start(&format!("Writing {}", output.display()));
    let n = result.write_to(&output)?;
    progress.done_with_message(&format!("Wrote {} values", group_digits(n)));
    Ok(())
}

/// The scene's `[algorithm]` table, checked against the requested mode
fn algorithm_config(scene: &Scene, mode: &str) -> Result<AlgorithmConfig, Box<dyn Error>> {
    let mut config = scene.algorithm.clone().unwrap_or_default();
    if config.kind.is_empty() { config.kind = mode.into() }
    if config.kind != mode {
        return Err(format!("scene configures algorithm `{}`, but `{mode}` was requested", config.kind).into())
    }
    Ok(config)
}

/// The registered object which receives the algorithm's output
enum Output {
    Sinogram(Handle<ProjectionData2D>),
    Volume  (Handle<VolumeData3D>),
}

impl Output {
    fn write_to(&self, path: &Path) -> Result<usize, Box<dyn Error>> {
        let values: Vec<f32> = match self {
            Output::Sinogram(h) => h.read().map_err(|_| "sinogram is poisoned")?.view().iter().copied().collect(),
            Output::Volume  (h) => h.read().map_err(|_| "volume is poisoned"  )?.view().iter().copied().collect(),
        };
        raw::write(values.iter().copied(), path)?;
        Ok(values.len())
    }
}

type Prepared = (Box<dyn Algorithm>, Output);

fn forward_projection(
    scene: &Scene,
    mut config: AlgorithmConfig,
    input: Option<&Path>,
    managers: &mut Managers,
    progress: &mut Progress,
) -> Result<Prepared, Box<dyn Error>> {
    let SceneGeometry::Flat(geometry) = scene.projection.geometry()?
    else { return Err("FP needs a 2-D projection geometry".into()) };
    let volume_geometry = scene.volume.geometry_2d()?;

    let volume = match input {
        Some(path) => {
            progress.start(&format!("Reading volume {}", path.display()));
            let (rows, cols) = volume_geometry.shape();
            VolumeData2D::from_array(volume_geometry, raw::read_array(path, Ix2(rows, cols))?)?
        }
        None => {
            progress.start("Rasterizing Shepp-Logan phantom");
            shepp_logan_2d(&volume_geometry)
        }
    };
    progress.done();

    let (volume_id, _) = managers.store_volume2d(volume);
    let (sinogram_id, sinogram) = managers.store_projection2d(ProjectionData2D::new(geometry));
    config.volume_data = Some(volume_id);
    config.projection_data = Some(sinogram_id);
    Ok((algorithm::from_config(&config, managers)?, Output::Sinogram(sinogram)))
}

fn reconstruction(
    scene: &Scene,
    mut config: AlgorithmConfig,
    input: Option<&Path>,
    managers: &mut Managers,
    progress: &mut Progress,
) -> Result<Prepared, Box<dyn Error>> {
    let SceneGeometry::Volumetric(geometry) = scene.projection.geometry()?
    else { return Err("FDK needs a 3-D projection geometry".into()) };
    let volume_geometry = scene.volume.geometry_3d()?;

    let data = match (input, &geometry) {
        (Some(path), _) => {
            progress.start(&format!("Reading projections {}", path.display()));
            let (angles, rows, cols) = geometry.shape();
            raw::read_array(path, Ix3(angles, rows, cols))?
        }
        (None, ProjectionGeometry3D::Cone(cone)) => {
            // Ball spanning half of the smallest volume extent
            let (slices, rows, cols) = volume_geometry.shape();
            let radius = slices.min(rows).min(cols) as f32 * volume_geometry.voxel_length_x() / 4.0;
            progress.start(&format!("Projecting ball phantom of radius {radius} mm"));
            ball_projections(cone, radius)
        }
        (None, other) => return Err(format!("no built-in phantom for {} geometry: pass --input", other.kind()).into()),
    };
    let projections = ProjectionData3D::from_array(geometry, data)?;
    progress.done();

    let (projections_id, _) = managers.store_projection3d(projections);
    let (volume_id, volume) = managers.store_volume3d(VolumeData3D::new(volume_geometry));
    config.projection_data = Some(projections_id);
    config.volume_data = Some(volume_id);
    Ok((algorithm::from_config(&config, managers)?, Output::Volume(volume)))
}
