//! Scene files: the volume grid, the acquisition geometry and (optionally)
//! the algorithm to apply, in one TOML document.
//!
//! ```toml
//! [volume]
//! cols  = 256
//! rows  = 256
//! pixel = "0.5 mm"
//!
//! [projection]
//! kind            = "fanflat"
//! detectors       = 384
//! detector_width  = "0.8 mm"
//! angles          = { stop = 360, count = 180 }  # degrees
//! origin_source   = "30 cm"
//! origin_detector = "200 mm"
//!
//! [algorithm]
//! type = "FP"
//! option = { DetectorSuperSampling = 2 }
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, de};

use geometry::{
    ConeGeometry3D, ConeVecGeometry3D, ConeVector, Detector, FanFlatGeometry2D,
    FanFlatVecGeometry2D, FanVector, GeometryError, ParallelGeometry2D, ParallelGeometry3D,
    ProjectionGeometry2D, ProjectionGeometry3D, Vector2, Vector3, VolumeGeometry2D,
    VolumeGeometry3D, linspace_angles,
};
use units::{Length, degree, mm_, radian_};
use units::todo::Anglef32;

use super::{AlgorithmConfig, ConfigError};

/// Parse a string such as `"300 mm"` into a `uom` quantity
fn deserialize_uom<'d, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    String::deserialize(deserializer)?
        .parse::<T>()
        .map_err(de::Error::custom)
}

fn deserialize_uom_2d<'d, D, T>(deserializer: D) -> Result<(T, T), D::Error>
where
    D: Deserializer<'d>,
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let (x, y) = <(String, String)>::deserialize(deserializer)?;
    tr_tup_res((x.parse(), y.parse()))
        .map_err(de::Error::custom)
}

/// Transpose 2-tuple of `Result`
///
/// `Ok` if both elements `Ok`; otherwise the first `Err`.
fn tr_tup_res<O, E>((x, y): (Result<O, E>, Result<O, E>)) -> Result<(O, O), E> {
    Ok((x?, y?))
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    pub volume: VolumeConfig,
    pub projection: ProjectionConfig,
    pub algorithm: Option<AlgorithmConfig>,
}

/// Reconstruction grid, centred on the origin
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct VolumeConfig {
    pub cols: usize,
    pub rows: usize,
    /// Present for 3-D volumes only
    pub slices: Option<usize>,
    /// Side of a (square or cubic) pixel
    #[serde(deserialize_with = "deserialize_uom")]
    pub pixel: Length,
}

/// Evenly spaced projection angles in degrees, `stop` excluded
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Angles {
    #[serde(default)]
    pub start: f32,
    pub stop: f32,
    pub count: usize,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    pub cols: usize,
    pub rows: usize,
    /// Pixel pitch along columns and rows
    #[serde(deserialize_with = "deserialize_uom_2d")]
    pub spacing: (Length, Length),
}

#[derive(Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectionConfig {
    Parallel {
        detectors: usize,
        #[serde(deserialize_with = "deserialize_uom")]
        detector_width: Length,
        angles: Angles,
        /// Extra per-projection detector shifts, in mm
        offsets: Option<Vec<f32>>,
    },
    Fanflat {
        detectors: usize,
        #[serde(deserialize_with = "deserialize_uom")]
        detector_width: Length,
        angles: Angles,
        #[serde(deserialize_with = "deserialize_uom")]
        origin_source: Length,
        #[serde(deserialize_with = "deserialize_uom")]
        origin_detector: Length,
    },
    /// Per projection, in mm: `[source x, y, detector centre x, y, pixel step x, y]`
    FanflatVec {
        detectors: usize,
        vectors: Vec<[f32; 6]>,
    },
    Parallel3d {
        detector: DetectorConfig,
        angles: Angles,
    },
    Cone {
        detector: DetectorConfig,
        angles: Angles,
        #[serde(deserialize_with = "deserialize_uom")]
        origin_source: Length,
        #[serde(deserialize_with = "deserialize_uom")]
        origin_detector: Length,
    },
    /// Per projection, in mm: source, detector centre, column step and row
    /// step, three components each
    ConeVec {
        detector_cols: usize,
        detector_rows: usize,
        vectors: Vec<[f32; 12]>,
    },
}

/// A projection geometry of either dimensionality
#[derive(Clone, Debug, PartialEq)]
pub enum SceneGeometry {
    Flat      (ProjectionGeometry2D),
    Volumetric(ProjectionGeometry3D),
}

impl Angles {
    pub fn radians(&self) -> Vec<Anglef32> {
        linspace_angles(radian_(degree(self.start)), radian_(degree(self.stop)), self.count)
    }
}

impl DetectorConfig {
    fn detector(&self) -> Detector {
        Detector { cols: self.cols, rows: self.rows, spacing_x: mm_(self.spacing.0), spacing_y: mm_(self.spacing.1) }
    }
}

impl VolumeConfig {

    pub fn geometry_2d(&self) -> Result<VolumeGeometry2D, GeometryError> {
        VolumeGeometry2D::with_pixel_size(self.cols, self.rows, mm_(self.pixel))
    }

    /// A 2-D description is read as a single slice
    pub fn geometry_3d(&self) -> Result<VolumeGeometry3D, GeometryError> {
        VolumeGeometry3D::with_voxel_size(self.cols, self.rows, self.slices.unwrap_or(1), mm_(self.pixel))
    }
}

impl ProjectionConfig {

    pub fn geometry(&self) -> Result<SceneGeometry, GeometryError> {
        use ProjectionConfig::*;
        use SceneGeometry::{Flat, Volumetric};
        Ok(match self {
            Parallel { detectors, detector_width, angles, offsets } => {
                let g = ParallelGeometry2D::new(*detectors, mm_(*detector_width), angles.radians())?;
                let g = match offsets {
                    Some(offsets) => g.with_detector_offsets(offsets.clone())?,
                    None          => g,
                };
                Flat(g.into())
            }
            Fanflat { detectors, detector_width, angles, origin_source, origin_detector } => Flat(
                FanFlatGeometry2D::new(*detectors, mm_(*detector_width), angles.radians(),
                                       mm_(*origin_source), mm_(*origin_detector))?.into()
            ),
            FanflatVec { detectors, vectors } => {
                let vectors = vectors.iter()
                    .map(|&[sx, sy, dx, dy, ux, uy]| FanVector {
                        source         : Vector2::new(sx, sy),
                        detector_centre: Vector2::new(dx, dy),
                        detector_step  : Vector2::new(ux, uy),
                    })
                    .collect();
                Flat(FanFlatVecGeometry2D::new(*detectors, vectors)?.into())
            }
            Parallel3d { detector, angles } => Volumetric(
                ParallelGeometry3D::new(detector.detector(), angles.radians())?.into()
            ),
            Cone { detector, angles, origin_source, origin_detector } => Volumetric(
                ConeGeometry3D::new(detector.detector(), angles.radians(),
                                    mm_(*origin_source), mm_(*origin_detector))?.into()
            ),
            ConeVec { detector_cols, detector_rows, vectors } => {
                let vectors = vectors.iter()
                    .map(|v| ConeVector {
                        source         : Vector3::new(v[0], v[ 1], v[ 2]),
                        detector_centre: Vector3::new(v[3], v[ 4], v[ 5]),
                        step_u         : Vector3::new(v[6], v[ 7], v[ 8]),
                        step_v         : Vector3::new(v[9], v[10], v[11]),
                    })
                    .collect();
                Volumetric(ConeVecGeometry3D::new(*detector_cols, *detector_rows, vectors)?.into())
            }
        })
    }
}

impl Scene {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

pub fn read_scene_file(path: &Path) -> Result<Scene, ConfigError> {
    let text = fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
    Scene::from_toml_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use std::f32::consts::PI;
    use std::io::Write;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    const FAN: &str = r#"
        [volume]
        cols  = 64
        rows  = 32
        pixel = "0.5 mm"

        [projection]
        kind            = "fanflat"
        detectors       = 100
        detector_width  = "0.1 cm"
        angles          = { stop = 360, count = 4 }
        origin_source   = "30 cm"
        origin_detector = "200 mm"

        [algorithm]
        type = "FP"
        option = { DetectorSuperSampling = 2 }
    "#;

    #[test]
    fn fan_scene() {
        let scene = Scene::from_toml_str(FAN).unwrap();
        let volume = scene.volume.geometry_2d().unwrap();
        assert_eq!(volume.shape(), (32, 64));
        assert_eq!(volume.pixel_length_x(), 0.5);
        let SceneGeometry::Flat(ProjectionGeometry2D::FanFlat(fan)) = scene.projection.geometry().unwrap()
        else { panic!("expected fan-flat geometry") };
        assert_float_eq!(fan.detector_width() , 1.0  , rmax <= 1e-6);
        assert_float_eq!(fan.origin_source()  , 300.0, rmax <= 1e-6);
        assert_float_eq!(fan.origin_detector(), 200.0, rmax <= 1e-6);
        assert_float_eq!(fan.angles(), &[0.0, PI / 2.0, PI, 1.5 * PI][..], abs_all <= 1e-5);
        let algorithm = scene.algorithm.unwrap();
        assert_eq!(algorithm.kind, "FP");
        assert_eq!(algorithm.options.detector_supersampling, Some(2));
    }

    #[test]
    fn cone_scene_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("scene.toml");
        write!(fs::File::create(&path)?, r#"
            [volume]
            cols   = 16
            rows   = 16
            slices = 8
            pixel  = "1 mm"

            [projection]
            kind            = "cone"
            detector        = {{ cols = 24, rows = 12, spacing = ["1.5 mm", "2 mm"] }}
            angles          = {{ start = 10, stop = 190, count = 90 }}
            origin_source   = "100 mm"
            origin_detector = "50 mm"
        "#)?;
        let scene = read_scene_file(&path)?;
        assert!(scene.algorithm.is_none());
        assert_eq!(scene.volume.geometry_3d()?.shape(), (8, 16, 16));
        let SceneGeometry::Volumetric(ProjectionGeometry3D::Cone(cone)) = scene.projection.geometry()?
        else { panic!("expected cone geometry") };
        assert_eq!(cone.projection_count(), 90);
        assert_float_eq!(cone.detector_spacing_x(), 1.5, r2nd <= 1e-6);
        assert_float_eq!(cone.detector_spacing_y(), 2.0, r2nd <= 1e-6);
        assert_float_eq!(cone.angles()[0], 10.0_f32.to_radians(), abs <= 1e-6);
        Ok(())
    }

    #[test]
    fn vector_geometries() {
        let scene = Scene::from_toml_str(r#"
            [volume]
            cols = 4
            rows = 4
            pixel = "1 mm"
            [projection]
            kind = "fanflat_vec"
            detectors = 8
            vectors = [[0, -10, 0, 10, 1, 0], [10, 0, -10, 0, 0, 1]]
        "#).unwrap();
        let SceneGeometry::Flat(ProjectionGeometry2D::FanFlatVec(g)) = scene.projection.geometry().unwrap()
        else { panic!("expected fan-flat-vec geometry") };
        assert_eq!(g.vectors()[1].detector_step, Vector2::new(0.0, 1.0));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = read_scene_file(Path::new("/nonexistent/scene.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/scene.toml"));
    }

    #[test]
    fn bad_units_are_rejected() {
        let text = FAN.replace("\"0.5 mm\"", "\"0.5 furlongs\"");
        assert!(matches!(Scene::from_toml_str(&text), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn invalid_geometry_surfaces_as_geometry_error() {
        let text = FAN.replace("detectors       = 100", "detectors       = 0");
        let scene = Scene::from_toml_str(&text).unwrap();
        assert!(matches!(scene.projection.geometry(), Err(GeometryError::ZeroCount { .. })));
    }
}
