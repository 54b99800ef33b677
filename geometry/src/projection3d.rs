use crate::{GeometryError, Vector3, nonzero, positive};
use units::todo::{Anglef32, Lengthf32};

/// The acquisition geometries understood in 3-D.
#[derive(Clone, Debug, PartialEq)]
pub enum ProjectionGeometry3D {
    Parallel3D(ParallelGeometry3D),
    Cone      (ConeGeometry3D),
    ConeVec   (ConeVecGeometry3D),
}

impl ProjectionGeometry3D {

    pub fn projection_count(&self) -> usize {
        match self {
            Self::Parallel3D(g) => g.angles.len(),
            Self::Cone      (g) => g.angles.len(),
            Self::ConeVec   (g) => g.vectors.len(),
        }
    }

    pub fn detector_cols(&self) -> usize {
        match self {
            Self::Parallel3D(g) => g.detector_cols,
            Self::Cone      (g) => g.detector_cols,
            Self::ConeVec   (g) => g.detector_cols,
        }
    }

    pub fn detector_rows(&self) -> usize {
        match self {
            Self::Parallel3D(g) => g.detector_rows,
            Self::Cone      (g) => g.detector_rows,
            Self::ConeVec   (g) => g.detector_rows,
        }
    }

    /// `(projections, detector rows, detector columns)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.projection_count(), self.detector_rows(), self.detector_cols())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parallel3D(_) => "parallel3d",
            Self::Cone      (_) => "cone",
            Self::ConeVec   (_) => "cone_vec",
        }
    }
}

impl From<ParallelGeometry3D> for ProjectionGeometry3D { fn from(g: ParallelGeometry3D) -> Self { Self::Parallel3D(g) } }
impl From<ConeGeometry3D    > for ProjectionGeometry3D { fn from(g: ConeGeometry3D    ) -> Self { Self::Cone      (g) } }
impl From<ConeVecGeometry3D > for ProjectionGeometry3D { fn from(g: ConeVecGeometry3D ) -> Self { Self::ConeVec   (g) } }

/// Shared detector description of the circular 3-D geometries
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detector {
    pub cols: usize,
    pub rows: usize,
    pub spacing_x: Lengthf32,
    pub spacing_y: Lengthf32,
}

impl Detector {
    fn check(self) -> Result<Self, GeometryError> {
        nonzero ("detector columns"  , self.cols     )?;
        nonzero ("detector rows"     , self.rows     )?;
        positive("detector spacing x", self.spacing_x)?;
        positive("detector spacing y", self.spacing_y)?;
        Ok(self)
    }
}

// ----- Parallel beam ----------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct ParallelGeometry3D {
    detector_cols: usize,
    detector_rows: usize,
    spacing_x: Lengthf32,
    spacing_y: Lengthf32,
    angles: Vec<Anglef32>,
}

impl ParallelGeometry3D {

    pub fn new(detector: Detector, angles: Vec<Anglef32>) -> Result<Self, GeometryError> {
        let Detector { cols, rows, spacing_x, spacing_y } = detector.check()?;
        if angles.is_empty() { return Err(GeometryError::NoProjections) }
        Ok(Self { detector_cols: cols, detector_rows: rows, spacing_x, spacing_y, angles })
    }

    pub fn angles(&self) -> &[Anglef32] { &self.angles }
    pub fn detector_spacing_x(&self) -> Lengthf32 { self.spacing_x }
    pub fn detector_spacing_y(&self) -> Lengthf32 { self.spacing_y }
}

// ----- Cone beam, circular trajectory -----------------------------------------------

/// Point source on a circle in the `z = 0` plane; at angle 0 the source sits at
/// `(0, -origin_source, 0)`, the detector centre at `(0, origin_detector, 0)`,
/// detector columns run along `+x` and detector rows along `+z`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConeGeometry3D {
    detector_cols: usize,
    detector_rows: usize,
    spacing_x: Lengthf32,
    spacing_y: Lengthf32,
    angles: Vec<Anglef32>,
    origin_source: Lengthf32,
    origin_detector: Lengthf32,
}

impl ConeGeometry3D {

    pub fn new(
        detector: Detector,
        angles: Vec<Anglef32>,
        origin_source: Lengthf32,
        origin_detector: Lengthf32,
    ) -> Result<Self, GeometryError> {
        let Detector { cols, rows, spacing_x, spacing_y } = detector.check()?;
        let origin_source = positive("source distance", origin_source)?;
        if !(origin_detector >= 0.0 && origin_detector.is_finite()) {
            return Err(GeometryError::NonPositive { what: "detector distance", value: origin_detector })
        }
        if angles.is_empty() { return Err(GeometryError::NoProjections) }
        Ok(Self {
            detector_cols: cols, detector_rows: rows, spacing_x, spacing_y,
            angles, origin_source, origin_detector,
        })
    }

    pub fn projection_count  (&self) -> usize       { self.angles.len()    }
    pub fn detector_cols     (&self) -> usize       { self.detector_cols   }
    pub fn detector_rows     (&self) -> usize       { self.detector_rows   }
    pub fn detector_spacing_x(&self) -> Lengthf32   { self.spacing_x       }
    pub fn detector_spacing_y(&self) -> Lengthf32   { self.spacing_y       }
    pub fn angles            (&self) -> &[Anglef32] { &self.angles         }
    pub fn origin_source     (&self) -> Lengthf32   { self.origin_source   }
    pub fn origin_detector   (&self) -> Lengthf32   { self.origin_detector }

    /// Source position for the `i`th projection
    pub fn source(&self, i: usize) -> Vector3 {
        let (s, c) = self.angles[i].sin_cos();
        Vector3::new(s * self.origin_source, -c * self.origin_source, 0.0)
    }

    /// World position of the centre of detector pixel `(row, col)` in the
    /// `i`th projection
    pub fn detector_pixel(&self, i: usize, row: usize, col: usize) -> Vector3 {
        let (s, c) = self.angles[i].sin_cos();
        let u = (col as Lengthf32 + 0.5 - self.detector_cols as Lengthf32 / 2.0) * self.spacing_x;
        let v = (row as Lengthf32 + 0.5 - self.detector_rows as Lengthf32 / 2.0) * self.spacing_y;
        let centre = Vector3::new(-s * self.origin_detector, c * self.origin_detector, 0.0);
        centre + Vector3::new(c, s, 0.0) * u + Vector3::z() * v
    }
}

// ----- Cone beam, arbitrary per-projection vectors ----------------------------------

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConeVector {
    pub source: Vector3,
    pub detector_centre: Vector3,
    /// From one detector column to the next
    pub step_u: Vector3,
    /// From one detector row to the next
    pub step_v: Vector3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConeVecGeometry3D {
    detector_cols: usize,
    detector_rows: usize,
    vectors: Vec<ConeVector>,
}

impl ConeVecGeometry3D {

    pub fn new(detector_cols: usize, detector_rows: usize, vectors: Vec<ConeVector>) -> Result<Self, GeometryError> {
        let detector_cols = nonzero("detector columns", detector_cols)?;
        let detector_rows = nonzero("detector rows"   , detector_rows)?;
        if vectors.is_empty() { return Err(GeometryError::NoProjections) }
        Ok(Self { detector_cols, detector_rows, vectors })
    }

    pub fn vectors(&self) -> &[ConeVector] { &self.vectors }
}
