use crate::{GeometryError, Vector2, nonzero, positive};
use units::todo::{Anglef32, Lengthf32};

/// The acquisition geometries understood in 2-D.
///
/// Closed: anything that dispatches on the geometry does so with an
/// exhaustive `match`.
#[derive(Clone, Debug, PartialEq)]
pub enum ProjectionGeometry2D {
    Parallel  (ParallelGeometry2D),
    FanFlat   (FanFlatGeometry2D),
    FanFlatVec(FanFlatVecGeometry2D),
}

impl ProjectionGeometry2D {

    pub fn projection_count(&self) -> usize {
        match self {
            Self::Parallel  (g) => g.angles.len(),
            Self::FanFlat   (g) => g.angles.len(),
            Self::FanFlatVec(g) => g.vectors.len(),
        }
    }

    pub fn detector_count(&self) -> usize {
        match self {
            Self::Parallel  (g) => g.detector_count,
            Self::FanFlat   (g) => g.detector_count,
            Self::FanFlatVec(g) => g.detector_count,
        }
    }

    /// `(projections, detectors)`, the shape of a matching sinogram buffer
    pub fn shape(&self) -> (usize, usize) { (self.projection_count(), self.detector_count()) }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parallel  (_) => "parallel",
            Self::FanFlat   (_) => "fanflat",
            Self::FanFlatVec(_) => "fanflat_vec",
        }
    }
}

impl From<ParallelGeometry2D  > for ProjectionGeometry2D { fn from(g: ParallelGeometry2D  ) -> Self { Self::Parallel  (g) } }
impl From<FanFlatGeometry2D   > for ProjectionGeometry2D { fn from(g: FanFlatGeometry2D   ) -> Self { Self::FanFlat   (g) } }
impl From<FanFlatVecGeometry2D> for ProjectionGeometry2D { fn from(g: FanFlatVecGeometry2D) -> Self { Self::FanFlatVec(g) } }

// ----- Parallel beam ----------------------------------------------------------------

/// Parallel rays; for angle θ the rays travel along `(-sin θ, cos θ)` and the
/// detector axis is `(cos θ, sin θ)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParallelGeometry2D {
    detector_count: usize,
    detector_width: Lengthf32,
    angles: Vec<Anglef32>,
    extra_detector_offsets: Option<Vec<Lengthf32>>,
}

impl ParallelGeometry2D {

    pub fn new(detector_count: usize, detector_width: Lengthf32, angles: Vec<Anglef32>) -> Result<Self, GeometryError> {
        let detector_count = nonzero("detector count", detector_count)?;
        let detector_width = positive("detector width", detector_width)?;
        if angles.is_empty() { return Err(GeometryError::NoProjections) }
        Ok(Self { detector_count, detector_width, angles, extra_detector_offsets: None })
    }

    /// Shift the detector along its own axis, by a separate amount for each
    /// projection.
    pub fn with_detector_offsets(mut self, offsets: Vec<Lengthf32>) -> Result<Self, GeometryError> {
        if offsets.len() != self.angles.len() {
            return Err(GeometryError::OffsetCountMismatch { angles: self.angles.len(), offsets: offsets.len() })
        }
        self.extra_detector_offsets = Some(offsets);
        Ok(self)
    }

    pub fn detector_count(&self) -> usize { self.detector_count }
    pub fn detector_width(&self) -> Lengthf32 { self.detector_width }
    pub fn angles(&self) -> &[Anglef32] { &self.angles }
    pub fn extra_detector_offsets(&self) -> Option<&[Lengthf32]> { self.extra_detector_offsets.as_deref() }
}

// ----- Fan beam, flat detector -------------------------------------------------------

/// Point source rotating on a circle; at angle 0 the source sits at
/// `(0, -origin_source)` and the detector centre at `(0, origin_detector)`.
#[derive(Clone, Debug, PartialEq)]
pub struct FanFlatGeometry2D {
    detector_count: usize,
    detector_width: Lengthf32,
    angles: Vec<Anglef32>,
    origin_source: Lengthf32,
    origin_detector: Lengthf32,
}

impl FanFlatGeometry2D {

    pub fn new(
        detector_count : usize,
        detector_width : Lengthf32,
        angles         : Vec<Anglef32>,
        origin_source  : Lengthf32,
        origin_detector: Lengthf32,
    ) -> Result<Self, GeometryError> {
        let detector_count = nonzero ("detector count" , detector_count)?;
        let detector_width = positive("detector width" , detector_width)?;
        let origin_source  = positive("source distance", origin_source )?;
        // The detector may pass through the origin, but not sit behind the source
        if !(origin_detector >= 0.0 && origin_detector.is_finite()) {
            return Err(GeometryError::NonPositive { what: "detector distance", value: origin_detector })
        }
        if angles.is_empty() { return Err(GeometryError::NoProjections) }
        Ok(Self { detector_count, detector_width, angles, origin_source, origin_detector })
    }

    pub fn detector_count (&self) -> usize       { self.detector_count  }
    pub fn detector_width (&self) -> Lengthf32   { self.detector_width  }
    pub fn angles         (&self) -> &[Anglef32] { &self.angles         }
    pub fn origin_source  (&self) -> Lengthf32   { self.origin_source   }
    pub fn origin_detector(&self) -> Lengthf32   { self.origin_detector }

    /// The same acquisition expressed as explicit per-projection vectors
    pub fn to_vec_geometry(&self) -> FanFlatVecGeometry2D {
        let vectors = self.angles.iter().map(|&angle| {
            let rotate = |v: Vector2| nalgebra::Rotation2::new(angle) * v;
            FanVector {
                source         : rotate(Vector2::new(0.0, -self.origin_source)),
                detector_centre: rotate(Vector2::new(0.0,  self.origin_detector)),
                detector_step  : rotate(Vector2::new(self.detector_width, 0.0)),
            }
        }).collect();
        FanFlatVecGeometry2D { detector_count: self.detector_count, vectors }
    }
}

// ----- Fan beam, arbitrary per-projection vectors -----------------------------------

/// Source position, detector centre and the vector from one detector pixel
/// to the next, all in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FanVector {
    pub source: Vector2,
    pub detector_centre: Vector2,
    pub detector_step: Vector2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FanFlatVecGeometry2D {
    detector_count: usize,
    vectors: Vec<FanVector>,
}

impl FanFlatVecGeometry2D {

    pub fn new(detector_count: usize, vectors: Vec<FanVector>) -> Result<Self, GeometryError> {
        let detector_count = nonzero("detector count", detector_count)?;
        if vectors.is_empty() { return Err(GeometryError::NoProjections) }
        for v in &vectors {
            positive("detector step", v.detector_step.norm())?;
        }
        Ok(Self { detector_count, vectors })
    }

    pub fn detector_count(&self) -> usize { self.detector_count }
    pub fn vectors(&self) -> &[FanVector] { &self.vectors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use std::f32::consts::FRAC_PI_2;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn fan() -> FanFlatGeometry2D {
        FanFlatGeometry2D::new(8, 0.5, vec![0.0, FRAC_PI_2], 100.0, 50.0).unwrap()
    }

    proptest::proptest! {
        #[test]
        fn vector_form_preserves_distances(
            angle in -7.0 .. (7.0 as Anglef32),
            dso   in  1.0 .. (500.0 as Lengthf32),
            dod   in  0.0 .. (500.0 as Lengthf32),
            width in  0.1 .. (  2.0 as Lengthf32),
        ) {
            let fan = FanFlatGeometry2D::new(4, width, vec![angle], dso, dod).unwrap();
            let v = fan.to_vec_geometry().vectors()[0];
            assert_float_eq!(v.source.norm(), dso, rmax <= 1e-5);
            assert_float_eq!(v.detector_centre.norm(), dod, abs <= 1e-3);
            assert_float_eq!(v.detector_step.norm(), width, rmax <= 1e-5);
            // The detector stays perpendicular to the central ray
            assert_float_eq!(v.detector_step.dot(&v.source), 0.0, abs <= 1e-2);
        }
    }

    #[test]
    fn fan_vectors_at_zero_angle() {
        let v = fan().to_vec_geometry();
        let first = v.vectors()[0];
        assert_eq!(first.source, Vector2::new(0.0, -100.0));
        assert_eq!(first.detector_centre, Vector2::new(0.0, 50.0));
        assert_eq!(first.detector_step, Vector2::new(0.5, 0.0));
    }

    #[test]
    fn fan_vectors_rotate_anticlockwise() {
        let v = fan().to_vec_geometry();
        let quarter = v.vectors()[1];
        assert_float_eq!([quarter.source.x, quarter.source.y], [100.0, 0.0], abs_all <= 1e-4);
        assert_float_eq!([quarter.detector_step.x, quarter.detector_step.y], [0.0, 0.5], abs_all <= 1e-6);
    }

    #[test]
    fn enum_reports_shape() {
        let g: ProjectionGeometry2D = fan().into();
        assert_eq!(g.shape(), (2, 8));
        assert_eq!(g.kind(), "fanflat");
        let g: ProjectionGeometry2D = fan().to_vec_geometry().into();
        assert_eq!(g.shape(), (2, 8));
        assert_eq!(g.kind(), "fanflat_vec");
    }

    #[test]
    fn parallel_offsets_must_match_angles() {
        let g = ParallelGeometry2D::new(4, 1.0, vec![0.0, 1.0, 2.0]).unwrap();
        assert_eq!(g.clone().with_detector_offsets(vec![0.0]),
                   Err(GeometryError::OffsetCountMismatch { angles: 3, offsets: 1 }));
        let g = g.with_detector_offsets(vec![0.0, 0.5, 1.0]).unwrap();
        assert_eq!(g.extra_detector_offsets(), Some([0.0, 0.5, 1.0].as_slice()));
    }

    #[test]
    fn reject_geometry_without_projections() {
        assert_eq!(ParallelGeometry2D::new(4, 1.0, vec![]), Err(GeometryError::NoProjections));
        assert_eq!(FanFlatVecGeometry2D::new(4, vec![]), Err(GeometryError::NoProjections));
    }

    #[test]
    fn reject_detector_behind_origin() {
        let e = FanFlatGeometry2D::new(4, 1.0, vec![0.0], 10.0, -1.0).unwrap_err();
        assert_eq!(e, GeometryError::NonPositive { what: "detector distance", value: -1.0 });
    }
}
