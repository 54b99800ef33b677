//! Geometry-bearing `f32` buffers: the volumes and projections that algorithms
//! read from and write to.
//!
//! A data object is *initialized* once it carries a geometry and a buffer whose
//! shape matches that geometry. `Default` gives an uninitialized object.

use ndarray::{Array, ArrayView, ArrayViewMut, Dimension, Ix2, Ix3};
use thiserror::Error;

use geometry::{ProjectionGeometry2D, ProjectionGeometry3D, VolumeGeometry2D, VolumeGeometry3D};
use units::todo::Intensityf32;

/// Geometries that determine the shape of a data buffer
pub trait DataGeometry: Clone {
    type Dim: Dimension;
    fn dim(&self) -> Self::Dim;
}

impl DataGeometry for VolumeGeometry2D {
    type Dim = Ix2;
    fn dim(&self) -> Ix2 { let (rows, cols) = self.shape(); Ix2(rows, cols) }
}

impl DataGeometry for ProjectionGeometry2D {
    type Dim = Ix2;
    fn dim(&self) -> Ix2 { let (angles, dets) = self.shape(); Ix2(angles, dets) }
}

impl DataGeometry for VolumeGeometry3D {
    type Dim = Ix3;
    fn dim(&self) -> Ix3 { let (slices, rows, cols) = self.shape(); Ix3(slices, rows, cols) }
}

impl DataGeometry for ProjectionGeometry3D {
    type Dim = Ix3;
    fn dim(&self) -> Ix3 { let (angles, rows, cols) = self.shape(); Ix3(angles, rows, cols) }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("buffer of shape {found:?} does not match geometry shape {expected:?}")]
pub struct ShapeMismatch {
    pub expected: Vec<usize>,
    pub found: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct Data<G: DataGeometry> {
    geometry: Option<G>,
    data: Array<Intensityf32, G::Dim>,
}

pub type VolumeData2D     = Data<VolumeGeometry2D>;
pub type ProjectionData2D = Data<ProjectionGeometry2D>;
pub type VolumeData3D     = Data<VolumeGeometry3D>;
pub type ProjectionData3D = Data<ProjectionGeometry3D>;

impl<G: DataGeometry> Default for Data<G> {
    fn default() -> Self {
        Self { geometry: None, data: Array::zeros(G::Dim::default()) }
    }
}

impl<G: DataGeometry> Data<G> {

    /// Zero-filled buffer matching `geometry`
    pub fn new(geometry: G) -> Self {
        let data = Array::zeros(geometry.dim());
        Self { geometry: Some(geometry), data }
    }

    pub fn filled(geometry: G, value: Intensityf32) -> Self {
        let data = Array::from_elem(geometry.dim(), value);
        Self { geometry: Some(geometry), data }
    }

    pub fn from_array(geometry: G, data: Array<Intensityf32, G::Dim>) -> Result<Self, ShapeMismatch> {
        let expected = geometry.dim();
        if data.raw_dim() != expected {
            return Err(ShapeMismatch { expected: expected.slice().to_vec(), found: data.shape().to_vec() })
        }
        Ok(Self { geometry: Some(geometry), data })
    }

    /// (Re)attach a geometry, discarding any previous contents
    pub fn initialize(&mut self, geometry: G) {
        *self = Self::new(geometry);
    }

    pub fn is_initialized(&self) -> bool {
        self.geometry.as_ref().map_or(false, |g| g.dim() == self.data.raw_dim())
    }

    pub fn geometry(&self) -> Option<&G> { self.geometry.as_ref() }

    pub fn view    (&    self) -> ArrayView   <'_, Intensityf32, G::Dim> { self.data.view    () }
    pub fn view_mut(&mut self) -> ArrayViewMut<'_, Intensityf32, G::Dim> { self.data.view_mut() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::{ParallelGeometry2D, Detector, ConeGeometry3D};
    use ndarray::Array2;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn default_is_uninitialized() {
        let v = VolumeData2D::default();
        assert!(!v.is_initialized());
        assert!(v.geometry().is_none());
        assert!(!ProjectionData3D::default().is_initialized());
    }

    #[test]
    fn new_matches_geometry() {
        let g = VolumeGeometry2D::new(5, 3).unwrap();
        let v = VolumeData2D::new(g);
        assert!(v.is_initialized());
        assert_eq!(v.view().shape(), &[3, 5]);
    }

    #[test]
    fn sinogram_layout_is_angles_by_detectors() {
        let g = ParallelGeometry2D::new(7, 1.0, vec![0.0, 1.0]).unwrap();
        let s = ProjectionData2D::filled(g.into(), 2.0);
        assert_eq!(s.view().shape(), &[2, 7]);
        assert!(s.view().iter().all(|&x| x == 2.0));
    }

    #[test]
    fn from_array_checks_shape() {
        let g = VolumeGeometry2D::new(4, 4).unwrap();
        let err = VolumeData2D::from_array(g.clone(), Array2::zeros((4, 3))).unwrap_err();
        assert_eq!(err, ShapeMismatch { expected: vec![4, 4], found: vec![4, 3] });
        assert!(VolumeData2D::from_array(g, Array2::zeros((4, 4))).is_ok());
    }

    #[test]
    fn initialize_replaces_contents() {
        let d = Detector { cols: 3, rows: 2, spacing_x: 1.0, spacing_y: 1.0 };
        let cone = ConeGeometry3D::new(d, vec![0.0], 10.0, 10.0).unwrap();
        let mut p = ProjectionData3D::default();
        p.initialize(cone.into());
        assert!(p.is_initialized());
        assert_eq!(p.view().shape(), &[1, 2, 3]);
    }
}
