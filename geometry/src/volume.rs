use crate::{GeometryError, Vector2, Vector3, nonzero, positive};
use units::todo::Lengthf32;

/// The size and granularity of a 2-D reconstruction grid.
///
/// Pixel `(row, col)` covers `x ∈ [min_x + col·px, min_x + (col+1)·px)` and
/// `y ∈ (max_y - (row+1)·py, max_y - row·py]`: row 0 is at the top.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeGeometry2D {
    cols: usize,
    rows: usize,
    window_x: [Lengthf32; 2],
    window_y: [Lengthf32; 2],
}

impl VolumeGeometry2D {

    /// Unit pixels, window centred on the origin.
    pub fn new(cols: usize, rows: usize) -> Result<Self, GeometryError> {
        Self::with_pixel_size(cols, rows, 1.0)
    }

    /// Square pixels of side `pixel`, window centred on the origin.
    pub fn with_pixel_size(cols: usize, rows: usize, pixel: Lengthf32) -> Result<Self, GeometryError> {
        let pixel = positive("pixel size", pixel)?;
        let half_x = cols as Lengthf32 * pixel / 2.0;
        let half_y = rows as Lengthf32 * pixel / 2.0;
        Self::with_window(cols, rows, [-half_x, half_x], [-half_y, half_y])
    }

    pub fn with_window(
        cols: usize,
        rows: usize,
        window_x: [Lengthf32; 2],
        window_y: [Lengthf32; 2],
    ) -> Result<Self, GeometryError> {
        let cols = nonzero("volume columns", cols)?;
        let rows = nonzero("volume rows"   , rows)?;
        check_window('x', window_x)?;
        check_window('y', window_y)?;
        Ok(Self { cols, rows, window_x, window_y })
    }

    pub fn cols(&self) -> usize { self.cols }
    pub fn rows(&self) -> usize { self.rows }

    /// `(rows, cols)`, the shape of a matching `ndarray` buffer
    pub fn shape(&self) -> (usize, usize) { (self.rows, self.cols) }

    pub fn window_min_x(&self) -> Lengthf32 { self.window_x[0] }
    pub fn window_max_x(&self) -> Lengthf32 { self.window_x[1] }
    pub fn window_min_y(&self) -> Lengthf32 { self.window_y[0] }
    pub fn window_max_y(&self) -> Lengthf32 { self.window_y[1] }

    pub fn pixel_length_x(&self) -> Lengthf32 { (self.window_x[1] - self.window_x[0]) / self.cols as Lengthf32 }
    pub fn pixel_length_y(&self) -> Lengthf32 { (self.window_y[1] - self.window_y[0]) / self.rows as Lengthf32 }

    /// Centre of the window in world coordinates
    pub fn centre(&self) -> Vector2 {
        Vector2::new((self.window_x[0] + self.window_x[1]) / 2.0,
                     (self.window_y[0] + self.window_y[1]) / 2.0)
    }

    /// World position of the centre of pixel `(row, col)`
    pub fn pixel_centre(&self, row: usize, col: usize) -> Vector2 {
        Vector2::new(self.window_x[0] + (col as Lengthf32 + 0.5) * self.pixel_length_x(),
                     self.window_y[1] - (row as Lengthf32 + 0.5) * self.pixel_length_y())
    }
}

/// The size and granularity of a 3-D reconstruction grid.
///
/// Slice 0 is at `min_z`; within a slice the layout is that of
/// `VolumeGeometry2D`.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeGeometry3D {
    cols: usize,
    rows: usize,
    slices: usize,
    window_x: [Lengthf32; 2],
    window_y: [Lengthf32; 2],
    window_z: [Lengthf32; 2],
}

impl VolumeGeometry3D {

    pub fn new(cols: usize, rows: usize, slices: usize) -> Result<Self, GeometryError> {
        Self::with_voxel_size(cols, rows, slices, 1.0)
    }

    pub fn with_voxel_size(cols: usize, rows: usize, slices: usize, voxel: Lengthf32) -> Result<Self, GeometryError> {
        let voxel = positive("voxel size", voxel)?;
        let half = |n: usize| n as Lengthf32 * voxel / 2.0;
        let (hx, hy, hz) = (half(cols), half(rows), half(slices));
        Self::with_window(cols, rows, slices, [-hx, hx], [-hy, hy], [-hz, hz])
    }

    pub fn with_window(
        cols: usize,
        rows: usize,
        slices: usize,
        window_x: [Lengthf32; 2],
        window_y: [Lengthf32; 2],
        window_z: [Lengthf32; 2],
    ) -> Result<Self, GeometryError> {
        let cols   = nonzero("volume columns", cols  )?;
        let rows   = nonzero("volume rows"   , rows  )?;
        let slices = nonzero("volume slices" , slices)?;
        check_window('x', window_x)?;
        check_window('y', window_y)?;
        check_window('z', window_z)?;
        Ok(Self { cols, rows, slices, window_x, window_y, window_z })
    }

    pub fn cols  (&self) -> usize { self.cols   }
    pub fn rows  (&self) -> usize { self.rows   }
    pub fn slices(&self) -> usize { self.slices }

    /// `(slices, rows, cols)`, the shape of a matching `ndarray` buffer
    pub fn shape(&self) -> (usize, usize, usize) { (self.slices, self.rows, self.cols) }

    pub fn voxel_length_x(&self) -> Lengthf32 { (self.window_x[1] - self.window_x[0]) / self.cols   as Lengthf32 }
    pub fn voxel_length_y(&self) -> Lengthf32 { (self.window_y[1] - self.window_y[0]) / self.rows   as Lengthf32 }
    pub fn voxel_length_z(&self) -> Lengthf32 { (self.window_z[1] - self.window_z[0]) / self.slices as Lengthf32 }

    pub fn centre(&self) -> Vector3 {
        let mid = |[lo, hi]: [Lengthf32; 2]| (lo + hi) / 2.0;
        Vector3::new(mid(self.window_x), mid(self.window_y), mid(self.window_z))
    }
}

fn check_window(axis: char, [min, max]: [Lengthf32; 2]) -> Result<(), GeometryError> {
    if min < max && min.is_finite() && max.is_finite() { Ok(()) }
    else { Err(GeometryError::EmptyWindow { axis, min, max }) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use float_eq::assert_float_eq;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[rstest(/**/ cols, rows, pixel,
             case(   1,    1,  1.0),
             case(  64,   32,  0.5),
             case(   3,  100,  2.5),
    )]
    fn centred_pixel_lengths(cols: usize, rows: usize, pixel: f32) {
        let g = VolumeGeometry2D::with_pixel_size(cols, rows, pixel).unwrap();
        assert_float_eq!(g.pixel_length_x(), pixel, r2nd <= 1e-6);
        assert_float_eq!(g.pixel_length_y(), pixel, r2nd <= 1e-6);
        assert_float_eq!(g.centre().norm(), 0.0, abs <= 1e-6);
        assert_eq!(g.shape(), (rows, cols));
    }

    #[test]
    fn pixel_centres_put_row_zero_at_top() {
        let g = VolumeGeometry2D::new(4, 2).unwrap();
        assert_eq!(g.pixel_centre(0, 0), Vector2::new(-1.5,  0.5));
        assert_eq!(g.pixel_centre(1, 3), Vector2::new( 1.5, -0.5));
    }

    #[test]
    fn off_centre_window() {
        let g = VolumeGeometry2D::with_window(10, 10, [0.0, 20.0], [-5.0, 5.0]).unwrap();
        assert_eq!(g.centre(), Vector2::new(10.0, 0.0));
        assert_eq!(g.pixel_length_x(), 2.0);
        assert_eq!(g.pixel_length_y(), 1.0);
    }

    #[rstest(/**/ cols, rows, expected,
             case(0, 1, GeometryError::ZeroCount { what: "volume columns" }),
             case(1, 0, GeometryError::ZeroCount { what: "volume rows" }),
    )]
    fn reject_empty_grid(cols: usize, rows: usize, expected: GeometryError) {
        assert_eq!(VolumeGeometry2D::new(cols, rows), Err(expected));
    }

    #[test]
    fn reject_inverted_window() {
        let e = VolumeGeometry2D::with_window(2, 2, [1.0, -1.0], [0.0, 1.0]).unwrap_err();
        assert_eq!(e, GeometryError::EmptyWindow { axis: 'x', min: 1.0, max: -1.0 });
    }

    #[test]
    fn volume_3d_shape_and_voxels() {
        let g = VolumeGeometry3D::with_voxel_size(8, 6, 4, 0.25).unwrap();
        assert_eq!(g.shape(), (4, 6, 8));
        assert_eq!(g.voxel_length_x(), 0.25);
        assert_eq!(g.voxel_length_y(), 0.25);
        assert_eq!(g.voxel_length_z(), 0.25);
        assert_eq!(g.centre(), Vector3::zeros());
    }

    #[test]
    fn reject_negative_voxel() {
        assert_eq!(VolumeGeometry3D::with_voxel_size(1, 1, 1, -1.0),
                   Err(GeometryError::NonPositive { what: "voxel size", value: -1.0 }));
    }
}
