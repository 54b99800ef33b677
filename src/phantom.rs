//! Synthetic test objects: a rasterized 2-D Shepp-Logan head and analytic
//! cone-beam projections of a uniform ball.

use ndarray::Array3;

use geometry::{ConeGeometry3D, Vector2, VolumeGeometry2D};
use units::todo::{Intensityf32, Lengthf32};

use crate::data::VolumeData2D;

/// An ellipse in coordinates normalized to `[-1, 1]` across the window
struct Ellipse {
    intensity: Intensityf32,
    semi_axes: [Lengthf32; 2],
    centre   : [Lengthf32; 2],
    /// Rotation in degrees, anticlockwise
    tilt     : f32,
}

impl Ellipse {
    const fn new(intensity: f32, a: f32, b: f32, x: f32, y: f32, tilt: f32) -> Self {
        Self { intensity, semi_axes: [a, b], centre: [x, y], tilt }
    }

    fn contains(&self, p: Vector2) -> bool {
        let (s, c) = self.tilt.to_radians().sin_cos();
        let (dx, dy) = (p.x - self.centre[0], p.y - self.centre[1]);
        let u = ( dx * c + dy * s) / self.semi_axes[0];
        let v = (-dx * s + dy * c) / self.semi_axes[1];
        u * u + v * v <= 1.0
    }
}

/// Shepp-Logan with the contrast raised so that the inner structures are
/// visible without windowing
const MODIFIED_SHEPP_LOGAN: [Ellipse; 10] = [
    Ellipse::new( 1.0, 0.6900, 0.9200,  0.00,  0.0000,   0.0),
    Ellipse::new(-0.8, 0.6624, 0.8740,  0.00, -0.0184,   0.0),
    Ellipse::new(-0.2, 0.1100, 0.3100,  0.22,  0.0000, -18.0),
    Ellipse::new(-0.2, 0.1600, 0.4100, -0.22,  0.0000,  18.0),
    Ellipse::new( 0.1, 0.2100, 0.2500,  0.00,  0.3500,   0.0),
    Ellipse::new( 0.1, 0.0460, 0.0460,  0.00,  0.1000,   0.0),
    Ellipse::new( 0.1, 0.0460, 0.0460,  0.00, -0.1000,   0.0),
    Ellipse::new( 0.1, 0.0460, 0.0230, -0.08, -0.6050,   0.0),
    Ellipse::new( 0.1, 0.0230, 0.0230,  0.00, -0.6060,   0.0),
    Ellipse::new( 0.1, 0.0230, 0.0460,  0.06, -0.6050,   0.0),
];

/// Modified Shepp-Logan phantom filling the volume window, sampled at pixel
/// centres
pub fn shepp_logan_2d(geometry: &VolumeGeometry2D) -> VolumeData2D {
    let centre = geometry.centre();
    let half_x = (geometry.window_max_x() - geometry.window_min_x()) / 2.0;
    let half_y = (geometry.window_max_y() - geometry.window_min_y()) / 2.0;
    let mut data = VolumeData2D::new(geometry.clone());
    for ((row, col), value) in data.view_mut().indexed_iter_mut() {
        let p = geometry.pixel_centre(row, col) - centre;
        let p = Vector2::new(p.x / half_x, p.y / half_y);
        *value = MODIFIED_SHEPP_LOGAN.iter()
            .filter(|e| e.contains(p))
            .map(|e| e.intensity)
            .sum();
    }
    data
}

/// Exact line integrals through a ball of unit attenuation and given `radius`
/// centred on the origin, for every detector pixel of `geometry`. Shape is
/// `(angles, detector rows, detector cols)`.
pub fn ball_projections(geometry: &ConeGeometry3D, radius: Lengthf32) -> Array3<Intensityf32> {
    let shape = (geometry.projection_count(), geometry.detector_rows(), geometry.detector_cols());
    Array3::from_shape_fn(shape, |(i, row, col)| {
        let source = geometry.source(i);
        let direction = (geometry.detector_pixel(i, row, col) - source).normalize();
        // Closest approach of the ray to the centre of the ball
        let closest = source - direction * source.dot(&direction);
        let squared = radius * radius - closest.norm_squared();
        if squared > 0.0 { 2.0 * squared.sqrt() } else { 0.0 }
    })
}
