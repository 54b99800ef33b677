//! Exact line integrals through a pixel grid, by walking the ray from one
//! pixel boundary to the next (Siddon / Amanatides-Woo traversal).
//!
//! Works in the normalized frame: an image with `rows × cols` unit pixels,
//! centred on the origin, row 0 at the top.

use ndarray::ArrayView2;

use geometry::Vector2;
use units::todo::{Intensityf32, Lengthf32};

/// Everything the traversal loop needs to know about where the ray enters the
/// grid. Positions along the ray are expressed as fractions of the segment.
struct GridHit {
    /// Position of the next boundary crossing in each dimension
    next_boundary: [f32; 2],
    /// Distance between successive boundary crossings in each dimension
    boundary_step: [f32; 2],
    /// Pixel containing the entry point; `[x, y]` with `y` counted upwards
    index: [i32; 2],
    /// Direction of index change when crossing a boundary in each dimension
    delta_index: [i32; 2],
    /// Number of pixels left before leaving the grid in each dimension
    remaining: [i32; 2],
    entry: f32,
    exit: f32,
}

/// Integral of `image` along the segment `start → end`
pub fn line_integral(image: ArrayView2<Intensityf32>, start: Vector2, end: Vector2) -> Intensityf32 {
    let (rows, cols) = image.dim();
    let delta = end - start;
    let length = delta.norm();
    if length == 0.0 { return 0.0 }

    let Some(GridHit { mut next_boundary, boundary_step, mut index, delta_index, mut remaining, entry, exit })
        = grid_hit(start, delta, [cols, rows])
    else { return 0.0 };

    let mut here = entry;
    let mut sum = 0.0;
    loop {
        // Which pixel boundary will be hit next, and its position
        let dimension = if next_boundary[0] <= next_boundary[1] { 0 } else { 1 };
        let boundary_position = next_boundary[dimension].min(exit);

        // The weight is the length of the segment in this pixel
        let weight = boundary_position - here;
        if weight > 0.0 {
            let row = rows - 1 - index[1] as usize;
            let col = index[0] as usize;
            sum += weight * image[[row, col]];
        }

        // Move along the segment until it leaves this pixel
        here = boundary_position;
        if here >= exit { break }

        // Find the next boundary in this dimension
        next_boundary[dimension] += boundary_step[dimension];

        // Move index across the boundary we are crossing
        index[dimension] += delta_index[dimension];
        remaining[dimension] -= 1;

        // If we have traversed the whole grid, we're finished
        if remaining[dimension] == 0 { break }
    }
    sum * length
}

/// Clip the segment to the grid's bounding box and find the entry pixel.
/// `None` if the segment misses the grid.
fn grid_hit(start: Vector2, delta: Vector2, n: [usize; 2]) -> Option<GridHit> {
    let half = [n[0] as Lengthf32 / 2.0, n[1] as Lengthf32 / 2.0];
    let (s, d) = ([start.x, start.y], [delta.x, delta.y]);

    // Slab intersection: parameter range of the segment inside the box
    let (mut entry, mut exit) = (0.0_f32, 1.0_f32);
    for k in 0..2 {
        if d[k] == 0.0 {
            if s[k] < -half[k] || s[k] > half[k] { return None }
        } else {
            let a = (-half[k] - s[k]) / d[k];
            let b = ( half[k] - s[k]) / d[k];
            entry = entry.max(a.min(b));
            exit  = exit .min(a.max(b));
        }
    }
    if entry >= exit { return None }

    let mut next_boundary = [f32::INFINITY; 2];
    let mut boundary_step = [f32::INFINITY; 2];
    let mut index         = [0_i32; 2];
    let mut delta_index   = [0_i32; 2];
    let mut remaining     = [i32::MAX; 2];

    // Sample the midpoint of the first stretch inside the box, to avoid
    // ambiguity when the entry lies exactly on a boundary
    let probe = entry + (exit - entry) * 1e-4;
    for k in 0..2 {
        let position = s[k] + probe * d[k] + half[k];
        let i = (position.floor() as i32).clamp(0, n[k] as i32 - 1);
        index[k] = i;
        if d[k] > 0.0 {
            delta_index[k] = 1;
            remaining[k] = n[k] as i32 - i;
            next_boundary[k] = ((i + 1) as f32 - half[k] - s[k]) / d[k];
            boundary_step[k] = 1.0 / d[k];
        } else if d[k] < 0.0 {
            delta_index[k] = -1;
            remaining[k] = i + 1;
            next_boundary[k] = (i as f32 - half[k] - s[k]) / d[k];
            boundary_step[k] = -1.0 / d[k];
        }
    }
    Some(GridHit { next_boundary, boundary_step, index, delta_index, remaining, entry, exit })
}
