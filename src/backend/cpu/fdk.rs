//! Feldkamp-Davis-Kress filtered back-projection for circular cone-beam scans.
//!
//! Everything here is in voxel units. Detector coordinates are taken on the
//! virtual detector through the rotation axis, i.e. the real detector spacing
//! divided by the magnification.
//!
//! The reconstruction runs in two passes:
//!
//! 1. every projection is cosine-weighted (and Parker-weighted for short
//!    scans), ramp-filtered along detector rows and scaled by its angular step;
//!
//! 2. every voxel accumulates the filtered values at its projection on each
//!    view, weighted by the inverse square of its distance from the source.

use std::f32::consts::{FRAC_PI_4, PI};

use itertools::iproduct;
use ndarray::{Array3, ArrayView1, ArrayView2, ArrayView3, ArrayViewMut1, ArrayViewMut3, Axis};
use ndarray::parallel::prelude::*;

use units::TWOPI;
use units::todo::{Anglef32, Intensityf32, Lengthf32};

use crate::backend::ConeParams;

pub(super) fn reconstruct(
    volume       : ArrayViewMut3<Intensityf32>,
    projections  : ArrayView3<Intensityf32>,
    params       : &ConeParams,
    short_scan   : bool,
    supersampling: u32,
) {
    let detector = VirtualDetector::new(params);
    let filtered = filter_projections(projections, params, &detector, short_scan);
    backproject(volume, filtered.view(), params, &detector, supersampling);
}

/// Detector sampling projected onto the plane through the rotation axis
struct VirtualDetector {
    cols: usize,
    rows: usize,
    du: Lengthf32,
    dv: Lengthf32,
}

impl VirtualDetector {
    fn new(params: &ConeParams) -> Self {
        let d = params.origin_source;
        let magnification = (d + params.origin_detector) / d;
        Self {
            cols: params.detector_cols,
            rows: params.detector_rows,
            du: params.detector_spacing_x / magnification,
            dv: params.detector_spacing_y / magnification,
        }
    }

    fn u(&self, col: usize) -> Lengthf32 { (col as Lengthf32 + 0.5 - self.cols as Lengthf32 / 2.0) * self.du }
    fn v(&self, row: usize) -> Lengthf32 { (row as Lengthf32 + 0.5 - self.rows as Lengthf32 / 2.0) * self.dv }

    /// Fractional (row, col) index of virtual detector position `(u, v)`
    fn index(&self, u: Lengthf32, v: Lengthf32) -> (f32, f32) {
        (v / self.dv + self.rows as f32 / 2.0 - 0.5,
         u / self.du + self.cols as f32 / 2.0 - 0.5)
    }
}

fn filter_projections(
    projections: ArrayView3<Intensityf32>,
    params     : &ConeParams,
    detector   : &VirtualDetector,
    short_scan : bool,
) -> Array3<Intensityf32> {
    let d = params.origin_source;
    let kernel = ramp_kernel(detector.cols, detector.du);
    let steps = angular_steps(&params.angles);
    // A full rotation sees every ray twice; Parker weights already account
    // for the redundancy of a short scan
    let redundancy = if short_scan { 1.0 } else { 0.5 };
    let parker = short_scan.then(|| ShortScan::new(&params.angles, detector.cols as f32 / 2.0 * detector.du, d));

    let mut filtered = projections.to_owned();
    filtered
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut projection)| {
            let scale = redundancy * steps[i] * params.output_scale;
            for (row, mut line) in projection.axis_iter_mut(Axis(0)).enumerate() {
                let v = detector.v(row);
                for (col, value) in line.iter_mut().enumerate() {
                    let u = detector.u(col);
                    let mut weight = d / (d * d + u * u + v * v).sqrt();
                    if let Some(parker) = &parker { weight *= parker.weight(i, u) }
                    *value *= weight * scale;
                }
                let weighted = line.to_owned();
                convolve(weighted.view(), &kernel, detector.du, line);
            }
        });
    filtered
}

/// Ram-Lak filter sampled at spacing `tau`: `h[|n|]` for `n` in `0..len`
fn ramp_kernel(len: usize, tau: Lengthf32) -> Vec<f32> {
    (0..len)
        .map(|n| match n {
            0                => 1.0 / (4.0 * tau * tau),
            n if n % 2 == 1  => -1.0 / (PI * PI * (n * n) as f32 * tau * tau),
            _                => 0.0,
        })
        .collect()
}

/// `output = tau · (input ⊛ kernel)`, zero-padded, same length as the input
fn convolve(input: ArrayView1<f32>, kernel: &[f32], tau: Lengthf32, mut output: ArrayViewMut1<f32>) {
    for (k, out) in output.iter_mut().enumerate() {
        *out = tau * input.iter()
            .enumerate()
            .map(|(m, x)| kernel[k.abs_diff(m)] * x)
            .sum::<f32>();
    }
}

/// Angular integration weight of each projection. Ends use one-sided
/// differences; a single projection is taken to cover the whole circle.
fn angular_steps(angles: &[Anglef32]) -> Vec<Anglef32> {
    let n = angles.len();
    if n < 2 { return vec![TWOPI; n] }
    (0..n)
        .map(|i| {
            let lo = angles[i.saturating_sub(1)];
            let hi = angles[(i + 1).min(n - 1)];
            let span = if i == 0 || i == n - 1 { 1.0 } else { 2.0 };
            (hi - lo).abs() / span
        })
        .collect()
}

/// Parker weighting for scans covering π plus the fan angle
struct ShortScan {
    start: Anglef32,
    /// +1 for anticlockwise acquisition, -1 for clockwise
    direction: f32,
    half_fan: Anglef32,
    source_distance: Lengthf32,
    angles: Vec<Anglef32>,
}

impl ShortScan {
    fn new(angles: &[Anglef32], half_detector: Lengthf32, source_distance: Lengthf32) -> Self {
        let start = angles.first().copied().unwrap_or(0.0);
        let end   = angles.last ().copied().unwrap_or(0.0);
        Self {
            start,
            direction: if end < start { -1.0 } else { 1.0 },
            half_fan: (half_detector / source_distance).atan(),
            source_distance,
            angles: angles.to_vec(),
        }
    }

    fn weight(&self, projection: usize, u: Lengthf32) -> f32 {
        let beta = (self.angles[projection] - self.start).abs();
        let gamma = (u / self.source_distance).atan() * self.direction;
        parker_weight(beta, gamma, self.half_fan)
    }
}

/// Parker weight of the ray at fan angle `gamma` seen from source angle
/// `beta` (measured from the start of the scan), for half fan angle
/// `gamma_max`. The ray `(β, γ)` is also seen as `(β + π - 2γ, -γ)`; the two
/// weights sum to one.
fn parker_weight(beta: Anglef32, gamma: Anglef32, gamma_max: Anglef32) -> f32 {
    let sin2 = |x: f32| x.sin().powi(2);
    if beta < 2.0 * (gamma_max + gamma) {
        sin2(FRAC_PI_4 * beta / (gamma_max + gamma))
    } else if beta <= PI + 2.0 * gamma {
        1.0
    } else if beta <= PI + 2.0 * gamma_max {
        sin2(FRAC_PI_4 * (PI + 2.0 * gamma_max - beta) / (gamma_max - gamma))
    } else {
        0.0
    }
}

fn backproject(
    mut volume   : ArrayViewMut3<Intensityf32>,
    filtered     : ArrayView3<Intensityf32>,
    params       : &ConeParams,
    detector     : &VirtualDetector,
    supersampling: u32,
) {
    let (slices, rows, cols) = volume.dim();
    let d = params.origin_source;
    let [cx, cy, cz] = params.volume_centre;
    let trig: Vec<(f32, f32)> = params.angles.iter().map(|a| a.sin_cos()).collect();
    let n = supersampling as f32;
    let sub: Vec<f32> = (0..supersampling).map(|k| (k as f32 + 0.5) / n - 0.5).collect();
    let samples = n * n * n;

    volume
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(k, mut slice)| {
            let z0 = k as f32 + 0.5 - slices as f32 / 2.0 + cz;
            for ((r, c), value) in slice.indexed_iter_mut() {
                let x0 = c as f32 + 0.5 - cols as f32 / 2.0 + cx;
                let y0 = rows as f32 / 2.0 - r as f32 - 0.5 + cy;
                let mut total = 0.0;
                for (&(s, co), projection) in trig.iter().zip(filtered.axis_iter(Axis(0))) {
                    for (&dz, &dy, &dx) in iproduct!(&sub, &sub, &sub) {
                        let (x, y, z) = (x0 + dx, y0 + dy, z0 + dz);
                        // Distance from the source along the central ray
                        let l = d - x * s + y * co;
                        if l <= 0.0 { continue }
                        let ratio = d / l;
                        let u = (x * co + y * s) * ratio;
                        let v = z * ratio;
                        let (row, col) = detector.index(u, v);
                        total += ratio * ratio * bilinear(&projection, row, col);
                    }
                }
                *value = total / samples;
            }
        });
}

/// Bilinear interpolation of `image` at fractional `(row, col)`, treating
/// everything outside the image as zero
fn bilinear(image: &ArrayView2<f32>, row: f32, col: f32) -> f32 {
    let (rows, cols) = image.dim();
    let (r0, c0) = (row.floor(), col.floor());
    let (fr, fc) = (row - r0, col - c0);
    let (r0, c0) = (r0 as isize, c0 as isize);
    let at = |r: isize, c: isize| {
        if r < 0 || c < 0 || r >= rows as isize || c >= cols as isize { 0.0 }
        else { image[[r as usize, c as usize]] }
    };
    (1.0 - fr) * ((1.0 - fc) * at(r0    , c0) + fc * at(r0    , c0 + 1)) +
           fr  * ((1.0 - fc) * at(r0 + 1, c0) + fc * at(r0 + 1, c0 + 1))
}
