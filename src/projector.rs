//! Projector descriptions.
//!
//! The algorithms here always hand the numeric work to a `Backend`, so a
//! projector does not influence the result. A configuration may still name
//! one, and naming one that is not meant for the GPU backend is worth a
//! warning.

use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectorKind {
    /// Work is done by the GPU backend
    Gpu,
    /// CPU ray-driven line integral
    Line,
    /// CPU strip (area) integral
    Strip,
    /// CPU linear interpolation along the ray
    Linear,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Projector2D { pub kind: ProjectorKind }

#[derive(Clone, Debug, PartialEq)]
pub struct Projector3D { pub kind: ProjectorKind }

impl Projector2D {
    pub fn new(kind: ProjectorKind) -> Self { Self { kind } }
    pub fn is_gpu(&self) -> bool { self.kind == ProjectorKind::Gpu }
}

impl Projector3D {
    pub fn new(kind: ProjectorKind) -> Self { Self { kind } }
    pub fn is_gpu(&self) -> bool { self.kind == ProjectorKind::Gpu }
}
