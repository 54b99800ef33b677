use thiserror::Error;

/// Reasons for refusing to construct a geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("{what} must be at least 1")]
    ZeroCount { what: &'static str },

    #[error("{what} must be positive and finite, got {value}")]
    NonPositive { what: &'static str, value: f32 },

    #[error("empty window along {axis}: [{min}, {max}]")]
    EmptyWindow { axis: char, min: f32, max: f32 },

    #[error("{offsets} detector offsets given for {angles} projection angles")]
    OffsetCountMismatch { angles: usize, offsets: usize },

    #[error("geometry needs at least one projection")]
    NoProjections,
}
