//! Geometry dispatch for tomographic projection and reconstruction.
//!
//! Algorithms (`algorithm::ForwardProjection`, `algorithm::Fdk`) hold
//! references to registered data objects, validate that their geometries fit,
//! lower those geometries into the flat parameter sets of the `Backend` trait
//! and hand over the numerical work.

pub mod algorithm;
pub mod backend;
pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod manager;
pub mod phantom;
pub mod projector;
pub mod utils;

pub use algorithm::{Algorithm, Fdk, ForwardProjection, Info, Lifecycle};
pub use backend::{Backend, BackendError, CpuBackend, Device};
pub use error::{Error, Result};
pub use manager::{DataId, Handle, Managers, ProjectorId};
