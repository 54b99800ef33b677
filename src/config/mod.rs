//! TOML configuration: algorithm settings and scene descriptions

pub mod algorithm;
pub mod scene;

pub use algorithm::{AlgorithmConfig, Options};
pub use scene::{Scene, SceneGeometry, read_scene_file};

use std::path::PathBuf;

use thiserror::Error;

use geometry::GeometryError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("couldn't read config file `{}`: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
