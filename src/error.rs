//! Error types shared by the algorithms.
//!
//! Three classes are kept apart: configuration errors (the caller can fix the
//! configuration and try again), precondition violations (the algorithm was
//! used out of order), and backend failures (the numeric backend or its device
//! could not do the work).

use thiserror::Error;

use crate::backend::{BackendError, ConversionError};

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected during initialization or validation
    #[error("{algorithm}: {reason}")]
    Config { algorithm: &'static str, reason: String },

    #[error("{0}: run called before successful initialization")]
    NotInitialized(&'static str),

    /// The geometry cannot be expressed in the form the backend consumes
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A data object's lock was poisoned by a panic in another user
    #[error("{0} is poisoned")]
    Poisoned(&'static str),
}

impl Error {
    pub(crate) fn config(algorithm: &'static str, reason: impl Into<String>) -> Self {
        Self::Config { algorithm, reason: reason.into() }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Early return with a configuration error unless `$cond` holds
macro_rules! config_check {
    ($cond:expr, $algorithm:expr, $reason:expr) => {
        if !$cond { return Err($crate::error::Error::config($algorithm, $reason)) }
    };
}
pub(crate) use config_check;
