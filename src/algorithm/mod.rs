//! Algorithms: validated bundles of data references and tuning parameters,
//! which dispatch their work to a `Backend`.
//!
//! Every algorithm goes through the same lifecycle:
//!
//! ```text
//! Uninitialized --initialize--> Initialized --check--> Ready --run--> Ready
//!       ^                                        |
//!       +------------- failed validation --------+
//! ```
//!
//! Initializing an algorithm that already holds references first discards
//! them, along with all scalar settings.

mod fdk;
mod forward_projection;

pub use fdk::Fdk;
pub use forward_projection::ForwardProjection;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use crate::backend::Backend;
use crate::config::AlgorithmConfig;
use crate::data::{Data, DataGeometry};
use crate::error::{Error, Result};
use crate::manager::{Handle, Manager, Managers};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    /// References and settings stored, not yet validated
    Initialized,
    Ready,
}

/// Value returned by introspection
#[derive(Clone, Debug, PartialEq)]
pub enum Info {
    Int(i64),
    Bool(bool),
    Text(String),
    /// Registry id of a referenced object
    Id(u32),
    /// The referenced object is not (or no longer) in the registry
    NotInManager,
    /// No such key
    Unknown,
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Info::Int (n)      => write!(f, "{n}"),
            Info::Bool(b)      => write!(f, "{b}"),
            Info::Text(s)      => write!(f, "{s}"),
            Info::Id  (id)     => write!(f, "{id}"),
            Info::NotInManager => write!(f, "not in manager"),
            Info::Unknown      => write!(f, "unknown"),
        }
    }
}

pub trait Algorithm: Send {

    /// Name under which the algorithm is registered, and which appears in its
    /// error messages
    fn name(&self) -> &'static str;

    /// Resolve the references in `config` through `managers`, store the
    /// settings and validate the result.
    fn initialize(&mut self, config: &AlgorithmConfig, managers: &Managers) -> Result<()>;

    /// Perform the work. Non-iterative algorithms ignore `iterations`.
    fn run(&mut self, iterations: usize, backend: &dyn Backend) -> Result<()>;

    /// Keys understood by `info`
    fn info_keys(&self) -> &'static [&'static str];

    fn info(&self, key: &str, managers: &Managers) -> Info;

    fn information(&self, managers: &Managers) -> BTreeMap<&'static str, Info> {
        self.info_keys().iter()
            .map(|&key| (key, self.info(key, managers)))
            .collect()
    }

    /// Drop all references and return to default settings
    fn clear(&mut self);

    fn lifecycle(&self) -> Lifecycle;

    fn is_initialized(&self) -> bool { self.lifecycle() == Lifecycle::Ready }
}

/// A fresh, uninitialized algorithm of the given type
pub fn create(kind: &str) -> Option<Box<dyn Algorithm>> {
    match kind {
        "FP"  => Some(Box::<ForwardProjection>::default()),
        "FDK" => Some(Box::<Fdk>::default()),
        _     => None,
    }
}

/// Create the algorithm named by `config.kind` and initialize it from `config`
pub fn from_config(config: &AlgorithmConfig, managers: &Managers) -> Result<Box<dyn Algorithm>> {
    let mut algorithm = create(&config.kind)
        .ok_or_else(|| Error::config("algorithm", format!("Unknown algorithm type `{}`.", config.kind)))?;
    algorithm.initialize(config, managers)?;
    Ok(algorithm)
}

/// Registry id of `handle`, as introspection reports it
fn registered<T>(manager: &Manager<T>, handle: Option<&Handle<T>>) -> Info {
    handle
        .and_then(|h| manager.index_of(h))
        .map_or(Info::NotInManager, Info::Id)
}

/// Summary of the geometry attached to `handle`'s data, if any
fn describe<G: DataGeometry>(handle: Option<&Handle<Data<G>>>, summary: impl Fn(&G) -> String) -> Info {
    let described = handle
        .and_then(|h| h.read().ok())
        .and_then(|data| data.geometry().map(&summary));
    Info::Text(described.unwrap_or_else(|| "none".into()))
}

fn read<'a, T>(handle: &'a Handle<T>, what: &'static str) -> Result<RwLockReadGuard<'a, T>> {
    handle.read().map_err(|_| Error::Poisoned(what))
}

fn write<'a, T>(handle: &'a Handle<T>, what: &'static str) -> Result<RwLockWriteGuard<'a, T>> {
    handle.write().map_err(|_| Error::Poisoned(what))
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[rstest(/**/ kind , name,
             case("FP" , Some("FP")),
             case("FDK", Some("FDK")),
             case("SIRT", None),
    )]
    fn factory(kind: &str, name: Option<&str>) {
        let algorithm = create(kind);
        assert_eq!(algorithm.as_ref().map(|a| a.name()), name);
        if let Some(a) = algorithm {
            assert_eq!(a.lifecycle(), Lifecycle::Uninitialized);
            assert!(!a.is_initialized());
        }
    }

    #[test]
    fn unknown_type_is_a_config_error() {
        let config = AlgorithmConfig { kind: "ART".into(), ..AlgorithmConfig::default() };
        let err = from_config(&config, &Managers::new()).err().unwrap();
        assert!(matches!(err, Error::Config { algorithm: "algorithm", .. }));
    }

    #[test]
    fn info_display() {
        assert_eq!(Info::NotInManager.to_string(), "not in manager");
        assert_eq!(Info::Int(-1).to_string(), "-1");
        assert_eq!(Info::Id(3).to_string(), "3");
    }
}
