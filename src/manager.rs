//! Registry of shared data objects and projectors, addressed by integer ids.
//!
//! Objects are shared through `Handle`s. The registry hands out ids starting
//! at 1; reverse lookup of a handle that was never registered (or has been
//! removed) yields `None`, which introspection reports as `Info::NotInManager`.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::Deserialize;

use crate::data::{ProjectionData2D, ProjectionData3D, VolumeData2D, VolumeData3D};
use crate::projector::{Projector2D, Projector3D};

/// Shared, lockable reference to a registered object
pub type Handle<T> = Arc<RwLock<T>>;

pub fn handle<T>(value: T) -> Handle<T> { Arc::new(RwLock::new(value)) }

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct DataId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct ProjectorId(pub u32);

impl std::fmt::Display for DataId      { fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) } }
impl std::fmt::Display for ProjectorId { fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) } }

/// Id-addressed store of handles of a single type
#[derive(Debug)]
pub struct Manager<T> {
    objects: BTreeMap<u32, Handle<T>>,
}

impl<T> Default for Manager<T> {
    fn default() -> Self { Self { objects: BTreeMap::new() } }
}

impl<T> Manager<T> {

    pub fn get(&self, id: u32) -> Option<Handle<T>> {
        self.objects.get(&id).cloned()
    }

    /// Id under which this very object (not an equal one) is stored
    pub fn index_of(&self, handle: &Handle<T>) -> Option<u32> {
        self.objects.iter()
            .find(|(_, h)| Arc::ptr_eq(h, handle))
            .map(|(&id, _)| id)
    }

    pub fn len(&self) -> usize { self.objects.len() }
    pub fn is_empty(&self) -> bool { self.objects.is_empty() }

    fn insert(&mut self, id: u32, handle: Handle<T>) { self.objects.insert(id, handle); }
    fn remove(&mut self, id: u32) -> Option<Handle<T>> { self.objects.remove(&id) }
}

/// All the registries an algorithm may resolve references through.
///
/// 2-D and 3-D data live in separate id spaces; within each, volumes and
/// projections share one counter, so an id names at most one object and
/// looking it up as the wrong kind of data fails.
#[derive(Debug)]
pub struct Managers {
    pub volumes2d    : Manager<VolumeData2D>,
    pub projections2d: Manager<ProjectionData2D>,
    pub volumes3d    : Manager<VolumeData3D>,
    pub projections3d: Manager<ProjectionData3D>,
    pub projectors2d : Manager<Projector2D>,
    pub projectors3d : Manager<Projector3D>,
    next_data2d: u32,
    next_data3d: u32,
    next_projector: u32,
}

impl Default for Managers {
    fn default() -> Self {
        Self {
            volumes2d    : Manager::default(),
            projections2d: Manager::default(),
            volumes3d    : Manager::default(),
            projections3d: Manager::default(),
            projectors2d : Manager::default(),
            projectors3d : Manager::default(),
            next_data2d: 1,
            next_data3d: 1,
            next_projector: 1,
        }
    }
}

macro_rules! register {
    ($name:ident, $store:ident, $counter:ident, $id:ident, $t:ty) => {
        pub fn $name(&mut self, value: $t) -> ($id, Handle<$t>) {
            let h = handle(value);
            let id = self.$counter;
            self.$counter += 1;
            self.$store.insert(id, h.clone());
            ($id(id), h)
        }
    };
}

impl Managers {

    pub fn new() -> Self { Self::default() }

    register!(store_volume2d    , volumes2d    , next_data2d   , DataId     , VolumeData2D    );
    register!(store_projection2d, projections2d, next_data2d   , DataId     , ProjectionData2D);
    register!(store_volume3d    , volumes3d    , next_data3d   , DataId     , VolumeData3D    );
    register!(store_projection3d, projections3d, next_data3d   , DataId     , ProjectionData3D);
    register!(store_projector2d , projectors2d , next_projector, ProjectorId, Projector2D     );
    register!(store_projector3d , projectors3d , next_projector, ProjectorId, Projector3D     );

    /// Forget a 2-D data object; outstanding handles stay valid
    pub fn remove_data2d(&mut self, DataId(id): DataId) -> bool {
        self.volumes2d.remove(id).is_some() | self.projections2d.remove(id).is_some()
    }

    pub fn remove_data3d(&mut self, DataId(id): DataId) -> bool {
        self.volumes3d.remove(id).is_some() | self.projections3d.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::VolumeGeometry2D;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    fn volume() -> VolumeData2D { VolumeData2D::new(VolumeGeometry2D::new(2, 2).unwrap()) }

    #[test]
    fn ids_start_at_one_and_are_shared_between_kinds() {
        let mut m = Managers::new();
        let (a, _) = m.store_volume2d(volume());
        let (b, _) = m.store_volume2d(volume());
        assert_eq!((a, b), (DataId(1), DataId(2)));
        // The same id never names both a volume and a projection
        assert!(m.projections2d.get(a.0).is_none());
    }

    #[test]
    fn reverse_lookup_uses_identity() {
        let mut m = Managers::new();
        let (id, h) = m.store_volume2d(volume());
        assert_eq!(m.volumes2d.index_of(&h), Some(id.0));
        let stranger = handle(volume());
        assert_eq!(m.volumes2d.index_of(&stranger), None);
    }

    #[test]
    fn removal_keeps_handles_alive() {
        let mut m = Managers::new();
        let (id, h) = m.store_volume2d(volume());
        assert!(m.remove_data2d(id));
        assert!(!m.remove_data2d(id));
        assert_eq!(m.volumes2d.index_of(&h), None);
        assert!(h.read().unwrap().is_initialized());
        assert_eq!(Arc::strong_count(&h), 1);
    }
}
