//! Data registry: per-process shared state.
//!
//! Two surfaces coexist. The simple map is a string → pointer table for
//! cross-module globals (each subsystem parks its context struct here so a
//! reloaded module can find it again). The typed object store hands out
//! immutable snapshots to readers and staged, atomically-committed views
//! to writers.

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::ffi::c_void;
use std::sync::Arc;

/// Type-erased data pointer stored in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPtr(*mut c_void);

// The registry only stores the address; ownership stays with the module
// that registered it.
unsafe impl Send for DataPtr {}
unsafe impl Sync for DataPtr {}

impl DataPtr {
    pub fn new(ptr: *mut c_void) -> Self {
        Self(ptr)
    }

    pub fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Handle to an object in the typed store, packed as
/// `{superblock:10, block:10, index:10, unused:34}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataId(u64);

static_assertions::assert_eq_size!(DataId, u64);

const FIELD_BITS: u32 = 10;
const FIELD_MASK: u64 = (1 << FIELD_BITS) - 1;

impl DataId {
    pub const INVALID: DataId = DataId(u64::MAX);

    fn from_slot(slot: usize) -> Self {
        let slot = slot as u64;
        let index = slot & FIELD_MASK;
        let block = (slot >> FIELD_BITS) & FIELD_MASK;
        let superblock = (slot >> (2 * FIELD_BITS)) & FIELD_MASK;
        DataId(index | (block << FIELD_BITS) | (superblock << (2 * FIELD_BITS)))
    }

    fn slot(&self) -> usize {
        let index = self.0 & FIELD_MASK;
        let block = (self.0 >> FIELD_BITS) & FIELD_MASK;
        let superblock = (self.0 >> (2 * FIELD_BITS)) & FIELD_MASK;
        ((superblock << (2 * FIELD_BITS)) | (block << FIELD_BITS) | index) as usize
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// One property of a stored object. Property 0 holds the object name and
/// property 1 a buffer pointer, by convention.
#[derive(Debug, Clone)]
pub enum Property {
    String(String),
    Buffer(DataPtr),
}

#[derive(Debug, Default)]
struct ObjectView {
    properties: Vec<Property>,
}

/// Immutable view of an object's properties. Holding it pins the view it
/// was taken from; writers committing newer views do not disturb it.
pub struct DataSnapshot {
    view: Arc<ObjectView>,
}

impl DataSnapshot {
    pub fn get_string(&self, property: u32) -> Option<&str> {
        match self.view.properties.get(property as usize)? {
            Property::String(value) => Some(value),
            Property::Buffer(_) => None,
        }
    }

    pub fn get_buffer(&self, property: u32) -> Option<DataPtr> {
        match self.view.properties.get(property as usize)? {
            Property::Buffer(value) => Some(*value),
            Property::String(_) => None,
        }
    }

    pub fn property_count(&self) -> usize {
        self.view.properties.len()
    }
}

/// Exclusive write handle. Changes are staged on the handle and only
/// become visible through [`commit`](DataWriteGuard::commit); dropping the
/// handle abandons them.
pub struct DataWriteGuard<'a> {
    registry: &'a DataRegistry,
    _writer: MutexGuard<'a, ()>,
    id: DataId,
    staged: Vec<Property>,
}

impl DataWriteGuard<'_> {
    pub fn set_string(&mut self, property: u32, value: &str) {
        self.ensure_property(property);
        self.staged[property as usize] = Property::String(value.to_string());
    }

    pub fn set_buffer(&mut self, property: u32, value: DataPtr) {
        self.ensure_property(property);
        self.staged[property as usize] = Property::Buffer(value);
    }

    /// Publishes the staged state as the new immutable view. Existing
    /// snapshots keep the prior view until dropped.
    pub fn commit(self) {
        let mut store = self.registry.store.write();
        if let Some(slot) = store.get_mut(self.id.slot()) {
            *slot = Some(Arc::new(ObjectView {
                properties: self.staged,
            }));
        }
    }

    fn ensure_property(&mut self, property: u32) {
        while self.staged.len() <= property as usize {
            self.staged.push(Property::Buffer(DataPtr::null()));
        }
    }
}

/// The process-wide data registry.
pub struct DataRegistry {
    map: DashMap<String, DataPtr>,
    store: RwLock<Vec<Option<Arc<ObjectView>>>>,
    writer_lock: Mutex<()>,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
            store: RwLock::new(Vec::new()),
            writer_lock: Mutex::new(()),
        }
    }

    // ------------------------------------------------------------------
    // simple map
    // ------------------------------------------------------------------

    /// Last-writer-wins; concurrent writes to one key are a documented
    /// hazard, not a guarantee.
    pub fn set_data(&self, name: &str, data: DataPtr) {
        self.map.insert(name.to_string(), data);
    }

    pub fn get_data(&self, name: &str) -> Option<DataPtr> {
        self.map.get(name).map(|entry| *entry.value())
    }

    // ------------------------------------------------------------------
    // typed object store
    // ------------------------------------------------------------------

    /// Allocates a new object with no properties.
    pub fn create_object(&self) -> DataId {
        let mut store = self.store.write();
        let slot = store.len();
        store.push(Some(Arc::new(ObjectView::default())));
        DataId::from_slot(slot)
    }

    /// Finds an object whose property 0 equals `name`.
    pub fn get_object_by_name(&self, name: &str) -> Option<DataId> {
        let store = self.store.read();
        store.iter().enumerate().find_map(|(slot, view)| {
            let view = view.as_ref()?;
            match view.properties.first()? {
                Property::String(value) if value == name => Some(DataId::from_slot(slot)),
                _ => None,
            }
        })
    }

    /// Shared read of the object's current view. Multiple concurrent
    /// readers are fine; the snapshot never tears.
    pub fn read(&self, id: DataId) -> Option<DataSnapshot> {
        let store = self.store.read();
        let view = store.get(id.slot())?.as_ref()?.clone();
        Some(DataSnapshot { view })
    }

    /// Exclusive write access; writers block writers across the whole
    /// store, never readers.
    pub fn write(&self, id: DataId) -> Option<DataWriteGuard<'_>> {
        let writer = self.writer_lock.lock();
        let staged = {
            let store = self.store.read();
            store.get(id.slot())?.as_ref()?.properties.clone()
        };
        Some(DataWriteGuard {
            registry: self,
            _writer: writer,
            id,
            staged,
        })
    }
}

impl Default for DataRegistry {
    fn default() -> Self {
        Self::new()
    }
}
