//! Versioned API registry.
//!
//! Brokers typed interface vtables between modules. The currency is a raw
//! pointer to a plain struct of function pointers; the typed adapter layer
//! ([`ApiSpec`]) keeps Rust callers out of the casts while the raw table
//! stays C-callable for loaded extensions.

use crate::version::ApiVersion;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::ffi::c_void;

/// Type-erased vtable pointer. The registry never dereferences it; the
/// pointee is owned by the publishing module and outlives the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiPtr(*const c_void);

// Vtables are plain structs of function pointers owned by the publishing
// module; sharing the address across threads is safe, calling through it
// is governed by the interface itself.
unsafe impl Send for ApiPtr {}
unsafe impl Sync for ApiPtr {}

impl ApiPtr {
    pub fn new(ptr: *const c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.0
    }
}

/// Snapshot of a published record, for observers and tests.
#[derive(Debug, Clone)]
pub struct ApiRecordInfo {
    pub name: String,
    pub version: ApiVersion,
    pub pointer: ApiPtr,
    pub size: usize,
    pub generation: u64,
}

struct ApiRecord {
    version: ApiVersion,
    pointer: ApiPtr,
    size: usize,
    generation: u64,
}

#[derive(PartialEq, Eq, Hash)]
struct ApiKey {
    name: String,
    major: u32,
}

/// Declares the registry identity of an interface: its name, its declared
/// version, and the vtable struct it resolves to.
pub trait ApiSpec {
    const NAME: &'static str;
    const VERSION: ApiVersion;
    type Api: 'static;
}

/// `(name, major)` → current vtable record. Reads dominate writes, so a
/// reader/writer lock serializes publication against lookup.
pub struct ApiRegistry {
    table: RwLock<FxHashMap<ApiKey, ApiRecord>>,
    revision: std::sync::atomic::AtomicU64,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(FxHashMap::default()),
            revision: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Bumped on every publication or removal. Consumers that cached a
    /// resolved pointer compare revisions to notice hot swaps and
    /// re-resolve.
    pub fn revision(&self) -> u64 {
        self.revision.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Publishes a record for `(name, version.major)`. Any previous record
    /// for the same key is superseded and its generation carried forward
    /// plus one; readers that captured the old pointer keep a valid vtable
    /// until they re-resolve.
    pub fn set_api(&self, name: &str, version: ApiVersion, pointer: *const c_void, size: usize) {
        let key = ApiKey {
            name: name.to_string(),
            major: version.major,
        };

        let mut table = self.table.write();
        let generation = table.get(&key).map_or(1, |old| old.generation + 1);
        if generation > 1 {
            log::debug!(
                "[ApiRegistry::set_api] superseding {} v{} (generation {})",
                name,
                version,
                generation
            );
        }
        table.insert(
            key,
            ApiRecord {
                version,
                pointer: ApiPtr::new(pointer),
                size,
                generation,
            },
        );
        self.revision
            .fetch_add(1, std::sync::atomic::Ordering::Release);
    }

    /// Current pointer for `(name, version.major)` iff the provider minor
    /// satisfies the request. The pointer must be re-resolved after module
    /// reloads; nothing rebinds cached copies.
    pub fn get_api(&self, name: &str, version: ApiVersion) -> Option<*const c_void> {
        let key = ApiKey {
            name: name.to_string(),
            major: version.major,
        };
        let table = self.table.read();
        let record = table.get(&key)?;
        if record.version.satisfies(&version) {
            Some(record.pointer.as_ptr())
        } else {
            None
        }
    }

    /// Unpublishes by pointer identity of the currently published record.
    pub fn remove_api(&self, pointer: *const c_void) {
        let mut table = self.table.write();
        table.retain(|key, record| {
            let matches = record.pointer.as_ptr() == pointer;
            if matches {
                log::debug!(
                    "[ApiRegistry::remove_api] removing {} v{}",
                    key.name,
                    record.version
                );
            }
            !matches
        });
        self.revision
            .fetch_add(1, std::sync::atomic::Ordering::Release);
    }

    /// Record metadata for `(name, major)` regardless of minor.
    pub fn record_info(&self, name: &str, major: u32) -> Option<ApiRecordInfo> {
        let table = self.table.read();
        let record = table.get(&ApiKey {
            name: name.to_string(),
            major,
        })?;
        Some(ApiRecordInfo {
            name: name.to_string(),
            version: record.version,
            pointer: record.pointer,
            size: record.size,
            generation: record.generation,
        })
    }

    /// Typed publication of a `'static` vtable under its [`ApiSpec`]
    /// identity.
    pub fn publish<S: ApiSpec>(&self, api: &'static S::Api) {
        self.set_api(
            S::NAME,
            S::VERSION,
            api as *const S::Api as *const c_void,
            std::mem::size_of::<S::Api>(),
        );
    }

    /// Typed resolution at the interface's own declared version (the
    /// "latest" idiom).
    ///
    /// # Safety
    ///
    /// Sound only when every publisher of `S::NAME` published a
    /// `S::Api`; the registry cannot check the cast.
    pub unsafe fn resolve<S: ApiSpec>(&self) -> Option<&'static S::Api> {
        self.get_api(S::NAME, S::VERSION)
            .map(|ptr| &*(ptr as *const S::Api))
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

impl Default for ApiRegistry {
    fn default() -> Self {
        Self::new()
    }
}
