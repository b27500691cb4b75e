//! Platform capability surfaces consumed by the runtime and offered to
//! extensions: file I/O, threads, atomics, virtual memory, and network.
//!
//! Each capability with free-function shape is also published through the
//! API registry as a vtable of function pointers, following the same
//! registration convention extensions use among themselves. The richer
//! typed surfaces (sockets, semaphores, counters) are used directly as
//! module types.

pub mod atomics;
pub mod file;
pub mod network;
pub mod threads;
pub mod virtual_memory;

pub use atomics::{AtomicCounter, AtomicsResult};
pub use file::{DirectoryEntry, DirectoryEntryKind, FileResult};
pub use network::{
    select_sockets, NetworkAddress, NetworkResult, Socket, SocketFlags, SocketReceiverInfo,
};
pub use threads::{
    Barrier, ConditionVariable, CriticalSection, Semaphore, Thread, ThreadLocalSlot, ThreadResult,
};

use crate::registry::{ApiRegistry, ApiSpec};
use crate::version::ApiVersion;
use std::path::Path;
use std::ptr::NonNull;

/// File capability vtable.
pub struct FileApi {
    pub exists: fn(&Path) -> bool,
    pub remove: fn(&Path) -> FileResult,
    pub copy: fn(&Path, &Path) -> FileResult,
    pub binary_read: fn(&Path) -> Option<Vec<u8>>,
    pub binary_write: fn(&Path, &[u8]) -> FileResult,
    pub directory_exists: fn(&Path) -> bool,
    pub create_directory: fn(&Path) -> FileResult,
    pub remove_directory: fn(&Path) -> FileResult,
    pub get_directory_info: fn(&Path) -> Option<Vec<DirectoryEntry>>,
}

pub static FILE_API: FileApi = FileApi {
    exists: file::exists,
    remove: file::remove,
    copy: file::copy,
    binary_read: file::binary_read,
    binary_write: file::binary_write,
    directory_exists: file::directory_exists,
    create_directory: file::create_directory,
    remove_directory: file::remove_directory,
    get_directory_info: file::get_directory_info,
};

pub struct FileApiSpec;

impl ApiSpec for FileApiSpec {
    const NAME: &'static str = "FileApi";
    const VERSION: ApiVersion = ApiVersion::new(1, 0, 0);
    type Api = FileApi;
}

/// Virtual memory capability vtable.
pub struct VirtualMemoryApi {
    pub page_size: fn() -> usize,
    pub reserve: fn(usize) -> Option<NonNull<u8>>,
    pub commit: fn(NonNull<u8>, usize) -> bool,
    pub uncommit: fn(NonNull<u8>, usize) -> bool,
    pub alloc: fn(usize) -> Option<NonNull<u8>>,
    pub free: unsafe fn(NonNull<u8>, usize),
}

pub static VIRTUAL_MEMORY_API: VirtualMemoryApi = VirtualMemoryApi {
    page_size: virtual_memory::page_size,
    reserve: virtual_memory::reserve,
    commit: virtual_memory::commit,
    uncommit: virtual_memory::uncommit,
    alloc: virtual_memory::alloc,
    free: virtual_memory::free,
};

pub struct VirtualMemoryApiSpec;

impl ApiSpec for VirtualMemoryApiSpec {
    const NAME: &'static str = "VirtualMemoryApi";
    const VERSION: ApiVersion = ApiVersion::new(1, 0, 0);
    type Api = VirtualMemoryApi;
}

/// Threads capability vtable; the lock and signal types are used
/// directly.
pub struct ThreadsApi {
    pub hardware_thread_count: fn() -> usize,
    pub yield_thread: fn(),
    pub sleep_thread: fn(u64),
}

pub static THREADS_API: ThreadsApi = ThreadsApi {
    hardware_thread_count: threads::hardware_thread_count,
    yield_thread: threads::yield_thread,
    sleep_thread: threads::sleep_thread,
};

pub struct ThreadsApiSpec;

impl ApiSpec for ThreadsApiSpec {
    const NAME: &'static str = "ThreadsApi";
    const VERSION: ApiVersion = ApiVersion::new(1, 0, 0);
    type Api = ThreadsApi;
}

/// Publishes every platform vtable into the registry.
pub fn register_all(registry: &ApiRegistry) {
    registry.publish::<FileApiSpec>(&FILE_API);
    registry.publish::<VirtualMemoryApiSpec>(&VIRTUAL_MEMORY_API);
    registry.publish::<ThreadsApiSpec>(&THREADS_API);
    log::debug!("[platform::register_all] platform capability APIs published");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_resolve_from_registry() {
        let registry = ApiRegistry::new();
        register_all(&registry);

        let file_api = unsafe { registry.resolve::<FileApiSpec>() }.expect("published");
        assert!(!(file_api.exists)(Path::new("/definitely/not/here")));

        let vm_api = unsafe { registry.resolve::<VirtualMemoryApiSpec>() }.expect("published");
        assert!((vm_api.page_size)() >= 1024);

        let threads_api = unsafe { registry.resolve::<ThreadsApiSpec>() }.expect("published");
        assert!((threads_api.hardware_thread_count)() >= 1);
    }
}
