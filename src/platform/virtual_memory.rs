//! Virtual memory capability: page-granular reserve/commit/free.
//!
//! Unix uses `mmap`/`mprotect`/`munmap`; other platforms fall back to
//! page-aligned heap allocations where reserve and commit collapse into
//! one step. Sizes are rounded up to whole pages.

use std::ptr::NonNull;

pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as usize;
        }
    }
    4096
}

fn round_to_pages(size: usize) -> usize {
    let page = page_size();
    size.div_ceil(page) * page
}

/// Reserves address space without committing backing store.
pub fn reserve(size: usize) -> Option<NonNull<u8>> {
    let size = round_to_pages(size);

    #[cfg(unix)]
    {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            log::error!("[platform::virtual_memory::reserve] mmap failed for {} bytes", size);
            return None;
        }
        NonNull::new(ptr as *mut u8)
    }

    #[cfg(not(unix))]
    {
        fallback_alloc(size)
    }
}

/// Commits previously reserved pages for read/write access.
pub fn commit(address: NonNull<u8>, size: usize) -> bool {
    let size = round_to_pages(size);

    #[cfg(unix)]
    {
        let result = unsafe {
            libc::mprotect(
                address.as_ptr() as *mut libc::c_void,
                size,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if result != 0 {
            log::error!("[platform::virtual_memory::commit] mprotect failed");
        }
        result == 0
    }

    #[cfg(not(unix))]
    {
        let _ = (address, size);
        true
    }
}

/// Returns committed pages to reserved-only state; contents are lost.
pub fn uncommit(address: NonNull<u8>, size: usize) -> bool {
    let size = round_to_pages(size);

    #[cfg(unix)]
    {
        unsafe {
            libc::madvise(
                address.as_ptr() as *mut libc::c_void,
                size,
                libc::MADV_DONTNEED,
            );
            libc::mprotect(address.as_ptr() as *mut libc::c_void, size, libc::PROT_NONE) == 0
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (address, size);
        true
    }
}

/// Reserve and commit in one step.
pub fn alloc(size: usize) -> Option<NonNull<u8>> {
    let size = round_to_pages(size);

    #[cfg(unix)]
    {
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            log::error!("[platform::virtual_memory::alloc] mmap failed for {} bytes", size);
            return None;
        }
        NonNull::new(ptr as *mut u8)
    }

    #[cfg(not(unix))]
    {
        fallback_alloc(size)
    }
}

/// Releases a region returned by `reserve` or `alloc`.
///
/// # Safety
///
/// `address`/`size` must describe exactly one region from `reserve` or
/// `alloc` that has not been freed.
pub unsafe fn free(address: NonNull<u8>, size: usize) {
    let size = round_to_pages(size);

    #[cfg(unix)]
    {
        libc::munmap(address.as_ptr() as *mut libc::c_void, size);
    }

    #[cfg(not(unix))]
    {
        fallback_free(address, size);
    }
}

#[cfg(not(unix))]
fn fallback_alloc(size: usize) -> Option<NonNull<u8>> {
    let layout = std::alloc::Layout::from_size_align(size, page_size()).ok()?;
    NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
}

#[cfg(not(unix))]
unsafe fn fallback_free(address: NonNull<u8>, size: usize) {
    if let Ok(layout) = std::alloc::Layout::from_size_align(size, page_size()) {
        std::alloc::dealloc(address.as_ptr(), layout);
    }
}
