//! Tracked heap allocation.
//!
//! Single entry point for heap memory handed to extensions and registries.
//! Every live allocation is recorded with the callsite that made it, so
//! leaks across module reloads can be attributed to a file and line.

use dashmap::DashMap;
use std::alloc::{self, Layout};
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Matches the platform `malloc` guarantee.
const DEFAULT_ALIGNMENT: usize = 16;

/// Record of one live allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationEntry {
    pub address: usize,
    pub size: usize,
    pub file: &'static str,
    pub line: u32,
}

/// Tracks every allocation made through [`MemoryTracker::tracked_realloc`].
///
/// Stats are observation only and may lag concurrent mutation; the entry
/// table itself is always internally consistent.
pub struct MemoryTracker {
    entries: DashMap<usize, AllocationEntry>,
    allocation_count: AtomicUsize,
    free_count: AtomicUsize,
    memory_usage: AtomicUsize,
}

lazy_static::lazy_static! {
    static ref GLOBAL_TRACKER: MemoryTracker = MemoryTracker::new();
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            allocation_count: AtomicUsize::new(0),
            free_count: AtomicUsize::new(0),
            memory_usage: AtomicUsize::new(0),
        }
    }

    /// Process-wide tracker shared by the runtime and all extensions.
    pub fn global() -> &'static MemoryTracker {
        &GLOBAL_TRACKER
    }

    /// `realloc`-style tri-state entry point.
    ///
    /// * `ptr.is_null() && size > 0` — allocate
    /// * `!ptr.is_null() && size == 0` — free, returns null
    /// * otherwise — reallocate
    ///
    /// Returns null on a zero-size request or allocator failure.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must have been returned by this tracker and not yet
    /// freed.
    #[track_caller]
    pub unsafe fn tracked_realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        let location = Location::caller();
        self.tracked_realloc_at(ptr, size, location.file(), location.line())
    }

    /// As [`tracked_realloc`](Self::tracked_realloc) with an explicit
    /// callsite, for callers relaying a foreign file/line pair.
    ///
    /// # Safety
    ///
    /// Same contract as [`tracked_realloc`](Self::tracked_realloc).
    pub unsafe fn tracked_realloc_at(
        &self,
        ptr: *mut u8,
        size: usize,
        file: &'static str,
        line: u32,
    ) -> *mut u8 {
        if ptr.is_null() {
            if size == 0 {
                return std::ptr::null_mut();
            }
            return self.allocate(size, file, line);
        }

        if size == 0 {
            self.release(ptr);
            return std::ptr::null_mut();
        }

        let old_size = match self.entries.remove(&(ptr as usize)) {
            Some((_, entry)) => entry.size,
            None => {
                log::error!(
                    "[MemoryTracker::tracked_realloc] untracked pointer {:p} passed for realloc",
                    ptr
                );
                return std::ptr::null_mut();
            }
        };

        let old_layout = match Layout::from_size_align(old_size, DEFAULT_ALIGNMENT) {
            Ok(layout) => layout,
            Err(_) => return std::ptr::null_mut(),
        };

        let new_ptr = alloc::realloc(ptr, old_layout, size);
        if new_ptr.is_null() {
            // the old block is still live, restore its entry
            self.entries.insert(
                ptr as usize,
                AllocationEntry {
                    address: ptr as usize,
                    size: old_size,
                    file,
                    line,
                },
            );
            return std::ptr::null_mut();
        }

        self.memory_usage.fetch_sub(old_size, Ordering::Relaxed);
        self.memory_usage.fetch_add(size, Ordering::Relaxed);
        self.free_count.fetch_add(1, Ordering::Relaxed);
        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            new_ptr as usize,
            AllocationEntry {
                address: new_ptr as usize,
                size,
                file,
                line,
            },
        );
        new_ptr
    }

    fn allocate(&self, size: usize, file: &'static str, line: u32) -> *mut u8 {
        let layout = match Layout::from_size_align(size, DEFAULT_ALIGNMENT) {
            Ok(layout) => layout,
            Err(_) => return std::ptr::null_mut(),
        };

        let ptr = unsafe { alloc::alloc(layout) };
        if ptr.is_null() {
            return std::ptr::null_mut();
        }

        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        self.memory_usage.fetch_add(size, Ordering::Relaxed);
        self.entries.insert(
            ptr as usize,
            AllocationEntry {
                address: ptr as usize,
                size,
                file,
                line,
            },
        );
        ptr
    }

    unsafe fn release(&self, ptr: *mut u8) {
        let Some((_, entry)) = self.entries.remove(&(ptr as usize)) else {
            log::error!(
                "[MemoryTracker::tracked_realloc] double free or foreign pointer {:p}",
                ptr
            );
            return;
        };

        if let Ok(layout) = Layout::from_size_align(entry.size, DEFAULT_ALIGNMENT) {
            alloc::dealloc(ptr, layout);
        }
        self.free_count.fetch_add(1, Ordering::Relaxed);
        self.memory_usage.fetch_sub(entry.size, Ordering::Relaxed);
    }

    /// Total bytes currently live.
    pub fn memory_usage(&self) -> usize {
        self.memory_usage.load(Ordering::Relaxed)
    }

    /// Allocations made over the tracker's lifetime.
    pub fn allocation_count(&self) -> usize {
        self.allocation_count.load(Ordering::Relaxed)
    }

    /// Frees made over the tracker's lifetime.
    pub fn free_count(&self) -> usize {
        self.free_count.load(Ordering::Relaxed)
    }

    /// Snapshot of live allocations, unordered.
    pub fn allocations(&self) -> Vec<AllocationEntry> {
        self.entries.iter().map(|entry| *entry.value()).collect()
    }
}

impl Default for MemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_free_roundtrip() {
        let tracker = MemoryTracker::new();

        let ptr = unsafe { tracker.tracked_realloc(std::ptr::null_mut(), 64) };
        assert!(!ptr.is_null());
        assert_eq!(tracker.allocation_count(), 1);
        assert_eq!(tracker.memory_usage(), 64);
        assert_eq!(tracker.allocations().len(), 1);
        assert_eq!(tracker.allocations()[0].address, ptr as usize);

        let out = unsafe { tracker.tracked_realloc(ptr, 0) };
        assert!(out.is_null());
        assert_eq!(tracker.free_count(), 1);
        assert_eq!(tracker.memory_usage(), 0);
        assert!(tracker.allocations().is_empty());
    }

    #[test]
    fn test_count_invariant_under_interleaving() {
        let tracker = MemoryTracker::new();
        let mut live = Vec::new();

        for i in 0..16 {
            let ptr = unsafe { tracker.tracked_realloc(std::ptr::null_mut(), 32 + i) };
            live.push(ptr);
            if i % 3 == 0 {
                let ptr = live.remove(0);
                unsafe { tracker.tracked_realloc(ptr, 0) };
            }
        }

        assert_eq!(
            tracker.allocation_count() - tracker.free_count(),
            tracker.allocations().len()
        );

        for ptr in live {
            unsafe { tracker.tracked_realloc(ptr, 0) };
        }
        assert!(tracker.allocations().is_empty());
    }

    #[test]
    fn test_realloc_moves_entry() {
        let tracker = MemoryTracker::new();

        let ptr = unsafe { tracker.tracked_realloc(std::ptr::null_mut(), 16) };
        unsafe { ptr.write_bytes(0xAB, 16) };
        let grown = unsafe { tracker.tracked_realloc(ptr, 4096) };
        assert!(!grown.is_null());
        assert_eq!(unsafe { *grown }, 0xAB);
        assert_eq!(tracker.allocations().len(), 1);
        assert_eq!(tracker.memory_usage(), 4096);
        unsafe { tracker.tracked_realloc(grown, 0) };
    }

    #[test]
    fn test_entries_record_callsite() {
        let tracker = MemoryTracker::new();
        let ptr = unsafe { tracker.tracked_realloc(std::ptr::null_mut(), 8) };
        let entries = tracker.allocations();
        assert!(entries[0].file.ends_with("tracker.rs"));
        assert!(entries[0].line > 0);
        unsafe { tracker.tracked_realloc(ptr, 0) };
    }
}
