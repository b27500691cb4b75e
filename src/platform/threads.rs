//! Threading capability: spawn/join, sleeping, locks, semaphores,
//! barriers, condition variables, and dynamic thread-local slots.
//!
//! Locks come from `parking_lot`; the semaphore is the classic
//! mutex-plus-condvar construction.

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadResult {
    Fail,
    Success,
}

/// Re-exported lock types: the capability surface does not wrap what
/// `parking_lot` already does well.
pub use parking_lot::{Mutex as ThreadMutex, ReentrantMutex as CriticalSection, RwLock};

pub fn hardware_thread_count() -> usize {
    num_cpus::get()
}

pub fn yield_thread() {
    std::thread::yield_now();
}

pub fn sleep_thread(milliseconds: u64) {
    std::thread::sleep(Duration::from_millis(milliseconds));
}

pub fn current_thread_id() -> ThreadId {
    std::thread::current().id()
}

/// A joinable thread handle.
pub struct Thread {
    handle: JoinHandle<()>,
}

impl Thread {
    pub fn spawn<F>(procedure: F) -> Result<Thread, std::io::Error>
    where
        F: FnOnce() + Send + 'static,
    {
        std::thread::Builder::new()
            .spawn(procedure)
            .map(|handle| Thread { handle })
    }

    /// Blocks until the thread finishes.
    pub fn join(self) -> ThreadResult {
        match self.handle.join() {
            Ok(()) => ThreadResult::Success,
            Err(_) => {
                log::error!("[platform::threads] joined thread had panicked");
                ThreadResult::Fail
            }
        }
    }

    pub fn id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Counting semaphore built on a mutex and condition variable.
pub struct Semaphore {
    count: Mutex<u32>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(initial_count: u32) -> Self {
        Self {
            count: Mutex::new(initial_count),
            available: Condvar::new(),
        }
    }

    /// Blocks until a permit is available.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.available.wait(&mut count);
        }
        *count -= 1;
    }

    /// Takes a permit if one is available right now.
    pub fn try_wait(&self) -> bool {
        let mut count = self.count.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    pub fn release(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.available.notify_one();
    }
}

/// Reusable rendezvous for a fixed number of threads.
pub struct Barrier {
    inner: std::sync::Barrier,
}

impl Barrier {
    pub fn new(thread_count: usize) -> Self {
        Self {
            inner: std::sync::Barrier::new(thread_count),
        }
    }

    pub fn wait(&self) {
        self.inner.wait();
    }
}

/// Condition variable paired with its own mutex, matching the
/// sleep/wake/wake-all capability shape.
pub struct ConditionVariable {
    state: Mutex<u64>,
    condvar: Condvar,
}

impl ConditionVariable {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(0),
            condvar: Condvar::new(),
        }
    }

    /// Sleeps until the next wake. Spurious wakeups are absorbed by the
    /// internal wake counter.
    pub fn sleep(&self) {
        let mut generation = self.state.lock();
        let seen = *generation;
        while *generation == seen {
            self.condvar.wait(&mut generation);
        }
    }

    pub fn wake(&self) {
        *self.state.lock() += 1;
        self.condvar.notify_one();
    }

    pub fn wake_all(&self) {
        *self.state.lock() += 1;
        self.condvar.notify_all();
    }
}

impl Default for ConditionVariable {
    fn default() -> Self {
        Self::new()
    }
}

/// Dynamic thread-local slot: one value per thread, allocated at runtime
/// (the static `thread_local!` macro covers the common case; this covers
/// keys created by loaded extensions).
pub struct ThreadLocalSlot<T> {
    values: DashMap<ThreadId, T>,
}

impl<T: Clone> ThreadLocalSlot<T> {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
        }
    }

    pub fn set(&self, value: T) {
        self.values.insert(current_thread_id(), value);
    }

    pub fn get(&self) -> Option<T> {
        self.values
            .get(&current_thread_id())
            .map(|entry| entry.value().clone())
    }

    pub fn clear(&self) {
        self.values.remove(&current_thread_id());
    }
}

impl<T: Clone> Default for ThreadLocalSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
