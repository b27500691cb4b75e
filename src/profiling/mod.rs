//! Per-thread CPU sample collection.
//!
//! Each thread owns a stack of open samples; closing a sample appends it
//! to the thread's current frame. Frames are double-buffered per thread,
//! so readers always see the previous complete frame while the current
//! one fills.

use parking_lot::Mutex;
use std::time::Instant;

/// One completed sample in a frame's tree. `depth` is the nesting level
/// at the time the sample was opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSample {
    pub name: &'static str,
    pub start_time: f64,
    pub duration: f64,
    pub depth: u32,
}

#[derive(Debug, Clone, Copy)]
struct OpenSample {
    name: &'static str,
    start: f64,
    depth: u32,
}

#[derive(Debug, Default)]
struct ProfileFrame {
    samples: Vec<ProfileSample>,
    overhead: f64,
}

#[derive(Debug, Default)]
struct ThreadData {
    stack: Vec<OpenSample>,
    current: ProfileFrame,
    last: ProfileFrame,
}

/// Sample collector sized at creation for a fixed number of threads.
///
/// Thread slots are owned by their threads on the hot path; the mutex per
/// slot only arbitrates against frame swaps and readers of the last
/// frame.
pub struct ProfileContext {
    epoch: Instant,
    threads: Vec<Mutex<ThreadData>>,
}

impl ProfileContext {
    pub fn new(thread_count: usize) -> Self {
        Self {
            epoch: Instant::now(),
            threads: (0..thread_count.max(1))
                .map(|_| Mutex::new(ThreadData::default()))
                .collect(),
        }
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Marks the start of a new frame. Open samples carry across.
    pub fn begin_frame(&self) {}

    /// Closes the frame on every thread: the current sample list becomes
    /// the last frame and a fresh current frame starts.
    pub fn end_frame(&self) {
        for slot in &self.threads {
            let mut thread = slot.lock();
            let finished = std::mem::take(&mut thread.current);
            thread.last = finished;
        }
    }

    /// Opens a sample on `thread_index`'s stack.
    pub fn begin_sample(&self, thread_index: u32, name: &'static str) {
        let entry = Instant::now();
        let Some(slot) = self.threads.get(thread_index as usize) else {
            return;
        };
        let mut thread = slot.lock();
        let depth = thread.stack.len() as u32;
        let start = self.now();
        thread.stack.push(OpenSample { name, start, depth });
        thread.current.overhead += entry.elapsed().as_secs_f64();
    }

    /// Closes the most recent open sample and appends it to the current
    /// frame.
    pub fn end_sample(&self, thread_index: u32) {
        let entry = Instant::now();
        let Some(slot) = self.threads.get(thread_index as usize) else {
            return;
        };
        let mut thread = slot.lock();
        let Some(open) = thread.stack.pop() else {
            log::warn!(
                "[ProfileContext::end_sample] unbalanced end_sample on thread {}",
                thread_index
            );
            return;
        };
        let sample = ProfileSample {
            name: open.name,
            start_time: open.start,
            duration: self.now() - open.start,
            depth: open.depth,
        };
        thread.current.samples.push(sample);
        thread.current.overhead += entry.elapsed().as_secs_f64();
    }

    /// Stable sample list covering exactly the previous complete frame.
    pub fn last_frame_samples(&self, thread_index: u32) -> Vec<ProfileSample> {
        self.threads
            .get(thread_index as usize)
            .map(|slot| slot.lock().last.samples.clone())
            .unwrap_or_default()
    }

    /// Time spent inside the profiler itself during the previous frame.
    pub fn last_frame_overhead(&self, thread_index: u32) -> f64 {
        self.threads
            .get(thread_index as usize)
            .map(|slot| slot.lock().last.overhead)
            .unwrap_or(0.0)
    }

    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_appear_after_frame_swap() {
        let profiler = ProfileContext::new(1);

        profiler.begin_frame();
        profiler.begin_sample(0, "update");
        profiler.end_sample(0);
        assert!(profiler.last_frame_samples(0).is_empty());

        profiler.end_frame();
        let samples = profiler.last_frame_samples(0);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "update");
        assert!(samples[0].duration >= 0.0);
    }

    #[test]
    fn test_nested_samples_record_depth() {
        let profiler = ProfileContext::new(1);

        profiler.begin_frame();
        profiler.begin_sample(0, "frame");
        profiler.begin_sample(0, "physics");
        profiler.begin_sample(0, "solver");
        profiler.end_sample(0);
        profiler.end_sample(0);
        profiler.end_sample(0);
        profiler.end_frame();

        let samples = profiler.last_frame_samples(0);
        assert_eq!(samples.len(), 3);
        // samples close inner-first
        assert_eq!(samples[0].name, "solver");
        assert_eq!(samples[0].depth, 2);
        assert_eq!(samples[1].depth, 1);
        assert_eq!(samples[2].name, "frame");
        assert_eq!(samples[2].depth, 0);
    }

    #[test]
    fn test_frames_do_not_leak_between_swaps() {
        let profiler = ProfileContext::new(1);

        profiler.begin_frame();
        profiler.begin_sample(0, "a");
        profiler.end_sample(0);
        profiler.end_frame();

        profiler.begin_frame();
        profiler.end_frame();
        assert!(profiler.last_frame_samples(0).is_empty());
    }

    #[test]
    fn test_per_thread_isolation() {
        let profiler = ProfileContext::new(2);

        profiler.begin_frame();
        profiler.begin_sample(0, "main");
        profiler.end_sample(0);
        profiler.begin_sample(1, "worker");
        profiler.end_sample(1);
        profiler.end_frame();

        assert_eq!(profiler.last_frame_samples(0)[0].name, "main");
        assert_eq!(profiler.last_frame_samples(1)[0].name, "worker");
    }

    #[test]
    fn test_unbalanced_end_is_ignored() {
        let profiler = ProfileContext::new(1);
        profiler.end_sample(0);
        profiler.end_frame();
        assert!(profiler.last_frame_samples(0).is_empty());
    }

    #[test]
    fn test_overhead_accumulates() {
        let profiler = ProfileContext::new(1);
        profiler.begin_frame();
        for _ in 0..100 {
            profiler.begin_sample(0, "tick");
            profiler.end_sample(0);
        }
        profiler.end_frame();
        assert!(profiler.last_frame_overhead(0) > 0.0);
    }
}
