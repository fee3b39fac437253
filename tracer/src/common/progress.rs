use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::common::scene::Color;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Block {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Block {
    pub fn x_range(self) -> Range<u32> {
        self.x..(self.x + self.width)
    }

    pub fn y_range(self) -> Range<u32> {
        self.y..(self.y + self.height)
    }

    pub fn pixel_count(self) -> u64 {
        (self.width as u64) * (self.height as u64)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct PixelResult {
    pub color: Color,
    pub variance: Color,
    pub samples: u32,
}

/// Immutable copy of the progress state handed to observers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Completion in `[0, 1]`.
    pub progress: f64,
    pub status: String,
    pub substatus: String,
}

/// Receives progress updates from a running session.
///
/// Updates are delivered on the session's own threads, never on the thread that
/// started the session, so implementations must be `Send + Sync`.
pub trait StatusObserver: Send + Sync {
    fn update(&self, snapshot: &ProgressSnapshot);

    /// Called once by the owner of the session after it has been released.
    fn finish(&self) {}
}

/// Shared progress and status of a session, also the place cancellation is requested.
#[derive(Default)]
pub struct Progress {
    state: Mutex<ProgressSnapshot>,
    cancel: AtomicBool,
    observer: Mutex<Option<Arc<dyn StatusObserver>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Progress {
    pub fn new() -> Self {
        Progress::default()
    }

    pub fn set_update_callback(&self, observer: Arc<dyn StatusObserver>) {
        *lock(&self.observer) = Some(observer);
    }

    pub fn reset(&self) {
        *lock(&self.state) = ProgressSnapshot::default();
        self.cancel.store(false, Ordering::SeqCst);
    }

    pub fn get_progress(&self) -> f64 {
        lock(&self.state).progress
    }

    pub fn get_status(&self) -> (String, String) {
        let state = lock(&self.state);
        (state.status.clone(), state.substatus.clone())
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        lock(&self.state).clone()
    }

    pub fn set_status(&self, status: impl Into<String>, substatus: impl Into<String>) {
        {
            let mut state = lock(&self.state);
            state.status = status.into();
            state.substatus = substatus.into();
        }
        self.notify();
    }

    pub fn set_progress(&self, progress: f64) {
        lock(&self.state).progress = progress.clamp(0.0, 1.0);
        self.notify();
    }

    /// Sets the fraction and status together so observers only see a single update.
    pub fn update(&self, progress: f64, status: impl Into<String>, substatus: impl Into<String>) {
        {
            let mut state = lock(&self.state);
            state.progress = progress.clamp(0.0, 1.0);
            state.status = status.into();
            state.substatus = substatus.into();
        }
        self.notify();
    }

    pub fn set_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn get_cancel(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn notify(&self) {
        // the snapshot is taken first so no lock is held while the observer runs
        let observer = lock(&self.observer).clone();
        if let Some(observer) = observer {
            observer.update(&self.snapshot());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressSnapshot>>);

    impl StatusObserver for Recorder {
        fn update(&self, snapshot: &ProgressSnapshot) {
            lock(&self.0).push(snapshot.clone());
        }
    }

    #[test]
    fn observer_sees_each_update() {
        let progress = Progress::new();
        let recorder = Arc::new(Recorder::default());
        progress.set_update_callback(recorder.clone());

        progress.set_status("Rendering", "");
        progress.update(0.5, "Rendering", "Tile 1/2");
        progress.set_progress(2.0);

        let seen = lock(&recorder.0).clone();
        assert_eq!(3, seen.len());
        assert_eq!("Tile 1/2", seen[1].substatus);
        assert_eq!(0.5, seen[1].progress);
        assert_eq!(1.0, seen[2].progress);
    }

    #[test]
    fn reset_clears_cancel() {
        let progress = Progress::new();
        progress.set_cancel();
        assert!(progress.get_cancel());
        progress.reset();
        assert!(!progress.get_cancel());
        assert_eq!((String::new(), String::new()), progress.get_status());
    }

    #[test]
    fn block_ranges() {
        let block = Block { x: 16, y: 8, width: 4, height: 2 };
        assert_eq!(16..20, block.x_range());
        assert_eq!(8..10, block.y_range());
        assert_eq!(8, block.pixel_count());
    }
}
