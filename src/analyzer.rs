//! Asynchronous frame analysis loop.
//!
//! Frames arrive from an external capture source faster than detection can
//! keep up. The analyzer keeps a single-slot mailbox holding only the most
//! recently submitted frame: submitting overwrites any frame the worker has
//! not picked up yet, which is the best-effort cancellation of in-flight
//! work. A generation counter tags each pickup; a detection result whose
//! generation has been passed is stale and is discarded instead of
//! overwriting newer display state.
//!
//! The displayed result is likewise a single-slot latest-value store with
//! overwrite semantics; readers observe eventually-consistent snapshots.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;

use image::RgbImage;
use log::{debug, warn};

use crate::detection::Detection;
use crate::engine::{EraserEngine, Mode};
use crate::error::{Error, Result};

/// Per-frame object detection, implemented by an external model runtime.
///
/// Synchronous from the worker's point of view; tests use deterministic
/// stubs. An `Err` drops the frame without updating the display.
pub trait ObjectDetector: Send {
    /// Detect objects in one frame.
    ///
    /// # Errors
    ///
    /// A human-readable reason when inference fails for this frame.
    fn detect(&mut self, frame: &RgbImage) -> std::result::Result<Vec<Detection>, String>;
}

/// Shared state between the submitting side and the worker thread.
struct Shared {
    /// Bumped on every submission; a result tagged with an older value is
    /// stale.
    generation: AtomicU64,
    /// Latest submitted frame with its generation. Overwrite semantics.
    pending: Mutex<Option<(u64, RgbImage)>>,
    /// Latest synthesized frame for the presentation layer.
    output: Mutex<Option<RgbImage>>,
    wakeup: Condvar,
    shutdown: AtomicBool,
}

/// Recover a usable guard even if a worker panicked while holding the lock.
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Owns the analysis worker thread and the engine driving it.
pub struct FrameAnalyzer {
    shared: Arc<Shared>,
    engine: Arc<Mutex<EraserEngine>>,
    worker: Option<JoinHandle<()>>,
}

impl FrameAnalyzer {
    /// Spawn the analysis worker around an already-initialized detector.
    #[must_use]
    pub fn new<D>(detector: D, engine: EraserEngine) -> Self
    where
        D: ObjectDetector + 'static,
    {
        let shared = Arc::new(Shared {
            generation: AtomicU64::new(0),
            pending: Mutex::new(None),
            output: Mutex::new(None),
            wakeup: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let engine = Arc::new(Mutex::new(engine));

        let worker_shared = Arc::clone(&shared);
        let worker_engine = Arc::clone(&engine);
        let worker = std::thread::spawn(move || run_worker(detector, &worker_shared, &worker_engine));

        Self {
            shared,
            engine,
            worker: Some(worker),
        }
    }

    /// Construct the detector through `factory` and spawn the analyzer.
    ///
    /// # Errors
    ///
    /// [`Error::DetectorUnavailable`] when the factory fails; detector
    /// initialization problems are fatal and surface here, at construction
    /// time, never during frame processing.
    pub fn with_detector<D, F>(factory: F, engine: EraserEngine) -> Result<Self>
    where
        D: ObjectDetector + 'static,
        F: FnOnce() -> std::result::Result<D, String>,
    {
        let detector = factory().map_err(Error::DetectorUnavailable)?;
        Ok(Self::new(detector, engine))
    }

    /// Submit a frame for analysis, replacing any frame still waiting in the
    /// mailbox. Returns immediately.
    pub fn submit(&self, frame: RgbImage) {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *lock_or_recover(&self.shared.pending) = Some((generation, frame));
        self.shared.wakeup.notify_one();
    }

    /// Latest synthesized frame, if any has been produced yet.
    #[must_use]
    pub fn latest_output(&self) -> Option<RgbImage> {
        lock_or_recover(&self.shared.output).clone()
    }

    /// Flip the engine between removal and annotation for subsequent frames.
    pub fn toggle_removal(&self) {
        lock_or_recover(&self.engine).toggle_removal();
    }

    /// The engine's current display mode.
    #[must_use]
    pub fn current_mode(&self) -> Mode {
        lock_or_recover(&self.engine).current_mode()
    }
}

impl Drop for FrameAnalyzer {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.wakeup.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker<D: ObjectDetector>(
    mut detector: D,
    shared: &Shared,
    engine: &Mutex<EraserEngine>,
) {
    loop {
        let (generation, frame) = {
            let mut pending = lock_or_recover(&shared.pending);
            loop {
                if shared.shutdown.load(Ordering::Acquire) {
                    return;
                }
                if let Some(job) = pending.take() {
                    break job;
                }
                pending = shared
                    .wakeup
                    .wait(pending)
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
            }
        };

        let detections = match detector.detect(&frame) {
            Ok(d) => d,
            Err(reason) => {
                warn!("detector failed, dropping frame: {reason}");
                continue;
            }
        };

        // A newer submission arrived while inference ran; this result must
        // not overwrite the newer frame's (eventual) output.
        if shared.generation.load(Ordering::Acquire) != generation {
            debug!("discarding stale detection result (generation {generation})");
            continue;
        }

        let synthesized = lock_or_recover(engine).process_frame(&frame, &detections);
        *lock_or_recover(&shared.output) = Some(synthesized);
    }
}
