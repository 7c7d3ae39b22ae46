use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::schedule::{ScheduledTask, Scheduler, ThreadScheduler};
use super::snapshot::ScannerSnapshot;
use super::state::{ScannerIntent, ScannerState};
use super::types::{ScannerMode, TorchMode, ZoomDirection, ZoomPreset};
use crate::content::ContentRepository;
use crate::GarbageType;

/// `is_adjusting` stays set this long after the last zoom intent.
pub const ZOOM_ADJUST_DEBOUNCE: Duration = Duration::from_millis(2500);

struct Shared {
    state: ScannerState,
    /// Bumped on every zoom intent; a deferred clear only applies to its own generation.
    zoom_generation: u64,
    pending_clear: Option<ScheduledTask>,
    closed: bool,
}

struct Inner {
    shared: Mutex<Shared>,
    subscribers: Mutex<Vec<Sender<ScannerSnapshot>>>,
    scheduler: Arc<dyn Scheduler>,
    adjust_delay: Duration,
}

/// Single-writer scanner state holder.
///
/// Every mutation goes through an intent method which applies the pure reducer
/// under one lock, so snapshots are never torn and intents are applied in call
/// order. Subscribers receive each new snapshot in that same order.
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct ScannerStateMachine {
    inner: Arc<Inner>,
}

impl ScannerStateMachine {
    pub fn new(scheduler: Arc<dyn Scheduler>, adjust_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared {
                    state: ScannerState::default(),
                    zoom_generation: 0,
                    pending_clear: None,
                    closed: false,
                }),
                subscribers: Mutex::new(Vec::new()),
                scheduler,
                adjust_delay,
            }),
        }
    }

    /// State machine backed by wall-clock timers.
    pub fn with_thread_scheduler(adjust_delay: Duration) -> Self {
        Self::new(Arc::new(ThreadScheduler::new()), adjust_delay)
    }

    // -------------------- Intents --------------------

    pub fn set_mode(&self, mode: ScannerMode) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::SetMode(mode))
    }

    /// Record the desired torch state. Actuation is the camera session's job.
    pub fn set_torch(&self, torch: TorchMode) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::SetTorch(torch))
    }

    pub fn set_zoom_ratio(&self, ratio: f32) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::SetZoomRatio(ratio))
    }

    pub fn set_zoom_preset(&self, preset: ZoomPreset) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::SetZoomPreset(preset))
    }

    pub fn zoom_step(&self, direction: ZoomDirection) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::ZoomStep(direction))
    }

    pub fn set_focus(&self, x: f32, y: f32) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::SetFocus { x, y })
    }

    /// Called by the presentation layer once its focus animation completes.
    pub fn clear_focus(&self) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::ClearFocus)
    }

    pub fn set_take_picture(&self, requested: bool) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::SetTakePicture(requested))
    }

    pub fn select_article(&self, garbage_type: GarbageType) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::SelectArticle(garbage_type))
    }

    // -------------------- Hardware facts --------------------

    pub fn apply_hardware_zoom_bounds(&self, min: f32, max: f32) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::ApplyHardwareZoomBounds { min, max })
    }

    pub fn set_has_flash_unit(&self, has_flash: bool) -> ScannerSnapshot {
        self.dispatch(ScannerIntent::SetHasFlashUnit(has_flash))
    }

    // -------------------- Analyzer results --------------------

    /// Store a classification result.
    ///
    /// `consumed_capture` is true when the frame was admitted by a photo
    /// capture request; that request is cleared even if the mode changed while
    /// the frame was being classified.
    pub fn record_classification(
        &self,
        garbage_type: GarbageType,
        consumed_capture: bool,
    ) -> ScannerSnapshot {
        let mut shared = self.lock_shared();
        let mut snapshot = self.apply(&mut shared, ScannerIntent::RecordClassification(garbage_type));
        if consumed_capture {
            snapshot = self.apply(&mut shared, ScannerIntent::SetTakePicture(false));
        }
        snapshot
    }

    // -------------------- Content --------------------

    /// Load the content feed. On failure the state is left untouched; any
    /// classification already recorded resolves once a later refresh succeeds.
    pub fn refresh_posts(&self, repository: &dyn ContentRepository) -> Result<ScannerSnapshot> {
        match repository.posts_feed() {
            Ok(feed) => Ok(self.dispatch(ScannerIntent::PostsLoaded(Arc::new(feed)))),
            Err(e) => {
                log::warn!("content feed unavailable: {:#}", e);
                Err(e)
            }
        }
    }

    // -------------------- Observation --------------------

    pub fn snapshot(&self) -> ScannerSnapshot {
        self.lock_shared().state.snapshot()
    }

    /// Mode and pending capture flag, read without building a snapshot.
    pub fn gate_inputs(&self) -> (ScannerMode, bool) {
        let shared = self.lock_shared();
        (shared.state.mode(), shared.state.take_picture_requested())
    }

    /// Receive every snapshot produced from now on.
    pub fn subscribe(&self) -> Receiver<ScannerSnapshot> {
        let (tx, rx) = unbounded();
        self.lock_subscribers().push(tx);
        rx
    }

    /// Cancel pending timers, disconnect subscribers, and refuse further intents.
    pub fn shutdown(&self) {
        let mut shared = self.lock_shared();
        if shared.closed {
            return;
        }
        shared.closed = true;
        if let Some(pending) = shared.pending_clear.take() {
            pending.cancel();
        }
        self.lock_subscribers().clear();
        log::debug!("scanner state machine shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.lock_shared().closed
    }

    // -------------------- Internals --------------------

    fn dispatch(&self, intent: ScannerIntent) -> ScannerSnapshot {
        let mut shared = self.lock_shared();
        self.apply(&mut shared, intent)
    }

    fn apply(&self, shared: &mut Shared, intent: ScannerIntent) -> ScannerSnapshot {
        if shared.closed {
            log::debug!("ignoring {:?} after shutdown", intent);
            return shared.state.snapshot();
        }
        let next = shared.state.reduce(&intent);
        if intent.changes_zoom() && next.zoom().is_adjusting() {
            self.reschedule_adjust_clear(shared);
        }
        if next == shared.state {
            return next.snapshot();
        }
        shared.state = next;
        let snapshot = shared.state.snapshot();
        self.publish(&snapshot);
        snapshot
    }

    fn reschedule_adjust_clear(&self, shared: &mut Shared) {
        if let Some(pending) = shared.pending_clear.take() {
            pending.cancel();
        }
        shared.zoom_generation += 1;
        let generation = shared.zoom_generation;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = self.inner.scheduler.schedule(
            self.inner.adjust_delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    ScannerStateMachine { inner }.clear_adjusting(generation);
                }
            }),
        );
        shared.pending_clear = Some(handle);
    }

    fn clear_adjusting(&self, generation: u64) {
        let mut shared = self.lock_shared();
        if shared.zoom_generation != generation {
            return;
        }
        shared.pending_clear = None;
        self.apply(&mut shared, ScannerIntent::ClearZoomAdjusting);
    }

    fn publish(&self, snapshot: &ScannerSnapshot) {
        self.lock_subscribers()
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
    }

    fn lock_shared(&self) -> MutexGuard<'_, Shared> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<Sender<ScannerSnapshot>>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ScannerStateMachine {
    fn default() -> Self {
        Self::with_thread_scheduler(ZOOM_ADJUST_DEBOUNCE)
    }
}
