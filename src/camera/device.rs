use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::frame::CameraFrame;

/// Hardware facts reported once a camera is bound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraCapabilities {
    pub has_flash_unit: bool,
    pub min_zoom_ratio: f32,
    pub max_zoom_ratio: f32,
}

/// Narrow camera capability interface.
///
/// Everything platform-specific lives behind this trait so the scanner core
/// can be driven by real hardware or a synthetic source alike.
pub trait CameraDevice: Send {
    /// Device identifier (for logs).
    fn name(&self) -> &str;

    /// Acquire the camera and start delivering frames into `sink`.
    fn bind(&mut self, sink: FrameSink) -> Result<CameraCapabilities>;

    /// Stop frame delivery and release the camera. Must be idempotent.
    fn unbind(&mut self);

    fn set_torch(&mut self, on: bool) -> Result<()>;

    fn set_zoom_ratio(&mut self, ratio: f32) -> Result<()>;

    /// Meter and focus at a preview-space point, reverting after `auto_cancel`.
    fn start_focus(&mut self, x: f32, y: f32, auto_cancel: Duration) -> Result<()>;
}

/// Frame/analysis counters for one camera session.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub(crate) frames_received: AtomicU64,
    pub(crate) frames_dropped: AtomicU64,
    pub(crate) unsupported: AtomicU64,
    pub(crate) throttled: AtomicU64,
    pub(crate) awaiting_capture: AtomicU64,
    pub(crate) decode_failures: AtomicU64,
    pub(crate) classifier_failures: AtomicU64,
    pub(crate) classified: AtomicU64,
}

impl SessionStats {
    /// Frames that reached the analyzer.
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Frames dropped because the analyzer was still busy.
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn unsupported(&self) -> u64 {
        self.unsupported.load(Ordering::Relaxed)
    }

    pub fn throttled(&self) -> u64 {
        self.throttled.load(Ordering::Relaxed)
    }

    pub fn awaiting_capture(&self) -> u64 {
        self.awaiting_capture.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub fn classifier_failures(&self) -> u64 {
        self.classifier_failures.load(Ordering::Relaxed)
    }

    pub fn classified(&self) -> u64 {
        self.classified.load(Ordering::Relaxed)
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Producer side of the analyzer channel.
///
/// Holds at most one frame in flight: if the analyzer has not picked up the
/// previous frame yet, the new one is dropped.
#[derive(Clone)]
pub struct FrameSink {
    tx: Sender<CameraFrame>,
    stats: Arc<SessionStats>,
}

impl FrameSink {
    /// Create a sink and the receiver the analyzer drains.
    pub fn pair(stats: Arc<SessionStats>) -> (FrameSink, Receiver<CameraFrame>) {
        let (tx, rx) = bounded(1);
        (FrameSink { tx, stats }, rx)
    }

    /// Offer a frame. Returns false once the analyzer side is gone.
    pub fn deliver(&self, frame: CameraFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                SessionStats::bump(&self.stats.frames_dropped);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
