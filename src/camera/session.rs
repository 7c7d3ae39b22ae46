use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::analyzer::GarbageAnalyzer;
use super::device::{CameraDevice, FrameSink, SessionStats};
use crate::frame::CameraFrame;
use crate::scanner::{ScannerSnapshot, ScannerStateMachine};

/// Focus/metering reverts to continuous auto focus after this long.
pub const FOCUS_AUTO_CANCEL: Duration = Duration::from_secs(3);

const ANALYZER_POLL: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not started yet.
    Idle,
    Previewing,
    /// Bind failed; controls still work, there is just no live preview.
    PreviewUnavailable,
    Closed,
}

/// One camera session for one scanner screen.
///
/// Owns the device and the analyzer thread. Frames flow device -> sink ->
/// analyzer thread; desired torch/zoom flow state machine -> `render` -> device.
pub struct CameraSession<D: CameraDevice> {
    device: D,
    machine: ScannerStateMachine,
    sink: FrameSink,
    pending: Option<(GarbageAnalyzer, Receiver<CameraFrame>)>,
    worker: Option<JoinHandle<()>>,
    closed: Arc<AtomicBool>,
    stats: Arc<SessionStats>,
    status: SessionStatus,
    focus_auto_cancel: Duration,
}

impl<D: CameraDevice> CameraSession<D> {
    pub fn new(device: D, machine: ScannerStateMachine, analyzer: GarbageAnalyzer) -> Self {
        let stats = analyzer.stats();
        let closed = analyzer.closed_flag();
        let (sink, rx) = FrameSink::pair(stats.clone());
        Self {
            device,
            machine,
            sink,
            pending: Some((analyzer, rx)),
            worker: None,
            closed,
            stats,
            status: SessionStatus::Idle,
            focus_auto_cancel: FOCUS_AUTO_CANCEL,
        }
    }

    pub fn with_focus_auto_cancel(mut self, auto_cancel: Duration) -> Self {
        self.focus_auto_cancel = auto_cancel;
        self
    }

    /// Bind the camera and start analysis.
    ///
    /// A bind failure is logged and leaves the session in
    /// `PreviewUnavailable`; it is not returned as an error. Only a failure to
    /// start the analyzer thread is.
    pub fn start(&mut self) -> Result<SessionStatus> {
        if self.status == SessionStatus::Closed {
            return Ok(self.status);
        }
        self.spawn_analyzer()?;

        self.device.unbind();
        match self.device.bind(self.sink.clone()) {
            Ok(caps) => {
                log::info!(
                    "camera {} bound (flash: {}, zoom {}..{})",
                    self.device.name(),
                    caps.has_flash_unit,
                    caps.min_zoom_ratio,
                    caps.max_zoom_ratio
                );
                self.machine.set_has_flash_unit(caps.has_flash_unit);
                self.machine
                    .apply_hardware_zoom_bounds(caps.min_zoom_ratio, caps.max_zoom_ratio);
                self.status = SessionStatus::Previewing;
                self.render();
            }
            Err(e) => {
                log::error!("camera {} bind failed: {:#}", self.device.name(), e);
                self.status = SessionStatus::PreviewUnavailable;
            }
        }
        Ok(self.status)
    }

    /// Unbind and bind again, e.g. after the user asks to retry the preview.
    pub fn retry_bind(&mut self) -> Result<SessionStatus> {
        self.start()
    }

    /// Push the current desired torch and zoom state to the device.
    ///
    /// Call whenever the preview surface redraws; it applies the full desired
    /// state each time rather than diffing.
    pub fn render(&mut self) -> ScannerSnapshot {
        let snapshot = self.machine.snapshot();
        if self.status != SessionStatus::Previewing {
            return snapshot;
        }
        if snapshot.has_flash_unit() {
            if let Err(e) = self.device.set_torch(snapshot.torch_mode().is_on()) {
                log::warn!("torch actuation failed: {:#}", e);
            }
        }
        if let Err(e) = self
            .device
            .set_zoom_ratio(snapshot.zoom_info().current_ratio())
        {
            log::warn!("zoom actuation failed: {:#}", e);
        }
        snapshot
    }

    /// Tap-to-focus: meter at the point and show the focus indicator.
    pub fn focus_at(&mut self, x: f32, y: f32) -> ScannerSnapshot {
        if self.status == SessionStatus::Closed {
            return self.machine.snapshot();
        }
        if self.status == SessionStatus::Previewing {
            if let Err(e) = self.device.start_focus(x, y, self.focus_auto_cancel) {
                log::warn!("focus at ({:.1}, {:.1}) failed: {:#}", x, y, e);
            }
        }
        self.machine.set_focus(x, y)
    }

    /// Unbind the camera, stop analysis, release the model and cancel timers.
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.status == SessionStatus::Closed {
            return;
        }
        self.closed.store(true, Ordering::SeqCst);
        self.device.unbind();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("analyzer thread panicked");
            }
        }
        if let Some((mut analyzer, _)) = self.pending.take() {
            analyzer.close();
        }
        self.machine.shutdown();
        self.status = SessionStatus::Closed;
        log::info!(
            "camera session closed: {} frames received, {} classified",
            self.stats.frames_received(),
            self.stats.classified()
        );
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }

    pub fn machine(&self) -> &ScannerStateMachine {
        &self.machine
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn spawn_analyzer(&mut self) -> Result<()> {
        let Some((mut analyzer, rx)) = self.pending.take() else {
            return Ok(());
        };
        let closed = self.closed.clone();
        let worker = thread::Builder::new()
            .name("scanner-analyzer".to_string())
            .spawn(move || {
                while !closed.load(Ordering::SeqCst) {
                    match rx.recv_timeout(ANALYZER_POLL) {
                        Ok(frame) => {
                            let outcome = analyzer.analyze(frame);
                            log::trace!("frame outcome: {:?}", outcome);
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                analyzer.close();
            })
            .context("spawn analyzer thread")?;
        self.worker = Some(worker);
        Ok(())
    }
}

impl<D: CameraDevice> Drop for CameraSession<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
