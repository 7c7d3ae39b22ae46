use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use super::device::SessionStats;
use crate::classify::{backend_loader, ClassificationAdapter, ModelSlot};
use crate::config::ScannerConfig;
use crate::frame::{CameraFrame, FrameGate, FrameRejection, PixelFormat};
use crate::ingest::ImageNormalizer;
use crate::scanner::{ScannerMode, ScannerStateMachine};
use crate::GarbageType;

/// What happened to one frame. None of these are errors for the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    UnsupportedFormat(PixelFormat),
    Throttled,
    AwaitingCapture,
    DecodeFailed,
    ClassifierFailed,
    Classified(GarbageType),
    SessionClosed,
}

/// Frame analyzer: gate -> normalize -> classify -> record.
///
/// Runs on the session's analyzer thread. The scanner mode and capture flag are
/// read from the state machine for every frame.
pub struct GarbageAnalyzer {
    gate: FrameGate,
    normalizer: ImageNormalizer,
    adapter: ClassificationAdapter,
    machine: ScannerStateMachine,
    stats: Arc<SessionStats>,
    closed: Arc<AtomicBool>,
}

impl GarbageAnalyzer {
    pub fn new(machine: ScannerStateMachine, adapter: ClassificationAdapter) -> Self {
        Self {
            gate: FrameGate::default(),
            normalizer: ImageNormalizer::default(),
            adapter,
            machine,
            stats: Arc::new(SessionStats::default()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Analyzer wired from configuration: frame interval, tensor size, JPEG
    /// quality and a lazily loaded classifier backend.
    pub fn from_config(machine: ScannerStateMachine, config: &ScannerConfig) -> Result<Self> {
        let loader = backend_loader(&config.classifier, config.tensor_size)?;
        let adapter = ClassificationAdapter::new(ModelSlot::new(loader));
        Ok(Self::new(machine, adapter)
            .with_gate(FrameGate::new(config.live_frame_interval))
            .with_normalizer(ImageNormalizer::new(config.tensor_size, config.jpeg_quality)))
    }

    pub fn with_gate(mut self, gate: FrameGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_normalizer(mut self, normalizer: ImageNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        self.stats.clone()
    }

    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    /// Stop classifying. Frames offered afterwards report `SessionClosed`.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.adapter.release();
    }

    pub fn analyze(&mut self, frame: CameraFrame) -> FrameOutcome {
        SessionStats::bump(&self.stats.frames_received);
        if self.is_closed() {
            return FrameOutcome::SessionClosed;
        }

        let (mode, take_picture) = self.machine.gate_inputs();
        let capture = mode == ScannerMode::Photo && take_picture;
        let frame = match self.gate.accept(frame, mode, take_picture) {
            Ok(frame) => frame,
            Err(FrameRejection::UnsupportedFormat(format)) => {
                log::trace!("dropping frame with unsupported format {:?}", format);
                SessionStats::bump(&self.stats.unsupported);
                return FrameOutcome::UnsupportedFormat(format);
            }
            Err(FrameRejection::Throttled) => {
                SessionStats::bump(&self.stats.throttled);
                return FrameOutcome::Throttled;
            }
            Err(FrameRejection::AwaitingCapture) => {
                SessionStats::bump(&self.stats.awaiting_capture);
                return FrameOutcome::AwaitingCapture;
            }
        };

        let tensor = match self.normalizer.normalize(&frame) {
            Ok(tensor) => tensor,
            Err(e) => {
                log::debug!("skipping frame #{}: {:#}", frame.sequence, e);
                SessionStats::bump(&self.stats.decode_failures);
                return FrameOutcome::DecodeFailed;
            }
        };

        if self.is_closed() {
            return FrameOutcome::SessionClosed;
        }

        match self.adapter.classify(&tensor) {
            Ok(garbage) => {
                self.machine.record_classification(garbage, capture);
                SessionStats::bump(&self.stats.classified);
                FrameOutcome::Classified(garbage)
            }
            Err(e) => {
                log::warn!("classification failed for frame #{}: {:#}", frame.sequence, e);
                SessionStats::bump(&self.stats.classifier_failures);
                FrameOutcome::ClassifierFailed
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Category, ModelSlot, StubClassifier};
    use crate::frame::ImagePlane;
    use crate::scanner::{ManualScheduler, ScannerMode, ZOOM_ADJUST_DEBOUNCE};

    fn analyzer(script: Vec<Vec<Category>>) -> GarbageAnalyzer {
        let machine =
            ScannerStateMachine::new(Arc::new(ManualScheduler::new()), ZOOM_ADJUST_DEBOUNCE);
        let adapter =
            ClassificationAdapter::new(ModelSlot::preloaded(StubClassifier::scripted(script)));
        GarbageAnalyzer::new(machine, adapter).with_normalizer(ImageNormalizer::new(8, 50))
    }

    fn gray(seq: u64) -> CameraFrame {
        CameraFrame::from_i420(8, 8, vec![128; 64], vec![128; 16], vec![128; 16], seq)
    }

    #[test]
    fn live_mode_classifies_every_tenth_frame() {
        let mut analyzer = analyzer(vec![vec![Category::new("2", 0.8)]]);
        analyzer.machine.set_mode(ScannerMode::Live);
        let outcomes: Vec<FrameOutcome> = (1..=25).map(|seq| analyzer.analyze(gray(seq))).collect();
        let classified: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| matches!(o, FrameOutcome::Classified(_)))
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(classified, vec![10, 20]);
        assert_eq!(analyzer.stats().classified(), 2);
        assert_eq!(analyzer.stats().throttled(), 23);
        assert_eq!(
            analyzer.machine.snapshot().last_classification(),
            Some(GarbageType::Metal)
        );
    }

    #[test]
    fn decode_failure_keeps_capture_pending() {
        let mut analyzer = analyzer(vec![vec![Category::new("4", 0.9)]]);
        analyzer.machine.set_take_picture(true);
        let broken = CameraFrame::new(
            vec![ImagePlane::new(vec![0; 3], 1, 1)],
            8,
            8,
            PixelFormat::Yuv420_888,
            1,
        );
        assert_eq!(analyzer.analyze(broken), FrameOutcome::DecodeFailed);
        assert!(analyzer.machine.snapshot().take_picture_requested());

        assert_eq!(
            analyzer.analyze(gray(2)),
            FrameOutcome::Classified(GarbageType::Plastic)
        );
        assert!(!analyzer.machine.snapshot().take_picture_requested());
        assert_eq!(analyzer.analyze(gray(3)), FrameOutcome::AwaitingCapture);
    }

    #[test]
    fn closed_analyzer_stops_classifying() {
        let mut analyzer = analyzer(vec![vec![Category::new("1", 0.9)]]);
        analyzer.machine.set_take_picture(true);
        analyzer.close();
        assert_eq!(analyzer.analyze(gray(1)), FrameOutcome::SessionClosed);
        assert_eq!(analyzer.machine.snapshot().last_classification(), None);
    }
}
