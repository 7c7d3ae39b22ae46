//! Recyclable waste scanner core.
//!
//! This crate implements the camera-driven scanner that recognises recyclable
//! waste categories and resolves them into educational content posts.
//!
//! # Architecture
//!
//! Frames flow one way through the pipeline:
//!
//! 1. **Camera session** (`camera`): binds the device, actuates torch/zoom/focus,
//!    and hands frames to the analyzer thread.
//! 2. **Frame gate** (`frame`): drops unsupported encodings and throttles live mode.
//! 3. **Normalization** (`ingest`): planar YUV -> JPEG -> RGB -> 256x256 quantized tensor.
//! 4. **Classification** (`classify`): ranks labels and maps the winner to a `GarbageType`.
//! 5. **Scanner state** (`scanner`): serialized intent reducers producing immutable snapshots.
//!
//! Nothing in the pipeline is fatal: every failure degrades a feature (no preview,
//! no result card) and the next frame is an implicit retry.
//!
//! # Module Structure
//!
//! - `frame`: Camera frame container, pixel formats, live-mode throttle
//! - `ingest`: Frame normalization into classifier tensors
//! - `classify`: Classifier backends, label table, adapter, model lifecycle
//! - `scanner`: Scanner state machine, snapshots, debounce scheduling
//! - `camera`: Camera capability trait, session controller, analyzer worker
//! - `content`: Content posts and repositories
//! - `config`: File + environment configuration
//! - `ui`: Terminal progress output for the demo binary

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod camera;
pub mod classify;
pub mod config;
pub mod content;
pub mod frame;
pub mod ingest;
pub mod scanner;
pub mod ui;

pub use camera::{
    CameraCapabilities, CameraDevice, CameraSession, FrameOutcome, FrameSink, GarbageAnalyzer,
    SessionStats, SessionStatus, SyntheticCamera, SyntheticCameraConfig,
};
pub use classify::{
    garbage_type_for_label, Category, ClassificationAdapter, ClassifierBackend, ModelSlot,
    StubClassifier,
};
#[cfg(feature = "backend-tract")]
pub use classify::TractClassifier;
pub use config::{ClassifierKind, ScannerConfig};
pub use content::{ContentRepository, InMemoryContentRepository, Post, PostsFeed};
pub use frame::{CameraFrame, FrameGate, FrameThrottle, ImagePlane, PixelFormat};
pub use ingest::{ImageNormalizer, InputTensor, QuantParams};
pub use scanner::{
    FocusInfo, ManualScheduler, ScannerMode, ScannerSnapshot, ScannerStateMachine, ScannerView,
    Scheduler, ThreadScheduler, TorchMode, ZoomInfo, ZoomPreset,
};

// -------------------- Garbage Types --------------------

/// Domain category of recyclable waste.
///
/// This is the join key between classifier output and content lookup.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GarbageType {
    Paper,
    Glass,
    Metal,
    Organic,
    Plastic,
}

impl GarbageType {
    pub const ALL: [GarbageType; 5] = [
        GarbageType::Paper,
        GarbageType::Glass,
        GarbageType::Metal,
        GarbageType::Organic,
        GarbageType::Plastic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GarbageType::Paper => "paper",
            GarbageType::Glass => "glass",
            GarbageType::Metal => "metal",
            GarbageType::Organic => "organic",
            GarbageType::Plastic => "plastic",
        }
    }
}

impl fmt::Display for GarbageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_type_names_are_lowercase_and_unique() {
        let names: Vec<&str> = GarbageType::ALL.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["paper", "glass", "metal", "organic", "plastic"]);
        assert_eq!(GarbageType::Plastic.to_string(), "plastic");
    }
}
