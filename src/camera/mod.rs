//! Camera session layer.
//!
//! A `CameraDevice` is the narrow hardware capability interface (bind, torch,
//! zoom, focus). `CameraSession` binds one device for one scanner screen, feeds
//! its frames through a one-slot channel to the `GarbageAnalyzer` thread, and
//! pushes the scanner's desired torch/zoom state back to the device.
//!
//! Nothing here is fatal: a failed bind leaves the session without a preview,
//! and per-frame failures are counted in `SessionStats` and skipped.

mod analyzer;
mod device;
mod session;
mod synthetic;

pub use analyzer::{FrameOutcome, GarbageAnalyzer};
pub use device::{CameraCapabilities, CameraDevice, FrameSink, SessionStats};
pub use session::{CameraSession, SessionStatus, FOCUS_AUTO_CANCEL};
pub use synthetic::{Actuation, SyntheticCamera, SyntheticCameraConfig};
