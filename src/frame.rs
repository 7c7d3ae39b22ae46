//! Camera frame container and the frame gate.
//!
//! - `CameraFrame`: Planar frame as delivered by the camera device. Bytes are private.
//! - `FrameThrottle`: Strict modulo gate for live scanning (every Nth frame).
//! - `FrameGate`: Format filter + mode gating in front of normalization.
//!
//! The gate never queues. A frame that is not forwarded is dropped on the spot;
//! backpressure beyond the gate is handled by the analyzer channel, which also drops.

use std::time::Instant;

use crate::scanner::ScannerMode;

/// Live mode forwards one frame out of this many.
pub const DEFAULT_LIVE_FRAME_INTERVAL: u32 = 10;

/// Encodings the normalization pipeline can decode.
pub const SUPPORTED_FORMATS: &[PixelFormat] = &[PixelFormat::Yuv420_888];

// ----------------------------------------------------------------------------
// CameraFrame: planar frame container
// ----------------------------------------------------------------------------

/// Pixel encoding reported by the camera device.
#[allow(non_camel_case_types)]
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Three planes (Y, U, V), chroma subsampled 2x2, arbitrary row/pixel strides.
    Yuv420_888,
    /// Packed RGBA, one plane.
    Rgba8888,
    /// Already-compressed still image, one plane.
    Jpeg,
    /// Anything the device reports that we have no name for.
    Other(i32),
}

/// One plane of a camera frame.
#[derive(Clone, Debug)]
pub struct ImagePlane {
    data: Vec<u8>,
    row_stride: usize,
    pixel_stride: usize,
}

impl ImagePlane {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }
}

/// A single frame delivered by the camera device.
///
/// Pixel data is not exposed publicly; only the normalization pipeline reads it.
pub struct CameraFrame {
    planes: Vec<ImagePlane>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Monotonic sequence number assigned by the device.
    pub sequence: u64,
    captured_at: Instant,
}

impl CameraFrame {
    pub fn new(
        planes: Vec<ImagePlane>,
        width: u32,
        height: u32,
        format: PixelFormat,
        sequence: u64,
    ) -> Self {
        Self {
            planes,
            width,
            height,
            format,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Build a YUV_420_888 frame from tightly packed I420 planes
    /// (Y: `w*h`, U and V: `ceil(w/2)*ceil(h/2)` each).
    pub fn from_i420(width: u32, height: u32, y: Vec<u8>, u: Vec<u8>, v: Vec<u8>, sequence: u64) -> Self {
        let chroma_width = (width as usize).div_ceil(2);
        Self::new(
            vec![
                ImagePlane::new(y, width as usize, 1),
                ImagePlane::new(u, chroma_width, 1),
                ImagePlane::new(v, chroma_width, 1),
            ],
            width,
            height,
            PixelFormat::Yuv420_888,
            sequence,
        )
    }

    pub fn planes(&self) -> &[ImagePlane] {
        &self.planes
    }

    /// Age of the frame since the device produced it.
    pub fn age_millis(&self) -> u128 {
        self.captured_at.elapsed().as_millis()
    }

    pub fn byte_len(&self) -> usize {
        self.planes.iter().map(ImagePlane::len).sum()
    }
}

// ----------------------------------------------------------------------------
// FrameThrottle: strict modulo gate
// ----------------------------------------------------------------------------

/// Forwards exactly one of every `interval` frames.
///
/// The counter resets only when a frame is forwarded, so forwarded positions are
/// `interval, 2*interval, ...` relative to the last reset.
#[derive(Clone, Debug)]
pub struct FrameThrottle {
    interval: u32,
    counter: u32,
}

impl FrameThrottle {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            counter: 0,
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Count a frame. Returns true when this frame should be forwarded.
    pub fn admit(&mut self) -> bool {
        self.counter += 1;
        if self.counter % self.interval != 0 {
            return false;
        }
        self.counter = 0;
        true
    }

    pub fn pending(&self) -> u32 {
        self.counter
    }
}

impl Default for FrameThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_FRAME_INTERVAL)
    }
}

// ----------------------------------------------------------------------------
// FrameGate: format filter + mode gating
// ----------------------------------------------------------------------------

/// Why a frame did not pass the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameRejection {
    /// Encoding is not in `SUPPORTED_FORMATS`.
    UnsupportedFormat(PixelFormat),
    /// Live mode, not the Nth frame.
    Throttled,
    /// Photo mode without a pending capture request.
    AwaitingCapture,
}

/// Gate in front of the normalization pipeline.
#[derive(Clone, Debug)]
pub struct FrameGate {
    throttle: FrameThrottle,
}

impl FrameGate {
    pub fn new(live_frame_interval: u32) -> Self {
        Self {
            throttle: FrameThrottle::new(live_frame_interval),
        }
    }

    pub fn is_supported(format: PixelFormat) -> bool {
        SUPPORTED_FORMATS.contains(&format)
    }

    /// Accept or reject a frame.
    ///
    /// Live mode consults the throttle and ignores `take_picture`. Photo mode bypasses
    /// the throttle entirely and forwards only while a capture request is pending.
    pub fn accept(
        &mut self,
        frame: CameraFrame,
        mode: ScannerMode,
        take_picture: bool,
    ) -> Result<CameraFrame, FrameRejection> {
        if !Self::is_supported(frame.format) {
            return Err(FrameRejection::UnsupportedFormat(frame.format));
        }
        match mode {
            ScannerMode::Live => {
                if self.throttle.admit() {
                    Ok(frame)
                } else {
                    Err(FrameRejection::Throttled)
                }
            }
            ScannerMode::Photo => {
                if take_picture {
                    Ok(frame)
                } else {
                    Err(FrameRejection::AwaitingCapture)
                }
            }
        }
    }

    pub fn throttle(&self) -> &FrameThrottle {
        &self.throttle
    }
}

impl Default for FrameGate {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_FRAME_INTERVAL)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_frame(seq: u64) -> CameraFrame {
        CameraFrame::from_i420(4, 4, vec![128; 16], vec![128; 4], vec![128; 4], seq)
    }

    #[test]
    fn throttle_forwards_every_tenth_frame() {
        let mut throttle = FrameThrottle::new(10);
        let forwarded: Vec<usize> = (1..=25).filter(|_| throttle.admit()).collect();
        assert_eq!(forwarded.len(), 2);
        assert_eq!(throttle.pending(), 5);
    }

    #[test]
    fn throttle_positions_are_relative_to_last_reset() {
        let mut throttle = FrameThrottle::new(10);
        let mut positions = Vec::new();
        for i in 1..=25 {
            if throttle.admit() {
                positions.push(i);
            }
        }
        assert_eq!(positions, vec![10, 20]);
    }

    #[test]
    fn zero_interval_is_treated_as_one() {
        let mut throttle = FrameThrottle::new(0);
        assert!(throttle.admit());
        assert!(throttle.admit());
    }

    #[test]
    fn gate_rejects_unsupported_formats_before_counting() {
        let mut gate = FrameGate::new(2);
        let frame = CameraFrame::new(
            vec![ImagePlane::new(vec![0; 64], 16, 4)],
            4,
            4,
            PixelFormat::Rgba8888,
            1,
        );
        assert_eq!(
            gate.accept(frame, ScannerMode::Live, false).err(),
            Some(FrameRejection::UnsupportedFormat(PixelFormat::Rgba8888))
        );
        assert_eq!(gate.throttle().pending(), 0);
    }

    #[test]
    fn photo_mode_requires_capture_request() {
        let mut gate = FrameGate::default();
        for seq in 0..30 {
            assert_eq!(
                gate.accept(gray_frame(seq), ScannerMode::Photo, false).err(),
                Some(FrameRejection::AwaitingCapture)
            );
        }
        assert!(gate.accept(gray_frame(31), ScannerMode::Photo, true).is_ok());
        assert_eq!(gate.throttle().pending(), 0);
    }

    #[test]
    fn live_mode_ignores_capture_request() {
        let mut gate = FrameGate::new(3);
        assert_eq!(
            gate.accept(gray_frame(1), ScannerMode::Live, true).err(),
            Some(FrameRejection::Throttled)
        );
        assert!(gate.accept(gray_frame(2), ScannerMode::Live, true).is_err());
        assert!(gate.accept(gray_frame(3), ScannerMode::Live, false).is_ok());
    }
}
