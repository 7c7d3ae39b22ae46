use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use super::device::{CameraCapabilities, CameraDevice, FrameSink};
use crate::frame::{CameraFrame, ImagePlane, PixelFormat};

#[derive(Clone, Debug)]
pub struct SyntheticCameraConfig {
    pub device: String,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub has_flash_unit: bool,
    pub min_zoom_ratio: f32,
    pub max_zoom_ratio: f32,
    /// Number of initial `bind` calls that fail.
    pub fail_binds: u32,
    pub format: PixelFormat,
    /// Stop producing after this many frames (None = until unbound).
    pub max_frames: Option<u64>,
}

impl Default for SyntheticCameraConfig {
    fn default() -> Self {
        Self {
            device: "stub://back_camera".to_string(),
            fps: 30,
            width: 640,
            height: 480,
            has_flash_unit: true,
            min_zoom_ratio: 1.0,
            max_zoom_ratio: 4.0,
            fail_binds: 0,
            format: PixelFormat::Yuv420_888,
            max_frames: None,
        }
    }
}

/// Control calls the camera received, in order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Actuation {
    Torch(bool),
    Zoom(f32),
    Focus { x: f32, y: f32, auto_cancel: Duration },
}

struct Producer {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Camera that fabricates frames on a background thread.
///
/// Used by the demo binary and tests in place of real hardware.
pub struct SyntheticCamera {
    config: SyntheticCameraConfig,
    producer: Option<Producer>,
    binds: u32,
    actuations: Arc<Mutex<Vec<Actuation>>>,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticCameraConfig) -> Self {
        Self {
            config,
            producer: None,
            binds: 0,
            actuations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared view of the actuation log; stays valid after the camera moves
    /// into a session.
    pub fn actuation_log(&self) -> Arc<Mutex<Vec<Actuation>>> {
        self.actuations.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.producer.is_some()
    }

    fn record(&self, actuation: Actuation) -> Result<()> {
        if self.producer.is_none() {
            return Err(anyhow!("camera {} is not bound", self.config.device));
        }
        self.actuations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(actuation);
        Ok(())
    }
}

impl CameraDevice for SyntheticCamera {
    fn name(&self) -> &str {
        &self.config.device
    }

    fn bind(&mut self, sink: FrameSink) -> Result<CameraCapabilities> {
        self.unbind();
        self.binds += 1;
        if self.binds <= self.config.fail_binds {
            return Err(anyhow!(
                "camera {} unavailable (bind attempt {})",
                self.config.device,
                self.binds
            ));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let mut scene = SyntheticScene::new(&self.config);
        let period = Duration::from_secs(1) / self.config.fps.max(1);
        let max_frames = self.config.max_frames;
        let thread_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(format!("camera-{}", self.config.device))
            .spawn(move || {
                while !thread_stop.load(Ordering::SeqCst) {
                    if max_frames.is_some_and(|max| scene.frame_count >= max) {
                        break;
                    }
                    if !sink.deliver(scene.next_frame()) {
                        break;
                    }
                    thread::sleep(period);
                }
            })
            .context("spawn camera producer thread")?;

        log::info!(
            "SyntheticCamera: bound {} ({}x{} @ {} fps, synthetic)",
            self.config.device,
            self.config.width,
            self.config.height,
            self.config.fps
        );
        self.producer = Some(Producer { stop, handle });
        Ok(CameraCapabilities {
            has_flash_unit: self.config.has_flash_unit,
            min_zoom_ratio: self.config.min_zoom_ratio,
            max_zoom_ratio: self.config.max_zoom_ratio,
        })
    }

    fn unbind(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.stop.store(true, Ordering::SeqCst);
            if producer.handle.join().is_err() {
                log::warn!("camera producer thread panicked");
            }
            log::debug!("SyntheticCamera: unbound {}", self.config.device);
        }
    }

    fn set_torch(&mut self, on: bool) -> Result<()> {
        if on && !self.config.has_flash_unit {
            return Err(anyhow!("camera {} has no flash unit", self.config.device));
        }
        self.record(Actuation::Torch(on))
    }

    fn set_zoom_ratio(&mut self, ratio: f32) -> Result<()> {
        let ratio = ratio.clamp(self.config.min_zoom_ratio, self.config.max_zoom_ratio);
        self.record(Actuation::Zoom(ratio))
    }

    fn start_focus(&mut self, x: f32, y: f32, auto_cancel: Duration) -> Result<()> {
        self.record(Actuation::Focus { x, y, auto_cancel })
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        self.unbind();
    }
}

struct SyntheticScene {
    width: u32,
    height: u32,
    format: PixelFormat,
    frame_count: u64,
    /// Changes every 50 frames to simulate a new object in view.
    scene_state: u8,
}

impl SyntheticScene {
    fn new(config: &SyntheticCameraConfig) -> Self {
        Self {
            width: config.width.max(2),
            height: config.height.max(2),
            format: config.format,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn next_frame(&mut self) -> CameraFrame {
        self.frame_count += 1;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let (w, h) = (self.width as usize, self.height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        // Small per-frame sensor noise so consecutive frames never hash alike.
        let noise = u64::from(rand::random::<u8>() % 4);
        let shift = self.frame_count + self.scene_state as u64 + noise;

        let y: Vec<u8> = (0..w * h)
            .map(|i| ((i as u64 + shift) % 256) as u8)
            .collect();
        let u = vec![128u8.wrapping_add(self.scene_state.wrapping_mul(16)); cw * ch];
        let v = vec![128u8.wrapping_sub(self.scene_state.wrapping_mul(16)); cw * ch];

        match self.format {
            PixelFormat::Yuv420_888 => {
                CameraFrame::from_i420(self.width, self.height, y, u, v, self.frame_count)
            }
            other => CameraFrame::new(
                vec![ImagePlane::new(y, w, 1)],
                self.width,
                self.height,
                other,
                self.frame_count,
            ),
        }
    }
}
