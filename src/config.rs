use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::frame::DEFAULT_LIVE_FRAME_INTERVAL;
use crate::ingest::normalize::{DEFAULT_JPEG_QUALITY, DEFAULT_TENSOR_SIZE};

const DEFAULT_ZOOM_DEBOUNCE_MS: u64 = 2500;
const DEFAULT_FOCUS_AUTO_CANCEL_SECS: u64 = 3;
const DEFAULT_CAMERA_DEVICE: &str = "stub://back_camera";
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;

#[derive(Debug, Deserialize, Default)]
struct ScannerConfigFile {
    live_frame_interval: Option<u32>,
    tensor_size: Option<u32>,
    jpeg_quality: Option<u8>,
    zoom_adjust_debounce_ms: Option<u64>,
    focus_auto_cancel_secs: Option<u64>,
    classifier: Option<ClassifierConfigFile>,
    camera: Option<CameraConfigFile>,
    content: Option<ContentConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ContentConfigFile {
    posts_path: Option<PathBuf>,
    fail_every: Option<u32>,
}

/// Which classifier runtime to load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierKind {
    Stub,
    Tract,
}

impl ClassifierKind {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(ClassifierKind::Stub),
            "tract" => Ok(ClassifierKind::Tract),
            other => Err(anyhow!(
                "unknown classifier backend {:?} (expected \"stub\" or \"tract\")",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub live_frame_interval: u32,
    pub tensor_size: u32,
    pub jpeg_quality: u8,
    pub zoom_adjust_debounce: Duration,
    pub focus_auto_cancel: Duration,
    pub classifier: ClassifierSettings,
    pub camera: CameraSettings,
    pub content: ContentSettings,
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub backend: ClassifierKind,
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    /// JSON posts feed; the built-in posts are used when unset.
    pub posts_path: Option<PathBuf>,
    /// Every n-th feed request fails (0 = never).
    pub fail_every: u32,
}

impl ScannerConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SCANNER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScannerConfigFile) -> Result<Self> {
        let backend = match file.classifier.as_ref().and_then(|c| c.backend.as_deref()) {
            Some(name) => ClassifierKind::parse(name)?,
            None => ClassifierKind::Stub,
        };
        let classifier = ClassifierSettings {
            backend,
            model_path: file.classifier.and_then(|c| c.model_path),
        };
        let camera = CameraSettings {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let content = ContentSettings {
            posts_path: file.content.as_ref().and_then(|c| c.posts_path.clone()),
            fail_every: file
                .content
                .and_then(|c| c.fail_every)
                .unwrap_or(crate::content::DEFAULT_FAIL_EVERY),
        };
        Ok(Self {
            live_frame_interval: file
                .live_frame_interval
                .unwrap_or(DEFAULT_LIVE_FRAME_INTERVAL),
            tensor_size: file.tensor_size.unwrap_or(DEFAULT_TENSOR_SIZE),
            jpeg_quality: file.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
            zoom_adjust_debounce: Duration::from_millis(
                file.zoom_adjust_debounce_ms
                    .unwrap_or(DEFAULT_ZOOM_DEBOUNCE_MS),
            ),
            focus_auto_cancel: Duration::from_secs(
                file.focus_auto_cancel_secs
                    .unwrap_or(DEFAULT_FOCUS_AUTO_CANCEL_SECS),
            ),
            classifier,
            camera,
            content,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(interval) = std::env::var("SCANNER_LIVE_FRAME_INTERVAL") {
            self.live_frame_interval = interval.trim().parse().map_err(|_| {
                anyhow!("SCANNER_LIVE_FRAME_INTERVAL must be a positive integer")
            })?;
        }
        if let Ok(quality) = std::env::var("SCANNER_JPEG_QUALITY") {
            self.jpeg_quality = quality
                .trim()
                .parse()
                .map_err(|_| anyhow!("SCANNER_JPEG_QUALITY must be an integer in 1..=100"))?;
        }
        if let Ok(debounce) = std::env::var("SCANNER_ZOOM_DEBOUNCE_MS") {
            let millis: u64 = debounce.trim().parse().map_err(|_| {
                anyhow!("SCANNER_ZOOM_DEBOUNCE_MS must be an integer number of milliseconds")
            })?;
            self.zoom_adjust_debounce = Duration::from_millis(millis);
        }
        if let Ok(backend) = std::env::var("SCANNER_CLASSIFIER_BACKEND") {
            if !backend.trim().is_empty() {
                self.classifier.backend = ClassifierKind::parse(&backend)?;
            }
        }
        if let Ok(path) = std::env::var("SCANNER_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.classifier.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(device) = std::env::var("SCANNER_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.live_frame_interval == 0 {
            return Err(anyhow!("live_frame_interval must be at least 1"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            ));
        }
        if self.tensor_size == 0 {
            return Err(anyhow!("tensor_size must be at least 1"));
        }
        if self.camera.fps == 0 {
            return Err(anyhow!("camera fps must be at least 1"));
        }
        if self.classifier.backend == ClassifierKind::Tract && self.classifier.model_path.is_none()
        {
            return Err(anyhow!("tract classifier requires classifier.model_path"));
        }
        Ok(())
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            live_frame_interval: DEFAULT_LIVE_FRAME_INTERVAL,
            tensor_size: DEFAULT_TENSOR_SIZE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            zoom_adjust_debounce: Duration::from_millis(DEFAULT_ZOOM_DEBOUNCE_MS),
            focus_auto_cancel: Duration::from_secs(DEFAULT_FOCUS_AUTO_CANCEL_SECS),
            classifier: ClassifierSettings {
                backend: ClassifierKind::Stub,
                model_path: None,
            },
            camera: CameraSettings {
                device: DEFAULT_CAMERA_DEVICE.to_string(),
                fps: DEFAULT_CAMERA_FPS,
                width: DEFAULT_CAMERA_WIDTH,
                height: DEFAULT_CAMERA_HEIGHT,
            },
            content: ContentSettings {
                posts_path: None,
                fail_every: crate::content::DEFAULT_FAIL_EVERY,
            },
        }
    }
}

fn read_config_file(path: &Path) -> Result<ScannerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
