use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

use super::yuv::{encode_jpeg, nv21_to_rgb, yuv420_to_nv21};
use crate::frame::CameraFrame;

/// Square input resolution expected by the garbage classifier.
pub const DEFAULT_TENSOR_SIZE: u32 = 256;

/// JPEG quality used for the intermediate still image.
pub const DEFAULT_JPEG_QUALITY: u8 = 50;

const NORMALIZE_MEAN: f32 = 127.5;
const NORMALIZE_STDDEV: f32 = 127.5;

/// Affine quantization parameters: `real = (q - zero_point) * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: f32,
}

impl Default for QuantParams {
    fn default() -> Self {
        Self {
            scale: 1.0 / 128.0,
            zero_point: 128.0,
        }
    }
}

impl QuantParams {
    /// Quantize a normalized value. Out-of-range results saturate to `u8`,
    /// fractional parts are truncated.
    pub fn quantize(&self, value: f32) -> u8 {
        (value / self.scale + self.zero_point).clamp(0.0, 255.0) as u8
    }

    pub fn dequantize(&self, q: u8) -> f32 {
        (q as f32 - self.zero_point) * self.scale
    }
}

/// Fixed-shape NHWC tensor handed to the classifier.
#[derive(Clone, Debug)]
pub struct InputTensor {
    shape: [usize; 4],
    data: Vec<u8>,
    quant: QuantParams,
}

impl InputTensor {
    pub(crate) fn new(shape: [usize; 4], data: Vec<u8>, quant: QuantParams) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(anyhow!(
                "tensor data length {} does not match shape {:?}",
                data.len(),
                shape
            ));
        }
        Ok(Self { shape, data, quant })
    }

    /// `[batch, height, width, channels]`.
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn quant(&self) -> QuantParams {
        self.quant
    }

    /// Values mapped back into the normalized `[-1, 1]` range.
    pub fn dequantized(&self) -> Vec<f32> {
        self.data.iter().map(|&q| self.quant.dequantize(q)).collect()
    }
}

/// Converts camera frames into classifier tensors.
///
/// Steps, in order:
/// 1. planar YUV -> JPEG still (lossy, `jpeg_quality`)
/// 2. JPEG -> RGB bitmap
/// 3. bilinear resize to `size x size`
/// 4. `(p - 127.5) / 127.5`
/// 5. quantize with `QuantParams`
///
/// Any failure along the way means the frame is skipped; no tensor is produced.
#[derive(Clone, Debug)]
pub struct ImageNormalizer {
    size: u32,
    jpeg_quality: u8,
    quant: QuantParams,
}

impl ImageNormalizer {
    pub fn new(size: u32, jpeg_quality: u8) -> Self {
        Self {
            size: size.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
            quant: QuantParams::default(),
        }
    }

    pub fn with_quant(mut self, quant: QuantParams) -> Self {
        self.quant = quant;
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn normalize(&self, frame: &CameraFrame) -> Result<InputTensor> {
        let still = self.still_image(frame)?;
        let bitmap = decode_still(&still)?;
        self.normalize_rgb(&bitmap)
    }

    /// Steps 3-5 on an already decoded bitmap.
    pub fn normalize_rgb(&self, bitmap: &RgbImage) -> Result<InputTensor> {
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(anyhow!("cannot normalize an empty bitmap"));
        }
        let resized = imageops::resize(bitmap, self.size, self.size, FilterType::Triangle);
        let data = resized
            .as_raw()
            .iter()
            .map(|&p| self.quant.quantize((p as f32 - NORMALIZE_MEAN) / NORMALIZE_STDDEV))
            .collect();
        let side = self.size as usize;
        InputTensor::new([1, side, side, 3], data, self.quant)
    }

    fn still_image(&self, frame: &CameraFrame) -> Result<Vec<u8>> {
        let nv21 = yuv420_to_nv21(frame)?;
        let rgb = nv21_to_rgb(&nv21, frame.width, frame.height)?;
        encode_jpeg(&rgb, frame.width, frame.height, self.jpeg_quality)
    }
}

impl Default for ImageNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TENSOR_SIZE, DEFAULT_JPEG_QUALITY)
    }
}

fn decode_still(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes).context("decode still image")?;
    Ok(image.to_rgb8())
}
