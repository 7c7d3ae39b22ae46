//! Frame normalization.
//!
//! Turns device-native planar frames into the fixed-shape quantized tensor the
//! garbage classifier expects. The pipeline is responsible for:
//! - Repacking YUV_420_888 planes (any stride layout) into NV21
//! - Producing a lossy still image and decoding it back to RGB
//! - Resizing, normalizing and quantizing into an `InputTensor`
//!
//! The pipeline MUST NOT:
//! - Retain frames or tensors beyond the call
//! - Panic on malformed input (it returns an error and the frame is skipped)

pub mod normalize;
mod yuv;

pub use normalize::{
    ImageNormalizer, InputTensor, QuantParams, DEFAULT_JPEG_QUALITY, DEFAULT_TENSOR_SIZE,
};
