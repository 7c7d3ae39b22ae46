#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::backend::ClassifierBackend;
use crate::classify::labels::MODEL_LABELS;
use crate::classify::result::Category;
use crate::ingest::InputTensor;

/// Tract-based backend for ONNX garbage classifiers.
///
/// The model is expected to take a `1x3xHxW` f32 input in `[-1, 1]` and produce
/// one score per label. It performs no network I/O and writes nothing to disk.
pub struct TractClassifier {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    size: u32,
    labels: Vec<String>,
}

impl TractClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, size as usize, size as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            size,
            labels: MODEL_LABELS.iter().map(|label| label.to_string()).collect(),
        })
    }

    /// Override the label list (index order must match the model output).
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    fn build_input(&self, tensor: &InputTensor) -> Result<Tensor> {
        let [batch, height, width, channels] = tensor.shape();
        if batch != 1 || channels != 3 {
            return Err(anyhow!(
                "expected a single RGB tensor, got shape {:?}",
                tensor.shape()
            ));
        }
        if height != self.size as usize || width != self.size as usize {
            return Err(anyhow!(
                "tensor size {}x{} does not match model input {}x{}",
                width,
                height,
                self.size,
                self.size
            ));
        }

        let values = tensor.dequantized();
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height, width),
            |(_, channel, y, x)| values[(y * width + x) * 3 + channel],
        );

        Ok(input.into_tensor())
    }

    fn extract_categories(&self, outputs: TVec<TValue>) -> Result<Vec<Category>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        if scores.len() != self.labels.len() {
            return Err(anyhow!(
                "model produced {} scores for {} labels",
                scores.len(),
                self.labels.len()
            ));
        }
        Ok(self
            .labels
            .iter()
            .zip(scores.iter())
            .map(|(label, score)| Category::new(label.clone(), *score))
            .collect())
    }
}

impl ClassifierBackend for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn classify(&mut self, tensor: &InputTensor) -> Result<Vec<Category>> {
        let input = self.build_input(tensor)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_categories(outputs)
    }
}
