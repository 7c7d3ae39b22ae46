use anyhow::{anyhow, Context, Result};

use super::labels::garbage_type_for_label;
use super::model::ModelSlot;
use super::result::Category;
use crate::ingest::InputTensor;
use crate::GarbageType;

/// Fire-and-forget notification invoked for every successful classification.
pub type ScanCallback = Box<dyn Fn(GarbageType) + Send>;

/// Select the highest-confidence category.
///
/// Ties keep the entry that comes first in the model's native order.
/// Non-finite scores are never selected.
pub fn top_category(categories: &[Category]) -> Option<&Category> {
    let mut best: Option<&Category> = None;
    for category in categories.iter().filter(|c| c.score.is_finite()) {
        match best {
            Some(current) if category.score <= current.score => {}
            _ => best = Some(category),
        }
    }
    best
}

/// Runs the classifier and maps its top label onto a `GarbageType`.
pub struct ClassificationAdapter {
    model: ModelSlot,
    on_scanned: Option<ScanCallback>,
}

impl ClassificationAdapter {
    pub fn new(model: ModelSlot) -> Self {
        Self {
            model,
            on_scanned: None,
        }
    }

    pub fn with_callback(mut self, on_scanned: ScanCallback) -> Self {
        self.on_scanned = Some(on_scanned);
        self
    }

    /// Map an already ranked output without invoking the model.
    pub fn resolve(categories: &[Category]) -> Option<GarbageType> {
        top_category(categories).map(|top| garbage_type_for_label(&top.label))
    }

    /// Classify one tensor.
    pub fn classify(&mut self, tensor: &InputTensor) -> Result<GarbageType> {
        let backend = self.model.acquire()?;
        let name = backend.name();
        let categories = backend
            .classify(tensor)
            .with_context(|| format!("classifier '{}' failed", name))?;
        let top = top_category(&categories)
            .ok_or_else(|| anyhow!("classifier '{}' returned no usable categories", name))?;
        let garbage = garbage_type_for_label(&top.label);
        log::debug!(
            "classified label={} score={:.3} -> {}",
            top.label,
            top.score,
            garbage
        );

        if let Some(callback) = &self.on_scanned {
            callback(garbage);
        }
        Ok(garbage)
    }

    pub fn model(&self) -> &ModelSlot {
        &self.model
    }

    /// Release the underlying model. Subsequent `classify` calls fail.
    pub fn release(&mut self) {
        self.model.release();
    }
}
