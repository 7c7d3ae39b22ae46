pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubClassifier;

#[cfg(feature = "backend-tract")]
pub use tract::TractClassifier;

use anyhow::Result;

use super::backend::ClassifierBackend;
use super::model::BackendLoader;
use crate::config::{ClassifierKind, ClassifierSettings};

/// Build the lazy loader for the configured backend.
///
/// Nothing is loaded here; the model is read from disk on first classification.
pub fn backend_loader(settings: &ClassifierSettings, tensor_size: u32) -> Result<BackendLoader> {
    match settings.backend {
        ClassifierKind::Stub => Ok(Box::new(|| -> Result<Box<dyn ClassifierBackend>> {
            Ok(Box::new(StubClassifier::new()))
        })),
        ClassifierKind::Tract => tract_loader(settings, tensor_size),
    }
}

#[cfg(feature = "backend-tract")]
fn tract_loader(settings: &ClassifierSettings, tensor_size: u32) -> Result<BackendLoader> {
    let path = settings
        .model_path
        .clone()
        .ok_or_else(|| anyhow::anyhow!("tract classifier requires a model path"))?;
    Ok(Box::new(move || -> Result<Box<dyn ClassifierBackend>> {
        log::info!("loading ONNX classifier from {}", path.display());
        Ok(Box::new(TractClassifier::new(&path, tensor_size)?))
    }))
}

#[cfg(not(feature = "backend-tract"))]
fn tract_loader(_settings: &ClassifierSettings, _tensor_size: u32) -> Result<BackendLoader> {
    Err(anyhow::anyhow!(
        "tract classifier requested but the backend-tract feature is disabled"
    ))
}
