//! Garbage classification.
//!
//! The classifier itself is an external capability: given a normalized tensor it
//! returns a ranked list of `(label, confidence)`. This module wraps it:
//! - `ClassifierBackend`: the narrow contract every model runtime implements
//! - `ModelSlot`: explicit load-once / release-on-teardown ownership of a backend
//! - `ClassificationAdapter`: picks the top category and maps it to a `GarbageType`

mod adapter;
mod backend;
pub mod backends;
mod labels;
mod model;
mod result;

pub use adapter::{top_category, ClassificationAdapter, ScanCallback};
pub use backend::ClassifierBackend;
pub use backends::{backend_loader, StubClassifier};
#[cfg(feature = "backend-tract")]
pub use backends::TractClassifier;
pub use labels::{garbage_type_for_label, MODEL_LABELS};
pub use model::{BackendLoader, ModelSlot};
pub use result::Category;
