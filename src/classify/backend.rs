use anyhow::Result;

use crate::classify::result::Category;
use crate::ingest::InputTensor;

/// Classifier backend trait.
///
/// Implementations run a pre-trained image classifier on one tensor and return
/// every category the model scores. Ordering of the returned list is the model's
/// native order; ranking is done by the caller.
///
/// Backends are owned by a `ModelSlot` and only ever used from the analyzer
/// thread, so `classify` takes `&mut self`.
pub trait ClassifierBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run the model on a tensor.
    ///
    /// Implementations must treat the tensor as read-only and must not retain it.
    fn classify(&mut self, tensor: &InputTensor) -> Result<Vec<Category>>;

    /// Optional warm-up hook, called once right after loading.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
