use anyhow::{anyhow, Context, Result};

use super::backend::ClassifierBackend;

/// Factory that produces a ready-to-run backend.
pub type BackendLoader = Box<dyn FnMut() -> Result<Box<dyn ClassifierBackend>> + Send>;

/// Owned model lifecycle.
///
/// The backend is loaded on first use, kept for the lifetime of the scanner
/// session, and released explicitly on teardown. A failed load leaves the slot
/// empty, so the next frame retries.
pub struct ModelSlot {
    loader: BackendLoader,
    backend: Option<Box<dyn ClassifierBackend>>,
    released: bool,
    loads: u32,
}

impl ModelSlot {
    pub fn new(loader: BackendLoader) -> Self {
        Self {
            loader,
            backend: None,
            released: false,
            loads: 0,
        }
    }

    /// Slot around an already constructed backend (no lazy loading).
    pub fn preloaded<B: ClassifierBackend + 'static>(backend: B) -> Self {
        let mut pending = Some(Box::new(backend) as Box<dyn ClassifierBackend>);
        Self::new(Box::new(move || {
            pending
                .take()
                .ok_or_else(|| anyhow!("preloaded backend was already released"))
        }))
    }

    /// Borrow the backend, loading it first if needed.
    pub fn acquire(&mut self) -> Result<&mut dyn ClassifierBackend> {
        if self.released {
            return Err(anyhow!("classifier model has been released"));
        }
        if self.backend.is_none() {
            let mut backend = (self.loader)().context("load classifier model")?;
            backend.warm_up().context("warm up classifier model")?;
            log::info!("classifier backend '{}' loaded", backend.name());
            self.loads += 1;
            self.backend = Some(backend);
        }
        match self.backend.as_deref_mut() {
            Some(backend) => Ok(backend),
            None => Err(anyhow!("classifier model unavailable")),
        }
    }

    /// Drop the backend. Later `acquire` calls fail.
    pub fn release(&mut self) {
        if let Some(backend) = self.backend.take() {
            log::info!("classifier backend '{}' released", backend.name());
        }
        self.released = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Number of successful loads (at most one per session in normal operation).
    pub fn load_count(&self) -> u32 {
        self.loads
    }
}

impl Drop for ModelSlot {
    fn drop(&mut self) {
        self.release();
    }
}
