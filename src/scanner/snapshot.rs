use std::sync::Arc;

use super::types::{FocusInfo, ScannerMode, TorchMode, ZoomInfo};
use crate::content::{Post, PostsFeed};
use crate::GarbageType;

/// Scanner fields common to both snapshot variants.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScannerView {
    pub mode: ScannerMode,
    pub torch_mode: TorchMode,
    pub zoom_info: ZoomInfo,
    pub has_flash_unit: bool,
    pub focus_info: FocusInfo,
    pub take_picture_requested: bool,
    pub last_classification: Option<GarbageType>,
}

/// Immutable scanner state handed to the presentation layer.
///
/// A classification can only be resolved into a post once the content feed
/// has loaded, so the two cases are distinct variants.
#[derive(Clone, Debug, PartialEq)]
pub enum ScannerSnapshot {
    NoPosts {
        view: ScannerView,
    },
    HasPosts {
        view: ScannerView,
        feed: Arc<PostsFeed>,
        /// Post chosen via article selection, else the first full post.
        selected_post: Option<Post>,
        /// Post matching `view.last_classification`.
        scanned_post: Option<Post>,
    },
}

impl ScannerSnapshot {
    pub fn view(&self) -> &ScannerView {
        match self {
            ScannerSnapshot::NoPosts { view } => view,
            ScannerSnapshot::HasPosts { view, .. } => view,
        }
    }

    pub fn mode(&self) -> ScannerMode {
        self.view().mode
    }

    pub fn torch_mode(&self) -> TorchMode {
        self.view().torch_mode
    }

    pub fn zoom_info(&self) -> &ZoomInfo {
        &self.view().zoom_info
    }

    pub fn focus_info(&self) -> &FocusInfo {
        &self.view().focus_info
    }

    pub fn has_flash_unit(&self) -> bool {
        self.view().has_flash_unit
    }

    pub fn take_picture_requested(&self) -> bool {
        self.view().take_picture_requested
    }

    pub fn last_classification(&self) -> Option<GarbageType> {
        self.view().last_classification
    }

    pub fn has_posts(&self) -> bool {
        matches!(self, ScannerSnapshot::HasPosts { .. })
    }

    /// The post to show on the result card, if any.
    pub fn scanned_post(&self) -> Option<&Post> {
        match self {
            ScannerSnapshot::NoPosts { .. } => None,
            ScannerSnapshot::HasPosts { scanned_post, .. } => scanned_post.as_ref(),
        }
    }
}
