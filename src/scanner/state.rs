use std::sync::Arc;

use super::snapshot::{ScannerSnapshot, ScannerView};
use super::types::{FocusInfo, ScannerMode, TorchMode, ZoomDirection, ZoomInfo, ZoomPreset};
use crate::content::PostsFeed;
use crate::GarbageType;

/// Ratios within this distance of an integer count as whole.
const WHOLE_RATIO_EPSILON: f32 = 1e-3;

/// Discrete inputs to the scanner state.
#[derive(Clone, Debug, PartialEq)]
pub enum ScannerIntent {
    SetMode(ScannerMode),
    SetTorch(TorchMode),
    SetZoomRatio(f32),
    SetZoomPreset(ZoomPreset),
    ZoomStep(ZoomDirection),
    SetFocus { x: f32, y: f32 },
    ClearFocus,
    SetTakePicture(bool),
    ClearZoomAdjusting,
    ApplyHardwareZoomBounds { min: f32, max: f32 },
    SetHasFlashUnit(bool),
    RecordClassification(GarbageType),
    PostsLoaded(Arc<PostsFeed>),
    SelectArticle(GarbageType),
}

impl ScannerIntent {
    /// Intents that restart the `is_adjusting` debounce window. A NaN ratio
    /// is dropped by the reducer and does not count.
    pub fn changes_zoom(&self) -> bool {
        match self {
            ScannerIntent::SetZoomRatio(ratio) => !ratio.is_nan(),
            ScannerIntent::SetZoomPreset(_) | ScannerIntent::ZoomStep(_) => true,
            _ => false,
        }
    }
}

/// Full mutable scanner state. Only `reduce` produces new values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScannerState {
    mode: ScannerMode,
    torch_mode: TorchMode,
    zoom: ZoomInfo,
    has_flash_unit: bool,
    focus: FocusInfo,
    take_picture_requested: bool,
    last_classification: Option<GarbageType>,
    posts_feed: Option<Arc<PostsFeed>>,
    selected_post_type: Option<GarbageType>,
}

impl ScannerState {
    /// Apply one intent. Total over all inputs: out-of-range ratios are clamped,
    /// NaN ratios and nonsensical bounds leave the state unchanged.
    pub fn reduce(&self, intent: &ScannerIntent) -> ScannerState {
        let mut next = self.clone();
        match intent {
            ScannerIntent::SetMode(mode) => next.mode = *mode,
            ScannerIntent::SetTorch(torch) => next.torch_mode = *torch,
            ScannerIntent::SetZoomRatio(ratio) => next.zoom_to(*ratio),
            ScannerIntent::SetZoomPreset(preset) => {
                let preset = if preset.ratio() > next.zoom.max_ratio {
                    ZoomPreset::X1
                } else {
                    *preset
                };
                next.zoom_to(preset.ratio());
            }
            ScannerIntent::ZoomStep(direction) => {
                let target = step_target(&next.zoom, *direction);
                next.zoom_to(target);
            }
            ScannerIntent::SetFocus { x, y } => {
                next.focus = FocusInfo {
                    x: *x,
                    y: *y,
                    visible: true,
                };
            }
            ScannerIntent::ClearFocus => next.focus.visible = false,
            ScannerIntent::SetTakePicture(flag) => next.take_picture_requested = *flag,
            ScannerIntent::ClearZoomAdjusting => next.zoom.is_adjusting = false,
            ScannerIntent::ApplyHardwareZoomBounds { min, max } => {
                next.apply_bounds(*min, *max);
            }
            ScannerIntent::SetHasFlashUnit(has_flash) => next.has_flash_unit = *has_flash,
            ScannerIntent::RecordClassification(garbage) => {
                next.last_classification = Some(*garbage);
            }
            ScannerIntent::PostsLoaded(feed) => next.posts_feed = Some(feed.clone()),
            ScannerIntent::SelectArticle(garbage) => next.selected_post_type = Some(*garbage),
        }
        next
    }

    fn zoom_to(&mut self, ratio: f32) {
        if ratio.is_nan() {
            return;
        }
        let clamped = ratio.clamp(self.zoom.min_ratio, self.zoom.max_ratio);
        self.zoom.current_ratio = clamped;
        self.zoom.current_preset = ZoomPreset::for_ratio(clamped);
        self.zoom.is_adjusting = true;
    }

    fn apply_bounds(&mut self, min: f32, max: f32) {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        if !min.is_finite() || !max.is_finite() || min <= 0.0 {
            log::warn!("ignoring invalid hardware zoom bounds [{}, {}]", min, max);
            return;
        }
        self.zoom.min_ratio = min;
        self.zoom.max_ratio = max;
        self.zoom.current_ratio = self.zoom.current_ratio.clamp(min, max);
        self.zoom.current_preset = ZoomPreset::for_ratio(self.zoom.current_ratio);
    }

    pub fn mode(&self) -> ScannerMode {
        self.mode
    }

    pub fn take_picture_requested(&self) -> bool {
        self.take_picture_requested
    }

    pub fn zoom(&self) -> &ZoomInfo {
        &self.zoom
    }

    /// Immutable view for the presentation layer.
    pub fn snapshot(&self) -> ScannerSnapshot {
        let view = ScannerView {
            mode: self.mode,
            torch_mode: self.torch_mode,
            zoom_info: self.zoom,
            has_flash_unit: self.has_flash_unit,
            focus_info: self.focus,
            take_picture_requested: self.take_picture_requested,
            last_classification: self.last_classification,
        };
        match &self.posts_feed {
            None => ScannerSnapshot::NoPosts { view },
            Some(feed) => {
                let selected_post = self
                    .selected_post_type
                    .and_then(|garbage| feed.find(garbage))
                    .or_else(|| feed.info.first())
                    .cloned();
                let scanned_post = self
                    .last_classification
                    .and_then(|garbage| feed.find(garbage))
                    .cloned();
                ScannerSnapshot::HasPosts {
                    view,
                    feed: feed.clone(),
                    selected_post,
                    scanned_post,
                }
            }
        }
    }
}

/// Next whole ratio in `direction`, wrapping around the hardware bounds.
///
/// A fractional ratio steps to its ceiling (in) or floor (out); a whole ratio
/// steps by exactly one. Repeated steps visit every whole ratio once per cycle.
fn step_target(zoom: &ZoomInfo, direction: ZoomDirection) -> f32 {
    let current = zoom.current_ratio;
    let base = if (current - current.round()).abs() < WHOLE_RATIO_EPSILON {
        current.round()
    } else {
        current
    };
    match direction {
        ZoomDirection::In => {
            let target = base.floor() + 1.0;
            if target > zoom.max_ratio + WHOLE_RATIO_EPSILON {
                zoom.min_ratio.ceil()
            } else {
                target
            }
        }
        ZoomDirection::Out => {
            let target = base.ceil() - 1.0;
            if target < zoom.min_ratio - WHOLE_RATIO_EPSILON {
                zoom.max_ratio.floor()
            } else {
                target
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_bounds(min: f32, max: f32) -> ScannerState {
        ScannerState::default().reduce(&ScannerIntent::ApplyHardwareZoomBounds { min, max })
    }

    fn ratio(state: &ScannerState) -> f32 {
        state.zoom().current_ratio()
    }

    #[test]
    fn zoom_ratio_is_clamped_and_marks_adjusting() {
        let state = with_bounds(1.0, 4.0);
        assert!(!state.zoom().is_adjusting());

        let high = state.reduce(&ScannerIntent::SetZoomRatio(10.0));
        assert_eq!(ratio(&high), 4.0);
        assert_eq!(high.zoom().current_preset(), ZoomPreset::X4);
        assert!(high.zoom().is_adjusting());

        let low = state.reduce(&ScannerIntent::SetZoomRatio(-3.0));
        assert_eq!(ratio(&low), 1.0);
    }

    #[test]
    fn nan_ratio_is_ignored() {
        let state = with_bounds(1.0, 4.0);
        let next = state.reduce(&ScannerIntent::SetZoomRatio(f32::NAN));
        assert_eq!(next, state);
    }

    #[test]
    fn preset_above_max_wraps_to_first() {
        let state = with_bounds(1.0, 2.5);
        let next = state.reduce(&ScannerIntent::SetZoomPreset(ZoomPreset::X3));
        assert_eq!(next.zoom().current_preset(), ZoomPreset::X1);
        assert_eq!(ratio(&next), 1.0);

        let next = state.reduce(&ScannerIntent::SetZoomPreset(ZoomPreset::X2));
        assert_eq!(next.zoom().current_preset(), ZoomPreset::X2);
        assert_eq!(ratio(&next), 2.0);
    }

    #[test]
    fn default_bounds_keep_presets_at_x1() {
        let next = ScannerState::default().reduce(&ScannerIntent::SetZoomPreset(ZoomPreset::X2));
        assert_eq!(next.zoom().current_preset(), ZoomPreset::X1);
    }

    #[test]
    fn zoom_step_in_wraps_after_max() {
        let mut state = with_bounds(1.0, 4.0);
        let mut seen = Vec::new();
        for _ in 0..4 {
            state = state.reduce(&ScannerIntent::ZoomStep(ZoomDirection::In));
            seen.push(ratio(&state));
        }
        assert_eq!(seen, vec![2.0, 3.0, 4.0, 1.0]);
    }

    #[test]
    fn zoom_step_out_wraps_below_min() {
        let mut state = with_bounds(1.0, 4.0);
        let mut seen = Vec::new();
        for _ in 0..4 {
            state = state.reduce(&ScannerIntent::ZoomStep(ZoomDirection::Out));
            seen.push(ratio(&state));
        }
        assert_eq!(seen, vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn fractional_ratio_steps_to_ceiling_or_floor() {
        let state = with_bounds(1.0, 4.0).reduce(&ScannerIntent::SetZoomRatio(2.3));
        assert_eq!(ratio(&state.reduce(&ScannerIntent::ZoomStep(ZoomDirection::In))), 3.0);
        assert_eq!(ratio(&state.reduce(&ScannerIntent::ZoomStep(ZoomDirection::Out))), 2.0);
    }

    #[test]
    fn new_bounds_reclamp_current_ratio() {
        let state = with_bounds(1.0, 8.0).reduce(&ScannerIntent::SetZoomRatio(6.0));
        let narrowed = state.reduce(&ScannerIntent::ApplyHardwareZoomBounds { min: 1.0, max: 3.0 });
        assert_eq!(ratio(&narrowed), 3.0);
        assert_eq!(narrowed.zoom().current_preset(), ZoomPreset::X3);
    }

    #[test]
    fn invalid_bounds_are_ignored_and_swapped_bounds_fixed() {
        let state = with_bounds(1.0, 4.0);
        assert_eq!(
            state.reduce(&ScannerIntent::ApplyHardwareZoomBounds { min: f32::NAN, max: 2.0 }),
            state
        );
        let swapped = ScannerState::default()
            .reduce(&ScannerIntent::ApplyHardwareZoomBounds { min: 5.0, max: 1.0 });
        assert_eq!(swapped.zoom().min_ratio(), 1.0);
        assert_eq!(swapped.zoom().max_ratio(), 5.0);

        let negative = state.reduce(&ScannerIntent::ApplyHardwareZoomBounds { min: 5.0, max: -1.0 });
        assert_eq!(negative, state);
        let clamped = negative.reduce(&ScannerIntent::SetZoomRatio(-0.5));
        assert_eq!(clamped.zoom().current_ratio(), 1.0);
    }

    #[test]
    fn nan_ratio_is_not_a_zoom_change() {
        assert!(!ScannerIntent::SetZoomRatio(f32::NAN).changes_zoom());
        assert!(ScannerIntent::SetZoomRatio(2.0).changes_zoom());
        assert!(ScannerIntent::ZoomStep(ZoomDirection::In).changes_zoom());
    }

    #[test]
    fn focus_indicator_shows_and_clears() {
        let shown = ScannerState::default().reduce(&ScannerIntent::SetFocus { x: 12.0, y: 34.0 });
        assert!(shown.focus.visible);
        let cleared = shown.reduce(&ScannerIntent::ClearFocus);
        assert!(!cleared.focus.visible);
        assert_eq!(cleared.focus.x, 12.0);
    }

    #[test]
    fn snapshot_resolves_posts_once_feed_is_loaded() {
        let scanned = ScannerState::default()
            .reduce(&ScannerIntent::RecordClassification(GarbageType::Glass));
        match scanned.snapshot() {
            ScannerSnapshot::NoPosts { view } => {
                assert_eq!(view.last_classification, Some(GarbageType::Glass));
            }
            other => panic!("unexpected snapshot {:?}", other),
        }

        let feed = crate::content::InMemoryContentRepository::builtin();
        let feed = crate::content::ContentRepository::posts_feed(&feed).unwrap();
        let loaded = scanned.reduce(&ScannerIntent::PostsLoaded(Arc::new(feed)));
        match loaded.snapshot() {
            ScannerSnapshot::HasPosts {
                selected_post,
                scanned_post,
                ..
            } => {
                assert_eq!(scanned_post.unwrap().garbage_type, GarbageType::Glass);
                assert_eq!(selected_post.unwrap().garbage_type, GarbageType::Plastic);
            }
            other => panic!("unexpected snapshot {:?}", other),
        }
    }

    #[test]
    fn selected_article_falls_back_to_first_full_post() {
        let repo = crate::content::InMemoryContentRepository::builtin();
        let feed = crate::content::ContentRepository::posts_feed(&repo).unwrap();
        let loaded = ScannerState::default().reduce(&ScannerIntent::PostsLoaded(Arc::new(feed)));

        let selected = |state: &ScannerState| match state.snapshot() {
            ScannerSnapshot::HasPosts { selected_post, .. } => {
                selected_post.map(|post| post.garbage_type)
            }
            ScannerSnapshot::NoPosts { .. } => None,
        };
        assert_eq!(selected(&loaded), Some(GarbageType::Plastic));

        let metal = loaded.reduce(&ScannerIntent::SelectArticle(GarbageType::Metal));
        assert_eq!(selected(&metal), Some(GarbageType::Metal));
    }
}
