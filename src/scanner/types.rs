use serde::{Deserialize, Serialize};

/// How frames reach the classifier.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScannerMode {
    /// Continuous classification on a throttled subset of frames.
    Live,
    /// Classification only on an explicit capture request.
    #[default]
    Photo,
}

impl ScannerMode {
    pub fn toggled(self) -> Self {
        match self {
            ScannerMode::Live => ScannerMode::Photo,
            ScannerMode::Photo => ScannerMode::Live,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TorchMode {
    On,
    #[default]
    Off,
}

impl TorchMode {
    pub fn toggled(self) -> Self {
        match self {
            TorchMode::On => TorchMode::Off,
            TorchMode::Off => TorchMode::On,
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, TorchMode::On)
    }
}

/// Named zoom levels, ordered by ratio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ZoomPreset {
    #[default]
    X1,
    X2,
    X3,
    X4,
}

impl ZoomPreset {
    pub const ALL: [ZoomPreset; 4] = [ZoomPreset::X1, ZoomPreset::X2, ZoomPreset::X3, ZoomPreset::X4];

    pub fn ratio(self) -> f32 {
        match self {
            ZoomPreset::X1 => 1.0,
            ZoomPreset::X2 => 2.0,
            ZoomPreset::X3 => 3.0,
            ZoomPreset::X4 => 4.0,
        }
    }

    /// Circular successor (X4 wraps to X1).
    pub fn next(self) -> Self {
        match self {
            ZoomPreset::X1 => ZoomPreset::X2,
            ZoomPreset::X2 => ZoomPreset::X3,
            ZoomPreset::X3 => ZoomPreset::X4,
            ZoomPreset::X4 => ZoomPreset::X1,
        }
    }

    /// Greatest preset whose ratio is `<= ratio`; X1 below 1.0.
    pub fn for_ratio(ratio: f32) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|preset| preset.ratio() <= ratio)
            .unwrap_or(ZoomPreset::X1)
    }

    pub fn label(self) -> &'static str {
        match self {
            ZoomPreset::X1 => "1X",
            ZoomPreset::X2 => "2X",
            ZoomPreset::X3 => "3X",
            ZoomPreset::X4 => "4X",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Zoom state as seen by the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomInfo {
    pub(crate) min_ratio: f32,
    pub(crate) max_ratio: f32,
    pub(crate) current_ratio: f32,
    pub(crate) current_preset: ZoomPreset,
    pub(crate) is_adjusting: bool,
}

impl ZoomInfo {
    pub fn min_ratio(&self) -> f32 {
        self.min_ratio
    }

    pub fn max_ratio(&self) -> f32 {
        self.max_ratio
    }

    pub fn current_ratio(&self) -> f32 {
        self.current_ratio
    }

    pub fn current_preset(&self) -> ZoomPreset {
        self.current_preset
    }

    /// True until the debounce window after the last zoom intent has elapsed.
    pub fn is_adjusting(&self) -> bool {
        self.is_adjusting
    }

    /// Current ratio mapped linearly onto `[0, 1]` between the hardware bounds.
    pub fn linear(&self) -> f32 {
        let span = self.max_ratio - self.min_ratio;
        if span <= f32::EPSILON {
            return 0.0;
        }
        ((self.current_ratio - self.min_ratio) / span).clamp(0.0, 1.0)
    }
}

impl Default for ZoomInfo {
    fn default() -> Self {
        Self {
            min_ratio: 1.0,
            max_ratio: 1.0,
            current_ratio: 1.0,
            current_preset: ZoomPreset::X1,
            is_adjusting: false,
        }
    }
}

/// Tap-to-focus indicator.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FocusInfo {
    pub x: f32,
    pub y: f32,
    pub visible: bool,
}
