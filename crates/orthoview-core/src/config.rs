use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_FIT_MARGIN, DEFAULT_MAX_ZOOM_FACTOR, DEFAULT_MIN_ZOOM_FACTOR,
    DEFAULT_ORIENTATION_CODE, DEFAULT_THUMBNAIL_MARGIN_PX, DEFAULT_THUMBNAIL_MAX_SIZE_PX,
    DEFAULT_THUMBNAIL_ZOOM_THRESHOLD,
};
use crate::coords::AxisPermutation;
use crate::error::{OrthoviewError, Result};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewerConfig {
    /// Anatomical orientation code of the image axes, e.g. "RAI".
    #[serde(default = "default_orientation")]
    pub orientation: String,
    #[serde(default)]
    pub slice_view: SliceViewConfig,
    #[serde(default)]
    pub zoom: ZoomConfig,
}

fn default_orientation() -> String {
    DEFAULT_ORIENTATION_CODE.to_string()
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            orientation: default_orientation(),
            slice_view: SliceViewConfig::default(),
            zoom: ZoomConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn validate(&self) -> Result<()> {
        AxisPermutation::from_orientation_code(&self.orientation)?;
        self.slice_view.validate()?;
        self.zoom.validate()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SliceViewConfig {
    /// Padding around the slice when fitting it to the window, in physical
    /// image units.
    pub margin: f64,
    /// Refit zoom and position whenever the window is resized.
    pub auto_refit_on_resize: bool,
    pub thumbnail: ThumbnailConfig,
}

impl Default for SliceViewConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_FIT_MARGIN,
            auto_refit_on_resize: false,
            thumbnail: ThumbnailConfig::default(),
        }
    }
}

impl SliceViewConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(OrthoviewError::Config(format!(
                "slice_view.margin must be a non-negative number, got {}",
                self.margin
            )));
        }
        self.thumbnail.validate()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub enabled: bool,
    /// Show the thumbnail once view zoom exceeds optimal zoom by this factor.
    pub zoom_threshold: f64,
    /// Largest side of the thumbnail box, in screen pixels.
    pub max_size_px: u32,
    /// Offset of the thumbnail from the top-left window corner.
    pub margin_px: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            zoom_threshold: DEFAULT_THUMBNAIL_ZOOM_THRESHOLD,
            max_size_px: DEFAULT_THUMBNAIL_MAX_SIZE_PX,
            margin_px: DEFAULT_THUMBNAIL_MARGIN_PX,
        }
    }
}

impl ThumbnailConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.zoom_threshold.is_finite() || self.zoom_threshold < 1.0 {
            return Err(OrthoviewError::Config(format!(
                "thumbnail.zoom_threshold must be >= 1.0, got {}",
                self.zoom_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ZoomConfig {
    /// Keep the zoom of all three windows in lock step.
    pub linked: bool,
    /// Gesture zoom lower bound, relative to the optimal zoom.
    pub min_factor: f64,
    /// Gesture zoom upper bound, relative to the optimal zoom.
    pub max_factor: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            linked: true,
            min_factor: DEFAULT_MIN_ZOOM_FACTOR,
            max_factor: DEFAULT_MAX_ZOOM_FACTOR,
        }
    }
}

impl ZoomConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !positive(self.min_factor) || !positive(self.max_factor) {
            return Err(OrthoviewError::Config(
                "zoom factors must be positive numbers".into(),
            ));
        }
        if self.min_factor > self.max_factor {
            return Err(OrthoviewError::Config(format!(
                "zoom.min_factor ({}) exceeds zoom.max_factor ({})",
                self.min_factor, self.max_factor
            )));
        }
        Ok(())
    }

    /// Clamp `zoom` into the gesture range around `optimal_zoom`. Swapped
    /// factors are treated as the same range in the right order.
    pub fn clamp(&self, zoom: f64, optimal_zoom: f64) -> f64 {
        let a = optimal_zoom * self.min_factor;
        let b = optimal_zoom * self.max_factor;
        zoom.max(a.min(b)).min(a.max(b))
    }
}
