//! Per-clip Ken Burns motion parameters.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Hard cap for the zoom ramp.
pub const MAX_ZOOM: f64 = 1.5;
/// Zoom added per output frame.
pub const ZOOM_STEP_PER_FRAME: f64 = 0.0015;

const ZOOM_START_STEP: f64 = 0.1;
const ZOOM_SPAN: f64 = 0.2;
const PAN_X_STEP: f64 = 100.0;
const PAN_Y_STEP: f64 = 50.0;

/// Pan/zoom trajectory for one image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KenBurnsParams {
    /// Zoom factor of the first frame
    pub zoom_start: f64,
    /// Zoom factor the ramp heads towards (capped at [`MAX_ZOOM`])
    pub zoom_end: f64,
    /// Horizontal drift of the crop window, in source pixels
    pub pan_x: f64,
    /// Vertical drift of the crop window, in source pixels
    pub pan_y: f64,
}

impl Default for KenBurnsParams {
    fn default() -> Self {
        Self::for_index(0)
    }
}

impl KenBurnsParams {
    /// Deterministic schedule for image `index`.
    ///
    /// Each image zooms in a little deeper than the previous one and the pan
    /// offsets cycle with the index parity (x) and index mod 3 (y), so
    /// adjacent clips never repeat the same motion.
    pub fn for_index(index: usize) -> Self {
        let zoom_start = 1.0 + index as f64 * ZOOM_START_STEP;
        Self {
            zoom_start,
            zoom_end: zoom_start + ZOOM_SPAN,
            pan_x: (index % 2) as f64 * PAN_X_STEP,
            pan_y: (index % 3) as f64 * PAN_Y_STEP,
        }
    }

    /// Upper bound of the zoom ramp.
    pub fn zoom_cap(&self) -> f64 {
        self.zoom_end.min(MAX_ZOOM).max(1.0)
    }

    /// First-frame zoom, never above the cap.
    pub fn effective_zoom_start(&self) -> f64 {
        self.zoom_start.max(1.0).min(self.zoom_cap())
    }
}
