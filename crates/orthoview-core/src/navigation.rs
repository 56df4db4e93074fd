//! Crosshair-style interaction on a single slice window: click to move the
//! cursor, pinch to zoom, drag to pan, scroll to step through slices.

use tracing::debug;

use crate::config::ZoomConfig;
use crate::resource::LayerResourceFactory;
use crate::slice::SliceViewModel;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Gesture {
    Zoom { start_zoom: f64 },
    Pan { start_position: [f64; 2] },
}

/// Gesture state for one window. Zoom and pan gestures are bracketed by
/// `begin_*` / `end_*`; updates outside a matching gesture are ignored.
#[derive(Clone, Debug)]
pub struct CursorNavigation {
    zoom: ZoomConfig,
    gesture: Option<Gesture>,
}

impl CursorNavigation {
    pub fn new(zoom: ZoomConfig) -> Self {
        Self {
            zoom,
            gesture: None,
        }
    }

    pub fn is_zooming(&self) -> bool {
        matches!(self.gesture, Some(Gesture::Zoom { .. }))
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Some(Gesture::Pan { .. }))
    }

    /// Move the shared cursor to the voxel under `window`, clamped into the
    /// volume. Returns the new cursor.
    pub fn update_cursor<F: LayerResourceFactory>(
        &self,
        model: &SliceViewModel<F>,
        window: [f64; 2],
    ) -> [u32; 3] {
        let slice = model.map_window_to_slice(window);
        let voxel = model.nearest_image_index(slice);
        debug!(plane = %model.plane(), ?window, ?voxel, "Cursor placed");
        model.sources().cursor.set(voxel);
        voxel
    }

    pub fn begin_zoom<F: LayerResourceFactory>(&mut self, model: &SliceViewModel<F>) {
        self.gesture = Some(Gesture::Zoom {
            start_zoom: model.view_zoom(),
        });
    }

    /// Apply a cumulative pinch `scale` relative to the zoom at gesture
    /// start. Returns the zoom actually applied.
    pub fn process_zoom_gesture<F: LayerResourceFactory>(
        &self,
        model: &mut SliceViewModel<F>,
        scale: f64,
    ) -> Option<f64> {
        let Some(Gesture::Zoom { start_zoom }) = self.gesture else {
            return None;
        };
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }
        let zoom = self.clamp_zoom(start_zoom * scale, model.optimal_zoom());
        model.set_view_zoom(zoom);
        Some(model.view_zoom())
    }

    pub fn end_zoom(&mut self) {
        if self.is_zooming() {
            self.gesture = None;
        }
    }

    pub fn begin_pan<F: LayerResourceFactory>(&mut self, model: &SliceViewModel<F>) {
        self.gesture = Some(Gesture::Pan {
            start_position: model.view_position(),
        });
    }

    /// Drag the slice by `delta` window pixels since gesture start.
    pub fn process_pan_gesture<F: LayerResourceFactory>(
        &self,
        model: &mut SliceViewModel<F>,
        delta: [f64; 2],
    ) -> Option<[f64; 2]> {
        let Some(Gesture::Pan { start_position }) = self.gesture else {
            return None;
        };
        let zoom = model.view_zoom();
        let position = [
            start_position[0] + delta[0] / zoom,
            start_position[1] + delta[1] / zoom,
        ];
        model.set_view_position(position);
        Some(position)
    }

    pub fn end_pan(&mut self) {
        if self.is_panning() {
            self.gesture = None;
        }
    }

    /// Step `steps` slices forward (or back, if negative).
    pub fn process_scroll_gesture<F: LayerResourceFactory>(
        &self,
        model: &mut SliceViewModel<F>,
        steps: i64,
    ) -> bool {
        let target = i64::from(model.slice_index()).saturating_add(steps);
        model.update_slice_index(target)
    }

    fn clamp_zoom(&self, zoom: f64, optimal_zoom: f64) -> f64 {
        if optimal_zoom > 0.0 {
            self.zoom.clamp(zoom, optimal_zoom)
        } else {
            zoom
        }
    }
}

impl Default for CursorNavigation {
    fn default() -> Self {
        Self::new(ZoomConfig::default())
    }
}
