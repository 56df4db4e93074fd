//! State of one orthogonal slice window and its coordinate mappings.
//!
//! Three coordinate systems meet here:
//!
//! * **window**: screen pixels relative to the viewport origin, y down;
//! * **slice**: physical units in display orientation, y up. The in-plane
//!   axes are centred on the middle of the slice; the third component is
//!   the offset of the slice along the normal, `slice_index * spacing.z`;
//! * **image**: continuous voxel coordinates in image orientation, origin
//!   at the corner of voxel `(0, 0, 0)`.
//!
//! Window ↔ slice is a scale by the view zoom plus the pan offset. Slice ↔
//! image goes through the display → image [`CoordinateTransform`].

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SliceViewConfig;
use crate::consts::{EPSILON, INITIAL_VIEW_ZOOM};
use crate::coords::{AxisPermutation, CoordinateTransform, Plane};
use crate::error::{OrthoviewError, Result};
use crate::event::{EventBucket, EventKind};
use crate::model::{Model, ModelCore};
use crate::observe::{Observable, Subject};
use crate::resource::{LayerResourceFactory, LayerResourceMap, SyncReport};
use crate::source::{CursorStore, DisplayOrientation, ImageData, ImageGeometry};

/// Placement of the zoom thumbnail, in window pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Thumbnail {
    pub position: [i32; 2],
    pub size: [i32; 2],
    pub zoom: f64,
}

/// The part of a slice view worth keeping between sessions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SliceViewState {
    pub view_zoom: f64,
    pub view_position: [f64; 2],
    pub slice_index: u32,
}

/// Collaborators a slice view listens to.
#[derive(Clone, Debug)]
pub struct SliceViewSources {
    pub image_data: Rc<ImageData>,
    pub cursor: Rc<CursorStore>,
    pub orientation: Rc<DisplayOrientation>,
}

fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        0.0
    } else {
        a / b
    }
}

pub struct SliceViewModel<F: LayerResourceFactory> {
    core: ModelCore,
    plane: Plane,
    config: SliceViewConfig,
    sources: SliceViewSources,
    factory: F,
    textures: LayerResourceMap<F::Resource>,

    initialized: bool,
    image_to_display: CoordinateTransform,
    display_to_image: CoordinateTransform,
    display_to_anatomy: AxisPermutation,
    image_axes: [usize; 3],

    slice_size: [u32; 3],
    slice_spacing: [f64; 3],
    slice_index: u32,

    viewport_size: [u32; 2],
    view_position: [f64; 2],
    optimal_view_position: [f64; 2],
    view_zoom: f64,
    optimal_zoom: f64,
    // Zoom is owned by an external coordinator when set.
    managed_zoom: bool,

    thumbnail: Thumbnail,
}

impl<F: LayerResourceFactory> SliceViewModel<F> {
    /// Create an uninitialized view and wire it to its sources. Every
    /// upstream change is rebroadcast as [`EventKind::ModelUpdate`].
    pub fn new(
        plane: Plane,
        sources: SliceViewSources,
        factory: F,
        config: SliceViewConfig,
    ) -> Self {
        let core = ModelCore::new();
        core.rebroadcast(
            &*sources.image_data,
            EventKind::ImageDimensionsChange,
            EventKind::ModelUpdate,
        );
        core.rebroadcast(&*sources.image_data, EventKind::LayerChange, EventKind::ModelUpdate);
        core.rebroadcast(&*sources.cursor, EventKind::CursorUpdate, EventKind::ModelUpdate);
        core.rebroadcast(
            &*sources.orientation,
            EventKind::DisplayOrientationChange,
            EventKind::ModelUpdate,
        );

        Self {
            core,
            plane,
            config,
            sources,
            factory,
            textures: LayerResourceMap::new(),
            initialized: false,
            image_to_display: CoordinateTransform::identity(),
            display_to_image: CoordinateTransform::identity(),
            display_to_anatomy: AxisPermutation::IDENTITY,
            image_axes: [0, 1, 2],
            slice_size: [0; 3],
            slice_spacing: [0.0; 3],
            slice_index: 0,
            viewport_size: [0; 2],
            view_position: [0.0; 2],
            optimal_view_position: [0.0; 2],
            view_zoom: INITIAL_VIEW_ZOOM,
            optimal_zoom: 0.0,
            managed_zoom: false,
            thumbnail: Thumbnail::default(),
        }
    }

    fn assert_initialized(&self, operation: &str) {
        assert!(
            self.initialized,
            "{operation} called on the {} slice view before initialize_slice",
            self.plane
        );
    }

    // ------------------------------------------------------------------
    // Initialization and source updates
    // ------------------------------------------------------------------

    /// Bind the view to the current image data, resetting all geometry.
    pub fn initialize_slice(&mut self) -> Result<()> {
        let geometry = self
            .sources
            .image_data
            .geometry()
            .ok_or(OrthoviewError::NoMainImage)?;

        self.bind_geometry(&geometry);
        self.initialized = true;
        self.slice_index = self.slice_index_from_cursor();
        self.view_position = [0.0; 2];

        debug!(
            plane = %self.plane,
            slice_size = ?self.slice_size,
            slice_spacing = ?self.slice_spacing,
            slice_index = self.slice_index,
            "Slice initialized"
        );

        self.update_texture_map();
        self.core.subject().fire(EventKind::SliceDimensionsChange);
        self.reset_view_to_fit();
        Ok(())
    }

    fn bind_geometry(&mut self, geometry: &ImageGeometry) {
        let image_to_display = self.sources.orientation.image_to_display(self.plane);
        self.image_to_display =
            CoordinateTransform::for_extent(image_to_display, geometry.dimensions);
        self.display_to_image = self.image_to_display.inverse();
        self.display_to_anatomy = self.sources.orientation.display_to_anatomy(self.plane);
        self.image_axes = [0, 1, 2].map(|i| image_to_display.axis(i));
        self.slice_size = image_to_display.apply_unsigned(geometry.dimensions);
        self.slice_spacing = image_to_display.apply_unsigned(geometry.spacing);
    }

    /// React to a change in dimensions or spacing of the bound image.
    pub fn on_source_data_update(&mut self) {
        self.assert_initialized("on_source_data_update");
        let Some(geometry) = self.sources.image_data.geometry() else {
            debug!(plane = %self.plane, "Image unloaded, keeping last slice geometry");
            return;
        };

        let old_size = self.slice_size;
        let old_spacing = self.slice_spacing;
        self.bind_geometry(&geometry);
        self.slice_index = self.slice_index.min(self.slice_size[2].saturating_sub(1));
        self.core.subject().fire(EventKind::SliceDimensionsChange);

        let in_plane_changed = old_size[..2] != self.slice_size[..2]
            || old_spacing[..2] != self.slice_spacing[..2];
        if in_plane_changed {
            self.reset_view_to_fit();
        } else {
            self.compute_optimal_zoom();
            self.compute_thumbnail_properties();
        }
    }

    fn slice_index_from_cursor(&self) -> u32 {
        let last = self.slice_size[2].saturating_sub(1);
        let cursor = self.clamp_to_volume(self.sources.cursor.get());
        self.image_to_display.apply_index(cursor)[2].min(last)
    }

    fn clamp_to_volume(&self, index: [u32; 3]) -> [u32; 3] {
        let dims = self.image_to_display.permutation().inverse().apply_unsigned(self.slice_size);
        [0, 1, 2].map(|i| index[i].min(dims[i].saturating_sub(1)))
    }

    /// Make the layer resource map mirror the loaded layers.
    pub fn update_texture_map(&mut self) -> SyncReport {
        let layers = self.sources.image_data.layers();
        self.textures.sync(&layers, &mut self.factory)
    }

    // ------------------------------------------------------------------
    // Coordinate mapping
    // ------------------------------------------------------------------

    pub fn map_window_to_slice(&self, window: [f64; 2]) -> [f64; 3] {
        self.assert_initialized("map_window_to_slice");
        let u = (window[0] - 0.5 * f64::from(self.viewport_size[0])) / self.view_zoom
            - self.view_position[0];
        let v = (window[1] - 0.5 * f64::from(self.viewport_size[1])) / self.view_zoom
            - self.view_position[1];
        [u, -v, f64::from(self.slice_index) * self.slice_spacing[2]]
    }

    pub fn map_window_offset_to_slice_offset(&self, offset: [f64; 2]) -> [f64; 3] {
        self.assert_initialized("map_window_offset_to_slice_offset");
        [offset[0] / self.view_zoom, -offset[1] / self.view_zoom, 0.0]
    }

    pub fn map_slice_to_window(&self, slice: [f64; 3]) -> [f64; 2] {
        self.assert_initialized("map_slice_to_window");
        let [px, py] = self.map_slice_to_physical_window(slice);
        [
            px * self.view_zoom + 0.5 * f64::from(self.viewport_size[0]),
            py * self.view_zoom + 0.5 * f64::from(self.viewport_size[1]),
        ]
    }

    /// Like [`Self::map_slice_to_window`], but in physical units relative
    /// to the viewport centre.
    pub fn map_slice_to_physical_window(&self, slice: [f64; 3]) -> [f64; 2] {
        self.assert_initialized("map_slice_to_physical_window");
        [
            slice[0] + self.view_position[0],
            -slice[1] + self.view_position[1],
        ]
    }

    fn slice_to_display_voxel(&self, slice: [f64; 3]) -> [f64; 3] {
        [
            safe_div(slice[0], self.slice_spacing[0]) + 0.5 * f64::from(self.slice_size[0]),
            safe_div(slice[1], self.slice_spacing[1]) + 0.5 * f64::from(self.slice_size[1]),
            safe_div(slice[2], self.slice_spacing[2]),
        ]
    }

    pub fn map_slice_to_image(&self, slice: [f64; 3]) -> [f64; 3] {
        self.assert_initialized("map_slice_to_image");
        self.display_to_image
            .apply_point(self.slice_to_display_voxel(slice))
    }

    pub fn map_image_to_slice(&self, image: [f64; 3]) -> [f64; 3] {
        self.assert_initialized("map_image_to_slice");
        let d = self.image_to_display.apply_point(image);
        [
            (d[0] - 0.5 * f64::from(self.slice_size[0])) * self.slice_spacing[0],
            (d[1] - 0.5 * f64::from(self.slice_size[1])) * self.slice_spacing[1],
            d[2] * self.slice_spacing[2],
        ]
    }

    /// Voxel containing a slice-space point, or `None` outside the volume.
    pub fn map_slice_to_image_index(&self, slice: [f64; 3]) -> Option<[u32; 3]> {
        self.assert_initialized("map_slice_to_image_index");
        let d = self.slice_to_display_voxel(slice).map(f64::floor);
        for i in 0..3 {
            if !(d[i] >= 0.0 && d[i] < f64::from(self.slice_size[i])) {
                return None;
            }
        }
        Some(self.display_to_image.apply_index(d.map(|x| x as u32)))
    }

    /// Voxel nearest to a slice-space point, clamped into the volume.
    pub fn nearest_image_index(&self, slice: [f64; 3]) -> [u32; 3] {
        self.assert_initialized("nearest_image_index");
        let d = self.slice_to_display_voxel(slice);
        let clamped = [0, 1, 2].map(|i| {
            let last = f64::from(self.slice_size[i].saturating_sub(1));
            d[i].floor().clamp(0.0, last) as u32
        });
        self.display_to_image.apply_index(clamped)
    }

    /// Cursor position at the centre of its voxel, in slice coordinates.
    pub fn cursor_position_in_slice_coordinates(&self) -> [f64; 3] {
        self.assert_initialized("cursor_position_in_slice_coordinates");
        let centre = self.sources.cursor.get().map(|c| f64::from(c) + 0.5);
        self.map_image_to_slice(centre)
    }

    // ------------------------------------------------------------------
    // Slice index
    // ------------------------------------------------------------------

    pub fn slice_index(&self) -> u32 {
        self.slice_index
    }

    pub fn number_of_slices(&self) -> u32 {
        self.slice_size[2]
    }

    /// Move to another slice, clamped to the volume. The shared cursor
    /// follows, keeping its in-plane position. Returns whether the cursor
    /// moved.
    ///
    /// The request is compared against the cursor rather than the cached
    /// index, which lags behind until the next update.
    pub fn update_slice_index(&mut self, index: i64) -> bool {
        self.assert_initialized("update_slice_index");
        let count = self.number_of_slices();
        if count == 0 {
            return false;
        }
        let clamped = index.clamp(0, i64::from(count) - 1) as u32;
        self.slice_index = clamped;
        if clamped == self.slice_index_from_cursor() {
            return false;
        }

        let cursor = self.clamp_to_volume(self.sources.cursor.get());
        let mut display = self.image_to_display.apply_index(cursor);
        display[2] = clamped;
        let moved = self.display_to_image.apply_index(display);
        debug!(plane = %self.plane, slice_index = clamped, cursor = ?moved, "Slice index updated");
        self.sources.cursor.set(moved);
        true
    }

    // ------------------------------------------------------------------
    // Zoom and pan
    // ------------------------------------------------------------------

    /// Compute the zoom at which the slice plus margin fits the viewport.
    /// Returns `None`, leaving the previous value, when no fit exists.
    pub fn compute_optimal_zoom(&mut self) -> Option<f64> {
        self.assert_initialized("compute_optimal_zoom");
        let margin = 2.0 * self.config.margin;
        let fit_w = f64::from(self.slice_size[0]) * self.slice_spacing[0] + margin;
        let fit_h = f64::from(self.slice_size[1]) * self.slice_spacing[1] + margin;
        let [w, h] = self.viewport_size.map(f64::from);

        if w <= 0.0 || h <= 0.0 || fit_w <= 0.0 || fit_h <= 0.0 {
            debug!(plane = %self.plane, viewport = ?self.viewport_size, "No valid fit for slice");
            return None;
        }
        let zoom = (w / fit_w).min(h / fit_h);
        if !zoom.is_finite() || zoom <= 0.0 {
            warn!(plane = %self.plane, zoom, "Ignoring degenerate optimal zoom");
            return None;
        }

        self.optimal_zoom = zoom;
        self.optimal_view_position = [0.0; 2];
        Some(zoom)
    }

    /// Centre the slice and, unless zoom is managed externally, fit it.
    pub fn reset_view_to_fit(&mut self) {
        self.assert_initialized("reset_view_to_fit");
        self.compute_optimal_zoom();
        self.view_position = self.optimal_view_position;
        if !self.managed_zoom && self.optimal_zoom > 0.0 {
            self.view_zoom = self.optimal_zoom;
        }
        self.compute_thumbnail_properties();
        debug!(plane = %self.plane, zoom = self.view_zoom, "View reset to fit");
        self.core.subject().fire(EventKind::SliceGeometryChange);
    }

    pub fn reset_view_position(&mut self) {
        self.set_view_position(self.optimal_view_position);
    }

    /// Called by the view whenever its size changes. The cursor never moves.
    pub fn on_view_resize(&mut self, width: u32, height: u32) {
        if self.viewport_size == [width, height] {
            return;
        }
        self.viewport_size = [width, height];
        if !self.initialized {
            return;
        }

        if self.config.auto_refit_on_resize {
            self.reset_view_to_fit();
        } else {
            self.compute_optimal_zoom();
            self.compute_thumbnail_properties();
            self.core.subject().fire(EventKind::SliceGeometryChange);
        }
    }

    /// Set screen pixels per physical unit. Non-positive or non-finite
    /// values are ignored.
    pub fn set_view_zoom(&mut self, zoom: f64) {
        if !zoom.is_finite() || zoom <= 0.0 {
            warn!(plane = %self.plane, zoom, "Ignoring invalid view zoom");
            return;
        }
        if (zoom - self.view_zoom).abs() < EPSILON {
            return;
        }
        self.view_zoom = zoom;
        if self.initialized {
            self.compute_thumbnail_properties();
        }
        self.core.subject().fire(EventKind::SliceGeometryChange);
    }

    /// Non-finite positions are ignored.
    pub fn set_view_position(&mut self, position: [f64; 2]) {
        if !position.iter().all(|p| p.is_finite()) {
            warn!(plane = %self.plane, ?position, "Ignoring invalid view position");
            return;
        }
        if position == self.view_position {
            return;
        }
        self.view_position = position;
        self.core.subject().fire(EventKind::SliceGeometryChange);
    }

    pub fn set_managed_zoom(&mut self, managed: bool) {
        self.managed_zoom = managed;
    }

    /// Offset from the viewport centre to the cursor, in slice units. Used
    /// to synchronize panning between sessions.
    pub fn view_position_relative_to_cursor(&self) -> [f64; 2] {
        let cursor = self.cursor_position_in_slice_coordinates();
        let centre = self.map_window_to_slice(self.viewport_centre());
        [cursor[0] - centre[0], cursor[1] - centre[1]]
    }

    pub fn set_view_position_relative_to_cursor(&mut self, offset: [f64; 2]) {
        let cursor = self.cursor_position_in_slice_coordinates();
        self.set_view_position([offset[0] - cursor[0], cursor[1] - offset[1]]);
    }

    fn viewport_centre(&self) -> [f64; 2] {
        self.viewport_size.map(|s| 0.5 * f64::from(s))
    }

    /// Canvas size needed to show the whole slice plus margin at the
    /// current zoom.
    pub fn optimal_canvas_size(&self) -> [u32; 2] {
        self.assert_initialized("optimal_canvas_size");
        let margin = 2.0 * self.config.margin;
        [0, 1].map(|i| {
            let extent = f64::from(self.slice_size[i]) * self.slice_spacing[i] + margin;
            (extent * self.view_zoom).ceil().max(0.0) as u32
        })
    }

    // ------------------------------------------------------------------
    // Thumbnail
    // ------------------------------------------------------------------

    pub fn compute_thumbnail_properties(&mut self) {
        let world = [0, 1].map(|i| f64::from(self.slice_size[i]) * self.slice_spacing[i]);
        let box_px = f64::from(self.config.thumbnail.max_size_px);
        let margin = i32::try_from(self.config.thumbnail.margin_px).unwrap_or(i32::MAX);

        if world[0] <= 0.0 || world[1] <= 0.0 {
            self.thumbnail = Thumbnail::default();
            return;
        }
        let zoom = (box_px / world[0]).min(box_px / world[1]);
        self.thumbnail = Thumbnail {
            position: [margin, margin],
            size: world.map(|w| (w * zoom).round() as i32),
            zoom,
        };
    }

    /// The thumbnail is shown once the view is zoomed in far enough that
    /// the context of the whole slice is lost.
    pub fn is_thumbnail_on(&self) -> bool {
        let thumbnail = &self.config.thumbnail;
        thumbnail.enabled
            && self.initialized
            && self.optimal_zoom > 0.0
            && self.view_zoom > self.optimal_zoom * thumbnail.zoom_threshold
    }

    // ------------------------------------------------------------------
    // Session state
    // ------------------------------------------------------------------

    pub fn view_state(&self) -> SliceViewState {
        SliceViewState {
            view_zoom: self.view_zoom,
            view_position: self.view_position,
            slice_index: self.slice_index,
        }
    }

    pub fn restore_view_state(&mut self, state: &SliceViewState) {
        self.assert_initialized("restore_view_state");
        self.set_view_zoom(state.view_zoom);
        self.set_view_position(state.view_position);
        self.update_slice_index(i64::from(state.slice_index));
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn plane(&self) -> Plane {
        self.plane
    }

    /// Window id: the display direction along which this window slices.
    pub fn id(&self) -> usize {
        self.plane.index()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &SliceViewConfig {
        &self.config
    }

    pub fn sources(&self) -> &SliceViewSources {
        &self.sources
    }

    pub fn slice_size(&self) -> [u32; 3] {
        self.slice_size
    }

    pub fn slice_spacing(&self) -> [f64; 3] {
        self.slice_spacing
    }

    pub fn viewport_size(&self) -> [u32; 2] {
        self.viewport_size
    }

    pub fn view_position(&self) -> [f64; 2] {
        self.view_position
    }

    pub fn optimal_view_position(&self) -> [f64; 2] {
        self.optimal_view_position
    }

    pub fn view_zoom(&self) -> f64 {
        self.view_zoom
    }

    /// Zero until a fit has been computed.
    pub fn optimal_zoom(&self) -> f64 {
        self.optimal_zoom
    }

    pub fn is_managed_zoom(&self) -> bool {
        self.managed_zoom
    }

    pub fn thumbnail(&self) -> Thumbnail {
        self.thumbnail
    }

    /// Image axis along which this window shows slices.
    pub fn slice_direction_in_image_space(&self) -> usize {
        self.image_axes[2]
    }

    /// Image axis shown along each display axis.
    pub fn image_axes(&self) -> [usize; 3] {
        self.image_axes
    }

    pub fn image_to_display(&self) -> &CoordinateTransform {
        &self.image_to_display
    }

    pub fn display_to_image(&self) -> &CoordinateTransform {
        &self.display_to_image
    }

    pub fn display_to_anatomy(&self) -> AxisPermutation {
        self.display_to_anatomy
    }

    pub fn textures(&self) -> &LayerResourceMap<F::Resource> {
        &self.textures
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }
}

impl<F: LayerResourceFactory> Model for SliceViewModel<F> {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn on_update(&mut self, bucket: &EventBucket) {
        let image_loaded = self.sources.image_data.is_main_loaded();
        let needs_init = image_loaded
            && (bucket.has(EventKind::DisplayOrientationChange)
                || (!self.initialized && bucket.has(EventKind::ImageDimensionsChange)));

        if needs_init {
            // Re-initializing also rebuilds the texture map.
            if let Err(e) = self.initialize_slice() {
                debug!(plane = %self.plane, error = %e, "Slice not initialized");
            }
            return;
        }

        if self.initialized && bucket.has(EventKind::ImageDimensionsChange) {
            self.on_source_data_update();
        }
        if self.initialized && bucket.has(EventKind::CursorUpdate) {
            self.slice_index = self.slice_index_from_cursor();
        }
        if bucket.has(EventKind::LayerChange) {
            self.update_texture_map();
        }
    }
}

impl<F: LayerResourceFactory> Observable for SliceViewModel<F> {
    fn subject(&self) -> &Subject {
        self.core.subject()
    }
}

impl<F: LayerResourceFactory> Drop for SliceViewModel<F> {
    fn drop(&mut self) {
        self.textures.release_all(&mut self.factory);
    }
}

impl<F: LayerResourceFactory> fmt::Debug for SliceViewModel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceViewModel")
            .field("plane", &self.plane)
            .field("initialized", &self.initialized)
            .field("slice_size", &self.slice_size)
            .field("slice_spacing", &self.slice_spacing)
            .field("slice_index", &self.slice_index)
            .field("viewport_size", &self.viewport_size)
            .field("view_position", &self.view_position)
            .field("view_zoom", &self.view_zoom)
            .field("optimal_zoom", &self.optimal_zoom)
            .field("managed_zoom", &self.managed_zoom)
            .field("layers", &self.textures.len())
            .finish()
    }
}
