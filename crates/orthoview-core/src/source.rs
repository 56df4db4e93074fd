//! Shared upstream state the slice models read from.
//!
//! Each collaborator is created behind an `Rc` and handed to every model
//! that needs it. Mutation goes through the setters below, which are the
//! only places the corresponding event is fired.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coords::{AxisPermutation, Plane};
use crate::error::{OrthoviewError, Result};
use crate::event::EventKind;
use crate::observe::{Observable, Subject};

/// Identity of a loaded image layer. Never reused within one `ImageData`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Voxel grid of the main image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    /// Voxels along each image axis.
    pub dimensions: [u32; 3],
    /// Physical size of a voxel along each image axis.
    pub spacing: [f64; 3],
}

impl ImageGeometry {
    /// Zero spacing is accepted (and absorbed by the slice model); empty,
    /// negative or non-finite values are not.
    pub fn new(dimensions: [u32; 3], spacing: [f64; 3]) -> Result<Self> {
        if dimensions.iter().any(|&d| d == 0) {
            return Err(OrthoviewError::InvalidDimensions(dimensions));
        }
        if spacing.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(OrthoviewError::InvalidSpacing(spacing));
        }
        Ok(Self {
            dimensions,
            spacing,
        })
    }

    pub fn physical_extent(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| f64::from(self.dimensions[i]) * self.spacing[i])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerRole {
    Main,
    Overlay,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayerInfo {
    pub id: LayerId,
    pub role: LayerRole,
    pub name: String,
}

#[derive(Default)]
struct ImageDataState {
    geometry: Option<ImageGeometry>,
    layers: Vec<LayerInfo>,
    next_layer: u64,
}

impl ImageDataState {
    fn allocate(&mut self, role: LayerRole, name: &str) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.layers.push(LayerInfo {
            id,
            role,
            name: name.to_string(),
        });
        id
    }
}

/// The image data container: main image geometry plus the loaded layers.
///
/// Fires [`EventKind::ImageDimensionsChange`] when the geometry changes and
/// [`EventKind::LayerChange`] when the set of layers changes.
pub struct ImageData {
    subject: Subject,
    state: RefCell<ImageDataState>,
}

impl ImageData {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            subject: Subject::new(),
            state: RefCell::new(ImageDataState::default()),
        })
    }

    pub fn is_main_loaded(&self) -> bool {
        self.state.borrow().geometry.is_some()
    }

    pub fn geometry(&self) -> Option<ImageGeometry> {
        self.state.borrow().geometry
    }

    pub fn dimensions(&self) -> Option<[u32; 3]> {
        self.geometry().map(|g| g.dimensions)
    }

    pub fn spacing(&self) -> Option<[f64; 3]> {
        self.geometry().map(|g| g.spacing)
    }

    /// Loaded layers in load order; the main image comes first.
    pub fn layers(&self) -> Vec<LayerId> {
        self.state.borrow().layers.iter().map(|l| l.id).collect()
    }

    pub fn layer_count(&self) -> usize {
        self.state.borrow().layers.len()
    }

    pub fn layer_info(&self, id: LayerId) -> Option<LayerInfo> {
        self.state
            .borrow()
            .layers
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }

    /// Replace the main image. Overlays are unloaded with the old image.
    pub fn load_main(&self, geometry: ImageGeometry, name: &str) -> LayerId {
        let (id, geometry_changed) = {
            let mut state = self.state.borrow_mut();
            let changed = state.geometry != Some(geometry);
            state.geometry = Some(geometry);
            state.layers.clear();
            (state.allocate(LayerRole::Main, name), changed)
        };
        debug!(layer = %id, ?geometry, "Main image loaded");
        if geometry_changed {
            self.subject.fire(EventKind::ImageDimensionsChange);
        }
        self.subject.fire(EventKind::LayerChange);
        id
    }

    /// Attach an overlay sharing the main image geometry.
    pub fn add_overlay(&self, name: &str) -> Result<LayerId> {
        let id = {
            let mut state = self.state.borrow_mut();
            if state.geometry.is_none() {
                return Err(OrthoviewError::NoMainImage);
            }
            state.allocate(LayerRole::Overlay, name)
        };
        debug!(layer = %id, name, "Overlay attached");
        self.subject.fire(EventKind::LayerChange);
        Ok(id)
    }

    /// Detach a layer. Removing the main image unloads everything.
    pub fn remove_layer(&self, id: LayerId) -> Result<()> {
        let role = self
            .layer_info(id)
            .map(|l| l.role)
            .ok_or(OrthoviewError::UnknownLayer(id.0))?;
        match role {
            LayerRole::Main => self.unload_all(),
            LayerRole::Overlay => {
                self.state.borrow_mut().layers.retain(|l| l.id != id);
                debug!(layer = %id, "Overlay detached");
                self.subject.fire(EventKind::LayerChange);
            }
        }
        Ok(())
    }

    /// Change dimensions or spacing of the loaded image in place.
    pub fn set_geometry(&self, geometry: ImageGeometry) -> Result<()> {
        {
            let mut state = self.state.borrow_mut();
            match state.geometry {
                None => return Err(OrthoviewError::NoMainImage),
                Some(current) if current == geometry => return Ok(()),
                Some(_) => state.geometry = Some(geometry),
            }
        }
        debug!(?geometry, "Image geometry changed");
        self.subject.fire(EventKind::ImageDimensionsChange);
        Ok(())
    }

    pub fn unload_all(&self) {
        let had_layers = {
            let mut state = self.state.borrow_mut();
            let had = !state.layers.is_empty();
            state.layers.clear();
            state.geometry = None;
            had
        };
        if had_layers {
            debug!("All layers unloaded");
            self.subject.fire(EventKind::ImageDimensionsChange);
            self.subject.fire(EventKind::LayerChange);
        }
    }
}

impl Observable for ImageData {
    fn subject(&self) -> &Subject {
        &self.subject
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ImageData")
            .field("geometry", &state.geometry)
            .field("layers", &state.layers.len())
            .finish()
    }
}

/// The single shared 3D cursor, as a voxel index in image space.
pub struct CursorStore {
    subject: Subject,
    position: Cell<[u32; 3]>,
}

impl CursorStore {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            subject: Subject::new(),
            position: Cell::new([0; 3]),
        })
    }

    pub fn get(&self) -> [u32; 3] {
        self.position.get()
    }

    /// Fires [`EventKind::CursorUpdate`] if the position actually changed.
    pub fn set(&self, position: [u32; 3]) {
        if self.position.replace(position) != position {
            debug!(?position, "Cursor moved");
            self.subject.fire(EventKind::CursorUpdate);
        }
    }
}

impl Observable for CursorStore {
    fn subject(&self) -> &Subject {
        &self.subject
    }
}

impl fmt::Debug for CursorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorStore")
            .field("position", &self.get())
            .finish()
    }
}

/// Supplies the image → display permutation of each slice window.
///
/// The anatomical → display part is fixed per [`Plane`]; the image →
/// anatomy part follows the orientation of the loaded image and fires
/// [`EventKind::DisplayOrientationChange`] when replaced.
pub struct DisplayOrientation {
    subject: Subject,
    image_to_anatomy: Cell<AxisPermutation>,
}

impl DisplayOrientation {
    pub fn new(image_to_anatomy: AxisPermutation) -> Rc<Self> {
        Rc::new(Self {
            subject: Subject::new(),
            image_to_anatomy: Cell::new(image_to_anatomy),
        })
    }

    pub fn from_code(code: &str) -> Result<Rc<Self>> {
        Ok(Self::new(AxisPermutation::from_orientation_code(code)?))
    }

    pub fn image_to_anatomy(&self) -> AxisPermutation {
        self.image_to_anatomy.get()
    }

    pub fn set_image_to_anatomy(&self, permutation: AxisPermutation) {
        if self.image_to_anatomy.replace(permutation) != permutation {
            debug!(%permutation, "Display orientation changed");
            self.subject.fire(EventKind::DisplayOrientationChange);
        }
    }

    pub fn set_orientation_code(&self, code: &str) -> Result<()> {
        self.set_image_to_anatomy(AxisPermutation::from_orientation_code(code)?);
        Ok(())
    }

    pub fn image_to_display(&self, plane: Plane) -> AxisPermutation {
        plane.anatomy_to_display().compose(&self.image_to_anatomy())
    }

    pub fn display_to_image(&self, plane: Plane) -> AxisPermutation {
        self.image_to_display(plane).inverse()
    }

    pub fn display_to_anatomy(&self, plane: Plane) -> AxisPermutation {
        plane.anatomy_to_display().inverse()
    }
}

impl Observable for DisplayOrientation {
    fn subject(&self) -> &Subject {
        &self.subject
    }
}

impl fmt::Debug for DisplayOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayOrientation")
            .field("code", &self.image_to_anatomy().to_orientation_code())
            .finish()
    }
}
