#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use orthoview_core::config::SliceViewConfig;
use orthoview_core::coords::Plane;
use orthoview_core::event::EventKind;
use orthoview_core::model::Model;
use orthoview_core::observe::{Observable, Subscription};
use orthoview_core::resource::LayerResourceFactory;
use orthoview_core::slice::{SliceViewModel, SliceViewSources};
use orthoview_core::source::{
    CursorStore, DisplayOrientation, ImageData, ImageGeometry, LayerId,
};

/// Upstream collaborators shared by the models under test.
pub struct Fixture {
    pub image_data: Rc<ImageData>,
    pub cursor: Rc<CursorStore>,
    pub orientation: Rc<DisplayOrientation>,
}

impl Fixture {
    pub fn new(orientation_code: &str) -> Self {
        Self {
            image_data: ImageData::new(),
            cursor: CursorStore::new(),
            orientation: DisplayOrientation::from_code(orientation_code).unwrap(),
        }
    }

    pub fn sources(&self) -> SliceViewSources {
        SliceViewSources {
            image_data: Rc::clone(&self.image_data),
            cursor: Rc::clone(&self.cursor),
            orientation: Rc::clone(&self.orientation),
        }
    }

    pub fn load(&self, dimensions: [u32; 3], spacing: [f64; 3]) -> LayerId {
        let geometry = ImageGeometry::new(dimensions, spacing).unwrap();
        self.image_data.load_main(geometry, "main")
    }

    pub fn model(&self, plane: Plane, config: SliceViewConfig) -> SliceViewModel<RecordingFactory> {
        SliceViewModel::new(plane, self.sources(), RecordingFactory::default(), config)
    }
}

/// Default fixture: RAI image of 10 x 20 x 30 voxels, spacing 1 x 2 x 3,
/// cursor at (4, 5, 6), axial window of 200 x 100 pixels.
pub fn axial_setup() -> (Fixture, SliceViewModel<RecordingFactory>) {
    let fx = Fixture::new("RAI");
    fx.cursor.set([4, 5, 6]);
    let mut model = fx.model(Plane::Axial, SliceViewConfig::default());
    model.on_view_resize(200, 100);
    fx.load([10, 20, 30], [1.0, 2.0, 3.0]);
    assert!(model.update());
    assert!(model.is_initialized());
    (fx, model)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FactoryCall {
    Created(LayerId, u64),
    Released(LayerId, u64),
}

/// Resource factory that logs every call. The log is shared so it can be
/// inspected after the owning model is dropped.
#[derive(Default)]
pub struct RecordingFactory {
    pub log: Rc<RefCell<Vec<FactoryCall>>>,
    next: u64,
}

impl RecordingFactory {
    pub fn created(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|c| matches!(c, FactoryCall::Created(..)))
            .count()
    }

    pub fn released(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|c| matches!(c, FactoryCall::Released(..)))
            .count()
    }
}

impl LayerResourceFactory for RecordingFactory {
    type Resource = u64;

    fn create(&mut self, layer: LayerId) -> u64 {
        let handle = self.next;
        self.next += 1;
        self.log.borrow_mut().push(FactoryCall::Created(layer, handle));
        handle
    }

    fn release(&mut self, layer: LayerId, resource: u64) {
        self.log.borrow_mut().push(FactoryCall::Released(layer, resource));
    }
}

/// Count how often `kind` fires on `source`.
pub fn count_events(source: &impl Observable, kind: EventKind) -> (Rc<Cell<usize>>, Subscription) {
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    let sub = source.subject().subscribe(kind, move |_| h.set(h.get() + 1));
    (hits, sub)
}

pub fn assert_close2(actual: [f64; 2], expected: [f64; 2]) {
    for i in 0..2 {
        assert_abs_diff_eq!(actual[i], expected[i], epsilon = 1e-9);
    }
}

pub fn assert_close3(actual: [f64; 3], expected: [f64; 3]) {
    for i in 0..3 {
        assert_abs_diff_eq!(actual[i], expected[i], epsilon = 1e-9);
    }
}
