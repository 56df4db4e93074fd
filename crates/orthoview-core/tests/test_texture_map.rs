mod common;

use std::rc::Rc;

use common::{count_events, FactoryCall, Fixture};
use orthoview_core::config::SliceViewConfig;
use orthoview_core::coords::Plane;
use orthoview_core::event::EventKind;
use orthoview_core::model::Model;
use orthoview_core::observe::Observable;
use orthoview_core::resource::{KeyFactory, LayerResourceMap};
use orthoview_core::source::LayerId;

#[test]
fn test_main_layer_gets_resource_on_load() {
    let fx = Fixture::new("RAI");
    let mut model = fx.model(Plane::Axial, SliceViewConfig::default());
    let main = fx.load([8, 8, 8], [1.0, 1.0, 1.0]);
    model.update();

    assert_eq!(model.textures().len(), 1);
    assert!(model.textures().contains(main));
    assert_eq!(model.factory().created(), 1);
}

#[test]
fn test_detach_keeps_other_handles() {
    let fx = Fixture::new("RAI");
    let mut model = fx.model(Plane::Axial, SliceViewConfig::default());
    fx.load([8, 8, 8], [1.0, 1.0, 1.0]);
    let l1 = fx.image_data.add_overlay("l1").unwrap();
    let l2 = fx.image_data.add_overlay("l2").unwrap();
    model.update();

    assert_eq!(model.textures().len(), 3);
    let h1 = *model.textures().get(l1).unwrap();
    let h2 = *model.textures().get(l2).unwrap();

    fx.image_data.remove_layer(l1).unwrap();
    model.update();

    assert_eq!(model.textures().len(), 2);
    assert!(!model.textures().contains(l1));
    assert_eq!(model.textures().get(l2), Some(&h2));
    assert_eq!(model.factory().created(), 3);
    assert_eq!(model.factory().released(), 1);
    assert_eq!(
        model.factory().log.borrow().last(),
        Some(&FactoryCall::Released(l1, h1))
    );
}

#[test]
fn test_orientation_change_keeps_handles() {
    let fx = Fixture::new("RAI");
    let mut model = fx.model(Plane::Axial, SliceViewConfig::default());
    let main = fx.load([8, 8, 8], [1.0, 1.0, 1.0]);
    model.update();
    let handle = *model.textures().get(main).unwrap();

    fx.orientation.set_orientation_code("LPS").unwrap();
    model.update();

    assert_eq!(model.textures().get(main), Some(&handle));
    assert_eq!(model.factory().created(), 1);
}

#[test]
fn test_unload_releases_everything() {
    let fx = Fixture::new("RAI");
    let mut model = fx.model(Plane::Axial, SliceViewConfig::default());
    fx.load([8, 8, 8], [1.0, 1.0, 1.0]);
    fx.image_data.add_overlay("overlay").unwrap();
    model.update();

    fx.image_data.unload_all();
    model.update();
    assert!(model.textures().is_empty());
    assert_eq!(model.factory().released(), 2);
    assert!(model.is_initialized());

    let main = fx.load([4, 6, 8], [1.0, 1.0, 1.0]);
    model.update();
    assert!(model.textures().contains(main));
    assert_eq!(model.slice_size(), [4, 6, 8]);
}

#[test]
fn test_drop_releases_each_resource_once() {
    let fx = Fixture::new("RAI");
    let mut model = fx.model(Plane::Axial, SliceViewConfig::default());
    fx.load([8, 8, 8], [1.0, 1.0, 1.0]);
    let overlay = fx.image_data.add_overlay("overlay").unwrap();
    model.update();
    fx.image_data.remove_layer(overlay).unwrap();
    model.update();

    let log = Rc::clone(&model.factory().log);
    drop(model);

    let log = log.borrow();
    let created: Vec<_> = log
        .iter()
        .filter_map(|c| match c {
            FactoryCall::Created(layer, handle) => Some((*layer, *handle)),
            _ => None,
        })
        .collect();
    let mut released: Vec<_> = log
        .iter()
        .filter_map(|c| match c {
            FactoryCall::Released(layer, handle) => Some((*layer, *handle)),
            _ => None,
        })
        .collect();
    released.sort();
    assert_eq!(created, released);
}

#[test]
fn test_dropped_model_stops_listening() {
    let fx = Fixture::new("RAI");
    let model = fx.model(Plane::Axial, SliceViewConfig::default());
    let (hits, _sub) = count_events(&model, EventKind::ModelUpdate);
    fx.cursor.set([1, 1, 1]);
    assert_eq!(hits.get(), 1);

    let listeners = fx.cursor.subject().listener_count();
    drop(model);
    assert_eq!(fx.cursor.subject().listener_count(), listeners - 1);
    fx.cursor.set([2, 2, 2]);
}

#[test]
fn test_key_factory_map_without_model() {
    let mut factory = KeyFactory::new();
    let mut map = LayerResourceMap::new();
    let report = map.sync(&[LayerId(4), LayerId(7)], &mut factory);
    assert_eq!(report.created, vec![LayerId(4), LayerId(7)]);
    let report = map.sync(&[LayerId(4), LayerId(7)], &mut factory);
    assert!(report.is_unchanged());
    assert_eq!(factory.live(), 2);
}
