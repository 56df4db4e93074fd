mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::count_events;
use orthoview_core::event::{EventBucket, EventKind};
use orthoview_core::model::{Model, ModelCore};
use orthoview_core::observe::{Observable, Subject};
use orthoview_core::property::{ConcreteProperty, NumericRange, PropertyModel};
use orthoview_core::source::CursorStore;

/// Minimal model that remembers every bucket it was updated with.
#[derive(Default)]
struct Recorder {
    core: ModelCore,
    seen: Vec<EventBucket>,
}

impl Model for Recorder {
    fn core(&self) -> &ModelCore {
        &self.core
    }

    fn on_update(&mut self, bucket: &EventBucket) {
        self.seen.push(bucket.clone());
    }
}

impl Observable for Recorder {
    fn subject(&self) -> &Subject {
        self.core.subject()
    }
}

// ---------------------------------------------------------------------------
// EventBucket
// ---------------------------------------------------------------------------

#[test]
fn test_bucket_collapses_duplicates() {
    let mut bucket = EventBucket::new();
    bucket.record(EventKind::CursorUpdate);
    bucket.record(EventKind::CursorUpdate);
    bucket.record(EventKind::LayerChange);
    assert_eq!(bucket.len(), 2);
    assert!(bucket.has(EventKind::CursorUpdate));
    assert!(!bucket.has(EventKind::ModelUpdate));
}

// ---------------------------------------------------------------------------
// Rebroadcast
// ---------------------------------------------------------------------------

#[test]
fn test_rebroadcast_chain_records_both_kinds() {
    let source = Subject::new();
    let b = Recorder::default();
    let c = Recorder::default();
    b.core
        .rebroadcast(&source, EventKind::CursorUpdate, EventKind::ModelUpdate);
    c.core
        .rebroadcast(&b, EventKind::ModelUpdate, EventKind::SliceGeometryChange);
    let (hits, _sub) = count_events(&c, EventKind::SliceGeometryChange);

    source.fire(EventKind::CursorUpdate);

    let pending_b = b.core.pending();
    assert!(pending_b.has(EventKind::CursorUpdate));
    assert!(pending_b.has(EventKind::ModelUpdate));
    assert_eq!(pending_b.len(), 2);

    let pending_c = c.core.pending();
    assert!(pending_c.has(EventKind::ModelUpdate));
    assert!(pending_c.has(EventKind::SliceGeometryChange));
    assert_eq!(pending_c.len(), 2);

    assert_eq!(hits.get(), 1);
}

#[test]
fn test_unrelated_kind_is_not_rebroadcast() {
    let source = Subject::new();
    let b = Recorder::default();
    b.core
        .rebroadcast(&source, EventKind::CursorUpdate, EventKind::ModelUpdate);

    source.fire(EventKind::LayerChange);
    assert!(!b.core.has_pending());
}

#[test]
fn test_events_before_registration_are_not_replayed() {
    let source = Subject::new();
    source.fire(EventKind::CursorUpdate);

    let b = Recorder::default();
    b.core
        .rebroadcast(&source, EventKind::CursorUpdate, EventKind::ModelUpdate);
    assert!(!b.core.has_pending());
}

#[test]
fn test_update_runs_once_per_batch() {
    let source = Subject::new();
    let mut recorder = Recorder::default();
    recorder
        .core
        .rebroadcast(&source, EventKind::CursorUpdate, EventKind::ModelUpdate);
    recorder
        .core
        .rebroadcast(&source, EventKind::LayerChange, EventKind::ModelUpdate);

    source.fire(EventKind::CursorUpdate);
    source.fire(EventKind::CursorUpdate);
    source.fire(EventKind::LayerChange);

    assert!(recorder.update());
    assert!(!recorder.update());
    assert_eq!(recorder.seen.len(), 1);

    let bucket = &recorder.seen[0];
    assert!(bucket.has(EventKind::CursorUpdate));
    assert!(bucket.has(EventKind::LayerChange));
    assert!(bucket.has(EventKind::ModelUpdate));
    assert!(!recorder.core.has_pending());
}

#[test]
fn test_update_without_events_skips_hook() {
    let mut recorder = Recorder::default();
    assert!(!recorder.update());
    assert!(recorder.seen.is_empty());
}

#[test]
fn test_direct_record_is_processed() {
    let mut recorder = Recorder::default();
    recorder.core.record(EventKind::SliceDimensionsChange);
    assert!(recorder.update());
    assert!(recorder.seen[0].has(EventKind::SliceDimensionsChange));
}

#[test]
fn test_rebroadcast_property_value_changes() {
    let property = ConcreteProperty::new(3, NumericRange::new(0, 10, 1));
    let mut recorder = Recorder::default();
    recorder
        .core
        .rebroadcast_property(&*property, EventKind::ModelUpdate);
    let (hits, _sub) = count_events(&recorder, EventKind::ModelUpdate);

    property.set_domain(NumericRange::new(0, 20, 1));
    assert!(!recorder.core.has_pending());
    assert_eq!(hits.get(), 0);

    property.set_value(7);
    assert_eq!(hits.get(), 1);
    let pending = recorder.core.pending();
    assert!(pending.has(EventKind::ValueChanged));
    assert!(pending.has(EventKind::ModelUpdate));
    assert_eq!(pending.len(), 2);

    assert!(recorder.update());
    assert_eq!(recorder.seen.len(), 1);
}

// ---------------------------------------------------------------------------
// Propagation rounds
// ---------------------------------------------------------------------------

#[test]
fn test_rebroadcast_cycle_terminates() {
    let x = Recorder::default();
    let y = Recorder::default();
    x.core
        .rebroadcast(&y, EventKind::ModelUpdate, EventKind::ModelUpdate);
    y.core
        .rebroadcast(&x, EventKind::ModelUpdate, EventKind::ModelUpdate);
    let (x_hits, _sx) = count_events(&x, EventKind::ModelUpdate);
    let (y_hits, _sy) = count_events(&y, EventKind::ModelUpdate);

    x.subject().fire(EventKind::ModelUpdate);

    assert_eq!(x_hits.get(), 1);
    assert_eq!(y_hits.get(), 1);
    assert!(x.core.has_pending());
    assert!(y.core.has_pending());
}

#[test]
fn test_setter_inside_listener_redelivers() {
    let cursor = CursorStore::new();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let (s, c) = (Rc::clone(&seen), Rc::downgrade(&cursor));
    let _eager = cursor.subject().subscribe(EventKind::CursorUpdate, move |_| {
        if let Some(cursor) = c.upgrade() {
            s.borrow_mut().push(cursor.get());
        }
    });
    let c = Rc::downgrade(&cursor);
    let _limit = cursor.subject().subscribe(EventKind::CursorUpdate, move |_| {
        if let Some(cursor) = c.upgrade() {
            let [x, y, z] = cursor.get();
            if x > 8 {
                cursor.set([8, y, z]);
            }
        }
    });
    let recorder = Recorder::default();
    recorder
        .core
        .rebroadcast(&*cursor, EventKind::CursorUpdate, EventKind::ModelUpdate);
    let (hits, _sub) = count_events(&recorder, EventKind::ModelUpdate);

    cursor.set([9, 5, 6]);

    assert_eq!(cursor.get(), [8, 5, 6]);
    assert_eq!(*seen.borrow(), vec![[9, 5, 6], [8, 5, 6]]);
    // The rebroadcast still reaches downstream once per round.
    assert_eq!(hits.get(), 1);
    assert!(recorder.core.pending().has(EventKind::CursorUpdate));
}

#[test]
fn test_diamond_fan_in_fires_once() {
    let source = Subject::new();
    let left = Recorder::default();
    let right = Recorder::default();
    let sink = Recorder::default();
    left.core
        .rebroadcast(&source, EventKind::CursorUpdate, EventKind::ModelUpdate);
    right
        .core
        .rebroadcast(&source, EventKind::CursorUpdate, EventKind::ModelUpdate);
    sink.core
        .rebroadcast(&left, EventKind::ModelUpdate, EventKind::ModelUpdate);
    sink.core
        .rebroadcast(&right, EventKind::ModelUpdate, EventKind::ModelUpdate);
    let (hits, _sub) = count_events(&sink, EventKind::ModelUpdate);

    source.fire(EventKind::CursorUpdate);
    assert_eq!(hits.get(), 1);

    // A second round is delivered again.
    source.fire(EventKind::CursorUpdate);
    assert_eq!(hits.get(), 2);
}

// ---------------------------------------------------------------------------
// Lifetimes
// ---------------------------------------------------------------------------

#[test]
fn test_dropping_model_deregisters_links() {
    let source = Subject::new();
    let recorder = Recorder::default();
    recorder
        .core
        .rebroadcast(&source, EventKind::CursorUpdate, EventKind::ModelUpdate);
    assert_eq!(source.listener_count(), 1);
    assert_eq!(recorder.core.link_count(), 1);

    drop(recorder);
    assert_eq!(source.listener_count(), 0);
    source.fire(EventKind::CursorUpdate);
}

#[test]
fn test_dropping_source_first_is_safe() {
    let source = Subject::new();
    let mut recorder = Recorder::default();
    recorder
        .core
        .rebroadcast(&source, EventKind::CursorUpdate, EventKind::ModelUpdate);

    drop(source);
    assert!(!recorder.update());
    drop(recorder);
}

#[test]
fn test_listener_added_during_delivery_waits_for_next_fire() {
    let subject = Rc::new(Subject::new());
    let late_hits = Rc::new(Cell::new(0));
    let holder = Rc::new(RefCell::new(Vec::new()));

    let s = Rc::clone(&subject);
    let h = Rc::clone(&holder);
    let l = Rc::clone(&late_hits);
    let _first = subject.subscribe(EventKind::CursorUpdate, move |_| {
        if h.borrow().is_empty() {
            let l = Rc::clone(&l);
            let sub = s.subscribe(EventKind::CursorUpdate, move |_| l.set(l.get() + 1));
            h.borrow_mut().push(sub);
        }
    });

    subject.fire(EventKind::CursorUpdate);
    assert_eq!(late_hits.get(), 0);
    subject.fire(EventKind::CursorUpdate);
    assert_eq!(late_hits.get(), 1);
}
