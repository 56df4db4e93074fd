//! Two-phase "notify now, recompute later" protocol shared by all models.
//!
//! A model listens to upstream subjects through rebroadcast links. When an
//! upstream event fires, the link only records what happened into the
//! model's [`EventBucket`] and re-fires a target event on the model's own
//! subject, so downstream views learn that the model is stale. The view
//! then calls [`Model::update`] when convenient, which hands the
//! accumulated bucket to [`Model::on_update`] exactly once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::event::{EventBucket, EventKind};
use crate::observe::{Observable, Subject, Subscription};

/// State every model carries by value: its own subject, the pending event
/// bucket and the subscriptions that feed it.
pub struct ModelCore {
    subject: Subject,
    bucket: Rc<RefCell<EventBucket>>,
    links: RefCell<Vec<Subscription>>,
}

impl ModelCore {
    pub fn new() -> Self {
        Self {
            subject: Subject::new(),
            bucket: Rc::new(RefCell::new(EventBucket::new())),
            links: RefCell::new(Vec::new()),
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Listen for `source_kind` on `source`. Each time it fires, both the
    /// source and target kinds are recorded in this model's bucket and
    /// `target_kind` is fired on this model's subject.
    ///
    /// The link lives until this core is dropped. Events fired before the
    /// call are not replayed.
    pub fn rebroadcast(
        &self,
        source: &impl Observable,
        source_kind: EventKind,
        target_kind: EventKind,
    ) {
        let bucket = Rc::downgrade(&self.bucket);
        let target = self.subject.downgrade();
        let link = source.subject().subscribe(source_kind, move |fired| {
            if let Some(bucket) = bucket.upgrade() {
                let mut bucket = bucket.borrow_mut();
                bucket.record(fired);
                bucket.record(target_kind);
            }
            target.relay(target_kind);
        });
        debug!(
            source = source.subject().id(),
            target = self.subject.id(),
            %source_kind,
            %target_kind,
            "Rebroadcast link registered"
        );
        self.links.borrow_mut().push(link);
    }

    /// Rebroadcast value changes of a single observable property.
    pub fn rebroadcast_property(&self, property: &impl Observable, target_kind: EventKind) {
        self.rebroadcast(property, EventKind::ValueChanged, target_kind);
    }

    /// Record an event directly, without going through a link.
    pub fn record(&self, kind: EventKind) {
        self.bucket.borrow_mut().record(kind);
    }

    pub fn has_pending(&self) -> bool {
        !self.bucket.borrow().is_empty()
    }

    /// Copy of the events recorded since the last update.
    pub fn pending(&self) -> EventBucket {
        self.bucket.borrow().clone()
    }

    /// Detach the pending events, leaving an empty bucket behind.
    pub fn take_pending(&self) -> EventBucket {
        std::mem::take(&mut *self.bucket.borrow_mut())
    }

    pub fn link_count(&self) -> usize {
        self.links.borrow().len()
    }
}

impl Default for ModelCore {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for ModelCore {
    fn subject(&self) -> &Subject {
        &self.subject
    }
}

impl fmt::Debug for ModelCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCore")
            .field("subject", &self.subject)
            .field("pending", &*self.bucket.borrow())
            .field("links", &self.link_count())
            .finish()
    }
}

/// A model that recomputes lazily from the events in its bucket.
pub trait Model {
    fn core(&self) -> &ModelCore;

    /// Recompute derived state. Only called with a non-empty bucket.
    fn on_update(&mut self, _bucket: &EventBucket) {}

    /// Process everything recorded since the previous call. Returns whether
    /// [`Model::on_update`] ran. The bucket is flushed in both cases.
    fn update(&mut self) -> bool {
        let bucket = self.core().take_pending();
        if bucket.is_empty() {
            return false;
        }
        debug!(model = self.core().subject().id(), events = %bucket, "Updating model");
        self.on_update(&bucket);
        true
    }
}
