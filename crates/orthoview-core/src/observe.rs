//! Listener registry and synchronous event delivery.
//!
//! A [`Subject`] keeps an ordered list of listeners, each interested in one
//! [`EventKind`]. Firing walks the matching listeners in registration order
//! and calls them immediately, so a change can ripple through a chain of
//! models before `fire` returns.
//!
//! Listeners are owned by the party that registered them through a
//! [`Subscription`] token. Dropping the token deregisters the listener;
//! dropping the subject first leaves the token inert. Neither order can
//! leave a dangling callback behind.
//!
//! Every top-level `fire` opens a propagation round. A direct
//! [`Subject::fire`] always delivers, since a setter only fires when its
//! value really changed. A [`Subject::relay`], used by rebroadcast links,
//! is dropped if the same (subject, kind) pair was already delivered in the
//! current round. This collapses diamond-shaped fan-in and terminates
//! rebroadcast cycles.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::event::EventKind;

type Callback = Rc<dyn Fn(EventKind)>;

thread_local! {
    static NEXT_SUBJECT_ID: Cell<u64> = const { Cell::new(1) };
    static PROPAGATION: RefCell<Propagation> = RefCell::new(Propagation::default());
}

#[derive(Default)]
struct Propagation {
    depth: usize,
    delivered: HashSet<(u64, EventKind)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delivery {
    Always,
    OncePerRound,
}

/// Marks one (subject, kind) delivery as in progress for the current round.
struct PropagationGuard;

impl PropagationGuard {
    fn enter(subject: u64, kind: EventKind, delivery: Delivery) -> Option<Self> {
        PROPAGATION.with(|p| {
            let mut p = p.borrow_mut();
            let first = p.delivered.insert((subject, kind));
            if !first && delivery == Delivery::OncePerRound {
                return None;
            }
            p.depth += 1;
            Some(PropagationGuard)
        })
    }
}

impl Drop for PropagationGuard {
    fn drop(&mut self) {
        PROPAGATION.with(|p| {
            let mut p = p.borrow_mut();
            p.depth -= 1;
            if p.depth == 0 {
                p.delivered.clear();
            }
        });
    }
}

struct Listener {
    id: u64,
    kind: EventKind,
    callback: Callback,
}

struct SubjectInner {
    id: u64,
    next_listener: Cell<u64>,
    listeners: RefCell<Vec<Listener>>,
}

/// Something that announces [`EventKind`]s to registered listeners.
///
/// Cloning a `Subject` clones the handle, not the listener list.
#[derive(Clone)]
pub struct Subject {
    inner: Rc<SubjectInner>,
}

impl Subject {
    pub fn new() -> Self {
        let id = NEXT_SUBJECT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            inner: Rc::new(SubjectInner {
                id,
                next_listener: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Process-unique identity of this subject.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Register `callback` for `kind`. The listener lives as long as the
    /// returned token.
    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(EventKind) + 'static,
    ) -> Subscription {
        let id = self.inner.next_listener.get();
        self.inner.next_listener.set(id + 1);
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            kind,
            callback: Rc::new(callback),
        });
        Subscription {
            subject: Rc::downgrade(&self.inner),
            listener: id,
        }
    }

    /// Deliver `kind` to every matching listener, in registration order.
    pub fn fire(&self, kind: EventKind) {
        self.deliver(kind, Delivery::Always);
    }

    /// Like [`Subject::fire`], but skipped if this subject already delivered
    /// `kind` in the current propagation round.
    pub fn relay(&self, kind: EventKind) {
        self.deliver(kind, Delivery::OncePerRound);
    }

    fn deliver(&self, kind: EventKind, delivery: Delivery) {
        let Some(_guard) = PropagationGuard::enter(self.inner.id, kind, delivery) else {
            trace!(subject = self.inner.id, %kind, "Event already delivered in this round");
            return;
        };

        // Snapshot so listeners may subscribe or unsubscribe while we deliver.
        let callbacks: Vec<Callback> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| Rc::clone(&l.callback))
            .collect();

        trace!(subject = self.inner.id, %kind, listeners = callbacks.len(), "Firing event");
        for callback in callbacks {
            callback(kind);
        }
    }

    /// A handle that can fire this subject without keeping it alive.
    pub fn downgrade(&self) -> WeakSubject {
        WeakSubject {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Default for Subject {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("id", &self.inner.id)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Non-owning handle to a [`Subject`].
#[derive(Clone, Debug)]
pub struct WeakSubject {
    inner: Weak<SubjectInner>,
}

impl WeakSubject {
    /// Fire on the subject if it is still alive. Returns false otherwise.
    pub fn fire(&self, kind: EventKind) -> bool {
        match self.inner.upgrade() {
            Some(inner) => {
                Subject { inner }.fire(kind);
                true
            }
            None => false,
        }
    }

    /// Relay on the subject if it is still alive. Returns false otherwise.
    pub fn relay(&self, kind: EventKind) -> bool {
        match self.inner.upgrade() {
            Some(inner) => {
                Subject { inner }.relay(kind);
                true
            }
            None => false,
        }
    }

    pub fn upgrade(&self) -> Option<Subject> {
        self.inner.upgrade().map(|inner| Subject { inner })
    }
}

/// Registration token returned by [`Subject::subscribe`].
#[must_use = "the listener is removed as soon as the subscription is dropped"]
pub struct Subscription {
    subject: Weak<SubjectInner>,
    listener: u64,
}

impl Subscription {
    /// False once the subject has been dropped.
    pub fn is_active(&self) -> bool {
        self.subject.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.subject.upgrade() {
            inner
                .listeners
                .borrow_mut()
                .retain(|l| l.id != self.listener);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("listener", &self.listener)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Anything that exposes a subject for others to listen to.
pub trait Observable {
    fn subject(&self) -> &Subject;
}

impl Observable for Subject {
    fn subject(&self) -> &Subject {
        self
    }
}
