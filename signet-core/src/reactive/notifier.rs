//! Notifier Implementation
//!
//! A Notifier is a fan-out event source. Handlers are bound to it and all of
//! them are invoked each time it fires.
//!
//! # Ownership
//!
//! The notifier only holds weak references to its handlers. Binding a handler
//! returns a [`Lifetime`] which owns the handler and points back at the
//! notifier weakly:
//!
//! - dropping (or disposing) the lifetime removes the binding;
//! - dropping the notifier does not keep any handler alive, and a later
//!   dispose of the lifetime is a harmless no-op.
//!
//! # Firing
//!
//! Handlers are free to bind, unbind, or fire notifiers (including this one)
//! while being invoked. Firing therefore works on a snapshot of the bindings
//! taken before the first handler runs:
//!
//! - a binding added during the fire is not invoked by that fire;
//! - a binding disposed during the fire is skipped if its turn has not come yet.
//!
//! No ordering between handlers is guaranteed. A handler that panics aborts
//! the rest of the pass.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use super::ids::{BindingId, NotifierId};
use super::lifetime::Lifetime;

/// A handler bound to a notifier.
pub type Handler<A> = dyn Fn(&A);

struct NotifierInner<A: 'static> {
    id: NotifierId,
    bindings: RefCell<IndexMap<BindingId, Weak<Handler<A>>>>,
}

/// A source of notification events.
///
/// Cloning a notifier yields another handle to the same event source.
pub struct Notifier<A: 'static = ()> {
    inner: Rc<NotifierInner<A>>,
}

impl<A: 'static> Notifier<A> {
    /// Create a notifier with no handlers.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(NotifierInner {
                id: NotifierId::new(),
                bindings: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Get the notifier's unique ID.
    pub fn id(&self) -> NotifierId {
        self.inner.id
    }

    /// Bind a handler to this notifier.
    ///
    /// The handler stays bound for as long as the returned lifetime is alive.
    pub fn bind<F>(&self, handler: F) -> Lifetime
    where
        F: Fn(&A) + 'static,
    {
        self.bind_shared(Rc::new(handler))
    }

    /// Bind a shared handler to this notifier.
    ///
    /// The same handler may be bound several times, to this notifier or to
    /// others; every bind creates an independent binding.
    pub fn bind_shared(&self, handler: Rc<Handler<A>>) -> Lifetime {
        let binding = BindingId::new();
        self.inner
            .bindings
            .borrow_mut()
            .insert(binding, Rc::downgrade(&handler));

        trace!(notifier = %self.inner.id, %binding, "bound handler");

        let notifier = Rc::downgrade(&self.inner);
        Lifetime::new(move || {
            if let Some(notifier) = notifier.upgrade() {
                notifier.bindings.borrow_mut().shift_remove(&binding);
                trace!(notifier = %notifier.id, %binding, "unbound handler");
            }
            drop(handler);
        })
    }

    /// Invoke every currently bound handler exactly once.
    pub fn fire(&self, args: &A) {
        let snapshot: SmallVec<[(BindingId, Weak<Handler<A>>); 4]> = self
            .inner
            .bindings
            .borrow()
            .iter()
            .map(|(binding, handler)| (*binding, handler.clone()))
            .collect();

        trace!(notifier = %self.inner.id, handlers = snapshot.len(), "firing");

        for (binding, handler) in snapshot {
            // An earlier handler may have unbound this one.
            if !self.inner.bindings.borrow().contains_key(&binding) {
                continue;
            }
            if let Some(handler) = handler.upgrade() {
                handler(args);
            }
        }
    }

    /// Number of handlers currently bound.
    pub fn handler_count(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    /// Returns true if `other` is a handle to the same notifier.
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Notifier<()> {
    /// Fire a notifier that carries no arguments.
    pub fn notify(&self) {
        self.fire(&());
    }
}

impl<A: 'static> Default for Notifier<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> Clone for Notifier<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static> PartialEq for Notifier<A> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<A: 'static> Eq for Notifier<A> {}

impl<A: 'static> Hash for Notifier<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<A: 'static> fmt::Debug for Notifier<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("id", &self.inner.id)
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

/// Manual change notification.
///
/// Implemented by objects that want their mutations to count as a change of
/// any reactive property holding them, without being reactive properties
/// themselves (observable collections, for example).
pub trait ChangeNotifier {
    /// The notifier fired whenever this object changes.
    fn on_change(&self) -> &Notifier;
}

/// Ready-made [`ChangeNotifier`] implementation to embed in other types.
#[derive(Debug, Default, Clone)]
pub struct ChangeNotifierBase {
    on_change: Notifier,
}

impl ChangeNotifierBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the change notifier.
    pub fn notify_changed(&self) {
        self.on_change.notify();
    }
}

impl ChangeNotifier for ChangeNotifierBase {
    fn on_change(&self) -> &Notifier {
        &self.on_change
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
