//! Dependency Collections
//!
//! A [`DependencyCollection`] belongs to one consumer (a computed property,
//! a watcher). It owns one binding per notifier the consumer currently
//! depends on, all of them driving the same trigger handler.
//!
//! # How Collections Work
//!
//! 1. The consumer runs its computation through [`DependencyCollection::track`],
//!    which pushes a tracking frame and records every notifier read.
//!
//! 2. If the computation succeeds, the collection reconciles against the
//!    new read set: notifiers read for the first time get bound to the
//!    trigger, notifiers no longer read get unbound.
//!
//! 3. If the computation fails, the previous subscriptions stay as they were.
//!
//! Because the set of bindings is recomputed every time, dependencies are
//! dynamic: a computation that reads `a` or `b` depending on a flag is only
//! ever subscribed to the branch it actually took last time.
//!
//! The collection only holds the notifiers weakly (through the bindings), so
//! it never keeps a dependency alive on its own.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use super::context::{track, Reads};
use super::ids::NotifierId;
use super::lifetime::Lifetime;
use super::notifier::{Handler, Notifier};

/// A per-consumer set of subscriptions, reconciled after each tracked
/// computation.
pub struct DependencyCollection {
    trigger: Rc<Handler<()>>,
    bindings: RefCell<IndexMap<NotifierId, Lifetime>>,
    disposed: Cell<bool>,
}

impl DependencyCollection {
    /// Create an empty collection whose dependencies will all drive `trigger`.
    pub fn new<F>(trigger: F) -> Self
    where
        F: Fn(&()) + 'static,
    {
        Self {
            trigger: Rc::new(trigger),
            bindings: RefCell::new(IndexMap::new()),
            disposed: Cell::new(false),
        }
    }

    /// Run `compute` as a tracked computation.
    ///
    /// On success the subscriptions are reconciled against everything the
    /// computation read. On failure the error is returned as-is and the
    /// subscriptions are left untouched.
    pub fn track<T, E>(&self, compute: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let (result, reads) = track(compute);
        if result.is_ok() {
            self.reconcile(&reads);
        }
        result
    }

    /// Bring the subscriptions in line with `reads`.
    ///
    /// After this call the set of bound notifiers equals the set in `reads`.
    pub fn reconcile(&self, reads: &Reads) {
        if self.disposed.get() {
            return;
        }

        let stale: Vec<Lifetime> = {
            let mut bindings = self.bindings.borrow_mut();
            let stale_ids: Vec<NotifierId> = bindings
                .keys()
                .filter(|id| !reads.contains(**id))
                .copied()
                .collect();
            stale_ids
                .iter()
                .filter_map(|id| bindings.shift_remove(id))
                .collect()
        };

        let mut added = 0;
        for notifier in reads.iter() {
            if self.bind(notifier) {
                added += 1;
            }
        }

        debug!(
            added,
            removed = stale.len(),
            total = self.len(),
            "reconciled dependencies"
        );

        // Unbind outside the borrow; dropping a lifetime releases its handler.
        drop(stale);
    }

    /// Subscribe to `notifier`, unless already subscribed.
    pub fn add_dependency(&self, notifier: &Notifier) {
        if !self.disposed.get() {
            self.bind(notifier);
        }
    }

    /// Unsubscribe from `notifier`. Unknown notifiers are ignored.
    pub fn remove_dependency(&self, notifier: &Notifier) {
        let removed = self.bindings.borrow_mut().shift_remove(&notifier.id());
        drop(removed);
    }

    /// Returns true if the collection is subscribed to `notifier`.
    pub fn contains(&self, notifier: &Notifier) -> bool {
        self.bindings.borrow().contains_key(&notifier.id())
    }

    /// Number of notifiers currently subscribed to.
    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    /// Unbind everything. The collection ignores any later reconciliation.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        debug!(released = bindings.len(), "disposed dependency collection");
        drop(bindings);
    }

    /// Returns true until [`dispose`](Self::dispose) has been called.
    pub fn is_alive(&self) -> bool {
        !self.disposed.get()
    }

    fn bind(&self, notifier: &Notifier) -> bool {
        if self.bindings.borrow().contains_key(&notifier.id()) {
            return false;
        }
        let lifetime = notifier.bind_shared(Rc::clone(&self.trigger));
        self.bindings.borrow_mut().insert(notifier.id(), lifetime);
        true
    }
}

impl Drop for DependencyCollection {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for DependencyCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyCollection")
            .field("dependency_count", &self.len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
