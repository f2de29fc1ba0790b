//! Computed Implementation
//!
//! A [`Computed`] is a cached derived value that re-evaluates only after one
//! of the reactive values it read has changed.
//!
//! # How Computed Properties Work
//!
//! 1. A computed starts `Dirty` with an empty cache. Nothing runs until the
//!    first read.
//!
//! 2. Reading a dirty computed runs the compute function inside its own
//!    dependency collection. Every reactive value read along the way becomes
//!    a dependency. The result is cached and the state becomes `Clean`.
//!
//! 3. Reading a clean computed returns the cache without calling user code.
//!
//! 4. When any dependency fires, the computed becomes `Dirty` and fires its
//!    own notifier, so computeds built on top of it are invalidated too.
//!    Invalidation travels up the chain immediately; recomputation waits for
//!    the next read.
//!
//! # Failures
//!
//! If the compute function fails, the error goes to the caller, the state
//! stays `Dirty` and the previous cache is kept as it was. The next read
//! tries again. The subscriptions from the last successful run stay in
//! place, so changes keep being reported.
//!
//! # Ownership
//!
//! Dependencies reference the computed only weakly. Dropping the last handle
//! to a computed drops its dependency collection and with it every
//! subscription.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::dependency::DependencyCollection;
use super::notifier::Notifier;
use super::property::Source;
use crate::error::{PropertyError, Result};

/// Cache state of a computed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency changed (or nothing was computed yet). Must recompute.
    Dirty,
}

type ComputeFn<T> = Box<dyn Fn() -> Result<T>>;

struct ComputedInner<T: 'static> {
    name: String,
    compute: ComputeFn<T>,
    cache: RefCell<Option<T>>,
    state: Cell<ComputedState>,

    /// Bumped on every invalidation. A recompute only marks the cache clean
    /// if no invalidation arrived while it was running.
    epoch: Cell<u64>,

    notifier: Notifier,
    dependencies: DependencyCollection,
}

impl<T: 'static> ComputedInner<T> {
    fn invalidate(&self) {
        self.epoch.set(self.epoch.get().wrapping_add(1));
        let previous = self.state.replace(ComputedState::Dirty);
        trace!(property = %self.name, was = ?previous, "computed invalidated");
        self.notifier.notify();
    }
}

impl<T: Clone + 'static> ComputedInner<T> {
    fn value(&self) -> Result<T> {
        if self.state.get() == ComputedState::Clean {
            if let Some(value) = self.cache.borrow().as_ref() {
                return Ok(value.clone());
            }
        }

        let epoch = self.epoch.get();
        debug!(property = %self.name, "recomputing");
        let value = self.dependencies.track(|| (self.compute)())?;

        let previous = self.cache.borrow_mut().replace(value.clone());
        drop(previous);

        if self.epoch.get() == epoch {
            self.state.set(ComputedState::Clean);
        } else {
            debug!(property = %self.name, "invalidated while recomputing");
        }
        Ok(value)
    }
}

/// A read-only reactive property derived from other reactive values.
///
/// # Example
///
/// ```rust
/// use signet_core::reactive::{Computed, Value};
///
/// let a = Value::new("a", 1);
/// let b = Computed::new("b", {
///     let a = a.clone();
///     move || a.get().unwrap_or_default() * 10
/// });
///
/// assert_eq!(b.get().unwrap(), 10);
/// a.set(2).unwrap();
/// assert_eq!(b.get().unwrap(), 20);
/// ```
pub struct Computed<T: 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T: Clone + 'static> Computed<T> {
    /// A computed property from an infallible function.
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(name.into(), Box::new(move || Ok(compute())))
    }

    /// A computed property from a fallible function.
    ///
    /// Errors from nested reactive reads can be propagated with `?`; other
    /// errors are wrapped with [`PropertyError::compute_failure`].
    pub fn try_new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self::build(name.into(), Box::new(compute))
    }

    /// A computed property derived from `instance`.
    ///
    /// The instance is held weakly. Once it has been dropped, recomputing
    /// fails with `NotSet`.
    pub fn bound<O, F>(name: impl Into<String>, instance: &Rc<O>, compute: F) -> Self
    where
        O: 'static,
        F: Fn(&O) -> Result<T> + 'static,
    {
        Self::bound_weak(name, Rc::downgrade(instance), compute)
    }

    /// Like [`bound`](Self::bound), for an instance that is still being
    /// built (see [`Rc::new_cyclic`]).
    pub fn bound_weak<O, F>(name: impl Into<String>, instance: Weak<O>, compute: F) -> Self
    where
        O: 'static,
        F: Fn(&O) -> Result<T> + 'static,
    {
        let name = name.into();
        let property = name.clone();
        Self::build(
            name,
            Box::new(move || match instance.upgrade() {
                Some(instance) => compute(&instance),
                None => Err(PropertyError::not_set(&property)),
            }),
        )
    }

    fn build(name: String, compute: ComputeFn<T>) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let weak = weak.clone();
            ComputedInner {
                name,
                compute,
                cache: RefCell::new(None),
                state: Cell::new(ComputedState::Dirty),
                epoch: Cell::new(0),
                notifier: Notifier::new(),
                dependencies: DependencyCollection::new(move |_| {
                    if let Some(inner) = weak.upgrade() {
                        inner.invalidate();
                    }
                }),
            }
        });
        Self { inner }
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// Inside a tracked computation this records a dependency on the
    /// computed itself (not on what it read).
    pub fn get(&self) -> Result<T> {
        ReactiveContext::track_dependency(&self.inner.notifier);
        self.inner.value()
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> Result<T> {
        self.inner.value()
    }

    /// Computed properties are read-only.
    pub fn set(&self, value: T) -> Result<()> {
        drop(value);
        Err(PropertyError::not_settable(&self.inner.name))
    }

    /// Computed properties are read-only.
    pub fn delete(&self) -> Result<()> {
        Err(PropertyError::not_deletable(&self.inner.name))
    }
}

impl<T: 'static> Computed<T> {
    /// Name of the property.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The notifier fired whenever the computed is invalidated.
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub fn state(&self) -> ComputedState {
        self.inner.state.get()
    }

    /// Returns true once a value has been computed successfully.
    pub fn has_value(&self) -> bool {
        self.inner.cache.borrow().is_some()
    }

    /// Number of reactive values the last successful computation read.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.len()
    }

    /// Mark the cache dirty and notify dependents, as if a dependency changed.
    pub fn invalidate(&self) {
        self.inner.invalidate();
    }
}

impl<T: Clone + 'static> Source<T> for Computed<T> {
    fn name(&self) -> &str {
        Computed::name(self)
    }

    fn read(&self) -> Result<T> {
        self.get()
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("name", &self.inner.name)
            .field("state", &self.inner.state.get())
            .field("cache", &self.inner.cache.borrow())
            .field("dependencies", &self.inner.dependencies)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
