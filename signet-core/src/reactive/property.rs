//! Reactive Properties
//!
//! [`Reactive`] layers reactivity over any [`Accessor`]:
//!
//! - every read announces the property's notifier to the active tracking
//!   frame, so whatever computation is running becomes dependent on it;
//! - every write (and delete) goes to the accessor and then fires the
//!   notifier, so every dependent hears about it before `set` returns.
//!
//! # Observable values
//!
//! A property built with [`Reactive::observable`] holds values that are
//! themselves observable (they implement [`ChangeNotifier`]). Reading such a
//! property also announces the value's own change notifier, so a computation
//! that reads, say, a list held by the property is re-run when the list is
//! mutated in place, not only when the property is reassigned.
//!
//! # Lookup by name
//!
//! Types that expose reactive properties by name implement [`Properties`].
//! This is what lets a watcher be started from a string.

use std::any::{type_name, Any};
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::accessor::Accessor;
use super::context::ReactiveContext;
use super::notifier::{ChangeNotifier, Notifier};
use crate::error::{PropertyError, Result};

/// A readable reactive value.
///
/// `read` is a tracked read: inside a tracked computation it records a
/// dependency on this source.
pub trait Source<T> {
    /// Name of the property.
    fn name(&self) -> &str;

    /// Read the current value, announcing the dependency.
    fn read(&self) -> Result<T>;
}

impl<T, S> Source<T> for Rc<S>
where
    S: Source<T> + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read(&self) -> Result<T> {
        (**self).read()
    }
}

type Observe<T> = fn(&T) -> Notifier;

fn observe_change<T: ChangeNotifier>(value: &T) -> Notifier {
    value.on_change().clone()
}

struct ReactiveInner<T, A> {
    accessor: A,
    notifier: Notifier,
    observe: Option<Observe<T>>,
}

/// A reactive property wrapping an accessor.
///
/// Cloning yields another handle to the same property.
pub struct Reactive<T, A> {
    inner: Rc<ReactiveInner<T, A>>,
}

impl<T, A> Reactive<T, A>
where
    A: Accessor<T>,
{
    /// Make `accessor` reactive.
    pub fn new(accessor: A) -> Self {
        Self::build(accessor, None)
    }

    fn build(accessor: A, observe: Option<Observe<T>>) -> Self {
        Self {
            inner: Rc::new(ReactiveInner {
                accessor,
                notifier: Notifier::new(),
                observe,
            }),
        }
    }

    /// Name of the property.
    pub fn name(&self) -> &str {
        self.inner.accessor.name()
    }

    /// The notifier fired on every write.
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// The wrapped accessor.
    pub fn accessor(&self) -> &A {
        &self.inner.accessor
    }

    /// Read the value, announcing this property (and an observable value's
    /// own notifier) to the active tracking frame.
    pub fn get(&self) -> Result<T> {
        ReactiveContext::track_dependency(&self.inner.notifier);
        let value = self.inner.accessor.get()?;
        self.announce_value(&value);
        Ok(value)
    }

    /// Read the value without recording a dependency.
    pub fn get_untracked(&self) -> Result<T> {
        super::context::untracked(|| self.inner.accessor.get())
    }

    /// Write through the accessor, then fire the notifier.
    pub fn set(&self, value: T) -> Result<()> {
        self.inner.accessor.set(value)?;
        trace!(property = self.name(), "property written");
        self.inner.notifier.notify();
        Ok(())
    }

    /// Delete through the accessor, then fire the notifier.
    pub fn delete(&self) -> Result<()> {
        self.inner.accessor.delete()?;
        trace!(property = self.name(), "property deleted");
        self.inner.notifier.notify();
        Ok(())
    }

    /// Fire the notifier without touching the value.
    pub fn touch(&self) {
        self.inner.notifier.notify();
    }

    pub(crate) fn announce_value(&self, value: &T) {
        if let Some(observe) = self.inner.observe {
            ReactiveContext::track_dependency(&observe(value));
        }
    }
}

impl<T, A> Reactive<T, A>
where
    T: ChangeNotifier,
    A: Accessor<T>,
{
    /// Make `accessor` reactive, also tracking in-place changes of the
    /// values it holds.
    pub fn observable(accessor: A) -> Self {
        Self::build(accessor, Some(observe_change::<T>))
    }
}

impl<T, A> Source<T> for Reactive<T, A>
where
    A: Accessor<T>,
{
    fn name(&self) -> &str {
        Reactive::name(self)
    }

    fn read(&self) -> Result<T> {
        self.get()
    }
}

impl<T, A> Clone for Reactive<T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T, A: fmt::Debug> fmt::Debug for Reactive<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("accessor", &self.inner.accessor)
            .field("notifier", &self.inner.notifier)
            .field("observable", &self.inner.observe.is_some())
            .finish()
    }
}

enum PropertyKind {
    Plain,
    Reactive {
        source: Box<dyn Any>,
        value_type: &'static str,
    },
}

/// A named property resolved at runtime.
pub struct PropertyRef {
    name: String,
    kind: PropertyKind,
}

impl PropertyRef {
    /// A reactive property, type-erased.
    pub fn reactive<T, S>(source: &S) -> Self
    where
        T: 'static,
        S: Source<T> + Clone + 'static,
    {
        let erased: Rc<dyn Source<T>> = Rc::new(source.clone());
        Self {
            name: source.name().to_owned(),
            kind: PropertyKind::Reactive {
                source: Box::new(erased),
                value_type: type_name::<T>(),
            },
        }
    }

    /// A property that exists but is not reactive.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Plain,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_reactive(&self) -> bool {
        matches!(self.kind, PropertyKind::Reactive { .. })
    }

    /// Recover the typed source.
    ///
    /// Fails with `NotReactive` for plain properties and with `TypeMismatch`
    /// if the property holds values of another type.
    pub fn source<T: 'static>(&self) -> Result<Rc<dyn Source<T>>> {
        match &self.kind {
            PropertyKind::Plain => Err(PropertyError::NotReactive {
                name: self.name.clone(),
            }),
            PropertyKind::Reactive { source, .. } => source
                .downcast_ref::<Rc<dyn Source<T>>>()
                .cloned()
                .ok_or_else(|| PropertyError::TypeMismatch {
                    name: self.name.clone(),
                    expected: type_name::<T>(),
                }),
        }
    }
}

impl fmt::Debug for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("PropertyRef");
        debug.field("name", &self.name);
        match &self.kind {
            PropertyKind::Plain => debug.field("reactive", &false),
            PropertyKind::Reactive { value_type, .. } => debug.field("value_type", value_type),
        };
        debug.finish()
    }
}

/// Runtime lookup of an instance's properties by name.
///
/// ```rust
/// use signet_core::reactive::{Properties, PropertyRef, Source, Value};
///
/// struct Counter {
///     count: Value<i32>,
///     label: String,
/// }
///
/// impl Properties for Counter {
///     fn property(&self, name: &str) -> Option<PropertyRef> {
///         match name {
///             "count" => Some(PropertyRef::reactive(&self.count)),
///             "label" => Some(PropertyRef::plain("label")),
///             _ => None,
///         }
///     }
/// }
///
/// let counter = Counter { count: Value::new("count", 3), label: "clicks".into() };
/// let count = counter.property("count").unwrap().source::<i32>().unwrap();
/// assert_eq!(count.read().unwrap(), 3);
/// assert!(counter.property("label").unwrap().source::<String>().is_err());
/// # let _ = counter.label;
/// ```
pub trait Properties {
    /// Resolve `name` to a property, or `None` if the type has no such property.
    fn property(&self, name: &str) -> Option<PropertyRef>;
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
