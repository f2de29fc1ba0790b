//! Value Implementation
//!
//! A [`Value`] is a reactive property backed by a stored field. It is the
//! usual source of truth that computed properties derive from.
//!
//! # Redundant Writes
//!
//! Writing a value equal to the current one is a no-op: nothing is stored and
//! the notifier does not fire. This keeps dependents from recomputing when
//! nothing actually changed. A write to a value that has never been set (and
//! has no default) always goes through.

use std::fmt;

use tracing::trace;

use super::accessor::Field;
use super::notifier::{ChangeNotifier, Notifier};
use super::property::{Reactive, Source};
use crate::error::Result;

/// A reactive property holding a value of type `T`.
///
/// # Example
///
/// ```rust
/// use signet_core::reactive::Value;
///
/// let count = Value::new("count", 0);
/// assert_eq!(count.get().unwrap(), 0);
///
/// count.set(5).unwrap();
/// assert_eq!(count.get().unwrap(), 5);
/// ```
pub struct Value<T: 'static> {
    reactive: Reactive<T, Field<T>>,
}

impl<T> Value<T>
where
    T: Clone + 'static,
{
    /// A value holding `initial`.
    pub fn new(name: impl Into<String>, initial: T) -> Self {
        Self {
            reactive: Reactive::new(Field::new(name, initial)),
        }
    }

    /// A value whose default is produced by `default` on first read.
    pub fn lazy<F>(name: impl Into<String>, default: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            reactive: Reactive::new(Field::with_default(name, default)),
        }
    }

    /// A value with no default. Reads fail with `NotSet` until it is written.
    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            reactive: Reactive::new(Field::empty(name)),
        }
    }

    /// Name of the property.
    pub fn name(&self) -> &str {
        self.reactive.name()
    }

    /// The notifier fired whenever the value changes.
    pub fn notifier(&self) -> &Notifier {
        self.reactive.notifier()
    }

    /// Get the current value.
    ///
    /// Inside a tracked computation this records a dependency on the value.
    pub fn get(&self) -> Result<T> {
        self.reactive.get()
    }

    /// Get the current value without recording a dependency.
    pub fn get_untracked(&self) -> Result<T> {
        self.reactive.get_untracked()
    }

    /// Apply `f` to the current value, recording a dependency like
    /// [`get`](Self::get).
    ///
    /// `f` sees a snapshot, so it may write this value (directly or through
    /// handlers it triggers).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let value = self.reactive.get()?;
        Ok(f(&value))
    }

    /// Remove the stored value and notify. A lazy value re-applies its
    /// default on the next read.
    pub fn delete(&self) -> Result<()> {
        self.reactive.delete()
    }

    /// Returns true if the value currently holds something.
    pub fn is_set(&self) -> bool {
        self.reactive.accessor().is_stored()
    }
}

impl<T> Value<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Set a new value and notify dependents, unless it equals the current one.
    pub fn set(&self, value: T) -> Result<()> {
        let unchanged = super::context::untracked(|| {
            self.reactive
                .accessor()
                .with(|current| *current == value)
                .unwrap_or(false)
        });
        if unchanged {
            trace!(property = self.name(), "skipping redundant write");
            return Ok(());
        }
        self.reactive.set(value)
    }

    /// Set the value to `f(current)`.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.reactive.get_untracked()?;
        self.set(f(&current))
    }
}

impl<T> Value<T>
where
    T: Clone + ChangeNotifier + 'static,
{
    /// A value holding an observable container.
    ///
    /// Reads also depend on the container's own change notifier, so in-place
    /// mutations count as changes.
    pub fn observable(name: impl Into<String>, initial: T) -> Self {
        Self {
            reactive: Reactive::observable(Field::new(name, initial)),
        }
    }
}

impl<T: Clone + 'static> Source<T> for Value<T> {
    fn name(&self) -> &str {
        Value::name(self)
    }

    fn read(&self) -> Result<T> {
        self.get()
    }
}

impl<T: 'static> Clone for Value<T> {
    fn clone(&self) -> Self {
        Self {
            reactive: self.reactive.clone(),
        }
    }
}

impl<T> fmt::Debug for Value<T>
where
    T: Clone + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("field", self.reactive.accessor())
            .field("handler_count", &self.reactive.notifier().handler_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
