//! Accessors
//!
//! An [`Accessor`] is the plain, non-reactive storage behind a property: it
//! knows how to get, set and delete one value. Each capability is optional;
//! an accessor that lacks one reports `NotSet`, `NotSettable` or
//! `NotDeletable`.
//!
//! The reactive layer never stores values itself. It wraps an accessor and
//! adds dependency announcement and change notification on top, so any
//! accessor (field-backed, function-backed, ...) can be made reactive.

use std::cell::RefCell;
use std::fmt;

use crate::error::{PropertyError, Result};

/// Get/set/delete capabilities for one property slot.
pub trait Accessor<T> {
    /// Name of the property, used in error messages.
    fn name(&self) -> &str;

    /// Read the current value.
    fn get(&self) -> Result<T> {
        Err(PropertyError::not_set(self.name()))
    }

    /// Replace the current value.
    fn set(&self, value: T) -> Result<()> {
        drop(value);
        Err(PropertyError::not_settable(self.name()))
    }

    /// Remove the current value.
    fn delete(&self) -> Result<()> {
        Err(PropertyError::not_deletable(self.name()))
    }
}

/// A lazily computed default value.
pub type DefaultFn<T> = Box<dyn Fn() -> T>;

/// An accessor backed by a stored value.
///
/// With a default factory, the first read of an empty field stores and
/// returns the default. Deleting empties the field again.
pub struct Field<T> {
    name: String,
    value: RefCell<Option<T>>,
    default: Option<DefaultFn<T>>,
}

impl<T> Field<T> {
    /// A field holding `value`.
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value: RefCell::new(Some(value)),
            default: None,
        }
    }

    /// An empty field that produces its default on first read.
    pub fn with_default<F>(name: impl Into<String>, default: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            name: name.into(),
            value: RefCell::new(None),
            default: Some(Box::new(default)),
        }
    }

    /// An empty field with no default. Reads fail until it is written.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: RefCell::new(None),
            default: None,
        }
    }

    /// Returns true if a value is stored (the default has not been applied
    /// yet counts as not stored).
    pub fn is_stored(&self) -> bool {
        self.value.borrow().is_some()
    }

    /// Apply `f` to the stored value, materializing the default if needed.
    ///
    /// The field stays borrowed while `f` runs; `f` must not write it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.materialize()?;
        match self.value.borrow().as_ref() {
            Some(value) => Ok(f(value)),
            None => Err(PropertyError::not_set(&self.name)),
        }
    }

    fn materialize(&self) -> Result<()> {
        if self.value.borrow().is_some() {
            return Ok(());
        }
        let Some(default) = &self.default else {
            return Err(PropertyError::not_set(&self.name));
        };
        // Run the factory without holding a borrow; it may read other fields.
        let value = default();
        let mut slot = self.value.borrow_mut();
        if slot.is_none() {
            *slot = Some(value);
        }
        Ok(())
    }
}

impl<T: Clone> Accessor<T> for Field<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self) -> Result<T> {
        self.with(T::clone)
    }

    fn set(&self, value: T) -> Result<()> {
        let previous = self.value.borrow_mut().replace(value);
        drop(previous);
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        let previous = self.value.borrow_mut().take();
        drop(previous);
        Ok(())
    }
}

impl<T: fmt::Debug> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("value", &self.value.borrow())
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

type Getter<T> = Box<dyn Fn() -> Result<T>>;
type Setter<T> = Box<dyn Fn(T) -> Result<()>>;
type Deleter = Box<dyn Fn() -> Result<()>>;

/// An accessor backed by user functions.
///
/// ```rust
/// use signet_core::reactive::{Accessor, FnAccessor};
///
/// let celsius = std::rc::Rc::new(std::cell::Cell::new(20.0_f64));
/// let fahrenheit = FnAccessor::new("fahrenheit")
///     .getter({
///         let celsius = celsius.clone();
///         move || Ok(celsius.get() * 9.0 / 5.0 + 32.0)
///     })
///     .setter({
///         let celsius = celsius.clone();
///         move |f| {
///             celsius.set((f - 32.0) * 5.0 / 9.0);
///             Ok(())
///         }
///     });
///
/// fahrenheit.set(212.0).unwrap();
/// assert_eq!(celsius.get(), 100.0);
/// assert!(fahrenheit.delete().is_err());
/// ```
pub struct FnAccessor<T> {
    name: String,
    getter: Option<Getter<T>>,
    setter: Option<Setter<T>>,
    deleter: Option<Deleter>,
}

impl<T> FnAccessor<T> {
    /// An accessor with no capabilities yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            getter: None,
            setter: None,
            deleter: None,
        }
    }

    /// Set the getter function.
    pub fn getter<F>(mut self, getter: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        self.getter = Some(Box::new(getter));
        self
    }

    /// Set the setter function.
    pub fn setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(T) -> Result<()> + 'static,
    {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Set the deleter function.
    pub fn deleter<F>(mut self, deleter: F) -> Self
    where
        F: Fn() -> Result<()> + 'static,
    {
        self.deleter = Some(Box::new(deleter));
        self
    }
}

impl<T> Accessor<T> for FnAccessor<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self) -> Result<T> {
        match &self.getter {
            Some(getter) => getter(),
            None => Err(PropertyError::not_set(&self.name)),
        }
    }

    fn set(&self, value: T) -> Result<()> {
        match &self.setter {
            Some(setter) => setter(value),
            None => Err(PropertyError::not_settable(&self.name)),
        }
    }

    fn delete(&self) -> Result<()> {
        match &self.deleter {
            Some(deleter) => deleter(),
            None => Err(PropertyError::not_deletable(&self.name)),
        }
    }
}

impl<T> fmt::Debug for FnAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAccessor")
            .field("name", &self.name)
            .field("get", &self.getter.is_some())
            .field("set", &self.setter.is_some())
            .field("delete", &self.deleter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Bare;

    impl Accessor<i32> for Bare {
        fn name(&self) -> &str {
            "bare"
        }
    }

    #[test]
    fn default_capabilities_fail() {
        assert!(matches!(Bare.get(), Err(PropertyError::NotSet { .. })));
        assert!(matches!(Bare.set(1), Err(PropertyError::NotSettable { .. })));
        assert!(matches!(Bare.delete(), Err(PropertyError::NotDeletable { .. })));
    }

    #[test]
    fn field_get_set_delete() {
        let field = Field::new("x", 1);
        assert_eq!(field.get().unwrap(), 1);

        field.set(2).unwrap();
        assert_eq!(field.get().unwrap(), 2);

        field.delete().unwrap();
        assert!(!field.is_stored());
        assert!(matches!(field.get(), Err(PropertyError::NotSet { property }) if property == "x"));
    }

    #[test]
    fn field_default_is_lazy_and_stored() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let field = Field::with_default("x", move || {
            calls_clone.set(calls_clone.get() + 1);
            10
        });

        assert_eq!(calls.get(), 0);
        assert!(!field.is_stored());

        assert_eq!(field.get().unwrap(), 10);
        assert_eq!(field.get().unwrap(), 10);
        assert_eq!(calls.get(), 1);

        // Deleting re-arms the default.
        field.delete().unwrap();
        assert_eq!(field.get().unwrap(), 10);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn empty_field_fails_until_written() {
        let field = Field::<String>::empty("name");
        assert!(field.get().is_err());

        field.set("set".to_owned()).unwrap();
        assert_eq!(field.get().unwrap(), "set");
    }

    #[test]
    fn fn_accessor_uses_supplied_functions() {
        let store = Rc::new(Cell::new(0));
        let accessor = FnAccessor::new("store")
            .getter({
                let store = store.clone();
                move || Ok(store.get())
            })
            .setter({
                let store = store.clone();
                move |value| {
                    store.set(value);
                    Ok(())
                }
            })
            .deleter({
                let store = store.clone();
                move || {
                    store.set(-1);
                    Ok(())
                }
            });

        accessor.set(5).unwrap();
        assert_eq!(accessor.get().unwrap(), 5);
        accessor.delete().unwrap();
        assert_eq!(store.get(), -1);
    }

    #[test]
    fn fn_accessor_without_functions_fails() {
        let accessor = FnAccessor::<i32>::new("nothing");
        assert!(matches!(accessor.get(), Err(PropertyError::NotSet { .. })));
        assert!(matches!(accessor.set(1), Err(PropertyError::NotSettable { .. })));
        assert!(matches!(accessor.delete(), Err(PropertyError::NotDeletable { .. })));
    }
}
