//! Reactive List
//!
//! [`ReactiveList`] is a `Vec` that fires its change notifier on every
//! mutation. Held in a property built with [`Value::observable`], in-place
//! edits of the list invalidate whatever read the property.
//!
//! Reads do not announce anything on their own; the dependency comes from
//! reading the property that holds the list.
//!
//! [`Value::observable`]: super::Value::observable

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::notifier::{ChangeNotifier, ChangeNotifierBase, Notifier};

struct ListInner<T> {
    items: RefCell<Vec<T>>,
    changes: ChangeNotifierBase,
}

/// A shared, observable list.
///
/// Cloning the list yields another handle to the same items. Two handles are
/// equal when they refer to the same list.
pub struct ReactiveList<T> {
    inner: Rc<ListInner<T>>,
}

impl<T> ReactiveList<T> {
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Borrow the items as a slice.
    ///
    /// `f` must not mutate this list.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.items.borrow())
    }

    pub fn push(&self, item: T) {
        self.inner.items.borrow_mut().push(item);
        self.changed();
    }

    /// Insert `item` at `index`. An index past the end leaves the list
    /// untouched and hands the item back.
    pub fn insert(&self, index: usize, item: T) -> Result<(), T> {
        {
            let mut items = self.inner.items.borrow_mut();
            if index > items.len() {
                return Err(item);
            }
            items.insert(index, item);
        }
        self.changed();
        Ok(())
    }

    /// Replace the item at `index`, returning the old one. Out-of-range
    /// indices leave the list untouched and return `None`.
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        let previous = {
            let mut items = self.inner.items.borrow_mut();
            let slot = items.get_mut(index)?;
            std::mem::replace(slot, item)
        };
        self.changed();
        Some(previous)
    }

    /// Remove the item at `index`. Out-of-range indices return `None`.
    pub fn remove(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.changed();
        Some(removed)
    }

    pub fn pop(&self) -> Option<T> {
        let popped = self.inner.items.borrow_mut().pop()?;
        self.changed();
        Some(popped)
    }

    pub fn clear(&self) {
        let items = std::mem::take(&mut *self.inner.items.borrow_mut());
        drop(items);
        self.changed();
    }

    pub fn extend<I: IntoIterator<Item = T>>(&self, items: I) {
        self.inner.items.borrow_mut().extend(items);
        self.changed();
    }

    pub fn reverse(&self) {
        self.inner.items.borrow_mut().reverse();
        self.changed();
    }

    /// Keep only the items for which `keep` returns true.
    ///
    /// `keep` may read the list but must not mutate it.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) {
        let mask: Vec<bool> = self.inner.items.borrow().iter().map(&mut keep).collect();
        let mut mask = mask.into_iter();
        self.inner
            .items
            .borrow_mut()
            .retain(|_| mask.next().unwrap_or(true));
        self.changed();
    }

    // Fire after the borrow is released; handlers may read the list.
    fn changed(&self) {
        self.inner.changes.notify_changed();
    }
}

impl<T: Clone> ReactiveList<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// Copy of the current items.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    /// Iterate over a snapshot of the current items.
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }
}

impl<T: PartialEq> ReactiveList<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.inner.items.borrow().contains(item)
    }
}

impl<T> ChangeNotifier for ReactiveList<T> {
    fn on_change(&self) -> &Notifier {
        self.inner.changes.on_change()
    }
}

impl<T> Clone for ReactiveList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for ReactiveList<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for ReactiveList<T> {}

impl<T> Default for ReactiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for ReactiveList<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(items),
                changes: ChangeNotifierBase::new(),
            }),
        }
    }
}

impl<T> FromIterator<T> for ReactiveList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.items.borrow().iter()).finish()
    }
}
