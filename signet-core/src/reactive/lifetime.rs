//! Lifetimes
//!
//! A [`Lifetime`] represents "this registration is active until disposed".
//! It is disposed explicitly with [`Lifetime::dispose`], or implicitly when it
//! goes out of scope. Disposal is idempotent: only the first call runs the
//! disposal action.
//!
//! Scoped disposal replaces any kind of finalizer: when the owner of a
//! lifetime drops it, the registration it represents is gone.

use std::fmt;

/// A disposable handle for one active registration.
#[must_use = "dropping a Lifetime immediately disposes the registration"]
pub struct Lifetime {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Lifetime {
    /// Create a lifetime that runs `dispose` exactly once when disposed.
    pub fn new<F>(dispose: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Create a lifetime that is already disposed.
    pub fn empty() -> Self {
        Self { dispose: None }
    }

    /// Dispose of this lifetime. Calling this more than once is a no-op.
    pub fn dispose(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    /// Returns true if this lifetime has not been disposed yet.
    pub fn is_alive(&self) -> bool {
        self.dispose.is_some()
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifetime")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// A bag of lifetimes that are disposed together.
#[derive(Debug, Default)]
pub struct Lifetimes {
    items: Vec<Lifetime>,
}

impl Lifetimes {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a lifetime.
    pub fn push(&mut self, lifetime: Lifetime) {
        self.items.push(lifetime);
    }

    /// Number of lifetimes held, disposed or not.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dispose every lifetime in the bag and empty it.
    pub fn dispose_all(&mut self) {
        for mut lifetime in self.items.drain(..) {
            lifetime.dispose();
        }
    }
}

impl Extend<Lifetime> for Lifetimes {
    fn extend<I: IntoIterator<Item = Lifetime>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl Drop for Lifetimes {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
