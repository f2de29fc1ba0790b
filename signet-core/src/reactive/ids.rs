//! Identity types for the reactive system.
//!
//! Notifiers and bindings are compared by identity, never by value. Each
//! gets a process-unique ID when created, which is what dependency sets and
//! binding tables are keyed by.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a notifier.
///
/// Two clones of the same notifier share an ID; two separately created
/// notifiers never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotifierId(u64);

impl NotifierId {
    /// Generate a new unique notifier ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NotifierId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Unique identifier for one handler binding on a notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl BindingId {
    /// Generate a new unique binding ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}
