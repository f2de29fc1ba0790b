//! Property Errors
//!
//! Every fallible operation in the crate reports a [`PropertyError`]. Errors
//! always propagate to the immediate caller; nothing in the reactive core
//! recovers silently.

use thiserror::Error;

/// A boxed error raised by user code inside a compute function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the crate.
pub type Result<T, E = PropertyError> = std::result::Result<T, E>;

/// Errors raised by reactive properties and watchers.
#[derive(Debug, Error)]
pub enum PropertyError {
    /// The property was read before any value or default existed.
    #[error("property '{property}' does not have a value")]
    NotSet { property: String },

    /// The property cannot be written (for example, a computed property).
    #[error("property '{property}' does not support setting a value")]
    NotSettable { property: String },

    /// The property cannot be deleted.
    #[error("property '{property}' does not support deleting a value")]
    NotDeletable { property: String },

    /// A watch was requested on a name that does not resolve to a reactive property.
    #[error("'{name}' is not a reactive property")]
    NotReactive { name: String },

    /// The named property is reactive but holds a different value type.
    #[error("reactive property '{name}' does not hold values of type {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// A user-supplied compute function failed.
    #[error("compute function failed: {0}")]
    ComputeFailure(#[source] BoxError),
}

impl PropertyError {
    /// Wrap an arbitrary error raised by a compute function.
    pub fn compute_failure<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::ComputeFailure(error.into())
    }

    pub(crate) fn not_set(property: &str) -> Self {
        Self::NotSet {
            property: property.to_owned(),
        }
    }

    pub(crate) fn not_settable(property: &str) -> Self {
        Self::NotSettable {
            property: property.to_owned(),
        }
    }

    pub(crate) fn not_deletable(property: &str) -> Self {
        Self::NotDeletable {
            property: property.to_owned(),
        }
    }

    /// Returns true if this error was raised by user compute code.
    pub fn is_compute_failure(&self) -> bool {
        matches!(self, Self::ComputeFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_property() {
        assert_eq!(
            PropertyError::not_set("a").to_string(),
            "property 'a' does not have a value"
        );
        assert_eq!(
            PropertyError::not_settable("b").to_string(),
            "property 'b' does not support setting a value"
        );
        assert_eq!(
            PropertyError::not_deletable("c").to_string(),
            "property 'c' does not support deleting a value"
        );
    }

    #[test]
    fn compute_failure_keeps_source() {
        use std::error::Error as _;

        let err = PropertyError::compute_failure("division by zero");
        assert!(err.is_compute_failure());
        assert_eq!(err.to_string(), "compute function failed: division by zero");
        assert!(err.source().is_some());
    }
}
