//! Signet Core
//!
//! This crate provides a reactive dependency-tracking and notification
//! engine. It implements:
//!
//! - Notifiers with lifetime-scoped bindings
//! - Automatic dependency tracking for reactive reads
//! - Computed properties with lazy, dirty-flag invalidation
//! - Async change streams that coalesce bursts of changes
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: Reactive primitives and dependency tracking
//! - `error`: The error type shared by every fallible operation
//!
//! The crate logs through `tracing` and installs no subscriber of its own.
//!
//! # Example
//!
//! ```rust
//! use signet_core::reactive::{Computed, Value};
//!
//! // Create a value
//! let count = Value::new("count", 0);
//!
//! // Create a derived value
//! let doubled = Computed::try_new("doubled", {
//!     let count = count.clone();
//!     move || Ok(count.get()? * 2)
//! });
//! assert_eq!(doubled.get().unwrap(), 0);
//!
//! // Update the value; the computed recomputes on its next read
//! count.set(5).unwrap();
//! assert_eq!(doubled.get().unwrap(), 10);
//! ```

pub mod error;
pub mod reactive;

pub use error::{PropertyError, Result};
