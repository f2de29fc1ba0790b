//! Reactive Primitives
//!
//! This module implements dependency tracking and change notification:
//! notifiers, reactive properties, computed properties and watches.
//!
//! # Concepts
//!
//! ## Notifiers
//!
//! A [`Notifier`] is a fan-out event source. Binding a handler returns a
//! [`Lifetime`]; the handler stays bound for as long as the lifetime lives.
//! Notifiers never keep their handlers alive on their own.
//!
//! ## Reactive Properties
//!
//! A reactive property ([`Reactive`], or the field-backed [`Value`]) owns a
//! notifier. Reading the property inside a tracked computation makes that
//! computation depend on it; writing the property fires the notifier.
//!
//! ## Computed Properties
//!
//! A [`Computed`] caches the result of a function and tracks everything the
//! function read. When any of those values changes, the cache is marked
//! dirty and the computed fires its own notifier. The next read recomputes.
//!
//! ## Watches
//!
//! A [`Watch`] is an async stream that yields the current value of a tracked
//! read and yields again after each change, coalescing changes that happen
//! while the consumer is busy.
//!
//! # Implementation Notes
//!
//! Dependencies are detected automatically with a thread-local stack of
//! tracking frames (see [`ReactiveContext`]). Every read announces its
//! notifier to the innermost frame; a [`DependencyCollection`] turns the
//! announcements of one computation into subscriptions.
//!
//! Everything here is single-threaded. Values are shared with `Rc` and
//! mutated through `RefCell`/`Cell`, and all types are `!Send`.

mod accessor;
mod computed;
mod context;
mod dependency;
mod ids;
mod lifetime;
mod list;
mod notifier;
mod property;
mod value;
mod watch;

pub use accessor::{Accessor, DefaultFn, Field, FnAccessor};
pub use computed::{Computed, ComputedState};
pub use context::{is_tracking, track, untracked, ReactiveContext, Reads};
pub use dependency::DependencyCollection;
pub use ids::{BindingId, NotifierId};
pub use lifetime::{Lifetime, Lifetimes};
pub use list::ReactiveList;
pub use notifier::{ChangeNotifier, ChangeNotifierBase, Handler, Notifier};
pub use property::{Properties, PropertyRef, Reactive, Source};
pub use value::Value;
pub use watch::{watch, watch_fn, watch_named, Watch};
