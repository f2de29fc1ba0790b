//! Watch Implementation
//!
//! A [`Watch`] turns a tracked read into an asynchronous stream of values.
//!
//! # How Watches Work
//!
//! 1. The first poll runs the read inside a fresh dependency collection and
//!    yields the result.
//!
//! 2. Every dependency the read touched is bound to a trigger that raises a
//!    single "changed" signal.
//!
//! 3. The next poll waits for that signal, then reads again (re-tracking the
//!    dependencies) and yields the new result.
//!
//! The signal is a boolean flag paired with a [`tokio::sync::Notify`] that
//! wakes the consumer. The flag is cleared right before each read, so any
//! number of changes that happen before the consumer runs again collapse into
//! a single re-read reflecting the latest state. A leftover wakeup permit with
//! the flag clear just puts the consumer back to sleep. Intermediate values
//! are not guaranteed to be observed; the last one always is.
//!
//! # Cancellation
//!
//! Dropping the stream drops its dependency collection, which unbinds every
//! subscription. A read that fails yields the error once and then ends the
//! stream, releasing its subscriptions the same way.
//!
//! Watch streams are `!Send`. Poll them on the thread that owns the reactive
//! values, e.g. inside a [`tokio::task::LocalSet`].

use std::cell::Cell;
use std::fmt;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures_util::stream::{self, LocalBoxStream, Stream, StreamExt};
use tokio::sync::Notify;
use tracing::debug;

use super::dependency::DependencyCollection;
use super::property::{Properties, Source};
use crate::error::{PropertyError, Result};

/// An asynchronous stream of a tracked read's successive values.
#[must_use = "streams do nothing unless polled"]
pub struct Watch<T> {
    stream: LocalBoxStream<'static, Result<T>>,
}

impl<T> Stream for Watch<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }
}

impl<T> fmt::Debug for Watch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch").finish_non_exhaustive()
    }
}

struct WatchState<F> {
    read: F,
    dependencies: DependencyCollection,
    changed: Rc<Cell<bool>>,
    wake: Rc<Notify>,
    started: bool,
}

impl<F> Drop for WatchState<F> {
    fn drop(&mut self) {
        debug!(
            dependencies = self.dependencies.len(),
            "watch released"
        );
    }
}

/// Watch the result of an arbitrary tracked read.
///
/// # Example
///
/// ```rust
/// use futures_util::StreamExt;
/// use signet_core::reactive::{watch_fn, Value};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let a = Value::new("a", 1);
/// let mut doubled = watch_fn({
///     let a = a.clone();
///     move || Ok(a.get()? * 2)
/// });
///
/// assert_eq!(doubled.next().await.unwrap().unwrap(), 2);
/// a.set(5).unwrap();
/// assert_eq!(doubled.next().await.unwrap().unwrap(), 10);
/// # });
/// ```
pub fn watch_fn<T, F>(read: F) -> Watch<T>
where
    T: 'static,
    F: FnMut() -> Result<T> + 'static,
{
    let changed = Rc::new(Cell::new(false));
    let wake = Rc::new(Notify::new());
    let state = WatchState {
        read,
        dependencies: DependencyCollection::new({
            let changed = Rc::clone(&changed);
            let wake = Rc::clone(&wake);
            move |_| {
                changed.set(true);
                wake.notify_one();
            }
        }),
        changed,
        wake,
        started: false,
    };

    let stream = stream::unfold(Some(state), |state| async move {
        let Some(mut state) = state else {
            return None;
        };

        if state.started {
            while !state.changed.get() {
                state.wake.notified().await;
            }
        } else {
            debug!("watch started");
            state.started = true;
        }
        state.changed.set(false);

        let result = state.dependencies.track(|| (state.read)());
        match result {
            Ok(value) => {
                debug!(dependencies = state.dependencies.len(), "watch yielding");
                Some((Ok(value), Some(state)))
            }
            Err(err) => {
                debug!(error = %err, "watch terminated by error");
                drop(state);
                Some((Err(err), None))
            }
        }
    });

    Watch {
        stream: stream.boxed_local(),
    }
}

/// Watch a reactive property.
pub fn watch<T, S>(source: &S) -> Watch<T>
where
    T: 'static,
    S: Source<T> + Clone + 'static,
{
    let source = source.clone();
    watch_fn(move || source.read())
}

/// Watch a property of `instance` looked up by name.
///
/// Fails with `NotReactive` before anything is yielded if `name` is unknown
/// or names a property that is not reactive, and with `TypeMismatch` if the
/// property does not hold values of type `T`.
pub fn watch_named<T, P>(instance: &P, name: &str) -> Result<Watch<T>>
where
    T: 'static,
    P: Properties + ?Sized,
{
    let property = instance
        .property(name)
        .ok_or_else(|| PropertyError::NotReactive {
            name: name.to_owned(),
        })?;
    let source = property.source::<T>()?;
    Ok(watch_fn(move || source.read()))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
