//! Reactive Context
//!
//! The reactive context records which notifiers are read while a tracked
//! computation runs. When a reactive property is read, it announces its
//! notifier to the innermost active frame; with no frame active the
//! announcement is dropped and the read is an ordinary, untracked read.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Entering a tracked computation
//! pushes a frame; finishing it pops the frame and hands back everything it
//! collected. The frame guard also pops on drop, so a computation that
//! returns early or panics never leaves a stale frame behind.
//!
//! This design supports nested tracked computations (e.g., a computed
//! property that reads another computed property while recomputing). The
//! inner read announces only to the inner frame.
//!
//! Frames are strictly scoped to synchronous calls. Nothing holds a frame
//! across an `.await`, so tasks interleaving on the same thread never see
//! each other's frames.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::trace;

use super::ids::NotifierId;
use super::notifier::Notifier;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameId(u64);

impl FrameId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// An entry in the reactive context stack.
#[derive(Debug)]
struct ContextEntry {
    frame: FrameId,
    reads: Reads,
    /// Set for the frames pushed by [`untracked`]; reads there are dropped.
    suppressed: bool,
}

/// The set of notifiers read during one tracked computation.
///
/// A set, not a count: reading the same property twice records it once.
/// Iteration follows first-read order.
#[derive(Debug, Default, Clone)]
pub struct Reads {
    notifiers: IndexMap<NotifierId, Notifier>,
}

impl Reads {
    /// Create an empty read set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read of `notifier`. Returns false if it was already recorded.
    pub fn insert(&mut self, notifier: &Notifier) -> bool {
        if self.notifiers.contains_key(&notifier.id()) {
            return false;
        }
        self.notifiers.insert(notifier.id(), notifier.clone());
        true
    }

    pub fn contains(&self, id: NotifierId) -> bool {
        self.notifiers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Iterate over the recorded notifiers.
    pub fn iter(&self) -> impl Iterator<Item = &Notifier> {
        self.notifiers.values()
    }
}

impl<'a> FromIterator<&'a Notifier> for Reads {
    fn from_iter<I: IntoIterator<Item = &'a Notifier>>(iter: I) -> Self {
        let mut reads = Reads::new();
        for notifier in iter {
            reads.insert(notifier);
        }
        reads
    }
}

/// Guard for one frame on the reactive context stack.
///
/// The frame is popped either by [`ReactiveContext::finish`], which returns
/// the collected reads, or when the guard is dropped.
#[must_use = "the frame is popped as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ReactiveContext {
    frame: FrameId,
    finished: bool,
}

impl ReactiveContext {
    /// Enter a new tracking frame.
    ///
    /// While this frame is the innermost one, every reactive read announces
    /// its notifier here.
    pub fn enter() -> Self {
        Self::push(false)
    }

    fn enter_suppressed() -> Self {
        Self::push(true)
    }

    fn push(suppressed: bool) -> Self {
        let frame = FrameId::new();
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                frame,
                reads: Reads::new(),
                suppressed,
            });
        });

        Self {
            frame,
            finished: false,
        }
    }

    /// Leave the frame, returning the notifiers that were read inside it.
    pub fn finish(mut self) -> Reads {
        self.finished = true;
        self.pop().map(|entry| entry.reads).unwrap_or_default()
    }

    /// Check if there is any frame on the stack, including the ones pushed
    /// by [`untracked`].
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Number of frames currently on the stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Announce a read of `notifier` to the innermost frame, if any.
    pub fn track_dependency(notifier: &Notifier) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if entry.suppressed {
                    return;
                }
                if entry.reads.insert(notifier) {
                    trace!(notifier = %notifier.id(), "dependency announced");
                }
            }
        });
    }

    fn pop(&self) -> Option<ContextEntry> {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Verify we're popping the right frame.
            // This helps catch bugs where frames are mismatched.
            if let Some(entry) = &popped {
                debug_assert_eq!(
                    entry.frame, self.frame,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.frame, entry.frame
                );
            }
            popped
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        if !self.finished {
            self.pop();
        }
    }
}

/// Run `f` inside a fresh tracking frame and return its result together with
/// the notifiers it read.
pub fn track<R>(f: impl FnOnce() -> R) -> (R, Reads) {
    let ctx = ReactiveContext::enter();
    let result = f();
    (result, ctx.finish())
}

/// Run `f` with dependency announcements suppressed.
///
/// Reads inside `f` do not become dependencies of any enclosing computation.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_suppressed();
    f()
}

/// Check whether reads right now would be recorded, i.e. the innermost frame
/// belongs to a tracked computation and not to [`untracked`].
pub fn is_tracking() -> bool {
    CONTEXT_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .is_some_and(|entry| !entry.suppressed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_frames() {
        assert!(!ReactiveContext::is_active());

        {
            let _ctx = ReactiveContext::enter();
            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::depth(), 1);
        }

        // Frame should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert_eq!(ReactiveContext::depth(), 0);
    }

    #[test]
    fn context_collects_dependencies_once() {
        let a: Notifier = Notifier::new();
        let b: Notifier = Notifier::new();

        let ((), reads) = track(|| {
            ReactiveContext::track_dependency(&a);
            ReactiveContext::track_dependency(&b);
            ReactiveContext::track_dependency(&a);
        });

        assert_eq!(reads.len(), 2);
        let ids: Vec<_> = reads.iter().map(Notifier::id).collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
    }

    #[test]
    fn announcements_without_frame_are_dropped() {
        let a: Notifier = Notifier::new();
        ReactiveContext::track_dependency(&a);

        let ((), reads) = track(|| {});
        assert!(reads.is_empty());
    }

    #[test]
    fn nested_frames_only_see_their_own_reads() {
        let outer: Notifier = Notifier::new();
        let inner: Notifier = Notifier::new();

        let (inner_reads, outer_reads) = track(|| {
            ReactiveContext::track_dependency(&outer);
            let ((), inner_reads) = track(|| {
                ReactiveContext::track_dependency(&inner);
            });
            inner_reads
        });

        assert!(inner_reads.contains(inner.id()));
        assert!(!inner_reads.contains(outer.id()));
        assert!(outer_reads.contains(outer.id()));
        assert!(!outer_reads.contains(inner.id()));
    }

    #[test]
    fn untracked_hides_reads_from_enclosing_frame() {
        let a: Notifier = Notifier::new();

        let ((), reads) = track(|| {
            untracked(|| ReactiveContext::track_dependency(&a));
        });

        assert!(reads.is_empty());
    }

    #[test]
    fn is_tracking_ignores_untracked_frames() {
        assert!(!is_tracking());

        track(|| {
            assert!(is_tracking());
            untracked(|| {
                assert!(!is_tracking());
                assert!(ReactiveContext::is_active());
                track(|| assert!(is_tracking()));
            });
            assert!(is_tracking());
        });

        untracked(|| assert!(!is_tracking()));
    }

    #[test]
    fn frame_is_popped_on_panic() {
        let result = std::panic::catch_unwind(|| {
            track(|| panic!("boom"));
        });

        assert!(result.is_err());
        assert_eq!(ReactiveContext::depth(), 0);
    }
}
