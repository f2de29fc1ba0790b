//! Integration Tests for Reactive System
//!
//! These tests verify that values, computed properties, and watches work
//! together correctly through the public API.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::LocalSet;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

use signet_core::reactive::{
    track, watch, watch_named, ChangeNotifier, Computed, ComputedState, Lifetimes, Notifier,
    Properties, PropertyRef, ReactiveList, Value,
};
use signet_core::PropertyError;

/// Install a log subscriber honoring `RUST_LOG`. Safe to call from every test.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn call_counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

/// An instance with value-backed and computed properties.
struct Order {
    quantity: Value<u32>,
    price: Value<u32>,
    note: String,
    total: Computed<u32>,
}

impl Order {
    fn new(quantity: u32, price: u32) -> Rc<Self> {
        Rc::new_cyclic(|order: &Weak<Order>| Order {
            quantity: Value::new("quantity", quantity),
            price: Value::new("price", price),
            note: String::new(),
            total: Computed::bound_weak("total", order.clone(), |order: &Order| {
                Ok(order.quantity.get()? * order.price.get()?)
            }),
        })
    }
}

impl Properties for Order {
    fn property(&self, name: &str) -> Option<PropertyRef> {
        match name {
            "quantity" => Some(PropertyRef::reactive(&self.quantity)),
            "price" => Some(PropertyRef::reactive(&self.price)),
            "total" => Some(PropertyRef::reactive(&self.total)),
            "note" => Some(PropertyRef::plain("note")),
            _ => None,
        }
    }
}

/// Test the basic derived value scenario: `b = a * 10`.
#[tokio::test]
async fn computed_recomputes_once_per_change() {
    init_tracing();

    let a = Value::lazy("a", || 1);
    let calls = call_counter();
    let b = Computed::try_new("b", {
        let a = a.clone();
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            Ok(a.get()? * 10)
        }
    });

    assert_eq!(b.get().unwrap(), 10);

    let mut stream = watch(&b);
    assert_eq!(stream.next().await.unwrap().unwrap(), 10);

    a.set(2).unwrap();
    assert_eq!(b.get().unwrap(), 20);
    assert_eq!(b.get().unwrap(), 20);
    assert_eq!(calls.get(), 2);

    assert_eq!(stream.next().await.unwrap().unwrap(), 20);
}

/// Test that only the branch taken last time is subscribed.
#[test]
fn dynamic_dependencies_follow_the_branch_taken() {
    init_tracing();

    let use_a = Value::new("use_a", true);
    let a = Value::new("a", "a".to_owned());
    let b = Value::new("b", "b".to_owned());
    let calls = call_counter();

    let label = Computed::try_new("label", {
        let (use_a, a, b) = (use_a.clone(), a.clone(), b.clone());
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            if use_a.get()? {
                a.get()
            } else {
                b.get()
            }
        }
    });

    assert_eq!(label.get().unwrap(), "a");
    use_a.set(false).unwrap();
    assert_eq!(label.get().unwrap(), "b");

    a.set("changed".to_owned()).unwrap();
    assert_eq!(label.state(), ComputedState::Clean);

    b.set("B".to_owned()).unwrap();
    assert_eq!(label.get().unwrap(), "B");
    assert_eq!(calls.get(), 3);
}

/// Test that computed chains invalidate eagerly and recompute lazily.
#[test]
fn computed_chain_invalidates_upward() {
    let base = Value::new("base", 2);
    let squared = Computed::try_new("squared", {
        let base = base.clone();
        move || Ok(base.get()? * base.get()?)
    });
    let label_calls = call_counter();
    let label = Computed::try_new("label", {
        let squared = squared.clone();
        let label_calls = label_calls.clone();
        move || {
            label_calls.set(label_calls.get() + 1);
            Ok(format!("{} squared", squared.get()?))
        }
    });

    assert_eq!(label.get().unwrap(), "4 squared");

    base.set(3).unwrap();
    assert_eq!(squared.state(), ComputedState::Dirty);
    assert_eq!(label.state(), ComputedState::Dirty);
    assert_eq!(label_calls.get(), 1);

    assert_eq!(label.get().unwrap(), "9 squared");
    assert_eq!(label_calls.get(), 2);
}

/// Test that an instance's computed properties do not keep it or their
/// dependencies alive.
#[test]
fn dropped_instance_releases_subscriptions() {
    let order = Order::new(2, 5);
    assert_eq!(order.total.get().unwrap(), 10);

    let quantity = order.quantity.clone();
    assert_eq!(quantity.notifier().handler_count(), 1);

    drop(order);
    assert_eq!(quantity.notifier().handler_count(), 0);
    quantity.set(3).unwrap();
}

/// Test that a computed bound to an instance follows its values.
#[test]
fn bound_computed_follows_instance() {
    let order = Order::new(1, 4);
    assert_eq!(order.total.get().unwrap(), 4);

    order.quantity.set(3).unwrap();
    order.price.set(5).unwrap();
    assert_eq!(order.total.get().unwrap(), 15);
    assert_eq!(order.total.dependency_count(), 2);
    assert!(order.note.is_empty());
}

/// Test watching properties by name.
#[tokio::test]
async fn watch_by_name() {
    init_tracing();

    let order = Order::new(2, 3);
    let mut totals = watch_named::<u32, _>(&*order, "total").unwrap();
    assert_eq!(totals.next().await.unwrap().unwrap(), 6);

    order.price.set(4).unwrap();
    assert_eq!(totals.next().await.unwrap().unwrap(), 8);

    assert!(matches!(
        watch_named::<String, _>(&*order, "note"),
        Err(PropertyError::NotReactive { name }) if name == "note"
    ));
    assert!(matches!(
        watch_named::<u32, _>(&*order, "nonexistent"),
        Err(PropertyError::NotReactive { .. })
    ));
}

/// Test that rapid writes collapse into the latest value.
#[tokio::test]
async fn watch_coalesces_rapid_writes() {
    let a = Value::new("a", 1);
    let mut stream = watch(&a);
    assert_eq!(stream.next().await.unwrap().unwrap(), 1);

    a.set(2).unwrap();
    a.set(3).unwrap();
    a.set(4).unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), 4);

    let next = timeout(Duration::from_millis(20), stream.next()).await;
    assert!(next.is_err());
}

/// Test that a burst of writes while the consumer is waiting yields the
/// latest value exactly once.
#[tokio::test]
async fn watch_coalesces_writes_while_consumer_waits() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let a = Value::new("a", 1);
            let seen = Rc::new(RefCell::new(Vec::new()));

            let consumer = tokio::task::spawn_local({
                let a = a.clone();
                let seen = seen.clone();
                async move {
                    let mut stream = watch(&a);
                    while let Some(value) = stream.next().await {
                        seen.borrow_mut().push(value.unwrap());
                    }
                }
            });

            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(*seen.borrow(), vec![1]);

            a.set(2).unwrap();
            a.set(3).unwrap();
            a.set(4).unwrap();

            tokio::time::sleep(Duration::from_millis(20)).await;
            assert_eq!(*seen.borrow(), vec![1, 4]);

            consumer.abort();
        })
        .await;
}

/// Test that a consumer breaking out of its loop releases every subscription.
#[tokio::test]
async fn consumer_exit_releases_subscriptions() {
    init_tracing();

    let local = LocalSet::new();
    local
        .run_until(async {
            let a = Value::new("a", 0);

            let consumer = tokio::task::spawn_local({
                let a = a.clone();
                async move {
                    let mut seen = Vec::new();
                    let mut stream = watch(&a);
                    while let Some(value) = stream.next().await {
                        let value = value.unwrap();
                        seen.push(value);
                        if value >= 3 {
                            break;
                        }
                    }
                    seen
                }
            });

            for value in 1..=3 {
                tokio::task::yield_now().await;
                a.set(value).unwrap();
            }

            let seen = consumer.await.unwrap();
            assert_eq!(seen.last(), Some(&3));
            assert_eq!(a.notifier().handler_count(), 0);
        })
        .await;
}

/// Test that mutating an observable list inside a value counts as a change.
#[tokio::test]
async fn list_mutations_reach_watchers() {
    let items = Value::observable("items", ReactiveList::from(vec![1, 2]));
    let mut lengths = signet_core::reactive::watch_fn({
        let items = items.clone();
        move || items.with(ReactiveList::len)
    });
    assert_eq!(lengths.next().await.unwrap().unwrap(), 2);

    items.get().unwrap().push(3);
    assert_eq!(lengths.next().await.unwrap().unwrap(), 3);

    // Replacing the list is a change too, and the new list is tracked.
    let replacement = ReactiveList::from(vec![9]);
    items.set(replacement.clone()).unwrap();
    assert_eq!(lengths.next().await.unwrap().unwrap(), 1);

    replacement.clear();
    assert_eq!(lengths.next().await.unwrap().unwrap(), 0);
}

/// Test that handlers may write other properties while a notifier fires.
#[test]
fn handlers_can_write_during_fire() {
    let source = Value::new("source", 0);
    let mirror = Value::new("mirror", 0);
    let doubled = Computed::try_new("doubled", {
        let mirror = mirror.clone();
        move || Ok(mirror.get()? * 2)
    });
    assert_eq!(doubled.get().unwrap(), 0);

    let _binding = source.notifier().bind({
        let (source, mirror) = (source.clone(), mirror.clone());
        move |_| {
            let value = source.get_untracked().unwrap_or_default();
            mirror.set(value).unwrap();
        }
    });

    source.set(21).unwrap();
    assert_eq!(doubled.state(), ComputedState::Dirty);
    assert_eq!(doubled.get().unwrap(), 42);
}

/// Test that a binding added during a fire is not invoked by that fire.
#[test]
fn bindings_added_mid_fire_wait_for_the_next_fire() {
    let notifier: Notifier = Notifier::new();
    let late_calls = call_counter();
    let late_bindings = Rc::new(RefCell::new(Lifetimes::new()));

    let _binding = notifier.bind({
        let notifier = notifier.clone();
        let late_calls = late_calls.clone();
        let late_bindings = Rc::downgrade(&late_bindings);
        move |_| {
            let late_calls = late_calls.clone();
            let lifetime = notifier.bind(move |_| late_calls.set(late_calls.get() + 1));
            if let Some(bag) = late_bindings.upgrade() {
                bag.borrow_mut().push(lifetime);
            }
        }
    });

    notifier.notify();
    assert_eq!(late_calls.get(), 0);
    assert_eq!(late_bindings.borrow().len(), 1);

    notifier.notify();
    assert_eq!(late_calls.get(), 1);

    late_bindings.borrow_mut().dispose_all();
    assert_eq!(notifier.handler_count(), 1);
}

/// Test that repeated reads inside a tracked computation are recorded once.
#[test]
fn reads_inside_track_are_recorded_once() {
    let a = Value::new("a", 1);
    let list = ReactiveList::from(vec![1]);
    let items = Value::observable("items", list.clone());

    let (_, reads) = track(|| {
        let _ = a.get();
        let _ = a.get();
        let _ = items.get();
    });

    assert_eq!(reads.len(), 3);
    assert!(reads.contains(a.notifier().id()));
    assert!(reads.contains(items.notifier().id()));
    assert!(reads.contains(list.on_change().id()));
}
