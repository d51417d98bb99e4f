/// End-to-end scenarios for deep watches over mixed graphs
use crate::{
    Change, Key, List, Object, Observable, ObservableArray, Value, WatchOptions, WatchSession,
    set_default_options, watch, watch_with,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Watch `root`, run `mutate`, and check how many records arrived.
fn assert_trigger_count(root: impl Into<Value>, expected: usize, mutate: impl FnOnce()) {
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    let _session = watch(root, move |_| {
        count_clone.fetch_add(1, Ordering::Relaxed);
    });

    mutate();

    assert_eq!(count.load(Ordering::Relaxed), expected);
}

/// Watch `root` and keep every record.
fn record(root: impl Into<Value>) -> (WatchSession, Arc<Mutex<Vec<Change>>>) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let changes_clone = changes.clone();
    let session = watch(root, move |change| changes_clone.lock().push(change.clone()));
    (session, changes)
}

// ============================================================================
// Watching objects
// ============================================================================

#[test]
fn cell_change_triggers_callback() {
    let bar = Observable::new(1);
    let foo = Object::new().with("bar", &bar);

    assert_trigger_count(&foo, 1, || bar.set(2));
}

#[test]
fn nested_cell_change_triggers_callback() {
    let baz = Observable::new(1);
    let foo = Object::new().with("bar", Object::new().with("baz", &baz));

    assert_trigger_count(&foo, 1, || baz.set(2));
}

#[test]
fn change_record_describes_the_mutation() {
    let bar = Observable::new(1);
    let foo = Object::new().with("bar", &bar);
    let (_session, changes) = record(&foo);

    bar.set(2);

    let changes = changes.lock();
    assert_eq!(changes.len(), 1);
    assert_eq!(
        changes[0],
        Change {
            target: Value::from(&bar),
            parent: Some(Value::from(&foo)),
            key: Some(Key::from("bar")),
            value: Some(Value::from(2)),
            prior_value: Some(Value::from(1)),
        }
    );
}

#[test]
fn cells_inside_a_cell_value_are_watched() {
    let baz = Observable::new(1);
    let foo = Object::new().with("bar", Observable::new(Object::new().with("baz", &baz)));

    assert_trigger_count(&foo, 1, || baz.set(2));
}

#[test]
fn circular_object_through_a_cell_is_ignored() {
    let bar = Observable::new(Value::Null);
    let foo = Object::new().with("bar", &bar);
    bar.set(&foo);

    assert_trigger_count(&foo, 1, || bar.set(false));
}

#[test]
fn prior_values_follow_the_history() {
    let bar = Observable::new(1);
    let foo = Object::new().with("bar", &bar);
    let (_session, changes) = record(&foo);

    bar.set(2);
    bar.set(3);
    bar.set(4);

    let priors: Vec<Option<Value>> = changes
        .lock()
        .iter()
        .map(|change| change.prior_value.clone())
        .collect();
    assert_eq!(
        priors,
        vec![
            Some(Value::from(1)),
            Some(Value::from(2)),
            Some(Value::from(3))
        ]
    );
}

#[test]
fn replaced_value_stops_being_watched() {
    let baz = Observable::new(1);
    let bar = Observable::new(Object::new().with("baz", &baz));
    let foo = Object::new().with("bar", &bar);

    assert_trigger_count(&foo, 2, || {
        // reported
        baz.set(2);
        // reported, and baz is no longer reachable
        bar.set(Object::new());
        // not reported
        baz.set(3);
    });
    assert_eq!(baz.subscriber_count(), 0);
}

#[test]
fn new_value_starts_being_watched() {
    let bar = Observable::new(Value::Null);
    let foo = Object::new().with("bar", &bar);

    assert_trigger_count(&foo, 2, || {
        let qux = Observable::new(1);
        bar.set(Object::new().with("qux", &qux));
        qux.set(2);
    });
}

#[test]
fn root_cell_is_watched() {
    let foo = Observable::new(1);
    let (_session, changes) = record(&foo);

    foo.set(2);

    let changes = changes.lock();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].key, None);
    assert_eq!(changes[0].parent, None);
}

// ============================================================================
// Watching collections
// ============================================================================

#[test]
fn push_reports_added_slot() {
    let bar = ObservableArray::from_values([1]);
    let foo = Object::new().with("bar", &bar);
    let (_session, changes) = record(&foo);

    bar.push(2);

    let changes = changes.lock();
    assert_eq!(
        *changes,
        vec![Change {
            target: Value::from(&bar),
            parent: Some(Value::from(&foo)),
            key: Some(Key::Index(1)),
            value: Some(Value::from(2)),
            prior_value: None,
        }]
    );
}

#[test]
fn removal_reports_removed_slot() {
    let item = Object::new();
    let bar = ObservableArray::from_values([&item]);
    let foo = Object::new().with("bar", &bar);
    let (_session, changes) = record(&foo);

    bar.remove(&Value::from(&item));

    let changes = changes.lock();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].key, Some(Key::Index(0)));
    assert_eq!(changes[0].value, None);
    assert_eq!(changes[0].prior_value, Some(Value::from(&item)));
}

#[test]
fn cells_inside_collection_elements_are_watched() {
    let baz = Observable::new(1);
    let item = Object::new().with("baz", &baz);
    let foo = Object::new().with("bar", ObservableArray::from_values([&item]));
    let (_session, changes) = record(&foo);

    baz.set(2);

    let changes = changes.lock();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].target, Value::from(&baz));
    assert_eq!(changes[0].parent, Some(Value::from(&item)));
    assert_eq!(changes[0].key, Some(Key::from("baz")));
    assert_eq!(changes[0].value, Some(Value::from(2)));
}

#[test]
fn added_elements_start_being_watched() {
    let baz = Observable::new(1);
    let item = Object::new().with("baz", &baz);
    let bar = ObservableArray::new();
    let foo = Object::new().with("bar", &bar);

    assert_trigger_count(&foo, 2, || {
        bar.push(&item);
        baz.set(2);
    });
}

#[test]
fn removed_elements_stop_being_watched() {
    let baz = Observable::new(1);
    let item = Object::new().with("baz", &baz);
    let bar = ObservableArray::from_values([&item]);
    let foo = Object::new().with("bar", &bar);

    assert_trigger_count(&foo, 1, || {
        bar.remove(&Value::from(&item));
        baz.set(2);
    });
    assert_eq!(baz.subscriber_count(), 0);
}

#[test]
fn reversing_two_elements_reports_both_slots() {
    let bar = ObservableArray::from_values(["one", "two"]);
    let foo = Object::new().with("bar", &bar);
    let (_session, changes) = record(&foo);

    bar.reverse();

    let mut changes = changes.lock().clone();
    assert_eq!(changes.len(), 2);
    changes.sort_by_key(|change| change.key.clone());

    assert_eq!(changes[0].key, Some(Key::Index(0)));
    assert_eq!(changes[0].value, Some(Value::from("two")));
    assert_eq!(changes[0].prior_value, Some(Value::from("one")));

    assert_eq!(changes[1].key, Some(Key::Index(1)));
    assert_eq!(changes[1].value, Some(Value::from("one")));
    assert_eq!(changes[1].prior_value, Some(Value::from("two")));
}

#[test]
fn moved_elements_keep_their_subscriptions() {
    let first = Observable::new(1);
    let second = Observable::new(1);
    let bar = ObservableArray::from_values([
        Object::new().with("v", &first),
        Object::new().with("v", &second),
    ]);

    assert_trigger_count(&bar, 4, || {
        bar.reverse();
        first.set(2);
        second.set(2);
    });
    assert_eq!(first.subscriber_count(), 0);
}

#[test]
fn cells_in_plain_lists_are_watched() {
    let first = Observable::new(1);
    let foo = Object::new().with(
        "bar",
        [first.clone(), Observable::new(1)]
            .into_iter()
            .collect::<List>(),
    );

    assert_trigger_count(&foo, 1, || first.set(2));
}

#[test]
fn snapshot_tracks_successive_batches() {
    let bar = ObservableArray::from_values(["a", "b"]);
    let (_session, changes) = record(&bar);

    bar.push("c");
    bar.replace(["c", "a", "b"]);

    // Second batch moves "c" from slot 2 to slot 0; priors come from [a, b, c].
    let changes = changes.lock();
    let moves: Vec<&Change> = changes.iter().skip(1).collect();
    assert_eq!(moves.len(), 2);
    let to_front = moves
        .iter()
        .find(|change| change.key == Some(Key::Index(0)))
        .expect("slot 0 reported");
    assert_eq!(to_front.value, Some(Value::from("c")));
    assert_eq!(to_front.prior_value, Some(Value::from("a")));
}

// ============================================================================
// Subscriptions and lifecycle
// ============================================================================

#[test]
fn every_reachable_cell_is_subscribed_exactly_once() {
    let shared = Observable::new(1);
    let nested = Observable::new(1);
    let element = Observable::new(1);
    let collection = ObservableArray::from_values([&element]);
    let root = Object::new()
        .with("a", &shared)
        .with("b", [Value::from(&shared)].into_iter().collect::<List>())
        .with("c", Object::new().with("d", &nested))
        .with("e", &collection);

    let (session, changes) = record(&root);

    assert_eq!(session.subscription_count(), 4);
    for count in [
        shared.subscriber_count(),
        nested.subscriber_count(),
        element.subscriber_count(),
        collection.subscriber_count(),
    ] {
        assert_eq!(count, 1);
    }

    shared.set(2);
    assert_eq!(changes.lock().len(), 1);
}

#[test]
fn dispose_cancels_every_subscription() {
    let bar = Observable::new(1);
    let list = ObservableArray::from_values([Observable::new(1)]);
    let foo = Object::new().with("bar", &bar).with("list", &list);
    let (session, changes) = record(&foo);

    session.dispose();
    bar.set(2);
    list.push(3);

    assert!(session.is_disposed());
    assert_eq!(session.subscription_count(), 0);
    assert!(changes.lock().is_empty());
    assert_eq!(bar.subscriber_count(), 0);
    assert_eq!(list.subscriber_count(), 0);

    // Second dispose is a no-op.
    session.dispose();
}

#[test]
fn dropping_the_session_disposes_it() {
    let bar = Observable::new(1);
    let foo = Object::new().with("bar", &bar);

    let session = watch(&foo, |_| {});
    assert_eq!(bar.subscriber_count(), 1);
    drop(session);

    assert_eq!(bar.subscriber_count(), 0);
}

#[test]
fn container_cycles_terminate_and_dispose_cleanly() {
    let c = Observable::new(1);
    let a = Object::new().with("c", &c);
    a.insert("self", &a);
    let list = List::new();
    list.push(&list);
    list.push(&a);
    a.insert("list", &list);

    let (session, changes) = record(&a);
    c.set(2);
    assert_eq!(changes.lock().len(), 1);

    session.dispose();
    assert_eq!(c.subscriber_count(), 0);

    // Break the cycles so the graph can be freed.
    a.remove("self");
    a.remove("list");
    list.set(0, Value::Null).expect("slot 0 exists");
}

#[test]
fn cells_holding_each_other_stay_consistent() {
    let x = Observable::new(Value::Null);
    let y = Observable::new(&x);
    x.set(&y);

    let (session, changes) = record(&x);
    assert_eq!(session.subscription_count(), 2);

    // y is no longer reachable from x, but x itself still is the root.
    x.set(5);
    assert_eq!(y.subscriber_count(), 0);
    x.set(6);

    assert_eq!(changes.lock().len(), 2);
    assert_eq!(session.subscription_count(), 1);

    session.dispose();
    y.set(Value::Null);
}

// ============================================================================
// Per-cell toggle and options
// ============================================================================

#[test]
fn unwatchable_cell_is_ignored() {
    let foo = Observable::new(1);
    foo.set_watchable(false);
    let bar = Object::new().with("foo", &foo);

    assert_trigger_count(&bar, 0, || foo.set(2));
    assert_eq!(foo.subscriber_count(), 0);
}

#[test]
fn unwatchable_cell_contents_are_still_watched() {
    let inner = Observable::new(1);
    let outer = Observable::new(Object::new().with("inner", &inner));
    outer.set_watchable(false);
    let root = Object::new().with("outer", &outer);

    let (session, changes) = record(&root);
    inner.set(2);
    assert_eq!(changes.lock().len(), 1);

    session.dispose();
    assert_eq!(inner.subscriber_count(), 0);
}

#[test]
fn pausing_a_cell_suppresses_its_records() {
    let bar = Observable::new(1);
    let foo = Object::new().with("bar", &bar);

    assert_trigger_count(&foo, 2, || {
        bar.set(2);

        bar.set_watchable(false);
        bar.set(3);
        bar.set_watchable(true);

        bar.set(4);
    });
}

#[test]
fn pausing_a_collection_suppresses_its_records() {
    let bar = ObservableArray::from_values([1]);
    let foo = Object::new().with("bar", &bar);

    assert_trigger_count(&foo, 2, || {
        bar.push(2);

        bar.set_watchable(false);
        bar.push(3);
        bar.set_watchable(true);

        bar.push(4);
    });
}

#[test]
fn should_watch_limits_subscriptions() {
    let foo = Observable::new(1);
    let bar = Observable::derived(&foo, Value::clone);
    let baz = Object::new().with("bar", &bar);
    let count = Arc::new(AtomicUsize::new(0));

    let count_clone = count.clone();
    let _session = watch_with(
        &baz,
        move |_| {
            count_clone.fetch_add(1, Ordering::Relaxed);
        },
        WatchOptions::new().should_watch(|cell| cell.as_cell().is_some_and(Observable::is_writable)),
    );
    foo.set(2);

    assert_eq!(bar.peek(), Value::from(2));
    assert_eq!(count.load(Ordering::Relaxed), 0);
}

#[test]
fn value_accessor_resolves_indirections() {
    // "bar" holds the name of the cell that really backs it.
    let underlying = Observable::new(1);
    let foo = Object::new().with("bar", "@underlying");
    let resolved = underlying.clone();
    let options = WatchOptions::new().value_accessor(move |value, key, _parent| {
        if key.as_name() == Some("bar") && value.as_str() == Some("@underlying") {
            Value::from(&resolved)
        } else {
            value
        }
    });

    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    let session = watch_with(
        &foo,
        move |_| {
            count_clone.fetch_add(1, Ordering::Relaxed);
        },
        options,
    );

    underlying.set(2);
    assert_eq!(count.load(Ordering::Relaxed), 1);

    // Teardown resolves the same way.
    session.dispose();
    assert_eq!(underlying.subscriber_count(), 0);
}

#[test]
fn value_accessor_applies_to_collection_elements() {
    let underlying = Observable::new(1);
    let arr = ObservableArray::from_values(["@underlying"]);
    let root = Object::new().with("arr", &arr);
    let resolved = underlying.clone();
    let options = WatchOptions::new().value_accessor(move |value, _key, _parent| {
        if value.as_str() == Some("@underlying") {
            Value::from(&resolved)
        } else {
            value
        }
    });

    let changes = Arc::new(Mutex::new(Vec::new()));
    let changes_clone = changes.clone();
    let _session = watch_with(
        &root,
        move |change| changes_clone.lock().push(change.clone()),
        options,
    );

    underlying.set(2);
    {
        let changes = changes.lock();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].target, Value::from(&underlying));
        assert_eq!(changes[0].parent, Some(Value::from(&arr)));
        assert_eq!(changes[0].key, Some(Key::Index(0)));
    }

    // Removed slots resolve the same way before teardown.
    arr.pop();
    assert_eq!(underlying.subscriber_count(), 0);
    underlying.set(3);
    assert_eq!(changes.lock().len(), 2);

    // Added slots are resolved before being watched.
    arr.push("@underlying");
    assert_eq!(underlying.subscriber_count(), 1);
    underlying.set(4);
    assert_eq!(changes.lock().len(), 4);
}

#[test]
fn default_options_apply_unless_overridden() {
    let bar = Observable::new(1);
    let foo = Object::new().with("bar", &bar);
    let excluded = Value::from(&bar);

    // Only rejects this test's cell, so concurrent tests are unaffected.
    let previous = set_default_options(
        WatchOptions::new().should_watch(move |cell| *cell != excluded),
    );
    let count = Arc::new(AtomicUsize::new(0));
    let defaulted = {
        let count = count.clone();
        watch(&foo, move |_| {
            count.fetch_add(1, Ordering::Relaxed);
        })
    };
    let overridden = {
        let count = count.clone();
        watch_with(
            &foo,
            move |_| {
                count.fetch_add(10, Ordering::Relaxed);
            },
            WatchOptions::new().should_watch(|_| true),
        )
    };
    set_default_options(previous);

    bar.set(2);

    assert_eq!(count.load(Ordering::Relaxed), 10);
    drop((defaulted, overridden));
}

// ============================================================================
// Reentrancy and threads
// ============================================================================

#[test]
fn mutation_from_callback_is_delivered_after_current_record() {
    let a = Observable::new(1);
    let b = Observable::new(1);
    let root = Object::new().with("a", &a).with("b", &b);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let seen_clone = seen.clone();
    let b_clone = b.clone();
    let _session = watch(&root, move |change| {
        seen_clone.lock().push(change.key.clone());
        if change.key == Some(Key::from("a")) {
            b_clone.set(10);
            // Not yet delivered: still inside a's record.
            assert_eq!(seen_clone.lock().len(), 1);
        }
    });

    a.set(2);

    assert_eq!(
        *seen.lock(),
        vec![Some(Key::from("a")), Some(Key::from("b"))]
    );
}

#[test]
fn dispose_from_callback_takes_effect_after_record() {
    let a = Observable::new(1);
    let root = Object::new().with("a", &a);
    let count = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<WatchSession>>> = Arc::new(Mutex::new(None));

    let disposed_inside = Arc::new(AtomicUsize::new(0));

    let count_clone = count.clone();
    let slot_clone = slot.clone();
    let disposed_clone = disposed_inside.clone();
    let session = watch(&root, move |_| {
        count_clone.fetch_add(1, Ordering::Relaxed);
        if let Some(session) = slot_clone.lock().as_ref() {
            session.dispose();
            // Queued behind the record being delivered.
            if session.is_disposed() {
                disposed_clone.fetch_add(1, Ordering::Relaxed);
            }
        }
    });
    *slot.lock() = Some(session);

    a.set(2);
    assert!(slot.lock().as_ref().is_some_and(WatchSession::is_disposed));
    a.set(3);

    assert_eq!(count.load(Ordering::Relaxed), 1);
    assert_eq!(disposed_inside.load(Ordering::Relaxed), 0);
    assert_eq!(a.subscriber_count(), 0);
    slot.lock().take();
}

#[test]
fn mutations_from_another_thread_are_reported() {
    let bar = Observable::new(1);
    let foo = Object::new().with("bar", &bar);
    let (_session, changes) = record(&foo);

    let writer = bar.clone();
    std::thread::spawn(move || writer.set(2))
        .join()
        .expect("writer thread panicked");

    assert_eq!(changes.lock().len(), 1);
}

#[test]
fn panicking_callback_leaves_session_usable() {
    let bar = Observable::new(1);
    let foo = Object::new().with("bar", &bar);
    let count = Arc::new(AtomicUsize::new(0));

    let count_clone = count.clone();
    let _session = watch(&foo, move |change| {
        count_clone.fetch_add(1, Ordering::Relaxed);
        if change.value == Some(Value::from(2)) {
            panic!("callback failure");
        }
    });

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| bar.set(2)));
    assert!(result.is_err());

    bar.set(3);
    assert_eq!(count.load(Ordering::Relaxed), 2);
}
