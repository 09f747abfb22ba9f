//! Property-based tests for merging, selector suppression and trace bounds.

use larder::{
    create_store, subscribe_with_selector, Creator, Devtools, DevtoolsOptions, SetState, Store,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Counts = BTreeMap<String, i64>;

fn key() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(str::to_string)
}

fn partial() -> impl Strategy<Value = Counts> {
    prop::collection::btree_map(key(), -5i64..5, 0..4)
}

proptest! {
    #[test]
    fn prop_unsubscribe_before_writes_silences_listener(
        unsubscribes in 1usize..4,
        writes in prop::collection::vec(partial(), 0..10),
    ) {
        let store = Store::new(Counts::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let subscription = store.subscribe({
            let calls = calls.clone();
            move |_: &Counts| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        for _ in 0..unsubscribes {
            subscription.unsubscribe();
        }
        for write in &writes {
            store.set_state(write.clone());
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
        prop_assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn prop_merge_matches_keywise_overwrite(
        initial in partial(),
        writes in prop::collection::vec(partial(), 0..20),
    ) {
        let store = Store::new(initial.clone());
        let mut expected = initial;
        for write in &writes {
            store.set_state(write.clone());
            expected.extend(write.clone());
        }
        prop_assert_eq!(&*store.get_state(), &expected);
    }

    #[test]
    fn prop_every_write_notifies_once(writes in prop::collection::vec(partial(), 0..20)) {
        let store = Store::new(Counts::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let _subscription = store.subscribe({
            let calls = calls.clone();
            move |_: &Counts| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        for write in &writes {
            store.set_state(write.clone());
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), writes.len());
    }

    #[test]
    fn prop_selector_fires_only_on_change(writes in prop::collection::vec(partial(), 0..20)) {
        let store = Store::new(Counts::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let select = |state: &Counts| state.get("a").copied();
        let _subscription = subscribe_with_selector(&store, select, {
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        let mut expected = 0;
        let mut previous = select(&store.get_state());
        for write in &writes {
            store.set_state(write.clone());
            let next = select(&store.get_state());
            if next != previous {
                expected += 1;
                previous = next;
            }
        }
        prop_assert_eq!(calls.load(Ordering::SeqCst), expected);
    }

    #[test]
    fn prop_trace_history_never_exceeds_limit(limit in 0usize..8, writes in 0usize..20) {
        let options = DevtoolsOptions {
            trace: true,
            trace_limit: limit,
            ..Default::default()
        };
        let devtools = Devtools::new(Some(options));
        let history = devtools.history();
        let (tx, rx) = std::sync::mpsc::channel();
        let creator = Creator::new(move |set: SetState<Counts>, _get| {
            tx.send(set).unwrap();
            Counts::new()
        });
        let _store = create_store(creator.with(devtools)).unwrap();
        let set = rx.recv().unwrap();

        for i in 0..writes {
            set.set(Counts::from([("n".to_string(), i as i64)])).unwrap();
        }
        // A zero limit falls back to the default of 10.
        let retained = if limit == 0 { 10 } else { limit };
        prop_assert_eq!(history.len(), writes.min(retained));
    }
}
