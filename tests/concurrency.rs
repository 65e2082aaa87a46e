//! Registry behaviour under concurrent mutation.

use eventbus::{Delivery, EventBus, ExecutionContext, NotificationCenter, Subscriber};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const NAMES: [&str; 3] = ["alpha", "beta", "gamma"];

#[derive(Clone, Debug)]
enum Op {
    Subscribe(usize),
    UnsubscribeNamed(usize),
    UnsubscribeAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..NAMES.len()).prop_map(Op::Subscribe),
        1 => (0..NAMES.len()).prop_map(Op::UnsubscribeNamed),
        1 => Just(Op::UnsubscribeAll),
    ]
}

fn apply(bus: &EventBus, target: &Subscriber, op: &Op) {
    match op {
        Op::Subscribe(i) => {
            bus.subscribe(target, NAMES[*i], None, ExecutionContext::CallerThread, |_| {})
                .unwrap();
        }
        Op::UnsubscribeNamed(i) => {
            bus.unsubscribe_named(target, NAMES[*i]);
        }
        Op::UnsubscribeAll => {
            bus.unsubscribe_all(target);
        }
    }
}

/// Serial model of one subscriber's list.
fn model(ops: &[Op]) -> Vec<String> {
    let mut list: Vec<String> = Vec::new();
    for op in ops {
        match op {
            Op::Subscribe(i) => list.push(NAMES[*i].to_string()),
            Op::UnsubscribeNamed(i) => list.retain(|n| n != NAMES[*i]),
            Op::UnsubscribeAll => list.clear(),
        }
    }
    list
}

fn bus_with_center() -> (NotificationCenter, EventBus) {
    let center = NotificationCenter::new();
    let bus = EventBus::with_delivery(Arc::new(center.clone()));
    (center, bus)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn disjoint_subscribers_match_serial_model(
        plans in prop::collection::vec(prop::collection::vec(op_strategy(), 0..24), 1..6)
    ) {
        let (center, bus) = bus_with_center();
        let subscribers: Vec<Subscriber> = plans.iter().map(|_| bus.subscriber()).collect();

        thread::scope(|s| {
            for (target, ops) in subscribers.iter().zip(&plans) {
                let bus = &bus;
                s.spawn(move || {
                    for op in ops {
                        apply(bus, target, op);
                    }
                });
            }
        });

        let mut total = 0;
        for (target, ops) in subscribers.iter().zip(&plans) {
            let names = bus.registry().names(target);
            prop_assert_eq!(&names, &model(ops));
            total += names.len();
        }

        // No orphaned or missing observers in the center.
        prop_assert_eq!(center.observer_count(), total);
    }
}

#[test]
fn test_concurrent_subscribes_to_one_subscriber_are_not_lost() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;

    let (center, bus) = bus_with_center();
    let target = bus.subscriber();

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    bus.subscribe(&target, "evt", None, ExecutionContext::CallerThread, |_| {})
                        .unwrap();
                }
            });
        }
    });

    let subscriptions = bus.registry().subscriptions(&target);
    assert_eq!(subscriptions.len(), THREADS * PER_THREAD);

    let mut handles: Vec<_> = subscriptions.iter().map(|s| s.handle).collect();
    handles.sort();
    handles.dedup();
    assert_eq!(handles.len(), THREADS * PER_THREAD);

    assert_eq!(bus.unsubscribe_all(&target), THREADS * PER_THREAD);
    assert_eq!(center.observer_count(), 0);
}

#[test]
fn test_posting_while_unsubscribing() {
    let (center, bus) = bus_with_center();
    let hits = Arc::new(AtomicUsize::new(0));
    let subscribers: Vec<Subscriber> = (0..16).map(|_| bus.subscriber()).collect();

    for target in &subscribers {
        let hits = Arc::clone(&hits);
        bus.subscribe(target, "tick", None, ExecutionContext::CallerThread, move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    }

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..200 {
                bus.post("tick", None, None);
            }
        });
        s.spawn(|| {
            for target in &subscribers {
                bus.unsubscribe_all(target);
            }
        });
    });

    assert_eq!(center.observer_count(), 0);
    assert_eq!(bus.registry().subscriber_count(), 0);

    let before = hits.load(Ordering::SeqCst);
    bus.post("tick", None, None);
    assert_eq!(hits.load(Ordering::SeqCst), before);
}

#[test]
fn test_stale_handle_after_direct_cancel_is_harmless() {
    let (center, bus) = bus_with_center();
    let target = bus.subscriber();

    let handle = bus
        .subscribe(&target, "evt", None, ExecutionContext::CallerThread, |_| {})
        .unwrap();
    bus.subscribe(&target, "evt", None, ExecutionContext::CallerThread, |_| {})
        .unwrap();

    assert!(center.cancel(handle));
    assert_eq!(center.observer_count(), 1);
    assert_eq!(bus.registry().subscription_count(&target), 2);

    assert_eq!(bus.unsubscribe_named(&target, "evt"), 2);
    assert_eq!(center.observer_count(), 0);
}
