//! End-to-end scenarios for collection observers driven by a `Tracker`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use livemirror_core::{Doc, Error, Result, Value};
use livemirror_observer::{
    Batch, ChangeRecord, CollectionObserver, EventSink, LiveQuery, LocalCollection,
    MaterializedCollection, MirrorEvent, ObserveCallbacks, ObserveHandle, Tracker,
};
use livemirror_reactive::{ReactiveCell, Scheduler};

type Batches = Rc<RefCell<Vec<Batch<String>>>>;

fn s(v: &str) -> String {
    v.to_string()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|v| s(v)).collect()
}

struct Harness {
    tracker: Rc<Tracker>,
    first: LocalCollection<String>,
    second: LocalCollection<String>,
    batches: Batches,
    subscriptions: Rc<Cell<u32>>,
    observer: CollectionObserver<String>,
}

/// Builds an observer whose definition picks `second` when the `source`
/// property is "second" and `first` otherwise.
fn harness(first: &[&str], second: &[&str]) -> Harness {
    let tracker = Rc::new(Tracker::new());
    let first = LocalCollection::from_docs(&*tracker, strings(first));
    let second = LocalCollection::from_docs(&*tracker, strings(second));
    let batches: Batches = Rc::new(RefCell::new(Vec::new()));
    let subscriptions = Rc::new(Cell::new(0));

    let (a, b) = (first.clone(), second.clone());
    let log = batches.clone();
    let count = subscriptions.clone();
    let observer = CollectionObserver::builder(move |props| {
        if props.get("source").as_str() == Some("second") {
            Ok(b.cursor())
        } else {
            Ok(a.cursor())
        }
    })
    .scheduler(tracker.clone())
    .label("scenario")
    .on_batch(move |records| {
        log.borrow_mut().push(records.to_vec());
        Ok(())
    })
    .on_new_subscription(move || {
        count.set(count.get() + 1);
        Ok(())
    })
    .build()
    .unwrap();

    Harness {
        tracker,
        first,
        second,
        batches,
        subscriptions,
        observer,
    }
}

#[test]
fn scenario_a_adds_are_batched_in_order() {
    let h = harness(&[], &[]);
    assert!(h.batches.borrow().is_empty());
    assert_eq!(h.subscriptions.get(), 1);

    h.first.push(s("a"));
    h.first.push(s("b"));
    h.tracker.flush().unwrap();

    assert_eq!(h.observer.docs(), strings(&["a", "b"]));
    assert_eq!(
        *h.batches.borrow(),
        vec![vec![ChangeRecord::add(0, s("a")), ChangeRecord::add(1, s("b"))]]
    );
    assert_eq!(*h.observer.last_batch(), h.batches.borrow()[0]);
}

#[test]
fn scenario_b_move() {
    let h = harness(&["a", "b"], &[]);
    h.batches.borrow_mut().clear();

    h.first.move_to(0, 1).unwrap();
    h.tracker.flush().unwrap();

    assert_eq!(h.observer.docs(), strings(&["b", "a"]));
    assert_eq!(*h.batches.borrow(), vec![vec![ChangeRecord::moved(0, 1)]]);
}

#[test]
fn scenario_c_redefinition_removes_then_readds() {
    let h = harness(&["a", "b"], &["c"]);
    assert_eq!(h.subscriptions.get(), 1);
    h.batches.borrow_mut().clear();

    h.observer.set("source", "second").unwrap();
    assert_eq!(h.observer.docs(), strings(&["a", "b"]));
    h.tracker.flush().unwrap();

    assert_eq!(h.observer.docs(), strings(&["c"]));
    assert_eq!(
        *h.batches.borrow(),
        vec![
            vec![ChangeRecord::remove(1), ChangeRecord::remove(0)],
            vec![ChangeRecord::add(0, s("c"))],
        ]
    );
    assert_eq!(h.subscriptions.get(), 2);
    assert_eq!(h.observer.subscription_count(), 2);

    // The old source is no longer observed.
    assert_eq!(h.first.observer_count(), 0);
    assert_eq!(h.second.observer_count(), 1);
    h.first.push(s("ignored"));
    h.tracker.flush().unwrap();
    assert_eq!(h.batches.borrow().len(), 2);
}

#[test]
fn scenario_d_change_produces_no_record() {
    let tracker = Rc::new(Tracker::new());
    let source = LocalCollection::from_docs(
        &*tracker,
        vec![Doc::new("a").with("n", 1i64).with("tag", "x")],
    );
    let batches: Rc<RefCell<Vec<Batch<Doc>>>> = Rc::new(RefCell::new(Vec::new()));

    let cursor_source = source.clone();
    let log = batches.clone();
    let observer = CollectionObserver::builder(move |_| Ok(cursor_source.cursor()))
        .scheduler(tracker.clone())
        .on_batch(move |records| {
            log.borrow_mut().push(records.to_vec());
            Ok(())
        })
        .build()
        .unwrap();
    assert_eq!(batches.borrow().len(), 1);

    source.update_at(0, Doc::new("a").with("n", 2i64)).unwrap();
    tracker.flush().unwrap();

    let docs = observer.docs();
    assert_eq!(docs[0].get("n"), Some(&Value::Int64(2)));
    assert_eq!(docs[0].get("tag"), Some(&Value::from("x")));
    assert_eq!(batches.borrow().len(), 1);
    assert!(observer.last_batch().is_empty());
}

#[test]
fn teardown_emits_descending_removes() {
    let h = harness(&["a", "b", "c", "d", "e"], &[]);
    h.batches.borrow_mut().clear();

    h.observer.set("source", "second").unwrap();
    h.tracker.flush().unwrap();

    assert_eq!(
        *h.batches.borrow(),
        vec![(0..5).rev().map(ChangeRecord::remove).collect::<Vec<_>>()]
    );
    assert!(h.observer.is_empty());
    assert_eq!(h.subscriptions.get(), 2);
}

#[test]
fn pending_records_stay_with_the_old_subscription() {
    let h = harness(&["a"], &["c"]);
    h.batches.borrow_mut().clear();

    // Redefinition is scheduled before the old flush gets a chance to run.
    h.observer.set("source", "second").unwrap();
    h.first.push(s("b"));
    h.tracker.flush().unwrap();

    assert_eq!(
        *h.batches.borrow(),
        vec![
            vec![
                ChangeRecord::add(1, s("b")),
                ChangeRecord::remove(1),
                ChangeRecord::remove(0),
            ],
            vec![ChangeRecord::add(0, s("c"))],
        ]
    );
}

#[test]
fn old_flush_runs_before_redefinition_when_scheduled_first() {
    let h = harness(&["a"], &["c"]);
    h.batches.borrow_mut().clear();

    h.first.push(s("b"));
    h.observer.set("source", "second").unwrap();
    h.tracker.flush().unwrap();

    assert_eq!(
        *h.batches.borrow(),
        vec![
            vec![ChangeRecord::add(1, s("b"))],
            vec![ChangeRecord::remove(1), ChangeRecord::remove(0)],
            vec![ChangeRecord::add(0, s("c"))],
        ]
    );
}

#[test]
fn independent_mirror_tracks_every_batch() {
    let h = harness(&["a", "b"], &["x", "y", "z"]);
    let mut mirror = MaterializedCollection::new();

    h.first.insert_at(1, s("c")).unwrap();
    h.first.remove_at(0).unwrap();
    h.tracker.flush().unwrap();
    h.observer.set("source", "second").unwrap();
    h.tracker.flush().unwrap();
    h.second.move_to(2, 0).unwrap();
    h.second.push(s("w"));
    h.tracker.flush().unwrap();
    h.observer.set("source", "first").unwrap();
    h.first.push(s("d"));
    h.tracker.flush().unwrap();

    for batch in h.batches.borrow().iter() {
        mirror.replay(batch).unwrap();
    }
    assert_eq!(mirror.to_vec(), h.observer.docs());
    assert_eq!(mirror.to_vec(), h.first.docs());
    assert_eq!(h.subscriptions.get(), 3);
}

#[test]
fn definition_error_fails_build_without_side_effects() {
    let tracker = Rc::new(Tracker::new());
    let emitted = Rc::new(Cell::new(0));
    let counter = emitted.clone();

    let result = CollectionObserver::<String>::builder(|_| Err(Error::configuration("no cursor")))
        .scheduler(tracker.clone())
        .on_batch(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .build();

    assert!(result.err().unwrap().is_configuration());
    assert_eq!(emitted.get(), 0);
    assert_eq!(tracker.computation_count(), 0);
}

struct BrokenQuery;

impl LiveQuery<String> for BrokenQuery {
    fn observe(&self, _callbacks: Rc<dyn ObserveCallbacks<String>>) -> Result<Box<dyn ObserveHandle>> {
        Err(Error::configuration("query cannot be observed"))
    }

    fn fetch(&self) -> Vec<String> {
        Vec::new()
    }
}

#[test]
fn unobservable_query_fails_build() {
    let tracker = Rc::new(Tracker::new());
    let result = CollectionObserver::builder(|_| Ok(Box::new(BrokenQuery) as Box<dyn LiveQuery<String>>))
        .scheduler(tracker.clone())
        .build();

    assert!(result.err().unwrap().is_configuration());
    assert_eq!(tracker.computation_count(), 0);
}

#[test]
fn definition_error_on_rerun_surfaces_and_recovers() {
    let tracker = Rc::new(Tracker::new());
    let source = LocalCollection::from_docs(&*tracker, strings(&["a"]));
    let batches: Batches = Rc::new(RefCell::new(Vec::new()));

    let cursor_source = source.clone();
    let log = batches.clone();
    let observer = CollectionObserver::builder(move |props| {
        if props.get("mode").as_str() == Some("broken") {
            return Err(Error::configuration("broken mode"));
        }
        Ok(cursor_source.cursor())
    })
    .scheduler(tracker.clone())
    .on_batch(move |records| {
        log.borrow_mut().push(records.to_vec());
        Ok(())
    })
    .build()
    .unwrap();

    observer.set("mode", "broken").unwrap();
    assert!(tracker.flush().unwrap_err().is_configuration());
    assert!(!observer.is_subscribed());
    assert!(observer.is_empty());
    assert_eq!(batches.borrow().last().unwrap(), &vec![ChangeRecord::remove(0)]);
    assert_eq!(source.observer_count(), 0);

    observer.set("mode", "ok").unwrap();
    tracker.flush().unwrap();
    assert!(observer.is_subscribed());
    assert_eq!(observer.docs(), strings(&["a"]));
    assert_eq!(observer.subscription_count(), 2);
}

#[test]
fn listener_failure_surfaces_and_is_not_redelivered() {
    let h = harness(&[], &[]);
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    h.observer
        .on_batch(move |_| {
            counter.set(counter.get() + 1);
            Err(Error::callback("batch", "consumer failed"))
        })
        .unwrap();

    h.first.push(s("a"));
    assert!(h.tracker.flush().unwrap_err().is_callback());
    assert_eq!(calls.get(), 1);
    assert_eq!(*h.observer.last_batch(), vec![ChangeRecord::add(0, s("a"))]);

    h.tracker.flush().unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(h.observer.docs(), strings(&["a"]));
}

#[test]
fn rejected_final_batch_still_resubscribes() {
    let h = harness(&["a"], &["x"]);
    let failed = Rc::new(Cell::new(false));
    let flag = failed.clone();
    h.observer
        .on_batch(move |_| {
            if flag.replace(true) {
                Ok(())
            } else {
                Err(Error::callback("batch", "consumer failed once"))
            }
        })
        .unwrap();

    h.observer.set("source", "second").unwrap();
    assert!(h.tracker.flush().unwrap_err().is_callback());
    assert!(h.observer.is_subscribed());
    assert_eq!(h.observer.docs(), strings(&["x"]));
    assert_eq!(h.subscriptions.get(), 2);

    h.second.push(s("y"));
    h.tracker.flush().unwrap();
    assert_eq!(h.observer.docs(), strings(&["x", "y"]));

    h.observer.set("source", "first").unwrap();
    h.tracker.flush().unwrap();
    assert_eq!(h.observer.docs(), strings(&["a"]));
    assert_eq!(
        *h.batches.borrow(),
        vec![
            vec![ChangeRecord::add(0, s("a"))],
            vec![ChangeRecord::remove(0)],
            vec![ChangeRecord::add(0, s("x"))],
            vec![ChangeRecord::add(1, s("y"))],
            vec![ChangeRecord::remove(1), ChangeRecord::remove(0)],
            vec![ChangeRecord::add(0, s("a"))],
        ]
    );
}

#[test]
fn listener_can_trigger_redefinition_reentrantly() {
    let tracker = Rc::new(Tracker::new());
    let first: LocalCollection<String> = LocalCollection::new(&*tracker);
    let second = LocalCollection::from_docs(&*tracker, strings(&["z"]));
    let use_second = Rc::new(ReactiveCell::new(false, tracker.dependency()));
    let batches: Batches = Rc::new(RefCell::new(Vec::new()));
    let subscriptions = Rc::new(Cell::new(0));

    let (a, b, flag) = (first.clone(), second.clone(), use_second.clone());
    let (log, switch) = (batches.clone(), use_second.clone());
    let count = subscriptions.clone();
    let observer = CollectionObserver::builder(move |_| {
        if flag.get() {
            Ok(b.cursor())
        } else {
            Ok(a.cursor())
        }
    })
    .scheduler(tracker.clone())
    .on_batch(move |records| {
        log.borrow_mut().push(records.to_vec());
        if records.iter().any(|r| r.item().map(String::as_str) == Some("trigger")) {
            switch.set(true);
        }
        Ok(())
    })
    .on_new_subscription(move || {
        count.set(count.get() + 1);
        Ok(())
    })
    .build()
    .unwrap();

    first.push(s("trigger"));
    tracker.flush().unwrap();

    assert_eq!(
        *batches.borrow(),
        vec![
            vec![ChangeRecord::add(0, s("trigger"))],
            vec![ChangeRecord::remove(0)],
            vec![ChangeRecord::add(0, s("z"))],
        ]
    );
    assert_eq!(subscriptions.get(), 2);
    assert_eq!(observer.docs(), strings(&["z"]));
}

#[test]
fn destroy_is_idempotent_and_releases_everything() {
    let h = harness(&["a", "b"], &[]);
    assert_eq!(h.tracker.computation_count(), 2);
    assert_eq!(h.batches.borrow().len(), 1);

    h.observer.destroy();
    h.observer.destroy();

    assert!(h.observer.is_destroyed());
    assert!(!h.observer.is_subscribed());
    assert!(h.observer.docs().is_empty());
    assert!(h.observer.last_batch().is_empty());
    assert_eq!(h.observer.set("source", "second"), Err(Error::Destroyed));
    assert_eq!(h.observer.get("source"), Err(Error::Destroyed));
    assert_eq!(h.observer.on_batch(|_| Ok(())).err(), Some(Error::Destroyed));
    assert_eq!(h.tracker.computation_count(), 0);
    assert_eq!(h.first.observer_count(), 0);

    h.first.push(s("c"));
    h.tracker.flush().unwrap();
    assert_eq!(h.batches.borrow().len(), 1);
}

#[test]
fn destroy_from_inside_a_batch_listener() {
    let tracker = Rc::new(Tracker::new());
    let source: LocalCollection<String> = LocalCollection::new(&*tracker);
    let slot: Rc<RefCell<Option<Rc<CollectionObserver<String>>>>> = Rc::new(RefCell::new(None));

    let cursor_source = source.clone();
    let target = slot.clone();
    let observer = Rc::new(
        CollectionObserver::builder(move |_| Ok(cursor_source.cursor()))
            .scheduler(tracker.clone())
            .on_batch(move |_| {
                if let Some(observer) = target.borrow().as_ref() {
                    observer.destroy();
                }
                Ok(())
            })
            .build()
            .unwrap(),
    );
    *slot.borrow_mut() = Some(observer.clone());

    source.push(s("a"));
    tracker.flush().unwrap();

    assert!(observer.is_destroyed());
    assert_eq!(tracker.computation_count(), 0);
    assert_eq!(source.observer_count(), 0);
    slot.borrow_mut().take();
}

#[test]
fn dropping_the_observer_stops_its_computations() {
    let tracker = Rc::new(Tracker::new());
    let source = LocalCollection::from_docs(&*tracker, strings(&["a"]));
    {
        let cursor_source = source.clone();
        let observer = CollectionObserver::builder(move |_| Ok(cursor_source.cursor()))
            .scheduler(tracker.clone())
            .build()
            .unwrap();
        assert_eq!(observer.len(), 1);
        assert_eq!(tracker.computation_count(), 2);
    }
    assert_eq!(tracker.computation_count(), 0);
    assert_eq!(source.observer_count(), 0);
}

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<String>>,
}

impl EventSink<String> for Recorder {
    fn emit(&self, event: MirrorEvent<'_, String>) -> Result<()> {
        let entry = match event {
            MirrorEvent::Batch(records) => format!("batch:{}", records.len()),
            MirrorEvent::NewSubscription => s("newSubscription"),
        };
        self.events.borrow_mut().push(entry);
        Ok(())
    }
}

#[test]
fn external_sink_receives_events_in_order() {
    let tracker = Rc::new(Tracker::new());
    let source = LocalCollection::from_docs(&*tracker, strings(&["a", "b"]));
    let recorder = Rc::new(Recorder::default());

    let cursor_source = source.clone();
    let observer = CollectionObserver::builder(move |props| {
        // Reading the property makes it an input of the subscription.
        let _ = props.get("generation");
        Ok(cursor_source.cursor())
    })
    .scheduler(tracker.clone())
    .sink(recorder.clone())
    .build()
    .unwrap();

    observer.set("generation", 2i64).unwrap();
    tracker.flush().unwrap();

    assert_eq!(
        *recorder.events.borrow(),
        strings(&["batch:2", "newSubscription", "batch:2", "batch:2", "newSubscription"])
    );
    assert!(observer.on_batch(|_| Ok(())).unwrap_err().is_configuration());
    assert!(!observer.off(1));
}

#[test]
fn off_removes_builtin_listener() {
    let h = harness(&[], &[]);
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let id = h
        .observer
        .on_batch(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();

    h.first.push(s("a"));
    h.tracker.flush().unwrap();
    assert!(h.observer.off(id));
    h.first.push(s("b"));
    h.tracker.flush().unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(h.batches.borrow().len(), 2);
}

#[test]
fn properties_are_shared_with_the_definition() {
    let h = harness(&["a"], &["b"]);
    assert_eq!(h.observer.get("source").unwrap(), Value::Null);
    h.observer.properties().set("source", "second");
    h.tracker.flush().unwrap();
    assert_eq!(h.observer.docs(), strings(&["b"]));
    assert_eq!(h.observer.get("source").unwrap(), Value::from("second"));
}
