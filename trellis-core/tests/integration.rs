//! Integration Tests for Reactive System
//!
//! These tests verify that reactive objects, refs, computed values, and
//! effects work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::reactive::{
    computed, effect, effect_with, reactive, stop, untracked, EffectOptions, ReactiveContext, Ref,
    Runtime,
};
use trellis_core::value::{Object, Value};

fn int(value: Value) -> i64 {
    value.as_int().unwrap_or_default()
}

/// Test that a computed value tracks reactive object dependencies.
#[test]
fn computed_tracks_reactive_dependency() {
    let state = reactive(&Object::new().with("count", 10));

    let s = state.clone();
    let doubled = computed(move || int(s.get("count")) * 2);

    assert_eq!(doubled.get(), 20);

    state.set("count", 5);
    assert_eq!(doubled.get(), 10);
}

/// Test that an effect re-runs once per committed write.
#[test]
fn effect_runs_once_per_write() {
    let state = reactive(&Object::new().with("count", 0));
    let observed = Rc::new(RefCell::new(Vec::new()));

    let (s, o) = (state.clone(), observed.clone());
    let _runner = effect(move || o.borrow_mut().push(int(s.get("count"))));

    state.set("count", 1);
    state.set("count", 2);
    state.set("count", 2);

    assert_eq!(*observed.borrow(), vec![0, 1, 2]);
}

/// Test that computed values cache expensive work.
#[test]
fn computed_caches_expensive_computation() {
    let compute_count = Rc::new(Cell::new(0));
    let source = Ref::new(1);

    let (c, s) = (compute_count.clone(), source.clone());
    let expensive = computed(move || {
        c.set(c.get() + 1);
        int(s.get()) * 100
    });

    assert_eq!(compute_count.get(), 0);
    assert_eq!(expensive.get(), 100);
    assert_eq!(expensive.get(), 100);
    assert_eq!(expensive.get(), 100);
    assert_eq!(compute_count.get(), 1);

    source.set(2);
    assert_eq!(compute_count.get(), 1);
    assert_eq!(expensive.get(), 200);
    assert_eq!(compute_count.get(), 2);
}

/// Test that computed values can depend on other computed values.
#[test]
fn computed_depends_on_computed() {
    let base = Ref::new(5);

    let b = base.clone();
    let doubled = computed(move || int(b.get()) * 2);
    let d = doubled.clone();
    let plus_ten = computed(move || d.get() + 10);

    let seen = Rc::new(Cell::new(0));
    let (p, s) = (plus_ten.clone(), seen.clone());
    let _runner = effect(move || s.set(p.get()));
    assert_eq!(seen.get(), 20);

    base.set(10);
    assert_eq!(seen.get(), 30);
}

/// Test that a stopped effect no longer reacts, but still runs by hand.
#[test]
fn stopped_effect_does_not_run() {
    let state = reactive(&Object::new().with("prop", 1));
    let dummy = Rc::new(Cell::new(0));

    let (s, d) = (state.clone(), dummy.clone());
    let runner = effect(move || d.set(int(s.get("prop"))));

    state.set("prop", 2);
    assert_eq!(dummy.get(), 2);

    stop(&runner);
    state.set("prop", 3);
    assert_eq!(dummy.get(), 2);

    runner.run();
    assert_eq!(dummy.get(), 3);

    // Manual runs after stop do not re-subscribe.
    state.set("prop", 4);
    assert_eq!(dummy.get(), 3);
}

/// Test that a scheduler replaces the direct re-run.
#[test]
fn scheduler_is_called_instead_of_run() {
    let state = reactive(&Object::new().with("foo", 1));
    let dummy = Rc::new(Cell::new(0));
    let scheduled = Rc::new(Cell::new(0));

    let (s, d) = (state.clone(), dummy.clone());
    let sc = scheduled.clone();
    let runner = effect_with(
        move || d.set(int(s.get("foo"))),
        EffectOptions::new().scheduler(move || sc.set(sc.get() + 1)),
    );

    assert_eq!(scheduled.get(), 0);
    assert_eq!(dummy.get(), 1);

    state.set("foo", 2);
    assert_eq!(scheduled.get(), 1);
    assert_eq!(dummy.get(), 1);

    runner.run();
    assert_eq!(dummy.get(), 2);
}

/// Test that nested effects restore the outer tracking context.
#[test]
fn nested_reactive_contexts() {
    let state = reactive(&Object::new().with("outer", 0).with("inner", 0));
    let outer_runs = Rc::new(Cell::new(0));
    let inner_runs = Rc::new(Cell::new(0));

    let s = state.clone();
    let (o, i) = (outer_runs.clone(), inner_runs.clone());
    let _outer = effect(move || {
        o.set(o.get() + 1);

        let s2 = s.clone();
        let i2 = i.clone();
        let inner = effect(move || {
            i2.set(i2.get() + 1);
            s2.get("inner");
        });
        stop(&inner);

        // Still tracked by the outer effect after the inner one finished.
        s.get("outer");
    });

    assert_eq!(outer_runs.get(), 1);
    assert_eq!(inner_runs.get(), 1);
    assert!(!ReactiveContext::is_active());

    state.set("outer", 1);
    assert_eq!(outer_runs.get(), 2);

    state.set("inner", 1);
    assert_eq!(outer_runs.get(), 2);
}

/// Test that untracked reads inside an effect do not subscribe it.
#[test]
fn untracked_reads_are_free() {
    let state = reactive(&Object::new().with("a", 1).with("b", 1));
    let runs = Rc::new(Cell::new(0));

    let (s, r) = (state.clone(), runs.clone());
    let _runner = effect(move || {
        r.set(r.get() + 1);
        s.get("a");
        untracked(|| s.get("b"));
    });

    state.set("b", 2);
    assert_eq!(runs.get(), 1);

    state.set("a", 2);
    assert_eq!(runs.get(), 2);
}

/// Test the complete chain: reactive object -> runtime -> effect.
///
/// This test verifies that:
/// 1. Reads inside an effect register in the Target Map
/// 2. Writes outside any effect create nothing
/// 3. Dropping the observed object prunes its Target Map entry
#[test]
fn full_reactive_chain_with_runtime() {
    let raw = Object::new().with("value", 1);
    let id = raw.id();

    Runtime::track(id, "value");
    assert!(!Runtime::is_tracked(id));

    let state = reactive(&raw);
    let seen = Rc::new(Cell::new(0));
    let (s, v) = (state.clone(), seen.clone());
    let runner = effect(move || v.set(int(s.get("value"))));

    assert!(Runtime::is_tracked(id));
    assert_eq!(Runtime::dep_for(id, "value").map(|dep| dep.len()), Some(1));

    state.set("value", 7);
    assert_eq!(seen.get(), 7);

    stop(&runner);
    assert_eq!(Runtime::dep_for(id, "value").map(|dep| dep.len()), Some(0));

    drop(runner);
    drop(state);
    drop(raw);
    assert!(!Runtime::is_tracked(id));
}
