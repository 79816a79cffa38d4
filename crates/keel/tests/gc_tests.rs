//! Collector behavior observed through `HeapStats`: reachable objects stay,
//! unreachable ones are reclaimed, cycles included.

use keel::{Interpreter, Object};
use pretty_assertions::assert_eq;

/// Live count of a freshly collected interpreter; the built-in classes,
/// methods, and modules that never die.
fn baseline() -> usize {
    let mut interp = Interpreter::new();
    interp.collect_garbage();
    interp.heap_stats().live_objects
}

#[test]
fn collection_is_idempotent_on_a_fresh_interpreter() {
    let mut interp = Interpreter::new();
    interp.collect_garbage();
    let first = interp.heap_stats().live_objects;
    let freed = interp.collect_garbage();
    assert_eq!(freed, 0);
    assert_eq!(interp.heap_stats().live_objects, first);
}

#[test]
fn unreachable_objects_are_reclaimed() {
    let base = baseline();
    let mut interp = Interpreter::new();
    interp
        .eval_string("{ var s = Structure(); s.self = s; var f = fun() { s }; null }")
        .unwrap();
    // Everything the program allocated is dead; only the "main" module of
    // this evaluation survives.
    assert_eq!(interp.heap_stats().live_objects, base + 1);
    assert_eq!(interp.heap_stats().objects_by_kind.get("Structure"), None);
    assert_eq!(interp.heap_stats().objects_by_kind.get("Scope"), None);
}

#[test]
fn cyclic_scope_and_closure_graphs_are_reclaimed() {
    let base = baseline();
    let mut interp = Interpreter::new();
    // The closure captures the scope that holds the closure: a cycle.
    interp.eval_string("{ var f = fun() { f }; null }").unwrap();
    assert_eq!(interp.heap_stats().live_objects, base + 1);
}

#[test]
fn reachable_objects_survive_collection() {
    let mut interp = Interpreter::new();
    let scope = interp.new_root_scope("session");
    interp
        .eval_string_in("var box = Structure(); box.value = 11", &scope)
        .unwrap();
    for _ in 0..3 {
        interp.collect_garbage();
    }
    assert_eq!(interp.eval_string_in("box.value", &scope).unwrap(), Object::Int(11));
}

#[test]
fn exceptions_are_reclaimed_once_handled() {
    let base = baseline();
    let mut interp = Interpreter::new();
    interp
        .eval_string("try { 1 / 0 } except ZeroDivisionError { 0 }")
        .unwrap();
    let stats = interp.heap_stats();
    assert_eq!(stats.live_objects, base + 1);
    assert_eq!(stats.objects_by_kind.get("Exception"), None);
}

#[test]
fn repeated_evaluations_reuse_freed_slots() {
    let mut interp = Interpreter::new();
    for _ in 0..5 {
        interp.eval_string("{ var s = Structure(); s.a = \"text\"; null }").unwrap();
    }
    let after_warmup = interp.heap_stats().total_slots;
    for _ in 0..20 {
        interp.eval_string("{ var s = Structure(); s.a = \"text\"; null }").unwrap();
    }
    let stats = interp.heap_stats();
    // Each round only pins its "main" module; cells cycle through the free
    // list instead of growing the arena without bound.
    assert!(
        stats.total_slots <= after_warmup + 25,
        "arena grew from {after_warmup} to {}",
        stats.total_slots
    );
    assert_eq!(stats.live_objects + stats.free_slots, stats.total_slots);
}

#[test]
fn uncaught_exceptions_survive_the_final_collection() {
    let mut interp = Interpreter::new();
    let err = interp.eval_string("nope").unwrap_err();
    assert_eq!(err.kind(), "NameError");
    assert_eq!(err.message(), "Use of undeclared identifier 'nope'");
}

#[test]
fn module_exports_stay_alive() {
    let base = baseline();
    let mut interp = Interpreter::new();
    interp.eval_string("export keep = Structure()").unwrap();
    // The main module and its exported structure both survive.
    assert_eq!(interp.heap_stats().live_objects, base + 2);
    assert_eq!(interp.heap_stats().objects_by_kind.get("Structure"), Some(&1));
}
