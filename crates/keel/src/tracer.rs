//! Evaluation tracing hooks.
//!
//! All methods default to no-ops, so [`NoopTracer`] costs nothing to carry.
//! [`StderrTracer`] gives a human-readable log of evaluations, module loads,
//! and collection cycles.

use std::path::Path;

/// Observer for interpreter lifecycle events.
pub trait EvalTracer {
    /// A top-level evaluation is starting.
    fn on_eval_start(&mut self) {}

    /// A top-level evaluation finished.
    fn on_eval_end(&mut self) {}

    /// A module is being loaded; `path` is `None` for built-in modules.
    fn on_module_load(&mut self, _name: &str, _path: Option<&Path>) {}

    /// A collection cycle completed.
    fn on_gc(&mut self, _live_before: usize, _freed: usize) {}
}

/// The default tracer: observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {}

/// Logs events to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrTracer;

impl EvalTracer for StderrTracer {
    fn on_eval_start(&mut self) {
        eprintln!("eval: start");
    }

    fn on_eval_end(&mut self) {
        eprintln!("eval: end");
    }

    fn on_module_load(&mut self, name: &str, path: Option<&Path>) {
        match path {
            Some(path) => eprintln!("module: loading '{name}' from {}", path.display()),
            None => eprintln!("module: loading built-in '{name}'"),
        }
    }

    fn on_gc(&mut self, live_before: usize, freed: usize) {
        eprintln!("gc: {live_before} live, {freed} freed");
    }
}
