//! The collection coordinator: stop-the-world mark-sweep.
//!
//! Roots are precise: the built-in class table, the module registry, the
//! active scope stack, retained root scopes, and whatever in-flight result
//! the caller passes in. Marking is driven by an explicit worklist so deep
//! object graphs cannot overflow the host stack.

use crate::{eval::Interpreter, heap::HeapId, value::Value};

impl Interpreter {
    /// Runs a full collection cycle and returns the number of cells freed.
    pub fn collect_garbage(&mut self) -> usize {
        self.collect(&[])
    }

    /// Unmark, mark from the root set plus `extra_roots`, sweep.
    ///
    /// Only called at safe points, where every live value is reachable from
    /// the roots. No allocation happens between mark and sweep.
    pub(crate) fn collect(&mut self, extra_roots: &[Value]) -> usize {
        let live_before = self.heap.live_count();
        self.heap.unmark_all();

        let mut pending: Vec<HeapId> = Vec::new();
        pending.extend(self.builtins.all());
        pending.extend(self.modules.iter().copied());
        pending.extend(self.scope_stack.iter().copied());
        pending.extend(self.retained_scopes.iter().copied());
        pending.extend(extra_roots.iter().filter_map(|value| value.as_object()));

        while let Some(id) = pending.pop() {
            if !self.heap.mark(id) {
                continue;
            }
            let cell = self.heap.get(id);
            pending.push(cell.header.class);
            // Half-built objects are kept alive but never traversed.
            if cell.header.initialized {
                cell.data.for_each_ref(&mut |reference| pending.push(reference));
            }
        }

        let freed = self.heap.sweep_unmarked();
        self.heap.gc_completed();
        self.tracer.on_gc(live_before, freed);
        freed
    }
}
