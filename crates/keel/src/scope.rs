//! Lexically nested variable environments.
//!
//! Scopes are ordinary heap objects: they are reachable through the active
//! scope stack while code runs in them, and through function closures
//! afterwards, so the collector decides their lifetime.

use indexmap::IndexMap;

use crate::{
    eval::Interpreter,
    exception_private::{ExcType, RunResult},
    heap::{HeapId, ObjectData},
    value::Value,
};

#[derive(Debug)]
pub(crate) struct ScopeData {
    pub vars: IndexMap<String, Value>,
    pub parent: Option<HeapId>,
    /// The class whose body or methods this scope belongs to; governs
    /// private access and `super`.
    pub def_class: Option<HeapId>,
    /// The receiver, when the scope belongs to a method invocation.
    pub self_object: Option<HeapId>,
    /// Set only on root scopes.
    pub module: Option<HeapId>,
}

impl Interpreter {
    pub(crate) fn new_scope(
        &mut self,
        parent: Option<HeapId>,
        def_class: Option<HeapId>,
        self_object: Option<HeapId>,
    ) -> HeapId {
        self.heap.allocate(
            self.builtins.scope,
            ObjectData::Scope(ScopeData {
                vars: IndexMap::new(),
                parent,
                def_class,
                self_object,
                module: None,
            }),
        )
    }

    /// A child scope inheriting the defining class and receiver of `scope`.
    pub(crate) fn new_child_scope(&mut self, scope: HeapId) -> HeapId {
        let parent = self.heap.expect_scope(scope);
        let def_class = parent.def_class;
        let self_object = parent.self_object;
        self.new_scope(Some(scope), def_class, self_object)
    }

    /// A root scope owning `module`, seeded with the visible built-in
    /// classes.
    pub(crate) fn new_root_scope_for_module(&mut self, module: HeapId) -> HeapId {
        let scope = self.new_scope(None, None, None);
        for class_id in self.builtins.scope_visible() {
            let name = self.heap.expect_class(class_id).name.clone();
            self.heap
                .expect_scope_mut(scope)
                .vars
                .insert(name, Value::Ref(class_id));
        }
        self.heap.expect_scope_mut(scope).module = Some(module);
        scope
    }

    pub(crate) fn scope_lookup(&self, scope: HeapId, name: &str) -> Option<Value> {
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            let scope = self.heap.expect_scope(scope_id);
            if let Some(&value) = scope.vars.get(name) {
                return Some(value);
            }
            current = scope.parent;
        }
        None
    }

    pub(crate) fn scope_contains_locally(&self, scope: HeapId, name: &str) -> bool {
        self.heap.expect_scope(scope).vars.contains_key(name)
    }

    /// Declares `name` in `scope` itself; redeclaration is an error.
    pub(crate) fn scope_declare(&mut self, scope: HeapId, name: &str, value: Value) -> RunResult<Value> {
        if self.scope_contains_locally(scope, name) {
            return self.raise(ExcType::NameError, format!("Identifier '{name}' already declared"));
        }
        self.heap.expect_scope_mut(scope).vars.insert(name.to_owned(), value);
        Ok(value)
    }

    /// Updates the nearest binding of `name`; returns false when no scope in
    /// the chain declares it.
    pub(crate) fn scope_assign(&mut self, scope: HeapId, name: &str, value: Value) -> bool {
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            let scope = self.heap.expect_scope_mut(scope_id);
            if let Some(slot) = scope.vars.get_mut(name) {
                *slot = value;
                return true;
            }
            current = scope.parent;
        }
        false
    }

    /// The module owning this scope chain, attached to the root scope.
    pub(crate) fn scope_module(&self, scope: HeapId) -> Option<HeapId> {
        let mut current = scope;
        loop {
            let data = self.heap.expect_scope(current);
            match data.parent {
                Some(parent) => current = parent,
                None => return data.module,
            }
        }
    }
}
