//! The tree-walking evaluator and the interpreter context it runs in.
//!
//! Every evaluator entry point threads the single [`Interpreter`] value,
//! which owns the heap, the built-in class table, the module registry, and
//! the active scope stack — together, the collector's root set.

use std::path::Path;

use smallvec::SmallVec;

use crate::{
    ast::{ClassNode, ExceptClause, FunctionNode, Node},
    builtins::{self, Builtins},
    class::{Callable, ClassData, MethodData, MethodFlags, NativeKind},
    exception_private::{ExcType, RunResult},
    exception_public::Exception,
    function::{FunctionData, FunctionKind},
    heap::{Heap, HeapId, HeapStats, ObjectData},
    modules::register_builtin_modules,
    object::Object,
    parse::parse,
    tracer::{EvalTracer, NoopTracer},
    value::Value,
};

/// Hard cap on positional arguments per call.
pub(crate) const MAX_CALL_ARGS: usize = 32;

/// Guards against runaway recursion in scripted code before the host stack
/// overflows.
const MAX_CALL_DEPTH: u32 = 200;

type ArgBuffer = SmallVec<[Value; 8]>;

/// Handle to a root scope created through the public API. The interpreter
/// keeps the scope alive until it is dropped together with the interpreter.
#[derive(Debug, Clone, Copy)]
pub struct ScopeHandle(pub(crate) HeapId);

/// The interpreter: heap, built-ins, module registry, and evaluator state.
pub struct Interpreter {
    pub(crate) heap: Heap,
    pub(crate) builtins: Builtins,
    /// Global module registry: built-in modules and every loaded file module.
    pub(crate) modules: Vec<HeapId>,
    /// Scopes currently being evaluated, a GC root set.
    pub(crate) scope_stack: Vec<HeapId>,
    /// Root scopes handed out through [`ScopeHandle`]s.
    pub(crate) retained_scopes: Vec<HeapId>,
    /// Evaluator recursion depth; collections only run when it is zero.
    eval_depth: u32,
    call_depth: u32,
    pub(crate) tracer: Box<dyn EvalTracer>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates an interpreter with the built-in classes and modules
    /// registered.
    #[must_use]
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let builtins = builtins::install(&mut heap);
        let mut interp = Self {
            heap,
            builtins,
            modules: Vec::new(),
            scope_stack: Vec::new(),
            retained_scopes: Vec::new(),
            eval_depth: 0,
            call_depth: 0,
            tracer: Box::new(NoopTracer),
        };
        register_builtin_modules(&mut interp);
        interp
    }

    /// Replaces the tracer observing evaluation and collection events.
    pub fn set_tracer(&mut self, tracer: Box<dyn EvalTracer>) {
        self.tracer = tracer;
    }

    /// Parses and evaluates a source string under a fresh root scope tied to
    /// a new "main" module.
    pub fn eval_string(&mut self, source: &str) -> Result<Object, Exception> {
        let rv = self.eval_source(source, None);
        self.finish(rv)
    }

    /// Parses and evaluates a source string in an existing root scope.
    pub fn eval_string_in(&mut self, source: &str, scope: &ScopeHandle) -> Result<Object, Exception> {
        let rv = self.eval_source(source, Some(scope.0));
        self.finish(rv)
    }

    /// Reads and evaluates a source file.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<Object, Exception> {
        let rv = self.eval_file_inner(path.as_ref(), None);
        self.finish(rv)
    }

    /// Reads and evaluates a source file in an existing root scope.
    pub fn eval_file_in(&mut self, path: impl AsRef<Path>, scope: &ScopeHandle) -> Result<Object, Exception> {
        let rv = self.eval_file_inner(path.as_ref(), Some(scope.0));
        self.finish(rv)
    }

    /// Loads a file as a module (the import subroutine); the result is the
    /// module object.
    pub fn eval_module_file(&mut self, path: impl AsRef<Path>) -> Result<Object, Exception> {
        let rv = self.eval_module_file_inner(path.as_ref());
        self.finish(rv)
    }

    /// Creates a persistent root scope owning a fresh module, for incremental
    /// evaluation with [`Self::eval_string_in`].
    pub fn new_root_scope(&mut self, module_name: &str) -> ScopeHandle {
        let module = self.new_module(module_name, false, None);
        let scope = self.new_root_scope_for_module(module);
        self.retained_scopes.push(scope);
        ScopeHandle(scope)
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Converts an internal result into the public one, running a collection
    /// first with the in-flight result as an extra root.
    fn finish(&mut self, rv: RunResult<Value>) -> Result<Object, Exception> {
        let extra = match &rv {
            Ok(value) => *value,
            Err(err) => Value::Ref(err.exception),
        };
        if self.eval_depth == 0 {
            self.collect(&[extra]);
        }
        match rv {
            Ok(value) => Ok(self.render_value(value)),
            Err(err) => Err(self.render_exception(err.exception)),
        }
    }

    fn render_value(&self, value: Value) -> Object {
        match value {
            Value::Null => Object::Null,
            Value::Bool(v) => Object::Bool(v),
            Value::Int(v) => Object::Int(v),
            Value::Float(v) => Object::Float(v),
            Value::Ref(id) => match self.heap.data(id) {
                ObjectData::Str(text) => Object::Str(text.clone()),
                _ => Object::Instance {
                    class: self.class_name_of(value),
                },
            },
        }
    }

    fn render_exception(&self, exception: HeapId) -> Exception {
        let kind = self.class_name_of(Value::Ref(exception));
        let message = match self.heap.data(exception) {
            ObjectData::Exception(data) => data.message.clone(),
            _ => String::new(),
        };
        Exception::new(kind, message)
    }

    pub(crate) fn new_string(&mut self, text: impl Into<String>) -> Value {
        Value::Ref(self.heap.allocate(self.builtins.string, ObjectData::Str(text.into())))
    }

    pub(crate) fn trace_module_load(&mut self, name: &str, path: Option<&Path>) {
        self.tracer.on_module_load(name, path);
    }

    fn eval_file_inner(&mut self, path: &Path, scope: Option<HeapId>) -> RunResult<Value> {
        let file = match self.load_program_file(path) {
            Ok(file) => file,
            Err(err) => {
                let message = format!("Cannot read file '{}': {err}", path.display());
                return self.raise(ExcType::Exception, message);
            }
        };
        let source = self.heap.expect_program_file(file).source.clone();
        let scope = match scope {
            Some(scope) => scope,
            None => {
                let module = self.new_module("main", false, Some(file));
                self.new_root_scope_for_module(module)
            }
        };
        self.eval_source(&source, Some(scope))
    }

    /// Parses and evaluates source. Without a scope, a fresh root scope over
    /// a new "main" module is used.
    pub(crate) fn eval_source(&mut self, source: &str, scope: Option<HeapId>) -> RunResult<Value> {
        let nodes = match parse(source) {
            Ok(nodes) => nodes,
            Err(err) => return self.raise(ExcType::SyntaxError, err.to_string()),
        };
        let scope = match scope {
            Some(scope) => scope,
            None => {
                let module = self.new_module("main", false, None);
                self.new_root_scope_for_module(module)
            }
        };
        self.tracer.on_eval_start();
        let rv = self.eval_program(&nodes, scope);
        self.tracer.on_eval_end();
        rv
    }

    /// Evaluates top-level statements in `scope`, with collection
    /// checkpoints between statements when this is the outermost evaluation.
    fn eval_program(&mut self, nodes: &[Node], scope: HeapId) -> RunResult<Value> {
        self.scope_stack.push(scope);
        let mut result = Ok(Value::Null);
        for node in nodes {
            result = self.eval_node(node, scope);
            match &result {
                Err(_) => break,
                Ok(value) => {
                    if self.eval_depth == 0 && self.heap.should_collect() {
                        let root = *value;
                        self.collect(&[root]);
                    }
                }
            }
        }
        self.scope_stack.pop();
        result
    }

    pub(crate) fn eval_node(&mut self, node: &Node, scope: HeapId) -> RunResult<Value> {
        self.eval_depth += 1;
        let rv = self.eval_node_inner(node, scope);
        self.eval_depth -= 1;
        rv
    }

    fn eval_node_inner(&mut self, node: &Node, scope: HeapId) -> RunResult<Value> {
        match node {
            Node::Null => Ok(Value::Null),
            Node::Bool(v) => Ok(Value::Bool(*v)),
            Node::Int(v) => Ok(Value::Int(*v)),
            Node::Float(v) => Ok(Value::Float(*v)),
            Node::Str(text) => Ok(self.new_string(text.clone())),
            Node::Identifier(name) => match self.scope_lookup(scope, name) {
                Some(value) => Ok(value),
                None => self.undeclared(name),
            },
            Node::Sequence(items) => self.eval_sequence(items, scope),
            Node::Var { name, init } => {
                let value = match init {
                    Some(expr) => self.eval_node(expr, scope)?,
                    None => Value::Null,
                };
                self.scope_declare(scope, name, value)
            }
            Node::Assign { target, value } => self.eval_assignment(target, value, scope),
            Node::Member { object, name } => self.eval_member(object, name, scope),
            Node::SelfExpr => match self.heap.expect_scope(scope).self_object {
                Some(id) => Ok(Value::Ref(id)),
                None => self.raise(ExcType::Exception, "'@' used outside of a class"),
            },
            Node::Super => self.raise(ExcType::Exception, "'super' is only valid in a call or member access"),
            Node::Superclass => self.eval_superclass(scope),
            Node::Function(node) => Ok(self.new_closure(node, scope)),
            Node::Call { callee, args } => self.eval_call(callee, args, scope),
            Node::Unary { op, operand } => {
                let value = self.eval_node(operand, scope)?;
                self.unary_operation(*op, value)
            }
            Node::Binary { left, op, right } => {
                let left = self.eval_node(left, scope)?;
                let right = self.eval_node(right, scope)?;
                self.binary_operation(left, *op, right)
            }
            Node::Class(node) => self.eval_class(node, scope),
            Node::If { branches, else_body } => self.eval_if(branches, else_body.as_deref(), scope),
            Node::Try {
                body,
                excepts,
                else_body,
                finally,
            } => self.eval_try(body, excepts, else_body.as_deref(), finally.as_deref(), scope),
            Node::Import { level, name } => self.eval_import(*level, name, scope),
            Node::Export { name, value } => self.eval_export(name, value.as_deref(), scope),
        }
    }

    fn undeclared<T>(&mut self, name: &str) -> RunResult<T> {
        self.raise(ExcType::NameError, format!("Use of undeclared identifier '{name}'"))
    }

    fn eval_sequence(&mut self, items: &[Node], scope: HeapId) -> RunResult<Value> {
        let inner = self.new_child_scope(scope);
        self.scope_stack.push(inner);
        let mut rv = Ok(Value::Null);
        for node in items {
            rv = self.eval_node(node, inner);
            if rv.is_err() {
                break;
            }
        }
        self.scope_stack.pop();
        rv
    }

    fn eval_assignment(&mut self, target: &Node, value: &Node, scope: HeapId) -> RunResult<Value> {
        let value = self.eval_node(value, scope)?;
        match target {
            Node::Identifier(name) => {
                if self.scope_assign(scope, name, value) {
                    Ok(value)
                } else {
                    self.undeclared(name)
                }
            }
            Node::Member { object, name } => self.assign_member(object, name, value, scope),
            _ => self.raise(ExcType::Exception, "Not assignable expression"),
        }
    }

    /// The defining class when `scope` has private access to the object:
    /// the scope's `self` must be exactly that object.
    fn private_access_class(&self, scope: HeapId, object: HeapId) -> Option<HeapId> {
        let scope_data = self.heap.expect_scope(scope);
        if scope_data.self_object == Some(object) {
            scope_data.def_class
        } else {
            None
        }
    }

    fn immutable_object<T>(&mut self, value: Value) -> RunResult<T> {
        let class_name = self.class_name_of(value);
        self.raise(ExcType::TypeError, format!("'{class_name}' objects are immutables"))
    }

    fn assign_member(&mut self, object_node: &Node, name: &str, value: Value, scope: HeapId) -> RunResult<Value> {
        if matches!(object_node, Node::Super) {
            let (_, self_object, superclass) = self.super_context(scope)?;
            return self.class_set_attribute(superclass, self_object, name, value, true);
        }
        let receiver = self.eval_node(object_node, scope)?;
        let Some(id) = receiver.as_object() else {
            return self.immutable_object(receiver);
        };
        let class = self.heap.class_of(id);
        match self.heap.expect_class(class).native {
            Some(NativeKind::Structure) => {
                self.heap.expect_structure_mut(id).fields.insert(name.to_owned(), value);
                Ok(value)
            }
            Some(_) => self.immutable_object(receiver),
            None => match self.private_access_class(scope, id) {
                Some(def_class) => self.class_set_attribute(def_class, id, name, value, true),
                None => self.class_set_attribute(class, id, name, value, false),
            },
        }
    }

    fn eval_member(&mut self, object_node: &Node, name: &str, scope: HeapId) -> RunResult<Value> {
        if matches!(object_node, Node::Super) {
            let (_, self_object, superclass) = self.super_context(scope)?;
            return self.class_get_attribute(superclass, self_object, name, true);
        }
        let receiver = self.eval_node(object_node, scope)?;
        let Some(id) = receiver.as_object() else {
            return self.native_member(receiver, name);
        };
        let class = self.heap.class_of(id);
        if self.heap.expect_class(class).native.is_some() {
            return self.native_member(receiver, name);
        }
        match self.private_access_class(scope, id) {
            Some(def_class) => self.class_get_attribute(def_class, id, name, true),
            None => self.class_get_attribute(class, id, name, false),
        }
    }

    fn eval_superclass(&mut self, scope: HeapId) -> RunResult<Value> {
        let Some(self_object) = self.heap.expect_scope(scope).self_object else {
            return self.raise(ExcType::Exception, "'superclass' used outside of a class");
        };
        let class = self.heap.class_of(self_object);
        match self.heap.expect_class(class).superclass {
            Some(superclass) => Ok(Value::Ref(superclass)),
            None => Ok(Value::Null),
        }
    }

    /// The defining class, receiver, and superclass needed by `super`
    /// expressions.
    fn super_context(&mut self, scope: HeapId) -> RunResult<(HeapId, HeapId, HeapId)> {
        let scope_data = self.heap.expect_scope(scope);
        let (def_class, self_object) = (scope_data.def_class, scope_data.self_object);
        let (Some(def_class), Some(self_object)) = (def_class, self_object) else {
            return self.raise(ExcType::Exception, "'super' used outside of a class");
        };
        let Some(superclass) = self.heap.expect_class(def_class).superclass else {
            return self.raise(ExcType::Exception, "No superclass");
        };
        Ok((def_class, self_object, superclass))
    }

    fn new_closure(&mut self, node: &std::rc::Rc<FunctionNode>, scope: HeapId) -> Value {
        let function = self.heap.allocate(
            self.builtins.function,
            ObjectData::Function(FunctionData {
                name: node.name.clone(),
                kind: FunctionKind::Scripted {
                    node: node.clone(),
                    scope,
                },
            }),
        );
        Value::Ref(function)
    }

    fn eval_args(&mut self, args: &[Node], scope: HeapId) -> RunResult<ArgBuffer> {
        if args.len() > MAX_CALL_ARGS {
            return self.raise(ExcType::ParameterError, "Too many parameters");
        }
        let mut values = ArgBuffer::new();
        for node in args {
            values.push(self.eval_node(node, scope)?);
        }
        Ok(values)
    }

    fn eval_call(&mut self, callee: &Node, args: &[Node], scope: HeapId) -> RunResult<Value> {
        if matches!(callee, Node::Super) {
            return self.eval_super_call(args, scope);
        }
        let callee = self.eval_node(callee, scope)?;
        let args = self.eval_args(args, scope)?;
        self.call_value(callee, &args)
    }

    fn not_callable<T>(&mut self, value: Value) -> RunResult<T> {
        let class_name = self.class_name_of(value);
        self.raise(ExcType::TypeError, format!("'{class_name}' objects are not callable"))
    }

    /// Call dispatch: classes construct, bound methods invoke with their
    /// receiver, functions invoke with a fresh scope at their captured one.
    pub(crate) fn call_value(&mut self, callee: Value, args: &[Value]) -> RunResult<Value> {
        let Some(id) = callee.as_object() else {
            return self.not_callable(callee);
        };
        match self.heap.data(id) {
            ObjectData::Function(_) => self.invoke_function(id, None, None, args),
            ObjectData::InstanceMethod(bound) => {
                let (method, receiver) = (bound.method, bound.receiver);
                self.call_method(method, receiver, args)
            }
            ObjectData::Class(_) => self.call_class(id, args),
            _ => self.not_callable(callee),
        }
    }

    /// `super(args)`: calls the superclass constructor on the current
    /// receiver; the result is the receiver itself.
    fn eval_super_call(&mut self, args: &[Node], scope: HeapId) -> RunResult<Value> {
        let (_, self_object, superclass) = self.super_context(scope)?;
        let args = self.eval_args(args, scope)?;
        let Some(constructor) = self.heap.expect_class(superclass).constructor else {
            return self.raise(ExcType::TypeError, "The constructor of this class is private");
        };
        self.call_method(constructor, Value::Ref(self_object), &args)?;
        Ok(Value::Ref(self_object))
    }

    /// Invokes a function closure: a fresh scope parented at the captured
    /// scope, parameters bound left to right, body evaluated in place.
    pub(crate) fn invoke_function(
        &mut self,
        function: HeapId,
        def_class: Option<HeapId>,
        self_object: Option<HeapId>,
        args: &[Value],
    ) -> RunResult<Value> {
        let func = self.heap.expect_function(function).clone();
        match func.kind {
            FunctionKind::Native { arity, f } => {
                if args.len() != arity as usize {
                    let message = arity_error(func.name.as_deref());
                    return self.raise(ExcType::ParameterError, message);
                }
                f(self, args)
            }
            FunctionKind::Scripted { node, scope: captured } => {
                if args.len() != node.params.len() {
                    let message = arity_error(func.name.as_deref());
                    return self.raise(ExcType::ParameterError, message);
                }
                if self.call_depth >= MAX_CALL_DEPTH {
                    return self.raise(ExcType::Exception, "Maximum call depth exceeded");
                }
                let scope = self.new_scope(Some(captured), def_class, self_object);
                self.scope_stack.push(scope);
                self.call_depth += 1;
                let mut rv = Ok(Value::Null);
                for (param, &arg) in node.params.iter().zip(args) {
                    rv = self.scope_declare(scope, param, arg);
                    if rv.is_err() {
                        break;
                    }
                }
                if rv.is_ok() {
                    rv = Ok(Value::Null);
                    for stmt in &node.body {
                        rv = self.eval_node(stmt, scope);
                        if rv.is_err() {
                            break;
                        }
                    }
                }
                self.call_depth -= 1;
                self.scope_stack.pop();
                rv
            }
        }
    }

    fn eval_class(&mut self, node: &ClassNode, scope: HeapId) -> RunResult<Value> {
        let superclass = match &node.superclass {
            Some(expr) => {
                let value = self.eval_node(expr, scope)?;
                match value.as_object() {
                    Some(id) if matches!(self.heap.data(id), ObjectData::Class(_)) => id,
                    _ => return self.raise(ExcType::ParameterError, "Invalid superclass"),
                }
            }
            None => self.builtins.object,
        };
        if self.heap.expect_class(superclass).is_final {
            return self.raise(ExcType::ParameterError, "Cannot extend a final class");
        }
        let class = self.heap.allocate(
            self.builtins.class_class,
            ObjectData::Class(ClassData {
                name: node.name.clone(),
                superclass: Some(superclass),
                is_final: false,
                native: None,
                constructor: None,
                methods: ahash::AHashMap::new(),
                setters: ahash::AHashMap::new(),
            }),
        );

        // Members are evaluated in a scope of their own so method closures
        // carry the defining class.
        let body_scope = self.new_scope(Some(scope), Some(class), None);
        self.scope_stack.push(body_scope);
        for member in &node.members {
            let callable = match &member.function {
                Some(function_node) => {
                    let closure = self.new_closure(function_node, body_scope);
                    Callable::Scripted(closure.as_object().expect("closures are objects"))
                }
                None if member.getter => Callable::FieldGet,
                None => Callable::FieldSet,
            };
            let flags = MethodFlags {
                public: !member.private,
                init: member.init,
                get: member.getter,
                set: member.setter,
                value_self: false,
            };
            let method = self.new_method(MethodData {
                name: member.name.clone(),
                flags,
                def_class: class,
                callable,
            });
            let class_data = self.heap.expect_class_mut(class);
            if flags.init {
                class_data.constructor = Some(method);
            } else if flags.set {
                class_data.setters.insert(member.name.clone(), method);
            } else {
                class_data.methods.insert(member.name.clone(), method);
            }
        }
        self.scope_stack.pop();

        if self.heap.expect_class(class).constructor.is_none() {
            let constructor = self.new_method(MethodData {
                name: "init".to_owned(),
                flags: MethodFlags {
                    public: true,
                    init: true,
                    get: false,
                    set: false,
                    value_self: false,
                },
                def_class: class,
                callable: Callable::Native {
                    arity: 0,
                    f: builtins::default_construct,
                },
            });
            self.heap.expect_class_mut(class).constructor = Some(constructor);
        }

        self.scope_declare(scope, &node.name, Value::Ref(class))
    }

    fn eval_if(&mut self, branches: &[(Node, Node)], else_body: Option<&Node>, scope: HeapId) -> RunResult<Value> {
        for (test, body) in branches {
            let value = self.eval_node(test, scope)?;
            let Value::Bool(test_passed) = value else {
                return self.raise(ExcType::TypeError, "Expected a Boolean");
            };
            if test_passed {
                return self.eval_node(body, scope);
            }
        }
        match else_body {
            Some(body) => self.eval_node(body, scope),
            None => Ok(Value::Null),
        }
    }

    /// `try`: the finally clause runs exactly once on every path, and a
    /// finally exception overrides the prior result.
    fn eval_try(
        &mut self,
        body: &Node,
        excepts: &[ExceptClause],
        else_body: Option<&Node>,
        finally: Option<&Node>,
        scope: HeapId,
    ) -> RunResult<Value> {
        let rv = self.eval_try_inner(body, excepts, else_body, scope);
        if let Some(finally) = finally {
            let frv = self.eval_node(finally, scope);
            if let Err(err) = frv {
                return Err(err);
            }
        }
        rv
    }

    fn eval_try_inner(
        &mut self,
        body: &Node,
        excepts: &[ExceptClause],
        else_body: Option<&Node>,
        scope: HeapId,
    ) -> RunResult<Value> {
        let err = match self.eval_node(body, scope) {
            Ok(value) => {
                return match else_body {
                    Some(body) => self.eval_node(body, scope),
                    None => Ok(value),
                };
            }
            Err(err) => err,
        };
        for clause in excepts {
            if self.except_matches(clause, err.exception, scope)? {
                return self.run_except_handler(clause, err.exception, scope);
            }
        }
        Err(err)
    }

    /// An empty class list matches every exception; each listed expression
    /// must evaluate to `Exception` or one of its subclasses.
    fn except_matches(&mut self, clause: &ExceptClause, exception: HeapId, scope: HeapId) -> RunResult<bool> {
        if clause.classes.is_empty() {
            return Ok(true);
        }
        let exception_base = self.builtins.exception(ExcType::Exception);
        for class_expr in &clause.classes {
            let value = self.eval_node(class_expr, scope)?;
            let class = match value.as_object() {
                Some(id) if matches!(self.heap.data(id), ObjectData::Class(_)) => id,
                _ => return self.raise(ExcType::TypeError, "Not an Exception"),
            };
            if class != exception_base && !self.is_superclass_of(exception_base, class) {
                return self.raise(ExcType::TypeError, "Not an Exception");
            }
            if self.is_a(self.heap.class_of(exception), class) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn run_except_handler(&mut self, clause: &ExceptClause, exception: HeapId, scope: HeapId) -> RunResult<Value> {
        let inner = self.new_child_scope(scope);
        self.scope_stack.push(inner);
        let mut rv = Ok(Value::Null);
        if let Some(variable) = &clause.variable {
            rv = self.scope_declare(inner, variable, Value::Ref(exception));
        }
        if rv.is_ok() {
            rv = self.eval_node(&clause.body, inner);
        }
        self.scope_stack.pop();
        rv
    }

    fn eval_export(&mut self, name: &str, value: Option<&Node>, scope: HeapId) -> RunResult<Value> {
        let value = match value {
            Some(expr) => {
                let value = self.eval_node(expr, scope)?;
                self.scope_declare(scope, name, value)?;
                value
            }
            None => match self.scope_lookup(scope, name) {
                Some(value) => value,
                None => return self.undeclared(name),
            },
        };
        if let Some(module) = self.scope_module(scope) {
            self.module_add_export(module, name, value);
        }
        Ok(value)
    }
}

fn arity_error(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("Invalid number of parameters for '{name}'"),
        None => "Invalid number of parameters".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn each_string_evaluation_gets_its_own_main_module() {
        let mut interp = Interpreter::new();
        interp.eval_string("1").unwrap();
        interp.eval_string("2").unwrap();
        let mains = interp
            .modules
            .iter()
            .filter(|&&module| interp.heap.expect_module(module).name == "main")
            .count();
        assert_eq!(mains, 2);
    }

    #[test]
    fn math_is_registered_as_a_builtin_module() {
        let interp = Interpreter::new();
        let module = interp.builtin_module("math").unwrap();
        assert!(interp.heap.expect_module(module).builtin);
    }

    #[test]
    fn scope_stack_is_balanced_after_success_and_failure() {
        let mut interp = Interpreter::new();
        interp.eval_string("{ { 1 + 1 } }").unwrap();
        assert!(interp.scope_stack.is_empty());
        interp.eval_string("{ { 1 / 0 } }").unwrap_err();
        assert!(interp.scope_stack.is_empty());
        interp
            .eval_string("var f = fun() { 1 / 0 }; try { f() } finally { 0 }")
            .unwrap_err();
        assert!(interp.scope_stack.is_empty());
    }

    #[test]
    fn call_depth_resets_after_a_recursion_error() {
        let mut interp = Interpreter::new();
        let err = interp.eval_string("fun r() { r() }; r()").unwrap_err();
        assert_eq!(err.message(), "Maximum call depth exceeded");
        assert_eq!(interp.eval_string("1 + 1").unwrap(), Object::Int(2));
    }

    #[test]
    fn parse_failure_becomes_a_syntax_error_exception() {
        let mut interp = Interpreter::new();
        let err = interp.eval_string("var = 3").unwrap_err();
        assert_eq!(err.kind(), "SyntaxError");
    }

    #[test]
    fn private_lookup_skips_non_public_methods() {
        let mut interp = Interpreter::new();
        let scope = interp.new_root_scope("test");
        interp
            .eval_string_in("class C { private hidden() { 1 } shown() { 2 } }", &scope)
            .unwrap();
        let class = interp.scope_lookup(scope.0, "C").unwrap().as_object().unwrap();
        assert!(interp.find_method_or_getter(class, "hidden", true).is_none());
        assert!(interp.find_method_or_getter(class, "hidden", false).is_some());
        assert!(interp.find_method_or_getter(class, "shown", true).is_some());
    }
}
