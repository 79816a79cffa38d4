//! Built-in classes: descriptors, native method tables, and the install pass
//! that seeds them onto the heap at interpreter construction.

use ahash::AHashMap;

use strum::{EnumCount, VariantArray};

use crate::{
    class::{Callable, ClassData, MethodData, MethodFlags, NativeKind, NativeMethodFn},
    eval::Interpreter,
    exception_private::{ExcType, RunResult},
    heap::{Heap, HeapId, ObjectData},
    value::{Value, format_float},
};

/// Heap ids of every built-in class descriptor. These are permanent GC roots.
pub(crate) struct Builtins {
    pub class_class: HeapId,
    pub object: HeapId,
    pub null: HeapId,
    pub boolean: HeapId,
    pub integer: HeapId,
    pub float: HeapId,
    pub string: HeapId,
    pub function: HeapId,
    pub instance_method: HeapId,
    /// Internal class of method cells; never visible to language code.
    pub method: HeapId,
    pub module: HeapId,
    pub structure: HeapId,
    pub scope: HeapId,
    pub program_file: HeapId,
    exceptions: [HeapId; ExcType::COUNT],
}

impl Builtins {
    pub fn exception(&self, ty: ExcType) -> HeapId {
        self.exceptions[ty as usize]
    }

    /// Every built-in class, for root marking.
    pub fn all(&self) -> Vec<HeapId> {
        let mut ids = vec![
            self.class_class,
            self.object,
            self.null,
            self.boolean,
            self.integer,
            self.float,
            self.string,
            self.function,
            self.instance_method,
            self.method,
            self.module,
            self.structure,
            self.scope,
            self.program_file,
        ];
        ids.extend_from_slice(&self.exceptions);
        ids
    }

    /// The classes seeded into root scopes. `Scope`, `ProgramFile` and the
    /// method class stay internal.
    pub fn scope_visible(&self) -> Vec<HeapId> {
        let mut ids = vec![
            self.object,
            self.class_class,
            self.null,
            self.boolean,
            self.integer,
            self.float,
            self.string,
            self.function,
            self.instance_method,
            self.module,
            self.structure,
        ];
        ids.extend_from_slice(&self.exceptions);
        ids
    }
}

const PUBLIC_METHOD: MethodFlags = MethodFlags {
    public: true,
    init: false,
    get: false,
    set: false,
    value_self: false,
};

const PUBLIC_GETTER: MethodFlags = MethodFlags {
    public: true,
    init: false,
    get: true,
    set: false,
    value_self: false,
};

const PUBLIC_VALUE_GETTER: MethodFlags = MethodFlags {
    public: true,
    init: false,
    get: true,
    set: false,
    value_self: true,
};

const PUBLIC_INIT: MethodFlags = MethodFlags {
    public: true,
    init: true,
    get: false,
    set: false,
    value_self: false,
};

struct NativeMethodDef {
    name: &'static str,
    arity: u8,
    flags: MethodFlags,
    f: NativeMethodFn,
}

const OBJECT_METHODS: &[NativeMethodDef] = &[
    NativeMethodDef {
        name: "toString",
        arity: 0,
        flags: PUBLIC_VALUE_GETTER,
        f: object_to_string,
    },
    NativeMethodDef {
        name: "class",
        arity: 0,
        flags: PUBLIC_VALUE_GETTER,
        f: object_class,
    },
    NativeMethodDef {
        name: "init",
        arity: 0,
        flags: PUBLIC_INIT,
        f: default_construct,
    },
];

const NULL_METHODS: &[NativeMethodDef] = &[NativeMethodDef {
    name: "toString",
    arity: 0,
    flags: PUBLIC_VALUE_GETTER,
    f: null_to_string,
}];

const BOOLEAN_METHODS: &[NativeMethodDef] = &[NativeMethodDef {
    name: "toString",
    arity: 0,
    flags: PUBLIC_VALUE_GETTER,
    f: boolean_to_string,
}];

const INTEGER_METHODS: &[NativeMethodDef] = &[NativeMethodDef {
    name: "toString",
    arity: 0,
    flags: PUBLIC_VALUE_GETTER,
    f: integer_to_string,
}];

const FLOAT_METHODS: &[NativeMethodDef] = &[NativeMethodDef {
    name: "toString",
    arity: 0,
    flags: PUBLIC_VALUE_GETTER,
    f: float_to_string,
}];

const STRING_METHODS: &[NativeMethodDef] = &[
    NativeMethodDef {
        name: "toString",
        arity: 0,
        flags: PUBLIC_GETTER,
        f: string_to_string,
    },
    NativeMethodDef {
        name: "length",
        arity: 0,
        flags: PUBLIC_GETTER,
        f: string_length,
    },
    NativeMethodDef {
        name: "contains",
        arity: 1,
        flags: PUBLIC_METHOD,
        f: string_contains,
    },
    NativeMethodDef {
        name: "startsWith",
        arity: 1,
        flags: PUBLIC_METHOD,
        f: string_starts_with,
    },
];

const CLASS_METHODS: &[NativeMethodDef] = &[
    NativeMethodDef {
        name: "name",
        arity: 0,
        flags: PUBLIC_GETTER,
        f: class_name,
    },
    NativeMethodDef {
        name: "superclass",
        arity: 0,
        flags: PUBLIC_GETTER,
        f: class_superclass,
    },
];

const MODULE_METHODS: &[NativeMethodDef] = &[NativeMethodDef {
    name: "name",
    arity: 0,
    flags: PUBLIC_GETTER,
    f: module_name,
}];

const EXCEPTION_METHODS: &[NativeMethodDef] = &[
    NativeMethodDef {
        name: "message",
        arity: 0,
        flags: PUBLIC_GETTER,
        f: exception_message,
    },
    NativeMethodDef {
        name: "toString",
        arity: 0,
        flags: PUBLIC_GETTER,
        f: exception_to_string,
    },
    NativeMethodDef {
        name: "init",
        arity: 1,
        flags: PUBLIC_INIT,
        f: exception_construct,
    },
];

const STRUCTURE_METHODS: &[NativeMethodDef] = &[NativeMethodDef {
    name: "init",
    arity: 0,
    flags: PUBLIC_INIT,
    f: default_construct,
}];

pub(crate) fn install(heap: &mut Heap) -> Builtins {
    let class_class = heap.allocate_self_classed(ObjectData::Class(class_data(
        "Class",
        None,
        true,
        Some(NativeKind::Class),
    )));
    let object = install_class(heap, class_class, "Object", None, false, NativeKind::Object);
    heap.expect_class_mut(class_class).superclass = Some(object);

    let null = install_class(heap, class_class, "Null", Some(object), true, NativeKind::Null);
    let boolean = install_class(heap, class_class, "Boolean", Some(object), true, NativeKind::Boolean);
    let integer = install_class(heap, class_class, "Integer", Some(object), true, NativeKind::Integer);
    let float = install_class(heap, class_class, "Float", Some(object), true, NativeKind::Float);
    let string = install_class(heap, class_class, "String", Some(object), true, NativeKind::Str);
    let function = install_class(heap, class_class, "Function", Some(object), true, NativeKind::Function);
    let instance_method = install_class(
        heap,
        class_class,
        "InstanceMethod",
        Some(object),
        true,
        NativeKind::InstanceMethod,
    );
    let method = install_class(heap, class_class, "Method", Some(object), true, NativeKind::Method);
    let module = install_class(heap, class_class, "Module", Some(object), true, NativeKind::Module);
    let structure = install_class(heap, class_class, "Structure", Some(object), true, NativeKind::Structure);
    let scope = install_class(heap, class_class, "Scope", Some(object), true, NativeKind::Scope);
    let program_file = install_class(
        heap,
        class_class,
        "ProgramFile",
        Some(object),
        true,
        NativeKind::ProgramFile,
    );

    let exception_base = install_class(
        heap,
        class_class,
        "Exception",
        Some(object),
        false,
        NativeKind::Exception(ExcType::Exception),
    );
    let mut exception_ids = Vec::with_capacity(ExcType::COUNT);
    for &ty in ExcType::VARIANTS {
        if ty == ExcType::Exception {
            exception_ids.push(exception_base);
        } else {
            let name: &'static str = ty.into();
            exception_ids.push(install_class(
                heap,
                class_class,
                name,
                Some(exception_base),
                false,
                NativeKind::Exception(ty),
            ));
        }
    }
    let exceptions: [HeapId; ExcType::COUNT] = exception_ids
        .try_into()
        .expect("one class per built-in exception type");

    let builtins = Builtins {
        class_class,
        object,
        null,
        boolean,
        integer,
        float,
        string,
        function,
        instance_method,
        method,
        module,
        structure,
        scope,
        program_file,
        exceptions,
    };

    add_methods(heap, builtins.method, builtins.object, OBJECT_METHODS);
    add_methods(heap, builtins.method, builtins.null, NULL_METHODS);
    add_methods(heap, builtins.method, builtins.boolean, BOOLEAN_METHODS);
    add_methods(heap, builtins.method, builtins.integer, INTEGER_METHODS);
    add_methods(heap, builtins.method, builtins.float, FLOAT_METHODS);
    add_methods(heap, builtins.method, builtins.string, STRING_METHODS);
    add_methods(heap, builtins.method, builtins.class_class, CLASS_METHODS);
    add_methods(heap, builtins.method, builtins.module, MODULE_METHODS);
    add_methods(heap, builtins.method, exception_base, EXCEPTION_METHODS);
    add_methods(heap, builtins.method, builtins.structure, STRUCTURE_METHODS);

    // Constructor slots are per-class, not inherited: every exception class
    // shares the base constructor.
    let base_constructor = heap.expect_class(exception_base).constructor;
    for &exception_class in &builtins.exceptions {
        if exception_class != exception_base {
            heap.expect_class_mut(exception_class).constructor = base_constructor;
        }
    }

    builtins
}

fn class_data(name: &str, superclass: Option<HeapId>, is_final: bool, native: Option<NativeKind>) -> ClassData {
    ClassData {
        name: name.to_owned(),
        superclass,
        is_final,
        native,
        constructor: None,
        methods: AHashMap::new(),
        setters: AHashMap::new(),
    }
}

fn install_class(
    heap: &mut Heap,
    class_class: HeapId,
    name: &str,
    superclass: Option<HeapId>,
    is_final: bool,
    native: NativeKind,
) -> HeapId {
    heap.allocate(
        class_class,
        ObjectData::Class(class_data(name, superclass, is_final, Some(native))),
    )
}

fn add_methods(heap: &mut Heap, method_class: HeapId, class: HeapId, defs: &[NativeMethodDef]) {
    for def in defs {
        let method = heap.allocate(
            method_class,
            ObjectData::Method(MethodData {
                name: def.name.to_owned(),
                flags: def.flags,
                def_class: class,
                callable: Callable::Native {
                    arity: def.arity,
                    f: def.f,
                },
            }),
        );
        let class_data = heap.expect_class_mut(class);
        if def.flags.init {
            class_data.constructor = Some(method);
        } else if def.flags.set {
            class_data.setters.insert(def.name.to_owned(), method);
        } else {
            class_data.methods.insert(def.name.to_owned(), method);
        }
    }
}

/// The no-op constructor installed for classes that declare none.
pub(crate) fn default_construct(_interp: &mut Interpreter, _receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Null)
}

fn object_to_string(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let name = interp.class_name_of(receiver);
    Ok(interp.new_string(format!("<{name}>")))
}

fn object_class(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(Value::Ref(interp.class_of_value(receiver)))
}

fn null_to_string(interp: &mut Interpreter, _receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(interp.new_string("null"))
}

fn boolean_to_string(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Bool(value) = receiver else {
        unreachable!("Boolean method on a non-boolean receiver");
    };
    Ok(interp.new_string(if value { "true" } else { "false" }))
}

fn integer_to_string(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Int(value) = receiver else {
        unreachable!("Integer method on a non-integer receiver");
    };
    Ok(interp.new_string(value.to_string()))
}

fn float_to_string(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let Value::Float(value) = receiver else {
        unreachable!("Float method on a non-float receiver");
    };
    Ok(interp.new_string(format_float(value)))
}

fn receiver_str(interp: &Interpreter, receiver: Value) -> String {
    let id = receiver.as_object().expect("String method on a non-object receiver");
    match interp.heap.data(id) {
        ObjectData::Str(text) => text.clone(),
        other => unreachable!("String method on a {} receiver", other.kind_name()),
    }
}

fn string_to_string(_interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    Ok(receiver)
}

fn string_length(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let text = receiver_str(interp, receiver);
    Ok(Value::Int(text.chars().count() as i64))
}

fn string_arg(interp: &mut Interpreter, value: Value) -> RunResult<String> {
    if let Some(id) = value.as_object()
        && let ObjectData::Str(text) = interp.heap.data(id)
    {
        return Ok(text.clone());
    }
    interp.raise(ExcType::TypeError, "Expected a String")
}

fn string_contains(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let needle = string_arg(interp, args[0])?;
    let text = receiver_str(interp, receiver);
    Ok(Value::Bool(text.contains(&needle)))
}

fn string_starts_with(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let prefix = string_arg(interp, args[0])?;
    let text = receiver_str(interp, receiver);
    Ok(Value::Bool(text.starts_with(&prefix)))
}

fn class_name(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = receiver.as_object().expect("Class method on a non-object receiver");
    let name = interp.heap.expect_class(id).name.clone();
    Ok(interp.new_string(name))
}

fn class_superclass(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = receiver.as_object().expect("Class method on a non-object receiver");
    match interp.heap.expect_class(id).superclass {
        Some(superclass) => Ok(Value::Ref(superclass)),
        None => Ok(Value::Null),
    }
}

fn module_name(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = receiver.as_object().expect("Module method on a non-object receiver");
    let name = interp.heap.expect_module(id).name.clone();
    Ok(interp.new_string(name))
}

fn exception_message(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = receiver.as_object().expect("Exception method on a non-object receiver");
    let message = interp.heap.expect_exception(id).message.clone();
    Ok(interp.new_string(message))
}

fn exception_to_string(interp: &mut Interpreter, receiver: Value, _args: &[Value]) -> RunResult<Value> {
    let id = receiver.as_object().expect("Exception method on a non-object receiver");
    let class_name = interp.class_name_of(receiver);
    let message = interp.heap.expect_exception(id).message.clone();
    Ok(interp.new_string(format!("{class_name}: {message}")))
}

/// `Exception(message)` and the constructors of its subclasses.
fn exception_construct(interp: &mut Interpreter, receiver: Value, args: &[Value]) -> RunResult<Value> {
    let message = string_arg(interp, args[0])?;
    let id = receiver.as_object().expect("Exception constructor on a non-object receiver");
    interp.heap.expect_exception_mut(id).message = message;
    Ok(Value::Null)
}
