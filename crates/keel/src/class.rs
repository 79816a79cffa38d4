//! Class descriptors, methods, and the dispatch machinery: lookup along the
//! superclass chain, private access, instance construction, and attribute
//! reads and writes.

use ahash::AHashMap;

use crate::{
    eval::Interpreter,
    exception_private::{ExcType, ExceptionData, RunResult},
    heap::{HeapId, ObjectData},
    structure::StructureData,
    value::Value,
};

/// Identity of a built-in class, also selecting the payload shape its
/// instances use. Scripted classes inherit the shape of their nearest native
/// ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NativeKind {
    Object,
    Null,
    Boolean,
    Integer,
    Float,
    Str,
    Function,
    InstanceMethod,
    Method,
    Class,
    Module,
    Structure,
    Scope,
    ProgramFile,
    Exception(ExcType),
}

/// Runtime metadata of a class.
#[derive(Debug)]
pub(crate) struct ClassData {
    pub name: String,
    /// `None` only for the root `Object` class.
    pub superclass: Option<HeapId>,
    pub is_final: bool,
    /// `Some` for built-in classes, `None` for classes declared in source.
    pub native: Option<NativeKind>,
    /// The `init` method; a default no-op is installed when a scripted class
    /// declares none.
    pub constructor: Option<HeapId>,
    /// Methods and getters, keyed by name. Getters carry the GET flag.
    pub methods: AHashMap<String, HeapId>,
    /// Setters live in their own table so reads never see them.
    pub setters: AHashMap<String, HeapId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct MethodFlags {
    pub public: bool,
    /// Constructor.
    pub init: bool,
    /// Invoked on member read instead of being bound.
    pub get: bool,
    /// Installed into the setter table.
    pub set: bool,
    /// Receives the receiver as a `Value` rather than an object pointer;
    /// used by primitive classes.
    pub value_self: bool,
}

pub(crate) type NativeMethodFn = fn(&mut Interpreter, Value, &[Value]) -> RunResult<Value>;

/// The callable shape of a method.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Callable {
    Native { arity: u8, f: NativeMethodFn },
    /// A language-level function closure.
    Scripted(HeapId),
    /// Default getter: reads the like-named field of the defining class level.
    FieldGet,
    /// Default setter: writes the like-named field.
    FieldSet,
}

#[derive(Debug, Clone)]
pub(crate) struct MethodData {
    pub name: String,
    pub flags: MethodFlags,
    /// The class the method was declared in; lookup starts here for `super`
    /// access and default getters/setters read this class's field level.
    pub def_class: HeapId,
    pub callable: Callable,
}

impl MethodData {
    pub fn function(&self) -> Option<HeapId> {
        match self.callable {
            Callable::Scripted(function) => Some(function),
            _ => None,
        }
    }
}

/// One private field map per non-native class along the superclass chain,
/// dynamic class first. The chain shape is fixed at construction.
#[derive(Debug)]
pub(crate) struct FieldLevel {
    pub class: HeapId,
    pub fields: AHashMap<String, Value>,
}

#[derive(Debug)]
pub(crate) struct InstanceData {
    pub levels: Vec<FieldLevel>,
}

/// A method bound to its receiver, produced by member access.
#[derive(Debug)]
pub(crate) struct InstanceMethodData {
    pub method: HeapId,
    pub receiver: Value,
}

impl Interpreter {
    /// The class descriptor of any value; primitives map to their built-in
    /// classes.
    pub(crate) fn class_of_value(&self, value: Value) -> HeapId {
        match value {
            Value::Null => self.builtins.null,
            Value::Bool(_) => self.builtins.boolean,
            Value::Int(_) => self.builtins.integer,
            Value::Float(_) => self.builtins.float,
            Value::Ref(id) => self.heap.class_of(id),
        }
    }

    pub(crate) fn class_name_of(&self, value: Value) -> String {
        self.heap.expect_class(self.class_of_value(value)).name.clone()
    }

    /// True when `class` is a strict superclass of `sub`.
    pub(crate) fn is_superclass_of(&self, class: HeapId, sub: HeapId) -> bool {
        let mut current = self.heap.expect_class(sub).superclass;
        while let Some(ancestor) = current {
            if ancestor == class {
                return true;
            }
            current = self.heap.expect_class(ancestor).superclass;
        }
        false
    }

    /// `isA`: the dynamic class itself or any of its superclasses.
    pub(crate) fn is_a(&self, object_class: HeapId, class: HeapId) -> bool {
        object_class == class || self.is_superclass_of(class, object_class)
    }

    /// Walks the superclass chain for a method or getter. Non-public members
    /// are invisible unless the caller has private access.
    pub(crate) fn find_method_or_getter(&self, class: HeapId, name: &str, public_only: bool) -> Option<HeapId> {
        let mut current = Some(class);
        while let Some(class_id) = current {
            let class = self.heap.expect_class(class_id);
            if let Some(&method) = class.methods.get(name) {
                if !public_only || self.heap.expect_method(method).flags.public {
                    return Some(method);
                }
            }
            current = class.superclass;
        }
        None
    }

    /// Walks the superclass chain for a setter; only consulted when resolving
    /// an assignment.
    pub(crate) fn find_setter(&self, class: HeapId, name: &str, public_only: bool) -> Option<HeapId> {
        let mut current = Some(class);
        while let Some(class_id) = current {
            let class = self.heap.expect_class(class_id);
            if let Some(&setter) = class.setters.get(name) {
                if !public_only || self.heap.expect_method(setter).flags.public {
                    return Some(setter);
                }
            }
            current = class.superclass;
        }
        None
    }

    pub(crate) fn new_method(&mut self, data: MethodData) -> HeapId {
        self.heap.allocate(self.builtins.method, ObjectData::Method(data))
    }

    pub(crate) fn new_instance_method(&mut self, method: HeapId, receiver: Value) -> HeapId {
        self.heap.allocate(
            self.builtins.instance_method,
            ObjectData::InstanceMethod(InstanceMethodData { method, receiver }),
        )
    }

    /// Invokes a method with the given receiver. The receiver must be an
    /// object unless the method carries the value-self flag.
    pub(crate) fn call_method(&mut self, method_id: HeapId, receiver: Value, args: &[Value]) -> RunResult<Value> {
        let method = self.heap.expect_method(method_id).clone();
        match method.callable {
            Callable::Native { arity, f } => {
                if args.len() != arity as usize {
                    return self.raise(ExcType::ParameterError, "Invalid number of parameters");
                }
                if !method.flags.value_self && !receiver.is_object() {
                    let name = self.class_name_of(receiver);
                    return self.raise(
                        ExcType::TypeError,
                        format!("'{name}' values cannot receive this method"),
                    );
                }
                f(self, receiver, args)
            }
            Callable::FieldGet => {
                let object = self.expect_receiver(receiver)?;
                self.field_read(object, method.def_class, &method.name)
            }
            Callable::FieldSet => {
                let object = self.expect_receiver(receiver)?;
                self.field_write(object, method.def_class, &method.name, args[0]);
                Ok(args[0])
            }
            Callable::Scripted(function) => {
                let self_object = receiver.as_object();
                self.invoke_function(function, Some(method.def_class), self_object, args)
            }
        }
    }

    fn expect_receiver(&mut self, receiver: Value) -> RunResult<HeapId> {
        match receiver.as_object() {
            Some(id) => Ok(id),
            None => {
                let name = self.class_name_of(receiver);
                self.raise(ExcType::TypeError, format!("'{name}' objects have no fields"))
            }
        }
    }

    /// Builds the per-class field levels for an instance of `class`: one
    /// level per non-native class along the chain, dynamic class first.
    fn build_field_levels(&self, class: HeapId) -> Vec<FieldLevel> {
        let mut levels = Vec::new();
        let mut current = Some(class);
        while let Some(class_id) = current {
            let class = self.heap.expect_class(class_id);
            if class.native.is_none() {
                levels.push(FieldLevel {
                    class: class_id,
                    fields: AHashMap::new(),
                });
            }
            current = class.superclass;
        }
        levels
    }

    /// The nearest native ancestor (or the class itself), which decides the
    /// payload shape of new instances.
    fn native_root(&self, class: HeapId) -> NativeKind {
        let mut current = Some(class);
        while let Some(class_id) = current {
            let class = self.heap.expect_class(class_id);
            if let Some(kind) = class.native {
                return kind;
            }
            current = class.superclass;
        }
        // The chain always ends at the native Object class.
        unreachable!("class chain without a native root");
    }

    /// Allocates and constructs an instance of `class`, running its
    /// constructor with `self` bound to the new object.
    ///
    /// If the constructor raises, the partially initialized object is still a
    /// valid heap cell and is reclaimed by a later collection.
    pub(crate) fn construct_instance(&mut self, class: HeapId, args: &[Value]) -> RunResult<Value> {
        let data = match self.native_root(class) {
            NativeKind::Object => ObjectData::Instance(InstanceData {
                levels: self.build_field_levels(class),
            }),
            NativeKind::Exception(_) => ObjectData::Exception(ExceptionData {
                message: String::new(),
                cause: None,
                levels: self.build_field_levels(class),
            }),
            NativeKind::Structure => ObjectData::Structure(StructureData::default()),
            _ => {
                let name = self.heap.expect_class(class).name.clone();
                return self.raise(ExcType::TypeError, format!("'{name}' objects cannot be constructed"));
            }
        };
        let object = self.heap.allocate(class, data);
        if let Some(constructor) = self.heap.expect_class(class).constructor {
            self.call_method(constructor, Value::Ref(object), args)?;
        }
        Ok(Value::Ref(object))
    }

    /// Language-level `C(args)`: rejects private constructors, then
    /// constructs.
    pub(crate) fn call_class(&mut self, class: HeapId, args: &[Value]) -> RunResult<Value> {
        let public = self
            .heap
            .expect_class(class)
            .constructor
            .is_some_and(|ctor| self.heap.expect_method(ctor).flags.public);
        if !public {
            return self.raise(ExcType::TypeError, "The constructor of this class is private");
        }
        self.construct_instance(class, args)
    }

    /// Attribute read on a scripted object. `start_class` is the dynamic
    /// class, or the scope's defining class when the caller has private
    /// access (which also makes non-public members visible and enables the
    /// direct field fallback).
    pub(crate) fn class_get_attribute(
        &mut self,
        start_class: HeapId,
        receiver: HeapId,
        name: &str,
        private: bool,
    ) -> RunResult<Value> {
        if let Some(method_id) = self.find_method_or_getter(start_class, name, !private) {
            let is_getter = self.heap.expect_method(method_id).flags.get;
            if is_getter {
                return self.call_method(method_id, Value::Ref(receiver), &[]);
            }
            let bound = self.new_instance_method(method_id, Value::Ref(receiver));
            return Ok(Value::Ref(bound));
        }
        if private {
            return self.field_read(receiver, start_class, name);
        }
        self.no_attribute(Value::Ref(receiver), name)
    }

    /// Attribute write on a scripted object; mirrors `class_get_attribute`.
    pub(crate) fn class_set_attribute(
        &mut self,
        start_class: HeapId,
        receiver: HeapId,
        name: &str,
        value: Value,
        private: bool,
    ) -> RunResult<Value> {
        if let Some(setter) = self.find_setter(start_class, name, !private) {
            self.call_method(setter, Value::Ref(receiver), &[value])?;
            return Ok(value);
        }
        if private {
            self.field_write(receiver, start_class, name, value);
            return Ok(value);
        }
        self.no_attribute(Value::Ref(receiver), name)
    }

    /// Member read on a primitive or an instance of a native class: getters
    /// fire immediately, methods are bound, and `Module`/`Structure` fall
    /// back to their own tables.
    pub(crate) fn native_member(&mut self, receiver: Value, name: &str) -> RunResult<Value> {
        let class = self.class_of_value(receiver);
        if let Some(method_id) = self.find_method_or_getter(class, name, true) {
            let is_getter = self.heap.expect_method(method_id).flags.get;
            if is_getter {
                return self.call_method(method_id, receiver, &[]);
            }
            let bound = self.new_instance_method(method_id, receiver);
            return Ok(Value::Ref(bound));
        }
        match self.heap.expect_class(class).native {
            Some(NativeKind::Module) => {
                let id = receiver.as_object().expect("module values are objects");
                if let Some(&member) = self.heap.expect_module(id).members.get(name) {
                    return Ok(member);
                }
                self.no_attribute(receiver, name)
            }
            Some(NativeKind::Structure) => {
                let id = receiver.as_object().expect("structure values are objects");
                if let Some(&field) = self.heap.expect_structure(id).fields.get(name) {
                    return Ok(field);
                }
                self.no_attribute(receiver, name)
            }
            _ => self.no_attribute(receiver, name),
        }
    }

    pub(crate) fn no_attribute<T>(&mut self, receiver: Value, name: &str) -> RunResult<T> {
        let class_name = self.class_name_of(receiver);
        self.raise(
            ExcType::AttributeError,
            format!("'{class_name}' object has no attribute '{name}'"),
        )
    }

    fn field_levels_mut(&mut self, object: HeapId) -> Option<&mut Vec<FieldLevel>> {
        match self.heap.data_mut(object) {
            ObjectData::Instance(instance) => Some(&mut instance.levels),
            ObjectData::Exception(exception) => Some(&mut exception.levels),
            _ => None,
        }
    }

    fn field_levels(&self, object: HeapId) -> &[FieldLevel] {
        match self.heap.data(object) {
            ObjectData::Instance(instance) => &instance.levels,
            ObjectData::Exception(exception) => &exception.levels,
            _ => &[],
        }
    }

    /// Reads a private field at the given class level.
    pub(crate) fn field_read(&mut self, object: HeapId, level_class: HeapId, name: &str) -> RunResult<Value> {
        let found = self
            .field_levels(object)
            .iter()
            .find(|level| level.class == level_class)
            .and_then(|level| level.fields.get(name).copied());
        match found {
            Some(value) => Ok(value),
            None => self.no_attribute(Value::Ref(object), name),
        }
    }

    /// Writes a private field at the given class level. Writes to a level the
    /// object does not have (a native defining class) are impossible by
    /// construction.
    pub(crate) fn field_write(&mut self, object: HeapId, level_class: HeapId, name: &str, value: Value) {
        if let Some(levels) = self.field_levels_mut(object)
            && let Some(level) = levels.iter_mut().find(|level| level.class == level_class)
        {
            level.fields.insert(name.to_owned(), value);
        }
    }
}
