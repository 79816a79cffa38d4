//! The managed heap: an arena of object cells with a free list, owned by the
//! tracing garbage collector.

use std::collections::BTreeMap;

use crate::{
    class::{ClassData, InstanceData, InstanceMethodData, MethodData},
    exception_private::ExceptionData,
    function::FunctionData,
    module::{ModuleData, ProgramFileData},
    scope::ScopeData,
    structure::StructureData,
    value::Value,
};

/// Unique identifier of a live heap cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct HeapId(usize);

/// Header carried by every heap cell.
///
/// `initialized` becomes true once the cell's payload is complete; the
/// collector only traverses initialized cells, so a half-built object can be
/// marked without being walked.
#[derive(Debug)]
pub(crate) struct ObjectHeader {
    /// The object's class descriptor (itself a heap cell).
    pub class: HeapId,
    /// Mark bit, valid only during a collection cycle.
    pub marked: bool,
    pub initialized: bool,
}

/// Payload of a heap cell: one variant per concrete object kind.
#[derive(Debug)]
pub(crate) enum ObjectData {
    Class(ClassData),
    Method(MethodData),
    Function(FunctionData),
    InstanceMethod(InstanceMethodData),
    /// An instance of a scripted class: its per-class field maps.
    Instance(InstanceData),
    Str(String),
    Structure(StructureData),
    Module(ModuleData),
    ProgramFile(ProgramFileData),
    Scope(ScopeData),
    Exception(ExceptionData),
}

impl ObjectData {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Class(_) => "Class",
            Self::Method(_) => "Method",
            Self::Function(_) => "Function",
            Self::InstanceMethod(_) => "InstanceMethod",
            Self::Instance(_) => "Instance",
            Self::Str(_) => "Str",
            Self::Structure(_) => "Structure",
            Self::Module(_) => "Module",
            Self::ProgramFile(_) => "ProgramFile",
            Self::Scope(_) => "Scope",
            Self::Exception(_) => "Exception",
        }
    }

    /// Enumerates every heap reference held by this payload. The header class
    /// is visited by the collector itself.
    pub fn for_each_ref(&self, visit: &mut impl FnMut(HeapId)) {
        fn visit_value(value: &Value, visit: &mut impl FnMut(HeapId)) {
            if let Value::Ref(id) = value {
                visit(*id);
            }
        }
        match self {
            Self::Class(class) => {
                if let Some(superclass) = class.superclass {
                    visit(superclass);
                }
                if let Some(constructor) = class.constructor {
                    visit(constructor);
                }
                for &method in class.methods.values() {
                    visit(method);
                }
                for &setter in class.setters.values() {
                    visit(setter);
                }
            }
            Self::Method(method) => {
                visit(method.def_class);
                if let Some(function) = method.function() {
                    visit(function);
                }
            }
            Self::Function(function) => {
                if let Some(scope) = function.captured_scope() {
                    visit(scope);
                }
            }
            Self::InstanceMethod(bound) => {
                visit(bound.method);
                visit_value(&bound.receiver, visit);
            }
            Self::Instance(instance) => {
                for level in &instance.levels {
                    visit(level.class);
                    for value in level.fields.values() {
                        visit_value(value, visit);
                    }
                }
            }
            Self::Str(_) | Self::ProgramFile(_) => {}
            Self::Structure(structure) => {
                for value in structure.fields.values() {
                    visit_value(value, visit);
                }
            }
            Self::Module(module) => {
                if let Some(file) = module.file {
                    visit(file);
                }
                for value in module.members.values() {
                    visit_value(value, visit);
                }
            }
            Self::Scope(scope) => {
                if let Some(parent) = scope.parent {
                    visit(parent);
                }
                if let Some(def_class) = scope.def_class {
                    visit(def_class);
                }
                if let Some(self_object) = scope.self_object {
                    visit(self_object);
                }
                if let Some(module) = scope.module {
                    visit(module);
                }
                for value in scope.vars.values() {
                    visit_value(value, visit);
                }
            }
            Self::Exception(exception) => {
                if let Some(cause) = exception.cause {
                    visit(cause);
                }
                for level in &exception.levels {
                    visit(level.class);
                    for value in level.fields.values() {
                        visit_value(value, visit);
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct HeapCell {
    pub header: ObjectHeader,
    pub data: ObjectData,
}

/// Snapshot of heap occupancy, exposed publicly for monitoring and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Number of live cells.
    pub live_objects: usize,
    /// Number of free (recycled) cells available for reuse.
    pub free_slots: usize,
    /// Total arena capacity (live + free).
    pub total_slots: usize,
    /// Live cells broken down by object kind.
    pub objects_by_kind: BTreeMap<&'static str, usize>,
}

const INITIAL_HEAP_CAPACITY: usize = 8;

/// How many allocations may happen between automatic collection checkpoints.
const GC_ALLOCATION_INTERVAL: u32 = 4096;

/// The cell arena. Freed slots keep their index on the free list and are
/// reused by later allocations, so `HeapId`s of live objects stay stable.
pub(crate) struct Heap {
    entries: Vec<Option<HeapCell>>,
    free_list: Vec<HeapId>,
    allocations_since_gc: u32,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(INITIAL_HEAP_CAPACITY),
            free_list: Vec::new(),
            allocations_since_gc: 0,
        }
    }

    /// Allocates a fully built cell and publishes it to the collector.
    pub fn allocate(&mut self, class: HeapId, data: ObjectData) -> HeapId {
        self.allocate_cell(HeapCell {
            header: ObjectHeader {
                class,
                marked: false,
                initialized: true,
            },
            data,
        })
    }

    /// Allocates a cell whose class descriptor is the cell itself. Used once,
    /// to bootstrap the `Class` class.
    pub fn allocate_self_classed(&mut self, data: ObjectData) -> HeapId {
        let id = self.allocate_cell(HeapCell {
            header: ObjectHeader {
                class: HeapId(0),
                marked: false,
                initialized: true,
            },
            data,
        });
        self.get_mut(id).header.class = id;
        id
    }

    fn allocate_cell(&mut self, cell: HeapCell) -> HeapId {
        self.allocations_since_gc = self.allocations_since_gc.saturating_add(1);
        if let Some(id) = self.free_list.pop() {
            debug_assert!(self.entries[id.0].is_none());
            self.entries[id.0] = Some(cell);
            id
        } else {
            self.entries.push(Some(cell));
            HeapId(self.entries.len() - 1)
        }
    }

    pub fn get(&self, id: HeapId) -> &HeapCell {
        self.entries[id.0].as_ref().expect("use of a freed heap cell")
    }

    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapCell {
        self.entries[id.0].as_mut().expect("use of a freed heap cell")
    }

    pub fn data(&self, id: HeapId) -> &ObjectData {
        &self.get(id).data
    }

    pub fn data_mut(&mut self, id: HeapId) -> &mut ObjectData {
        &mut self.get_mut(id).data
    }

    pub fn class_of(&self, id: HeapId) -> HeapId {
        self.get(id).header.class
    }

    pub fn unmark_all(&mut self) {
        for cell in self.entries.iter_mut().flatten() {
            cell.header.marked = false;
        }
    }

    /// Sets the mark bit; returns false if the cell was already marked.
    pub fn mark(&mut self, id: HeapId) -> bool {
        let header = &mut self.get_mut(id).header;
        if header.marked {
            false
        } else {
            header.marked = true;
            true
        }
    }

    /// Destroys every unmarked cell and returns its slot to the free list.
    pub fn sweep_unmarked(&mut self) -> usize {
        let mut freed = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if let Some(cell) = entry
                && !cell.header.marked
            {
                *entry = None;
                self.free_list.push(HeapId(index));
                freed += 1;
            }
        }
        freed
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn should_collect(&self) -> bool {
        self.allocations_since_gc >= GC_ALLOCATION_INTERVAL
    }

    pub fn gc_completed(&mut self) {
        self.allocations_since_gc = 0;
    }

    pub fn stats(&self) -> HeapStats {
        let mut objects_by_kind: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut live_objects = 0;
        for cell in self.entries.iter().flatten() {
            live_objects += 1;
            *objects_by_kind.entry(cell.data.kind_name()).or_insert(0) += 1;
        }
        HeapStats {
            live_objects,
            free_slots: self.free_list.len(),
            total_slots: self.entries.len(),
            objects_by_kind,
        }
    }
}

macro_rules! expect_data {
    ($get:ident, $variant:ident, $ty:ty) => {
        impl Heap {
            #[track_caller]
            pub(crate) fn $get(&self, id: HeapId) -> &$ty {
                match self.data(id) {
                    ObjectData::$variant(data) => data,
                    other => panic!(
                        "expected a {} cell, found {}",
                        stringify!($variant),
                        other.kind_name()
                    ),
                }
            }
        }
    };
}

macro_rules! expect_data_mut {
    ($get_mut:ident, $variant:ident, $ty:ty) => {
        impl Heap {
            #[track_caller]
            pub(crate) fn $get_mut(&mut self, id: HeapId) -> &mut $ty {
                match self.data_mut(id) {
                    ObjectData::$variant(data) => data,
                    other => panic!(
                        "expected a {} cell, found {}",
                        stringify!($variant),
                        other.kind_name()
                    ),
                }
            }
        }
    };
}

expect_data!(expect_class, Class, ClassData);
expect_data!(expect_method, Method, MethodData);
expect_data!(expect_function, Function, FunctionData);
expect_data!(expect_scope, Scope, ScopeData);
expect_data!(expect_module, Module, ModuleData);
expect_data!(expect_program_file, ProgramFile, ProgramFileData);
expect_data!(expect_structure, Structure, StructureData);
expect_data!(expect_exception, Exception, ExceptionData);
expect_data_mut!(expect_class_mut, Class, ClassData);
expect_data_mut!(expect_scope_mut, Scope, ScopeData);
expect_data_mut!(expect_module_mut, Module, ModuleData);
expect_data_mut!(expect_structure_mut, Structure, StructureData);
expect_data_mut!(expect_exception_mut, Exception, ExceptionData);

#[cfg(test)]
mod tests {
    use super::*;

    fn str_cell(heap: &mut Heap, text: &str) -> HeapId {
        let class = heap.allocate_self_classed(ObjectData::Str("class placeholder".to_owned()));
        heap.allocate(class, ObjectData::Str(text.to_owned()))
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut heap = Heap::new();
        let id = str_cell(&mut heap, "a");
        heap.unmark_all();
        heap.mark(heap.class_of(id));
        let freed = heap.sweep_unmarked();
        assert_eq!(freed, 1);
        let replacement = heap.allocate(heap.class_of(id), ObjectData::Str("b".to_owned()));
        assert_eq!(replacement, id);
        assert_eq!(heap.stats().free_slots, 0);
    }

    #[test]
    fn stats_track_kinds() {
        let mut heap = Heap::new();
        str_cell(&mut heap, "a");
        let stats = heap.stats();
        assert_eq!(stats.live_objects, 2);
        assert_eq!(stats.objects_by_kind.get("Str"), Some(&2));
    }

    #[test]
    fn mark_is_idempotent() {
        let mut heap = Heap::new();
        let id = str_cell(&mut heap, "a");
        heap.unmark_all();
        assert!(heap.mark(id));
        assert!(!heap.mark(id));
    }
}
