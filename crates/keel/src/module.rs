//! Modules and the module loader.
//!
//! Built-in modules are registered at interpreter construction. File modules
//! are cached by canonical absolute path: importing the same file twice
//! yields the same `Module` object.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;

use crate::{
    eval::Interpreter,
    exception_private::{ExcType, RunResult},
    heap::{HeapId, ObjectData},
    value::Value,
};

#[derive(Debug)]
pub(crate) struct ModuleData {
    pub name: String,
    pub builtin: bool,
    /// Backing source file; `None` for built-in and "main" modules.
    pub file: Option<HeapId>,
    /// Exported members.
    pub members: IndexMap<String, Value>,
}

/// A loaded source file. The canonical absolute path doubles as the module
/// cache key.
#[derive(Debug)]
pub(crate) struct ProgramFileData {
    pub absolute_path: PathBuf,
    pub directory: PathBuf,
    pub file_name: String,
    pub source: String,
}

pub(crate) const MODULE_EXTENSION: &str = "keel";

fn is_valid_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}

impl Interpreter {
    /// Allocates a module and adds it to the global registry, making it a GC
    /// root.
    pub(crate) fn new_module(&mut self, name: impl Into<String>, builtin: bool, file: Option<HeapId>) -> HeapId {
        let module = self.heap.allocate(
            self.builtins.module,
            ObjectData::Module(ModuleData {
                name: name.into(),
                builtin,
                file,
                members: IndexMap::new(),
            }),
        );
        self.modules.push(module);
        module
    }

    pub(crate) fn builtin_module(&self, name: &str) -> Option<HeapId> {
        self.modules.iter().copied().find(|&id| {
            let module = self.heap.expect_module(id);
            module.builtin && module.name == name
        })
    }

    /// A cached file module for `path`, excluding the importing module
    /// itself.
    pub(crate) fn cached_module(&self, path: &Path, current: Option<HeapId>) -> Option<HeapId> {
        self.modules.iter().copied().find(|&id| {
            if Some(id) == current {
                return false;
            }
            let module = self.heap.expect_module(id);
            if module.builtin {
                return false;
            }
            module
                .file
                .is_some_and(|file| self.heap.expect_program_file(file).absolute_path == path)
        })
    }

    pub(crate) fn module_add_export(&mut self, module: HeapId, name: &str, value: Value) {
        self.heap
            .expect_module_mut(module)
            .members
            .insert(name.to_owned(), value);
    }

    /// Reads a source file and allocates its `ProgramFile` cell.
    pub(crate) fn load_program_file(&mut self, path: &Path) -> io::Result<HeapId> {
        let absolute_path = fs::canonicalize(path)?;
        let source = fs::read_to_string(&absolute_path)?;
        let directory = absolute_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::other("file has no parent directory"))?;
        let file_name = absolute_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::other("file has no name"))?;
        Ok(self.heap.allocate(
            self.builtins.program_file,
            ObjectData::ProgramFile(ProgramFileData {
                absolute_path,
                directory,
                file_name,
                source,
            }),
        ))
    }

    /// Loads, parses and evaluates a module file under a fresh root scope
    /// owning a new module. Returns the module object.
    pub(crate) fn eval_module_file_inner(&mut self, path: &Path) -> RunResult<Value> {
        let Ok(file) = self.load_program_file(path) else {
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            return self.raise(ExcType::ImportError, format!("No module named '{stem}'"));
        };
        let loaded = self.heap.expect_program_file(file);
        let stem = loaded
            .file_name
            .strip_suffix(&format!(".{MODULE_EXTENSION}"))
            .unwrap_or(&loaded.file_name)
            .to_owned();
        let source = loaded.source.clone();
        if !is_valid_identifier(&stem) {
            return self.raise(ExcType::ImportError, "Invalid module file name");
        }
        let module = self.new_module(stem.clone(), false, Some(file));
        self.trace_module_load(&stem, Some(path));
        let scope = self.new_root_scope_for_module(module);
        self.eval_source(&source, Some(scope))?;
        Ok(Value::Ref(module))
    }

    /// The `import` operation. Level 0 consults the built-in registry; level
    /// n resolves a file relative to the importing file's directory, going up
    /// one directory per extra level.
    pub(crate) fn eval_import(&mut self, level: u32, name: &str, scope: HeapId) -> RunResult<Value> {
        if level == 0 {
            let Some(module) = self.builtin_module(name) else {
                return self.raise(ExcType::ImportError, format!("No module named '{name}'"));
            };
            let module_name = self.heap.expect_module(module).name.clone();
            return self.scope_declare(scope, &module_name, Value::Ref(module));
        }

        let current = self.scope_module(scope);
        let file = current.and_then(|module| self.heap.expect_module(module).file);
        let Some(file) = file else {
            // No importing file to resolve against (e.g. a plain source
            // string).
            return self.raise(ExcType::ImportError, format!("No module named '{name}'"));
        };
        let mut directory = self.heap.expect_program_file(file).directory.clone();
        for _ in 1..level {
            match directory.parent() {
                Some(parent) => directory = parent.to_path_buf(),
                None => {
                    return self.raise(ExcType::ImportError, format!("No module named '{name}'"));
                }
            }
        }
        let target = directory.join(format!("{name}.{MODULE_EXTENSION}"));
        let Ok(canonical) = fs::canonicalize(&target) else {
            return self.raise(ExcType::ImportError, format!("No module named '{name}'"));
        };

        let module = match self.cached_module(&canonical, current) {
            Some(module) => module,
            None => {
                let value = self.eval_module_file_inner(&canonical)?;
                value.as_object().expect("module evaluation yields a module object")
            }
        };
        let module_name = self.heap.expect_module(module).name.clone();
        self.scope_declare(scope, &module_name, Value::Ref(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(is_valid_identifier("util"));
        assert!(is_valid_identifier("_private2"));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("has-dash"));
        assert!(!is_valid_identifier(""));
    }
}
