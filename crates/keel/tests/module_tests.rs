//! Module loader behavior: file imports, the path-keyed cache, import
//! levels, and failure modes.

use std::fs;

use keel::{Interpreter, Object};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn file_imports_bind_the_module() {
    let dir = TempDir::new().unwrap();
    write(&dir, "util.keel", "export answer = 40 + 2;");
    let main = write(&dir, "main.keel", "import .util; util.answer");

    let mut interp = Interpreter::new();
    assert_eq!(interp.eval_file(&main).unwrap(), Object::Int(42));
}

#[test]
fn module_name_getter() {
    let dir = TempDir::new().unwrap();
    write(&dir, "util.keel", "export answer = 1;");
    let main = write(&dir, "main.keel", "import .util; util.name");

    let mut interp = Interpreter::new();
    assert_eq!(interp.eval_file(&main).unwrap(), Object::Str("util".to_owned()));
}

#[test]
fn the_module_cache_returns_the_same_module_object() {
    let dir = TempDir::new().unwrap();
    write(&dir, "shared.keel", "export box = Structure();");
    write(&dir, "a.keel", "import .shared; export s = shared.box;");
    write(&dir, "b.keel", "import .shared; export s = shared.box;");
    let main = write(&dir, "main.keel", "import .a; import .b; a.s.flag = 1; b.s.flag");

    let mut interp = Interpreter::new();
    // Identity, not equality: the mutation through one import is visible
    // through the other.
    assert_eq!(interp.eval_file(&main).unwrap(), Object::Int(1));
}

#[test]
fn module_bodies_run_once() {
    let dir = TempDir::new().unwrap();
    write(&dir, "shared.keel", "export box = Structure(); box.count = 0;");
    write(
        &dir,
        "a.keel",
        "import .shared; shared.box.count = shared.box.count + 1; export c = shared.box.count;",
    );
    write(
        &dir,
        "b.keel",
        "import .shared; shared.box.count = shared.box.count + 1; export c = shared.box.count;",
    );
    let main = write(&dir, "main.keel", "import .a; import .b; a.c + b.c");

    // One shared instance: the two importers see 1 and 2, not 1 and 1.
    let mut interp = Interpreter::new();
    assert_eq!(interp.eval_file(&main).unwrap(), Object::Int(3));
}

#[test]
fn import_levels_walk_up_directories() {
    let dir = TempDir::new().unwrap();
    write(&dir, "top.keel", "export tag = \"top\";");
    let main = write(&dir, "sub/main.keel", "import ..top; top.tag");

    let mut interp = Interpreter::new();
    assert_eq!(interp.eval_file(&main).unwrap(), Object::Str("top".to_owned()));
}

#[test]
fn missing_file_module_raises_import_error() {
    let dir = TempDir::new().unwrap();
    let main = write(&dir, "main.keel", "import .ghost");

    let mut interp = Interpreter::new();
    let err = interp.eval_file(&main).unwrap_err();
    assert_eq!(err.kind(), "ImportError");
    assert_eq!(err.message(), "No module named 'ghost'");
}

#[test]
fn relative_imports_require_a_backing_file() {
    let err = Interpreter::new().eval_string("import .anything").unwrap_err();
    assert_eq!(err.kind(), "ImportError");
    assert_eq!(err.message(), "No module named 'anything'");
}

#[test]
fn module_file_names_must_be_identifiers() {
    let dir = TempDir::new().unwrap();
    let bad = write(&dir, "bad-name.keel", "export x = 1;");

    let mut interp = Interpreter::new();
    let err = interp.eval_module_file(&bad).unwrap_err();
    assert_eq!(err.kind(), "ImportError");
    assert_eq!(err.message(), "Invalid module file name");
}

#[test]
fn eval_module_file_returns_the_module_object() {
    let dir = TempDir::new().unwrap();
    let module = write(&dir, "lib.keel", "export one = 1;");

    let mut interp = Interpreter::new();
    assert_eq!(
        interp.eval_module_file(&module).unwrap(),
        Object::Instance {
            class: "Module".to_owned()
        }
    );
}

#[test]
fn importing_the_same_name_twice_is_a_name_error() {
    let dir = TempDir::new().unwrap();
    write(&dir, "util.keel", "export x = 1;");
    let main = write(&dir, "main.keel", "import .util; import .util;");

    let mut interp = Interpreter::new();
    let err = interp.eval_file(&main).unwrap_err();
    assert_eq!(err.kind(), "NameError");
    assert_eq!(err.message(), "Identifier 'util' already declared");
}

#[test]
fn errors_inside_modules_propagate_to_the_importer() {
    let dir = TempDir::new().unwrap();
    write(&dir, "broken.keel", "1 / 0;");
    let main = write(&dir, "main.keel", "import .broken");

    let mut interp = Interpreter::new();
    let err = interp.eval_file(&main).unwrap_err();
    assert_eq!(err.kind(), "ZeroDivisionError");
}

#[test]
fn missing_files_fail_eval_file() {
    let mut interp = Interpreter::new();
    let err = interp.eval_file("does/not/exist.keel").unwrap_err();
    assert_eq!(err.kind(), "Exception");
    assert!(err.message().starts_with("Cannot read file"));
}

#[test]
fn files_can_run_in_a_persistent_scope() {
    let dir = TempDir::new().unwrap();
    let script = write(&dir, "setup.keel", "var q = 5; q");

    let mut interp = Interpreter::new();
    let scope = interp.new_root_scope("session");
    assert_eq!(interp.eval_file_in(&script, &scope).unwrap(), Object::Int(5));
    assert_eq!(interp.eval_string_in("q + 1", &scope).unwrap(), Object::Int(6));
}

#[test]
fn classes_travel_through_module_exports() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "shapes.keel",
        "class Square { init(side) { @side = side } get area { @side * @side } };
         export Square;",
    );
    let main = write(&dir, "main.keel", "import .shapes; shapes.Square(4).area");

    let mut interp = Interpreter::new();
    assert_eq!(interp.eval_file(&main).unwrap(), Object::Int(16));
}
