//! Class declaration, dispatch, privacy, and inheritance behavior.

use keel::{Exception, Interpreter, Object};
use pretty_assertions::assert_eq;

fn eval(source: &str) -> Object {
    Interpreter::new()
        .eval_string(source)
        .unwrap_or_else(|err| panic!("evaluation of {source:?} raised {err}"))
}

fn eval_err(source: &str) -> Exception {
    Interpreter::new()
        .eval_string(source)
        .expect_err("expected an exception")
}

#[test]
fn constructor_arguments_bind_fields() {
    let result = eval(
        "class Point { init(x, y) { @x = x; @y = y } get x; get y; };
         var p = Point(3, 4);
         p.x * p.x + p.y * p.y",
    );
    assert_eq!(result, Object::Int(25));
}

#[test]
fn scripted_getters_and_setters() {
    let result = eval(
        "class Cell { init { @v = 1 } get v; set v(x) { @v = x } };
         var c = Cell();
         c.v = 41;
         c.v + 1",
    );
    assert_eq!(result, Object::Int(42));
}

#[test]
fn default_setter_writes_the_field() {
    let result = eval(
        "class Box { init { @content = null } get content; set content; };
         var b = Box();
         b.content = 7;
         b.content",
    );
    assert_eq!(result, Object::Int(7));
}

#[test]
fn methods_bind_their_receiver() {
    let result = eval(
        "class Counter { init { @n = 0 } bump() { @n = @n + 1 } get n; };
         var c = Counter();
         var bump = c.bump;
         bump(); bump();
         c.n",
    );
    assert_eq!(result, Object::Int(2));
}

#[test]
fn super_call_reaches_the_superclass_constructor() {
    let result = eval(
        "class A { init(x) { @x = x } get x; };
         class B: A { init { super(7) } };
         B().x",
    );
    assert_eq!(result, Object::Int(7));
}

#[test]
fn super_member_access_uses_the_defining_class_chain() {
    let result = eval(
        "class A { describe() { \"a\" } };
         class B: A { describe() { super.describe() + \"b\" } };
         B().describe()",
    );
    assert_eq!(result, Object::Str("ab".to_owned()));
}

#[test]
fn superclass_keyword_names_the_parent() {
    let result = eval(
        "class A { };
         class B: A { parent() { superclass.name } };
         B().parent()",
    );
    assert_eq!(result, Object::Str("A".to_owned()));
}

#[test]
fn method_resolution_walks_the_chain() {
    let result = eval(
        "class A { greet() { \"hi\" } };
         class B: A { };
         class C: B { };
         C().greet()",
    );
    assert_eq!(result, Object::Str("hi".to_owned()));
}

#[test]
fn private_members_are_reachable_only_through_self() {
    let result = eval(
        "class C { private secret() { 41 } reveal() { @secret() + 1 } };
         C().reveal()",
    );
    assert_eq!(result, Object::Int(42));

    let err = eval_err("class C { private secret() { 41 } }; C().secret");
    assert_eq!(err.kind(), "AttributeError");
    assert_eq!(err.message(), "'C' object has no attribute 'secret'");
}

#[test]
fn fields_are_private_per_class() {
    let err = eval_err("class C { init { @x = 1 } }; C().x");
    assert_eq!(err.kind(), "AttributeError");
    assert_eq!(err.message(), "'C' object has no attribute 'x'");
}

#[test]
fn assignment_without_a_setter_is_an_attribute_error() {
    let err = eval_err("class C { init { } }; C().x = 1");
    assert_eq!(err.kind(), "AttributeError");
    assert_eq!(err.message(), "'C' object has no attribute 'x'");
}

#[test]
fn operator_methods_dispatch() {
    let result = eval(
        "class Vec { init(x) { @x = x } get x; operator + (o) { Vec(@x + o.x) } };
         (Vec(1) + Vec(2)).x",
    );
    assert_eq!(result, Object::Int(3));
}

#[test]
fn reflected_operator_methods_take_the_right_operand() {
    let result = eval(
        "class Scale { init(k) { @k = k } operator r* (n) { @k * n } };
         5 * Scale(3)",
    );
    assert_eq!(result, Object::Int(15));
}

#[test]
fn operator_cascade_reports_both_classes() {
    let err = eval_err("class C { init { } }; C() + 1");
    assert_eq!(err.kind(), "TypeError");
    assert_eq!(err.message(), "Unsupported classes for '+': C and Integer");
}

#[test]
fn final_classes_cannot_be_extended() {
    let err = eval_err("class S: String { }");
    assert_eq!(err.kind(), "ParameterError");
    assert_eq!(err.message(), "Cannot extend a final class");
}

#[test]
fn superclass_must_be_a_class() {
    let err = eval_err("class C: 42 { }");
    assert_eq!(err.kind(), "ParameterError");
    assert_eq!(err.message(), "Invalid superclass");
}

#[test]
fn duplicate_class_name_is_a_name_error() {
    let err = eval_err("class C { }; class C { }");
    assert_eq!(err.kind(), "NameError");
    assert_eq!(err.message(), "Identifier 'C' already declared");
}

#[test]
fn private_constructors_reject_direct_calls() {
    let err = eval_err("class C { private init { } }; C()");
    assert_eq!(err.kind(), "TypeError");
    assert_eq!(err.message(), "The constructor of this class is private");

    let err = eval_err("String()");
    assert_eq!(err.message(), "The constructor of this class is private");
}

#[test]
fn subclasses_may_call_a_private_constructor_through_super() {
    let result = eval(
        "class C { private init { @v = 9 } get v; };
         class D: C { init { super() } };
         D().v",
    );
    assert_eq!(result, Object::Int(9));
}

#[test]
fn constructor_exceptions_propagate() {
    let err = eval_err("class C { init { 1 / 0 } }; C()");
    assert_eq!(err.kind(), "ZeroDivisionError");
}

#[test]
fn user_exception_subclasses() {
    let result = eval(
        "class MyError: ValueError { init(m) { super(m) } };
         MyError(\"bad\").message",
    );
    assert_eq!(result, Object::Str("bad".to_owned()));

    assert_eq!(
        eval(
            "class MyError: ValueError { init(m) { super(m) } };
             MyError(\"bad\") instanceof ValueError"
        ),
        Object::Bool(true)
    );
}

#[test]
fn exception_constructor_requires_a_string() {
    let err = eval_err("Exception(42)");
    assert_eq!(err.kind(), "TypeError");
    assert_eq!(err.message(), "Expected a String");
}

#[test]
fn native_exception_objects_are_immutable() {
    let err = eval_err("TypeError(\"x\").message = \"y\"");
    assert_eq!(err.kind(), "TypeError");
    assert_eq!(err.message(), "'TypeError' objects are immutables");
}

#[test]
fn class_objects_expose_name_and_superclass() {
    assert_eq!(eval("class C { }; C.name"), Object::Str("C".to_owned()));
    assert_eq!(
        eval("class A { }; class B: A { }; B.superclass.name"),
        Object::Str("A".to_owned())
    );
    assert_eq!(eval("Object.superclass"), Object::Null);
}

#[test]
fn exception_hierarchy_is_rooted_at_exception() {
    assert_eq!(eval("TypeError.superclass.name"), Object::Str("Exception".to_owned()));
    assert_eq!(eval("Exception.superclass.name"), Object::Str("Object".to_owned()));
}

#[test]
fn instances_render_by_class_name() {
    assert_eq!(
        eval("class Widget { init { } }; Widget()"),
        Object::Instance {
            class: "Widget".to_owned()
        }
    );
    assert_eq!(eval("class Widget { init { } }; Widget().toString"),
        Object::Str("<Widget>".to_owned()));
}
