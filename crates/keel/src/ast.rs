//! Abstract syntax tree produced by the parser and walked by the evaluator.

use std::rc::Rc;

use strum::IntoStaticStr;

/// Binary and unary operators of the language.
///
/// `strum::IntoStaticStr` supplies the surface spelling, which is also used to
/// synthesize operator method names (`"operator +"`, `"operator r+"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
pub(crate) enum Operator {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "*")]
    Star,
    #[strum(serialize = "/")]
    Slash,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "<=")]
    LtEq,
    #[strum(serialize = ">=")]
    GtEq,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "not")]
    Not,
    #[strum(serialize = "instanceof")]
    InstanceOf,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A function literal: anonymous or named, with the body shared so closures
/// can outlive the program tree they were parsed from.
#[derive(Debug)]
pub(crate) struct FunctionNode {
    /// Present for `fun name(...) {...}`; used for diagnostics and statement
    /// level binding.
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Node>,
}

/// One member of a class body.
#[derive(Debug)]
pub(crate) struct MemberNode {
    pub name: String,
    pub private: bool,
    pub init: bool,
    pub getter: bool,
    pub setter: bool,
    /// `None` for default getters/setters (`get x;` / `set x;`), which read or
    /// write the like-named field directly.
    pub function: Option<Rc<FunctionNode>>,
}

#[derive(Debug)]
pub(crate) struct ClassNode {
    pub name: String,
    /// Superclass expression; defaults to the root `Object` class.
    pub superclass: Option<Node>,
    pub members: Vec<MemberNode>,
}

#[derive(Debug, Clone)]
pub(crate) struct ExceptClause {
    /// Exception class expressions; an empty list matches every exception.
    pub classes: Vec<Node>,
    /// Name the caught exception is bound to, if any.
    pub variable: Option<String>,
    pub body: Node,
}

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Identifier(String),
    /// Statement list; evaluates in a fresh child scope, value of the last
    /// child (or null when empty).
    Sequence(Vec<Node>),
    Var {
        name: String,
        init: Option<Box<Node>>,
    },
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    Member {
        object: Box<Node>,
        name: String,
    },
    SelfExpr,
    /// Only valid as the callee of a call or the object of a member access;
    /// the parser rejects it anywhere else.
    Super,
    Superclass,
    Function(Rc<FunctionNode>),
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Unary {
        op: Operator,
        operand: Box<Node>,
    },
    Binary {
        left: Box<Node>,
        op: Operator,
        right: Box<Node>,
    },
    Class(Rc<ClassNode>),
    If {
        /// `(test, expression)` pairs, tried in order.
        branches: Vec<(Node, Node)>,
        else_body: Option<Box<Node>>,
    },
    Try {
        body: Box<Node>,
        excepts: Vec<ExceptClause>,
        else_body: Option<Box<Node>>,
        finally: Option<Box<Node>>,
    },
    Import {
        /// 0 for built-in modules, otherwise the number of leading dots.
        level: u32,
        name: String,
    },
    Export {
        name: String,
        value: Option<Box<Node>>,
    },
}
