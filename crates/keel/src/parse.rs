//! Recursive-descent parser producing the evaluator's AST.

use std::rc::Rc;

use crate::{
    ast::{ClassNode, ExceptClause, FunctionNode, MemberNode, Node, Operator},
    lexer::{Keyword, Lexer, Pos, SyntaxErr, Tok},
};

/// Parses a whole program: statements separated by `;`.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, SyntaxErr> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, index: 0 };
    let nodes = parser.sequence_items(&Tok::Eof)?;
    parser.expect(&Tok::Eof)?;
    Ok(nodes)
}

struct Parser {
    tokens: Vec<(Tok, Pos)>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.tokens[self.index].0
    }

    fn pos(&self) -> Pos {
        self.tokens[self.index].1
    }

    fn bump(&mut self) -> Tok {
        let tok = self.tokens[self.index].0.clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        self.eat(&Tok::Kw(kw))
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), SyntaxErr> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{tok}'")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, SyntaxErr> {
        if let Tok::Ident(_) = self.peek() {
            match self.bump() {
                Tok::Ident(name) => Ok(name),
                _ => unreachable!("peeked an identifier"),
            }
        } else {
            Err(self.unexpected(&format!("expected {what}")))
        }
    }

    fn unexpected(&self, context: &str) -> SyntaxErr {
        SyntaxErr::new(format!("Unexpected token '{}', {context}", self.peek()), self.pos())
    }

    /// Statements until `terminator`, separated by semicolons. Trailing and
    /// repeated semicolons are tolerated.
    fn sequence_items(&mut self, terminator: &Tok) -> Result<Vec<Node>, SyntaxErr> {
        let mut items = Vec::new();
        while self.eat(&Tok::Semi) {}
        while self.peek() != terminator {
            items.push(self.expression()?);
            if self.peek() == terminator {
                break;
            }
            if !self.eat(&Tok::Semi) {
                return Err(self.unexpected("expected ';'"));
            }
            while self.eat(&Tok::Semi) {}
        }
        Ok(items)
    }

    fn expression(&mut self) -> Result<Node, SyntaxErr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Node, SyntaxErr> {
        let left = self.or_expr()?;
        let compound = match self.peek() {
            Tok::Assign => None,
            Tok::PlusEq => Some(Operator::Plus),
            Tok::MinusEq => Some(Operator::Minus),
            Tok::StarEq => Some(Operator::Star),
            Tok::SlashEq => Some(Operator::Slash),
            _ => return Ok(left),
        };
        let pos = self.pos();
        self.bump();
        if !matches!(left, Node::Identifier(_) | Node::Member { .. }) {
            return Err(SyntaxErr::new("Invalid assignment target", pos));
        }
        let right = self.assignment()?;
        let value = match compound {
            // `a += b` is plain sugar for `a = a + b`.
            Some(op) => Node::Binary {
                left: Box::new(left.clone()),
                op,
                right: Box::new(right),
            },
            None => right,
        };
        Ok(Node::Assign {
            target: Box::new(left),
            value: Box::new(value),
        })
    }

    fn or_expr(&mut self) -> Result<Node, SyntaxErr> {
        let mut left = self.and_expr()?;
        while self.eat_kw(Keyword::Or) {
            let right = self.and_expr()?;
            left = binary(left, Operator::Or, right);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Node, SyntaxErr> {
        let mut left = self.equality()?;
        while self.eat_kw(Keyword::And) {
            let right = self.equality()?;
            left = binary(left, Operator::And, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Node, SyntaxErr> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Tok::EqEq => Operator::Eq,
                Tok::NotEq => Operator::NotEq,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.comparison()?;
            left = binary(left, op, right);
        }
    }

    fn comparison(&mut self) -> Result<Node, SyntaxErr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Tok::Lt => Operator::Lt,
                Tok::Gt => Operator::Gt,
                Tok::LtEq => Operator::LtEq,
                Tok::GtEq => Operator::GtEq,
                Tok::Kw(Keyword::Instanceof) => Operator::InstanceOf,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.additive()?;
            left = binary(left, op, right);
        }
    }

    fn additive(&mut self) -> Result<Node, SyntaxErr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => Operator::Plus,
                Tok::Minus => Operator::Minus,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.multiplicative()?;
            left = binary(left, op, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Node, SyntaxErr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Tok::Star => Operator::Star,
                Tok::Slash => Operator::Slash,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.unary()?;
            left = binary(left, op, right);
        }
    }

    fn unary(&mut self) -> Result<Node, SyntaxErr> {
        let op = match self.peek() {
            Tok::Minus => Operator::Minus,
            Tok::Plus => Operator::Plus,
            Tok::Kw(Keyword::Not) => Operator::Not,
            _ => return self.postfix(),
        };
        self.bump();
        let operand = self.unary()?;
        Ok(Node::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Node, SyntaxErr> {
        let pos = self.pos();
        let mut node = self.primary()?;
        loop {
            if self.eat(&Tok::Dot) {
                let name = self.expect_ident("a member name")?;
                node = Node::Member {
                    object: Box::new(node),
                    name,
                };
            } else if self.peek() == &Tok::LParen {
                self.bump();
                let args = self.call_args()?;
                node = Node::Call {
                    callee: Box::new(node),
                    args,
                };
            } else {
                break;
            }
        }
        if matches!(node, Node::Super) {
            return Err(SyntaxErr::new("'super' is only valid in a call or member access", pos));
        }
        Ok(node)
    }

    fn call_args(&mut self) -> Result<Vec<Node>, SyntaxErr> {
        let mut args = Vec::new();
        if self.eat(&Tok::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Tok::RParen) {
                return Ok(args);
            }
            self.expect(&Tok::Comma)?;
        }
    }

    fn primary(&mut self) -> Result<Node, SyntaxErr> {
        match self.peek().clone() {
            Tok::Int(v) => {
                self.bump();
                Ok(Node::Int(v))
            }
            Tok::Float(v) => {
                self.bump();
                Ok(Node::Float(v))
            }
            Tok::Str(s) => {
                self.bump();
                Ok(Node::Str(s))
            }
            Tok::Ident(name) => {
                self.bump();
                Ok(Node::Identifier(name))
            }
            Tok::At => {
                self.bump();
                // `@name` is sugar for a member access on self.
                if let Tok::Ident(_) = self.peek() {
                    let name = self.expect_ident("a member name")?;
                    Ok(Node::Member {
                        object: Box::new(Node::SelfExpr),
                        name,
                    })
                } else {
                    Ok(Node::SelfExpr)
                }
            }
            Tok::LParen => {
                self.bump();
                let items = self.sequence_items(&Tok::RParen)?;
                self.expect(&Tok::RParen)?;
                Ok(Node::Sequence(items))
            }
            Tok::LBrace => {
                self.bump();
                let items = self.sequence_items(&Tok::RBrace)?;
                self.expect(&Tok::RBrace)?;
                Ok(Node::Sequence(items))
            }
            Tok::Kw(kw) => self.keyword_expr(kw),
            _ => Err(self.unexpected("expected an expression")),
        }
    }

    fn keyword_expr(&mut self, kw: Keyword) -> Result<Node, SyntaxErr> {
        match kw {
            Keyword::Null => {
                self.bump();
                Ok(Node::Null)
            }
            Keyword::True => {
                self.bump();
                Ok(Node::Bool(true))
            }
            Keyword::False => {
                self.bump();
                Ok(Node::Bool(false))
            }
            Keyword::Super => {
                self.bump();
                Ok(Node::Super)
            }
            Keyword::Superclass => {
                self.bump();
                Ok(Node::Superclass)
            }
            Keyword::Var => {
                self.bump();
                let name = self.expect_ident("a variable name")?;
                let init = if self.eat(&Tok::Assign) {
                    Some(Box::new(self.expression()?))
                } else {
                    None
                };
                Ok(Node::Var { name, init })
            }
            Keyword::Fun => self.function(),
            Keyword::Class => self.class_decl(),
            Keyword::If => self.if_expr(),
            Keyword::Try => self.try_expr(),
            Keyword::Import => {
                self.bump();
                let mut level = 0;
                while self.eat(&Tok::Dot) {
                    level += 1;
                }
                let name = self.expect_ident("a module name")?;
                Ok(Node::Import { level, name })
            }
            Keyword::Export => {
                self.bump();
                let name = self.expect_ident("a name")?;
                let value = if self.eat(&Tok::Assign) {
                    Some(Box::new(self.expression()?))
                } else {
                    None
                };
                Ok(Node::Export { name, value })
            }
            _ => Err(self.unexpected("expected an expression")),
        }
    }

    fn function(&mut self) -> Result<Node, SyntaxErr> {
        self.bump();
        let name = if let Tok::Ident(_) = self.peek() {
            Some(self.expect_ident("a function name")?)
        } else {
            None
        };
        let params = self.param_list()?;
        let body = self.block_body()?;
        let function = Node::Function(Rc::new(FunctionNode {
            name: name.clone(),
            params,
            body,
        }));
        // A named function declares itself, like a variable.
        match name {
            Some(name) => Ok(Node::Var {
                name,
                init: Some(Box::new(function)),
            }),
            None => Ok(function),
        }
    }

    fn param_list(&mut self) -> Result<Vec<String>, SyntaxErr> {
        self.expect(&Tok::LParen)?;
        let mut params = Vec::new();
        if self.eat(&Tok::RParen) {
            return Ok(params);
        }
        loop {
            params.push(self.expect_ident("a parameter name")?);
            if self.eat(&Tok::RParen) {
                return Ok(params);
            }
            self.expect(&Tok::Comma)?;
        }
    }

    fn block_body(&mut self) -> Result<Vec<Node>, SyntaxErr> {
        self.expect(&Tok::LBrace)?;
        let items = self.sequence_items(&Tok::RBrace)?;
        self.expect(&Tok::RBrace)?;
        Ok(items)
    }

    fn if_expr(&mut self) -> Result<Node, SyntaxErr> {
        let mut branches = Vec::new();
        let mut else_body = None;
        loop {
            self.bump();
            self.expect(&Tok::LParen)?;
            let test_items = self.sequence_items(&Tok::RParen)?;
            self.expect(&Tok::RParen)?;
            let test = Node::Sequence(test_items);
            let body = self.expression()?;
            branches.push((test, body));
            if !self.eat_kw(Keyword::Else) {
                break;
            }
            if self.peek() == &Tok::Kw(Keyword::If) {
                continue;
            }
            else_body = Some(Box::new(self.expression()?));
            break;
        }
        Ok(Node::If {
            branches,
            else_body,
        })
    }

    fn try_expr(&mut self) -> Result<Node, SyntaxErr> {
        self.bump();
        let body = self.expression()?;
        let mut excepts = Vec::new();
        while self.eat_kw(Keyword::Except) {
            let mut classes = Vec::new();
            if !matches!(self.peek(), Tok::LParen | Tok::LBrace) {
                loop {
                    classes.push(self.except_class()?);
                    if !self.eat(&Tok::Comma) {
                        break;
                    }
                }
            }
            let variable = if self.eat(&Tok::LParen) {
                let name = self.expect_ident("an exception variable name")?;
                self.expect(&Tok::RParen)?;
                Some(name)
            } else {
                None
            };
            let handler = self.expression()?;
            excepts.push(ExceptClause {
                classes,
                variable,
                body: handler,
            });
        }
        let else_body = if self.eat_kw(Keyword::Else) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        let finally = if self.eat_kw(Keyword::Finally) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        Ok(Node::Try {
            body: Box::new(body),
            excepts,
            else_body,
            finally,
        })
    }

    /// An exception class reference: an identifier or a member path. Calls
    /// are excluded so `except E (e)` keeps `(e)` as the binding, not an
    /// argument list.
    fn except_class(&mut self) -> Result<Node, SyntaxErr> {
        let mut node = Node::Identifier(self.expect_ident("an exception class")?);
        while self.eat(&Tok::Dot) {
            let name = self.expect_ident("a member name")?;
            node = Node::Member {
                object: Box::new(node),
                name,
            };
        }
        Ok(node)
    }

    fn class_decl(&mut self) -> Result<Node, SyntaxErr> {
        self.bump();
        let name = self.expect_ident("a class name")?;
        let superclass = if self.eat(&Tok::Colon) {
            Some(self.postfix()?)
        } else {
            None
        };
        self.expect(&Tok::LBrace)?;
        let mut members = Vec::new();
        loop {
            while self.eat(&Tok::Semi) {}
            if self.eat(&Tok::RBrace) {
                break;
            }
            members.push(self.class_member()?);
        }
        Ok(Node::Class(Rc::new(ClassNode {
            name,
            superclass,
            members,
        })))
    }

    fn class_member(&mut self) -> Result<MemberNode, SyntaxErr> {
        let private = self.eat_kw(Keyword::Private);
        if self.eat_kw(Keyword::Init) {
            let params = if self.peek() == &Tok::LParen {
                self.param_list()?
            } else {
                Vec::new()
            };
            let body = self.block_body()?;
            return Ok(MemberNode {
                name: "init".to_owned(),
                private,
                init: true,
                getter: false,
                setter: false,
                function: Some(Rc::new(FunctionNode {
                    name: Some("init".to_owned()),
                    params,
                    body,
                })),
            });
        }
        if self.eat_kw(Keyword::Get) {
            let name = self.expect_ident("a getter name")?;
            let function = if self.eat(&Tok::Semi) {
                None
            } else {
                let body = self.block_body()?;
                Some(Rc::new(FunctionNode {
                    name: Some(name.clone()),
                    params: Vec::new(),
                    body,
                }))
            };
            return Ok(MemberNode {
                name,
                private,
                init: false,
                getter: true,
                setter: false,
                function,
            });
        }
        if self.eat_kw(Keyword::Set) {
            let name = self.expect_ident("a setter name")?;
            let function = if self.eat(&Tok::Semi) {
                None
            } else {
                let params = self.param_list()?;
                let pos = self.pos();
                if params.len() != 1 {
                    return Err(SyntaxErr::new("A setter takes exactly one parameter", pos));
                }
                let body = self.block_body()?;
                Some(Rc::new(FunctionNode {
                    name: Some(name.clone()),
                    params,
                    body,
                }))
            };
            return Ok(MemberNode {
                name,
                private,
                init: false,
                getter: false,
                setter: true,
                function,
            });
        }
        if self.eat_kw(Keyword::Operator) {
            let name = self.operator_method_name()?;
            let params = self.param_list()?;
            let pos = self.pos();
            if params.len() != 1 {
                return Err(SyntaxErr::new("An operator method takes exactly one parameter", pos));
            }
            let body = self.block_body()?;
            return Ok(MemberNode {
                name: name.clone(),
                private,
                init: false,
                getter: false,
                setter: false,
                function: Some(Rc::new(FunctionNode {
                    name: Some(name),
                    params,
                    body,
                })),
            });
        }
        let name = self.expect_ident("a member name")?;
        let params = self.param_list()?;
        let body = self.block_body()?;
        Ok(MemberNode {
            name: name.clone(),
            private,
            init: false,
            getter: false,
            setter: false,
            function: Some(Rc::new(FunctionNode {
                name: Some(name),
                params,
                body,
            })),
        })
    }

    /// Parses the spelled operator of an `operator` member, including the
    /// reflected `r` prefix: `operator +`, `operator r+`, `operator ==`, ...
    fn operator_method_name(&mut self) -> Result<String, SyntaxErr> {
        let reflected = matches!(self.peek(), Tok::Ident(name) if name == "r");
        if reflected {
            self.bump();
        }
        let op = match self.peek() {
            Tok::Plus => Operator::Plus,
            Tok::Minus => Operator::Minus,
            Tok::Star => Operator::Star,
            Tok::Slash => Operator::Slash,
            Tok::EqEq => Operator::Eq,
            Tok::NotEq => Operator::NotEq,
            Tok::Lt => Operator::Lt,
            Tok::Gt => Operator::Gt,
            Tok::LtEq => Operator::LtEq,
            Tok::GtEq => Operator::GtEq,
            _ => return Err(self.unexpected("expected an operator")),
        };
        self.bump();
        let name = if reflected {
            format!("operator r{}", op.as_str())
        } else {
            format!("operator {}", op.as_str())
        };
        Ok(name)
    }
}

fn binary(left: Node, op: Operator, right: Node) -> Node {
    Node::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_var_and_arithmetic() {
        let nodes = parse("var x = 1; x = x + 2; x").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[0], Node::Var { name, init: Some(_) } if name == "x"));
        assert!(matches!(&nodes[1], Node::Assign { .. }));
        assert!(matches!(&nodes[2], Node::Identifier(name) if name == "x"));
    }

    #[test]
    fn precedence_of_mul_over_add() {
        let nodes = parse("1 + 2 * 3").unwrap();
        let Node::Binary { op, right, .. } = &nodes[0] else {
            panic!("expected a binary node");
        };
        assert_eq!(*op, Operator::Plus);
        assert!(matches!(**right, Node::Binary { op: Operator::Star, .. }));
    }

    #[test]
    fn class_with_members() {
        let nodes = parse("class A { init { @x = 10 } get x; private helper(a) { a } set y(v) { v } }").unwrap();
        let Node::Class(class) = &nodes[0] else {
            panic!("expected a class node");
        };
        assert_eq!(class.name, "A");
        assert!(class.superclass.is_none());
        assert_eq!(class.members.len(), 4);
        assert!(class.members[0].init);
        assert!(class.members[1].getter && class.members[1].function.is_none());
        assert!(class.members[2].private);
        assert!(class.members[3].setter && class.members[3].function.is_some());
    }

    #[test]
    fn operator_member_names() {
        let nodes = parse("class V { operator + (o) { o } operator r* (o) { o } }").unwrap();
        let Node::Class(class) = &nodes[0] else {
            panic!("expected a class node");
        };
        assert_eq!(class.members[0].name, "operator +");
        assert_eq!(class.members[1].name, "operator r*");
    }

    #[test]
    fn self_member_sugar() {
        let nodes = parse("@x").unwrap();
        assert!(matches!(
            &nodes[0],
            Node::Member { object, name } if name == "x" && matches!(**object, Node::SelfExpr)
        ));
    }

    #[test]
    fn import_levels() {
        let nodes = parse("import math; import .sib; import ..up").unwrap();
        assert!(matches!(&nodes[0], Node::Import { level: 0, name } if name == "math"));
        assert!(matches!(&nodes[1], Node::Import { level: 1, name } if name == "sib"));
        assert!(matches!(&nodes[2], Node::Import { level: 2, name } if name == "up"));
    }

    #[test]
    fn try_except_finally() {
        let nodes = parse("try { a } except TypeError, ValueError (e) { e } else { 1 } finally { 2 }").unwrap();
        let Node::Try {
            excepts,
            else_body,
            finally,
            ..
        } = &nodes[0]
        else {
            panic!("expected a try node");
        };
        assert_eq!(excepts.len(), 1);
        assert_eq!(excepts[0].classes.len(), 2);
        assert_eq!(excepts[0].variable.as_deref(), Some("e"));
        assert!(else_body.is_some());
        assert!(finally.is_some());
    }

    #[test]
    fn bare_super_is_rejected() {
        let err = parse("super").unwrap_err();
        assert!(err.message.contains("super"));
    }

    #[test]
    fn compound_assignment_desugars() {
        let nodes = parse("x += 1").unwrap();
        let Node::Assign { value, .. } = &nodes[0] else {
            panic!("expected an assignment");
        };
        assert!(matches!(**value, Node::Binary { op: Operator::Plus, .. }));
    }

    #[test]
    fn named_function_declares_a_variable() {
        let nodes = parse("fun add(a, b) { a + b }").unwrap();
        assert!(matches!(&nodes[0], Node::Var { name, init: Some(_) } if name == "add"));
    }

    #[test]
    fn missing_semicolon_is_an_error() {
        assert!(parse("1 2").is_err());
    }
}
