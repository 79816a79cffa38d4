//! Hand-written scanner turning source text into a token stream.

use std::fmt;

use strum::{Display, EnumString};

/// Source position, 1-based, attached to every token and to syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pos {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Reserved words. The string form is the lowercase keyword itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Keyword {
    Var,
    Fun,
    Class,
    Init,
    Get,
    Set,
    Private,
    Operator,
    If,
    Else,
    Try,
    Except,
    Finally,
    Import,
    Export,
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Instanceof,
    Superclass,
    Super,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Kw(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,
    At,
    Plus,
    Minus,
    Star,
    Slash,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eof,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "{name}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(_) => write!(f, "string literal"),
            Self::Kw(kw) => write!(f, "{kw}"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::LBrace => write!(f, "{{"),
            Self::RBrace => write!(f, "}}"),
            Self::Comma => write!(f, ","),
            Self::Semi => write!(f, ";"),
            Self::Colon => write!(f, ":"),
            Self::Dot => write!(f, "."),
            Self::At => write!(f, "@"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::PlusEq => write!(f, "+="),
            Self::MinusEq => write!(f, "-="),
            Self::StarEq => write!(f, "*="),
            Self::SlashEq => write!(f, "/="),
            Self::Assign => write!(f, "="),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Gt => write!(f, ">"),
            Self::LtEq => write!(f, "<="),
            Self::GtEq => write!(f, ">="),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// A lexing or parsing failure; surfaced to language code as a `SyntaxError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxErr {
    pub message: String,
    pub pos: Pos,
}

impl SyntaxErr {
    pub fn new(message: impl Into<String>, pos: Pos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

impl fmt::Display for SyntaxErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.pos)
    }
}

pub(crate) struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    pos: Pos,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            pos: Pos { line: 1, column: 1 },
        }
    }

    /// Scans the whole input, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<(Tok, Pos)>, SyntaxErr> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let pos = self.pos;
            let Some(&c) = self.chars.peek() else {
                tokens.push((Tok::Eof, pos));
                return Ok(tokens);
            };
            let tok = match c {
                '0'..='9' => self.number(pos)?,
                '"' => self.string(pos)?,
                c if c == '_' || c.is_alphabetic() => self.word(),
                _ => self.punct(pos)?,
            };
            tokens.push((tok, pos));
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxErr> {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some('/') => {
                            while let Some(&c) = self.chars.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            let start = self.pos;
                            self.bump();
                            self.bump();
                            loop {
                                match self.bump() {
                                    Some('*') if self.eat('/') => break,
                                    Some(_) => {}
                                    None => {
                                        return Err(SyntaxErr::new("Unterminated comment", start));
                                    }
                                }
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn word(&mut self) -> Tok {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '_' || c.is_alphanumeric() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        match text.parse::<Keyword>() {
            Ok(kw) => Tok::Kw(kw),
            Err(_) => Tok::Ident(text),
        }
    }

    fn number(&mut self, pos: Pos) -> Result<Tok, SyntaxErr> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let mut is_float = false;
        // A dot starts a fractional part only when a digit follows, so that
        // `1.toString` stays a member access on the integer 1.
        if self.chars.peek() == Some(&'.') {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            if lookahead.peek().is_some_and(char::is_ascii_digit) {
                is_float = true;
                text.push('.');
                self.bump();
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        if matches!(self.chars.peek(), Some('e' | 'E')) {
            let mut lookahead = self.chars.clone();
            lookahead.next();
            let after_sign = if matches!(lookahead.peek(), Some('+' | '-')) {
                lookahead.next();
                lookahead.peek()
            } else {
                lookahead.peek()
            };
            if after_sign.is_some_and(char::is_ascii_digit) {
                is_float = true;
                text.push(self.bump().expect("peeked"));
                if matches!(self.chars.peek(), Some('+' | '-')) {
                    text.push(self.bump().expect("peeked"));
                }
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
            }
        }
        if is_float {
            text.parse::<f64>()
                .map(Tok::Float)
                .map_err(|_| SyntaxErr::new(format!("Invalid float literal '{text}'"), pos))
        } else {
            text.parse::<i64>()
                .map(Tok::Int)
                .map_err(|_| SyntaxErr::new(format!("Integer literal '{text}' is out of range"), pos))
        }
    }

    fn string(&mut self, pos: Pos) -> Result<Tok, SyntaxErr> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Tok::Str(text)),
                Some('\\') => {
                    let escape_pos = self.pos;
                    match self.bump() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some('r') => text.push('\r'),
                        Some('0') => text.push('\0'),
                        Some('\\') => text.push('\\'),
                        Some('"') => text.push('"'),
                        Some(c) => {
                            return Err(SyntaxErr::new(format!("Unknown escape '\\{c}'"), escape_pos));
                        }
                        None => return Err(SyntaxErr::new("Unterminated string literal", pos)),
                    }
                }
                Some(c) => text.push(c),
                None => return Err(SyntaxErr::new("Unterminated string literal", pos)),
            }
        }
    }

    fn punct(&mut self, pos: Pos) -> Result<Tok, SyntaxErr> {
        let c = self.bump().expect("peeked");
        let tok = match c {
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '{' => Tok::LBrace,
            '}' => Tok::RBrace,
            ',' => Tok::Comma,
            ';' => Tok::Semi,
            ':' => Tok::Colon,
            '.' => Tok::Dot,
            '@' => Tok::At,
            '+' => {
                if self.eat('=') {
                    Tok::PlusEq
                } else {
                    Tok::Plus
                }
            }
            '-' => {
                if self.eat('=') {
                    Tok::MinusEq
                } else {
                    Tok::Minus
                }
            }
            '*' => {
                if self.eat('=') {
                    Tok::StarEq
                } else {
                    Tok::Star
                }
            }
            '/' => {
                if self.eat('=') {
                    Tok::SlashEq
                } else {
                    Tok::Slash
                }
            }
            '=' => {
                if self.eat('=') {
                    Tok::EqEq
                } else {
                    Tok::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    Tok::NotEq
                } else {
                    return Err(SyntaxErr::new("Unexpected character '!'", pos));
                }
            }
            '<' => {
                if self.eat('=') {
                    Tok::LtEq
                } else {
                    Tok::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Tok::GtEq
                } else {
                    Tok::Gt
                }
            }
            other => {
                return Err(SyntaxErr::new(format!("Unexpected character '{other}'"), pos));
            }
        };
        Ok(tok)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn lex(source: &str) -> Vec<Tok> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|(tok, _)| tok)
            .collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            lex("var xvar = true"),
            vec![
                Tok::Kw(Keyword::Var),
                Tok::Ident("xvar".to_owned()),
                Tok::Assign,
                Tok::Kw(Keyword::True),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            lex("12 3.5 1e3 7."),
            vec![
                Tok::Int(12),
                Tok::Float(3.5),
                Tok::Float(1000.0),
                Tok::Int(7),
                Tok::Dot,
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn integer_member_access_is_not_a_float() {
        assert_eq!(
            lex("1.toString"),
            vec![Tok::Int(1), Tok::Dot, Tok::Ident("toString".to_owned()), Tok::Eof]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(lex(r#""a\n\"b\"""#), vec![Tok::Str("a\n\"b\"".to_owned()), Tok::Eof]);
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            lex("1 // one\n/* two \n three */ 2"),
            vec![Tok::Int(1), Tok::Int(2), Tok::Eof]
        );
    }

    #[test]
    fn compound_assignment_operators() {
        assert_eq!(
            lex("a += 1; a /= 2"),
            vec![
                Tok::Ident("a".to_owned()),
                Tok::PlusEq,
                Tok::Int(1),
                Tok::Semi,
                Tok::Ident("a".to_owned()),
                Tok::SlashEq,
                Tok::Int(2),
                Tok::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = Lexer::new("\n  \"abc").tokenize().unwrap_err();
        assert_eq!(err.pos, Pos { line: 2, column: 3 });
    }

    #[test]
    fn int_literal_overflow_is_rejected() {
        let err = Lexer::new("9223372036854775808").tokenize().unwrap_err();
        assert!(err.message.contains("out of range"));
    }
}
