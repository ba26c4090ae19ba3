//! Parser for type shapes written as strings.
//!
//! ```text
//! shape := IDENT ( '<' shape ( ',' shape )* '>' )?
//! ```
//!
//! Identifiers that name a parameter of the enclosing definition become
//! [`Ty::Param`]; every other identifier is a nominal constructor. Whether
//! constructors exist is checked later, against the whole universe.

use genbind_types::{Ty, TyCon};

/// Parameters visible while parsing a shape.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scope<'a> {
    owner: &'a str,
    params: &'a [String],
}

impl<'a> Scope<'a> {
    /// A scope without parameters. Every identifier is a constructor.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The parameters of `owner`, by position.
    pub fn of(owner: &'a str, params: &'a [String]) -> Self {
        Scope { owner, params }
    }

    fn lookup(&self, name: &str) -> Option<Ty> {
        let position = self.params.iter().position(|p| p == name)?;
        Some(Ty::param(self.owner, position as u32, name))
    }
}

/// A syntax error at a byte offset inside the shape string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeError {
    pub message: String,
    pub offset: usize,
}

/// Parse a complete shape. Trailing input is an error.
pub fn parse_shape(input: &str, scope: Scope<'_>) -> Result<Ty, ShapeError> {
    let mut parser = Parser {
        cursor: Cursor::new(input),
        scope,
    };
    let ty = parser.shape()?;
    parser.skip_ws();
    match parser.cursor.peek() {
        None => Ok(ty),
        Some(c) => Err(parser.error(format!("unexpected `{}` after shape", c))),
    }
}

struct Cursor<'src> {
    source: &'src str,
    pos: usize,
    chars: std::str::Chars<'src>,
}

impl<'src> Cursor<'src> {
    fn new(source: &'src str) -> Self {
        Cursor {
            source,
            pos: 0,
            chars: source.chars(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.advance();
        }
    }

    fn slice(&self, start: usize) -> &'src str {
        &self.source[start..self.pos]
    }
}

struct Parser<'src, 'a> {
    cursor: Cursor<'src>,
    scope: Scope<'a>,
}

impl Parser<'_, '_> {
    fn error(&self, message: String) -> ShapeError {
        ShapeError {
            message,
            offset: self.cursor.pos,
        }
    }

    fn skip_ws(&mut self) {
        self.cursor.eat_while(char::is_whitespace);
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.cursor.peek() == Some(expected) {
            self.cursor.advance();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<&str, ShapeError> {
        self.skip_ws();
        let start = self.cursor.pos;
        match self.cursor.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            Some(c) => return Err(self.error(format!("expected a type name, found `{}`", c))),
            None => return Err(self.error("expected a type name".to_string())),
        }
        self.cursor
            .eat_while(|c| c.is_alphanumeric() || c == '_' || c == '.');
        Ok(self.cursor.slice(start))
    }

    fn shape(&mut self) -> Result<Ty, ShapeError> {
        let start = self.cursor.pos;
        let name = self.ident()?.to_string();
        if !self.eat('<') {
            return Ok(self
                .scope
                .lookup(&name)
                .unwrap_or_else(|| Ty::Con(TyCon::new(name), Vec::new())));
        }
        if self.scope.lookup(&name).is_some() {
            return Err(ShapeError {
                message: format!("parameter `{}` cannot take arguments", name),
                offset: start,
            });
        }
        let mut args = vec![self.shape()?];
        while self.eat(',') {
            args.push(self.shape()?);
        }
        if !self.eat('>') {
            return Err(match self.cursor.peek() {
                Some(c) => self.error(format!("expected `,` or `>`, found `{}`", c)),
                None => self.error("unclosed `<`".to_string()),
            });
        }
        Ok(Ty::Con(TyCon::new(name), args))
    }
}
