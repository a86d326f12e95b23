//! Conversion between native values and PostgreSQL text.
//!
//! Every type is handled by a codec describing it through [`ValueType`] and
//! implementing some of:
//!
//! - [`ValueSerializer`]: value to SQL expression text, spliced into patterns
//! - [`ValueParser`]: wire text (as returned by the server) to value
//! - [`TextEncoder`]: value to wire text, the inverse of [`ValueParser`]
//!
//! [`ArrayCodec`] and [`RangeCodec`] wrap an element codec and delegate to
//! it for each element or bound.

pub mod array;
pub mod range;
mod scalar;

pub use array::{dimensions, ArrayCodec, Element, MAX_DIMENSIONS};
pub use range::{Bounds, Canonicalize, Continuous, Discrete, Range, RangeCodec, Step};
pub use scalar::{BoolCodec, IntegerCodec, TextCodec};

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::fmt;

/// A possibly schema-qualified type name, optionally denoting the array type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    schema: Option<String>,
    name: String,
    array: bool,
}

impl TypeName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
            array: false,
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            array: false,
        }
    }

    /// The array type over this type.
    pub fn array(&self) -> Self {
        Self {
            array: true,
            ..self.clone()
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_array(&self) -> bool {
        self.array
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", quote_ident(schema))?;
        }
        f.write_str(&quote_ident(&self.name))?;
        if self.array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Quotes an identifier unless it is a plain lowercase one.
pub fn quote_ident(ident: &str) -> Cow<'_, str> {
    let mut chars = ident.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');
    if plain {
        Cow::Borrowed(ident)
    } else {
        Cow::Owned(format!("\"{}\"", ident.replace('"', "\"\"")))
    }
}

/// Renders a string literal, doubling embedded single quotes.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Describes the type a codec converts.
pub trait ValueType {
    /// Native representation of the type's values.
    type Value;

    fn type_name(&self) -> &TypeName;
}

/// Converts values into SQL expression text.
pub trait ValueSerializer: ValueType {
    /// Serializes `value`.
    ///
    /// With `standalone` set, the result must be usable anywhere in a
    /// statement, so it carries an explicit cast where the literal alone
    /// would not determine the type. Otherwise the surrounding expression
    /// supplies the type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `value` lies outside the type's
    /// domain.
    fn serialize(&self, value: &Self::Value, standalone: bool) -> Result<String>;

    /// Serializes an optional value, rendering `None` as `NULL`.
    fn serialize_nullable(&self, value: Option<&Self::Value>, standalone: bool) -> Result<String> {
        match value {
            Some(value) => self.serialize(value, standalone),
            None if standalone => Ok(format!("NULL::{}", self.type_name())),
            None => Ok("NULL".to_owned()),
        }
    }
}

/// Converts wire text into values.
pub trait ValueParser: ValueType {
    /// Parses the text representation of a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] with the offset of the offending character
    /// when `text` does not match the type's grammar.
    fn parse(&self, text: &str) -> Result<Self::Value>;

    /// Parses a column value, where `None` is SQL NULL.
    fn parse_nullable(&self, text: Option<&str>) -> Result<Option<Self::Value>> {
        text.map(|text| self.parse(text)).transpose()
    }
}

/// Converts values into wire text, the form [`ValueParser`] accepts.
pub trait TextEncoder: ValueType {
    fn encode_text(&self, value: &Self::Value) -> Result<String>;
}

impl<C: ValueType + ?Sized> ValueType for &C {
    type Value = C::Value;

    fn type_name(&self) -> &TypeName {
        (**self).type_name()
    }
}

impl<C: ValueSerializer + ?Sized> ValueSerializer for &C {
    fn serialize(&self, value: &Self::Value, standalone: bool) -> Result<String> {
        (**self).serialize(value, standalone)
    }
}

impl<C: ValueParser + ?Sized> ValueParser for &C {
    fn parse(&self, text: &str) -> Result<Self::Value> {
        (**self).parse(text)
    }
}

impl<C: TextEncoder + ?Sized> TextEncoder for &C {
    fn encode_text(&self, value: &Self::Value) -> Result<String> {
        (**self).encode_text(value)
    }
}

/// Character-level reader over wire text, tracking the byte offset.
#[derive(Debug)]
pub(crate) struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    pub(crate) fn expect(&mut self, expected: char) -> Result<()> {
        let at = self.pos;
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(Error::parse(at, format!("expected {expected:?}, found {c:?}"))),
            None => Err(Error::parse(at, format!("expected {expected:?}, found end of input"))),
        }
    }

    pub(crate) fn expect_end(&mut self) -> Result<()> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(Error::parse(self.pos, format!("unexpected {c:?} after value"))),
        }
    }

    /// Reads a `"`-quoted token, resolving backslash escapes.
    pub(crate) fn read_quoted(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect('"')?;
        let mut token = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(token),
                Some('\\') => match self.bump() {
                    Some(c) => token.push(c),
                    None => break,
                },
                Some(c) => token.push(c),
                None => break,
            }
        }
        Err(Error::parse(start, "unterminated quoted value"))
    }
}

/// Quotes a wire-text token for embedding in array or range text, if needed.
pub(crate) fn quote_token(token: &str, needs_quotes: impl Fn(char) -> bool) -> Cow<'_, str> {
    if !token.is_empty() && !token.chars().any(|c| c.is_whitespace() || needs_quotes(c)) {
        return Cow::Borrowed(token);
    }
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    for c in token.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}
