//! Multi-dimensional arrays over an element codec.

use super::{quote_token, Cursor, TextEncoder, TypeName, ValueParser, ValueSerializer, ValueType};
use crate::error::{Error, Result};

/// One element of a (possibly nested) array value.
///
/// An array is a `Vec<Element<T>>`; a multi-dimensional array nests
/// [`Element::Array`] children, which must form a rectangle.
#[derive(Debug, Clone, PartialEq)]
pub enum Element<T> {
    Null,
    Value(T),
    Array(Vec<Element<T>>),
}

impl<T> Element<T> {
    pub fn is_array(&self) -> bool {
        matches!(self, Element::Array(_))
    }
}

impl<T> From<Option<T>> for Element<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Element::Null, Element::Value)
    }
}

impl<T> From<Vec<Element<T>>> for Element<T> {
    fn from(elements: Vec<Element<T>>) -> Self {
        Element::Array(elements)
    }
}

/// Most dimensions an array value may have.
pub const MAX_DIMENSIONS: usize = 6;

/// Returns the length of each dimension of a rectangular array.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] naming the first element, by index
/// path, whose shape differs from its siblings.
pub fn dimensions<T>(elements: &[Element<T>]) -> Result<Vec<usize>> {
    shape(elements, &mut Vec::new())
}

fn shape<T>(elements: &[Element<T>], path: &mut Vec<usize>) -> Result<Vec<usize>> {
    let mut dims = vec![elements.len()];
    match elements.first() {
        Some(Element::Array(first)) => {
            path.push(0);
            let inner = shape(first, path)?;
            path.pop();

            for (index, element) in elements.iter().enumerate().skip(1) {
                path.push(index);
                match element {
                    Element::Array(sibling) => {
                        let sibling_dims = shape(sibling, path)?;
                        if sibling_dims != inner {
                            return Err(Error::invalid(format!(
                                "array element {} has dimensions {sibling_dims:?} while its siblings have {inner:?}",
                                format_path(path)
                            )));
                        }
                    }
                    _ => {
                        return Err(Error::invalid(format!(
                            "array element {} is a scalar while its siblings are arrays",
                            format_path(path)
                        )))
                    }
                }
                path.pop();
            }
            dims.extend(inner);
        }
        _ => {
            if let Some(index) = elements.iter().position(Element::is_array) {
                path.push(index);
                return Err(Error::invalid(format!(
                    "array element {} is an array while its siblings are scalars",
                    format_path(path)
                )));
            }
        }
    }
    Ok(dims)
}

fn format_path(path: &[usize]) -> String {
    path.iter().map(|index| format!("[{index}]")).collect()
}

/// Codec for arrays of the type handled by the element codec `C`.
///
/// Serialization produces an `ARRAY[...]` constructor cast to the array
/// type; the wire form is the `{...}` literal with elements separated by the
/// type's delimiter.
///
/// # Examples
///
/// ```
/// use sql_pattern::codec::{ArrayCodec, Element, IntegerCodec, ValueParser, ValueSerializer};
///
/// let codec = ArrayCodec::new(IntegerCodec::int4());
/// let value = vec![Element::Value(3), Element::Null, Element::Value(1)];
///
/// assert_eq!(codec.serialize(&value, true)?, "ARRAY[3,NULL,1]::pg_catalog.int4[]");
/// assert_eq!(codec.parse("{3,NULL,1}")?, value);
/// # Ok::<(), sql_pattern::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ArrayCodec<C> {
    element: C,
    type_name: TypeName,
    delimiter: char,
}

impl<C: ValueType> ArrayCodec<C> {
    pub fn new(element: C) -> Self {
        let type_name = element.type_name().array();
        Self {
            element,
            type_name,
            delimiter: ',',
        }
    }

    /// Uses another element delimiter in the wire form (`box` uses `;`).
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn element_codec(&self) -> &C {
        &self.element
    }
}

impl<C: ValueType> ValueType for ArrayCodec<C> {
    type Value = Vec<Element<C::Value>>;

    fn type_name(&self) -> &TypeName {
        &self.type_name
    }
}

impl<C: ValueSerializer> ArrayCodec<C> {
    fn write_constructor(&self, elements: &[Element<C::Value>], out: &mut String) -> Result<()> {
        out.push_str("ARRAY[");
        for (index, element) in elements.iter().enumerate() {
            if index > 0 {
                out.push(',');
            }
            match element {
                Element::Null => out.push_str("NULL"),
                Element::Value(value) => out.push_str(&self.element.serialize(value, false)?),
                Element::Array(nested) => self.write_constructor(nested, out)?,
            }
        }
        out.push(']');
        Ok(())
    }
}

impl<C: ValueSerializer> ValueSerializer for ArrayCodec<C> {
    /// The cast to the array type is always emitted, since an empty
    /// constructor has no type of its own.
    fn serialize(&self, value: &Self::Value, _standalone: bool) -> Result<String> {
        dimensions(value)?;
        let mut out = String::new();
        self.write_constructor(value, &mut out)?;
        out.push_str("::");
        out.push_str(&self.type_name.to_string());
        Ok(out)
    }
}

impl<C: TextEncoder> ArrayCodec<C> {
    fn write_literal(&self, elements: &[Element<C::Value>], out: &mut String) -> Result<()> {
        out.push('{');
        for (index, element) in elements.iter().enumerate() {
            if index > 0 {
                out.push(self.delimiter);
            }
            match element {
                Element::Null => out.push_str("NULL"),
                Element::Value(value) => {
                    let text = self.element.encode_text(value)?;
                    if text.eq_ignore_ascii_case("NULL") {
                        out.push('"');
                        out.push_str(&text);
                        out.push('"');
                    } else {
                        let delimiter = self.delimiter;
                        out.push_str(&quote_token(&text, |c| {
                            c == delimiter || matches!(c, '{' | '}' | '"' | '\\')
                        }));
                    }
                }
                Element::Array(nested) => self.write_literal(nested, out)?,
            }
        }
        out.push('}');
        Ok(())
    }
}

impl<C: TextEncoder> TextEncoder for ArrayCodec<C> {
    fn encode_text(&self, value: &Self::Value) -> Result<String> {
        dimensions(value)?;
        let mut out = String::new();
        self.write_literal(value, &mut out)?;
        Ok(out)
    }
}

impl<C: ValueParser> ValueParser for ArrayCodec<C> {
    fn parse(&self, text: &str) -> Result<Self::Value> {
        let mut cursor = Cursor::new(text);
        cursor.skip_whitespace();
        skip_dimension_decoration(&mut cursor)?;
        let (elements, _) = self.read_array(&mut cursor, 1)?;
        cursor.expect_end()?;
        Ok(elements)
    }
}

impl<C: ValueParser> ArrayCodec<C> {
    /// Reads one brace-delimited level at nesting `depth`, returning its
    /// elements and dimensions. Siblings must all be scalars or all be
    /// sub-arrays of equal dimensions.
    fn read_array(&self, cursor: &mut Cursor<'_>, depth: usize) -> Result<(Vec<Element<C::Value>>, Vec<usize>)> {
        let start = cursor.pos();
        if depth > MAX_DIMENSIONS {
            return Err(Error::parse(
                start,
                format!("array nesting exceeds {MAX_DIMENSIONS} dimensions"),
            ));
        }
        cursor.expect('{')?;
        let mut elements = Vec::new();
        cursor.skip_whitespace();
        if cursor.peek() == Some('}') {
            cursor.bump();
            return Ok((elements, vec![0]));
        }

        // dimensions of the first sub-array, or None while reading scalars
        let mut inner: Option<Vec<usize>> = None;
        loop {
            cursor.skip_whitespace();
            let at = cursor.pos();
            let element = match cursor.peek() {
                Some('{') => {
                    let (children, dims) = self.read_array(cursor, depth + 1)?;
                    if let Some(expected) = &inner {
                        if *expected != dims {
                            return Err(Error::parse(
                                at,
                                format!("sub-array has dimensions {dims:?} while its siblings have {expected:?}"),
                            ));
                        }
                    } else if !elements.is_empty() {
                        return Err(Error::parse(at, "sub-array among scalar array elements"));
                    } else {
                        inner = Some(dims);
                    }
                    Element::Array(children)
                }
                Some(_) if inner.is_some() => {
                    return Err(Error::parse(at, "scalar among sub-array elements"));
                }
                Some('"') => {
                    let token = cursor.read_quoted()?;
                    Element::Value(self.element.parse(&token).map_err(|e| e.rebase(at + 1))?)
                }
                Some(_) => match self.read_unquoted(cursor) {
                    (token, _) if token.is_empty() => {
                        return Err(Error::parse(at, "missing array element"));
                    }
                    (token, false) if token.eq_ignore_ascii_case("NULL") => Element::Null,
                    (token, _) => Element::Value(self.element.parse(&token).map_err(|e| e.rebase(at))?),
                },
                None => break,
            };
            elements.push(element);

            cursor.skip_whitespace();
            let at = cursor.pos();
            match cursor.bump() {
                Some('}') => {
                    let mut dims = vec![elements.len()];
                    dims.extend(inner.unwrap_or_default());
                    return Ok((elements, dims));
                }
                Some(c) if c == self.delimiter => {}
                Some(c) => return Err(Error::parse(at, format!("unexpected {c:?} in array"))),
                None => break,
            }
        }
        Err(Error::parse(start, "unterminated array"))
    }

    /// Reads an unquoted element up to the next delimiter or closing brace.
    /// The flag tells whether the element contained backslash escapes.
    fn read_unquoted(&self, cursor: &mut Cursor<'_>) -> (String, bool) {
        let mut token = String::new();
        let mut escaped = false;
        // trailing whitespace is not part of the element unless escaped
        let mut kept = 0;
        while let Some(c) = cursor.peek() {
            if c == self.delimiter || c == '}' {
                break;
            }
            cursor.bump();
            if c == '\\' {
                if let Some(next) = cursor.bump() {
                    token.push(next);
                    escaped = true;
                    kept = token.len();
                }
            } else {
                token.push(c);
                if !c.is_whitespace() {
                    kept = token.len();
                }
            }
        }
        token.truncate(kept);
        (token, escaped)
    }
}

/// Skips a leading `[lower:upper]...=` bounds decoration.
fn skip_dimension_decoration(cursor: &mut Cursor<'_>) -> Result<()> {
    if cursor.peek() != Some('[') {
        return Ok(());
    }
    while cursor.peek() == Some('[') {
        let start = cursor.pos();
        loop {
            match cursor.bump() {
                Some(']') => break,
                Some(_) => {}
                None => return Err(Error::parse(start, "unterminated array dimension")),
            }
        }
    }
    cursor.skip_whitespace();
    cursor.expect('=')?;
    cursor.skip_whitespace();
    Ok(())
}
