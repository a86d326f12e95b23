//! Ranges over an ordered subtype.

use super::{quote_token, Cursor, TextEncoder, TypeName, ValueParser, ValueSerializer, ValueType};
use crate::error::{Error, Result};
use std::cmp::Ordering;

/// Bounds of a non-empty range. A missing bound is unbounded and never
/// inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounds<T> {
    pub lower: Option<T>,
    pub upper: Option<T>,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
}

impl<T> Bounds<T> {
    pub fn new(lower: Option<T>, upper: Option<T>, lower_inclusive: bool, upper_inclusive: bool) -> Self {
        Self {
            lower_inclusive: lower_inclusive && lower.is_some(),
            upper_inclusive: upper_inclusive && upper.is_some(),
            lower,
            upper,
        }
    }

    /// The bound spec in the server's notation, e.g. `"[)"`.
    pub fn spec(&self) -> &'static str {
        match (self.lower_inclusive, self.upper_inclusive) {
            (true, true) => "[]",
            (true, false) => "[)",
            (false, true) => "(]",
            (false, false) => "()",
        }
    }
}

impl<T: PartialOrd> Bounds<T> {
    /// Tells whether the bounds are reversed, or equal without both being
    /// inclusive.
    pub fn encloses_nothing(&self) -> Result<bool> {
        let (Some(lower), Some(upper)) = (&self.lower, &self.upper) else {
            return Ok(false);
        };
        match lower.partial_cmp(upper) {
            Some(Ordering::Greater) => Ok(true),
            Some(Ordering::Equal) => Ok(!(self.lower_inclusive && self.upper_inclusive)),
            Some(Ordering::Less) => Ok(false),
            None => Err(Error::invalid("range bounds are not comparable")),
        }
    }

    /// Fails for bounds that should have collapsed to [`Range::Empty`].
    fn check_nonempty(&self) -> Result<()> {
        if self.encloses_nothing()? {
            return Err(Error::invalid(
                "range bounds enclose nothing; use Range::Empty for the empty range",
            ));
        }
        Ok(())
    }
}

/// A range value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Range<T> {
    Empty,
    Bounded(Bounds<T>),
}

impl<T: PartialOrd> Range<T> {
    /// Canonicalizes `bounds` and collapses them to [`Range::Empty`] when they
    /// enclose nothing.
    pub fn from_bounds<K: Canonicalize<T> + ?Sized>(bounds: Bounds<T>, canonical: &K) -> Result<Self> {
        let bounds = canonical.canonicalize(bounds)?;
        if bounds.encloses_nothing()? {
            return Ok(Range::Empty);
        }
        Ok(Range::Bounded(bounds))
    }
}

impl<T> Range<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Range::Empty)
    }

    pub fn bounds(&self) -> Option<&Bounds<T>> {
        match self {
            Range::Empty => None,
            Range::Bounded(bounds) => Some(bounds),
        }
    }

    pub fn lower(&self) -> Option<&T> {
        self.bounds().and_then(|b| b.lower.as_ref())
    }

    pub fn upper(&self) -> Option<&T> {
        self.bounds().and_then(|b| b.upper.as_ref())
    }
}

/// Normalizes range bounds, e.g. to the half-open form of discrete types.
///
/// Implemented by [`Continuous`], [`Discrete`] and any
/// `Fn(Bounds<T>) -> Result<Bounds<T>>`.
pub trait Canonicalize<T> {
    fn canonicalize(&self, bounds: Bounds<T>) -> Result<Bounds<T>>;
}

impl<T, F> Canonicalize<T> for F
where
    F: Fn(Bounds<T>) -> Result<Bounds<T>>,
{
    fn canonicalize(&self, bounds: Bounds<T>) -> Result<Bounds<T>> {
        self(bounds)
    }
}

/// Keeps bounds as given, for continuous subtypes such as `numeric`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Continuous;

impl<T> Canonicalize<T> for Continuous {
    fn canonicalize(&self, bounds: Bounds<T>) -> Result<Bounds<T>> {
        Ok(bounds)
    }
}

/// Subtypes with a successor function.
pub trait Step: Sized {
    fn successor(&self) -> Option<Self>;
}

macro_rules! impl_step {
    ($($t:ty),*) => {
        $(impl Step for $t {
            fn successor(&self) -> Option<Self> {
                self.checked_add(1)
            }
        })*
    };
}

impl_step!(i16, i32, i64);

/// Rewrites bounds to `[lower, upper)` form, as the server does for
/// `int4range` and friends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discrete;

impl<T: Step> Canonicalize<T> for Discrete {
    fn canonicalize(&self, mut bounds: Bounds<T>) -> Result<Bounds<T>> {
        if !bounds.lower_inclusive {
            if let Some(lower) = bounds.lower.take() {
                bounds.lower = Some(successor(&lower)?);
                bounds.lower_inclusive = true;
            }
        }
        if bounds.upper_inclusive {
            if let Some(upper) = bounds.upper.take() {
                bounds.upper = Some(successor(&upper)?);
                bounds.upper_inclusive = false;
            }
        }
        Ok(bounds)
    }
}

fn successor<T: Step>(value: &T) -> Result<T> {
    value
        .successor()
        .ok_or_else(|| Error::invalid("range bound is out of range for its subtype"))
}

/// Codec for a range type over the subtype handled by `C`.
///
/// # Examples
///
/// ```
/// use sql_pattern::codec::{Discrete, IntegerCodec, RangeCodec, TypeName, ValueParser, ValueSerializer};
///
/// let codec = RangeCodec::new(
///     IntegerCodec::int4(),
///     TypeName::new("pg_catalog", "int4range"),
///     Discrete,
/// );
///
/// let range = codec.parse("[1,5]")?;
/// assert_eq!(range.upper(), Some(&6));
/// assert_eq!(codec.serialize(&range, true)?, "pg_catalog.int4range(1, 6)");
/// # Ok::<(), sql_pattern::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RangeCodec<C, K = Continuous> {
    subtype: C,
    type_name: TypeName,
    canonical: K,
}

impl<C, K> RangeCodec<C, K>
where
    C: ValueType,
    C::Value: PartialOrd,
    K: Canonicalize<C::Value>,
{
    pub fn new(subtype: C, type_name: TypeName, canonical: K) -> Self {
        Self {
            subtype,
            type_name,
            canonical,
        }
    }

    /// Builds a canonical range value from raw bounds.
    pub fn create(
        &self,
        lower: Option<C::Value>,
        upper: Option<C::Value>,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Result<Range<C::Value>> {
        Range::from_bounds(
            Bounds::new(lower, upper, lower_inclusive, upper_inclusive),
            &self.canonical,
        )
    }

    pub fn subtype_codec(&self) -> &C {
        &self.subtype
    }
}

impl<C: ValueType, K> ValueType for RangeCodec<C, K> {
    type Value = Range<C::Value>;

    fn type_name(&self) -> &TypeName {
        &self.type_name
    }
}

impl<C, K> ValueSerializer for RangeCodec<C, K>
where
    C: ValueSerializer,
    C::Value: PartialOrd,
{
    fn serialize(&self, value: &Self::Value, _standalone: bool) -> Result<String> {
        let bounds = match value {
            Range::Empty => return Ok(format!("'empty'::{}", self.type_name)),
            Range::Bounded(bounds) => bounds,
        };
        bounds.check_nonempty()?;
        let lower = self.subtype.serialize_nullable(bounds.lower.as_ref(), false)?;
        let upper = self.subtype.serialize_nullable(bounds.upper.as_ref(), false)?;
        match bounds.spec() {
            "[)" => Ok(format!("{}({lower}, {upper})", self.type_name)),
            spec => Ok(format!("{}({lower}, {upper}, '{spec}')", self.type_name)),
        }
    }
}

impl<C, K> TextEncoder for RangeCodec<C, K>
where
    C: TextEncoder,
    C::Value: PartialOrd,
{
    fn encode_text(&self, value: &Self::Value) -> Result<String> {
        let bounds = match value {
            Range::Empty => return Ok("empty".to_owned()),
            Range::Bounded(bounds) => bounds,
        };
        bounds.check_nonempty()?;
        let encode = |bound: Option<&C::Value>| -> Result<String> {
            match bound {
                Some(value) => {
                    let text = self.subtype.encode_text(value)?;
                    Ok(quote_token(&text, |c| matches!(c, ',' | '(' | ')' | '[' | ']' | '"' | '\\')).into_owned())
                }
                None => Ok(String::new()),
            }
        };
        let spec = bounds.spec();
        Ok(format!(
            "{}{},{}{}",
            &spec[..1],
            encode(bounds.lower.as_ref())?,
            encode(bounds.upper.as_ref())?,
            &spec[1..]
        ))
    }
}

impl<C, K> ValueParser for RangeCodec<C, K>
where
    C: ValueParser,
    C::Value: PartialOrd,
    K: Canonicalize<C::Value>,
{
    fn parse(&self, text: &str) -> Result<Self::Value> {
        if text.trim().eq_ignore_ascii_case("empty") {
            return Ok(Range::Empty);
        }

        let mut cursor = Cursor::new(text);
        cursor.skip_whitespace();
        let at = cursor.pos();
        let lower_inclusive = match cursor.bump() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(Error::parse(at, "expected '[' or '(' opening the range")),
        };
        let lower = self.read_bound(&mut cursor)?;
        cursor.expect(',')?;
        let upper = self.read_bound(&mut cursor)?;
        let at = cursor.pos();
        let upper_inclusive = match cursor.bump() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(Error::parse(at, "expected ']' or ')' closing the range")),
        };
        cursor.expect_end()?;

        Range::from_bounds(
            Bounds::new(lower, upper, lower_inclusive, upper_inclusive),
            &self.canonical,
        )
    }
}

impl<C: ValueParser, K> RangeCodec<C, K> {
    /// Reads one bound; an empty unquoted bound means unbounded.
    fn read_bound(&self, cursor: &mut Cursor<'_>) -> Result<Option<C::Value>> {
        let start = cursor.pos();
        let mut token = String::new();
        let mut quoted = false;
        while let Some(c) = cursor.peek() {
            match c {
                ',' | ')' | ']' => break,
                '"' => {
                    token.push_str(&cursor.read_quoted()?);
                    quoted = true;
                }
                '\\' => {
                    cursor.bump();
                    if let Some(next) = cursor.bump() {
                        token.push(next);
                    }
                }
                _ => {
                    cursor.bump();
                    token.push(c);
                }
            }
        }
        if token.is_empty() && !quoted {
            return Ok(None);
        }
        let value = self.subtype.parse(&token).map_err(|e| e.rebase(start))?;
        Ok(Some(value))
    }
}
