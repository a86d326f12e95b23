use super::{quote_literal, TextEncoder, TypeName, ValueParser, ValueSerializer, ValueType};
use crate::error::{Error, Result};

/// Codec for the `int2`, `int4` and `int8` types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerCodec {
    type_name: TypeName,
    bits: u32,
}

impl IntegerCodec {
    pub fn int2() -> Self {
        Self::with_width(TypeName::new("pg_catalog", "int2"), 16)
    }

    pub fn int4() -> Self {
        Self::with_width(TypeName::new("pg_catalog", "int4"), 32)
    }

    pub fn int8() -> Self {
        Self::with_width(TypeName::new("pg_catalog", "int8"), 64)
    }

    /// An integer type of `bits` width (at most 64) named `type_name`.
    pub fn with_width(type_name: TypeName, bits: u32) -> Self {
        Self {
            type_name,
            bits: bits.clamp(1, 64),
        }
    }

    fn bounds(&self) -> (i64, i64) {
        let shift = 64 - self.bits;
        (i64::MIN >> shift, i64::MAX >> shift)
    }

    fn in_domain(&self, value: i64) -> bool {
        let (min, max) = self.bounds();
        (min..=max).contains(&value)
    }

    fn check(&self, value: i64) -> Result<()> {
        if self.in_domain(value) {
            Ok(())
        } else {
            Err(Error::invalid(format!(
                "integer {value} is out of range for type {}",
                self.type_name
            )))
        }
    }
}

impl ValueType for IntegerCodec {
    type Value = i64;

    fn type_name(&self) -> &TypeName {
        &self.type_name
    }
}

impl ValueSerializer for IntegerCodec {
    fn serialize(&self, value: &i64, standalone: bool) -> Result<String> {
        self.check(*value)?;
        // `::` binds tighter than unary minus, and `--` opens a comment
        let literal = if *value < 0 {
            format!("({value})")
        } else {
            value.to_string()
        };
        // bare integer literals are typed int4 by the server
        if standalone && self.bits != 32 {
            Ok(format!("{literal}::{}", self.type_name))
        } else {
            Ok(literal)
        }
    }
}

impl ValueParser for IntegerCodec {
    fn parse(&self, text: &str) -> Result<i64> {
        let value: i64 = text
            .trim()
            .parse()
            .map_err(|_| Error::parse(0, format!("invalid {} value {text:?}", self.type_name)))?;
        if !self.in_domain(value) {
            return Err(Error::parse(0, format!("{value} is out of range for type {}", self.type_name)));
        }
        Ok(value)
    }
}

impl TextEncoder for IntegerCodec {
    fn encode_text(&self, value: &i64) -> Result<String> {
        self.check(*value)?;
        Ok(value.to_string())
    }
}

/// Codec for `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCodec {
    type_name: TypeName,
}

impl TextCodec {
    pub fn new() -> Self {
        Self::named(TypeName::new("pg_catalog", "text"))
    }

    /// A string type under another name, e.g. `varchar`.
    pub fn named(type_name: TypeName) -> Self {
        Self { type_name }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueType for TextCodec {
    type Value = String;

    fn type_name(&self) -> &TypeName {
        &self.type_name
    }
}

impl ValueSerializer for TextCodec {
    fn serialize(&self, value: &String, standalone: bool) -> Result<String> {
        let literal = quote_literal(value);
        if standalone {
            Ok(format!("{literal}::{}", self.type_name))
        } else {
            Ok(literal)
        }
    }
}

impl ValueParser for TextCodec {
    fn parse(&self, text: &str) -> Result<String> {
        Ok(text.to_owned())
    }
}

impl TextEncoder for TextCodec {
    fn encode_text(&self, value: &String) -> Result<String> {
        Ok(value.clone())
    }
}

/// Codec for `bool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolCodec {
    type_name: TypeName,
}

impl BoolCodec {
    pub fn new() -> Self {
        Self {
            type_name: TypeName::new("pg_catalog", "bool"),
        }
    }
}

impl Default for BoolCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueType for BoolCodec {
    type Value = bool;

    fn type_name(&self) -> &TypeName {
        &self.type_name
    }
}

impl ValueSerializer for BoolCodec {
    fn serialize(&self, value: &bool, _standalone: bool) -> Result<String> {
        Ok(if *value { "TRUE" } else { "FALSE" }.to_owned())
    }
}

impl ValueParser for BoolCodec {
    fn parse(&self, text: &str) -> Result<bool> {
        match text.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
            "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
            _ => Err(Error::parse(0, format!("invalid boolean value {text:?}"))),
        }
    }
}

impl TextEncoder for BoolCodec {
    fn encode_text(&self, value: &bool) -> Result<String> {
        Ok(if *value { "t" } else { "f" }.to_owned())
    }
}
