use std::fmt;

/// Identifies the parameter a placeholder refers to.
///
/// Positional placeholders are numbered from zero in order of appearance;
/// named placeholders carry the identifier given after the colon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamKey {
    /// Zero-based index of a positional placeholder
    Position(usize),
    /// Identifier of a named placeholder (`%:name`)
    Name(String),
}

impl ParamKey {
    /// Returns the position for positional keys.
    pub fn position(&self) -> Option<usize> {
        match self {
            ParamKey::Position(pos) => Some(*pos),
            ParamKey::Name(_) => None,
        }
    }

    /// Returns the identifier for named keys.
    pub fn name(&self) -> Option<&str> {
        match self {
            ParamKey::Position(_) => None,
            ParamKey::Name(name) => Some(name),
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Position(pos) => write!(f, "#{pos}"),
            ParamKey::Name(name) => write!(f, ":{name}"),
        }
    }
}

impl From<usize> for ParamKey {
    fn from(pos: usize) -> Self {
        ParamKey::Position(pos)
    }
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        ParamKey::Name(name.to_owned())
    }
}

impl From<String> for ParamKey {
    fn from(name: String) -> Self {
        ParamKey::Name(name)
    }
}

/// A single substitution point of a [`Pattern`](crate::Pattern).
///
/// The offset is a byte position in the pattern's raw SQL, i.e. after the
/// placeholder text has been removed and `%%` escapes have been resolved.
/// Type and schema names are stored unquoted; the `*_quoted` flags tell
/// whether they were written as quoted identifiers in the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    offset: usize,
    key: ParamKey,
    type_name: Option<String>,
    type_name_quoted: bool,
    schema_name: Option<String>,
    schema_name_quoted: bool,
}

impl Placeholder {
    /// Creates an untyped placeholder.
    pub fn new(offset: usize, key: impl Into<ParamKey>) -> Self {
        Self {
            offset,
            key: key.into(),
            type_name: None,
            type_name_quoted: false,
            schema_name: None,
            schema_name_quoted: false,
        }
    }

    /// Sets the type annotation.
    pub fn with_type(mut self, type_name: impl Into<String>, quoted: bool) -> Self {
        self.type_name = Some(type_name.into());
        self.type_name_quoted = quoted;
        self
    }

    /// Sets the schema qualifying the type annotation.
    pub fn with_schema(mut self, schema_name: impl Into<String>, quoted: bool) -> Self {
        self.schema_name = Some(schema_name.into());
        self.schema_name_quoted = quoted;
        self
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn key(&self) -> &ParamKey {
        &self.key
    }

    /// Type name, including a single `[]` suffix for array annotations.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn is_type_name_quoted(&self) -> bool {
        self.type_name_quoted
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    pub fn is_schema_name_quoted(&self) -> bool {
        self.schema_name_quoted
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.key, ParamKey::Position(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_key_conversions() {
        assert_eq!(ParamKey::from(2), ParamKey::Position(2));
        assert_eq!(ParamKey::from("tbl"), ParamKey::Name("tbl".to_string()));
        assert_eq!(ParamKey::from(3).position(), Some(3));
        assert_eq!(ParamKey::from("x").name(), Some("x"));
        assert_eq!(ParamKey::from("x").position(), None);
    }

    #[test]
    fn test_param_key_display() {
        assert_eq!(ParamKey::from(0).to_string(), "#0");
        assert_eq!(ParamKey::from("cond").to_string(), ":cond");
    }

    #[test]
    fn test_placeholder_builder() {
        let p = Placeholder::new(7, "id")
            .with_type("Int4", true)
            .with_schema("public", false);

        assert_eq!(p.offset(), 7);
        assert_eq!(p.key(), &ParamKey::from("id"));
        assert_eq!(p.type_name(), Some("Int4"));
        assert!(p.is_type_name_quoted());
        assert_eq!(p.schema_name(), Some("public"));
        assert!(!p.is_schema_name_quoted());
        assert!(!p.is_positional());
    }
}
