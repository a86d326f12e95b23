use crate::error::{Error, Result};
use crate::pattern::Pattern;
use crate::placeholder::{ParamKey, Placeholder};
use regex::{Captures, Match, Regex};
use std::sync::Arc;
use tracing::debug;

/// Grammar of the `%`-sequences recognized in SQL templates.
///
/// `%%` is an escaped percent sign. Any other `%` starts a placeholder made
/// of an optional type (`{verbatim}` or `[schema.]type`, identifiers bare or
/// double-quoted, followed by any number of `[]`) and an optional `:name`.
const PLACEHOLDER_GRAMMAR: &str = r#"(?x)
    %
    (?:
        (?P<escape>%)
      |
        (?:
            (?:
                \{ (?P<braced>[^}]*) \}
              |
                (?: (?P<schema> [A-Za-z_][A-Za-z0-9_]* | "(?:[^"]|"")*" ) \. )?
                (?P<type> [A-Za-z_][A-Za-z0-9_]* | "(?:[^"]|"")*" )
            )
            (?P<array> (?:\[\])* )
        )?
        (?: : (?P<name> [A-Za-z_][A-Za-z0-9_]* ) )?
    )
"#;

/// Turns SQL templates into [`Pattern`]s.
pub trait PatternParser {
    /// Parses `template`, locating every placeholder.
    fn parse(&self, template: &str) -> Result<Pattern>;
}

impl<P: PatternParser + ?Sized> PatternParser for &P {
    fn parse(&self, template: &str) -> Result<Pattern> {
        (**self).parse(template)
    }
}

impl<P: PatternParser + ?Sized> PatternParser for Arc<P> {
    fn parse(&self, template: &str) -> Result<Pattern> {
        (**self).parse(template)
    }
}

/// Parser for `%`-placeholder SQL templates.
///
/// | Template | Placeholder |
/// |---|---|
/// | `%` | positional, untyped |
/// | `%int4` | positional, type `int4` |
/// | `%pg_catalog.int4[][]` | positional, type `int4[]` in schema `pg_catalog` |
/// | `%"My Type"` | positional, quoted type `My Type` |
/// | `%{double precision}` | positional, type taken verbatim |
/// | `%text:name` | named `name`, type `text` |
/// | `%:name` | named `name`, untyped |
///
/// `%%` stands for a literal `%`.
///
/// # Examples
///
/// ```
/// use sql_pattern::{PatternParser, SqlPatternParser};
///
/// let parser = SqlPatternParser::new()?;
/// let pattern = parser.parse("SELECT * FROM person WHERE id = %int AND ord %% 2 = 0")?;
///
/// assert_eq!(pattern.raw_sql(), "SELECT * FROM person WHERE id =  AND ord % 2 = 0");
/// assert_eq!(pattern.placeholders()[0].offset(), 32);
/// assert_eq!(pattern.placeholders()[0].type_name(), Some("int"));
/// # Ok::<(), sql_pattern::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SqlPatternParser {
    grammar: Regex,
}

impl SqlPatternParser {
    /// Creates a parser.
    ///
    /// # Errors
    ///
    /// Returns an error if the placeholder grammar cannot be compiled.
    pub fn new() -> Result<Self> {
        Ok(Self {
            grammar: Regex::new(PLACEHOLDER_GRAMMAR)?,
        })
    }
}

impl PatternParser for SqlPatternParser {
    fn parse(&self, template: &str) -> Result<Pattern> {
        let mut raw_sql = String::with_capacity(template.len());
        let mut placeholders = Vec::new();
        let mut next_position = 0;
        let mut last = 0;

        for caps in self.grammar.captures_iter(template) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            raw_sql.push_str(&template[last..whole.start()]);
            last = whole.end();

            if caps.name("escape").is_some() {
                raw_sql.push('%');
                continue;
            }
            check_terminated(template, &caps, &whole)?;

            let key = match caps.name("name") {
                Some(name) => ParamKey::from(name.as_str()),
                None => {
                    next_position += 1;
                    ParamKey::Position(next_position - 1)
                }
            };
            placeholders.push(build_placeholder(raw_sql.len(), key, &caps));
        }
        raw_sql.push_str(&template[last..]);

        debug!(
            placeholders = placeholders.len(),
            positional = next_position,
            raw_len = raw_sql.len(),
            "parsed SQL pattern"
        );
        Pattern::from_placeholders(raw_sql, placeholders)
    }
}

fn build_placeholder(offset: usize, key: ParamKey, caps: &Captures<'_>) -> Placeholder {
    let placeholder = Placeholder::new(offset, key);
    let suffix = match caps.name("array") {
        Some(array) if !array.is_empty() => "[]",
        _ => "",
    };

    if let Some(braced) = caps.name("braced") {
        if braced.is_empty() {
            return placeholder;
        }
        return placeholder.with_type(format!("{}{suffix}", braced.as_str()), false);
    }

    match caps.name("type") {
        Some(type_name) => {
            let (type_name, quoted) = unquote(type_name.as_str());
            let placeholder = placeholder.with_type(type_name + suffix, quoted);
            match caps.name("schema") {
                Some(schema) => {
                    let (schema, quoted) = unquote(schema.as_str());
                    placeholder.with_schema(schema, quoted)
                }
                None => placeholder,
            }
        }
        None => placeholder,
    }
}

/// Rejects a `{` or `"` that starts a type the grammar could not match
/// because it never closes. A quoted identifier may follow the match
/// directly or after a `.`.
fn check_terminated(template: &str, caps: &Captures<'_>, whole: &Match<'_>) -> Result<()> {
    if caps.name("name").is_some() {
        return Ok(());
    }
    let rest = &template[whole.end()..];
    let typed = caps.name("braced").is_some() || caps.name("type").is_some();
    if !typed && rest.starts_with('{') {
        return Err(Error::parse(whole.end(), "unterminated braced type name"));
    }

    let quote = if rest.starts_with('"') {
        whole.end()
    } else if rest.starts_with(".\"") {
        whole.end() + 1
    } else {
        return Ok(());
    };
    if quoted_identifier_closes(&template[quote + 1..]) {
        Ok(())
    } else {
        Err(Error::parse(quote, "unterminated quoted identifier"))
    }
}

/// Tells whether `body`, the text after an opening `"`, holds the closing
/// quote. `""` is an escaped quote.
fn quoted_identifier_closes(body: &str) -> bool {
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '"' && !chars.as_str().starts_with('"') {
            return true;
        }
        if c == '"' {
            chars.next();
        }
    }
    false
}

/// Strips the quotes of a quoted identifier and resolves `""` escapes.
fn unquote(token: &str) -> (String, bool) {
    match token.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) => (inner.replace("\"\"", "\""), true),
        None => (token.to_owned(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(template: &str) -> Pattern {
        SqlPatternParser::new().unwrap().parse(template).unwrap()
    }

    #[test]
    fn test_positional_untyped() {
        let pattern = parse("SELECT * FROM person WHERE id = % AND is_active");
        assert_eq!(pattern.raw_sql(), "SELECT * FROM person WHERE id =  AND is_active");
        assert_eq!(pattern.positional_placeholders().len(), 1);
        let p = &pattern.positional_placeholders()[0];
        assert_eq!(p.offset(), 32);
        assert_eq!(p.key(), &ParamKey::Position(0));
        assert_eq!(p.type_name(), None);
    }

    #[test]
    fn test_bracket_pairs_collapse() {
        let pattern = parse("SELECT %bigint[][][][2]");
        assert_eq!(pattern.raw_sql(), "SELECT [2]");
        let p = &pattern.placeholders()[0];
        assert_eq!(p.offset(), 7);
        assert_eq!(p.type_name(), Some("bigint[]"));
    }

    #[test]
    fn test_escape_only() {
        let pattern = parse("%%");
        assert_eq!(pattern.raw_sql(), "%");
        assert_eq!(pattern.placeholder_count(), 0);
    }

    #[test]
    fn test_trailing_percent() {
        let pattern = parse("%");
        assert_eq!(pattern.raw_sql(), "");
        assert_eq!(pattern.placeholder_count(), 1);
        let p = &pattern.placeholders()[0];
        assert_eq!(p.offset(), 0);
        assert_eq!(p.key(), &ParamKey::Position(0));
        assert_eq!(p.type_name(), None);
    }

    #[test]
    fn test_escape_shifts_offsets() {
        let pattern = parse("a %% b % c %% d %");
        assert_eq!(pattern.raw_sql(), "a % b  c % d ");
        let offsets: Vec<usize> = pattern.placeholders().iter().map(Placeholder::offset).collect();
        assert_eq!(offsets, vec![6, 13]);
    }

    #[test]
    fn test_escape_before_placeholder() {
        let pattern = parse("%%%int");
        assert_eq!(pattern.raw_sql(), "%");
        assert_eq!(pattern.placeholders()[0].offset(), 1);
        assert_eq!(pattern.placeholders()[0].type_name(), Some("int"));
    }

    #[test]
    fn test_positional_numbering_skips_named() {
        let pattern = parse("% %:a % %int:b %");
        let keys: Vec<&ParamKey> = pattern.positional_placeholders().iter().map(Placeholder::key).collect();
        assert_eq!(
            keys,
            vec![&ParamKey::Position(0), &ParamKey::Position(1), &ParamKey::Position(2)]
        );
        assert_eq!(pattern.named_placeholders().len(), 2);
    }

    #[test]
    fn test_repeated_name_keeps_each_type() {
        let pattern = parse("SELECT %int:v, %text:v, %:v");
        let occurrences = &pattern.named_placeholders()["v"];
        let types: Vec<Option<&str>> = occurrences.iter().map(Placeholder::type_name).collect();
        assert_eq!(types, vec![Some("int"), Some("text"), None]);
        assert!(pattern.positional_placeholders().is_empty());
    }

    #[test]
    fn test_schema_qualified_type() {
        let pattern = parse("SELECT %pg_catalog.int4[]:ids");
        let p = &pattern.named_placeholders()["ids"][0];
        assert_eq!(p.schema_name(), Some("pg_catalog"));
        assert!(!p.is_schema_name_quoted());
        assert_eq!(p.type_name(), Some("int4[]"));
        assert!(!p.is_type_name_quoted());
        assert_eq!(pattern.raw_sql(), "SELECT ");
    }

    #[test]
    fn test_quoted_identifiers() {
        let pattern = parse(r#"SELECT %"My Schema"."Type ""X"""[] FROM t"#);
        let p = &pattern.placeholders()[0];
        assert_eq!(p.schema_name(), Some("My Schema"));
        assert!(p.is_schema_name_quoted());
        assert_eq!(p.type_name(), Some(r#"Type "X"[]"#));
        assert!(p.is_type_name_quoted());
        assert_eq!(pattern.raw_sql(), "SELECT  FROM t");
    }

    #[test]
    fn test_braced_type_is_verbatim() {
        let pattern = parse("SELECT %{double precision}[][]:x");
        let p = &pattern.named_placeholders()["x"][0];
        assert_eq!(p.type_name(), Some("double precision[]"));
        assert_eq!(p.schema_name(), None);
        assert!(!p.is_type_name_quoted());
    }

    #[test]
    fn test_schema_without_type_falls_back() {
        let pattern = parse("SELECT %foo.");
        assert_eq!(pattern.raw_sql(), "SELECT .");
        let p = &pattern.placeholders()[0];
        assert_eq!(p.type_name(), Some("foo"));
        assert_eq!(p.schema_name(), None);
    }

    #[test]
    fn test_cast_after_untyped_placeholder() {
        let pattern = parse("SELECT %::int");
        assert_eq!(pattern.raw_sql(), "SELECT ::int");
        assert_eq!(pattern.placeholders()[0].type_name(), None);
    }

    #[test]
    fn test_brackets_without_type_stay_in_sql() {
        let pattern = parse("SELECT %[]");
        assert_eq!(pattern.raw_sql(), "SELECT []");
        assert_eq!(pattern.placeholders()[0].type_name(), None);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = SqlPatternParser::new().unwrap().parse(r#"SELECT %"abc"#).unwrap_err();
        match err {
            Error::Parse { offset, .. } => assert_eq!(offset, 8),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unterminated_brace() {
        let err = SqlPatternParser::new().unwrap().parse("SELECT %{abc").unwrap_err();
        assert!(matches!(err, Error::Parse { offset: 8, .. }));
    }

    #[test]
    fn test_unterminated_quote_after_type() {
        let parser = SqlPatternParser::new().unwrap();
        for (template, offset) in [
            (r#"SELECT %pg."open"#, 11),
            (r#"SELECT %"s"."open"#, 12),
            (r#"SELECT %"a""b"#, 11),
            (r#"SELECT %."open"#, 9),
        ] {
            match parser.parse(template) {
                Err(Error::Parse { offset: at, .. }) => assert_eq!(at, offset, "{template}"),
                other => panic!("expected parse error for {template}, got {other:?}"),
            }
        }

        // a closed identifier after the match is ordinary SQL
        let pattern = parse(r#"SELECT %[]."col""#);
        assert_eq!(pattern.raw_sql(), r#"SELECT []."col""#);
    }

    #[test]
    fn test_multibyte_text_offsets() {
        let pattern = parse("SELECT 'ž' || %text");
        assert_eq!(pattern.raw_sql(), "SELECT 'ž' || ");
        assert_eq!(pattern.placeholders()[0].offset(), "SELECT 'ž' || ".len());
    }

    #[test]
    fn test_no_placeholders() {
        let pattern = parse("SELECT * FROM users");
        assert_eq!(pattern.raw_sql(), "SELECT * FROM users");
        assert_eq!(pattern.placeholder_count(), 0);
    }

    #[test]
    fn test_parser_through_arc() {
        let parser = Arc::new(SqlPatternParser::new().unwrap());
        let pattern = parser.parse("SELECT %").unwrap();
        assert_eq!(pattern.placeholder_count(), 1);
    }
}
