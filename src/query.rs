use crate::parser::{PatternParser, SqlPatternParser};
use crate::pattern::Pattern;
use crate::placeholder::Placeholder;
use sqlx::postgres::PgQueryResult;
use sqlx::{Executor, Postgres};
use tracing::debug;

/// A pattern paired with a binder that encodes each placeholder.
///
/// On every execution the binder is called once per placeholder, in the order
/// the placeholders appear in the SQL, and returns the encoded SQL text for
/// it. A named parameter used twice is asked for twice, so each occurrence
/// can be encoded for its own type annotation.
///
/// # Type Parameters
///
/// * `F` - Binder producing the SQL text of a placeholder, usually through a
///   codec's [`serialize`](crate::codec::ValueSerializer::serialize).
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx::PgPool;
/// use sql_pattern::codec::{IntegerCodec, TextCodec, ValueSerializer};
/// use sql_pattern::{Error, PreparedPattern};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let pool = PgPool::connect("postgres://localhost/test").await?;
/// let id = 42;
/// let name = "John Doe".to_string();
///
/// let mut query = PreparedPattern::new(
///     "INSERT INTO person (id, name) VALUES (%int4:id, %text:name)",
///     |p| match p.key().name() {
///         Some("id") => IntegerCodec::int4().serialize(&id, false),
///         Some("name") => TextCodec::new().serialize(&name, false),
///         _ => Err(Error::InvalidArgument(format!("unexpected placeholder {}", p.key()))),
///     },
/// )?;
///
/// let result = query.execute(&pool).await?;
/// println!("Inserted {} rows", result.rows_affected());
/// # Ok(())
/// # }
/// ```
pub struct PreparedPattern<F> {
    pattern: Pattern,
    binder: F,
}

impl<F> PreparedPattern<F>
where
    F: FnMut(&Placeholder) -> crate::Result<String>,
{
    /// Parses `template` and pairs it with `binder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be parsed.
    pub fn new<T>(template: T, binder: F) -> crate::Result<Self>
    where
        T: AsRef<str>,
    {
        Self::with_parser(&SqlPatternParser::new()?, template, binder)
    }

    /// Like [`new`](Self::new), parsing through `parser` (e.g. a caching one).
    pub fn with_parser<P, T>(parser: &P, template: T, binder: F) -> crate::Result<Self>
    where
        P: PatternParser + ?Sized,
        T: AsRef<str>,
    {
        let pattern = parser.parse(template.as_ref())?;
        Ok(Self { pattern, binder })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Fills the pattern through the binder.
    pub fn sql(&mut self) -> crate::Result<String> {
        let PreparedPattern { pattern, binder } = self;
        pattern.fill_with(binder)
    }

    /// Fills the pattern and executes the SQL using the provided executor.
    ///
    /// # Errors
    ///
    /// Returns an error if the binder fails or if the database query fails.
    pub async fn execute<'e, E>(&mut self, executor: E) -> crate::Result<PgQueryResult>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = self.sql()?;
        debug!(sql = %sql, "executing filled pattern");
        Ok(sqlx::query::<Postgres>(&sql).execute(executor).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachingPatternParser, MemoryCache};
    use crate::codec::{IntegerCodec, TextCodec, ValueSerializer};
    use crate::error::Error;

    #[test]
    fn test_prepared_pattern_new() {
        let result = PreparedPattern::new("SELECT * FROM users WHERE id = %int4", |_| Ok("1".to_string()));
        assert!(result.is_ok());
    }

    #[test]
    fn test_prepared_pattern_rejects_bad_template() {
        let result = PreparedPattern::new("SELECT %\"open", |_| Ok(String::new()));
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn test_prepared_pattern_sql() {
        let id = 42;
        let name = "O'Brien".to_string();
        let mut query = PreparedPattern::new(
            "UPDATE users SET name = %text:name WHERE id = %int4:id OR parent = %int4:id",
            |p| match p.key().name() {
                Some("id") => IntegerCodec::int4().serialize(&id, false),
                Some("name") => TextCodec::new().serialize(&name, false),
                _ => Ok("NULL".to_string()),
            },
        )
        .unwrap();

        assert_eq!(query.pattern().placeholder_count(), 3);
        assert_eq!(
            query.sql().unwrap(),
            "UPDATE users SET name = 'O''Brien' WHERE id = 42 OR parent = 42"
        );
        // a second fill calls the binder again
        assert_eq!(
            query.sql().unwrap(),
            "UPDATE users SET name = 'O''Brien' WHERE id = 42 OR parent = 42"
        );
    }

    #[test]
    fn test_prepared_pattern_binder_error() {
        let mut query = PreparedPattern::new("SELECT %int2", |_| IntegerCodec::int2().serialize(&100_000, false)).unwrap();
        assert!(matches!(query.sql(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_prepared_pattern_with_caching_parser() {
        let parser = CachingPatternParser::new(SqlPatternParser::new().unwrap(), MemoryCache::new());
        let mut calls = 0;
        let mut query = PreparedPattern::with_parser(&parser, "SELECT %, %", |p| {
            calls += 1;
            Ok(p.key().to_string())
        })
        .unwrap();

        assert_eq!(query.sql().unwrap(), "SELECT #0, #1");
        assert_eq!(parser.cache().len(), 1);
        drop(query);
        assert_eq!(calls, 2);
    }
}
