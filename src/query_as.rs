use crate::parser::{PatternParser, SqlPatternParser};
use crate::pattern::Pattern;
use crate::placeholder::Placeholder;
use sqlx::{postgres::PgRow, Executor, Postgres};
use tracing::debug;

/// A pattern with a binder whose rows are decoded into `R`.
///
/// `PreparedPatternAs` is to [`PreparedPattern`](crate::PreparedPattern) what
/// `sqlx::query_as` is to `sqlx::query`: it supports `fetch_all`,
/// `fetch_one`, and `fetch_optional`.
///
/// # Type Parameters
///
/// * `R` - The result type that implements `FromRow`
/// * `F` - Binder producing the SQL text of a placeholder
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx::{FromRow, PgPool};
/// use sql_pattern::codec::{IntegerCodec, ValueSerializer};
/// use sql_pattern::PreparedPatternAs;
///
/// #[derive(FromRow)]
/// struct Person {
///     id: i32,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let pool = PgPool::connect("postgres://localhost/test").await?;
/// let mut query = PreparedPatternAs::<Person, _>::new(
///     "SELECT id, name FROM person WHERE id = %int4",
///     |_| IntegerCodec::int4().serialize(&42, false),
/// )?;
///
/// let person: Person = query.fetch_one(&pool).await?;
/// println!("Person: {} ({})", person.name, person.id);
/// # Ok(())
/// # }
/// ```
pub struct PreparedPatternAs<R, F>
where
    F: FnMut(&Placeholder) -> crate::Result<String>,
{
    pattern: Pattern,
    binder: F,
    _pd: std::marker::PhantomData<R>,
}

impl<R, F> PreparedPatternAs<R, F>
where
    for<'row> R: sqlx::FromRow<'row, PgRow> + Send + Unpin,
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

    /// Like [`new`](Self::new), parsing through `parser`.
    pub fn with_parser<P, T>(parser: &P, template: T, binder: F) -> crate::Result<Self>
    where
        P: PatternParser + ?Sized,
        T: AsRef<str>,
    {
        Ok(Self {
            pattern: parser.parse(template.as_ref())?,
            binder,
            _pd: std::marker::PhantomData,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Fills the pattern through the binder.
    pub fn sql(&mut self) -> crate::Result<String> {
        let PreparedPatternAs { pattern, binder, .. } = self;
        pattern.fill_with(binder)
    }

    /// Executes the query and returns all matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the binder fails, the query fails, or a row cannot
    /// be converted to `R`.
    pub async fn fetch_all<'e, E>(&mut self, executor: E) -> crate::Result<Vec<R>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = self.sql()?;
        debug!(sql = %sql, "fetching all rows of filled pattern");
        Ok(sqlx::query_as::<Postgres, R>(&sql).fetch_all(executor).await?)
    }

    /// Executes the query and returns exactly one row.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The binder fails
    /// - No rows are found
    /// - The query fails
    /// - The row cannot be converted to type `R`
    pub async fn fetch_one<'e, E>(&mut self, executor: E) -> crate::Result<R>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = self.sql()?;
        debug!(sql = %sql, "fetching one row of filled pattern");
        Ok(sqlx::query_as::<Postgres, R>(&sql).fetch_one(executor).await?)
    }

    /// Executes the query and returns at most one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the binder fails, the query fails, or the row
    /// cannot be converted to type `R`.
    pub async fn fetch_optional<'e, E>(&mut self, executor: E) -> crate::Result<Option<R>>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = self.sql()?;
        debug!(sql = %sql, "fetching optional row of filled pattern");
        Ok(sqlx::query_as::<Postgres, R>(&sql).fetch_optional(executor).await?)
    }
}
