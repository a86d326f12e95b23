//! # sql-pattern
//!
//! Parameterized SQL templates for PostgreSQL with typed placeholders, plus
//! the value codecs that turn Rust values into SQL literal text and wire text
//! back into Rust values.
//!
//! ## Features
//!
//! - **Typed Placeholders**: `%int4`, `%"my schema"."my type"`, `%{character varying}[]`
//! - **Positional and Named Parameters**: bare `%` is numbered left to right, `%text:name` may repeat
//! - **Escapes**: `%%` stands for a literal `%`
//! - **Precise Errors**: parse failures carry the byte offset of the offending character
//! - **Array and Range Codecs**: multi-dimensional arrays with NULLs, ranges with canonicalization
//! - **Pattern Caching**: `CachingPatternParser` parses every distinct template once
//! - **SQLx Execution**: `PreparedPattern` and `PreparedPatternAs` run filled patterns against any Postgres `Executor`
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sqlx = { version = "0.8", features = ["postgres", "runtime-tokio"] }
//! sql-pattern = "0.1"
//! ```
//!
//! ## Examples
//!
//! ### Parsing and Filling a Template
//!
//! ```rust
//! use std::collections::HashMap;
//! use sql_pattern::{ParamKey, PatternParser, SqlPatternParser};
//!
//! # fn main() -> sql_pattern::Result<()> {
//! let parser = SqlPatternParser::new()?;
//! let pattern = parser.parse("SELECT * FROM person WHERE id = %int4:id AND name LIKE 'A%%'")?;
//!
//! assert_eq!(pattern.placeholder_count(), 1);
//! assert_eq!(pattern.placeholders()[0].type_name(), Some("int4"));
//!
//! let values = HashMap::from([(ParamKey::from("id"), "42")]);
//! assert_eq!(
//!     pattern.fill_sql(&values)?,
//!     "SELECT * FROM person WHERE id = 42 AND name LIKE 'A%'"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ### Encoding Values with Codecs
//!
//! ```rust
//! use sql_pattern::codec::{ArrayCodec, Element, IntegerCodec, ValueSerializer};
//!
//! # fn main() -> sql_pattern::Result<()> {
//! let codec = ArrayCodec::new(IntegerCodec::int4());
//! let value = vec![Element::Value(3), Element::Null, Element::Value(1)];
//! assert_eq!(codec.serialize(&value, true)?, "ARRAY[3,NULL,1]::pg_catalog.int4[]");
//! # Ok(())
//! # }
//! ```
//!
//! ### Executing a Pattern
//!
//! ```rust,no_run
//! use sqlx::PgPool;
//! use sql_pattern::codec::{IntegerCodec, ValueSerializer};
//! use sql_pattern::PreparedPattern;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgres://localhost/test").await?;
//!
//! let mut query = PreparedPattern::new(
//!     "DELETE FROM person WHERE id = %int4",
//!     |_| IntegerCodec::int4().serialize(&42, false),
//! )?;
//!
//! let result = query.execute(&pool).await?;
//! println!("Deleted {} rows", result.rows_affected());
//! # Ok(())
//! # }
//! ```
//!
//! ### Using with Transactions
//!
//! ```rust,no_run
//! use sqlx::{PgPool, Postgres, Transaction};
//! use sql_pattern::codec::{IntegerCodec, ValueSerializer};
//! use sql_pattern::PreparedPattern;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let pool = PgPool::connect("postgres://localhost/test").await?;
//! let mut tx: Transaction<Postgres> = pool.begin().await?;
//! let int4 = IntegerCodec::int4();
//!
//! let mut debit = PreparedPattern::new(
//!     "UPDATE account SET balance = balance - %int4:amount WHERE id = %int4:id",
//!     |p| match p.key().name() {
//!         Some("amount") => int4.serialize(&100, false),
//!         _ => int4.serialize(&1, false),
//!     },
//! )?;
//!
//! let mut credit = PreparedPattern::new(
//!     "UPDATE account SET balance = balance + %int4:amount WHERE id = %int4:id",
//!     |p| match p.key().name() {
//!         Some("amount") => int4.serialize(&100, false),
//!         _ => int4.serialize(&2, false),
//!     },
//! )?;
//!
//! debit.execute(&mut *tx).await?;
//! credit.execute(&mut *tx).await?;
//!
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! 1. **Parse**: [`SqlPatternParser`] scans the template once and records every placeholder
//!    with its byte offset, key, and optional type annotation
//! 2. **Encode**: codecs in [`codec`] turn values into SQL literal text, adding casts when
//!    a value must stand on its own
//! 3. **Fill**: [`Pattern::fill_sql`], [`Pattern::fill_with`], or a [`SqlFiller`] splice the
//!    encoded text into the raw SQL at the recorded offsets
//!
//! Filled SQL contains literals, not bind parameters, so it can be sent through
//! the simple query protocol.
//!
//! ## Limitations
//!
//! - PostgreSQL only
//! - Placeholder names must match `[A-Za-z_][A-Za-z0-9_]*`
//! - `%` inside string literals must be written as `%%`
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod cache;
pub mod codec;
pub mod error;
pub mod parser;
pub mod pattern;
pub mod placeholder;
pub mod query;
pub mod query_as;

pub use cache::{CachingPatternParser, MemoryCache, PatternCache};
pub use error::{Error, Result};
pub use parser::{PatternParser, SqlPatternParser};
pub use pattern::{Pattern, SqlFiller};
pub use placeholder::{ParamKey, Placeholder};
pub use query::PreparedPattern;
pub use query_as::PreparedPatternAs;

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::codec::{TextEncoder, ValueParser, ValueSerializer, ValueType};
    pub use crate::error::{Error, Result};
    pub use crate::{ParamKey, Pattern, PatternParser, Placeholder, SqlPatternParser};
    pub use crate::{PreparedPattern, PreparedPatternAs};
}
