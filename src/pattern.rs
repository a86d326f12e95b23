use crate::error::{Error, Result};
use crate::placeholder::{ParamKey, Placeholder};
use indexmap::IndexMap;
use std::collections::HashMap;

/// A parsed SQL template: raw SQL with the placeholders cut out, plus the
/// placeholders themselves.
///
/// Positional placeholders are indexed `0..n` without gaps. A named
/// placeholder may occur several times, each occurrence with its own type
/// annotation, so names map to lists. All placeholders are also kept in one
/// sequence sorted by offset, which is the order values are spliced in.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use sql_pattern::{ParamKey, PatternParser, SqlPatternParser};
///
/// let parser = SqlPatternParser::new()?;
/// let pattern = parser.parse("SELECT * FROM %:tbl WHERE id = %int")?;
///
/// let values = HashMap::from([
///     (ParamKey::from("tbl"), "person"),
///     (ParamKey::from(0), "42"),
/// ]);
/// assert_eq!(pattern.fill_sql(&values)?, "SELECT * FROM person WHERE id = 42");
/// # Ok::<(), sql_pattern::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw_sql: String,
    positional: Vec<Placeholder>,
    named: IndexMap<String, Vec<Placeholder>>,
    sequence: Vec<Placeholder>,
}

impl Pattern {
    /// Creates a pattern from positional placeholders and a name map.
    ///
    /// Placeholders sharing an offset are spliced positional first, then
    /// named in map order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the i-th positional placeholder
    /// is not keyed `i`, if a named placeholder is filed under another name,
    /// or if an offset does not fall on a character boundary of `raw_sql`.
    pub fn new(
        raw_sql: impl Into<String>,
        positional: Vec<Placeholder>,
        named: IndexMap<String, Vec<Placeholder>>,
    ) -> Result<Self> {
        let raw_sql = raw_sql.into();
        check_positions(&positional)?;
        for (name, occurrences) in &named {
            if occurrences.is_empty() {
                return Err(Error::invalid(format!("no placeholder listed for name '{name}'")));
            }
            if let Some(stray) = occurrences.iter().find(|p| p.key().name() != Some(name.as_str())) {
                return Err(Error::invalid(format!(
                    "placeholder {} filed under name '{name}'",
                    stray.key()
                )));
            }
        }

        let sequence = positional
            .iter()
            .chain(named.values().flatten())
            .cloned()
            .collect();
        Self::assemble(raw_sql, positional, named, sequence)
    }

    /// Creates a pattern from placeholders listed in order of appearance.
    ///
    /// Placeholders sharing an offset keep the order they were given in.
    pub fn from_placeholders(raw_sql: impl Into<String>, placeholders: Vec<Placeholder>) -> Result<Self> {
        let raw_sql = raw_sql.into();
        let mut positional = Vec::new();
        let mut named: IndexMap<String, Vec<Placeholder>> = IndexMap::new();
        for placeholder in &placeholders {
            match placeholder.key() {
                ParamKey::Position(_) => positional.push(placeholder.clone()),
                ParamKey::Name(name) => named
                    .entry(name.clone())
                    .or_default()
                    .push(placeholder.clone()),
            }
        }
        check_positions(&positional)?;
        Self::assemble(raw_sql, positional, named, placeholders)
    }

    fn assemble(
        raw_sql: String,
        positional: Vec<Placeholder>,
        named: IndexMap<String, Vec<Placeholder>>,
        mut sequence: Vec<Placeholder>,
    ) -> Result<Self> {
        for placeholder in &sequence {
            let offset = placeholder.offset();
            if offset > raw_sql.len() || !raw_sql.is_char_boundary(offset) {
                return Err(Error::invalid(format!(
                    "placeholder {} at offset {offset} lies outside the {}-byte SQL",
                    placeholder.key(),
                    raw_sql.len()
                )));
            }
        }
        sequence.sort_by_key(Placeholder::offset);

        Ok(Self {
            raw_sql,
            positional,
            named,
            sequence,
        })
    }

    /// SQL with placeholders removed and `%%` resolved to `%`.
    pub fn raw_sql(&self) -> &str {
        &self.raw_sql
    }

    pub fn positional_placeholders(&self) -> &[Placeholder] {
        &self.positional
    }

    pub fn named_placeholders(&self) -> &IndexMap<String, Vec<Placeholder>> {
        &self.named
    }

    /// All placeholders in splicing order.
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.sequence
    }

    pub fn placeholder_count(&self) -> usize {
        self.sequence.len()
    }

    /// Keys a fill must supply: positions first, then names in order of
    /// first appearance.
    pub fn param_keys(&self) -> impl Iterator<Item = ParamKey> + '_ {
        (0..self.positional.len())
            .map(ParamKey::Position)
            .chain(self.named.keys().cloned().map(ParamKey::Name))
    }

    /// Tells whether some placeholder refers to `key`.
    pub fn declares(&self, key: &ParamKey) -> bool {
        match key {
            ParamKey::Position(pos) => *pos < self.positional.len(),
            ParamKey::Name(name) => self.named.contains_key(name),
        }
    }

    /// Splices one encoded value per parameter into the raw SQL.
    ///
    /// Every occurrence of a named parameter receives the same text. Use
    /// [`fill_with`](Self::fill_with) when occurrences need different
    /// encodings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a declared parameter has no
    /// value, or if a value is given for a parameter the pattern does not
    /// declare.
    pub fn fill_sql<S: AsRef<str>>(&self, values: &HashMap<ParamKey, S>) -> Result<String> {
        let missing: Vec<String> = self
            .param_keys()
            .filter(|key| !values.contains_key(key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::invalid(format!(
                "no value given for placeholder(s) {}",
                missing.join(", ")
            )));
        }

        let mut extra: Vec<&ParamKey> = values.keys().filter(|key| !self.declares(key)).collect();
        if !extra.is_empty() {
            extra.sort();
            let extra: Vec<String> = extra.iter().map(|key| key.to_string()).collect();
            return Err(Error::invalid(format!(
                "value(s) given for undeclared placeholder(s) {}",
                extra.join(", ")
            )));
        }

        let texts = self
            .sequence
            .iter()
            .map(|p| {
                values
                    .get(p.key())
                    .map(|value| value.as_ref())
                    .ok_or_else(|| Error::NoData(p.key().clone()))
            })
            .collect::<Result<Vec<&str>>>()?;
        Ok(self.splice(texts))
    }

    /// Starts a sequential fill; every call returns a fresh filler.
    pub fn filler(&self) -> SqlFiller<'_> {
        SqlFiller {
            pattern: self,
            cursor: 0,
            supplied: Vec::with_capacity(self.sequence.len()),
        }
    }

    /// Fills the pattern by asking `binder` for the text of each placeholder,
    /// in splicing order.
    ///
    /// # Examples
    ///
    /// ```
    /// use sql_pattern::{PatternParser, SqlPatternParser};
    ///
    /// let pattern = SqlPatternParser::new()?.parse("SELECT %int:v, %text:v")?;
    /// let sql = pattern.fill_with(|p| match p.type_name() {
    ///     Some("int") => Ok("7".to_string()),
    ///     _ => Ok("'7'".to_string()),
    /// })?;
    /// assert_eq!(sql, "SELECT 7, '7'");
    /// # Ok::<(), sql_pattern::Error>(())
    /// ```
    pub fn fill_with<F>(&self, mut binder: F) -> Result<String>
    where
        F: FnMut(&Placeholder) -> Result<String>,
    {
        let mut filler = self.filler();
        while let Some(placeholder) = filler.current() {
            let text = binder(placeholder)?;
            filler.supply(text)?;
            filler.advance()?;
        }
        filler.finish()
    }

    fn splice<'v>(&self, texts: impl IntoIterator<Item = &'v str>) -> String {
        let texts: Vec<&str> = texts.into_iter().collect();
        let capacity = self.raw_sql.len() + texts.iter().map(|t| t.len()).sum::<usize>();
        let mut sql = String::with_capacity(capacity);
        let mut pos = 0;
        for (placeholder, text) in self.sequence.iter().zip(texts) {
            sql.push_str(&self.raw_sql[pos..placeholder.offset()]);
            sql.push_str(text);
            pos = placeholder.offset();
        }
        sql.push_str(&self.raw_sql[pos..]);
        sql
    }
}

fn check_positions(positional: &[Placeholder]) -> Result<()> {
    for (index, placeholder) in positional.iter().enumerate() {
        if placeholder.key().position() != Some(index) {
            return Err(Error::invalid(format!(
                "positional placeholders must be numbered 0..{} in order, found {} at index {index}",
                positional.len(),
                placeholder.key()
            )));
        }
    }
    Ok(())
}

/// Caller-driven fill of a [`Pattern`], one placeholder at a time.
///
/// The filler presents the placeholders in splicing order. For each one the
/// caller supplies the encoded text and then advances. Advancing without a
/// value fails with [`Error::NoData`].
#[derive(Debug)]
pub struct SqlFiller<'p> {
    pattern: &'p Pattern,
    cursor: usize,
    supplied: Vec<String>,
}

impl<'p> SqlFiller<'p> {
    /// The placeholder awaiting a value, or `None` once all are filled.
    pub fn current(&self) -> Option<&'p Placeholder> {
        self.pattern.sequence.get(self.cursor)
    }

    /// Supplies the encoded text for the current placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the filler is done or the
    /// current placeholder already has a value.
    pub fn supply(&mut self, text: impl Into<String>) -> Result<()> {
        let placeholder = self
            .current()
            .ok_or_else(|| Error::invalid("all placeholders are already filled"))?;
        if self.supplied.len() > self.cursor {
            return Err(Error::invalid(format!(
                "a value was already supplied for placeholder {}",
                placeholder.key()
            )));
        }
        self.supplied.push(text.into());
        Ok(())
    }

    /// Moves on to the next placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] if the current placeholder has no value.
    pub fn advance(&mut self) -> Result<()> {
        let placeholder = self
            .current()
            .ok_or_else(|| Error::invalid("the filler is already past the last placeholder"))?;
        if self.supplied.len() <= self.cursor {
            return Err(Error::NoData(placeholder.key().clone()));
        }
        self.cursor += 1;
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.pattern.sequence.len()
    }

    /// Produces the filled SQL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] for the first placeholder lacking a value.
    pub fn finish(mut self) -> Result<String> {
        while !self.is_done() {
            self.advance()?;
        }
        Ok(self.pattern.splice(self.supplied.iter().map(String::as_str)))
    }
}
