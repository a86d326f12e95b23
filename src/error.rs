use crate::placeholder::ParamKey;

/// Error types for sql-pattern
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The placeholder grammar could not be compiled
    #[error("Failed to compile placeholder grammar: {0}")]
    Regex(#[from] regex::Error),

    /// A pattern or a wire-text value does not match its grammar
    #[error("Parse error at offset {offset}: {message}")]
    Parse {
        /// Byte offset of the failure point within the parsed text
        offset: usize,
        /// What was expected or found
        message: String,
    },

    /// An argument does not fit what the pattern or codec declares
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The sequential filler moved on before a value was supplied
    #[error("No value supplied for placeholder {0}")]
    NoData(ParamKey),

    /// Error from SQLx database operations
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Error {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Moves a parse error's offset from an embedded fragment onto the enclosing text.
    pub(crate) fn rebase(self, base: usize) -> Self {
        match self {
            Error::Parse { offset, message } => Error::Parse {
                offset: base + offset,
                message,
            },
            other => other,
        }
    }
}

/// Result type alias for sql-pattern operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebase_shifts_parse_offset() {
        let err = Error::parse(3, "bad digit").rebase(10);
        match err {
            Error::Parse { offset, message } => {
                assert_eq!(offset, 13);
                assert_eq!(message, "bad digit");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rebase_keeps_other_errors() {
        let err = Error::invalid("nope").rebase(10);
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::parse(4, "unterminated quoted identifier").to_string(),
            "Parse error at offset 4: unterminated quoted identifier"
        );
        assert_eq!(
            Error::NoData(ParamKey::from("tbl")).to_string(),
            "No value supplied for placeholder :tbl"
        );
    }
}
