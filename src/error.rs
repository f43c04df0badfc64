use thiserror::Error;

/// Errors surfaced by the decorator layer and its backends.
///
/// Driver failures are carried through untranslated in the message; this
/// layer performs no retries and no suppression.
#[derive(Debug, Error)]
pub enum AwareSqlError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("SQL parse error: {0}")]
    ParseError(String),

    /// The statement has no live owning connection, so quoting for query
    /// reconstruction is unavailable. Callers must treat this as a usage
    /// error rather than fall back to unsubstituted text.
    #[error("statement is not attached to a live connection")]
    DetachedStatement,

    #[error("Other database error: {0}")]
    Other(String),
}
