//! Error types for the conversion pipeline.
//!
//! Only conditions that make the overall statement structure unknowable, or
//! that make the rewritten dump ambiguous, are fatal. Per-statement parse
//! failures are modelled as [`TableParseError`] and surface as warnings in the
//! conversion report instead of aborting the run.

use thiserror::Error;

/// Main error type for conversion operations.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The dump could not be split into statements
    #[error("Dump parsing failed: {0}")]
    Parse(#[from] ParseError),

    /// Two CREATE TABLE statements declare the same table
    #[error("Duplicate table '{name}' declared at lines {first_line} and {second_line}")]
    DuplicateTable {
        name: String,
        first_line: usize,
        second_line: usize,
    },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with ConvertError
pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a duplicate table error
    pub fn duplicate_table(name: impl Into<String>, first_line: usize, second_line: usize) -> Self {
        Self::DuplicateTable {
            name: name.into(),
            first_line,
            second_line,
        }
    }
}

/// Quoting construct that can be left open at end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    /// `'...'` or `"..."`
    StringLiteral,
    /// `` `...` ``
    QuotedIdentifier,
    /// `/* ... */`
    BlockComment,
}

impl std::fmt::Display for Construct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Construct::StringLiteral => write!(f, "string literal"),
            Construct::QuotedIdentifier => write!(f, "quoted identifier"),
            Construct::BlockComment => write!(f, "block comment"),
        }
    }
}

/// Fatal failure to determine statement boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A literal, identifier or comment is still open at end of input
    #[error("unterminated {construct} starting at line {line}")]
    Unterminated { construct: Construct, line: usize },
}

/// Reason a single CREATE TABLE statement could not be structured.
///
/// These never abort a run: the statement is passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableParseError {
    /// The tokenizer rejected the statement
    #[error("statement could not be tokenized: {0}")]
    Tokenize(String),
    /// No identifier follows `CREATE TABLE`
    #[error("table name could not be extracted")]
    MissingTableName,
    /// `CREATE TABLE ... LIKE` or `... AS SELECT`
    #[error("statement has no column list")]
    MissingColumnList,
    /// The column list parenthesis is never closed
    #[error("column list is not closed")]
    UnbalancedColumnList,
    /// The column list has no entries
    #[error("column list is empty")]
    EmptyColumnList,
    /// An entry starts with neither a keyword nor a name
    #[error("column name could not be extracted from entry {position}")]
    InvalidColumn { position: usize },
    /// A column is followed directly by its attributes
    #[error("column '{name}' has no type")]
    MissingColumnType { name: String },
}
