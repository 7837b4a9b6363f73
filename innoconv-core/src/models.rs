//! Core data models for dump statements, table definitions and inferred
//! foreign keys.
//!
//! Values are created by one pipeline stage and only read afterwards. The
//! layout fields of [`TableDefinition`] hold byte offsets into the statement
//! text the definition was parsed from, which is what lets the rewriter edit
//! a statement without re-serializing it.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Classification of a top-level statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// `CREATE [TEMPORARY] TABLE`
    CreateTable,
    /// Anything else, including trivia-only text
    Other,
}

/// One top-level statement of a dump.
///
/// `text` starts right after the previous statement's terminator, so it
/// carries any whitespace and comments that precede the statement itself.
/// Concatenating the texts of all statements yields the original dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement<'a> {
    /// Raw text including leading trivia and the terminator
    pub text: &'a str,
    /// Classification of the statement body
    pub kind: StatementKind,
    /// 1-based line of the first significant token
    pub line: usize,
    /// Byte offset of `text` within the dump
    pub offset: usize,
    /// Offset within `text` where the statement proper begins
    pub body_start: usize,
    /// Whether the statement ends with `;`
    pub terminated: bool,
}

impl<'a> Statement<'a> {
    /// Text from the first significant token to the end of the statement.
    pub fn body(&self) -> &'a str {
        &self.text[self.body_start..]
    }

    /// Whitespace and comments that precede the statement.
    pub fn leading_trivia(&self) -> &'a str {
        &self.text[..self.body_start]
    }

    pub fn is_create_table(&self) -> bool {
        self.kind == StatementKind::CreateTable
    }

    /// True when the statement has no content besides trivia.
    pub fn is_blank(&self) -> bool {
        let body = self.body().trim();
        body.is_empty() || body == ";"
    }
}

/// Column information extracted from a CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Unquoted column name
    pub name: String,
    /// Raw declared type, e.g. `int(11)` or `decimal(10,2) unsigned`
    pub data_type: String,
    /// False when declared `NOT NULL`
    pub is_nullable: bool,
    /// 1-based position within the table
    pub ordinal_position: u32,
}

/// Structured view of one CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Unquoted table name without schema qualifier
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnDefinition>,
    /// Primary key column names; empty when none is declared
    pub primary_key: Vec<String>,
    /// Engine as declared in the table options
    pub engine: Option<String>,
    /// Columns already covered by a declared foreign key
    pub existing_foreign_keys: Vec<String>,
    /// Position among parsed tables, in dump order
    pub declaration_index: usize,
    /// 1-based line of the CREATE keyword
    pub line: usize,
    /// Edit points for the rewriter
    pub layout: TableLayout,
}

/// Byte offsets into the owning statement's `text`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableLayout {
    /// End of the last column-list entry; new entries are inserted here
    pub entries_end: usize,
    /// Separator placed before each inserted entry, matching the dump's style
    pub entry_separator: String,
    /// Position just after the closing parenthesis of the column list
    pub options_start: usize,
    /// Span of the engine name inside `ENGINE=<name>`
    pub engine_span: Option<Range<usize>>,
}

impl TableDefinition {
    /// Returns the primary key column when the key is a single column.
    pub fn single_primary_key(&self) -> Option<&str> {
        match self.primary_key.as_slice() {
            [column] => Some(column.as_str()),
            _ => None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether `column` is already the source of a declared foreign key.
    pub fn has_foreign_key_on(&self, column: &str) -> bool {
        self.existing_foreign_keys
            .iter()
            .any(|existing| existing.eq_ignore_ascii_case(column))
    }
}

/// Naming rule that produced a candidate, in decreasing specificity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceRule {
    /// `<table>_id` or `<singular table>_id`
    SnakeSuffix = 1,
    /// `<table>Id` or `<singular table>Id`
    CamelSuffix = 2,
    /// stem matches the table name up to pluralization and underscores
    Pluralized = 3,
}

impl InferenceRule {
    pub fn number(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for InferenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceRule::SnakeSuffix => write!(f, "snake_case _id suffix"),
            InferenceRule::CamelSuffix => write!(f, "camelCase Id suffix"),
            InferenceRule::Pluralized => write!(f, "pluralized stem"),
        }
    }
}

/// Tie-break rank of a candidate. Lower sorts first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateRank {
    /// Rule that matched
    pub rule: InferenceRule,
    /// Levenshtein distance between column stem and target table name
    pub distance: usize,
    /// Matched table, last tie-break by byte order
    pub target_table: String,
}

/// A proposed foreign key inferred from naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyCandidate {
    /// Table holding the referencing column
    pub source_table: String,
    /// Referencing column
    pub source_column: String,
    /// Referenced table
    pub target_table: String,
    /// Single-column primary key of the referenced table
    pub target_column: String,
    /// How the target was chosen
    pub rank: CandidateRank,
}

impl ForeignKeyCandidate {
    pub fn is_self_reference(&self) -> bool {
        self.source_table == self.target_table
    }

    /// Identifies the edge by its source column, which is unique per edge.
    pub fn same_source(&self, other: &ForeignKeyCandidate) -> bool {
        self.source_table == other.source_table && self.source_column == other.source_column
    }
}

impl std::fmt::Display for ForeignKeyCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source_table, self.source_column, self.target_table, self.target_column
        )
    }
}

/// Why a matched target could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The matched table declares no primary key
    NoPrimaryKey,
    /// The matched table's primary key spans several columns
    CompositePrimaryKey,
}

/// A column that named a table which cannot be referenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedInference {
    /// Table holding the column
    pub source_table: String,
    /// Column whose name matched
    pub source_column: String,
    /// Table the column named
    pub target_table: String,
    /// Why no constraint was added
    pub reason: SkipReason,
}

/// A CREATE TABLE statement passed through without conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStatement {
    /// 1-based line of the statement
    pub line: usize,
    /// Parse failure description
    pub reason: String,
}
