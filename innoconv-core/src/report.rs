//! Serializable summary of a conversion run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::ConvertError;
use crate::models::{ForeignKeyCandidate, SkippedInference, SkippedStatement};
use crate::plan::DeferredConstraint;

/// What a conversion did and what it had to leave alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    /// When the report was created
    pub generated_at: DateTime<Utc>,
    /// Version of the converter that produced the output
    pub converter_version: String,
    /// Engine written into converted tables
    pub target_engine: String,
    /// Top-level statements in the input, including trivia-only ones
    pub statement_count: usize,
    /// CREATE TABLE statements in the input, parsed or not
    pub create_table_count: usize,
    /// Tables that were parsed and converted
    pub table_count: usize,
    /// CREATE TABLE statements passed through unmodified
    pub skipped_statements: Vec<SkippedStatement>,
    /// Name matches whose target could not be referenced
    pub skipped_inferences: Vec<SkippedInference>,
    /// Constraints added inside CREATE TABLE
    pub inlined: Vec<ForeignKeyCandidate>,
    /// Constraints added by trailing ALTER TABLE statements
    pub deferred: Vec<DeferredConstraint>,
    /// Inferred keys that lie on a reference cycle
    pub cyclic_edges: Vec<ForeignKeyCandidate>,
    /// Tables ordered so that referenced tables come first
    pub table_order: Vec<String>,
}

impl ConversionReport {
    /// Empty report stamped with the current time.
    pub fn new(target_engine: impl Into<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            converter_version: env!("CARGO_PKG_VERSION").to_string(),
            target_engine: target_engine.into(),
            statement_count: 0,
            create_table_count: 0,
            table_count: 0,
            skipped_statements: Vec::new(),
            skipped_inferences: Vec::new(),
            inlined: Vec::new(),
            deferred: Vec::new(),
            cyclic_edges: Vec::new(),
            table_order: Vec::new(),
        }
    }

    /// Total number of foreign keys added to the dump.
    pub fn constraint_count(&self) -> usize {
        self.inlined.len() + self.deferred.len()
    }

    /// Whether any CREATE TABLE was left unconverted.
    pub fn has_warnings(&self) -> bool {
        !self.skipped_statements.is_empty()
    }

    /// Pretty-printed JSON form of the report.
    ///
    /// # Errors
    /// Returns [`ConvertError::Serialization`] if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| ConvertError::Serialization {
            context: "conversion report".to_string(),
            source,
        })
    }
}

impl std::fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Converted {} of {} tables to {}",
            self.table_count, self.create_table_count, self.target_engine
        )?;
        writeln!(
            f,
            "Foreign keys: {} inline, {} deferred ({} cyclic)",
            self.inlined.len(),
            self.deferred.len(),
            self.cyclic_edges.len()
        )?;
        if !self.skipped_inferences.is_empty() {
            writeln!(
                f,
                "Skipped inferences: {} (target without single-column primary key)",
                self.skipped_inferences.len()
            )?;
        }
        if !self.skipped_statements.is_empty() {
            writeln!(
                f,
                "Passed through unparsed: {} statement(s)",
                self.skipped_statements.len()
            )?;
            for skipped in &self.skipped_statements {
                writeln!(f, "  line {}: {}", skipped.line, skipped.reason)?;
            }
        }
        Ok(())
    }
}
