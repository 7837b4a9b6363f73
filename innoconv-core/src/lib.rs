//! Core pipeline for converting MyISAM schema dumps to InnoDB.
//!
//! MyISAM dumps carry no foreign keys. This crate infers them from column
//! naming conventions and rewrites the dump so that the converted tables
//! declare them, in an order InnoDB accepts.
//!
//! # Pipeline
//! - [`splitter`] cuts the dump into statements without breaking quotes
//! - [`parser`] recovers table definitions from CREATE TABLE statements,
//!   tokenized with `sqlparser`
//! - [`inference`] proposes one foreign key per matching column
//! - [`graph`] detects reference cycles and orders tables
//! - [`plan`] decides which constraints are inlined and which are deferred
//! - [`rewriter`] writes the converted dump
//!
//! [`Converter`] runs all stages and returns the output with a
//! [`ConversionReport`].
//!
//! # Guarantees
//! - Statements other than parsed CREATE TABLE are copied byte-for-byte
//! - Converting an already converted dump changes nothing
//! - Identical input always yields identical output
//! - Data rows are never inspected

pub mod config;
pub mod converter;
pub mod error;
pub mod graph;
pub mod inference;
mod lexer;
pub mod logging;
pub mod models;
pub mod parser;
mod patterns;
pub mod plan;
pub mod report;
pub mod rewriter;
pub mod splitter;

// Re-export commonly used types
pub use config::{ConfigValidationError, ConverterConfig};
pub use converter::{Conversion, Converter};
pub use error::{ConvertError, ParseError, Result, TableParseError};
pub use graph::{DependencyGraph, Resolution};
pub use inference::{ForeignKeyInferencer, InferenceOutcome};
pub use logging::init_logging;
pub use models::{
    ColumnDefinition, ForeignKeyCandidate, InferenceRule, SkipReason, SkippedInference,
    SkippedStatement, Statement, StatementKind, TableDefinition,
};
pub use plan::{DeferReason, DeferredConstraint, EmissionPlan};
pub use report::ConversionReport;
