//! Conversion configuration.
//!
//! Controls the engine written into every parsed table, how inferred
//! constraints are named, and which optional inference and cleanup rules run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine written into converted tables unless overridden.
pub const DEFAULT_TARGET_ENGINE: &str = "InnoDB";

/// Prefix of generated constraint names (`fk_<table>_<column>`).
pub const DEFAULT_CONSTRAINT_PREFIX: &str = "fk";

/// Converter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Engine name written into every parsed CREATE TABLE
    pub target_engine: String,
    /// Prefix for generated constraint names
    pub constraint_prefix: String,
    /// Propose references from a table to itself (always deferred)
    pub allow_self_references: bool,
    /// Never treat a table's own single-column primary key as a reference
    pub skip_primary_key_columns: bool,
    /// Remove zero-date defaults that strict InnoDB rejects
    pub strip_zero_date_defaults: bool,
}

/// Validation errors for converter configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("target engine must not be empty")]
    EmptyTargetEngine,
    #[error("target engine '{0}' is not a valid engine name")]
    InvalidTargetEngine(String),
    #[error("constraint prefix must not be empty")]
    EmptyConstraintPrefix,
    #[error("constraint prefix '{0}' may only contain letters, digits and underscores")]
    InvalidConstraintPrefix(String),
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            target_engine: DEFAULT_TARGET_ENGINE.to_string(),
            constraint_prefix: DEFAULT_CONSTRAINT_PREFIX.to_string(),
            allow_self_references: false,
            skip_primary_key_columns: true,
            strip_zero_date_defaults: false,
        }
    }
}

impl ConverterConfig {
    /// Creates a new converter config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the target engine.
    pub fn with_target_engine(mut self, engine: impl Into<String>) -> Self {
        self.target_engine = engine.into();
        self
    }

    /// Builder method to set the constraint name prefix.
    pub fn with_constraint_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.constraint_prefix = prefix.into();
        self
    }

    /// Builder method to allow self-referencing constraints.
    pub fn with_self_references(mut self, allow: bool) -> Self {
        self.allow_self_references = allow;
        self
    }

    /// Builder method to control whether primary key columns may be sources.
    pub fn with_skip_primary_key_columns(mut self, skip: bool) -> Self {
        self.skip_primary_key_columns = skip;
        self
    }

    /// Builder method to enable zero-date default removal.
    pub fn with_strip_zero_date_defaults(mut self, strip: bool) -> Self {
        self.strip_zero_date_defaults = strip;
        self
    }

    /// Validates the configuration.
    ///
    /// Both the engine and the prefix end up unquoted or inside generated
    /// identifiers, so they are restricted to identifier characters.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.target_engine.is_empty() {
            return Err(ConfigValidationError::EmptyTargetEngine);
        }
        if !is_identifier(&self.target_engine) {
            return Err(ConfigValidationError::InvalidTargetEngine(
                self.target_engine.clone(),
            ));
        }
        if self.constraint_prefix.is_empty() {
            return Err(ConfigValidationError::EmptyConstraintPrefix);
        }
        if !is_identifier(&self.constraint_prefix) {
            return Err(ConfigValidationError::InvalidConstraintPrefix(
                self.constraint_prefix.clone(),
            ));
        }
        Ok(())
    }
}

fn is_identifier(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
