//! Foreign key inference from column naming conventions.
//!
//! A column is a candidate reference when its name ends in an id suffix
//! and its stem names a table in the dump. See [`rules`] for how
//! competing tables are ranked.

pub mod naming;
pub mod rules;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::config::ConverterConfig;
use crate::models::{ForeignKeyCandidate, SkipReason, SkippedInference, TableDefinition};

pub use rules::{TableNames, best_target, rank_targets};

/// Result of running inference over all tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceOutcome {
    /// Accepted candidates in table declaration then column order
    pub candidates: Vec<ForeignKeyCandidate>,
    /// Matches whose target has no single-column primary key
    pub skipped: Vec<SkippedInference>,
}

/// Infers foreign keys for a set of parsed tables.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKeyInferencer {
    allow_self_references: bool,
    skip_primary_key_columns: bool,
}

impl ForeignKeyInferencer {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            allow_self_references: config.allow_self_references,
            skip_primary_key_columns: config.skip_primary_key_columns,
        }
    }

    /// Runs inference for every column of every table.
    ///
    /// Each column produces at most one candidate. Columns that already
    /// carry a declared foreign key are left alone.
    pub fn infer(&self, tables: &[TableDefinition]) -> InferenceOutcome {
        let names = TableNames::new(tables.iter().map(|t| t.name.as_str()));
        let by_name: HashMap<&str, &TableDefinition> =
            tables.iter().map(|t| (t.name.as_str(), t)).collect();
        let mut outcome = InferenceOutcome::default();

        for table in tables {
            let own_key = table.single_primary_key();

            for column in &table.columns {
                if self.skip_primary_key_columns && own_key == Some(column.name.as_str()) {
                    continue;
                }
                if table.has_foreign_key_on(&column.name) {
                    trace!(
                        "Column {}.{} already has a foreign key",
                        table.name, column.name
                    );
                    continue;
                }

                let excluded = (!self.allow_self_references).then_some(table.name.as_str());
                let Some(rank) = best_target(&column.name, excluded, &names) else {
                    continue;
                };
                let Some(target) = by_name.get(rank.target_table.as_str()) else {
                    continue;
                };

                match target.primary_key.as_slice() {
                    [target_column] => {
                        if target.name == table.name && *target_column == column.name {
                            // A key column cannot reference itself
                            continue;
                        }
                        let candidate = ForeignKeyCandidate {
                            source_table: table.name.clone(),
                            source_column: column.name.clone(),
                            target_table: target.name.clone(),
                            target_column: target_column.clone(),
                            rank,
                        };
                        debug!("Inferred {} (rule {})", candidate, candidate.rank.rule);
                        outcome.candidates.push(candidate);
                    }
                    key => {
                        let reason = if key.is_empty() {
                            SkipReason::NoPrimaryKey
                        } else {
                            SkipReason::CompositePrimaryKey
                        };
                        debug!(
                            "Skipped {}.{} -> {}: {:?}",
                            table.name, column.name, target.name, reason
                        );
                        outcome.skipped.push(SkippedInference {
                            source_table: table.name.clone(),
                            source_column: column.name.clone(),
                            target_table: target.name.clone(),
                            reason,
                        });
                    }
                }
            }
        }

        outcome
    }
}
