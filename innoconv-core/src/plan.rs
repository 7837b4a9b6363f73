//! Split of inferred constraints into inline and deferred emission.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::Resolution;
use crate::models::{ForeignKeyCandidate, TableDefinition};

/// Why a constraint is emitted as a trailing ALTER instead of inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferReason {
    /// The edge lies on a cycle between different tables
    Cycle,
    /// The edge points back at its own table
    SelfReference,
    /// The target table is declared after the source table
    ForwardReference,
}

impl std::fmt::Display for DeferReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            DeferReason::Cycle => "cycle",
            DeferReason::SelfReference => "self reference",
            DeferReason::ForwardReference => "forward reference",
        };
        f.write_str(text)
    }
}

/// A constraint added after all statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredConstraint {
    /// The inferred key
    #[serde(flatten)]
    pub candidate: ForeignKeyCandidate,
    /// Why it could not be inlined
    pub reason: DeferReason,
}

/// Constraints to inline per table plus the ordered deferred list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmissionPlan {
    /// Inline constraints indexed by table declaration index
    inline: Vec<Vec<ForeignKeyCandidate>>,
    deferred: Vec<DeferredConstraint>,
}

impl EmissionPlan {
    /// Places every candidate.
    ///
    /// An edge is inlined only when it is not cyclic and its target is
    /// declared before its source, so the referenced table always exists
    /// when the constraint is created. Deferred constraints are ordered by
    /// source declaration index, then source column position.
    pub fn build(
        tables: &[TableDefinition],
        candidates: &[ForeignKeyCandidate],
        resolution: &Resolution,
    ) -> Self {
        let by_name: HashMap<&str, &TableDefinition> =
            tables.iter().map(|t| (t.name.as_str(), t)).collect();
        let mut plan = Self {
            inline: vec![Vec::new(); tables.len()],
            deferred: Vec::new(),
        };

        for candidate in candidates {
            let (Some(source), Some(target)) = (
                by_name.get(candidate.source_table.as_str()),
                by_name.get(candidate.target_table.as_str()),
            ) else {
                continue;
            };

            let reason = if candidate.is_self_reference() {
                Some(DeferReason::SelfReference)
            } else if resolution.is_cyclic_edge(candidate) {
                Some(DeferReason::Cycle)
            } else if target.declaration_index > source.declaration_index {
                Some(DeferReason::ForwardReference)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    debug!("Deferring {} ({})", candidate, reason);
                    plan.deferred.push(DeferredConstraint {
                        candidate: candidate.clone(),
                        reason,
                    });
                }
                None => match plan.inline.get_mut(source.declaration_index) {
                    Some(slot) => slot.push(candidate.clone()),
                    None => debug!("No table slot for {}", candidate),
                },
            }
        }

        let position = |constraint: &DeferredConstraint| {
            let table = by_name.get(constraint.candidate.source_table.as_str());
            (
                table.map_or(usize::MAX, |t| t.declaration_index),
                table
                    .and_then(|t| t.column(&constraint.candidate.source_column))
                    .map_or(u32::MAX, |c| c.ordinal_position),
            )
        };
        plan.deferred.sort_by_key(position);
        for constraints in &mut plan.inline {
            let Some(first) = constraints.first() else {
                continue;
            };
            if let Some(table) = by_name.get(first.source_table.as_str()) {
                constraints.sort_by_key(|c| {
                    table
                        .column(&c.source_column)
                        .map_or(u32::MAX, |column| column.ordinal_position)
                });
            }
        }

        plan
    }

    /// Constraints to add inside the CREATE TABLE of the table declared at
    /// `declaration_index`.
    pub fn inline_for(&self, declaration_index: usize) -> &[ForeignKeyCandidate] {
        self.inline
            .get(declaration_index)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All inline constraints in declaration order.
    pub fn inlined(&self) -> impl Iterator<Item = &ForeignKeyCandidate> {
        self.inline.iter().flatten()
    }

    pub fn deferred(&self) -> &[DeferredConstraint] {
        &self.deferred
    }

    pub fn inline_count(&self) -> usize {
        self.inline.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inline_count() == 0 && self.deferred.is_empty()
    }
}
