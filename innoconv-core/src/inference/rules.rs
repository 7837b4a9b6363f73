//! Naming rules and candidate ranking.
//!
//! Ranking is a pure function of the column name and the table set; the
//! same inputs always select the same target.

use crate::models::{CandidateRank, InferenceRule};

use super::naming::{IdSuffix, compact, edit_distance, same_noun, singularize, strip_id_suffix};

/// The set of table names a column may refer to, with precomputed forms.
#[derive(Debug, Clone, Default)]
pub struct TableNames {
    entries: Vec<TableName>,
}

#[derive(Debug, Clone)]
struct TableName {
    name: String,
    lower: String,
    singular: String,
    compact: String,
}

impl TableNames {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let entries = names
            .into_iter()
            .map(|name| {
                let lower = name.to_lowercase();
                TableName {
                    name: name.to_string(),
                    singular: singularize(&lower),
                    compact: compact(&lower),
                    lower,
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Every table `column` could refer to, best first.
///
/// `excluded` removes one table from consideration, normally the column's
/// own table.
pub fn rank_targets(column: &str, excluded: Option<&str>, tables: &TableNames) -> Vec<CandidateRank> {
    let Some((stem, suffix)) = strip_id_suffix(column) else {
        return Vec::new();
    };
    let stem = stem.to_lowercase();

    let mut ranks: Vec<CandidateRank> = tables
        .entries
        .iter()
        .filter(|table| Some(table.name.as_str()) != excluded)
        .filter_map(|table| {
            match_rule(&stem, suffix, table).map(|rule| CandidateRank {
                rule,
                distance: edit_distance(&stem, &table.lower),
                target_table: table.name.clone(),
            })
        })
        .collect();
    ranks.sort();
    ranks
}

/// The selected target for `column`, if any rule matches.
pub fn best_target(column: &str, excluded: Option<&str>, tables: &TableNames) -> Option<CandidateRank> {
    rank_targets(column, excluded, tables).into_iter().next()
}

fn match_rule(stem: &str, suffix: IdSuffix, table: &TableName) -> Option<InferenceRule> {
    let exact = stem == table.lower || stem == table.singular;
    match suffix {
        IdSuffix::Snake if exact => Some(InferenceRule::SnakeSuffix),
        IdSuffix::Camel if exact => Some(InferenceRule::CamelSuffix),
        _ if same_noun(&compact(stem), &table.compact) => Some(InferenceRule::Pluralized),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> TableNames {
        TableNames::new(list.iter().copied())
    }

    #[test]
    fn test_snake_rule_matches_singular_and_plural_tables() {
        let tables = names(&["circuits", "status"]);

        let rank = best_target("circuit_id", None, &tables).expect("match");
        assert_eq!(rank.rule, InferenceRule::SnakeSuffix);
        assert_eq!(rank.target_table, "circuits");

        let rank = best_target("status_id", None, &tables).expect("match");
        assert_eq!(rank.rule, InferenceRule::SnakeSuffix);
        assert_eq!(rank.target_table, "status");
    }

    #[test]
    fn test_camel_rule() {
        let tables = names(&["drivers"]);
        let rank = best_target("driverId", None, &tables).expect("match");
        assert_eq!(rank.rule, InferenceRule::CamelSuffix);
        assert_eq!(rank.target_table, "drivers");
        assert_eq!(rank.distance, 1);
    }

    #[test]
    fn test_pluralized_rule_ignores_underscores() {
        let tables = names(&["driver", "race_results"]);

        let rank = best_target("drivers_id", None, &tables).expect("match");
        assert_eq!(rank.rule, InferenceRule::Pluralized);
        assert_eq!(rank.target_table, "driver");

        let rank = best_target("raceResultId", None, &tables).expect("match");
        assert_eq!(rank.rule, InferenceRule::Pluralized);
        assert_eq!(rank.target_table, "race_results");
    }

    #[test]
    fn test_no_match_without_table() {
        let tables = names(&["drivers", "races"]);
        assert!(best_target("status_id", None, &tables).is_none());
        assert!(best_target("name", None, &tables).is_none());
        assert!(rank_targets("id", None, &tables).is_empty());
    }

    #[test]
    fn test_excluded_table_is_never_selected() {
        let tables = names(&["drivers"]);
        assert!(best_target("driverId", Some("drivers"), &tables).is_none());
    }

    #[test]
    fn test_ambiguous_match_prefers_specific_rule_then_distance() {
        // Both match rule 1; `status` wins on distance.
        let tables = names(&["statuses", "status"]);
        let ranks = rank_targets("status_id", None, &tables);

        assert_eq!(ranks.len(), 2);
        assert_eq!(ranks[0].target_table, "status");
        assert_eq!(ranks[0].rule, InferenceRule::SnakeSuffix);
        assert_eq!(ranks[0].distance, 0);
        assert_eq!(ranks[1].target_table, "statuses");
    }

    #[test]
    fn test_tie_break_is_lexicographic() {
        let tables = names(&["race", "races"]);
        let ranks = rank_targets("raceId", None, &tables);
        assert_eq!(ranks[0].target_table, "race");
        assert_eq!(ranks[0].distance, 0);

        // Equal rule and distance fall back to byte order of the name.
        let tables = names(&["Teams", "teams"]);
        let ranks = rank_targets("team_id", None, &tables);
        assert_eq!(ranks.len(), 2);
        assert_eq!(ranks[0].distance, ranks[1].distance);
        assert_eq!(ranks[0].target_table, "Teams");
    }

    #[test]
    fn test_ranking_is_independent_of_table_order() {
        let forward = names(&["status", "statuses", "states"]);
        let backward = names(&["states", "statuses", "status"]);
        assert_eq!(
            rank_targets("status_id", None, &forward),
            rank_targets("status_id", None, &backward)
        );
    }
}
