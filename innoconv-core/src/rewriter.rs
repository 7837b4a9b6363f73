//! Re-serializes a parsed dump with the target engine and foreign keys.
//!
//! Statements are copied through byte-for-byte. Parsed CREATE TABLE
//! statements are edited in place at the offsets recorded by the parser,
//! so formatting, comments and table options survive untouched.

use sha2::{Digest, Sha256};

use crate::config::ConverterConfig;
use crate::models::{ForeignKeyCandidate, Statement, TableDefinition};
use crate::parser::{ParsedDump, ParsedStatement};
use crate::patterns::DdlPatterns;
use crate::plan::EmissionPlan;

/// Quotes an identifier with backticks, doubling embedded backticks.
///
/// # Example
/// ```rust
/// use innoconv_core::rewriter::quote_identifier;
///
/// assert_eq!(quote_identifier("drivers"), "`drivers`");
/// assert_eq!(quote_identifier("odd`name"), "`odd``name`");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Longest identifier MySQL accepts, in characters.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Hex digits of the name digest kept in a shortened constraint name.
const DIGEST_LEN: usize = 8;

/// Constraint name for a foreign key on `table.column`.
///
/// Names longer than [`MAX_IDENTIFIER_LEN`] are cut and end with `_` and a
/// digest of the full name, so distinct columns keep distinct names.
pub fn constraint_name(prefix: &str, table: &str, column: &str) -> String {
    let name = format!("{prefix}_{table}_{column}");
    if name.chars().count() <= MAX_IDENTIFIER_LEN {
        return name;
    }

    let digest = format!("{:x}", Sha256::digest(name.as_bytes()));
    let kept: String = name
        .chars()
        .take(MAX_IDENTIFIER_LEN - DIGEST_LEN - 1)
        .collect();
    format!("{kept}_{}", &digest[..DIGEST_LEN])
}

/// Column-list entry declaring `candidate` inside its CREATE TABLE.
pub fn inline_constraint(prefix: &str, candidate: &ForeignKeyCandidate) -> String {
    format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_identifier(&constraint_name(
            prefix,
            &candidate.source_table,
            &candidate.source_column
        )),
        quote_identifier(&candidate.source_column),
        quote_identifier(&candidate.target_table),
        quote_identifier(&candidate.target_column),
    )
}

/// Trailing ALTER TABLE statement adding `candidate`.
pub fn alter_statement(prefix: &str, candidate: &ForeignKeyCandidate) -> String {
    format!(
        "ALTER TABLE {} ADD {};",
        quote_identifier(&candidate.source_table),
        inline_constraint(prefix, candidate)
    )
}

/// Writes the converted dump.
#[derive(Debug, Clone)]
pub struct DumpRewriter {
    target_engine: String,
    constraint_prefix: String,
    strip_zero_date_defaults: bool,
}

impl DumpRewriter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            target_engine: config.target_engine.clone(),
            constraint_prefix: config.constraint_prefix.clone(),
            strip_zero_date_defaults: config.strip_zero_date_defaults,
        }
    }

    /// Produces the output text for `dump` according to `plan`.
    ///
    /// Deferred constraints follow the last statement, after a blank line,
    /// one ALTER per line. Nothing is appended when there are none.
    pub fn rewrite(&self, dump: &ParsedDump<'_>, plan: &EmissionPlan) -> String {
        let capacity = dump
            .statements
            .iter()
            .map(|s| s.statement().text.len())
            .sum::<usize>();
        let mut output = String::with_capacity(capacity + capacity / 8);

        for parsed in &dump.statements {
            match parsed {
                ParsedStatement::Table { statement, table } => match dump.tables.get(*table) {
                    Some(definition) => self.rewrite_table(
                        statement,
                        definition,
                        plan.inline_for(definition.declaration_index),
                        &mut output,
                    ),
                    None => output.push_str(statement.text),
                },
                ParsedStatement::Raw(statement) => output.push_str(statement.text),
            }
        }

        if !plan.deferred().is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push('\n');
            for deferred in plan.deferred() {
                output.push_str(&alter_statement(&self.constraint_prefix, &deferred.candidate));
                output.push('\n');
            }
        }

        output
    }

    fn rewrite_table(
        &self,
        statement: &Statement<'_>,
        table: &TableDefinition,
        inline: &[ForeignKeyCandidate],
        output: &mut String,
    ) {
        let text = statement.text;
        let layout = &table.layout;

        // Column list, up to the end of its last entry
        output.push_str(&text[..statement.body_start]);
        let entries = &text[statement.body_start..layout.entries_end];
        if self.strip_zero_date_defaults {
            output.push_str(
                &DdlPatterns::instance()
                    .zero_date_default
                    .replace_all(entries, ""),
            );
        } else {
            output.push_str(entries);
        }

        for candidate in inline {
            output.push_str(&layout.entry_separator);
            output.push_str(&inline_constraint(&self.constraint_prefix, candidate));
        }

        // Closing parenthesis and table options
        output.push_str(&text[layout.entries_end..layout.options_start]);
        match &layout.engine_span {
            Some(span) => {
                output.push_str(&text[layout.options_start..span.start]);
                output.push_str(&self.target_engine);
                output.push_str(&text[span.end..]);
            }
            None => {
                output.push_str(" ENGINE=");
                output.push_str(&self.target_engine);
                output.push_str(&text[layout.options_start..]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyGraph;
    use crate::inference::ForeignKeyInferencer;
    use crate::parser::parse_dump;
    use crate::splitter::split;

    fn convert(dump: &str, config: &ConverterConfig) -> String {
        let statements: Vec<_> = split(dump)
            .collect::<std::result::Result<_, _>>()
            .expect("split");
        let parsed = parse_dump(&statements).expect("parse");
        let outcome = ForeignKeyInferencer::new(config).infer(&parsed.tables);
        let resolution = DependencyGraph::build(&parsed.tables, &outcome.candidates).resolve();
        let plan = EmissionPlan::build(&parsed.tables, &outcome.candidates, &resolution);
        DumpRewriter::new(config).rewrite(&parsed, &plan)
    }

    #[test]
    fn test_inline_constraint_and_engine() {
        let dump = "CREATE TABLE `drivers` (
  `driverId` int(11) NOT NULL,
  PRIMARY KEY (`driverId`)
) ENGINE=MyISAM DEFAULT CHARSET=utf8;

CREATE TABLE `races` (
  `raceId` int(11) NOT NULL,
  `driverId` int(11) NOT NULL,
  PRIMARY KEY (`raceId`)
) ENGINE=MyISAM DEFAULT CHARSET=utf8;
";
        let expected = "CREATE TABLE `drivers` (
  `driverId` int(11) NOT NULL,
  PRIMARY KEY (`driverId`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8;

CREATE TABLE `races` (
  `raceId` int(11) NOT NULL,
  `driverId` int(11) NOT NULL,
  PRIMARY KEY (`raceId`),
  CONSTRAINT `fk_races_driverId` FOREIGN KEY (`driverId`) REFERENCES `drivers` (`driverId`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8;
";
        assert_eq!(convert(dump, &ConverterConfig::default()), expected);
    }

    #[test]
    fn test_cycle_becomes_trailing_alters() {
        let dump = "CREATE TABLE A (id int PRIMARY KEY, b_id int);\nCREATE TABLE B (id int PRIMARY KEY, a_id int);";
        let expected = "CREATE TABLE A (id int PRIMARY KEY, b_id int) ENGINE=InnoDB;
CREATE TABLE B (id int PRIMARY KEY, a_id int) ENGINE=InnoDB;

ALTER TABLE `A` ADD CONSTRAINT `fk_A_b_id` FOREIGN KEY (`b_id`) REFERENCES `B` (`id`);
ALTER TABLE `B` ADD CONSTRAINT `fk_B_a_id` FOREIGN KEY (`a_id`) REFERENCES `A` (`id`);
";
        assert_eq!(convert(dump, &ConverterConfig::default()), expected);
    }

    #[test]
    fn test_other_statements_pass_through() {
        let dump = "/*!40101 SET NAMES utf8 */;\n-- data\nINSERT INTO t VALUES ('x;y');\n";
        assert_eq!(convert(dump, &ConverterConfig::default()), dump);
    }

    #[test]
    fn test_custom_engine_and_prefix() {
        let config = ConverterConfig::default()
            .with_target_engine("Aria")
            .with_constraint_prefix("ref");
        let dump = "CREATE TABLE a (id int PRIMARY KEY) TYPE=MyISAM;\nCREATE TABLE b (id int PRIMARY KEY, a_id int);";
        let output = convert(dump, &config);

        assert!(output.contains("CREATE TABLE a (id int PRIMARY KEY) TYPE=Aria;"));
        assert!(output.contains(
            "CREATE TABLE b (id int PRIMARY KEY, a_id int, CONSTRAINT `ref_b_a_id` FOREIGN KEY (`a_id`) REFERENCES `a` (`id`)) ENGINE=Aria;"
        ));
    }

    #[test]
    fn test_strip_zero_date_defaults() {
        let dump = "CREATE TABLE t (id int PRIMARY KEY, seen datetime NOT NULL DEFAULT '0000-00-00 00:00:00', born date DEFAULT '0000-00-00') ENGINE=MyISAM;";
        let config = ConverterConfig::default().with_strip_zero_date_defaults(true);

        assert_eq!(
            convert(dump, &config),
            "CREATE TABLE t (id int PRIMARY KEY, seen datetime NOT NULL, born date) ENGINE=InnoDB;"
        );
        assert!(convert(dump, &ConverterConfig::default()).contains("'0000-00-00'"));
    }

    #[test]
    fn test_missing_trailing_newline_before_alters() {
        let dump = "CREATE TABLE b (id int PRIMARY KEY, a_id int);\nCREATE TABLE a (id int PRIMARY KEY);";
        let output = convert(dump, &ConverterConfig::default());
        assert!(output.ends_with(
            "ENGINE=InnoDB;\n\nALTER TABLE `b` ADD CONSTRAINT `fk_b_a_id` FOREIGN KEY (`a_id`) REFERENCES `a` (`id`);\n"
        ));
    }

    #[test]
    fn test_quote_identifier_and_names() {
        assert_eq!(quote_identifier("a`b"), "`a``b`");
        assert_eq!(constraint_name("fk", "races", "driverId"), "fk_races_driverId");
    }

    #[test]
    fn test_long_constraint_names_are_shortened() {
        let table = "driver_standings_by_season_and_constructor";
        let first = constraint_name("fk", table, "previous_constructor_id");
        let second = constraint_name("fk", table, "previous_constructor_idx");

        assert_eq!(first.chars().count(), MAX_IDENTIFIER_LEN);
        assert_eq!(second.chars().count(), MAX_IDENTIFIER_LEN);
        assert!(first.starts_with("fk_driver_standings_by_season_and_constructor_"));
        assert_ne!(first, second);
        assert_eq!(first, constraint_name("fk", table, "previous_constructor_id"));

        let accented = constraint_name("fk", &"é".repeat(80), "ça_id");
        assert_eq!(accented.chars().count(), MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn test_constraint_goes_before_trailing_comment() {
        let dump = "CREATE TABLE drivers (driverId int PRIMARY KEY) ENGINE=MyISAM;
CREATE TABLE races (
  raceId int NOT NULL, -- the race's id
  driverId int NOT NULL,
  PRIMARY KEY (raceId) -- surrogate key
) ENGINE=MyISAM COMMENT='was TYPE=HEAP';
";
        let expected = "CREATE TABLE drivers (driverId int PRIMARY KEY) ENGINE=InnoDB;
CREATE TABLE races (
  raceId int NOT NULL, -- the race's id
  driverId int NOT NULL,
  PRIMARY KEY (raceId),
  CONSTRAINT `fk_races_driverId` FOREIGN KEY (`driverId`) REFERENCES `drivers` (`driverId`) -- surrogate key
) ENGINE=InnoDB COMMENT='was TYPE=HEAP';
";
        assert_eq!(convert(dump, &ConverterConfig::default()), expected);
    }

    #[test]
    fn test_engine_is_added_when_only_mentioned_in_a_comment() {
        let dump = "CREATE TABLE t (id int PRIMARY KEY) COMMENT='was TYPE=HEAP before';";
        assert_eq!(
            convert(dump, &ConverterConfig::default()),
            "CREATE TABLE t (id int PRIMARY KEY) ENGINE=InnoDB COMMENT='was TYPE=HEAP before';"
        );
    }
}
