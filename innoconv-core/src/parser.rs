//! CREATE TABLE parsing.
//!
//! Only as much structure is recovered as inference and rewriting need:
//! the table name, columns with their raw types, the primary key, already
//! declared foreign keys, and the byte offsets the rewriter edits at.
//! Anything that cannot be parsed degrades to a verbatim pass-through.

use std::collections::HashMap;
use std::ops::Range;

use sqlparser::tokenizer::Token;
use tracing::{debug, warn};

use crate::Result;
use crate::error::{ConvertError, TableParseError};
use crate::lexer::{
    Lexeme, identifier_list, matching_paren, qualified_name, tokenize, top_level_words,
};
use crate::models::{
    ColumnDefinition, SkippedStatement, Statement, TableDefinition, TableLayout,
};

/// A statement after the parsing stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedStatement<'a> {
    /// A CREATE TABLE with a structured definition at `table` in
    /// [`ParsedDump::tables`]
    Table { statement: Statement<'a>, table: usize },
    /// Emitted verbatim
    Raw(Statement<'a>),
}

impl<'a> ParsedStatement<'a> {
    /// The underlying statement.
    pub fn statement(&self) -> &Statement<'a> {
        match self {
            ParsedStatement::Table { statement, .. } | ParsedStatement::Raw(statement) => {
                statement
            }
        }
    }
}

/// Output of the parsing stage for a whole dump.
#[derive(Debug, Clone, Default)]
pub struct ParsedDump<'a> {
    /// Every input statement, in order
    pub statements: Vec<ParsedStatement<'a>>,
    /// Parsed tables in declaration order
    pub tables: Vec<TableDefinition>,
    /// CREATE TABLE statements passed through unmodified
    pub skipped: Vec<SkippedStatement>,
}

impl ParsedDump<'_> {
    /// Number of CREATE TABLE statements, parsed or not.
    pub fn create_table_count(&self) -> usize {
        self.statements
            .iter()
            .filter(|s| s.statement().is_create_table())
            .count()
    }
}

/// Parses every CREATE TABLE statement and collects foreign keys that
/// `ALTER TABLE` statements already add.
///
/// # Errors
/// Returns [`ConvertError::DuplicateTable`] when two parsed tables share a name.
pub fn parse_dump<'a>(statements: &[Statement<'a>]) -> Result<ParsedDump<'a>> {
    let mut dump = ParsedDump {
        statements: Vec::with_capacity(statements.len()),
        ..ParsedDump::default()
    };
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut altered: Vec<(String, String)> = Vec::new();

    for statement in statements {
        if !statement.is_create_table() {
            altered.extend(parse_alter_foreign_keys(statement));
            dump.statements.push(ParsedStatement::Raw(*statement));
            continue;
        }

        match parse_create_table(statement, dump.tables.len()) {
            Ok(table) => {
                if let Some(&first) = by_name.get(&table.name) {
                    return Err(ConvertError::duplicate_table(
                        table.name,
                        dump.tables[first].line,
                        statement.line,
                    ));
                }
                debug!(
                    "Parsed table '{}' with {} columns",
                    table.name,
                    table.columns.len()
                );
                let index = dump.tables.len();
                by_name.insert(table.name.clone(), index);
                dump.tables.push(table);
                dump.statements.push(ParsedStatement::Table {
                    statement: *statement,
                    table: index,
                });
            }
            Err(e) => {
                warn!(
                    "CREATE TABLE at line {} passed through unmodified: {}",
                    statement.line, e
                );
                dump.skipped.push(SkippedStatement {
                    line: statement.line,
                    reason: e.to_string(),
                });
                dump.statements.push(ParsedStatement::Raw(*statement));
            }
        }
    }

    for (table, column) in altered {
        match by_name.get(&table) {
            Some(&index) => {
                let definition = &mut dump.tables[index];
                if !definition.has_foreign_key_on(&column) {
                    definition.existing_foreign_keys.push(column);
                }
            }
            None => debug!(
                "ALTER TABLE adds a foreign key to unknown table '{}'",
                table
            ),
        }
    }

    Ok(dump)
}

/// Parses one CREATE TABLE statement.
///
/// `declaration_index` is the number of tables parsed before this one.
pub fn parse_create_table(
    statement: &Statement<'_>,
    declaration_index: usize,
) -> std::result::Result<TableDefinition, TableParseError> {
    let text = statement.text;
    let tokens = tokenize(text, statement.body_start)
        .map_err(|e| TableParseError::Tokenize(e.to_string()))?;

    let name_at = create_table_prefix_len(&tokens).ok_or(TableParseError::MissingTableName)?;
    let (name, open) =
        qualified_name(&tokens, name_at).ok_or(TableParseError::MissingTableName)?;
    if !tokens.get(open).is_some_and(|t| t.is(&Token::LParen)) {
        return Err(TableParseError::MissingColumnList);
    }

    let (entries, close) =
        column_list_entries(&tokens, open).ok_or(TableParseError::UnbalancedColumnList)?;
    let Some(last) = entries.last() else {
        return Err(TableParseError::EmptyColumnList);
    };
    let layout = TableLayout {
        entries_end: tokens[last.end - 1].span.end,
        entry_separator: entry_separator(
            text,
            tokens[open].span.start,
            tokens[last.start].span.start,
        ),
        options_start: tokens[close].span.end,
        engine_span: None,
    };

    let mut table = TableDefinition {
        name,
        columns: Vec::new(),
        primary_key: Vec::new(),
        engine: None,
        existing_foreign_keys: Vec::new(),
        declaration_index,
        line: statement.line,
        layout,
    };

    for (position, range) in entries.iter().enumerate() {
        parse_entry(&tokens[range.clone()], text, position + 1, &mut table)?;
    }

    if let Some(engine) = engine_value(&tokens[close + 1..]) {
        table.engine = Some(text[engine.span.clone()].to_string());
        table.layout.engine_span = Some(engine.span.clone());
    }

    Ok(table)
}

/// Collects `(table, column)` pairs for foreign keys added by an ALTER TABLE.
pub fn parse_alter_foreign_keys(statement: &Statement<'_>) -> Vec<(String, String)> {
    let is_alter = statement
        .body()
        .get(..5)
        .is_some_and(|head| head.eq_ignore_ascii_case("ALTER"));
    if !is_alter {
        return Vec::new();
    }
    let Ok(tokens) = tokenize(statement.text, statement.body_start) else {
        return Vec::new();
    };

    let mut pos = 1;
    while tokens
        .get(pos)
        .is_some_and(|t| t.is_keyword("ONLINE") || t.is_keyword("IGNORE"))
    {
        pos += 1;
    }
    if !tokens.get(pos).is_some_and(|t| t.is_keyword("TABLE")) {
        return Vec::new();
    }
    let Some((table, body)) = qualified_name(&tokens, pos + 1) else {
        return Vec::new();
    };

    let clauses = &tokens[body..];
    top_level_words(clauses)
        .windows(2)
        .filter(|pair| pair[0].1 == "FOREIGN" && pair[1].1 == "KEY" && pair[1].0 == pair[0].0 + 1)
        .filter_map(|pair| identifier_list(&clauses[pair[1].0 + 1..]))
        .flatten()
        .map(|column| (table.clone(), column))
        .collect()
}

/// Number of tokens in `CREATE [TEMPORARY] TABLE [IF NOT EXISTS]`.
fn create_table_prefix_len(tokens: &[Lexeme]) -> Option<usize> {
    let mut pos = keywords_at(tokens, 0, &["CREATE"])?;
    pos = keywords_at(tokens, pos, &["TEMPORARY"]).unwrap_or(pos);
    pos = keywords_at(tokens, pos, &["TABLE"])?;
    Some(keywords_at(tokens, pos, &["IF", "NOT", "EXISTS"]).unwrap_or(pos))
}

/// Index after `keywords` when they appear in sequence at `pos`.
fn keywords_at(tokens: &[Lexeme], pos: usize, keywords: &[&str]) -> Option<usize> {
    for (offset, keyword) in keywords.iter().enumerate() {
        if !tokens.get(pos + offset)?.is_keyword(keyword) {
            return None;
        }
    }
    Some(pos + keywords.len())
}

/// Token ranges of the non-empty entries of the column list opened at
/// `open`, and the index of its closing parenthesis.
fn column_list_entries(tokens: &[Lexeme], open: usize) -> Option<(Vec<Range<usize>>, usize)> {
    let close = matching_paren(tokens, open)?;
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut entry_start = open + 1;

    for (i, lexeme) in tokens.iter().enumerate().take(close).skip(open + 1) {
        match lexeme.token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                entries.push(entry_start..i);
                entry_start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(entry_start..close);
    entries.retain(|range| !range.is_empty());
    Some((entries, close))
}

/// The engine name of an `ENGINE=<name>` or legacy `TYPE=<name>` table
/// option outside parentheses.
fn engine_value(options: &[Lexeme]) -> Option<&Lexeme> {
    top_level_words(options)
        .into_iter()
        .filter(|(_, word)| word == "ENGINE" || word == "TYPE")
        .find_map(|(i, _)| {
            let mut value = i + 1;
            if options.get(value).is_some_and(|t| t.is(&Token::Eq)) {
                value += 1;
            }
            options.get(value).filter(|t| t.bare_word().is_some())
        })
}

/// Words that end a column's type and start its attributes.
const ATTRIBUTE_KEYWORDS: &[&str] = &[
    "NOT",
    "NULL",
    "DEFAULT",
    "AUTO_INCREMENT",
    "PRIMARY",
    "UNIQUE",
    "KEY",
    "COMMENT",
    "COLLATE",
    "CHARACTER",
    "CHARSET",
    "REFERENCES",
    "GENERATED",
    "AS",
    "CHECK",
    "ON",
    "STORAGE",
    "COLUMN_FORMAT",
    "INVISIBLE",
    "VISIBLE",
    "SRID",
    "CONSTRAINT",
];

/// Leading words of column-list entries that are not columns.
const INDEX_KEYWORDS: &[&str] = &["KEY", "INDEX", "UNIQUE", "FULLTEXT", "SPATIAL", "CHECK"];

fn parse_entry(
    entry: &[Lexeme],
    text: &str,
    position: usize,
    table: &mut TableDefinition,
) -> std::result::Result<(), TableParseError> {
    let first = &entry[0];
    let words = top_level_words(entry);

    if first.is_keyword("PRIMARY") {
        if let Some(columns) = identifier_list(entry) {
            table.primary_key = columns;
        }
        return Ok(());
    }
    if first.is_keyword("CONSTRAINT") || first.is_keyword("FOREIGN") {
        if let Some(at) = word_pair(&words, "FOREIGN", "KEY") {
            table
                .existing_foreign_keys
                .extend(identifier_list(&entry[at..]).unwrap_or_default());
        } else if word_pair(&words, "PRIMARY", "KEY").is_some()
            && let Some(columns) = identifier_list(entry)
        {
            table.primary_key = columns;
        }
        return Ok(());
    }
    if INDEX_KEYWORDS.iter().any(|keyword| first.is_keyword(keyword)) {
        return Ok(());
    }

    let name = first
        .identifier()
        .ok_or(TableParseError::InvalidColumn { position })?
        .to_string();
    let attributes = &entry[1..];
    let attribute_words = top_level_words(attributes);

    let type_len = attribute_words
        .iter()
        .find(|(_, word)| ATTRIBUTE_KEYWORDS.contains(&word.as_str()))
        .map_or(attributes.len(), |(i, _)| *i);
    if type_len == 0 {
        return Err(TableParseError::MissingColumnType { name });
    }
    let data_type =
        text[attributes[0].span.start..attributes[type_len - 1].span.end].to_string();

    if word_pair(&attribute_words, "PRIMARY", "KEY").is_some() && table.primary_key.is_empty() {
        table.primary_key = vec![name.clone()];
    }
    if attribute_words.iter().any(|(_, word)| word == "REFERENCES") {
        table.existing_foreign_keys.push(name.clone());
    }

    let ordinal_position = u32::try_from(table.columns.len() + 1).unwrap_or(u32::MAX);
    table.columns.push(ColumnDefinition {
        name,
        data_type,
        is_nullable: word_pair(&attribute_words, "NOT", "NULL").is_none(),
        ordinal_position,
    });
    Ok(())
}

/// Token index just after two adjacent words.
fn word_pair(words: &[(usize, String)], first: &str, second: &str) -> Option<usize> {
    words
        .windows(2)
        .find(|pair| pair[0].1 == first && pair[1].1 == second && pair[1].0 == pair[0].0 + 1)
        .map(|pair| pair[1].0 + 1)
}

/// Separator that makes an inserted entry look like its neighbours:
/// a newline plus the last entry's indentation for multi-line definitions.
fn entry_separator(text: &str, open: usize, last_entry_start: usize) -> String {
    let before = &text[open + 1..last_entry_start];
    match before.rfind('\n') {
        Some(newline) => {
            let indent = &before[newline + 1..];
            if indent.chars().all(|c| c == ' ' || c == '\t') {
                format!(",\n{indent}")
            } else {
                ",\n  ".to_string()
            }
        }
        None => ", ".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::split;

    fn statements(dump: &str) -> Vec<Statement<'_>> {
        split(dump).collect::<std::result::Result<_, _>>().expect("split")
    }

    fn parse(dump: &str) -> std::result::Result<TableDefinition, TableParseError> {
        let statements = statements(dump);
        parse_create_table(&statements[0], 0)
    }

    const DRIVERS: &str = "CREATE TABLE `drivers` (
  `driverId` int(11) NOT NULL AUTO_INCREMENT,
  `driverRef` varchar(255) NOT NULL DEFAULT '',
  `number` int(11) DEFAULT NULL,
  `dob` date DEFAULT NULL,
  `nationality` enum('a,b','c') DEFAULT NULL,
  PRIMARY KEY (`driverId`),
  UNIQUE KEY `url` (`url`)
) ENGINE=MyISAM AUTO_INCREMENT=843 DEFAULT CHARSET=utf8;";

    #[test]
    fn test_parse_mysqldump_table() {
        let table = parse(DRIVERS).expect("parse");

        assert_eq!(table.name, "drivers");
        assert_eq!(table.primary_key, vec!["driverId"]);
        assert_eq!(table.engine.as_deref(), Some("MyISAM"));
        assert_eq!(table.columns.len(), 5);

        let driver_id = &table.columns[0];
        assert_eq!(driver_id.name, "driverId");
        assert_eq!(driver_id.data_type, "int(11)");
        assert!(!driver_id.is_nullable);
        assert_eq!(driver_id.ordinal_position, 1);

        let nationality = &table.columns[4];
        assert_eq!(nationality.data_type, "enum('a,b','c')");
        assert!(nationality.is_nullable);
        assert_eq!(nationality.ordinal_position, 5);
    }

    #[test]
    fn test_layout_offsets() {
        let table = parse(DRIVERS).expect("parse");
        let layout = &table.layout;

        assert!(DRIVERS[..layout.entries_end].ends_with("UNIQUE KEY `url` (`url`)"));
        assert_eq!(layout.entry_separator, ",\n  ");
        assert!(DRIVERS[layout.options_start..].starts_with(" ENGINE=MyISAM"));
        let span = layout.engine_span.clone().expect("engine span");
        assert_eq!(&DRIVERS[span], "MyISAM");
    }

    #[test]
    fn test_inline_primary_key_and_bare_names() {
        let table =
            parse("create table if not exists f1.status (statusId int primary key, status varchar(10) not null);")
                .expect("parse");

        assert_eq!(table.name, "status");
        assert_eq!(table.primary_key, vec!["statusId"]);
        assert_eq!(table.columns.len(), 2);
        assert!(!table.columns[1].is_nullable);
        assert_eq!(table.engine, None);
        assert_eq!(table.layout.entry_separator, ", ");
    }

    #[test]
    fn test_composite_primary_key() {
        let table = parse(
            "CREATE TABLE `lapTimes` (`raceId` int(11) NOT NULL, `driverId` int(11) NOT NULL, `lap` int(11) NOT NULL, PRIMARY KEY (`raceId`,`driverId`,`lap`)) TYPE=MyISAM;",
        )
        .expect("parse");

        assert_eq!(table.primary_key, vec!["raceId", "driverId", "lap"]);
        assert_eq!(table.single_primary_key(), None);
        assert_eq!(table.engine.as_deref(), Some("MyISAM"));
    }

    #[test]
    fn test_existing_foreign_keys_are_recorded() {
        let table = parse(
            "CREATE TABLE `races` (
  `raceId` int(11) NOT NULL,
  `circuitId` int(11) NOT NULL,
  `driverId` int(11) REFERENCES drivers(driverId),
  PRIMARY KEY (`raceId`),
  CONSTRAINT `fk_races_circuitId` FOREIGN KEY (`circuitId`) REFERENCES `circuits` (`circuitId`)
) ENGINE=InnoDB;",
        )
        .expect("parse");

        assert_eq!(table.columns.len(), 3);
        assert!(table.has_foreign_key_on("circuitId"));
        assert!(table.has_foreign_key_on("driverId"));
        assert!(!table.has_foreign_key_on("raceId"));
    }

    #[test]
    fn test_unparseable_statements() {
        assert_eq!(
            parse("CREATE TABLE `copy` LIKE `drivers`;"),
            Err(TableParseError::MissingColumnList)
        );
        assert_eq!(
            parse("CREATE TABLE (a int);"),
            Err(TableParseError::MissingTableName)
        );
        assert_eq!(
            parse("CREATE TABLE t (a int;"),
            Err(TableParseError::UnbalancedColumnList)
        );
        assert_eq!(parse("CREATE TABLE t ();"), Err(TableParseError::EmptyColumnList));
        assert_eq!(
            parse("CREATE TABLE t (a int, (b) int);"),
            Err(TableParseError::InvalidColumn { position: 2 })
        );
        assert_eq!(
            parse("CREATE TABLE t (a NOT NULL);"),
            Err(TableParseError::MissingColumnType {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn test_parse_alter_foreign_keys() {
        let statements = statements(
            "\nALTER TABLE `A` ADD CONSTRAINT `fk_A_b_id` FOREIGN KEY (`b_id`) REFERENCES `B` (`id`);
ALTER TABLE races ADD FOREIGN KEY (circuitId) REFERENCES circuits(circuitId), ADD FOREIGN KEY fk (driverId) REFERENCES drivers(driverId);
ALTER TABLE races ADD INDEX (year);",
        );

        assert_eq!(
            parse_alter_foreign_keys(&statements[0]),
            vec![("A".to_string(), "b_id".to_string())]
        );
        assert_eq!(
            parse_alter_foreign_keys(&statements[1]),
            vec![
                ("races".to_string(), "circuitId".to_string()),
                ("races".to_string(), "driverId".to_string()),
            ]
        );
        assert!(parse_alter_foreign_keys(&statements[2]).is_empty());
    }

    #[test]
    fn test_parse_dump_collects_tables_and_warnings() {
        let dump = "CREATE TABLE a (id int, PRIMARY KEY (id)) ENGINE=MyISAM;
CREATE TABLE broken LIKE a;
INSERT INTO a VALUES (1);
CREATE TABLE b (id int, a_id int) ENGINE=MyISAM;
ALTER TABLE b ADD FOREIGN KEY (a_id) REFERENCES a (id);";
        let statements = statements(dump);
        let parsed = parse_dump(&statements).expect("parse dump");

        assert_eq!(parsed.tables.len(), 2);
        assert_eq!(parsed.tables[1].declaration_index, 1);
        assert_eq!(parsed.create_table_count(), 3);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 2);
        assert!(parsed.tables[1].has_foreign_key_on("a_id"));
        assert!(matches!(parsed.statements[1], ParsedStatement::Raw(_)));
        assert!(matches!(
            parsed.statements[3],
            ParsedStatement::Table { table: 1, .. }
        ));
    }

    #[test]
    fn test_duplicate_table_is_fatal() {
        let dump = "CREATE TABLE a (id int);\nCREATE TABLE `a` (id int);";
        let statements = statements(dump);
        let error = parse_dump(&statements).expect_err("duplicate");

        assert!(matches!(
            error,
            ConvertError::DuplicateTable {
                ref name,
                first_line: 1,
                second_line: 2,
            } if name == "a"
        ));
    }

    #[test]
    fn test_trailing_comment_stays_after_last_entry() {
        let dump = "CREATE TABLE races (
  raceId int NOT NULL,
  driverId int NOT NULL,
  PRIMARY KEY (raceId) -- surrogate key
) ENGINE=MyISAM;";
        let table = parse(dump).expect("parse");

        assert!(dump[..table.layout.entries_end].ends_with("PRIMARY KEY (raceId)"));
        assert_eq!(table.primary_key, vec!["raceId"]);
        assert_eq!(table.columns.len(), 2);
    }

    #[test]
    fn test_apostrophe_in_comment_does_not_open_string() {
        let dump = "CREATE TABLE races (
  raceId int NOT NULL, -- the race's id
  # driver's key
  driverId int /* it's nullable */ NULL,
  PRIMARY KEY (raceId)
) ENGINE=MyISAM;";
        let table = parse(dump).expect("parse");

        let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["raceId", "driverId"]);
        assert_eq!(table.columns[1].data_type, "int");
        assert_eq!(table.engine.as_deref(), Some("MyISAM"));
    }

    #[test]
    fn test_engine_inside_string_option_is_ignored() {
        let dump = "CREATE TABLE t (id int PRIMARY KEY) COMMENT='was TYPE=HEAP before';";
        let table = parse(dump).expect("parse");

        assert_eq!(table.engine, None);
        assert_eq!(table.layout.engine_span, None);

        let dump = "CREATE TABLE t (id int) COMMENT 'ENGINE=x' /* ENGINE=y */ ENGINE = MyISAM;";
        let table = parse(dump).expect("parse");
        let span = table.layout.engine_span.clone().expect("engine span");
        assert_eq!(&dump[span], "MyISAM");
    }

    #[test]
    fn test_keywords_inside_comments_are_ignored() {
        let table = parse(
            "CREATE TABLE t (
  a int, -- FOREIGN KEY (a) is added later
  /* PRIMARY KEY (b) */ b int NOT NULL
);",
        )
        .expect("parse");

        assert!(table.primary_key.is_empty());
        assert!(table.existing_foreign_keys.is_empty());
        assert!(!table.columns[1].is_nullable);
    }
}
