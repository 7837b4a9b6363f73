//! Pre-compiled DDL patterns.
//!
//! Uses `OnceLock` so each pattern is compiled once per process.

use regex::Regex;
use std::sync::OnceLock;

/// Regex patterns used by the splitter and rewriter.
pub(crate) struct DdlPatterns {
    /// `CREATE [TEMPORARY] TABLE` at the start of a statement body
    pub create_table_keyword: Regex,
    /// Zero-date column default rejected by strict InnoDB
    pub zero_date_default: Regex,
}

impl DdlPatterns {
    /// Gets the singleton instance of pre-compiled patterns.
    pub(crate) fn instance() -> &'static Self {
        static PATTERNS: OnceLock<DdlPatterns> = OnceLock::new();
        PATTERNS.get_or_init(Self::compile)
    }

    #[allow(clippy::expect_used)]
    fn compile() -> Self {
        Self {
            create_table_keyword: Regex::new(r"(?i)^CREATE\s+(?:TEMPORARY\s+)?TABLE\b")
                .expect("Invalid create table keyword pattern"),
            zero_date_default: Regex::new(r"(?i)\s+DEFAULT\s+'0000-00-00(?: 00:00:00)?'")
                .expect("Invalid zero date pattern"),
        }
    }
}
