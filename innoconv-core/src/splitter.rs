//! Splits dump text into top-level statements.
//!
//! The scanner tracks string literals, quoted identifiers and comments so
//! that a `;` inside any of them never ends a statement. Every byte of the
//! input belongs to exactly one yielded [`Statement`], which keeps
//! pass-through output byte-identical.

use crate::error::{Construct, ParseError};
use crate::models::{Statement, StatementKind};
use crate::patterns::DdlPatterns;

/// Returns a lazy iterator over the statements of `dump`.
///
/// Calling `split` again on the same text restarts the sequence.
///
/// # Example
/// ```rust
/// use innoconv_core::splitter::split;
///
/// let statements: Vec<_> = split("INSERT INTO t VALUES ('a;b');\nDROP TABLE t;")
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(statements.len(), 2);
/// assert_eq!(statements[0].text, "INSERT INTO t VALUES ('a;b');");
/// ```
pub fn split(dump: &str) -> StatementSplitter<'_> {
    StatementSplitter {
        dump,
        position: 0,
        line: 1,
        finished: false,
    }
}

/// Iterator produced by [`split`].
#[derive(Debug, Clone)]
pub struct StatementSplitter<'a> {
    dump: &'a str,
    position: usize,
    line: usize,
    finished: bool,
}

impl<'a> Iterator for StatementSplitter<'a> {
    type Item = Result<Statement<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.position >= self.dump.len() {
            return None;
        }

        let rest = &self.dump[self.position..];
        match scan_statement(rest) {
            Ok(Scanned { len, terminated }) => {
                let text = &rest[..len];
                let body_start = skip_trivia(text);
                let statement = Statement {
                    text,
                    kind: classify(&text[body_start..]),
                    line: self.line + count_newlines(&text[..body_start]),
                    offset: self.position,
                    body_start,
                    terminated,
                };

                self.position += len;
                self.line += count_newlines(text);
                Some(Ok(statement))
            }
            Err(Unterminated { construct, start }) => {
                self.finished = true;
                Some(Err(ParseError::Unterminated {
                    construct,
                    line: self.line + count_newlines(&rest[..start]),
                }))
            }
        }
    }
}

impl std::iter::FusedIterator for StatementSplitter<'_> {}

fn classify(body: &str) -> StatementKind {
    if DdlPatterns::instance().create_table_keyword.is_match(body) {
        StatementKind::CreateTable
    } else {
        StatementKind::Other
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

struct Scanned {
    len: usize,
    terminated: bool,
}

struct Unterminated {
    construct: Construct,
    start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Quoted { quote: u8, start: usize },
    LineComment,
    BlockComment { start: usize },
}

/// Scans one statement from the start of `text`.
///
/// All delimiters are ASCII, so scanning bytes is safe for UTF-8 input:
/// continuation bytes never compare equal to them.
fn scan_statement(text: &str) -> Result<Scanned, Unterminated> {
    let bytes = text.as_bytes();
    let mut state = State::Normal;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match state {
            State::Normal => match b {
                b'\'' | b'"' | b'`' => state = State::Quoted { quote: b, start: i },
                b'#' => state = State::LineComment,
                b'-' if next == Some(b'-') && starts_line_comment(bytes.get(i + 2)) => {
                    state = State::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = State::BlockComment { start: i };
                    i += 1;
                }
                b';' => {
                    return Ok(Scanned {
                        len: i + 1,
                        terminated: true,
                    });
                }
                _ => {}
            },
            State::Quoted { quote, .. } => {
                if b == b'\\' && quote != b'`' {
                    // Backslash escapes the next byte inside string literals
                    i += 1;
                } else if b == quote {
                    if next == Some(quote) {
                        i += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment { .. } => {
                if b == b'*' && next == Some(b'/') {
                    state = State::Normal;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    match state {
        State::Quoted { quote, start } => Err(Unterminated {
            construct: if quote == b'`' {
                Construct::QuotedIdentifier
            } else {
                Construct::StringLiteral
            },
            start,
        }),
        State::BlockComment { start } => Err(Unterminated {
            construct: Construct::BlockComment,
            start,
        }),
        State::Normal | State::LineComment => Ok(Scanned {
            len: bytes.len(),
            terminated: false,
        }),
    }
}

/// MySQL only treats `--` as a comment when followed by whitespace or EOF.
fn starts_line_comment(after: Option<&u8>) -> bool {
    after.is_none_or(|b| b.is_ascii_whitespace())
}

/// Length of the whitespace and comments at the start of `text`.
///
/// Block comments are skipped as well, so the body of
/// `/*!40101 SET NAMES utf8 */;` is just `;`.
pub(crate) fn skip_trivia(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let rest = &bytes[i..];
        if rest.starts_with(b"#")
            || (rest.starts_with(b"--") && starts_line_comment(rest.get(2)))
        {
            i += rest
                .iter()
                .position(|&b| b == b'\n')
                .map_or(rest.len(), |p| p + 1);
        } else if rest.starts_with(b"/*") {
            i += rest[2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map_or(rest.len(), |p| p + 4);
        } else {
            return i;
        }
    }
}
