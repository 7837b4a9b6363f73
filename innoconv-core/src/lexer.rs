//! SQL tokens with byte spans.
//!
//! Wraps the `sqlparser` MySQL tokenizer, which understands quoting and
//! comments, and turns its line/column locations into byte ranges of the
//! statement text so that statements can be edited in place.

use std::ops::Range;

use sqlparser::dialect::MySqlDialect;
use sqlparser::tokenizer::{Location, Token, Tokenizer, TokenizerError};

/// A significant token and the bytes it occupies.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lexeme {
    pub token: Token,
    /// Byte range in the tokenized text, excluding surrounding trivia
    pub span: Range<usize>,
}

impl Lexeme {
    /// True for an unquoted word equal to `keyword`, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.bare_word()
            .is_some_and(|word| word.eq_ignore_ascii_case(keyword))
    }

    /// The text of an unquoted word.
    pub fn bare_word(&self) -> Option<&str> {
        match &self.token {
            Token::Word(word) if word.quote_style.is_none() => Some(&word.value),
            _ => None,
        }
    }

    /// The unquoted name of a bare, backtick-quoted or double-quoted identifier.
    pub fn identifier(&self) -> Option<&str> {
        match &self.token {
            Token::Word(word) => Some(&word.value),
            Token::DoubleQuotedString(name) => Some(name),
            _ => None,
        }
    }

    pub fn is(&self, token: &Token) -> bool {
        &self.token == token
    }
}

/// Tokenizes `text[start..]`, dropping whitespace and comments.
///
/// Spans are offsets into `text`.
pub(crate) fn tokenize(text: &str, start: usize) -> Result<Vec<Lexeme>, TokenizerError> {
    let dialect = MySqlDialect {};
    let tokens = Tokenizer::new(&dialect, &text[start..]).tokenize_with_location()?;

    let mut cursor = Cursor::new(text, start);
    let starts: Vec<usize> = tokens.iter().map(|t| cursor.seek(&t.location)).collect();

    Ok(tokens
        .into_iter()
        .enumerate()
        .filter(|(_, t)| !matches!(t.token, Token::Whitespace(_)))
        .map(|(i, t)| Lexeme {
            token: t.token,
            span: starts[i]..starts.get(i + 1).copied().unwrap_or(text.len()),
        })
        .collect())
}

/// Walks the text in step with the tokenizer's 1-based line and column
/// numbers, which count characters.
struct Cursor<'t> {
    text: &'t str,
    offset: usize,
    line: u64,
    column: u64,
}

impl<'t> Cursor<'t> {
    fn new(text: &'t str, offset: usize) -> Self {
        Self {
            text,
            offset,
            line: 1,
            column: 1,
        }
    }

    fn seek(&mut self, target: &Location) -> usize {
        let text = self.text;
        let mut chars = text[self.offset..].chars();
        while (self.line, self.column) < (target.line, target.column) {
            let Some(c) = chars.next() else {
                break;
            };
            self.offset += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset
    }
}

/// Index of the parenthesis closing the one at `open`.
pub(crate) fn matching_paren(tokens: &[Lexeme], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, lexeme) in tokens.iter().enumerate().skip(open) {
        match lexeme.token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Uppercased unquoted words outside parentheses, with their indices.
pub(crate) fn top_level_words(tokens: &[Lexeme]) -> Vec<(usize, String)> {
    let mut depth = 0usize;
    let mut words = Vec::new();
    for (i, lexeme) in tokens.iter().enumerate() {
        match lexeme.token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 => {
                if let Some(word) = lexeme.bare_word() {
                    words.push((i, word.to_ascii_uppercase()));
                }
            }
            _ => {}
        }
    }
    words
}

/// Names in the first parenthesized list of `tokens`, such as a key's
/// column list. Prefix lengths and sort orders are ignored.
pub(crate) fn identifier_list(tokens: &[Lexeme]) -> Option<Vec<String>> {
    let open = tokens.iter().position(|t| t.is(&Token::LParen))?;
    let close = matching_paren(tokens, open)?;

    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut expect_name = true;
    for lexeme in &tokens[open + 1..close] {
        match lexeme.token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => expect_name = true,
            _ if depth == 0 && expect_name => {
                if let Some(name) = lexeme.identifier() {
                    names.push(name.to_string());
                }
                expect_name = false;
            }
            _ => {}
        }
    }
    Some(names)
}

/// Reads a possibly schema-qualified name at `pos`, returning its last
/// component and the index after it.
pub(crate) fn qualified_name(tokens: &[Lexeme], pos: usize) -> Option<(String, usize)> {
    let mut name = tokens.get(pos)?.identifier()?;
    let mut next = pos + 1;
    while tokens.get(next).is_some_and(|t| t.is(&Token::Period)) {
        name = tokens.get(next + 1)?.identifier()?;
        next += 2;
    }
    Some((name.to_string(), next))
}
