//! KVN line splitter.

use super::normalize;
use crate::error::{Error, Result};
use crate::token::{Token, COMMENT};
use std::str::Lines;
use std::sync::Arc;

/// Lazy tokenizer for keyword = value notation.
pub struct KvnLexer<'a> {
    lines: Lines<'a>,
    line: usize,
    source: Arc<str>,
}

impl<'a> KvnLexer<'a> {
    pub fn new(text: &'a str, source: Arc<str>) -> Self {
        KvnLexer {
            lines: text.trim_start_matches('\u{feff}').lines(),
            line: 0,
            source,
        }
    }

    fn tokenize(&self, raw: &str) -> Result<Token> {
        let line = raw.trim();

        if line.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.')) {
            return Ok(self.entry("", &normalize(line), None));
        }

        if let Some(text) = line.strip_prefix(COMMENT) {
            if text.is_empty() || text.starts_with(char::is_whitespace) {
                return Ok(self.entry(COMMENT, text.trim(), None));
            }
        }

        match line.split_once('=') {
            Some((key, value)) => {
                let key = key.trim();
                if !is_keyword(key) {
                    return Err(Error::unparsable_line(&self.source, self.line, raw));
                }
                let whole = value.trim();
                let (value, unit) = split_unit(whole);
                let token = self.entry(&key.to_ascii_uppercase(), &normalize(value), unit);
                Ok(match unit {
                    Some(_) => token.with_bracketed(normalize(whole)),
                    None => token,
                })
            }
            None if is_keyword(line) => {
                let upper = line.to_ascii_uppercase();
                if let Some(name) = upper.strip_suffix("_START") {
                    Ok(Token::start(name, self.line, self.source.clone()))
                } else if let Some(name) = upper.strip_suffix("_STOP") {
                    Ok(Token::stop(name, self.line, self.source.clone()))
                } else {
                    Err(Error::unparsable_line(&self.source, self.line, raw))
                }
            }
            None => Err(Error::unparsable_line(&self.source, self.line, raw)),
        }
    }

    fn entry(&self, name: &str, value: &str, unit: Option<&str>) -> Token {
        Token::entry(name, value, unit, self.line, self.source.clone())
    }
}

impl Iterator for KvnLexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.lines.next()?;
            self.line += 1;
            if raw.trim().is_empty() {
                continue;
            }
            return Some(self.tokenize(raw));
        }
    }
}

pub(crate) fn is_keyword(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Splits a trailing `[unit]` off a value.
fn split_unit(value: &str) -> (&str, Option<&str>) {
    if let Some(stripped) = value.strip_suffix(']') {
        if let Some(open) = stripped.rfind('[') {
            return (stripped[..open].trim_end(), Some(stripped[open + 1..].trim()));
        }
    }
    (value, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn lex(text: &str) -> Vec<Token> {
        KvnLexer::new(text, Arc::from("test.kvn"))
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_entry_with_unit() {
        let tokens = lex("  x   =  6655.9942   [km] \n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "X");
        assert_eq!(tokens[0].value, "6655.9942");
        assert_eq!(tokens[0].unit.as_deref(), Some("km"));
        assert_eq!(tokens[0].line, 1);
    }

    #[test]
    fn test_bracketed_text_is_kept_for_text_keywords() {
        let tokens = lex("OBJECT_NAME = SAT  [A]\nX = 1.0 [km]\n");
        assert_eq!(tokens[0].value, "SAT");
        assert_eq!(tokens[0].unit.as_deref(), Some("A"));
        assert_eq!(tokens[0].content_as_string(), "SAT [A]");
        assert_eq!(tokens[1].content_as_string(), "1.0 [km]");
        assert_eq!(tokens[1].content_as_raw_f64().unwrap(), 1.0);
    }

    #[test]
    fn test_value_whitespace_collapses_but_comments_keep_it() {
        let tokens = lex("OBJECT_NAME = MARS   GLOBAL  SURVEYOR\nCOMMENT  two  spaces  \n");
        assert_eq!(tokens[0].value, "MARS GLOBAL SURVEYOR");
        assert!(tokens[1].is_comment());
        assert_eq!(tokens[1].value, "two  spaces");
    }

    #[test]
    fn test_blank_lines_count_for_line_numbers() {
        let tokens = lex("\n\nMETA_START\n\n   \nMETA_STOP\n");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Start);
        assert_eq!(tokens[0].name, "META");
        assert_eq!(tokens[0].line, 3);
        assert_eq!(tokens[1].kind, TokenKind::Stop);
        assert_eq!(tokens[1].line, 6);
    }

    #[test]
    fn test_data_lines() {
        let tokens = lex("2020-01-01T00:00:00  +1.0 -2.0   3.0\n-0.5 1\n.5\n");
        assert!(tokens.iter().all(Token::is_raw_line));
        assert_eq!(tokens[0].value, "2020-01-01T00:00:00 +1.0 -2.0 3.0");
    }

    #[test]
    fn test_empty_comment_and_value() {
        let tokens = lex("COMMENT\nMESSAGE_ID =\n");
        assert!(tokens[0].is_comment());
        assert_eq!(tokens[0].value, "");
        assert_eq!(tokens[1].value, "");
    }

    #[test]
    fn test_value_containing_equal_sign() {
        let tokens = lex("COMMENT a = b\nOD_METHOD = BWLS a=b\n");
        assert!(tokens[0].is_comment());
        assert_eq!(tokens[0].value, "a = b");
        assert_eq!(tokens[1].value, "BWLS a=b");
    }

    #[test]
    fn test_unparsable_lines() {
        for text in ["this is not kvn", "BAD KEY = 1", "META_BEGIN", "= 3"] {
            let mut lexer = KvnLexer::new(text, Arc::from("bad.kvn"));
            match lexer.next() {
                Some(Err(Error::UnparsableLine { line, content, .. })) => {
                    assert_eq!(line, 1);
                    assert_eq!(content, text);
                }
                other => panic!("unexpected {:?} for {}", other, text),
            }
        }
    }

    #[test]
    fn test_stops_at_end_of_input() {
        let mut lexer = KvnLexer::new("A = 1", Arc::from("x"));
        assert!(lexer.next().is_some());
        assert!(lexer.next().is_none());
        assert!(lexer.next().is_none());
    }
}
