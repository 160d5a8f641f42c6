//! Syntax-neutral parse events.
//!
//! Both lexers turn their input into a stream of [`Token`]s. A token is an
//! [`Entry`](TokenKind::Entry) (a keyword with its raw value and optional
//! unit), or the [`Start`](TokenKind::Start) or [`Stop`](TokenKind::Stop) of
//! a section. Comments are entries named `COMMENT`. KVN data lines (ephemeris
//! rows, covariance rows) are entries with an empty name whose value is the
//! whole line.
//!
//! Tokens never interpret their value. The typed accessors below parse it on
//! demand, and every failure reports the keyword, raw text and location.

use crate::error::{Error, Result};
use crate::time::{Epoch, TimeTag};
use crate::units::Unit;
use std::str::FromStr;
use std::sync::Arc;

/// Keyword of comment entries in both syntaxes.
pub const COMMENT: &str = "COMMENT";

/// Kind of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Start,
    Stop,
    Entry,
}

/// One parse event with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub name: String,
    pub value: String,
    pub unit: Option<String>,
    /// Whole KVN value, when a trailing `[...]` was split off into `unit`.
    pub bracketed: Option<String>,
    pub line: usize,
    pub source: Arc<str>,
}

/// Enumerated field values that can be read from a token.
///
/// Implemented by the types declared with the crate's `ccsds_enum!` macro.
pub trait Enumerated: Sized + Copy {
    /// Name used in "expected ..." error messages.
    const KIND: &'static str;

    fn from_value(value: &str) -> Option<Self>;

    fn as_str(self) -> &'static str;
}

impl Token {
    /// Creates an entry token.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ccsds_ndm::{Token, TokenKind};
    ///
    /// let token = Token::entry("MASS", "1913.0", Some("kg"), 21, "opm.txt");
    /// assert_eq!(token.kind, TokenKind::Entry);
    /// assert_eq!(token.content(), "MASS = 1913.0");
    /// ```
    pub fn entry(
        name: impl Into<String>,
        value: impl Into<String>,
        unit: Option<&str>,
        line: usize,
        source: impl Into<Arc<str>>,
    ) -> Self {
        Token {
            kind: TokenKind::Entry,
            name: name.into(),
            value: value.into(),
            unit: unit.map(str::to_string),
            bracketed: None,
            line,
            source: source.into(),
        }
    }

    /// Creates a section start token.
    pub fn start(name: impl Into<String>, line: usize, source: impl Into<Arc<str>>) -> Self {
        Token {
            kind: TokenKind::Start,
            name: name.into(),
            value: String::new(),
            unit: None,
            bracketed: None,
            line,
            source: source.into(),
        }
    }

    /// Creates a section stop token.
    pub fn stop(name: impl Into<String>, line: usize, source: impl Into<Arc<str>>) -> Self {
        Token {
            kind: TokenKind::Stop,
            ..Token::start(name, line, source)
        }
    }

    pub fn is_entry(&self) -> bool {
        self.kind == TokenKind::Entry
    }

    pub fn is_start(&self) -> bool {
        self.kind == TokenKind::Start
    }

    pub fn is_stop(&self) -> bool {
        self.kind == TokenKind::Stop
    }

    pub fn is_comment(&self) -> bool {
        self.is_entry() && self.name == COMMENT
    }

    /// Whether this is a KVN data line.
    pub fn is_raw_line(&self) -> bool {
        self.is_entry() && self.name.is_empty()
    }

    /// The token as it would read in KVN, for diagnostics.
    pub fn content(&self) -> String {
        match self.kind {
            TokenKind::Entry if self.name.is_empty() => self.value.clone(),
            TokenKind::Entry => format!("{} = {}", self.name, self.value),
            TokenKind::Start => format!("{}_START", self.name),
            TokenKind::Stop => format!("{}_STOP", self.name),
        }
    }

    /// Keeps the text of the value as written, including a trailing `[...]`
    /// that the lexer took for a unit.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ccsds_ndm::Token;
    ///
    /// let token = Token::entry("OBJECT_NAME", "SAT", Some("A"), 3, "opm").with_bracketed("SAT [A]");
    /// assert_eq!(token.content_as_string(), "SAT [A]");
    /// ```
    pub fn content_as_string(&self) -> String {
        self.bracketed.clone().unwrap_or_else(|| self.value.clone())
    }

    /// Records the whole value of a KVN entry whose trailing `[...]` became `unit`.
    pub fn with_bracketed(mut self, text: impl Into<String>) -> Self {
        self.bracketed = Some(text.into());
        self
    }

    /// Comma-separated list of strings, with blanks dropped.
    pub fn content_as_list(&self) -> Vec<String> {
        self.bracketed
            .as_deref()
            .unwrap_or(&self.value)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Real number expressed in `declared` units, converted to SI.
    ///
    /// A unit carried by the token takes precedence over `declared`, as long
    /// as both have the same dimension.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ccsds_ndm::Token;
    /// use ccsds_ndm::units::KM;
    ///
    /// let default_unit = Token::entry("X", "6503.514", None, 1, "opm");
    /// assert_eq!(default_unit.content_as_f64(&KM).unwrap(), 6503514.0);
    ///
    /// let explicit_unit = Token::entry("X", "6503514", Some("m"), 1, "opm");
    /// assert_eq!(explicit_unit.content_as_f64(&KM).unwrap(), 6503514.0);
    ///
    /// let wrong_unit = Token::entry("X", "1.0", Some("s"), 1, "opm");
    /// assert!(wrong_unit.content_as_f64(&KM).is_err());
    /// ```
    pub fn content_as_f64(&self, declared: &Unit) -> Result<f64> {
        let raw = self.content_as_raw_f64()?;
        match self.unit.as_deref() {
            None => Ok(declared.to_si(raw)),
            Some(text) => {
                let unit = Unit::parse(text)
                    .ok_or_else(|| Error::incompatible_unit(self, text, declared.name()))?;
                if !unit.same_dimension(declared) {
                    return Err(Error::incompatible_unit(self, text, declared.name()));
                }
                Ok(unit.to_si(raw))
            }
        }
    }

    /// Real number without unit conversion.
    pub fn content_as_raw_f64(&self) -> Result<f64> {
        parse_f64(&self.value).ok_or_else(|| Error::invalid_value(self, "real number"))
    }

    /// Whitespace-separated reals without unit conversion.
    pub fn content_as_f64_list(&self) -> Result<Vec<f64>> {
        self.value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| parse_f64(s).ok_or_else(|| Error::invalid_value(self, "list of real numbers")))
            .collect()
    }

    pub fn content_as_int<T: FromStr>(&self) -> Result<T> {
        self.value
            .parse()
            .map_err(|_| Error::invalid_value(self, "integer"))
    }

    pub fn content_as_epoch(&self) -> Result<Epoch> {
        Epoch::parse(&self.value).ok_or_else(|| Error::invalid_value(self, "date"))
    }

    pub fn content_as_time_tag(&self) -> Result<TimeTag> {
        TimeTag::parse(&self.value).ok_or_else(|| Error::invalid_value(self, "time tag"))
    }

    pub fn content_as_enum<E: Enumerated>(&self) -> Result<E> {
        E::from_value(&self.value).ok_or_else(|| Error::invalid_value(self, E::KIND))
    }

    /// Index `n` of an indexed keyword `PREFIXn`, such as `PARTICIPANT_3`.
    pub fn index_after(&self, prefix: &str) -> Option<usize> {
        self.name.strip_prefix(prefix)?.parse().ok()
    }
}

/// Parses a CCSDS real number, which may use `d` or `D` as exponent marker.
///
/// Spelled-out non-finite values (`NaN`, `inf`, `Infinity`) are not numbers
/// in NDM files and are rejected.
pub(crate) fn parse_f64(text: &str) -> Option<f64> {
    if !text
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E' | b'd' | b'D'))
    {
        return None;
    }
    match text.parse() {
        Ok(value) => Some(value),
        Err(_) if text.contains(['d', 'D']) => text.replace(['d', 'D'], "e").parse().ok(),
        Err(_) => None,
    }
}
