//! Error types for NDM lexing, parsing and generation.
//!
//! Every error names the source it came from (a file name, or whatever label
//! the caller handed to [`from_str_named`](crate::from_str_named)), and every
//! error raised while looking at a specific token also carries the line number
//! and the offending text.
//!
//! ## Error Categories
//!
//! - **Lexical errors**: a KVN line or XML element that cannot be tokenized
//! - **Structural errors**: section start/stop markers out of place, premature end of input
//! - **Keyword errors**: keywords unknown to the current section, or forbidden by the format version
//! - **Value errors**: values that fail to parse as the declared type, or carry an incompatible unit
//! - **Build errors**: mandatory keywords missing, declared counts that disagree with the data
//! - **Generation errors**: mandatory values missing on output, values that would not read back, segments written out of order
//!
//! ## Examples
//!
//! ```rust
//! use ccsds_ndm::{from_str, Error, Opm};
//!
//! let result = from_str::<Opm>("CCSDS_OPM_VERS = 3.0\nNOT A KVN LINE\n");
//! match result {
//!     Err(Error::UnparsableLine { line, .. }) => assert_eq!(line, 2),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use crate::token::Token;
use thiserror::Error;

/// Represents all possible errors raised while reading or writing navigation data messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// A KVN line matching none of the recognized line shapes
    #[error("unable to parse line {line} of {source_name}:\n{content}")]
    UnparsableLine {
        source_name: String,
        line: usize,
        content: String,
    },

    /// Malformed XML
    #[error("XML error at line {line} of {source_name}: {msg}")]
    Xml {
        source_name: String,
        line: usize,
        msg: String,
    },

    /// A section start or stop marker that does not fit the current structure
    #[error("unexpected {marker} of section {name} at line {line} of {source_name}, expected {expected}")]
    UnexpectedSection {
        source_name: String,
        line: usize,
        marker: &'static str,
        name: String,
        expected: String,
    },

    /// A keyword not allowed in the current section
    #[error("unexpected keyword {keyword} at line {line} of {source_name}:\n{content}{hint}")]
    UnexpectedKeyword {
        source_name: String,
        line: usize,
        keyword: String,
        content: String,
        hint: String,
    },

    /// A value that cannot be parsed as the type declared for its keyword
    #[error("unable to parse {keyword} at line {line} of {source_name} as {expected}: {keyword} = {value}")]
    InvalidValue {
        source_name: String,
        line: usize,
        keyword: String,
        value: String,
        expected: String,
    },

    /// A unit whose physical dimension differs from the keyword's declared unit
    #[error("unit [{unit}] of {keyword} at line {line} of {source_name} is not compatible with [{expected}]")]
    IncompatibleUnit {
        source_name: String,
        line: usize,
        keyword: String,
        unit: String,
        expected: String,
    },

    /// A mandatory keyword left unset when the document was built or written
    #[error("missing mandatory keyword {keyword} in {container} of {source_name}")]
    MissingKeyword {
        source_name: String,
        keyword: String,
        container: String,
    },

    /// A declared count disagreeing with the number of entries supplied
    #[error("{keyword} in {source_name} declares {declared} entries but {found} were found")]
    CountMismatch {
        source_name: String,
        keyword: String,
        declared: usize,
        found: usize,
    },

    /// An indexed keyword (`PARTICIPANT_n`, `SENSORS_USED_n`) out of sequence
    #[error("{keyword} at line {line} of {source_name} has index {found}, expected index {expected}")]
    InvalidIndex {
        source_name: String,
        line: usize,
        keyword: String,
        expected: usize,
        found: usize,
    },

    /// A comment appearing after the first field of its container
    #[error("comment at line {line} of {source_name} must appear before the first field of its section")]
    CommentNotAllowed { source_name: String, line: usize },

    /// A keyword the declared format version does not know
    #[error("keyword {keyword} at line {line} of {source_name} is not allowed in format version {version}")]
    KeywordNotAllowed {
        source_name: String,
        line: usize,
        keyword: String,
        version: f64,
    },

    /// Input ended before the message was complete
    #[error("unexpected end of {source_name}, expected {expected}")]
    UnexpectedEof {
        source_name: String,
        expected: String,
    },

    /// A value the generator cannot write so that it reads back unchanged
    #[error("cannot write {keyword} to {output_name}: {reason}")]
    Unwritable {
        output_name: String,
        keyword: String,
        reason: String,
    },

    /// A segment starting before the end of the previously written one
    #[error("segment of {output_name} starting at {start} precedes the previous segment ending at {previous}")]
    SegmentOrder {
        output_name: String,
        previous: String,
        start: String,
    },
}

impl Error {
    /// Creates an I/O error for reading or writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Creates an error for a KVN line that could not be tokenized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ccsds_ndm::Error;
    ///
    /// let err = Error::unparsable_line("orbit.opm", 12, "???");
    /// assert!(err.to_string().contains("line 12"));
    /// ```
    pub fn unparsable_line(source_name: &str, line: usize, content: &str) -> Self {
        Error::UnparsableLine {
            source_name: source_name.to_string(),
            line,
            content: content.to_string(),
        }
    }

    /// Creates an XML well-formedness error.
    pub fn xml(source_name: &str, line: usize, msg: &str) -> Self {
        Error::Xml {
            source_name: source_name.to_string(),
            line,
            msg: msg.to_string(),
        }
    }

    /// Creates a structural error for a start or stop token that does not belong here.
    pub fn unexpected_section(token: &Token, expected: &str) -> Self {
        Error::UnexpectedSection {
            source_name: token.source.to_string(),
            line: token.line,
            marker: if token.is_stop() { "stop" } else { "start" },
            name: token.name.clone(),
            expected: expected.to_string(),
        }
    }

    /// Creates an error for a keyword unknown to the current section.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ccsds_ndm::{Error, Token};
    ///
    /// let token = Token::entry("OBJECT_NAM", "ISS", None, 9, "omm.txt");
    /// let err = Error::unexpected_keyword(&token, Some("metadata"));
    /// assert!(err.to_string().contains("line 9"));
    /// assert!(err.to_string().contains("OBJECT_NAM = ISS"));
    /// ```
    pub fn unexpected_keyword(token: &Token, section: Option<&str>) -> Self {
        Error::UnexpectedKeyword {
            source_name: token.source.to_string(),
            line: token.line,
            keyword: token.name.clone(),
            content: token.content(),
            hint: section
                .map(|s| format!("\nHelp: {} is not a {} keyword", token.name, s))
                .unwrap_or_default(),
        }
    }

    /// Creates a type/format error for the value carried by `token`.
    pub fn invalid_value(token: &Token, expected: &str) -> Self {
        Error::InvalidValue {
            source_name: token.source.to_string(),
            line: token.line,
            keyword: token.name.clone(),
            value: token.value.clone(),
            expected: expected.to_string(),
        }
    }

    /// Creates a format error for an XML data line element closed by `stop`
    /// before one of its children was seen.
    ///
    /// This is the XML counterpart of a KVN data line with too few fields.
    pub fn incomplete_line(stop: &Token, missing: &str) -> Self {
        Error::InvalidValue {
            source_name: stop.source.to_string(),
            line: stop.line,
            keyword: stop.name.clone(),
            value: String::new(),
            expected: format!("{} with a {} element", stop.name, missing),
        }
    }

    /// Creates a unit compatibility error for `token`.
    pub fn incompatible_unit(token: &Token, unit: &str, expected: &str) -> Self {
        Error::IncompatibleUnit {
            source_name: token.source.to_string(),
            line: token.line,
            keyword: token.name.clone(),
            unit: unit.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Creates a missing mandatory keyword error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ccsds_ndm::Error;
    ///
    /// let err = Error::missing_keyword("orbit.opm", "ORIGINATOR", "header");
    /// assert!(err.to_string().contains("ORIGINATOR"));
    /// ```
    pub fn missing_keyword(source_name: &str, keyword: &str, container: &str) -> Self {
        Error::MissingKeyword {
            source_name: source_name.to_string(),
            keyword: keyword.to_string(),
            container: container.to_string(),
        }
    }

    /// Creates a count mismatch error.
    pub fn count_mismatch(source_name: &str, keyword: &str, declared: usize, found: usize) -> Self {
        Error::CountMismatch {
            source_name: source_name.to_string(),
            keyword: keyword.to_string(),
            declared,
            found,
        }
    }

    /// Creates an error for an indexed keyword out of sequence.
    pub fn invalid_index(token: &Token, expected: usize, found: usize) -> Self {
        Error::InvalidIndex {
            source_name: token.source.to_string(),
            line: token.line,
            keyword: token.name.clone(),
            expected,
            found,
        }
    }

    /// Creates an error for a comment appearing too late in its section.
    pub fn comment_not_allowed(token: &Token) -> Self {
        Error::CommentNotAllowed {
            source_name: token.source.to_string(),
            line: token.line,
        }
    }

    /// Creates an error for a keyword the message version does not support.
    pub fn keyword_not_allowed(token: &Token, version: f64) -> Self {
        Error::KeywordNotAllowed {
            source_name: token.source.to_string(),
            line: token.line,
            keyword: token.name.clone(),
            version,
        }
    }

    /// Creates an unexpected end-of-input error.
    pub fn unexpected_eof(source_name: &str, expected: &str) -> Self {
        Error::UnexpectedEof {
            source_name: source_name.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Creates a segment ordering error raised by streaming writers.
    pub fn segment_order(output_name: &str, previous: &str, start: &str) -> Self {
        Error::SegmentOrder {
            output_name: output_name.to_string(),
            previous: previous.to_string(),
            start: start.to_string(),
        }
    }

    /// Creates an error for a value that would not survive being written.
    pub fn unwritable(output_name: &str, keyword: &str, reason: &str) -> Self {
        Error::Unwritable {
            output_name: output_name.to_string(),
            keyword: keyword.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Line number the error points at, when it is tied to a token.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::UnparsableLine { line, .. }
            | Error::Xml { line, .. }
            | Error::UnexpectedSection { line, .. }
            | Error::UnexpectedKeyword { line, .. }
            | Error::InvalidValue { line, .. }
            | Error::IncompatibleUnit { line, .. }
            | Error::InvalidIndex { line, .. }
            | Error::CommentNotAllowed { line, .. }
            | Error::KeywordNotAllowed { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_is_reported_for_token_errors() {
        let token = Token::entry("MASS", "heavy", None, 17, "opm.txt");
        let err = Error::invalid_value(&token, "real number");
        assert_eq!(err.line(), Some(17));
        assert!(err.to_string().contains("MASS = heavy"));
        assert!(err.to_string().contains("opm.txt"));
    }

    #[test]
    fn test_build_errors_have_no_line() {
        let err = Error::count_mismatch("ocm.txt", "NUMBER_SENSORS_USED", 3, 4);
        assert_eq!(err.line(), None);
        assert!(err.to_string().contains("declares 3 entries but 4 were found"));
    }

    #[test]
    fn test_incomplete_xml_line() {
        let stop = Token::stop("attitudeState", 9, "aem.xml");
        match Error::incomplete_line(&stop, "Q2") {
            Error::InvalidValue {
                line,
                keyword,
                expected,
                ..
            } => {
                assert_eq!(line, 9);
                assert_eq!(keyword, "attitudeState");
                assert_eq!(expected, "attitudeState with a Q2 element");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_keyword_hint() {
        let token = Token::entry("FOO", "1", None, 4, "x");
        let with_hint = Error::unexpected_keyword(&token, Some("header"));
        assert!(with_hint.to_string().contains("Help: FOO is not a header keyword"));
        let without = Error::unexpected_keyword(&token, None);
        assert!(!without.to_string().contains("Help"));
    }
}
