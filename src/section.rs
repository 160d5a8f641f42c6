//! Section names and the section stack.
//!
//! A section is known by two names: its KVN marker (`META` for
//! `META_START`/`META_STOP`), absent for sections KVN leaves implicit, and
//! its XML element name. Parsers keep a [`SectionStack`] of the sections
//! opened by start tokens; generators keep their own stack of
//! [`SectionName`]s.

use crate::error::{Error, Result};
use crate::options::Syntax;
use crate::token::Token;

/// Names of one section in both syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionName {
    pub kvn: Option<&'static str>,
    pub xml: &'static str,
}

impl SectionName {
    pub const HEADER: SectionName = SectionName::implicit("header");
    pub const BODY: SectionName = SectionName::implicit("body");
    pub const SEGMENT: SectionName = SectionName::implicit("segment");
    pub const METADATA: SectionName = SectionName::new("META", "metadata");
    pub const IMPLICIT_METADATA: SectionName = SectionName::implicit("metadata");
    pub const DATA: SectionName = SectionName::new("DATA", "data");
    pub const IMPLICIT_DATA: SectionName = SectionName::implicit("data");
    pub const USER_DEFINED: SectionName = SectionName::implicit("userDefinedParameters");

    pub const fn new(kvn: &'static str, xml: &'static str) -> Self {
        SectionName {
            kvn: Some(kvn),
            xml,
        }
    }

    /// A section without KVN markers.
    pub const fn implicit(xml: &'static str) -> Self {
        SectionName { kvn: None, xml }
    }

    /// Name of the section in `syntax`, if it appears there at all.
    pub fn name(&self, syntax: Syntax) -> Option<&'static str> {
        match syntax {
            Syntax::Kvn => self.kvn,
            Syntax::Xml => Some(self.xml),
        }
    }

    /// Whether `token` is the start of this section.
    pub fn is_start(&self, token: &Token, syntax: Syntax) -> bool {
        token.is_start() && self.name(syntax) == Some(token.name.as_str())
    }

    /// Whether `token` is the stop of this section.
    pub fn is_stop(&self, token: &Token, syntax: Syntax) -> bool {
        token.is_stop() && self.name(syntax) == Some(token.name.as_str())
    }
}

#[derive(Debug, Clone)]
struct Open {
    name: String,
    line: usize,
}

/// Stack of the sections opened while parsing.
#[derive(Debug, Clone, Default)]
pub struct SectionStack {
    open: Vec<Open>,
}

impl SectionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: &Token) {
        self.open.push(Open {
            name: token.name.clone(),
            line: token.line,
        });
    }

    /// Closes the innermost section, which must be the one `token` stops.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ccsds_ndm::section::SectionStack;
    /// use ccsds_ndm::Token;
    ///
    /// let mut stack = SectionStack::new();
    /// stack.push(&Token::start("META", 1, "oem"));
    /// assert!(stack.pop(&Token::stop("DATA", 5, "oem")).is_err());
    /// assert!(stack.pop(&Token::stop("META", 5, "oem")).is_ok());
    /// assert!(stack.is_empty());
    /// ```
    pub fn pop(&mut self, token: &Token) -> Result<()> {
        match self.open.last() {
            Some(open) if open.name == token.name => {
                self.open.pop();
                Ok(())
            }
            Some(open) => Err(Error::unexpected_section(
                token,
                &format!("end of {} opened at line {}", open.name, open.line),
            )),
            None => Err(Error::unexpected_section(token, "no open section")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Name of the innermost open section.
    pub fn top(&self) -> Option<&str> {
        self.open.last().map(|open| open.name.as_str())
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_per_syntax() {
        assert_eq!(SectionName::METADATA.name(Syntax::Kvn), Some("META"));
        assert_eq!(SectionName::METADATA.name(Syntax::Xml), Some("metadata"));
        assert_eq!(SectionName::HEADER.name(Syntax::Kvn), None);

        let start = Token::start("metadata", 4, "x");
        assert!(SectionName::METADATA.is_start(&start, Syntax::Xml));
        assert!(!SectionName::METADATA.is_start(&start, Syntax::Kvn));
        assert!(!SectionName::METADATA.is_stop(&start, Syntax::Xml));
    }

    #[test]
    fn test_stack_nesting() {
        let mut stack = SectionStack::new();
        stack.push(&Token::start("opm", 1, "x"));
        stack.push(&Token::start("header", 2, "x"));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top(), Some("header"));

        let err = stack.pop(&Token::stop("opm", 3, "x")).unwrap_err();
        assert!(err.to_string().contains("opened at line 2"));
        assert_eq!(stack.depth(), 2);

        stack.pop(&Token::stop("header", 3, "x")).unwrap();
        stack.pop(&Token::stop("opm", 4, "x")).unwrap();
        assert!(stack.pop(&Token::stop("opm", 5, "x")).is_err());
    }
}
