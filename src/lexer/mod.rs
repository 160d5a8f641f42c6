//! Lexers turning KVN or XML text into [`Token`]s.
//!
//! Both lexers are lazy iterators over one input text: each call to `next`
//! reads just enough input to produce the next token, and iteration ends at
//! the end of the input. A lexical error is yielded in place of the token
//! and iteration should stop there; nothing is skipped or guessed.
//!
//! ```rust
//! use ccsds_ndm::lexer::Lexer;
//! use ccsds_ndm::{Syntax, TokenKind};
//!
//! let text = "CCSDS_OEM_VERS = 3.0\nMETA_START\nOBJECT_NAME = MARS GLOBAL SURVEYOR\n";
//! let tokens: Vec<_> = Lexer::new(text, Syntax::Kvn, "oem.txt")
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(tokens.len(), 3);
//! assert_eq!(tokens[1].kind, TokenKind::Start);
//! assert_eq!(tokens[2].value, "MARS GLOBAL SURVEYOR");
//! ```

mod kvn;
mod xml;

pub use kvn::KvnLexer;
pub use xml::XmlLexer;

use crate::error::Result;
use crate::options::Syntax;
use crate::token::Token;
use std::sync::Arc;

/// A lexer for either syntax.
pub enum Lexer<'a> {
    Kvn(KvnLexer<'a>),
    Xml(XmlLexer<'a>),
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, syntax: Syntax, source: &str) -> Self {
        let source: Arc<str> = Arc::from(source);
        match syntax {
            Syntax::Kvn => Lexer::Kvn(KvnLexer::new(text, source)),
            Syntax::Xml => Lexer::Xml(XmlLexer::new(text, source)),
        }
    }

    pub fn syntax(&self) -> Syntax {
        match self {
            Lexer::Kvn(_) => Syntax::Kvn,
            Lexer::Xml(_) => Syntax::Xml,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Lexer::Kvn(lexer) => lexer.next(),
            Lexer::Xml(lexer) => lexer.next(),
        }
    }
}

/// Trims a value and collapses inner whitespace runs to a single space.
pub(crate) fn normalize(value: &str) -> String {
    let mut normalized = String::with_capacity(value.len());
    for word in value.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(word);
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;
    use pretty_assertions::assert_eq;

    fn summary(text: &str, syntax: Syntax) -> Vec<(TokenKind, String, String, Option<String>)> {
        Lexer::new(text, syntax, "test")
            .map(|t| t.map(|t| (t.kind, t.name, t.value, t.unit)))
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  a \t b   c "), "a b c");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_both_syntaxes_agree() {
        let kvn = "CCSDS_OPM_VERS = 3.0\n\
                   CREATION_DATE = 2022-11-06T09:23:57\n\
                   ORIGINATOR = JAXA\n";
        let xml = r#"<opm id="CCSDS_OPM_VERS" version="3.0">
                       <header>
                         <CREATION_DATE>2022-11-06T09:23:57</CREATION_DATE>
                         <ORIGINATOR>  JAXA </ORIGINATOR>
                       </header>
                     </opm>"#;

        let entries = |tokens: Vec<(TokenKind, String, String, Option<String>)>| {
            tokens
                .into_iter()
                .filter(|t| t.0 == TokenKind::Entry)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            entries(summary(kvn, Syntax::Kvn)),
            entries(summary(xml, Syntax::Xml))
        );
    }
}
