//! XML element walker.
//!
//! Whether an element is an entry or a section is only known once its first
//! child or its end tag shows up, so each opened element stays pending until
//! then: a child start turns it into a section start, its end tag turns it
//! into an entry holding the text read in between.

use super::normalize;
use crate::error::{Error, Result};
use crate::token::{Token, COMMENT};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::VecDeque;
use std::sync::Arc;

/// Lazy tokenizer for the XML syntax.
pub struct XmlLexer<'a> {
    text: &'a str,
    reader: Reader<&'a [u8]>,
    source: Arc<str>,
    queue: VecDeque<Token>,
    pending: Option<Pending>,
    depth: usize,
    scanned: usize,
    line: usize,
    finished: bool,
}

/// An opened element not yet known to be an entry or a section.
struct Pending {
    tag: String,
    name: String,
    unit: Option<String>,
    text: String,
    line: usize,
}

/// What the lexer keeps from a start tag.
struct Element {
    tag: String,
    name: String,
    unit: Option<String>,
    id: Option<String>,
    version: Option<String>,
}

impl<'a> XmlLexer<'a> {
    pub fn new(text: &'a str, source: Arc<str>) -> Self {
        let text = text.trim_start_matches('\u{feff}');
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);
        XmlLexer {
            text,
            reader,
            source,
            queue: VecDeque::new(),
            pending: None,
            depth: 0,
            scanned: 0,
            line: 1,
            finished: false,
        }
    }

    /// Counts the newlines read since the last call.
    fn update_line(&mut self) -> usize {
        let position = (self.reader.buffer_position() as usize).min(self.text.len());
        if position > self.scanned {
            self.line += self.text.as_bytes()[self.scanned..position]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.scanned = position;
        }
        self.line
    }

    fn error(&self, msg: &str) -> Error {
        Error::xml(&self.source, self.line, msg)
    }

    fn element(&self, start: &BytesStart<'_>) -> Result<Element> {
        let tag = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut element = Element {
            name: tag.clone(),
            tag,
            unit: None,
            id: None,
            version: None,
        };
        let mut parameter = None;
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| self.error(&e.to_string()))?;
            let value = attribute
                .unescape_value()
                .map_err(|e| self.error(&e.to_string()))?
                .trim()
                .to_string();
            match attribute.key.local_name().as_ref() {
                b"units" => element.unit = Some(value),
                b"parameter" => parameter = Some(value),
                b"id" => element.id = Some(value),
                b"version" => element.version = Some(value),
                _ => {}
            }
        }
        if let Some(parameter) = parameter {
            element.name = format!("{}_{}", element.tag, parameter);
        }
        Ok(element)
    }

    /// The pending element has a child: it was a section.
    fn flush_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.queue
                .push_back(Token::start(pending.name, pending.line, self.source.clone()));
        }
    }

    fn push_root(&mut self, element: Element, line: usize) {
        self.queue
            .push_back(Token::start(element.name, line, self.source.clone()));
        if let Some(id) = element.id {
            let version = element.version.unwrap_or_default();
            self.queue
                .push_back(Token::entry(id, version, None, line, self.source.clone()));
        }
    }

    fn leaf(&self, name: String, text: &str, unit: Option<String>, line: usize) -> Token {
        let value = if name == COMMENT {
            text.trim().to_string()
        } else {
            normalize(text)
        };
        Token::entry(name, value, unit.as_deref(), line, self.source.clone())
    }

    /// Reads one event, queuing the tokens it completes.
    fn advance(&mut self) -> Result<()> {
        let event = self.reader.read_event();
        let line = self.update_line();
        let event = event.map_err(|e| self.error(&e.to_string()))?;
        match event {
            Event::Start(start) => {
                self.flush_pending();
                let element = self.element(&start)?;
                if self.depth == 0 {
                    self.push_root(element, line);
                } else {
                    self.pending = Some(Pending {
                        tag: element.tag,
                        name: element.name,
                        unit: element.unit,
                        text: String::new(),
                        line,
                    });
                }
                self.depth += 1;
            }
            Event::Empty(start) => {
                self.flush_pending();
                let element = self.element(&start)?;
                if self.depth == 0 {
                    let name = element.name.clone();
                    self.push_root(element, line);
                    self.queue
                        .push_back(Token::stop(name, line, self.source.clone()));
                } else {
                    let token = self.leaf(element.name, "", element.unit, line);
                    self.queue.push_back(token);
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| self.error(&e.to_string()))?;
                match self.pending.as_mut() {
                    Some(pending) => pending.text.push_str(&text),
                    None => return Err(self.error(&format!("unexpected text \"{}\"", text))),
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                match self.pending.as_mut() {
                    Some(pending) => pending.text.push_str(&text),
                    None => return Err(self.error(&format!("unexpected text \"{}\"", text))),
                }
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.local_name().as_ref()).into_owned();
                self.depth = self.depth.saturating_sub(1);
                match self.pending.take() {
                    Some(pending) if pending.tag == name => {
                        let token = self.leaf(pending.name, &pending.text, pending.unit, pending.line);
                        self.queue.push_back(token);
                    }
                    Some(pending) => {
                        return Err(self.error(&format!(
                            "element {} closed by end tag {}",
                            pending.tag, name
                        )))
                    }
                    None => self
                        .queue
                        .push_back(Token::stop(name, line, self.source.clone())),
                }
            }
            Event::Eof => {
                if self.depth > 0 || self.pending.is_some() {
                    return Err(self.error("unexpected end of document"));
                }
                self.finished = true;
            }
            // declarations, processing instructions, comments, doctype
            _ => {}
        }
        Ok(())
    }
}

impl Iterator for XmlLexer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(Ok(token));
            }
            if self.finished {
                return None;
            }
            if let Err(err) = self.advance() {
                self.finished = true;
                self.queue.clear();
                return Some(Err(err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    fn lex(text: &str) -> Vec<Token> {
        XmlLexer::new(text, Arc::from("test.xml"))
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_root_version_and_sections() {
        let tokens = lex(r#"<?xml version="1.0" encoding="UTF-8"?>
<omm id="CCSDS_OMM_VERS" version="3.0">
  <header>
    <COMMENT>a header comment</COMMENT>
    <CREATION_DATE>2007-065T16:00:00</CREATION_DATE>
  </header>
</omm>"#);
        let shape: Vec<_> = tokens.iter().map(|t| (t.kind, t.name.as_str())).collect();
        assert_eq!(
            shape,
            vec![
                (TokenKind::Start, "omm"),
                (TokenKind::Entry, "CCSDS_OMM_VERS"),
                (TokenKind::Start, "header"),
                (TokenKind::Entry, "COMMENT"),
                (TokenKind::Entry, "CREATION_DATE"),
                (TokenKind::Stop, "header"),
                (TokenKind::Stop, "omm"),
            ]
        );
        assert_eq!(tokens[1].value, "3.0");
        assert_eq!(tokens[2].line, 3);
        assert_eq!(tokens[4].line, 5);
        assert_eq!(tokens[5].line, 6);
        assert_eq!(tokens[6].line, 7);
    }

    #[test]
    fn test_units_and_user_defined() {
        let tokens = lex(r#"<data>
  <X units="km">6655.9942</X>
  <USER_DEFINED parameter="EARTH_MODEL">WGS-84</USER_DEFINED>
  <EMPTY/>
</data>"#);
        assert_eq!(tokens[1].name, "X");
        assert_eq!(tokens[1].unit.as_deref(), Some("km"));
        assert_eq!(tokens[2].name, "USER_DEFINED_EARTH_MODEL");
        assert_eq!(tokens[2].value, "WGS-84");
        assert_eq!(tokens[3].name, "EMPTY");
        assert_eq!(tokens[3].value, "");
    }

    #[test]
    fn test_escaped_text() {
        let tokens = lex("<r><OBJECT_NAME>A &amp; B</OBJECT_NAME></r>");
        assert_eq!(tokens[1].value, "A & B");
    }

    #[test]
    fn test_malformed_document() {
        let mut lexer = XmlLexer::new("<r>\n<a>1</b>\n</r>", Arc::from("bad.xml"));
        let err = lexer
            .find_map(|t| t.err())
            .expect("mismatched tags must fail");
        assert!(matches!(err, Error::Xml { .. }));
    }

    #[test]
    fn test_truncated_document() {
        let result: Result<Vec<Token>> =
            XmlLexer::new("<r>\n<a>1</a>", Arc::from("cut.xml")).collect();
        assert!(result.is_err());
    }
}
