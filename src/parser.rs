//! The message parser state machine.
//!
//! [`NdmParser`] consumes the token stream of one message and assembles a
//! [`Message`]. The outer structure (version, header, segments of metadata and
//! data, section nesting) is common to all message types and handled here;
//! the contents of metadata and data sections are delegated to the
//! [`MessageKind`] of the message.
//!
//! ## States
//!
//! ```text
//! AwaitingHeader ─► InHeader ─► AwaitingSegment ─► InMetadata ─► AwaitingData ─► InData
//!                                     ▲                                            │
//!                                     └────────────────────────────────────────────┘
//!                                                                    Done (XML root closed)
//! ```
//!
//! In XML every transition is triggered by a section start or stop. KVN has
//! no markers around the header, and some message types have none around
//! their metadata or data either. There the parser moves on to the next
//! section as soon as a token cannot belong to the current one: an unknown
//! keyword, or a comment arriving after the first field. That token is then
//! processed again in the new section.
//!
//! Mandatory keywords and declared counts are checked by [`MessageParser::build`],
//! never while tokens are processed.

use crate::container::Builder;
use crate::error::{Error, Result};
use crate::header::Header;
use crate::lexer::Lexer;
use crate::message::{DataParser, Message, MessageKind, Segment};
use crate::options::Syntax;
use crate::section::{SectionName, SectionStack};
use crate::token::Token;
use std::mem;
use std::sync::Arc;
use tracing::{debug, trace};

/// Contract shared by message parsers.
pub trait MessageParser {
    type Output;

    /// Prepares the parser for a new input.
    fn reset(&mut self, syntax: Syntax, source: &str);

    /// Processes the next token.
    fn process(&mut self, token: &Token) -> Result<()>;

    /// Validates and returns the document, once the whole input has been processed.
    fn build(&mut self) -> Result<Self::Output>;
}

enum State<K: MessageKind> {
    AwaitingHeader,
    InHeader,
    AwaitingSegment,
    InMetadata(Builder<K::Metadata>),
    AwaitingData(K::Metadata),
    InData(K::Metadata, K::DataParser),
    Done,
}

impl<K: MessageKind> State<K> {
    fn name(&self) -> &'static str {
        match self {
            State::AwaitingHeader => "AwaitingHeader",
            State::InHeader => "InHeader",
            State::AwaitingSegment => "AwaitingSegment",
            State::InMetadata(_) => "InMetadata",
            State::AwaitingData(_) => "AwaitingData",
            State::InData(..) => "InData",
            State::Done => "Done",
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            State::AwaitingHeader => "version keyword",
            State::InHeader => "end of header",
            State::AwaitingSegment => "segment",
            State::InMetadata(_) => "end of metadata",
            State::AwaitingData(_) => "data section",
            State::InData(..) => "end of data",
            State::Done => "end of input",
        }
    }
}

/// Whether the current token was used, or must be processed again in the new state.
enum Flow {
    Consumed,
    Retry,
}

type Step<K> = Result<(State<K>, Flow)>;

/// Parser for messages of type `K`.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::lexer::Lexer;
/// use ccsds_ndm::parser::{MessageParser, NdmParser};
/// use ccsds_ndm::{Omm, Syntax};
///
/// let text = "CCSDS_OMM_VERS = 3.0\n\
///             CREATION_DATE = 2007-065T16:00:00\n\
///             ORIGINATOR = NOAA/USA\n\
///             OBJECT_NAME = GOES 9\n\
///             OBJECT_ID = 1995-025A\n\
///             CENTER_NAME = EARTH\n\
///             REF_FRAME = TEME\n\
///             TIME_SYSTEM = UTC\n\
///             MEAN_ELEMENT_THEORY = SGP/SGP4\n\
///             EPOCH = 2007-064T10:34:41.4264\n\
///             MEAN_MOTION = 1.00273272\n\
///             ECCENTRICITY = 0.0005013\n\
///             INCLINATION = 3.0539\n\
///             RA_OF_ASC_NODE = 81.7939\n\
///             ARG_OF_PERICENTER = 249.2363\n\
///             MEAN_ANOMALY = 150.1602\n\
///             GM = 398600.8\n";
///
/// let mut parser = NdmParser::<Omm>::new(Syntax::Kvn, "goes9.omm");
/// for token in Lexer::new(text, Syntax::Kvn, "goes9.omm") {
///     parser.process(&token.unwrap()).unwrap();
/// }
/// let omm = parser.build().unwrap();
/// assert_eq!(omm.segments.len(), 1);
/// ```
pub struct NdmParser<K: MessageKind> {
    syntax: Syntax,
    source: Arc<str>,
    state: State<K>,
    sections: SectionStack,
    header: Builder<Header>,
    version_seen: bool,
    segments: Vec<Segment<K>>,
}

impl<K: MessageKind> NdmParser<K> {
    pub fn new(syntax: Syntax, source: &str) -> Self {
        NdmParser {
            syntax,
            source: Arc::from(source),
            state: State::AwaitingHeader,
            sections: SectionStack::new(),
            header: Builder::default(),
            version_seen: false,
            segments: Vec::new(),
        }
    }

    fn kvn(&self) -> bool {
        self.syntax == Syntax::Kvn
    }

    fn unexpected(&self, token: &Token, expected: &str) -> Error {
        if token.is_entry() {
            Error::unexpected_keyword(token, Some(expected))
        } else {
            Error::unexpected_section(token, expected)
        }
    }

    fn step(&mut self, state: State<K>, token: &Token) -> Step<K> {
        match state {
            State::AwaitingHeader => self.awaiting_header(token),
            State::InHeader => self.in_header(token),
            State::AwaitingSegment => self.awaiting_segment(token),
            State::InMetadata(metadata) => self.in_metadata(metadata, token),
            State::AwaitingData(metadata) => self.awaiting_data(metadata, token),
            State::InData(metadata, data) => self.in_data(metadata, data, token),
            State::Done => Err(self.unexpected(token, "end of input")),
        }
    }

    fn awaiting_header(&mut self, token: &Token) -> Step<K> {
        if !self.kvn() && token.is_start() && token.name == K::ROOT && !self.version_seen {
            return Ok((State::AwaitingHeader, Flow::Consumed));
        }
        if token.is_entry() && token.name == K::VERSION_KEY && !self.version_seen {
            let version = token.content_as_raw_f64()?;
            self.header = Builder::new(Header {
                format_version: version,
                ..Header::default()
            });
            self.version_seen = true;
            let next = if self.kvn() {
                State::InHeader
            } else {
                State::AwaitingHeader
            };
            return Ok((next, Flow::Consumed));
        }
        if self.version_seen && SectionName::HEADER.is_start(token, self.syntax) {
            return Ok((State::InHeader, Flow::Consumed));
        }
        let expected = if self.version_seen { "header" } else { K::VERSION_KEY };
        Err(self.unexpected(token, expected))
    }

    fn in_header(&mut self, token: &Token) -> Step<K> {
        let implicit_metadata = self.kvn() && !K::KVN_METADATA_MARKERS;
        if token.is_comment() {
            if self.header.accepts_comments() {
                self.header.add_comment(token)?;
                return Ok((State::InHeader, Flow::Consumed));
            }
            if implicit_metadata {
                return Ok((self.begin_metadata(token)?, Flow::Retry));
            }
            return Err(Error::comment_not_allowed(token));
        }
        if token.is_entry() {
            if Header::process(&mut self.header, token, K::HEADER_ID_VERSION)? {
                return Ok((State::InHeader, Flow::Consumed));
            }
            if implicit_metadata {
                return Ok((self.begin_metadata(token)?, Flow::Retry));
            }
            return Err(self.unexpected(token, "header"));
        }
        if SectionName::HEADER.is_stop(token, self.syntax) {
            return Ok((State::AwaitingSegment, Flow::Consumed));
        }
        if self.kvn() && K::metadata_section().is_start(token, self.syntax) {
            return Ok((self.begin_metadata(token)?, Flow::Consumed));
        }
        Err(self.unexpected(token, "header"))
    }

    fn awaiting_segment(&mut self, token: &Token) -> Step<K> {
        if !self.kvn() {
            let wrapper = token.name == SectionName::BODY.xml || token.name == SectionName::SEGMENT.xml;
            if wrapper && (token.is_start() || token.is_stop()) {
                return Ok((State::AwaitingSegment, Flow::Consumed));
            }
            if token.is_stop() && token.name == K::ROOT {
                return Ok((State::Done, Flow::Consumed));
            }
        }
        if K::metadata_section().is_start(token, self.syntax) {
            return Ok((self.begin_metadata(token)?, Flow::Consumed));
        }
        Err(self.unexpected(token, "segment"))
    }

    fn in_metadata(&mut self, mut metadata: Builder<K::Metadata>, token: &Token) -> Step<K> {
        let implicit = self.kvn() && !K::KVN_METADATA_MARKERS;
        if token.is_comment() {
            if metadata.accepts_comments() {
                metadata.add_comment(token)?;
                return Ok((State::InMetadata(metadata), Flow::Consumed));
            }
            if implicit {
                return Ok((self.begin_data(metadata.into_inner()), Flow::Retry));
            }
            return Err(Error::comment_not_allowed(token));
        }
        if token.is_entry() {
            if K::process_metadata(&mut metadata, token)? {
                return Ok((State::InMetadata(metadata), Flow::Consumed));
            }
            if implicit {
                return Ok((self.begin_data(metadata.into_inner()), Flow::Retry));
            }
            return Err(self.unexpected(token, "metadata"));
        }
        if K::metadata_section().is_stop(token, self.syntax) {
            let metadata = metadata.into_inner();
            if self.kvn() && !K::KVN_DATA_MARKERS {
                return Ok((self.begin_data(metadata), Flow::Consumed));
            }
            return Ok((State::AwaitingData(metadata), Flow::Consumed));
        }
        if implicit && token.is_start() {
            return Ok((self.begin_data(metadata.into_inner()), Flow::Retry));
        }
        Err(self.unexpected(token, "metadata"))
    }

    fn awaiting_data(&mut self, metadata: K::Metadata, token: &Token) -> Step<K> {
        if K::data_section().is_start(token, self.syntax) {
            return Ok((self.begin_data(metadata), Flow::Consumed));
        }
        Err(self.unexpected(token, "data section"))
    }

    fn in_data(&mut self, metadata: K::Metadata, mut data: K::DataParser, token: &Token) -> Step<K> {
        if K::data_section().is_stop(token, self.syntax) {
            self.finish_segment(metadata, data)?;
            return Ok((State::AwaitingSegment, Flow::Consumed));
        }
        let implicit_data = self.kvn() && !K::KVN_DATA_MARKERS;
        if implicit_data && K::KVN_METADATA_MARKERS && K::metadata_section().is_start(token, self.syntax) {
            self.finish_segment(metadata, data)?;
            return Ok((self.begin_metadata(token)?, Flow::Consumed));
        }
        if data.process(token)? {
            return Ok((State::InData(metadata, data), Flow::Consumed));
        }
        Err(self.unexpected(token, "data"))
    }

    fn begin_metadata(&mut self, token: &Token) -> Result<State<K>> {
        if !K::MULTI_SEGMENT && !self.segments.is_empty() {
            return Err(self.unexpected(token, "end of input"));
        }
        trace!(line = token.line, "metadata starts");
        Ok(State::InMetadata(Builder::new(K::Metadata::default())))
    }

    fn begin_data(&self, metadata: K::Metadata) -> State<K> {
        let data = K::data_parser(&metadata, self.syntax);
        State::InData(metadata, data)
    }

    fn finish_segment(&mut self, metadata: K::Metadata, data: K::DataParser) -> Result<()> {
        let data = data.finish()?;
        self.segments.push(Segment { metadata, data });
        debug!(
            source = %self.source,
            segment = self.segments.len(),
            "segment complete"
        );
        Ok(())
    }
}

impl<K: MessageKind> MessageParser for NdmParser<K> {
    type Output = Message<K>;

    fn reset(&mut self, syntax: Syntax, source: &str) {
        *self = NdmParser::new(syntax, source);
    }

    fn process(&mut self, token: &Token) -> Result<()> {
        match token.kind {
            crate::token::TokenKind::Start => self.sections.push(token),
            crate::token::TokenKind::Stop => self.sections.pop(token)?,
            crate::token::TokenKind::Entry => {}
        }

        let mut state = mem::replace(&mut self.state, State::Done);
        loop {
            let before = state.name();
            let (next, flow) = self.step(state, token)?;
            trace!(line = token.line, from = before, to = next.name(), "transition");
            state = next;
            if let Flow::Consumed = flow {
                break;
            }
        }
        self.state = state;
        Ok(())
    }

    fn build(&mut self) -> Result<Message<K>> {
        let state = mem::replace(&mut self.state, State::Done);
        let implicit_data = self.kvn() && !K::KVN_DATA_MARKERS;
        match state {
            State::Done => {}
            State::AwaitingSegment if self.kvn() && !self.segments.is_empty() => {}
            State::InData(metadata, data) if implicit_data => self.finish_segment(metadata, data)?,
            other => return Err(Error::unexpected_eof(&self.source, other.expected())),
        }
        if let Some(open) = self.sections.top() {
            return Err(Error::unexpected_eof(&self.source, &format!("end of section {}", open)));
        }
        if self.segments.is_empty() {
            return Err(Error::unexpected_eof(&self.source, "segment"));
        }

        let message = Message {
            header: mem::take(&mut self.header).into_inner(),
            segments: mem::take(&mut self.segments),
        };
        message.validate(&self.source)?;
        debug!(
            source = %self.source,
            message = K::NAME,
            segments = message.segments.len(),
            "message built"
        );
        Ok(message)
    }
}

/// Lexes and parses a whole message.
pub fn parse_message<K: MessageKind>(text: &str, syntax: Syntax, source: &str) -> Result<Message<K>> {
    debug!(source, syntax = syntax.as_str(), message = K::NAME, "parsing");
    let mut parser = NdmParser::<K>::new(syntax, source);
    for token in Lexer::new(text, syntax, source) {
        parser.process(&token?)?;
    }
    parser.build()
}
