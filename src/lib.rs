//! # ccsds_ndm
//!
//! Reading and writing of CCSDS Navigation Data Messages in both of their
//! syntaxes, KVN (`KEY = value [unit]` lines) and XML.
//!
//! ## Supported messages
//!
//! - **OPM**, **OMM**, **OEM** and **OCM**: orbit parameter, mean-elements,
//!   ephemeris and comprehensive messages
//! - **APM** and **AEM**: attitude parameter and ephemeris messages
//! - **TDM**: tracking data messages
//!
//! ## Key Features
//!
//! - **Streaming front end**: both syntaxes are lexed into the same token
//!   stream, so every message parser is syntax independent
//! - **SI values**: physical values are converted to SI on input and back to
//!   the message units on output
//! - **Strict validation**: mandatory keywords, declared counts, index
//!   sequences and version-gated keywords are checked with line numbers
//! - **Round trip**: a parsed message written again, in either syntax, reads
//!   back to the same value up to floating point tolerance
//!
//! ## Quick Start
//!
//! ```rust
//! use ccsds_ndm::{from_str, to_string_with_options, GeneratorOptions, Opm};
//!
//! let kvn = "\
//! CCSDS_OPM_VERS = 3.0
//! CREATION_DATE = 2022-11-06T09:23:57
//! ORIGINATOR = JAXA
//! OBJECT_NAME = GODZILLA 5
//! OBJECT_ID = 1998-999A
//! CENTER_NAME = EARTH
//! REF_FRAME = ITRF2000
//! TIME_SYSTEM = UTC
//! EPOCH = 1998-12-18T14:28:15.1172
//! X = 6503.5 [km]
//! Y = 1239.5 [km]
//! Z = -717.5 [km]
//! X_DOT = -0.5 [km/s]
//! Y_DOT = 3.25 [km/s]
//! Z_DOT = 7.0 [km/s]
//! ";
//!
//! let opm = from_str::<Opm>(kvn).unwrap();
//! let state = &opm.segments[0].data.state_vector;
//! assert_eq!(state.x, Some(6_503_500.0));
//! assert_eq!(state.z_dot, Some(7_000.0));
//!
//! let xml = to_string_with_options(&opm, &GeneratorOptions::xml()).unwrap();
//! assert!(xml.contains("<opm "));
//! assert_eq!(from_str::<Opm>(&xml).unwrap().segments[0].data.state_vector.x, Some(6_503_500.0));
//! ```
//!
//! ## Unknown message types
//!
//! [`from_str_any`] looks at the version keyword (KVN) or root element (XML)
//! and dispatches to the matching parser:
//!
//! ```rust
//! use ccsds_ndm::{from_str_any, Ndm};
//!
//! let apm = "\
//! CCSDS_APM_VERS = 1.0
//! CREATION_DATE = 2004-02-14T19:23:57
//! ORIGINATOR = JPL
//! OBJECT_NAME = MARS GLOBAL SURVEYOR
//! OBJECT_ID = 1996-062A
//! TIME_SYSTEM = UTC
//! EPOCH = 2004-02-14T14:28:15.1172
//! Q_FRAME_A = SC_BODY_1
//! Q_FRAME_B = ITRF
//! Q_DIR = A2B
//! Q1 = 0.03123
//! Q2 = 0.78543
//! Q3 = 0.39158
//! QC = 0.47832
//! ";
//!
//! let message = from_str_any(apm).unwrap();
//! assert!(matches!(message, Ndm::Apm(_)));
//! assert_eq!(message.name(), "APM");
//! ```
//!
//! ## Error Handling
//!
//! All functions return [`Result<T, Error>`](Result). Parsing errors carry
//! the source name and, where one exists, the line number:
//!
//! ```rust
//! use ccsds_ndm::{from_str, Error, Oem};
//!
//! match from_str::<Oem>("CCSDS_OPM_VERS = 3.0\n") {
//!     Err(err @ Error::UnexpectedKeyword { .. }) => assert_eq!(err.line(), Some(1)),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

#[macro_use]
mod macros;
#[macro_use]
pub mod approx;

pub mod adm;
pub mod container;
pub mod error;
pub mod format;
pub mod generator;
pub mod header;
pub mod lexer;
pub mod message;
pub mod odm;
pub mod options;
pub mod parser;
pub mod section;
pub mod tdm;
pub mod time;
pub mod token;
pub mod units;
pub mod writer;

pub use adm::aem::Aem;
pub use adm::apm::Apm;
pub use error::{Error, Result};
pub use header::Header;
pub use message::{Message, MessageKind, Segment};
pub use odm::ocm::Ocm;
pub use odm::oem::Oem;
pub use odm::omm::Omm;
pub use odm::opm::Opm;
pub use options::{GeneratorOptions, Syntax};
pub use tdm::Tdm;
pub use time::Epoch;
pub use token::{Token, TokenKind};
pub use writer::{write_message, SegmentWriter};

use lexer::Lexer;
use parser::parse_message;
use std::io::{Read, Write};

/// Source name reported in errors for in-memory input.
const DEFAULT_SOURCE: &str = "<input>";

/// Parses a message of type `K` from a string, detecting its syntax.
///
/// # Errors
///
/// Returns an error if the text is not a valid message of type `K`.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::{from_str, Error, Omm};
///
/// let err = from_str::<Omm>("").unwrap_err();
/// assert!(matches!(err, Error::UnexpectedEof { .. }));
/// ```
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<K: MessageKind>(text: &str) -> Result<Message<K>> {
    from_str_named(text, DEFAULT_SOURCE)
}

/// Parses a message of type `K`, reporting errors against `source`.
///
/// # Errors
///
/// Returns an error if the text is not a valid message of type `K`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_named<K: MessageKind>(text: &str, source: &str) -> Result<Message<K>> {
    parse_message(text, Syntax::detect(text), source)
}

/// Parses a message of type `K` from UTF-8 bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not UTF-8 or not a valid message of type `K`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<K: MessageKind>(bytes: &[u8]) -> Result<Message<K>> {
    let text = std::str::from_utf8(bytes).map_err(|e| Error::io(&e.to_string()))?;
    from_str(text)
}

/// Parses a message of type `K` from a reader.
///
/// The whole input is read before parsing starts.
///
/// # Errors
///
/// Returns an error if reading fails or the input is not a valid message of type `K`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, K>(mut reader: R) -> Result<Message<K>>
where
    R: Read,
    K: MessageKind,
{
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_str(&text)
}

/// Writes a message as KVN with the default options.
///
/// # Errors
///
/// Returns an error if a mandatory value is missing.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<K: MessageKind>(message: &Message<K>) -> Result<String> {
    to_string_with_options(message, &GeneratorOptions::default())
}

/// Writes a message with custom options.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::{to_string_with_options, Epoch, GeneratorOptions, Header, Message, Tdm};
///
/// let header = Header {
///     creation_date: Epoch::parse("2024-01-01T00:00:00"),
///     originator: Some("NASA".to_string()),
///     ..Header::default()
/// };
/// let message = Message::<Tdm>::new(header);
/// let kvn = to_string_with_options(&message, &GeneratorOptions::kvn()).unwrap();
/// assert!(kvn.starts_with("CCSDS_TDM_VERS"));
/// ```
///
/// # Errors
///
/// Returns an error if a mandatory value is missing.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options<K: MessageKind>(
    message: &Message<K>,
    options: &GeneratorOptions,
) -> Result<String> {
    let mut generator = generator::generator(options.clone());
    write_message(generator.as_mut(), message)?;
    Ok(generator.into_output())
}

/// Writes a message as KVN to a writer.
///
/// # Errors
///
/// Returns an error if a mandatory value is missing or writing fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, K>(writer: W, message: &Message<K>) -> Result<()>
where
    W: Write,
    K: MessageKind,
{
    to_writer_with_options(writer, message, &GeneratorOptions::default())
}

/// Writes a message to a writer with custom options.
///
/// # Errors
///
/// Returns an error if a mandatory value is missing or writing fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, K>(
    mut writer: W,
    message: &Message<K>,
    options: &GeneratorOptions,
) -> Result<()>
where
    W: Write,
    K: MessageKind,
{
    let text = to_string_with_options(message, options)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))
}

/// A message of any supported type.
#[derive(Debug, Clone, PartialEq)]
pub enum Ndm {
    Opm(Message<Opm>),
    Omm(Message<Omm>),
    Oem(Message<Oem>),
    Ocm(Message<Ocm>),
    Aem(Message<Aem>),
    Apm(Message<Apm>),
    Tdm(Message<Tdm>),
}

impl Ndm {
    /// Short name of the message type (`OPM`, `TDM`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Ndm::Opm(_) => Opm::NAME,
            Ndm::Omm(_) => Omm::NAME,
            Ndm::Oem(_) => Oem::NAME,
            Ndm::Ocm(_) => Ocm::NAME,
            Ndm::Aem(_) => Aem::NAME,
            Ndm::Apm(_) => Apm::NAME,
            Ndm::Tdm(_) => Tdm::NAME,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            Ndm::Opm(m) => &m.header,
            Ndm::Omm(m) => &m.header,
            Ndm::Oem(m) => &m.header,
            Ndm::Ocm(m) => &m.header,
            Ndm::Aem(m) => &m.header,
            Ndm::Apm(m) => &m.header,
            Ndm::Tdm(m) => &m.header,
        }
    }

    /// Writes the message with custom options.
    ///
    /// # Errors
    ///
    /// Returns an error if a mandatory value is missing.
    #[must_use = "this returns the result of the operation, errors must be handled"]
    pub fn to_string_with_options(&self, options: &GeneratorOptions) -> Result<String> {
        match self {
            Ndm::Opm(m) => to_string_with_options(m, options),
            Ndm::Omm(m) => to_string_with_options(m, options),
            Ndm::Oem(m) => to_string_with_options(m, options),
            Ndm::Ocm(m) => to_string_with_options(m, options),
            Ndm::Aem(m) => to_string_with_options(m, options),
            Ndm::Apm(m) => to_string_with_options(m, options),
            Ndm::Tdm(m) => to_string_with_options(m, options),
        }
    }
}

/// Parses a message whose type is not known in advance.
///
/// # Errors
///
/// Returns an error if the input does not start with a known version keyword
/// or root element, or is not a valid message of that type.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_any(text: &str) -> Result<Ndm> {
    from_str_any_named(text, DEFAULT_SOURCE)
}

/// Parses a message whose type is not known in advance, reporting errors
/// against `source`.
///
/// # Errors
///
/// Returns an error if the input does not start with a known version keyword
/// or root element, or is not a valid message of that type.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_any_named(text: &str, source: &str) -> Result<Ndm> {
    let syntax = Syntax::detect(text);
    let first = Lexer::new(text, syntax, source)
        .find(|token| token.as_ref().map_or(true, |t| !t.is_comment()))
        .transpose()?
        .ok_or_else(|| Error::unexpected_eof(source, "message version keyword or root element"))?;

    let name = first.name.as_str();
    if identifies::<Opm>(name) {
        parse_message(text, syntax, source).map(Ndm::Opm)
    } else if identifies::<Omm>(name) {
        parse_message(text, syntax, source).map(Ndm::Omm)
    } else if identifies::<Oem>(name) {
        parse_message(text, syntax, source).map(Ndm::Oem)
    } else if identifies::<Ocm>(name) {
        parse_message(text, syntax, source).map(Ndm::Ocm)
    } else if identifies::<Aem>(name) {
        parse_message(text, syntax, source).map(Ndm::Aem)
    } else if identifies::<Apm>(name) {
        parse_message(text, syntax, source).map(Ndm::Apm)
    } else if identifies::<Tdm>(name) {
        parse_message(text, syntax, source).map(Ndm::Tdm)
    } else if first.is_start() {
        Err(Error::unexpected_section(&first, "message root element"))
    } else {
        Err(Error::unexpected_keyword(&first, None))
    }
}

fn identifies<K: MessageKind>(name: &str) -> bool {
    name == K::VERSION_KEY || name == K::ROOT
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const OMM: &str = "\
CCSDS_OMM_VERS = 3.0
CREATION_DATE = 2007-06-05T16:00:00
ORIGINATOR = NOAA/USA
OBJECT_NAME = GOES 9
OBJECT_ID = 1995-025A
CENTER_NAME = EARTH
REF_FRAME = TEME
TIME_SYSTEM = UTC
MEAN_ELEMENT_THEORY = SGP/SGP4
EPOCH = 2007-05-04T10:34:41.4264
MEAN_MOTION = 1.00273272 [rev/day]
ECCENTRICITY = 0.0005013
INCLINATION = 3.0539 [deg]
RA_OF_ASC_NODE = 81.7939 [deg]
ARG_OF_PERICENTER = 249.2363 [deg]
MEAN_ANOMALY = 150.1602 [deg]
";

    #[test]
    fn test_from_str_detects_kvn() {
        let message = from_str::<Omm>(OMM).unwrap();
        assert_eq!(message.header.format_version, 3.0);
        assert_eq!(message.header.originator.as_deref(), Some("NOAA/USA"));
        assert_eq!(message.segments.len(), 1);
    }

    #[test]
    fn test_from_slice_and_reader() {
        let from_bytes = from_slice::<Omm>(OMM.as_bytes()).unwrap();
        let from_read = from_reader::<_, Omm>(OMM.as_bytes()).unwrap();
        assert_eq!(from_bytes, from_read);
    }

    #[test]
    fn test_from_slice_rejects_invalid_utf8() {
        let err = from_slice::<Omm>(&[0x43, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_to_writer_matches_to_string() {
        let message = from_str::<Omm>(OMM).unwrap();
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &message).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), to_string(&message).unwrap());
    }

    #[test]
    fn test_from_str_any_dispatches_on_version_keyword() {
        let message = from_str_any(OMM).unwrap();
        assert_eq!(message.name(), "OMM");
        assert_eq!(message.header().originator.as_deref(), Some("NOAA/USA"));
    }

    #[test]
    fn test_from_str_any_dispatches_on_root_element() {
        let omm = from_str::<Omm>(OMM).unwrap();
        let xml = to_string_with_options(&omm, &GeneratorOptions::xml()).unwrap();
        match from_str_any(&xml).unwrap() {
            Ndm::Omm(parsed) => assert!(approx::ApproxEq::approx_eq(&parsed, &omm)),
            other => panic!("unexpected {}", other.name()),
        }
    }

    #[test]
    fn test_from_str_any_rejects_unknown_input() {
        let err = from_str_any("CCSDS_XYZ_VERS = 1.0\n").unwrap_err();
        assert!(matches!(err, Error::UnexpectedKeyword { line: 1, .. }));
        let err = from_str_any("<foo id=\"X\" version=\"1.0\"></foo>").unwrap_err();
        assert!(matches!(err, Error::UnexpectedSection { .. }));
        let err = from_str_any("\n\n").unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { .. }));
    }

    #[test]
    fn test_wrong_message_type() {
        let err = from_str::<Opm>(OMM).unwrap_err();
        assert!(matches!(err, Error::UnexpectedKeyword { line: 1, .. }));
    }
}
