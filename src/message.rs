//! Message documents and the per-type grammar contract.
//!
//! All message types share the same outer shape (a [`Header`] followed by
//! [`Segment`]s of metadata and data) and differ by their metadata and data
//! containers. [`MessageKind`] is implemented by one zero-sized marker type
//! per message type ([`Opm`](crate::Opm), [`Oem`](crate::Oem), ...). It
//! supplies those containers, the keywords and markers framing them, and the
//! functions reading and writing them. The generic parser and writer do the
//! rest.

use crate::approx::ApproxEq;
use crate::container::{Builder, Commented, Validate};
use crate::error::Result;
use crate::generator::Generator;
use crate::header::Header;
use crate::options::Syntax;
use crate::section::SectionName;
use crate::token::Token;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Grammar of one message type.
pub trait MessageKind: Copy + Debug + PartialEq + Default + 'static {
    type Metadata: Commented
        + Validate
        + ApproxEq
        + Default
        + Clone
        + Debug
        + PartialEq
        + Serialize
        + DeserializeOwned;
    type Data: Validate + ApproxEq + Clone + Debug + PartialEq + Serialize + DeserializeOwned;
    type DataParser: DataParser<Output = Self::Data>;

    /// Short name (`OPM`).
    const NAME: &'static str;
    /// XML root element (`opm`).
    const ROOT: &'static str;
    /// KVN version keyword and XML `id` attribute (`CCSDS_OPM_VERS`).
    const VERSION_KEY: &'static str;
    /// Version written for documents built without one.
    const DEFAULT_VERSION: f64;
    /// First format version accepting `MESSAGE_ID` and `CLASSIFICATION`.
    const HEADER_ID_VERSION: f64;
    /// Whether KVN metadata is framed by `META_START`/`META_STOP`.
    const KVN_METADATA_MARKERS: bool;
    /// Whether KVN data is framed by `DATA_START`/`DATA_STOP`.
    const KVN_DATA_MARKERS: bool;
    const MULTI_SEGMENT: bool;

    /// Processes a metadata token, returning `false` for keywords that are
    /// not metadata keywords.
    fn process_metadata(metadata: &mut Builder<Self::Metadata>, token: &Token) -> Result<bool>;

    /// Creates the parser for the data section following `metadata`.
    fn data_parser(metadata: &Self::Metadata, syntax: Syntax) -> Self::DataParser;

    /// Writes the metadata fields, in table order, inside an open metadata section.
    fn write_metadata(generator: &mut dyn Generator, metadata: &Self::Metadata) -> Result<()>;

    /// Writes the data content inside an open data section.
    fn write_data(generator: &mut dyn Generator, metadata: &Self::Metadata, data: &Self::Data) -> Result<()>;

    /// Validates a data section against the metadata that declares its layout.
    fn validate_data(metadata: &Self::Metadata, data: &Self::Data, source: &str) -> Result<()> {
        let _ = metadata;
        data.validate(source)
    }

    fn metadata_section() -> SectionName {
        if Self::KVN_METADATA_MARKERS {
            SectionName::METADATA
        } else {
            SectionName::IMPLICIT_METADATA
        }
    }

    fn data_section() -> SectionName {
        if Self::KVN_DATA_MARKERS {
            SectionName::DATA
        } else {
            SectionName::IMPLICIT_DATA
        }
    }
}

/// Incremental parser of one data section.
pub trait DataParser {
    type Output;

    /// Processes one token of the data section.
    ///
    /// Returns `false` for tokens that do not belong to it.
    fn process(&mut self, token: &Token) -> Result<bool>;

    /// Completes the data section.
    fn finish(self) -> Result<Self::Output>;
}

/// One metadata/data pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Segment<K: MessageKind> {
    pub metadata: K::Metadata,
    pub data: K::Data,
}

impl<K: MessageKind> ApproxEq for Segment<K> {
    fn approx_eq(&self, other: &Self) -> bool {
        self.metadata.approx_eq(&other.metadata) && self.data.approx_eq(&other.data)
    }
}

/// A complete navigation data message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Message<K: MessageKind> {
    pub header: Header,
    pub segments: Vec<Segment<K>>,
}

impl<K: MessageKind> ApproxEq for Message<K> {
    fn approx_eq(&self, other: &Self) -> bool {
        self.header.approx_eq(&other.header) && self.segments.approx_eq(&other.segments)
    }
}

impl<K: MessageKind> Message<K> {
    pub fn new(header: Header) -> Self {
        Message {
            header,
            segments: Vec::new(),
        }
    }

    /// The first segment, which is the only one of single-segment messages.
    pub fn segment(&self) -> Option<&Segment<K>> {
        self.segments.first()
    }

    /// Validates every container, as `build()` does after parsing.
    pub fn validate(&self, source: &str) -> Result<()> {
        self.header.validate(source)?;
        for segment in &self.segments {
            segment.metadata.validate(source)?;
            K::validate_data(&segment.metadata, &segment.data, source)?;
        }
        Ok(())
    }
}
