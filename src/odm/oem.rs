//! Orbit Ephemeris Message.
//!
//! An OEM is a sequence of segments, each one an ephemeris of states over
//! the span given in its metadata, optionally followed by covariance
//! matrices. In KVN states are bare data lines and covariances are grouped
//! in a `COVARIANCE_START`/`COVARIANCE_STOP` block:
//!
//! ```text
//! META_START
//! ...
//! META_STOP
//! 1996-12-18T12:00:00.331 2789.619 -280.045 -1746.755 4.73372 -2.49586 -1.04195
//! 1996-12-18T12:01:00.331 2783.419 -308.143 -1877.071 5.18604 -2.42124 -1.99608
//! COVARIANCE_START
//! EPOCH = 1996-12-28T21:29:07.267
//! COV_REF_FRAME = EME2000
//! 3.3313494e-04
//! 4.6189273e-04 6.7824216e-04
//! ...
//! COVARIANCE_STOP
//! ```
//!
//! In XML states are `<stateVector>` elements and each matrix is a
//! `<covarianceMatrix>` element.

use super::{CartesianCovariance, OdmCommon, OdmCommonKey};
use crate::container::{mandatory, Block, Builder, Validate};
use crate::error::{Error, Result};
use crate::format::{ensure_finite, format_f64, format_signed};
use crate::generator::Generator;
use crate::message::{DataParser, MessageKind};
use crate::options::Syntax;
use crate::section::SectionName;
use crate::time::Epoch;
use crate::token::{parse_f64, Token};
use crate::units::{Unit, KM, KM_S, KM_S2};
use crate::writer::TimeSpan;
use serde::{Deserialize, Serialize};

/// Marker type of the OEM grammar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Oem;

keywords! {
    pub enum OemMetadataKey {
        StartTime => "START_TIME",
        UseableStartTime => "USEABLE_START_TIME",
        UseableStopTime => "USEABLE_STOP_TIME",
        StopTime => "STOP_TIME",
        Interpolation => "INTERPOLATION",
        InterpolationDegree => "INTERPOLATION_DEGREE",
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OemMetadata {
    pub comments: Vec<String>,
    pub common: OdmCommon,
    pub start_time: Option<Epoch>,
    pub useable_start_time: Option<Epoch>,
    pub useable_stop_time: Option<Epoch>,
    pub stop_time: Option<Epoch>,
    pub interpolation: Option<String>,
    pub interpolation_degree: Option<u32>,
}

commented!(OemMetadata);

approx_struct!(OemMetadata {
    comments,
    common,
    start_time,
    useable_start_time,
    useable_stop_time,
    stop_time,
    interpolation,
    interpolation_degree,
});

impl Validate for OemMetadata {
    fn validate(&self, source: &str) -> Result<()> {
        self.common.validate(source)?;
        mandatory(&self.start_time, source, "START_TIME", "metadata")?;
        mandatory(&self.stop_time, source, "STOP_TIME", "metadata")
    }
}

impl TimeSpan for OemMetadata {
    fn start_time(&self) -> Option<&Epoch> {
        self.start_time.as_ref()
    }

    fn set_start_time(&mut self, epoch: Epoch) {
        self.start_time = Some(epoch);
    }

    fn set_stop_time(&mut self, epoch: Epoch) {
        self.stop_time = Some(epoch);
    }
}

/// One ephemeris state, in SI units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EphemerisState {
    pub epoch: Epoch,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    pub acceleration: Option<[f64; 3]>,
}

approx_struct!(EphemerisState {
    epoch,
    position,
    velocity,
    acceleration,
});

const STATE_KEYS: [&str; 9] = [
    "X", "Y", "Z", "X_DOT", "Y_DOT", "Z_DOT", "X_DDOT", "Y_DDOT", "Z_DDOT",
];

fn state_unit(index: usize) -> Unit {
    match index / 3 {
        0 => KM,
        1 => KM_S,
        _ => KM_S2,
    }
}

impl EphemerisState {
    fn from_values(epoch: Epoch, values: &[f64]) -> Self {
        let triple = |i: usize| [values[i], values[i + 1], values[i + 2]];
        EphemerisState {
            epoch,
            position: triple(0),
            velocity: triple(3),
            acceleration: (values.len() == 9).then(|| triple(6)),
        }
    }

    fn values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(9);
        values.extend_from_slice(&self.position);
        values.extend_from_slice(&self.velocity);
        if let Some(acceleration) = &self.acceleration {
            values.extend_from_slice(acceleration);
        }
        values
    }

    /// Parses a KVN ephemeris line.
    fn parse_line(token: &Token) -> Result<Self> {
        let invalid = || Error::invalid_value(token, "epoch followed by 6 or 9 numbers");
        let mut fields = token.value.split_whitespace();
        let epoch = fields.next().and_then(Epoch::parse).ok_or_else(invalid)?;
        let raw: Vec<f64> = fields.map(parse_f64).collect::<Option<_>>().ok_or_else(invalid)?;
        if raw.len() != 6 && raw.len() != 9 {
            return Err(invalid());
        }
        let values: Vec<f64> = raw
            .iter()
            .enumerate()
            .map(|(i, v)| state_unit(i).to_si(*v))
            .collect();
        Ok(EphemerisState::from_values(epoch, &values))
    }

    fn line(&self) -> String {
        let mut line = self.epoch.to_string();
        for (i, value) in self.values().into_iter().enumerate() {
            line.push(' ');
            line.push_str(&format_signed(state_unit(i).from_si(value)));
        }
        line
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        ensure_finite(generator.output_name(), STATE_VECTOR, self.values())?;
        match generator.syntax() {
            Syntax::Kvn => generator.write_raw_data(STATE_VECTOR, &self.line()),
            Syntax::Xml => {
                generator.enter_section(SectionName::implicit(STATE_VECTOR))?;
                generator.write_epoch("EPOCH", Some(&self.epoch), true)?;
                for (i, value) in self.values().into_iter().enumerate() {
                    generator.write_f64(STATE_KEYS[i], Some(value), &state_unit(i), true)?;
                }
                generator.exit_section()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OemData {
    pub comments: Vec<String>,
    pub states: Vec<EphemerisState>,
    pub covariances: Vec<CartesianCovariance>,
}

approx_struct!(OemData {
    comments,
    states,
    covariances,
});

impl Validate for OemData {
    fn validate(&self, source: &str) -> Result<()> {
        for covariance in &self.covariances {
            mandatory(&covariance.epoch, source, "EPOCH", CartesianCovariance::NAME)?;
            covariance.validate(source)?;
        }
        Ok(())
    }
}

const STATE_VECTOR: &str = "stateVector";
const COVARIANCE: SectionName = SectionName::new("COVARIANCE", CartesianCovariance::NAME);

fn covariance_row_line(covariance: &CartesianCovariance, row: usize, output: &str) -> Result<String> {
    let first = row * (row + 1) / 2;
    let mut terms = Vec::with_capacity(row + 1);
    for index in first..=first + row {
        match covariance.terms[index] {
            Some(value) => {
                let keyword = super::CovarianceKey::ALL[index + 1].keyword();
                ensure_finite(output, keyword, [value])?;
                terms.push(format_f64(super::covariance_unit(index).from_si(value)));
            }
            None => {
                let keyword = super::CovarianceKey::ALL[index + 1].keyword();
                return Err(Error::missing_keyword(output, keyword, CartesianCovariance::NAME));
            }
        }
    }
    Ok(terms.join(" "))
}

fn write_covariances(generator: &mut dyn Generator, covariances: &[CartesianCovariance]) -> Result<()> {
    match generator.syntax() {
        Syntax::Kvn => {
            generator.write_empty_line()?;
            generator.enter_section(COVARIANCE)?;
            for covariance in covariances {
                generator.write_comments(&covariance.comments)?;
                generator.write_epoch("EPOCH", covariance.epoch.as_ref(), true)?;
                generator.write_string("COV_REF_FRAME", covariance.cov_ref_frame.as_deref(), false)?;
                for row in 0..6 {
                    let line = covariance_row_line(covariance, row, generator.output_name())?;
                    generator.write_raw_data(CartesianCovariance::NAME, &line)?;
                }
            }
            generator.exit_section()
        }
        Syntax::Xml => {
            for covariance in covariances {
                generator.enter_section(COVARIANCE)?;
                generator.write_comments(&covariance.comments)?;
                generator.write_epoch("EPOCH", covariance.epoch.as_ref(), true)?;
                covariance.write_terms(generator)?;
                generator.exit_section()?;
            }
            Ok(())
        }
    }
}

/// A `<stateVector>` element being read.
#[derive(Debug, Default)]
struct PartialState {
    epoch: Option<Epoch>,
    values: [Option<f64>; 9],
}

struct OpenCovariance {
    builder: Builder<CartesianCovariance>,
    rows: usize,
}

impl OpenCovariance {
    fn new() -> Self {
        OpenCovariance {
            builder: Builder::default(),
            rows: 0,
        }
    }
}

pub struct OemDataParser {
    syntax: Syntax,
    comments: Vec<String>,
    states: Vec<EphemerisState>,
    covariances: Vec<CartesianCovariance>,
    in_covariance: bool,
    covariance: Option<OpenCovariance>,
    state: Option<PartialState>,
}

impl OemDataParser {
    pub fn new(syntax: Syntax) -> Self {
        OemDataParser {
            syntax,
            comments: Vec::new(),
            states: Vec::new(),
            covariances: Vec::new(),
            in_covariance: false,
            covariance: None,
            state: None,
        }
    }

    fn close_covariance(&mut self) {
        if let Some(open) = self.covariance.take() {
            self.covariances.push(open.builder.into_inner());
        }
    }

    /// The covariance receiving the next token, started anew when `fresh` rejects the open one.
    fn open_covariance(&mut self, fresh: impl Fn(&OpenCovariance) -> bool) -> &mut OpenCovariance {
        if self.covariance.as_ref().map_or(false, |open| !fresh(open)) {
            self.close_covariance();
        }
        self.covariance.get_or_insert_with(OpenCovariance::new)
    }

    fn process_covariance(&mut self, token: &Token) -> Result<bool> {
        if COVARIANCE.is_stop(token, self.syntax) {
            self.close_covariance();
            self.in_covariance = false;
            return Ok(true);
        }
        if token.is_comment() {
            let open = self.open_covariance(|open| open.builder.accepts_comments());
            open.builder.add_comment(token)?;
            return Ok(true);
        }
        let kvn = self.syntax == Syntax::Kvn;
        if token.is_entry() && token.name == "EPOCH" {
            let open = self.open_covariance(|open| !kvn || open.builder.get().epoch.is_none());
            open.builder.fields().epoch = Some(token.content_as_epoch()?);
            return Ok(true);
        }
        if kvn && token.is_raw_line() {
            let open = self.open_covariance(|open| open.rows < 6);
            let row = open.rows;
            open.builder.fields().set_row(row, token)?;
            open.rows += 1;
            return Ok(true);
        }
        if token.is_entry() {
            if let Some(key) = CartesianCovariance::lookup(&token.name) {
                let open = self.open_covariance(|_| true);
                open.builder.fields().set(key, token)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn process_state(&mut self, token: &Token) -> Result<bool> {
        let complete = token.is_stop() && token.name == STATE_VECTOR;
        let partial = match self.state.as_mut() {
            Some(partial) => partial,
            None => return Ok(false),
        };
        if complete {
            let epoch = partial
                .epoch
                .ok_or_else(|| Error::incomplete_line(token, "EPOCH"))?;
            let mut values = Vec::with_capacity(9);
            for (i, value) in partial.values.iter().enumerate() {
                match value {
                    Some(value) => values.push(*value),
                    None if i >= 6 && partial.values[6..].iter().all(Option::is_none) => break,
                    None => return Err(Error::incomplete_line(token, STATE_KEYS[i])),
                }
            }
            self.states.push(EphemerisState::from_values(epoch, &values));
            self.state = None;
            return Ok(true);
        }
        if !token.is_entry() {
            return Ok(false);
        }
        if token.name == "EPOCH" {
            partial.epoch = Some(token.content_as_epoch()?);
            return Ok(true);
        }
        match STATE_KEYS.iter().position(|key| *key == token.name) {
            Some(i) => {
                partial.values[i] = Some(token.content_as_f64(&state_unit(i))?);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl DataParser for OemDataParser {
    type Output = OemData;

    fn process(&mut self, token: &Token) -> Result<bool> {
        if self.in_covariance {
            return self.process_covariance(token);
        }
        if self.state.is_some() {
            return self.process_state(token);
        }
        if token.is_comment() {
            if !self.states.is_empty() || !self.covariances.is_empty() {
                return Err(Error::comment_not_allowed(token));
            }
            self.comments.push(token.value.clone());
            return Ok(true);
        }
        if COVARIANCE.is_start(token, self.syntax) {
            self.in_covariance = true;
            return Ok(true);
        }
        match self.syntax {
            Syntax::Kvn if token.is_raw_line() => {
                self.states.push(EphemerisState::parse_line(token)?);
                Ok(true)
            }
            Syntax::Xml if token.is_start() && token.name == STATE_VECTOR => {
                self.state = Some(PartialState::default());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn finish(mut self) -> Result<OemData> {
        self.close_covariance();
        Ok(OemData {
            comments: self.comments,
            states: self.states,
            covariances: self.covariances,
        })
    }
}

impl MessageKind for Oem {
    type Metadata = OemMetadata;
    type Data = OemData;
    type DataParser = OemDataParser;

    const NAME: &'static str = "OEM";
    const ROOT: &'static str = "oem";
    const VERSION_KEY: &'static str = "CCSDS_OEM_VERS";
    const DEFAULT_VERSION: f64 = 3.0;
    const HEADER_ID_VERSION: f64 = 3.0;
    const KVN_METADATA_MARKERS: bool = true;
    const KVN_DATA_MARKERS: bool = false;
    const MULTI_SEGMENT: bool = true;

    fn process_metadata(metadata: &mut Builder<OemMetadata>, token: &Token) -> Result<bool> {
        if OdmCommonKey::from_keyword(&token.name).is_some() {
            return metadata.fields().common.process(token);
        }
        let key = match OemMetadataKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        let fields = metadata.fields();
        match key {
            OemMetadataKey::StartTime => fields.start_time = Some(token.content_as_epoch()?),
            OemMetadataKey::UseableStartTime => fields.useable_start_time = Some(token.content_as_epoch()?),
            OemMetadataKey::UseableStopTime => fields.useable_stop_time = Some(token.content_as_epoch()?),
            OemMetadataKey::StopTime => fields.stop_time = Some(token.content_as_epoch()?),
            OemMetadataKey::Interpolation => fields.interpolation = Some(token.content_as_string()),
            OemMetadataKey::InterpolationDegree => fields.interpolation_degree = Some(token.content_as_int()?),
        }
        Ok(true)
    }

    fn data_parser(_metadata: &OemMetadata, syntax: Syntax) -> OemDataParser {
        OemDataParser::new(syntax)
    }

    fn write_metadata(generator: &mut dyn Generator, metadata: &OemMetadata) -> Result<()> {
        metadata.common.write(generator)?;
        generator.write_epoch(OemMetadataKey::StartTime.keyword(), metadata.start_time.as_ref(), true)?;
        generator.write_epoch(
            OemMetadataKey::UseableStartTime.keyword(),
            metadata.useable_start_time.as_ref(),
            false,
        )?;
        generator.write_epoch(
            OemMetadataKey::UseableStopTime.keyword(),
            metadata.useable_stop_time.as_ref(),
            false,
        )?;
        generator.write_epoch(OemMetadataKey::StopTime.keyword(), metadata.stop_time.as_ref(), true)?;
        generator.write_string(
            OemMetadataKey::Interpolation.keyword(),
            metadata.interpolation.as_deref(),
            false,
        )?;
        generator.write_int(
            OemMetadataKey::InterpolationDegree.keyword(),
            metadata.interpolation_degree.map(i64::from),
            false,
        )
    }

    fn write_data(generator: &mut dyn Generator, _metadata: &OemMetadata, data: &OemData) -> Result<()> {
        generator.write_comments(&data.comments)?;
        for state in &data.states {
            state.write(generator)?;
        }
        if !data.covariances.is_empty() {
            write_covariances(generator, &data.covariances)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(line: &str, number: usize) -> Token {
        Token::entry("", line, None, number, "oem")
    }

    #[test]
    fn test_ephemeris_line() {
        let token = raw("1996-12-18T12:00:00.331 2789.5 -280.25 -1746.75 4.5 -2.25 -1.125", 20);
        let state = EphemerisState::parse_line(&token).unwrap();
        assert_eq!(state.position[0], 2789500.0);
        assert_eq!(state.velocity[2], -1125.0);
        assert!(state.acceleration.is_none());
        assert_eq!(
            state.line(),
            "1996-12-18T12:00:00.331 +2789.5 -280.25 -1746.75 +4.5 -2.25 -1.125"
        );
    }

    #[test]
    fn test_short_ephemeris_line() {
        let token = raw("1996-12-18T12:00:00.331 1.0 2.0 3.0", 21);
        assert!(matches!(
            EphemerisState::parse_line(&token),
            Err(Error::InvalidValue { line: 21, .. })
        ));
    }

    #[test]
    fn test_incomplete_xml_state_vector() {
        let mut parser = OemDataParser::new(Syntax::Xml);
        let entry = |name: &str, value: &str| Token::entry(name, value, None, 5, "oem.xml");
        let mut tokens = vec![Token::start(STATE_VECTOR, 4, "oem.xml"), entry("EPOCH", "2000-01-01T00:00:00")];
        for key in ["X", "Y", "Z", "X_DOT", "Z_DOT"] {
            tokens.push(entry(key, "1.0"));
        }
        for token in &tokens {
            assert!(parser.process(token).unwrap());
        }
        match parser.process(&Token::stop(STATE_VECTOR, 11, "oem.xml")) {
            Err(Error::InvalidValue { line, keyword, expected, .. }) => {
                assert_eq!(line, 11);
                assert_eq!(keyword, STATE_VECTOR);
                assert!(expected.contains("Y_DOT"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_kvn_covariance_blocks() {
        let mut parser = OemDataParser::new(Syntax::Kvn);
        let mut tokens = vec![Token::start("COVARIANCE", 1, "oem")];
        for epoch in ["2000-01-01T00:00:00", "2000-01-02T00:00:00"] {
            tokens.push(Token::entry("EPOCH", epoch, None, 2, "oem"));
            tokens.push(Token::entry("COV_REF_FRAME", "EME2000", None, 3, "oem"));
            for row in 0..6 {
                tokens.push(raw(&vec!["1.0e-3"; row + 1].join(" "), 4 + row));
            }
        }
        tokens.push(Token::stop("COVARIANCE", 12, "oem"));
        for token in &tokens {
            assert!(parser.process(token).unwrap());
        }
        let data = parser.finish().unwrap();
        assert_eq!(data.covariances.len(), 2);
        assert!(data.validate("oem").is_ok());
        assert_eq!(data.covariances[1].terms[20], Some(1.0e3));
    }

    #[test]
    fn test_comment_after_states() {
        let mut parser = OemDataParser::new(Syntax::Kvn);
        let line = "2000-01-01T00:00:00 1 2 3 4 5 6";
        assert!(parser.process(&raw(line, 10)).unwrap());
        let comment = Token::entry("COMMENT", "late", None, 11, "oem");
        assert!(matches!(
            parser.process(&comment),
            Err(Error::CommentNotAllowed { line: 11, .. })
        ));
    }
}
