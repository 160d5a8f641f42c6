//! Tracking Data Message.
//!
//! A TDM is a sequence of segments, each made of the metadata describing a
//! tracking configuration (participants, signal path, conventions) and the
//! observations collected with it. An observation is a keyword naming the
//! measured quantity, with a date and a value:
//!
//! ```text
//! DATA_START
//! TRANSMIT_FREQ_2 = 2005-159T17:41:00 7175173383.615373
//! RANGE           = 2005-159T17:41:00 +4.00000000000000e+04
//! DATA_STOP
//! ```
//!
//! In XML each observation is an `<observation>` element holding an `EPOCH`
//! element and one element named after the quantity. Observation values are
//! kept in the units declared by the metadata (`RANGE_UNITS`, `ANGLE_TYPE`),
//! never converted.

use crate::container::{mandatory, push_indexed, Builder, Validate};
use crate::error::{Error, Result};
use crate::format::{ensure_finite, format_f64};
use crate::generator::Generator;
use crate::message::{DataParser, MessageKind};
use crate::options::Syntax;
use crate::section::SectionName;
use crate::time::{Epoch, TimeSystem};
use crate::token::{parse_f64, Enumerated, Token};
use crate::units::S;
use crate::writer::TimeSpan;
use serde::{Deserialize, Serialize};

/// Marker type of the TDM grammar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tdm;

ccsds_enum! {
    pub enum TrackingMode {
        Sequential => "SEQUENTIAL",
        SingleDiff => "SINGLE_DIFF",
    }
}

ccsds_enum! {
    pub enum TimetagRef {
        Transmit => "TRANSMIT",
        Receive => "RECEIVE",
    }
}

ccsds_enum! {
    pub enum IntegrationRef {
        Start => "START",
        Middle => "MIDDLE",
        End => "END",
    }
}

ccsds_enum! {
    pub enum RangeMode {
        Coherent => "COHERENT",
        Constant => "CONSTANT",
        OneWay => "ONE_WAY",
    }
}

ccsds_enum! {
    pub enum AngleType {
        Azel => "AZEL",
        Radec => "RADEC",
        Xeyn => "XEYN",
        Xsye => "XSYE",
    }
}

ccsds_enum! {
    pub enum DataQuality {
        Raw => "RAW",
        Validated => "VALIDATED",
        Degraded => "DEGRADED",
    }
}

ccsds_enum! {
    /// Measured quantity of an observation.
    pub enum ObservationType {
        Angle1 => "ANGLE_1",
        Angle2 => "ANGLE_2",
        CarrierPower => "CARRIER_POWER",
        ClockBias => "CLOCK_BIAS",
        ClockDrift => "CLOCK_DRIFT",
        DopplerInstantaneous => "DOPPLER_INSTANTANEOUS",
        DopplerIntegrated => "DOPPLER_INTEGRATED",
        Dor => "DOR",
        Mag => "MAG",
        PcN0 => "PC_N0",
        PrN0 => "PR_N0",
        Pressure => "PRESSURE",
        Range => "RANGE",
        Rcs => "RCS",
        ReceiveFreq => "RECEIVE_FREQ",
        ReceiveFreq1 => "RECEIVE_FREQ_1",
        ReceiveFreq2 => "RECEIVE_FREQ_2",
        ReceiveFreq3 => "RECEIVE_FREQ_3",
        ReceiveFreq4 => "RECEIVE_FREQ_4",
        ReceiveFreq5 => "RECEIVE_FREQ_5",
        Rhumidity => "RHUMIDITY",
        Stec => "STEC",
        Temperature => "TEMPERATURE",
        TransmitFreq1 => "TRANSMIT_FREQ_1",
        TransmitFreq2 => "TRANSMIT_FREQ_2",
        TransmitFreq3 => "TRANSMIT_FREQ_3",
        TransmitFreq4 => "TRANSMIT_FREQ_4",
        TransmitFreq5 => "TRANSMIT_FREQ_5",
        TransmitFreqRate1 => "TRANSMIT_FREQ_RATE_1",
        TransmitFreqRate2 => "TRANSMIT_FREQ_RATE_2",
        TransmitFreqRate3 => "TRANSMIT_FREQ_RATE_3",
        TransmitFreqRate4 => "TRANSMIT_FREQ_RATE_4",
        TransmitFreqRate5 => "TRANSMIT_FREQ_RATE_5",
        TropoDry => "TROPO_DRY",
        TropoWet => "TROPO_WET",
        VlbiDelay => "VLBI_DELAY",
    }
}

keywords! {
    pub enum TdmMetadataKey {
        TimeSystem => "TIME_SYSTEM",
        StartTime => "START_TIME",
        StopTime => "STOP_TIME",
        Mode => "MODE",
        Path => "PATH",
        Path1 => "PATH_1",
        Path2 => "PATH_2",
        TransmitBand => "TRANSMIT_BAND",
        ReceiveBand => "RECEIVE_BAND",
        TimetagRef => "TIMETAG_REF",
        IntegrationInterval => "INTEGRATION_INTERVAL",
        IntegrationRef => "INTEGRATION_REF",
        RangeMode => "RANGE_MODE",
        RangeModulus => "RANGE_MODULUS",
        RangeUnits => "RANGE_UNITS",
        AngleType => "ANGLE_TYPE",
        ReferenceFrame => "REFERENCE_FRAME",
        DataQuality => "DATA_QUALITY",
    }
}

const PARTICIPANT: &str = "PARTICIPANT_";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TdmMetadata {
    pub comments: Vec<String>,
    pub time_system: Option<TimeSystem>,
    pub start_time: Option<Epoch>,
    pub stop_time: Option<Epoch>,
    /// `PARTICIPANT_1`, `PARTICIPANT_2`, ...
    pub participants: Vec<String>,
    pub mode: Option<TrackingMode>,
    pub path: Option<String>,
    pub path_1: Option<String>,
    pub path_2: Option<String>,
    pub transmit_band: Option<String>,
    pub receive_band: Option<String>,
    pub timetag_ref: Option<TimetagRef>,
    pub integration_interval: Option<f64>,
    pub integration_ref: Option<IntegrationRef>,
    pub range_mode: Option<RangeMode>,
    pub range_modulus: Option<f64>,
    pub range_units: Option<String>,
    pub angle_type: Option<AngleType>,
    pub reference_frame: Option<String>,
    pub data_quality: Option<DataQuality>,
}

commented!(TdmMetadata);

approx_struct!(TdmMetadata {
    comments,
    time_system,
    start_time,
    stop_time,
    participants,
    mode,
    path,
    path_1,
    path_2,
    transmit_band,
    receive_band,
    timetag_ref,
    integration_interval,
    integration_ref,
    range_mode,
    range_modulus,
    range_units,
    angle_type,
    reference_frame,
    data_quality,
});

impl TdmMetadata {
    fn paths(&self) -> impl Iterator<Item = (&'static str, &String)> {
        [
            (TdmMetadataKey::Path.keyword(), self.path.as_ref()),
            (TdmMetadataKey::Path1.keyword(), self.path_1.as_ref()),
            (TdmMetadataKey::Path2.keyword(), self.path_2.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, path)| path.map(|p| (key, p)))
    }
}

/// Participant indices of a signal path such as `1,2,1`.
fn path_indices(path: &str) -> Option<Vec<usize>> {
    let indices: Vec<usize> = path
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    (indices.len() >= 2 && !indices.contains(&0)).then_some(indices)
}

impl Validate for TdmMetadata {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.time_system, source, "TIME_SYSTEM", "metadata")?;
        if self.participants.is_empty() {
            return Err(Error::missing_keyword(source, "PARTICIPANT_1", "metadata"));
        }
        let mut paths = self.paths().peekable();
        if paths.peek().is_some() {
            mandatory(&self.mode, source, "MODE", "metadata")?;
        }
        let declared = self.participants.len();
        for (key, path) in paths {
            let highest = path_indices(path).and_then(|i| i.into_iter().max()).unwrap_or(0);
            if highest > declared {
                return Err(Error::count_mismatch(source, key, declared, highest));
            }
        }
        Ok(())
    }
}

impl TimeSpan for TdmMetadata {
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

/// One tracking observation, in the units of its segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObservationType,
    pub epoch: Epoch,
    pub value: f64,
}

approx_struct!(Observation { kind, epoch, value });

const OBSERVATION: &str = "observation";

impl Observation {
    /// Parses a KVN observation, `KEYWORD = epoch value`.
    fn parse(kind: ObservationType, token: &Token) -> Result<Self> {
        let invalid = || Error::invalid_value(token, "epoch followed by a number");
        let mut fields = token.value.split_whitespace();
        let epoch = fields.next().and_then(Epoch::parse).ok_or_else(invalid)?;
        let value = fields.next().and_then(parse_f64).ok_or_else(invalid)?;
        if fields.next().is_some() {
            return Err(invalid());
        }
        Ok(Observation { kind, epoch, value })
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        let keyword = self.kind.as_str();
        ensure_finite(generator.output_name(), keyword, [self.value])?;
        match generator.syntax() {
            Syntax::Kvn => {
                let value = format!("{} {}", self.epoch, format_f64(self.value));
                generator.write_entry(keyword, Some(&value), None, true)
            }
            Syntax::Xml => {
                generator.enter_section(SectionName::implicit(OBSERVATION))?;
                generator.write_epoch("EPOCH", Some(&self.epoch), true)?;
                generator.write_entry(keyword, Some(&format_f64(self.value)), None, true)?;
                generator.exit_section()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TdmData {
    pub comments: Vec<String>,
    pub observations: Vec<Observation>,
}

approx_struct!(TdmData { comments, observations });

impl Validate for TdmData {
    fn validate(&self, _source: &str) -> Result<()> {
        Ok(())
    }
}

/// An `<observation>` element being read.
#[derive(Debug, Default)]
struct PartialObservation {
    epoch: Option<Epoch>,
    value: Option<(ObservationType, f64)>,
}

pub struct TdmDataParser {
    syntax: Syntax,
    comments: Vec<String>,
    observations: Vec<Observation>,
    observation: Option<PartialObservation>,
}

impl TdmDataParser {
    pub fn new(syntax: Syntax) -> Self {
        TdmDataParser {
            syntax,
            comments: Vec::new(),
            observations: Vec::new(),
            observation: None,
        }
    }

    fn process_observation(&mut self, token: &Token) -> Result<bool> {
        let partial = match self.observation.as_mut() {
            Some(partial) => partial,
            None => return Ok(false),
        };
        if token.is_stop() && token.name == OBSERVATION {
            let epoch = partial
                .epoch
                .ok_or_else(|| Error::incomplete_line(token, "EPOCH"))?;
            let (kind, value) = partial
                .value
                .ok_or_else(|| Error::incomplete_line(token, "measurement"))?;
            self.observations.push(Observation { kind, epoch, value });
            self.observation = None;
            return Ok(true);
        }
        if !token.is_entry() {
            return Ok(false);
        }
        if token.name == "EPOCH" {
            partial.epoch = Some(token.content_as_epoch()?);
            return Ok(true);
        }
        match ObservationType::from_value(&token.name) {
            Some(kind) if partial.value.is_none() => {
                partial.value = Some((kind, token.content_as_raw_f64()?));
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl DataParser for TdmDataParser {
    type Output = TdmData;

    fn process(&mut self, token: &Token) -> Result<bool> {
        if self.observation.is_some() {
            return self.process_observation(token);
        }
        if token.is_comment() {
            if !self.observations.is_empty() {
                return Err(Error::comment_not_allowed(token));
            }
            self.comments.push(token.value.clone());
            return Ok(true);
        }
        match self.syntax {
            Syntax::Kvn if token.is_entry() => match ObservationType::from_value(&token.name) {
                Some(kind) => {
                    self.observations.push(Observation::parse(kind, token)?);
                    Ok(true)
                }
                None => Ok(false),
            },
            Syntax::Xml if token.is_start() && token.name == OBSERVATION => {
                self.observation = Some(PartialObservation::default());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn finish(self) -> Result<TdmData> {
        Ok(TdmData {
            comments: self.comments,
            observations: self.observations,
        })
    }
}

impl MessageKind for Tdm {
    type Metadata = TdmMetadata;
    type Data = TdmData;
    type DataParser = TdmDataParser;

    const NAME: &'static str = "TDM";
    const ROOT: &'static str = "tdm";
    const VERSION_KEY: &'static str = "CCSDS_TDM_VERS";
    const DEFAULT_VERSION: f64 = 2.0;
    const HEADER_ID_VERSION: f64 = 2.0;
    const KVN_METADATA_MARKERS: bool = true;
    const KVN_DATA_MARKERS: bool = true;
    const MULTI_SEGMENT: bool = true;

    fn process_metadata(metadata: &mut Builder<TdmMetadata>, token: &Token) -> Result<bool> {
        if let Some(index) = token.index_after(PARTICIPANT) {
            let participants = &mut metadata.fields().participants;
            push_indexed(participants, index, token.content_as_string(), token)?;
            return Ok(true);
        }
        let key = match TdmMetadataKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        let fields = metadata.fields();
        match key {
            TdmMetadataKey::TimeSystem => fields.time_system = Some(token.content_as_enum()?),
            TdmMetadataKey::StartTime => fields.start_time = Some(token.content_as_epoch()?),
            TdmMetadataKey::StopTime => fields.stop_time = Some(token.content_as_epoch()?),
            TdmMetadataKey::Mode => fields.mode = Some(token.content_as_enum()?),
            TdmMetadataKey::Path | TdmMetadataKey::Path1 | TdmMetadataKey::Path2 => {
                if path_indices(&token.value).is_none() {
                    return Err(Error::invalid_value(token, "comma-separated participant indices"));
                }
                let path = Some(token.content_as_string());
                match key {
                    TdmMetadataKey::Path => fields.path = path,
                    TdmMetadataKey::Path1 => fields.path_1 = path,
                    _ => fields.path_2 = path,
                }
            }
            TdmMetadataKey::TransmitBand => fields.transmit_band = Some(token.content_as_string()),
            TdmMetadataKey::ReceiveBand => fields.receive_band = Some(token.content_as_string()),
            TdmMetadataKey::TimetagRef => fields.timetag_ref = Some(token.content_as_enum()?),
            TdmMetadataKey::IntegrationInterval => fields.integration_interval = Some(token.content_as_f64(&S)?),
            TdmMetadataKey::IntegrationRef => fields.integration_ref = Some(token.content_as_enum()?),
            TdmMetadataKey::RangeMode => fields.range_mode = Some(token.content_as_enum()?),
            TdmMetadataKey::RangeModulus => fields.range_modulus = Some(token.content_as_raw_f64()?),
            TdmMetadataKey::RangeUnits => fields.range_units = Some(token.content_as_string()),
            TdmMetadataKey::AngleType => fields.angle_type = Some(token.content_as_enum()?),
            TdmMetadataKey::ReferenceFrame => fields.reference_frame = Some(token.content_as_string()),
            TdmMetadataKey::DataQuality => fields.data_quality = Some(token.content_as_enum()?),
        }
        Ok(true)
    }

    fn data_parser(_metadata: &TdmMetadata, syntax: Syntax) -> TdmDataParser {
        TdmDataParser::new(syntax)
    }

    fn write_metadata(generator: &mut dyn Generator, metadata: &TdmMetadata) -> Result<()> {
        let time_system = metadata.time_system.map(|v| v.to_string());
        generator.write_string(TdmMetadataKey::TimeSystem.keyword(), time_system.as_deref(), true)?;
        generator.write_epoch(TdmMetadataKey::StartTime.keyword(), metadata.start_time.as_ref(), false)?;
        generator.write_epoch(TdmMetadataKey::StopTime.keyword(), metadata.stop_time.as_ref(), false)?;
        for (i, participant) in metadata.participants.iter().enumerate() {
            generator.write_string(&format!("{}{}", PARTICIPANT, i + 1), Some(participant), true)?;
        }
        let mode = metadata.mode.map(|v| v.to_string());
        generator.write_string(TdmMetadataKey::Mode.keyword(), mode.as_deref(), false)?;
        for (key, path) in metadata.paths() {
            generator.write_string(key, Some(path), false)?;
        }
        generator.write_string(
            TdmMetadataKey::TransmitBand.keyword(),
            metadata.transmit_band.as_deref(),
            false,
        )?;
        generator.write_string(TdmMetadataKey::ReceiveBand.keyword(), metadata.receive_band.as_deref(), false)?;
        let timetag_ref = metadata.timetag_ref.map(|v| v.to_string());
        generator.write_string(TdmMetadataKey::TimetagRef.keyword(), timetag_ref.as_deref(), false)?;
        generator.write_f64(
            TdmMetadataKey::IntegrationInterval.keyword(),
            metadata.integration_interval,
            &S,
            false,
        )?;
        let integration_ref = metadata.integration_ref.map(|v| v.to_string());
        generator.write_string(TdmMetadataKey::IntegrationRef.keyword(), integration_ref.as_deref(), false)?;
        let range_mode = metadata.range_mode.map(|v| v.to_string());
        generator.write_string(TdmMetadataKey::RangeMode.keyword(), range_mode.as_deref(), false)?;
        let range_modulus = metadata.range_modulus.map(format_f64);
        generator.write_string(TdmMetadataKey::RangeModulus.keyword(), range_modulus.as_deref(), false)?;
        generator.write_string(TdmMetadataKey::RangeUnits.keyword(), metadata.range_units.as_deref(), false)?;
        let angle_type = metadata.angle_type.map(|v| v.to_string());
        generator.write_string(TdmMetadataKey::AngleType.keyword(), angle_type.as_deref(), false)?;
        generator.write_string(
            TdmMetadataKey::ReferenceFrame.keyword(),
            metadata.reference_frame.as_deref(),
            false,
        )?;
        let data_quality = metadata.data_quality.map(|v| v.to_string());
        generator.write_string(TdmMetadataKey::DataQuality.keyword(), data_quality.as_deref(), false)
    }

    fn write_data(generator: &mut dyn Generator, _metadata: &TdmMetadata, data: &TdmData) -> Result<()> {
        generator.write_comments(&data.comments)?;
        for observation in &data.observations {
            observation.write(generator)?;
        }
        Ok(())
    }
}
