//! Attitude Ephemeris Message.
//!
//! Each AEM segment is a time history of attitude states whose layout is set
//! by the segment's `ATTITUDE_TYPE`. Components are stored in a canonical
//! order (scalar part of quaternions last) whatever the `QUATERNION_TYPE`
//! used on KVN lines.
//!
//! ```text
//! META_START
//! OBJECT_NAME = MARS GLOBAL SURVEYOR
//! ...
//! ATTITUDE_TYPE = QUATERNION
//! QUATERNION_TYPE = FIRST
//! META_STOP
//!
//! DATA_START
//! 1996-11-28T21:29:07.2555 0.56748 0.03146 0.45689 0.68427
//! DATA_STOP
//! ```

use super::{is_rotation_sequence, AdmCommon, AdmCommonKey, AttitudeDir, QuaternionType, RateFrame};
use crate::container::{check_count, mandatory, Builder, Validate};
use crate::error::{Error, Result};
use crate::format::{ensure_finite, format_signed};
use crate::generator::Generator;
use crate::message::{DataParser, MessageKind};
use crate::options::Syntax;
use crate::section::SectionName;
use crate::time::Epoch;
use crate::token::{parse_f64, Token};
use crate::units::{Unit, DEG, DEG_S, ONE, S, S_INV};
use crate::writer::TimeSpan;
use serde::{Deserialize, Serialize};

/// Marker type of the AEM grammar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aem;

ccsds_enum! {
    /// Layout of attitude states.
    pub enum AttitudeType {
        Quaternion => "QUATERNION",
        QuaternionDerivative => "QUATERNION/DERIVATIVE",
        QuaternionRate => "QUATERNION/RATE",
        EulerAngle => "EULER_ANGLE",
        EulerAngleRate => "EULER_ANGLE/RATE",
        Spin => "SPIN",
        SpinNutation => "SPIN/NUTATION",
    }
}

impl AttitudeType {
    pub fn is_quaternion(self) -> bool {
        matches!(
            self,
            AttitudeType::Quaternion | AttitudeType::QuaternionDerivative | AttitudeType::QuaternionRate
        )
    }

    pub fn is_euler(self) -> bool {
        matches!(self, AttitudeType::EulerAngle | AttitudeType::EulerAngleRate)
    }

    pub fn has_rates(self) -> bool {
        matches!(self, AttitudeType::QuaternionRate | AttitudeType::EulerAngleRate)
    }

    /// Component names and units, in canonical order.
    pub fn components(self) -> Vec<(&'static str, Unit)> {
        let quaternion = || vec![("Q1", ONE), ("Q2", ONE), ("Q3", ONE), ("QC", ONE)];
        let angles = || vec![("X_ANGLE", DEG), ("Y_ANGLE", DEG), ("Z_ANGLE", DEG)];
        let rates = || vec![("X_RATE", DEG_S), ("Y_RATE", DEG_S), ("Z_RATE", DEG_S)];
        let spin = || {
            vec![
                ("SPIN_ALPHA", DEG),
                ("SPIN_DELTA", DEG),
                ("SPIN_ANGLE", DEG),
                ("SPIN_ANGLE_VEL", DEG_S),
            ]
        };
        match self {
            AttitudeType::Quaternion => quaternion(),
            AttitudeType::QuaternionDerivative => {
                let mut components = quaternion();
                components.extend([
                    ("Q1_DOT", S_INV),
                    ("Q2_DOT", S_INV),
                    ("Q3_DOT", S_INV),
                    ("QC_DOT", S_INV),
                ]);
                components
            }
            AttitudeType::QuaternionRate => {
                let mut components = quaternion();
                components.extend(rates());
                components
            }
            AttitudeType::EulerAngle => angles(),
            AttitudeType::EulerAngleRate => {
                let mut components = angles();
                components.extend(rates());
                components
            }
            AttitudeType::Spin => spin(),
            AttitudeType::SpinNutation => {
                let mut components = spin();
                components.extend([("NUTATION", DEG), ("NUTATION_PER", S), ("NUTATION_PHASE", DEG)]);
                components
            }
        }
    }
}

/// Order in which canonical components appear on a KVN line.
fn line_order(attitude_type: AttitudeType, quaternion_type: Option<QuaternionType>) -> Vec<usize> {
    let count = attitude_type.components().len();
    if !attitude_type.is_quaternion() || quaternion_type != Some(QuaternionType::First) {
        return (0..count).collect();
    }
    let mut order = vec![3, 0, 1, 2];
    if attitude_type == AttitudeType::QuaternionDerivative {
        order.extend([7, 4, 5, 6]);
    } else {
        order.extend(4..count);
    }
    order
}

keywords! {
    pub enum AemMetadataKey {
        RefFrameA => "REF_FRAME_A",
        RefFrameB => "REF_FRAME_B",
        AttitudeDir => "ATTITUDE_DIR",
        StartTime => "START_TIME",
        UseableStartTime => "USEABLE_START_TIME",
        UseableStopTime => "USEABLE_STOP_TIME",
        StopTime => "STOP_TIME",
        AttitudeType => "ATTITUDE_TYPE",
        QuaternionType => "QUATERNION_TYPE",
        EulerRotSeq => "EULER_ROT_SEQ",
        RateFrame => "RATE_FRAME",
        InterpolationMethod => "INTERPOLATION_METHOD",
        InterpolationDegree => "INTERPOLATION_DEGREE",
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AemMetadata {
    pub comments: Vec<String>,
    pub common: AdmCommon,
    pub ref_frame_a: Option<String>,
    pub ref_frame_b: Option<String>,
    pub attitude_dir: Option<AttitudeDir>,
    pub start_time: Option<Epoch>,
    pub useable_start_time: Option<Epoch>,
    pub useable_stop_time: Option<Epoch>,
    pub stop_time: Option<Epoch>,
    pub attitude_type: Option<AttitudeType>,
    pub quaternion_type: Option<QuaternionType>,
    pub euler_rot_seq: Option<String>,
    pub rate_frame: Option<RateFrame>,
    pub interpolation_method: Option<String>,
    pub interpolation_degree: Option<u32>,
}

commented!(AemMetadata);

approx_struct!(AemMetadata {
    comments,
    common,
    ref_frame_a,
    ref_frame_b,
    attitude_dir,
    start_time,
    useable_start_time,
    useable_stop_time,
    stop_time,
    attitude_type,
    quaternion_type,
    euler_rot_seq,
    rate_frame,
    interpolation_method,
    interpolation_degree,
});

impl Validate for AemMetadata {
    fn validate(&self, source: &str) -> Result<()> {
        self.common.validate(source)?;
        mandatory(&self.ref_frame_a, source, "REF_FRAME_A", "metadata")?;
        mandatory(&self.ref_frame_b, source, "REF_FRAME_B", "metadata")?;
        mandatory(&self.attitude_dir, source, "ATTITUDE_DIR", "metadata")?;
        mandatory(&self.start_time, source, "START_TIME", "metadata")?;
        mandatory(&self.stop_time, source, "STOP_TIME", "metadata")?;
        mandatory(&self.attitude_type, source, "ATTITUDE_TYPE", "metadata")?;
        if let Some(attitude_type) = self.attitude_type {
            if attitude_type.is_quaternion() {
                mandatory(&self.quaternion_type, source, "QUATERNION_TYPE", "metadata")?;
            }
            if attitude_type.is_euler() {
                mandatory(&self.euler_rot_seq, source, "EULER_ROT_SEQ", "metadata")?;
            }
            if attitude_type.has_rates() {
                mandatory(&self.rate_frame, source, "RATE_FRAME", "metadata")?;
            }
        }
        Ok(())
    }
}

impl TimeSpan for AemMetadata {
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

/// One attitude state, with components in canonical order and SI units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttitudeState {
    pub epoch: Epoch,
    pub values: Vec<f64>,
}

approx_struct!(AttitudeState { epoch, values });

/// Component layout of the segment being read or written.
#[derive(Debug, Clone)]
struct Layout {
    components: Vec<(&'static str, Unit)>,
    order: Vec<usize>,
}

impl Layout {
    fn of(metadata: &AemMetadata) -> Option<Layout> {
        let attitude_type = metadata.attitude_type?;
        Some(Layout {
            components: attitude_type.components(),
            order: line_order(attitude_type, metadata.quaternion_type),
        })
    }

    fn parse_line(&self, token: &Token) -> Result<AttitudeState> {
        let expected = format!("epoch followed by {} numbers", self.components.len());
        let invalid = || Error::invalid_value(token, &expected);
        let mut fields = token.value.split_whitespace();
        let epoch = fields.next().and_then(Epoch::parse).ok_or_else(invalid)?;
        let raw: Vec<f64> = fields.map(parse_f64).collect::<Option<_>>().ok_or_else(invalid)?;
        if raw.len() != self.components.len() {
            return Err(invalid());
        }
        let mut values = vec![0.0; raw.len()];
        for (value, &index) in raw.iter().zip(&self.order) {
            values[index] = self.components[index].1.to_si(*value);
        }
        Ok(AttitudeState { epoch, values })
    }

    /// Fails when `state` does not carry one value per component.
    fn check(&self, source: &str, state: &AttitudeState) -> Result<()> {
        check_count(
            source,
            "ATTITUDE_TYPE",
            Some(self.components.len()),
            state.values.len(),
        )
    }

    fn line(&self, state: &AttitudeState) -> String {
        let mut line = state.epoch.to_string();
        for &index in &self.order {
            line.push(' ');
            line.push_str(&format_signed(self.components[index].1.from_si(state.values[index])));
        }
        line
    }

    fn write(&self, generator: &mut dyn Generator, state: &AttitudeState) -> Result<()> {
        self.check(generator.output_name(), state)?;
        ensure_finite(generator.output_name(), ATTITUDE_STATE, state.values.iter().copied())?;
        match generator.syntax() {
            Syntax::Kvn => generator.write_raw_data(ATTITUDE_STATE, &self.line(state)),
            Syntax::Xml => {
                generator.enter_section(SectionName::implicit(ATTITUDE_STATE))?;
                generator.write_epoch("EPOCH", Some(&state.epoch), true)?;
                for ((name, unit), value) in self.components.iter().zip(&state.values) {
                    generator.write_f64(name, Some(*value), unit, true)?;
                }
                generator.exit_section()
            }
        }
    }
}

const ATTITUDE_STATE: &str = "attitudeState";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AemData {
    pub comments: Vec<String>,
    pub states: Vec<AttitudeState>,
}

approx_struct!(AemData { comments, states });

impl Validate for AemData {
    fn validate(&self, _source: &str) -> Result<()> {
        Ok(())
    }
}

/// An `<attitudeState>` element being read.
struct PartialAttitude {
    epoch: Option<Epoch>,
    values: Vec<Option<f64>>,
}

pub struct AemDataParser {
    syntax: Syntax,
    layout: Option<Layout>,
    comments: Vec<String>,
    states: Vec<AttitudeState>,
    state: Option<PartialAttitude>,
}

impl AemDataParser {
    pub fn new(metadata: &AemMetadata, syntax: Syntax) -> Self {
        AemDataParser {
            syntax,
            layout: Layout::of(metadata),
            comments: Vec::new(),
            states: Vec::new(),
            state: None,
        }
    }

    fn layout(&self, token: &Token) -> Result<&Layout> {
        self.layout
            .as_ref()
            .ok_or_else(|| Error::invalid_value(token, "attitude state after ATTITUDE_TYPE"))
    }

    fn process_state(&mut self, token: &Token) -> Result<bool> {
        let layout = match &self.layout {
            Some(layout) => layout,
            None => return Ok(false),
        };
        let partial = match self.state.as_mut() {
            Some(partial) => partial,
            None => return Ok(false),
        };
        if token.is_stop() && token.name == ATTITUDE_STATE {
            let epoch = partial
                .epoch
                .ok_or_else(|| Error::incomplete_line(token, "EPOCH"))?;
            let mut values = Vec::with_capacity(partial.values.len());
            for (value, (name, _)) in partial.values.iter().zip(&layout.components) {
                values.push(value.ok_or_else(|| Error::incomplete_line(token, name))?);
            }
            self.states.push(AttitudeState { epoch, values });
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
        match layout.components.iter().position(|(name, _)| *name == token.name) {
            Some(i) => {
                partial.values[i] = Some(token.content_as_f64(&layout.components[i].1)?);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl DataParser for AemDataParser {
    type Output = AemData;

    fn process(&mut self, token: &Token) -> Result<bool> {
        if self.state.is_some() {
            return self.process_state(token);
        }
        if token.is_comment() {
            if !self.states.is_empty() {
                return Err(Error::comment_not_allowed(token));
            }
            self.comments.push(token.value.clone());
            return Ok(true);
        }
        match self.syntax {
            Syntax::Kvn if token.is_raw_line() => {
                let state = self.layout(token)?.parse_line(token)?;
                self.states.push(state);
                Ok(true)
            }
            Syntax::Xml if token.is_start() && token.name == ATTITUDE_STATE => {
                let count = self.layout(token)?.components.len();
                self.state = Some(PartialAttitude {
                    epoch: None,
                    values: vec![None; count],
                });
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn finish(self) -> Result<AemData> {
        Ok(AemData {
            comments: self.comments,
            states: self.states,
        })
    }
}

impl MessageKind for Aem {
    type Metadata = AemMetadata;
    type Data = AemData;
    type DataParser = AemDataParser;

    const NAME: &'static str = "AEM";
    const ROOT: &'static str = "aem";
    const VERSION_KEY: &'static str = "CCSDS_AEM_VERS";
    const DEFAULT_VERSION: f64 = 1.0;
    const HEADER_ID_VERSION: f64 = super::NO_HEADER_ID;
    const KVN_METADATA_MARKERS: bool = true;
    const KVN_DATA_MARKERS: bool = true;
    const MULTI_SEGMENT: bool = true;

    fn process_metadata(metadata: &mut Builder<AemMetadata>, token: &Token) -> Result<bool> {
        if AdmCommonKey::from_keyword(&token.name).is_some() {
            return metadata.fields().common.process(token);
        }
        let key = match AemMetadataKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        let fields = metadata.fields();
        match key {
            AemMetadataKey::RefFrameA => fields.ref_frame_a = Some(token.content_as_string()),
            AemMetadataKey::RefFrameB => fields.ref_frame_b = Some(token.content_as_string()),
            AemMetadataKey::AttitudeDir => fields.attitude_dir = Some(token.content_as_enum()?),
            AemMetadataKey::StartTime => fields.start_time = Some(token.content_as_epoch()?),
            AemMetadataKey::UseableStartTime => fields.useable_start_time = Some(token.content_as_epoch()?),
            AemMetadataKey::UseableStopTime => fields.useable_stop_time = Some(token.content_as_epoch()?),
            AemMetadataKey::StopTime => fields.stop_time = Some(token.content_as_epoch()?),
            AemMetadataKey::AttitudeType => fields.attitude_type = Some(token.content_as_enum()?),
            AemMetadataKey::QuaternionType => fields.quaternion_type = Some(token.content_as_enum()?),
            AemMetadataKey::EulerRotSeq => {
                if !is_rotation_sequence(&token.value) {
                    return Err(Error::invalid_value(token, "rotation sequence"));
                }
                fields.euler_rot_seq = Some(token.content_as_string());
            }
            AemMetadataKey::RateFrame => fields.rate_frame = Some(token.content_as_enum()?),
            AemMetadataKey::InterpolationMethod => fields.interpolation_method = Some(token.content_as_string()),
            AemMetadataKey::InterpolationDegree => fields.interpolation_degree = Some(token.content_as_int()?),
        }
        Ok(true)
    }

    fn data_parser(metadata: &AemMetadata, syntax: Syntax) -> AemDataParser {
        AemDataParser::new(metadata, syntax)
    }

    fn write_metadata(generator: &mut dyn Generator, metadata: &AemMetadata) -> Result<()> {
        metadata.common.write_identification(generator)?;
        generator.write_string(AemMetadataKey::RefFrameA.keyword(), metadata.ref_frame_a.as_deref(), true)?;
        generator.write_string(AemMetadataKey::RefFrameB.keyword(), metadata.ref_frame_b.as_deref(), true)?;
        let attitude_dir = metadata.attitude_dir.map(|d| d.to_string());
        generator.write_string(AemMetadataKey::AttitudeDir.keyword(), attitude_dir.as_deref(), true)?;
        metadata.common.write_time_system(generator)?;
        let epochs = [
            (AemMetadataKey::StartTime, metadata.start_time.as_ref(), true),
            (AemMetadataKey::UseableStartTime, metadata.useable_start_time.as_ref(), false),
            (AemMetadataKey::UseableStopTime, metadata.useable_stop_time.as_ref(), false),
            (AemMetadataKey::StopTime, metadata.stop_time.as_ref(), true),
        ];
        for (key, value, mandatory) in epochs {
            generator.write_epoch(key.keyword(), value, mandatory)?;
        }
        let attitude_type = metadata.attitude_type.map(|t| t.to_string());
        generator.write_string(AemMetadataKey::AttitudeType.keyword(), attitude_type.as_deref(), true)?;
        let quaternion_type = metadata.quaternion_type.map(|t| t.to_string());
        generator.write_string(AemMetadataKey::QuaternionType.keyword(), quaternion_type.as_deref(), false)?;
        generator.write_string(AemMetadataKey::EulerRotSeq.keyword(), metadata.euler_rot_seq.as_deref(), false)?;
        let rate_frame = metadata.rate_frame.map(|f| f.to_string());
        generator.write_string(AemMetadataKey::RateFrame.keyword(), rate_frame.as_deref(), false)?;
        generator.write_string(
            AemMetadataKey::InterpolationMethod.keyword(),
            metadata.interpolation_method.as_deref(),
            false,
        )?;
        generator.write_int(
            AemMetadataKey::InterpolationDegree.keyword(),
            metadata.interpolation_degree.map(i64::from),
            false,
        )
    }

    fn validate_data(metadata: &AemMetadata, data: &AemData, source: &str) -> Result<()> {
        data.validate(source)?;
        if let Some(layout) = Layout::of(metadata) {
            for state in &data.states {
                layout.check(source, state)?;
            }
        }
        Ok(())
    }

    fn write_data(generator: &mut dyn Generator, metadata: &AemMetadata, data: &AemData) -> Result<()> {
        generator.write_comments(&data.comments)?;
        if data.states.is_empty() {
            return Ok(());
        }
        let layout = Layout::of(metadata)
            .ok_or_else(|| Error::missing_keyword(generator.output_name(), "ATTITUDE_TYPE", "metadata"))?;
        for state in &data.states {
            layout.write(generator, state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GeneratorOptions;

    fn metadata(attitude_type: AttitudeType, quaternion_type: Option<QuaternionType>) -> AemMetadata {
        AemMetadata {
            attitude_type: Some(attitude_type),
            quaternion_type,
            ..Default::default()
        }
    }

    fn raw(line: &str) -> Token {
        Token::entry("", line, None, 12, "aem")
    }

    #[test]
    fn test_scalar_first_quaternion_is_reordered() {
        let metadata = metadata(AttitudeType::Quaternion, Some(QuaternionType::First));
        let mut parser = AemDataParser::new(&metadata, Syntax::Kvn);
        assert!(parser.process(&raw("2000-01-01T00:00:00 0.5 0.25 0.125 0.0625")).unwrap());
        let data = parser.finish().unwrap();
        assert_eq!(data.states[0].values, vec![0.25, 0.125, 0.0625, 0.5]);

        let layout = Layout::of(&metadata).unwrap();
        assert_eq!(
            layout.line(&data.states[0]),
            "2000-01-01T00:00:00 +0.5 +0.25 +0.125 +0.0625"
        );
    }

    #[test]
    fn test_derivative_order() {
        assert_eq!(
            line_order(AttitudeType::QuaternionDerivative, Some(QuaternionType::First)),
            vec![3, 0, 1, 2, 7, 4, 5, 6]
        );
        assert_eq!(
            line_order(AttitudeType::QuaternionRate, Some(QuaternionType::First)),
            vec![3, 0, 1, 2, 4, 5, 6]
        );
        assert_eq!(line_order(AttitudeType::EulerAngle, Some(QuaternionType::First)), vec![0, 1, 2]);
    }

    #[test]
    fn test_euler_angles_in_radians() {
        let metadata = metadata(AttitudeType::EulerAngle, None);
        let mut parser = AemDataParser::new(&metadata, Syntax::Kvn);
        parser.process(&raw("2000-01-01T00:00:00 180.0 0.0 -90.0")).unwrap();
        let state = &parser.finish().unwrap().states[0];
        assert!((state.values[0] - std::f64::consts::PI).abs() < 1e-15);
        assert!((state.values[2] + std::f64::consts::FRAC_PI_2).abs() < 1e-15);
    }

    #[test]
    fn test_wrong_component_count() {
        let metadata = metadata(AttitudeType::Spin, None);
        let mut parser = AemDataParser::new(&metadata, Syntax::Kvn);
        assert!(matches!(
            parser.process(&raw("2000-01-01T00:00:00 1.0 2.0 3.0")),
            Err(Error::InvalidValue { line: 12, .. })
        ));
    }

    #[test]
    fn test_xml_attitude_state() {
        let metadata = metadata(AttitudeType::Quaternion, Some(QuaternionType::Last));
        let mut parser = AemDataParser::new(&metadata, Syntax::Xml);
        let entry = |name: &str, value: &str| Token::entry(name, value, None, 3, "aem");
        let tokens = [
            Token::start("attitudeState", 2, "aem"),
            entry("EPOCH", "2000-01-01T00:00:00"),
            entry("Q1", "0.5"),
            entry("Q2", "0.5"),
            entry("Q3", "0.5"),
            entry("QC", "0.5"),
            Token::stop("attitudeState", 4, "aem"),
        ];
        for token in &tokens {
            assert!(parser.process(token).unwrap());
        }
        assert_eq!(parser.finish().unwrap().states[0].values, vec![0.5; 4]);
    }

    #[test]
    fn test_incomplete_xml_attitude_state() {
        let metadata = metadata(AttitudeType::Quaternion, Some(QuaternionType::Last));
        let mut parser = AemDataParser::new(&metadata, Syntax::Xml);
        let entry = |name: &str, value: &str| Token::entry(name, value, None, 3, "aem");
        for token in [
            Token::start("attitudeState", 2, "aem"),
            entry("EPOCH", "2000-01-01T00:00:00"),
            entry("Q1", "0.5"),
        ] {
            assert!(parser.process(&token).unwrap());
        }
        match parser.process(&Token::stop("attitudeState", 4, "aem")) {
            Err(Error::InvalidValue { line, expected, .. }) => {
                assert_eq!(line, 4);
                assert_eq!(expected, "attitudeState with a Q2 element");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_state_without_attitude_type() {
        let mut parser = AemDataParser::new(&AemMetadata::default(), Syntax::Kvn);
        assert!(matches!(
            parser.process(&raw("2000-01-01T00:00:00 0.5 0.5 0.5 0.5")),
            Err(Error::InvalidValue { line: 12, .. })
        ));
    }

    #[test]
    fn test_short_state_is_rejected_on_write_and_validate() {
        let metadata = metadata(AttitudeType::Quaternion, Some(QuaternionType::Last));
        let data = AemData {
            comments: Vec::new(),
            states: vec![AttitudeState {
                epoch: Epoch::parse("2000-01-01T00:00:00").unwrap(),
                values: vec![1.0],
            }],
        };
        for options in [GeneratorOptions::kvn(), GeneratorOptions::xml()] {
            let mut generator = crate::generator::generator(options.with_output_name("out.aem"));
            match Aem::write_data(generator.as_mut(), &metadata, &data) {
                Err(Error::CountMismatch { source_name, keyword, declared, found }) => {
                    assert_eq!(source_name, "out.aem");
                    assert_eq!(keyword, "ATTITUDE_TYPE");
                    assert_eq!((declared, found), (4, 1));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(matches!(
            Aem::validate_data(&metadata, &data, "aem"),
            Err(Error::CountMismatch { declared: 4, found: 1, .. })
        ));
    }

    #[test]
    fn test_conditional_mandatory_keywords() {
        let mut metadata = AemMetadata {
            common: AdmCommon {
                object_name: Some("MGS".to_string()),
                object_id: Some("1996-062A".to_string()),
                time_system: Some(crate::time::TimeSystem::Utc),
                ..Default::default()
            },
            ref_frame_a: Some("EME2000".to_string()),
            ref_frame_b: Some("SC_BODY_1".to_string()),
            attitude_dir: Some(AttitudeDir::A2B),
            start_time: Epoch::parse("2000-01-01T00:00:00"),
            stop_time: Epoch::parse("2000-01-02T00:00:00"),
            attitude_type: Some(AttitudeType::EulerAngleRate),
            euler_rot_seq: Some("312".to_string()),
            ..Default::default()
        };
        match metadata.validate("aem") {
            Err(Error::MissingKeyword { keyword, .. }) => assert_eq!(keyword, "RATE_FRAME"),
            other => panic!("unexpected {:?}", other),
        }
        metadata.rate_frame = Some(RateFrame::RefFrameA);
        assert!(metadata.validate("aem").is_ok());
    }
}
