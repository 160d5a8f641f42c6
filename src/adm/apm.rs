//! Attitude Parameter Message.
//!
//! An APM gives the attitude of one object at one epoch as a quaternion,
//! optionally completed by Euler angles, inertia parameters and attitude
//! maneuvers. Like the OPM it has a single segment whose KVN sections carry
//! no markers.

use super::{is_rotation_sequence, AdmCommon, AdmCommonKey, AttitudeDir, RateFrame};
use crate::container::{mandatory, Block, BlockRouter, Builder, Validate};
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::message::{DataParser, MessageKind};
use crate::options::Syntax;
use crate::time::Epoch;
use crate::token::Token;
use crate::units::{DEG, DEG_S, KG_M2, N_M, ONE, S, S_INV};
use crate::writer::write_block;
use serde::{Deserialize, Serialize};

/// Marker type of the APM grammar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Apm;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApmMetadata {
    pub comments: Vec<String>,
    pub common: AdmCommon,
}

commented!(ApmMetadata);

approx_struct!(ApmMetadata { comments, common });

impl Validate for ApmMetadata {
    fn validate(&self, source: &str) -> Result<()> {
        self.common.validate(source)
    }
}

keywords! {
    pub enum QuaternionKey {
        Epoch => "EPOCH",
        QFrameA => "Q_FRAME_A",
        QFrameB => "Q_FRAME_B",
        QDir => "Q_DIR",
        Q1 => "Q1",
        Q2 => "Q2",
        Q3 => "Q3",
        Qc => "QC",
        Q1Dot => "Q1_DOT",
        Q2Dot => "Q2_DOT",
        Q3Dot => "Q3_DOT",
        QcDot => "QC_DOT",
    }
}

/// Attitude quaternion, scalar part last, and its optional derivative.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuaternionState {
    pub comments: Vec<String>,
    pub epoch: Option<Epoch>,
    pub q_frame_a: Option<String>,
    pub q_frame_b: Option<String>,
    pub q_dir: Option<AttitudeDir>,
    pub q: [Option<f64>; 4],
    pub q_dot: [Option<f64>; 4],
}

commented!(QuaternionState);

approx_struct!(QuaternionState {
    comments,
    epoch,
    q_frame_a,
    q_frame_b,
    q_dir,
    q,
    q_dot,
});

const Q_KEYS: [QuaternionKey; 4] = [QuaternionKey::Q1, QuaternionKey::Q2, QuaternionKey::Q3, QuaternionKey::Qc];
const Q_DOT_KEYS: [QuaternionKey; 4] = [
    QuaternionKey::Q1Dot,
    QuaternionKey::Q2Dot,
    QuaternionKey::Q3Dot,
    QuaternionKey::QcDot,
];

impl Block for QuaternionState {
    type Key = QuaternionKey;
    const NAME: &'static str = "quaternionState";

    fn lookup(keyword: &str) -> Option<QuaternionKey> {
        QuaternionKey::from_keyword(keyword)
    }

    fn set(&mut self, key: QuaternionKey, token: &Token) -> Result<()> {
        match key {
            QuaternionKey::Epoch => self.epoch = Some(token.content_as_epoch()?),
            QuaternionKey::QFrameA => self.q_frame_a = Some(token.content_as_string()),
            QuaternionKey::QFrameB => self.q_frame_b = Some(token.content_as_string()),
            QuaternionKey::QDir => self.q_dir = Some(token.content_as_enum()?),
            QuaternionKey::Q1 => self.q[0] = Some(token.content_as_f64(&ONE)?),
            QuaternionKey::Q2 => self.q[1] = Some(token.content_as_f64(&ONE)?),
            QuaternionKey::Q3 => self.q[2] = Some(token.content_as_f64(&ONE)?),
            QuaternionKey::Qc => self.q[3] = Some(token.content_as_f64(&ONE)?),
            QuaternionKey::Q1Dot => self.q_dot[0] = Some(token.content_as_f64(&S_INV)?),
            QuaternionKey::Q2Dot => self.q_dot[1] = Some(token.content_as_f64(&S_INV)?),
            QuaternionKey::Q3Dot => self.q_dot[2] = Some(token.content_as_f64(&S_INV)?),
            QuaternionKey::QcDot => self.q_dot[3] = Some(token.content_as_f64(&S_INV)?),
        }
        Ok(())
    }
}

impl QuaternionState {
    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            generator.write_epoch(QuaternionKey::Epoch.keyword(), self.epoch.as_ref(), true)?;
            generator.write_string(QuaternionKey::QFrameA.keyword(), self.q_frame_a.as_deref(), true)?;
            generator.write_string(QuaternionKey::QFrameB.keyword(), self.q_frame_b.as_deref(), true)?;
            let q_dir = self.q_dir.map(|d| d.to_string());
            generator.write_string(QuaternionKey::QDir.keyword(), q_dir.as_deref(), true)?;
            for (key, value) in Q_KEYS.iter().zip(self.q) {
                generator.write_f64(key.keyword(), value, &ONE, true)?;
            }
            for (key, value) in Q_DOT_KEYS.iter().zip(self.q_dot) {
                generator.write_f64(key.keyword(), value, &S_INV, false)?;
            }
            Ok(())
        })
    }
}

impl Validate for QuaternionState {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.epoch, source, "EPOCH", Self::NAME)?;
        mandatory(&self.q_frame_a, source, "Q_FRAME_A", Self::NAME)?;
        mandatory(&self.q_frame_b, source, "Q_FRAME_B", Self::NAME)?;
        mandatory(&self.q_dir, source, "Q_DIR", Self::NAME)?;
        for (key, value) in Q_KEYS.iter().zip(&self.q) {
            mandatory(value, source, key.keyword(), Self::NAME)?;
        }
        Ok(())
    }
}

keywords! {
    pub enum EulerKey {
        EulerFrameA => "EULER_FRAME_A",
        EulerFrameB => "EULER_FRAME_B",
        EulerDir => "EULER_DIR",
        EulerRotSeq => "EULER_ROT_SEQ",
        RateFrame => "RATE_FRAME",
        XAngle => "X_ANGLE",
        YAngle => "Y_ANGLE",
        ZAngle => "Z_ANGLE",
        XRate => "X_RATE",
        YRate => "Y_RATE",
        ZRate => "Z_RATE",
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerAngleState {
    pub comments: Vec<String>,
    pub euler_frame_a: Option<String>,
    pub euler_frame_b: Option<String>,
    pub euler_dir: Option<AttitudeDir>,
    pub euler_rot_seq: Option<String>,
    pub rate_frame: Option<RateFrame>,
    /// Radians.
    pub angles: [Option<f64>; 3],
    /// Radians per second.
    pub rates: [Option<f64>; 3],
}

commented!(EulerAngleState);

approx_struct!(EulerAngleState {
    comments,
    euler_frame_a,
    euler_frame_b,
    euler_dir,
    euler_rot_seq,
    rate_frame,
    angles,
    rates,
});

const ANGLE_KEYS: [EulerKey; 3] = [EulerKey::XAngle, EulerKey::YAngle, EulerKey::ZAngle];
const RATE_KEYS: [EulerKey; 3] = [EulerKey::XRate, EulerKey::YRate, EulerKey::ZRate];

impl Block for EulerAngleState {
    type Key = EulerKey;
    const NAME: &'static str = "eulerAngleState";

    fn lookup(keyword: &str) -> Option<EulerKey> {
        EulerKey::from_keyword(keyword)
    }

    fn set(&mut self, key: EulerKey, token: &Token) -> Result<()> {
        match key {
            EulerKey::EulerFrameA => self.euler_frame_a = Some(token.content_as_string()),
            EulerKey::EulerFrameB => self.euler_frame_b = Some(token.content_as_string()),
            EulerKey::EulerDir => self.euler_dir = Some(token.content_as_enum()?),
            EulerKey::EulerRotSeq => {
                if !is_rotation_sequence(&token.value) {
                    return Err(Error::invalid_value(token, "rotation sequence"));
                }
                self.euler_rot_seq = Some(token.content_as_string());
            }
            EulerKey::RateFrame => self.rate_frame = Some(token.content_as_enum()?),
            EulerKey::XAngle => self.angles[0] = Some(token.content_as_f64(&DEG)?),
            EulerKey::YAngle => self.angles[1] = Some(token.content_as_f64(&DEG)?),
            EulerKey::ZAngle => self.angles[2] = Some(token.content_as_f64(&DEG)?),
            EulerKey::XRate => self.rates[0] = Some(token.content_as_f64(&DEG_S)?),
            EulerKey::YRate => self.rates[1] = Some(token.content_as_f64(&DEG_S)?),
            EulerKey::ZRate => self.rates[2] = Some(token.content_as_f64(&DEG_S)?),
        }
        Ok(())
    }
}

impl EulerAngleState {
    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            generator.write_string(EulerKey::EulerFrameA.keyword(), self.euler_frame_a.as_deref(), false)?;
            generator.write_string(EulerKey::EulerFrameB.keyword(), self.euler_frame_b.as_deref(), false)?;
            let euler_dir = self.euler_dir.map(|d| d.to_string());
            generator.write_string(EulerKey::EulerDir.keyword(), euler_dir.as_deref(), false)?;
            generator.write_string(EulerKey::EulerRotSeq.keyword(), self.euler_rot_seq.as_deref(), false)?;
            let rate_frame = self.rate_frame.map(|f| f.to_string());
            generator.write_string(EulerKey::RateFrame.keyword(), rate_frame.as_deref(), false)?;
            for (key, value) in ANGLE_KEYS.iter().zip(self.angles) {
                generator.write_f64(key.keyword(), value, &DEG, false)?;
            }
            for (key, value) in RATE_KEYS.iter().zip(self.rates) {
                generator.write_f64(key.keyword(), value, &DEG_S, false)?;
            }
            Ok(())
        })
    }
}

keywords! {
    pub enum InertiaKey {
        InertiaRefFrame => "INERTIA_REF_FRAME",
        I11 => "I11",
        I22 => "I22",
        I33 => "I33",
        I12 => "I12",
        I13 => "I13",
        I23 => "I23",
    }
}

/// Inertia tensor of the spacecraft.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InertiaParameters {
    pub comments: Vec<String>,
    pub inertia_ref_frame: Option<String>,
    /// `I11 I22 I33 I12 I13 I23`.
    pub moments: [Option<f64>; 6],
}

commented!(InertiaParameters);

approx_struct!(InertiaParameters {
    comments,
    inertia_ref_frame,
    moments,
});

impl Block for InertiaParameters {
    type Key = InertiaKey;
    const NAME: &'static str = "spacecraftParameters";

    fn lookup(keyword: &str) -> Option<InertiaKey> {
        InertiaKey::from_keyword(keyword)
    }

    fn set(&mut self, key: InertiaKey, token: &Token) -> Result<()> {
        match key {
            InertiaKey::InertiaRefFrame => self.inertia_ref_frame = Some(token.content_as_string()),
            moment => self.moments[moment as usize - 1] = Some(token.content_as_f64(&KG_M2)?),
        }
        Ok(())
    }
}

impl InertiaParameters {
    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            generator.write_string(
                InertiaKey::InertiaRefFrame.keyword(),
                self.inertia_ref_frame.as_deref(),
                false,
            )?;
            for (key, value) in InertiaKey::ALL[1..].iter().zip(self.moments) {
                generator.write_f64(key.keyword(), value, &KG_M2, false)?;
            }
            Ok(())
        })
    }
}

keywords! {
    pub enum ManeuverKey {
        ManEpochStart => "MAN_EPOCH_START",
        ManDuration => "MAN_DURATION",
        ManRefFrame => "MAN_REF_FRAME",
        ManTor1 => "MAN_TOR_1",
        ManTor2 => "MAN_TOR_2",
        ManTor3 => "MAN_TOR_3",
    }
}

/// An attitude maneuver, as a constant torque over a duration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttitudeManeuver {
    pub comments: Vec<String>,
    pub epoch_start: Option<Epoch>,
    pub duration: Option<f64>,
    pub ref_frame: Option<String>,
    pub torque: [Option<f64>; 3],
}

commented!(AttitudeManeuver);

approx_struct!(AttitudeManeuver {
    comments,
    epoch_start,
    duration,
    ref_frame,
    torque,
});

const TORQUE_KEYS: [ManeuverKey; 3] = [ManeuverKey::ManTor1, ManeuverKey::ManTor2, ManeuverKey::ManTor3];

impl Block for AttitudeManeuver {
    type Key = ManeuverKey;
    const NAME: &'static str = "maneuverParameters";

    fn lookup(keyword: &str) -> Option<ManeuverKey> {
        ManeuverKey::from_keyword(keyword)
    }

    fn set(&mut self, key: ManeuverKey, token: &Token) -> Result<()> {
        match key {
            ManeuverKey::ManEpochStart => self.epoch_start = Some(token.content_as_epoch()?),
            ManeuverKey::ManDuration => self.duration = Some(token.content_as_f64(&S)?),
            ManeuverKey::ManRefFrame => self.ref_frame = Some(token.content_as_string()),
            ManeuverKey::ManTor1 => self.torque[0] = Some(token.content_as_f64(&N_M)?),
            ManeuverKey::ManTor2 => self.torque[1] = Some(token.content_as_f64(&N_M)?),
            ManeuverKey::ManTor3 => self.torque[2] = Some(token.content_as_f64(&N_M)?),
        }
        Ok(())
    }
}

impl AttitudeManeuver {
    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            generator.write_epoch(ManeuverKey::ManEpochStart.keyword(), self.epoch_start.as_ref(), true)?;
            generator.write_f64(ManeuverKey::ManDuration.keyword(), self.duration, &S, true)?;
            generator.write_string(ManeuverKey::ManRefFrame.keyword(), self.ref_frame.as_deref(), true)?;
            for (key, value) in TORQUE_KEYS.iter().zip(self.torque) {
                generator.write_f64(key.keyword(), value, &N_M, false)?;
            }
            Ok(())
        })
    }
}

impl Validate for AttitudeManeuver {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.epoch_start, source, "MAN_EPOCH_START", Self::NAME)?;
        mandatory(&self.duration, source, "MAN_DURATION", Self::NAME)?;
        mandatory(&self.ref_frame, source, "MAN_REF_FRAME", Self::NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApmData {
    pub quaternion_state: QuaternionState,
    pub euler_angle_state: Option<EulerAngleState>,
    pub inertia: Option<InertiaParameters>,
    pub maneuvers: Vec<AttitudeManeuver>,
}

approx_struct!(ApmData {
    quaternion_state,
    euler_angle_state,
    inertia,
    maneuvers,
});

impl Validate for ApmData {
    fn validate(&self, source: &str) -> Result<()> {
        self.quaternion_state.validate(source)?;
        for maneuver in &self.maneuvers {
            maneuver.validate(source)?;
        }
        Ok(())
    }
}

impl ApmData {
    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        self.quaternion_state.write(generator)?;
        if let Some(euler) = &self.euler_angle_state {
            euler.write(generator)?;
        }
        if let Some(inertia) = &self.inertia {
            inertia.write(generator)?;
        }
        for maneuver in &self.maneuvers {
            maneuver.write(generator)?;
        }
        Ok(())
    }
}

const BLOCKS: &[&str] = &[
    QuaternionState::NAME,
    EulerAngleState::NAME,
    InertiaParameters::NAME,
    AttitudeManeuver::NAME,
];

pub struct ApmDataParser {
    router: BlockRouter,
    quaternion_state: Option<Builder<QuaternionState>>,
    euler_angle_state: Option<Builder<EulerAngleState>>,
    inertia: Option<Builder<InertiaParameters>>,
    maneuver: Option<Builder<AttitudeManeuver>>,
    maneuvers: Vec<AttitudeManeuver>,
}

impl ApmDataParser {
    pub fn new(syntax: Syntax) -> Self {
        ApmDataParser {
            router: BlockRouter::new(syntax),
            quaternion_state: None,
            euler_angle_state: None,
            inertia: None,
            maneuver: None,
            maneuvers: Vec::new(),
        }
    }

    fn close_maneuver(&mut self) {
        if let Some(maneuver) = self.maneuver.take() {
            self.maneuvers.push(maneuver.into_inner());
        }
    }
}

impl DataParser for ApmDataParser {
    type Output = ApmData;

    fn process(&mut self, token: &Token) -> Result<bool> {
        if token.is_comment() {
            self.router.comment(token);
            return Ok(true);
        }
        if !token.is_entry() {
            let maneuver = token.name == AttitudeManeuver::NAME;
            if maneuver && token.is_start() {
                self.close_maneuver();
            }
            return self.router.section(token, BLOCKS);
        }

        let next_maneuver = token.name == ManeuverKey::ManEpochStart.keyword()
            && self
                .maneuver
                .as_ref()
                .map_or(false, |m| m.get().epoch_start.is_some());
        if next_maneuver {
            self.close_maneuver();
        }

        Ok(self.router.route(&mut self.quaternion_state, token)?
            || self.router.route(&mut self.euler_angle_state, token)?
            || self.router.route(&mut self.inertia, token)?
            || self.router.route(&mut self.maneuver, token)?)
    }

    fn finish(mut self) -> Result<ApmData> {
        self.router.finish()?;
        self.close_maneuver();
        Ok(ApmData {
            quaternion_state: self.quaternion_state.map(Builder::into_inner).unwrap_or_default(),
            euler_angle_state: self.euler_angle_state.map(Builder::into_inner),
            inertia: self.inertia.map(Builder::into_inner),
            maneuvers: self.maneuvers,
        })
    }
}

impl MessageKind for Apm {
    type Metadata = ApmMetadata;
    type Data = ApmData;
    type DataParser = ApmDataParser;

    const NAME: &'static str = "APM";
    const ROOT: &'static str = "apm";
    const VERSION_KEY: &'static str = "CCSDS_APM_VERS";
    const DEFAULT_VERSION: f64 = 1.0;
    const HEADER_ID_VERSION: f64 = super::NO_HEADER_ID;
    const KVN_METADATA_MARKERS: bool = false;
    const KVN_DATA_MARKERS: bool = false;
    const MULTI_SEGMENT: bool = false;

    fn process_metadata(metadata: &mut Builder<ApmMetadata>, token: &Token) -> Result<bool> {
        if AdmCommonKey::from_keyword(&token.name).is_none() {
            return Ok(false);
        }
        metadata.fields().common.process(token)
    }

    fn data_parser(_metadata: &ApmMetadata, syntax: Syntax) -> ApmDataParser {
        ApmDataParser::new(syntax)
    }

    fn write_metadata(generator: &mut dyn Generator, metadata: &ApmMetadata) -> Result<()> {
        metadata.common.write_identification(generator)?;
        metadata.common.write_time_system(generator)
    }

    fn write_data(generator: &mut dyn Generator, _metadata: &ApmMetadata, data: &ApmData) -> Result<()> {
        data.write(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, value: &str, line: usize) -> Token {
        Token::entry(name, value, None, line, "apm")
    }

    #[test]
    fn test_kvn_blocks_and_maneuvers() {
        let mut parser = ApmDataParser::new(Syntax::Kvn);
        let tokens = [
            entry("COMMENT", "attitude", 1),
            entry("EPOCH", "2003-09-30T14:28:15.1172", 2),
            entry("Q_FRAME_A", "ITRF-97", 3),
            entry("Q1", "0.5", 4),
            entry("I11", "6080.0", 5),
            entry("I23", "-10.0", 6),
            entry("MAN_EPOCH_START", "2004-02-14T14:29:00", 7),
            entry("MAN_TOR_1", "-1.25", 8),
            entry("MAN_EPOCH_START", "2004-02-15T14:29:00", 9),
        ];
        for token in &tokens {
            assert!(parser.process(token).unwrap());
        }
        let data = parser.finish().unwrap();
        assert_eq!(data.quaternion_state.comments, vec!["attitude"]);
        assert_eq!(data.quaternion_state.q[0], Some(0.5));
        let inertia = data.inertia.unwrap();
        assert_eq!(inertia.moments[0], Some(6080.0));
        assert_eq!(inertia.moments[5], Some(-10.0));
        assert_eq!(data.maneuvers.len(), 2);
        assert_eq!(data.maneuvers[0].torque[0], Some(-1.25));
    }

    #[test]
    fn test_quaternion_is_mandatory() {
        let state = QuaternionState {
            epoch: Epoch::parse("2003-09-30T14:28:15"),
            q_frame_a: Some("ITRF-97".to_string()),
            q_frame_b: Some("SC_BODY_1".to_string()),
            q_dir: Some(AttitudeDir::A2B),
            q: [Some(0.0), Some(0.0), None, Some(1.0)],
            ..Default::default()
        };
        match state.validate("apm") {
            Err(Error::MissingKeyword { keyword, container, .. }) => {
                assert_eq!(keyword, "Q3");
                assert_eq!(container, "quaternionState");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_euler_rotation_sequence() {
        let mut euler = EulerAngleState::default();
        assert!(euler.set(EulerKey::EulerRotSeq, &entry("EULER_ROT_SEQ", "312", 4)).is_ok());
        assert!(euler.set(EulerKey::EulerRotSeq, &entry("EULER_ROT_SEQ", "311", 5)).is_err());
    }

    #[test]
    fn test_dangling_comment() {
        let mut parser = ApmDataParser::new(Syntax::Kvn);
        parser.process(&entry("EPOCH", "2003-09-30T14:28:15", 1)).unwrap();
        parser.process(&entry("COMMENT", "nothing follows", 2)).unwrap();
        assert!(matches!(
            parser.finish(),
            Err(Error::CommentNotAllowed { line: 2, .. })
        ));
    }
}
