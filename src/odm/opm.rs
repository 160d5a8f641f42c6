//! Orbit Parameter Message.
//!
//! An OPM describes the orbit of one object at one epoch: a mandatory state
//! vector, optionally completed by osculating Keplerian elements, spacecraft
//! parameters, a covariance matrix, planned maneuvers and user-defined
//! parameters. KVN files have no section markers at all:
//!
//! ```text
//! CCSDS_OPM_VERS = 3.0
//! CREATION_DATE  = 1998-11-06T09:23:57
//! ORIGINATOR     = JAXA
//! OBJECT_NAME    = GODZILLA 5
//! OBJECT_ID      = 1998-999A
//! CENTER_NAME    = EARTH
//! REF_FRAME      = ITRF2000
//! TIME_SYSTEM    = UTC
//! COMMENT State Vector
//! EPOCH          = 1998-12-18T14:28:15.1172
//! X              = 6503.514000 [km]
//! ...
//! ```

use super::{CartesianCovariance, OdmCommon, OdmCommonKey, SpacecraftParameters, UserDefined};
use crate::container::{mandatory, Block, BlockRouter, Builder, Validate};
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::message::{DataParser, MessageKind};
use crate::options::Syntax;
use crate::time::Epoch;
use crate::token::Token;
use crate::units::{Unit, DEG, KG, KM, KM3_S2, KM_S, ONE, S};
use crate::writer::write_block;
use serde::{Deserialize, Serialize};

/// Marker type of the OPM grammar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Opm;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpmMetadata {
    pub comments: Vec<String>,
    pub common: OdmCommon,
}

commented!(OpmMetadata);

approx_struct!(OpmMetadata { comments, common });

impl Validate for OpmMetadata {
    fn validate(&self, source: &str) -> Result<()> {
        self.common.validate(source)
    }
}

keywords! {
    pub enum StateVectorKey {
        Epoch => "EPOCH",
        X => "X",
        Y => "Y",
        Z => "Z",
        XDot => "X_DOT",
        YDot => "Y_DOT",
        ZDot => "Z_DOT",
    }
}

/// Cartesian position and velocity at `EPOCH`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateVector {
    pub comments: Vec<String>,
    pub epoch: Option<Epoch>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub x_dot: Option<f64>,
    pub y_dot: Option<f64>,
    pub z_dot: Option<f64>,
}

commented!(StateVector);

approx_struct!(StateVector {
    comments,
    epoch,
    x,
    y,
    z,
    x_dot,
    y_dot,
    z_dot,
});

impl StateVector {
    fn component(&mut self, key: StateVectorKey) -> Option<(&mut Option<f64>, Unit)> {
        match key {
            StateVectorKey::Epoch => None,
            StateVectorKey::X => Some((&mut self.x, KM)),
            StateVectorKey::Y => Some((&mut self.y, KM)),
            StateVectorKey::Z => Some((&mut self.z, KM)),
            StateVectorKey::XDot => Some((&mut self.x_dot, KM_S)),
            StateVectorKey::YDot => Some((&mut self.y_dot, KM_S)),
            StateVectorKey::ZDot => Some((&mut self.z_dot, KM_S)),
        }
    }

    fn components(&self) -> [(StateVectorKey, Option<f64>, Unit); 6] {
        [
            (StateVectorKey::X, self.x, KM),
            (StateVectorKey::Y, self.y, KM),
            (StateVectorKey::Z, self.z, KM),
            (StateVectorKey::XDot, self.x_dot, KM_S),
            (StateVectorKey::YDot, self.y_dot, KM_S),
            (StateVectorKey::ZDot, self.z_dot, KM_S),
        ]
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            generator.write_epoch(StateVectorKey::Epoch.keyword(), self.epoch.as_ref(), true)?;
            for (key, value, unit) in self.components() {
                generator.write_f64(key.keyword(), value, &unit, true)?;
            }
            Ok(())
        })
    }
}

impl Block for StateVector {
    type Key = StateVectorKey;
    const NAME: &'static str = "stateVector";

    fn lookup(keyword: &str) -> Option<StateVectorKey> {
        StateVectorKey::from_keyword(keyword)
    }

    fn set(&mut self, key: StateVectorKey, token: &Token) -> Result<()> {
        match self.component(key) {
            Some((field, unit)) => *field = Some(token.content_as_f64(&unit)?),
            None => self.epoch = Some(token.content_as_epoch()?),
        }
        Ok(())
    }
}

impl Validate for StateVector {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.epoch, source, "EPOCH", Self::NAME)?;
        for (key, value, _) in self.components() {
            mandatory(&value, source, key.keyword(), Self::NAME)?;
        }
        Ok(())
    }
}

keywords! {
    pub enum KeplerianKey {
        SemiMajorAxis => "SEMI_MAJOR_AXIS",
        Eccentricity => "ECCENTRICITY",
        Inclination => "INCLINATION",
        RaOfAscNode => "RA_OF_ASC_NODE",
        ArgOfPericenter => "ARG_OF_PERICENTER",
        TrueAnomaly => "TRUE_ANOMALY",
        MeanAnomaly => "MEAN_ANOMALY",
        Gm => "GM",
    }
}

impl KeplerianKey {
    fn unit(self) -> Unit {
        match self {
            KeplerianKey::SemiMajorAxis => KM,
            KeplerianKey::Eccentricity => ONE,
            KeplerianKey::Gm => KM3_S2,
            _ => DEG,
        }
    }
}

/// Osculating Keplerian elements. Exactly one of the two anomalies is expected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeplerianElements {
    pub comments: Vec<String>,
    pub semi_major_axis: Option<f64>,
    pub eccentricity: Option<f64>,
    pub inclination: Option<f64>,
    pub ra_of_asc_node: Option<f64>,
    pub arg_of_pericenter: Option<f64>,
    pub true_anomaly: Option<f64>,
    pub mean_anomaly: Option<f64>,
    pub gm: Option<f64>,
}

commented!(KeplerianElements);

approx_struct!(KeplerianElements {
    comments,
    semi_major_axis,
    eccentricity,
    inclination,
    ra_of_asc_node,
    arg_of_pericenter,
    true_anomaly,
    mean_anomaly,
    gm,
});

impl KeplerianElements {
    fn field(&mut self, key: KeplerianKey) -> &mut Option<f64> {
        match key {
            KeplerianKey::SemiMajorAxis => &mut self.semi_major_axis,
            KeplerianKey::Eccentricity => &mut self.eccentricity,
            KeplerianKey::Inclination => &mut self.inclination,
            KeplerianKey::RaOfAscNode => &mut self.ra_of_asc_node,
            KeplerianKey::ArgOfPericenter => &mut self.arg_of_pericenter,
            KeplerianKey::TrueAnomaly => &mut self.true_anomaly,
            KeplerianKey::MeanAnomaly => &mut self.mean_anomaly,
            KeplerianKey::Gm => &mut self.gm,
        }
    }

    fn get(&self, key: KeplerianKey) -> Option<f64> {
        match key {
            KeplerianKey::SemiMajorAxis => self.semi_major_axis,
            KeplerianKey::Eccentricity => self.eccentricity,
            KeplerianKey::Inclination => self.inclination,
            KeplerianKey::RaOfAscNode => self.ra_of_asc_node,
            KeplerianKey::ArgOfPericenter => self.arg_of_pericenter,
            KeplerianKey::TrueAnomaly => self.true_anomaly,
            KeplerianKey::MeanAnomaly => self.mean_anomaly,
            KeplerianKey::Gm => self.gm,
        }
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            for &key in KeplerianKey::ALL {
                let anomaly = matches!(key, KeplerianKey::TrueAnomaly | KeplerianKey::MeanAnomaly);
                generator.write_f64(key.keyword(), self.get(key), &key.unit(), !anomaly)?;
            }
            Ok(())
        })
    }
}

impl Block for KeplerianElements {
    type Key = KeplerianKey;
    const NAME: &'static str = "keplerianElements";

    fn lookup(keyword: &str) -> Option<KeplerianKey> {
        KeplerianKey::from_keyword(keyword)
    }

    fn set(&mut self, key: KeplerianKey, token: &Token) -> Result<()> {
        *self.field(key) = Some(token.content_as_f64(&key.unit())?);
        Ok(())
    }
}

impl Validate for KeplerianElements {
    fn validate(&self, source: &str) -> Result<()> {
        for &key in KeplerianKey::ALL {
            match key {
                KeplerianKey::TrueAnomaly | KeplerianKey::MeanAnomaly => {}
                _ => mandatory(&self.get(key), source, key.keyword(), Self::NAME)?,
            }
        }
        if self.true_anomaly.is_none() && self.mean_anomaly.is_none() {
            return Err(Error::missing_keyword(source, "TRUE_ANOMALY", Self::NAME));
        }
        Ok(())
    }
}

keywords! {
    pub enum ManeuverKey {
        ManEpochIgnition => "MAN_EPOCH_IGNITION",
        ManDuration => "MAN_DURATION",
        ManDeltaMass => "MAN_DELTA_MASS",
        ManRefFrame => "MAN_REF_FRAME",
        ManDv1 => "MAN_DV_1",
        ManDv2 => "MAN_DV_2",
        ManDv3 => "MAN_DV_3",
    }
}

/// One impulsive maneuver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Maneuver {
    pub comments: Vec<String>,
    pub epoch_ignition: Option<Epoch>,
    pub duration: Option<f64>,
    pub delta_mass: Option<f64>,
    pub ref_frame: Option<String>,
    pub dv: [Option<f64>; 3],
}

commented!(Maneuver);

approx_struct!(Maneuver {
    comments,
    epoch_ignition,
    duration,
    delta_mass,
    ref_frame,
    dv,
});

impl Block for Maneuver {
    type Key = ManeuverKey;
    const NAME: &'static str = "maneuverParameters";

    fn lookup(keyword: &str) -> Option<ManeuverKey> {
        ManeuverKey::from_keyword(keyword)
    }

    fn set(&mut self, key: ManeuverKey, token: &Token) -> Result<()> {
        match key {
            ManeuverKey::ManEpochIgnition => self.epoch_ignition = Some(token.content_as_epoch()?),
            ManeuverKey::ManDuration => self.duration = Some(token.content_as_f64(&S)?),
            ManeuverKey::ManDeltaMass => self.delta_mass = Some(token.content_as_f64(&KG)?),
            ManeuverKey::ManRefFrame => self.ref_frame = Some(token.content_as_string()),
            ManeuverKey::ManDv1 => self.dv[0] = Some(token.content_as_f64(&KM_S)?),
            ManeuverKey::ManDv2 => self.dv[1] = Some(token.content_as_f64(&KM_S)?),
            ManeuverKey::ManDv3 => self.dv[2] = Some(token.content_as_f64(&KM_S)?),
        }
        Ok(())
    }
}

impl Maneuver {
    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            generator.write_epoch(ManeuverKey::ManEpochIgnition.keyword(), self.epoch_ignition.as_ref(), true)?;
            generator.write_f64(ManeuverKey::ManDuration.keyword(), self.duration, &S, true)?;
            generator.write_f64(ManeuverKey::ManDeltaMass.keyword(), self.delta_mass, &KG, true)?;
            generator.write_string(ManeuverKey::ManRefFrame.keyword(), self.ref_frame.as_deref(), true)?;
            let dv = [ManeuverKey::ManDv1, ManeuverKey::ManDv2, ManeuverKey::ManDv3];
            for (key, value) in dv.iter().zip(self.dv) {
                generator.write_f64(key.keyword(), value, &KM_S, true)?;
            }
            Ok(())
        })
    }
}

impl Validate for Maneuver {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.epoch_ignition, source, "MAN_EPOCH_IGNITION", Self::NAME)?;
        mandatory(&self.duration, source, "MAN_DURATION", Self::NAME)?;
        mandatory(&self.delta_mass, source, "MAN_DELTA_MASS", Self::NAME)?;
        mandatory(&self.ref_frame, source, "MAN_REF_FRAME", Self::NAME)?;
        for (i, dv) in self.dv.iter().enumerate() {
            mandatory(dv, source, &format!("MAN_DV_{}", i + 1), Self::NAME)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpmData {
    pub state_vector: StateVector,
    pub keplerian_elements: Option<KeplerianElements>,
    pub spacecraft_parameters: Option<SpacecraftParameters>,
    pub covariance: Option<CartesianCovariance>,
    pub maneuvers: Vec<Maneuver>,
    pub user_defined: Option<UserDefined>,
}

approx_struct!(OpmData {
    state_vector,
    keplerian_elements,
    spacecraft_parameters,
    covariance,
    maneuvers,
    user_defined,
});

impl Validate for OpmData {
    fn validate(&self, source: &str) -> Result<()> {
        self.state_vector.validate(source)?;
        if let Some(elements) = &self.keplerian_elements {
            elements.validate(source)?;
        }
        if let Some(covariance) = &self.covariance {
            covariance.validate(source)?;
        }
        for maneuver in &self.maneuvers {
            maneuver.validate(source)?;
        }
        Ok(())
    }
}

impl OpmData {
    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        self.state_vector.write(generator)?;
        if let Some(elements) = &self.keplerian_elements {
            elements.write(generator)?;
        }
        if let Some(parameters) = &self.spacecraft_parameters {
            parameters.write(generator)?;
        }
        if let Some(covariance) = &self.covariance {
            covariance.write(generator)?;
        }
        for maneuver in &self.maneuvers {
            maneuver.write(generator)?;
        }
        if let Some(user_defined) = &self.user_defined {
            user_defined.write(generator)?;
        }
        Ok(())
    }
}

const BLOCKS: &[&str] = &[
    StateVector::NAME,
    KeplerianElements::NAME,
    SpacecraftParameters::NAME,
    CartesianCovariance::NAME,
    Maneuver::NAME,
    UserDefined::NAME,
];

pub struct OpmDataParser {
    router: BlockRouter,
    state_vector: Option<Builder<StateVector>>,
    keplerian_elements: Option<Builder<KeplerianElements>>,
    spacecraft_parameters: Option<Builder<SpacecraftParameters>>,
    covariance: Option<Builder<CartesianCovariance>>,
    maneuver: Option<Builder<Maneuver>>,
    maneuvers: Vec<Maneuver>,
    user_defined: Option<Builder<UserDefined>>,
}

impl OpmDataParser {
    pub fn new(syntax: Syntax) -> Self {
        OpmDataParser {
            router: BlockRouter::new(syntax),
            state_vector: None,
            keplerian_elements: None,
            spacecraft_parameters: None,
            covariance: None,
            maneuver: None,
            maneuvers: Vec::new(),
            user_defined: None,
        }
    }

    fn close_maneuver(&mut self) {
        if let Some(maneuver) = self.maneuver.take() {
            self.maneuvers.push(maneuver.into_inner());
        }
    }
}

impl DataParser for OpmDataParser {
    type Output = OpmData;

    fn process(&mut self, token: &Token) -> Result<bool> {
        if token.is_comment() {
            self.router.comment(token);
            return Ok(true);
        }
        if !token.is_entry() {
            let maneuver = token.name == Maneuver::NAME;
            if maneuver && token.is_start() {
                self.close_maneuver();
            }
            let handled = self.router.section(token, BLOCKS)?;
            if handled && maneuver && token.is_stop() {
                self.close_maneuver();
            }
            return Ok(handled);
        }

        let next_maneuver = token.name == ManeuverKey::ManEpochIgnition.keyword()
            && self
                .maneuver
                .as_ref()
                .map_or(false, |m| m.get().epoch_ignition.is_some());
        if next_maneuver {
            self.close_maneuver();
        }

        Ok(self.router.route(&mut self.state_vector, token)?
            || self.router.route(&mut self.keplerian_elements, token)?
            || self.router.route(&mut self.spacecraft_parameters, token)?
            || self.router.route(&mut self.covariance, token)?
            || self.router.route(&mut self.maneuver, token)?
            || self.router.route(&mut self.user_defined, token)?)
    }

    fn finish(mut self) -> Result<OpmData> {
        self.router.finish()?;
        self.close_maneuver();
        Ok(OpmData {
            state_vector: self.state_vector.map(Builder::into_inner).unwrap_or_default(),
            keplerian_elements: self.keplerian_elements.map(Builder::into_inner),
            spacecraft_parameters: self.spacecraft_parameters.map(Builder::into_inner),
            covariance: self.covariance.map(Builder::into_inner),
            maneuvers: self.maneuvers,
            user_defined: self.user_defined.map(Builder::into_inner),
        })
    }
}

impl MessageKind for Opm {
    type Metadata = OpmMetadata;
    type Data = OpmData;
    type DataParser = OpmDataParser;

    const NAME: &'static str = "OPM";
    const ROOT: &'static str = "opm";
    const VERSION_KEY: &'static str = "CCSDS_OPM_VERS";
    const DEFAULT_VERSION: f64 = 3.0;
    const HEADER_ID_VERSION: f64 = 3.0;
    const KVN_METADATA_MARKERS: bool = false;
    const KVN_DATA_MARKERS: bool = false;
    const MULTI_SEGMENT: bool = false;

    fn process_metadata(metadata: &mut Builder<OpmMetadata>, token: &Token) -> Result<bool> {
        if OdmCommonKey::from_keyword(&token.name).is_none() {
            return Ok(false);
        }
        metadata.fields().common.process(token)
    }

    fn data_parser(_metadata: &OpmMetadata, syntax: Syntax) -> OpmDataParser {
        OpmDataParser::new(syntax)
    }

    fn write_metadata(generator: &mut dyn Generator, metadata: &OpmMetadata) -> Result<()> {
        metadata.common.write(generator)
    }

    fn write_data(generator: &mut dyn Generator, _metadata: &OpmMetadata, data: &OpmData) -> Result<()> {
        data.write(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, value: &str, line: usize) -> Token {
        Token::entry(name, value, None, line, "opm")
    }

    #[test]
    fn test_kvn_maneuvers_split_on_ignition_epoch() {
        let mut parser = OpmDataParser::new(Syntax::Kvn);
        let tokens = [
            entry("EPOCH", "2000-01-01T00:00:00", 1),
            entry("COMMENT", "first burn", 2),
            entry("MAN_EPOCH_IGNITION", "2000-01-02T00:00:00", 3),
            entry("MAN_DURATION", "10.0", 4),
            entry("COMMENT", "second burn", 5),
            entry("MAN_EPOCH_IGNITION", "2000-01-03T00:00:00", 6),
        ];
        for token in &tokens {
            assert!(parser.process(token).unwrap());
        }
        let data = parser.finish().unwrap();
        assert_eq!(data.maneuvers.len(), 2);
        assert_eq!(data.maneuvers[0].comments, vec!["first burn"]);
        assert_eq!(data.maneuvers[1].comments, vec!["second burn"]);
        assert_eq!(data.maneuvers[0].duration, Some(10.0));
    }

    #[test]
    fn test_xml_entries_outside_their_block() {
        let mut parser = OpmDataParser::new(Syntax::Xml);
        assert!(parser.process(&Token::start("stateVector", 1, "opm")).unwrap());
        assert!(parser.process(&entry("X", "1.0", 2)).unwrap());
        assert!(!parser.process(&entry("MASS", "1.0", 3)).unwrap());
        assert!(!parser.process(&Token::start("keplerianElements", 4, "opm")).unwrap());
    }

    #[test]
    fn test_one_anomaly_required() {
        let mut elements = KeplerianElements {
            semi_major_axis: Some(7.0e6),
            eccentricity: Some(0.01),
            inclination: Some(0.5),
            ra_of_asc_node: Some(0.1),
            arg_of_pericenter: Some(0.2),
            gm: Some(3.986e14),
            ..Default::default()
        };
        assert!(elements.validate("opm").is_err());
        elements.mean_anomaly = Some(1.0);
        assert!(elements.validate("opm").is_ok());
    }
}
