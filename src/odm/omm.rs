//! Orbit Mean-elements Message.
//!
//! Mean orbital elements of one object, typically the content of a
//! two-line element set when `MEAN_ELEMENT_THEORY` is `SGP/SGP4`.

use super::{CartesianCovariance, OdmCommon, OdmCommonKey, SpacecraftParameters, UserDefined};
use crate::container::{mandatory, Block, BlockRouter, Builder, Validate};
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::message::{DataParser, MessageKind};
use crate::options::Syntax;
use crate::time::Epoch;
use crate::token::Token;
use crate::units::{Unit, DEG, ER_INV, KM, KM3_S2, ONE, REV_DAY, REV_DAY2, REV_DAY3};
use crate::writer::write_block;
use serde::{Deserialize, Serialize};

/// Marker type of the OMM grammar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Omm;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OmmMetadata {
    pub comments: Vec<String>,
    pub common: OdmCommon,
    pub mean_element_theory: Option<String>,
}

commented!(OmmMetadata);

approx_struct!(OmmMetadata {
    comments,
    common,
    mean_element_theory,
});

const MEAN_ELEMENT_THEORY: &str = "MEAN_ELEMENT_THEORY";

impl Validate for OmmMetadata {
    fn validate(&self, source: &str) -> Result<()> {
        self.common.validate(source)?;
        mandatory(&self.mean_element_theory, source, MEAN_ELEMENT_THEORY, "metadata")
    }
}

keywords! {
    pub enum MeanElementsKey {
        Epoch => "EPOCH",
        SemiMajorAxis => "SEMI_MAJOR_AXIS",
        MeanMotion => "MEAN_MOTION",
        Eccentricity => "ECCENTRICITY",
        Inclination => "INCLINATION",
        RaOfAscNode => "RA_OF_ASC_NODE",
        ArgOfPericenter => "ARG_OF_PERICENTER",
        MeanAnomaly => "MEAN_ANOMALY",
        Gm => "GM",
    }
}

impl MeanElementsKey {
    fn unit(self) -> Unit {
        match self {
            MeanElementsKey::SemiMajorAxis => KM,
            MeanElementsKey::MeanMotion => REV_DAY,
            MeanElementsKey::Eccentricity | MeanElementsKey::Epoch => ONE,
            MeanElementsKey::Gm => KM3_S2,
            _ => DEG,
        }
    }
}

/// Mean Keplerian elements. The orbit size is given either as
/// `SEMI_MAJOR_AXIS` or as `MEAN_MOTION`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeanElements {
    pub comments: Vec<String>,
    pub epoch: Option<Epoch>,
    pub semi_major_axis: Option<f64>,
    pub mean_motion: Option<f64>,
    pub eccentricity: Option<f64>,
    pub inclination: Option<f64>,
    pub ra_of_asc_node: Option<f64>,
    pub arg_of_pericenter: Option<f64>,
    pub mean_anomaly: Option<f64>,
    pub gm: Option<f64>,
}

commented!(MeanElements);

approx_struct!(MeanElements {
    comments,
    epoch,
    semi_major_axis,
    mean_motion,
    eccentricity,
    inclination,
    ra_of_asc_node,
    arg_of_pericenter,
    mean_anomaly,
    gm,
});

impl MeanElements {
    fn field(&mut self, key: MeanElementsKey) -> Option<&mut Option<f64>> {
        match key {
            MeanElementsKey::Epoch => None,
            MeanElementsKey::SemiMajorAxis => Some(&mut self.semi_major_axis),
            MeanElementsKey::MeanMotion => Some(&mut self.mean_motion),
            MeanElementsKey::Eccentricity => Some(&mut self.eccentricity),
            MeanElementsKey::Inclination => Some(&mut self.inclination),
            MeanElementsKey::RaOfAscNode => Some(&mut self.ra_of_asc_node),
            MeanElementsKey::ArgOfPericenter => Some(&mut self.arg_of_pericenter),
            MeanElementsKey::MeanAnomaly => Some(&mut self.mean_anomaly),
            MeanElementsKey::Gm => Some(&mut self.gm),
        }
    }

    fn angles(&self) -> [(MeanElementsKey, Option<f64>); 5] {
        [
            (MeanElementsKey::Eccentricity, self.eccentricity),
            (MeanElementsKey::Inclination, self.inclination),
            (MeanElementsKey::RaOfAscNode, self.ra_of_asc_node),
            (MeanElementsKey::ArgOfPericenter, self.arg_of_pericenter),
            (MeanElementsKey::MeanAnomaly, self.mean_anomaly),
        ]
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            generator.write_epoch(MeanElementsKey::Epoch.keyword(), self.epoch.as_ref(), true)?;
            if self.mean_motion.is_some() {
                let key = MeanElementsKey::MeanMotion;
                generator.write_f64(key.keyword(), self.mean_motion, &key.unit(), true)?;
            } else {
                let key = MeanElementsKey::SemiMajorAxis;
                generator.write_f64(key.keyword(), self.semi_major_axis, &key.unit(), true)?;
            }
            for (key, value) in self.angles() {
                generator.write_f64(key.keyword(), value, &key.unit(), true)?;
            }
            let key = MeanElementsKey::Gm;
            generator.write_f64(key.keyword(), self.gm, &key.unit(), false)
        })
    }
}

impl Block for MeanElements {
    type Key = MeanElementsKey;
    const NAME: &'static str = "meanElements";

    fn lookup(keyword: &str) -> Option<MeanElementsKey> {
        MeanElementsKey::from_keyword(keyword)
    }

    fn set(&mut self, key: MeanElementsKey, token: &Token) -> Result<()> {
        match self.field(key) {
            Some(field) => *field = Some(token.content_as_f64(&key.unit())?),
            None => self.epoch = Some(token.content_as_epoch()?),
        }
        Ok(())
    }
}

impl Validate for MeanElements {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.epoch, source, "EPOCH", Self::NAME)?;
        if self.semi_major_axis.is_none() && self.mean_motion.is_none() {
            return Err(Error::missing_keyword(source, "MEAN_MOTION", Self::NAME));
        }
        for (key, value) in self.angles() {
            mandatory(&value, source, key.keyword(), Self::NAME)?;
        }
        Ok(())
    }
}

keywords! {
    pub enum TleKey {
        EphemerisType => "EPHEMERIS_TYPE",
        ClassificationType => "CLASSIFICATION_TYPE",
        NoradCatId => "NORAD_CAT_ID",
        ElementSetNo => "ELEMENT_SET_NO",
        RevAtEpoch => "REV_AT_EPOCH",
        Bstar => "BSTAR",
        MeanMotionDot => "MEAN_MOTION_DOT",
        MeanMotionDdot => "MEAN_MOTION_DDOT",
    }
}

/// Two-line element set parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TleParameters {
    pub comments: Vec<String>,
    pub ephemeris_type: Option<i32>,
    pub classification_type: Option<String>,
    pub norad_cat_id: Option<u32>,
    pub element_set_no: Option<u32>,
    pub rev_at_epoch: Option<u32>,
    pub bstar: Option<f64>,
    pub mean_motion_dot: Option<f64>,
    pub mean_motion_ddot: Option<f64>,
}

commented!(TleParameters);

approx_struct!(TleParameters {
    comments,
    ephemeris_type,
    classification_type,
    norad_cat_id,
    element_set_no,
    rev_at_epoch,
    bstar,
    mean_motion_dot,
    mean_motion_ddot,
});

impl Block for TleParameters {
    type Key = TleKey;
    const NAME: &'static str = "tleParameters";

    fn lookup(keyword: &str) -> Option<TleKey> {
        TleKey::from_keyword(keyword)
    }

    fn set(&mut self, key: TleKey, token: &Token) -> Result<()> {
        match key {
            TleKey::EphemerisType => self.ephemeris_type = Some(token.content_as_int()?),
            TleKey::ClassificationType => self.classification_type = Some(token.content_as_string()),
            TleKey::NoradCatId => self.norad_cat_id = Some(token.content_as_int()?),
            TleKey::ElementSetNo => self.element_set_no = Some(token.content_as_int()?),
            TleKey::RevAtEpoch => self.rev_at_epoch = Some(token.content_as_int()?),
            TleKey::Bstar => self.bstar = Some(token.content_as_f64(&ER_INV)?),
            TleKey::MeanMotionDot => self.mean_motion_dot = Some(token.content_as_f64(&REV_DAY2)?),
            TleKey::MeanMotionDdot => self.mean_motion_ddot = Some(token.content_as_f64(&REV_DAY3)?),
        }
        Ok(())
    }
}

impl TleParameters {
    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            generator.write_int(TleKey::EphemerisType.keyword(), self.ephemeris_type.map(i64::from), false)?;
            generator.write_string(TleKey::ClassificationType.keyword(), self.classification_type.as_deref(), false)?;
            generator.write_int(TleKey::NoradCatId.keyword(), self.norad_cat_id.map(i64::from), false)?;
            generator.write_int(TleKey::ElementSetNo.keyword(), self.element_set_no.map(i64::from), false)?;
            generator.write_int(TleKey::RevAtEpoch.keyword(), self.rev_at_epoch.map(i64::from), false)?;
            generator.write_f64(TleKey::Bstar.keyword(), self.bstar, &ER_INV, true)?;
            generator.write_f64(TleKey::MeanMotionDot.keyword(), self.mean_motion_dot, &REV_DAY2, true)?;
            generator.write_f64(TleKey::MeanMotionDdot.keyword(), self.mean_motion_ddot, &REV_DAY3, true)
        })
    }
}

impl Validate for TleParameters {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.bstar, source, "BSTAR", Self::NAME)?;
        mandatory(&self.mean_motion_dot, source, "MEAN_MOTION_DOT", Self::NAME)?;
        mandatory(&self.mean_motion_ddot, source, "MEAN_MOTION_DDOT", Self::NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OmmData {
    pub mean_elements: MeanElements,
    pub spacecraft_parameters: Option<SpacecraftParameters>,
    pub tle_parameters: Option<TleParameters>,
    pub covariance: Option<CartesianCovariance>,
    pub user_defined: Option<UserDefined>,
}

approx_struct!(OmmData {
    mean_elements,
    spacecraft_parameters,
    tle_parameters,
    covariance,
    user_defined,
});

impl Validate for OmmData {
    fn validate(&self, source: &str) -> Result<()> {
        self.mean_elements.validate(source)?;
        if let Some(tle) = &self.tle_parameters {
            tle.validate(source)?;
        }
        if let Some(covariance) = &self.covariance {
            covariance.validate(source)?;
        }
        Ok(())
    }
}

const BLOCKS: &[&str] = &[
    MeanElements::NAME,
    SpacecraftParameters::NAME,
    TleParameters::NAME,
    CartesianCovariance::NAME,
    UserDefined::NAME,
];

pub struct OmmDataParser {
    router: BlockRouter,
    mean_elements: Option<Builder<MeanElements>>,
    spacecraft_parameters: Option<Builder<SpacecraftParameters>>,
    tle_parameters: Option<Builder<TleParameters>>,
    covariance: Option<Builder<CartesianCovariance>>,
    user_defined: Option<Builder<UserDefined>>,
}

impl OmmDataParser {
    pub fn new(syntax: Syntax) -> Self {
        OmmDataParser {
            router: BlockRouter::new(syntax),
            mean_elements: None,
            spacecraft_parameters: None,
            tle_parameters: None,
            covariance: None,
            user_defined: None,
        }
    }
}

impl DataParser for OmmDataParser {
    type Output = OmmData;

    fn process(&mut self, token: &Token) -> Result<bool> {
        if token.is_comment() {
            self.router.comment(token);
            return Ok(true);
        }
        if !token.is_entry() {
            return self.router.section(token, BLOCKS);
        }
        Ok(self.router.route(&mut self.mean_elements, token)?
            || self.router.route(&mut self.spacecraft_parameters, token)?
            || self.router.route(&mut self.tle_parameters, token)?
            || self.router.route(&mut self.covariance, token)?
            || self.router.route(&mut self.user_defined, token)?)
    }

    fn finish(mut self) -> Result<OmmData> {
        self.router.finish()?;
        Ok(OmmData {
            mean_elements: self.mean_elements.map(Builder::into_inner).unwrap_or_default(),
            spacecraft_parameters: self.spacecraft_parameters.map(Builder::into_inner),
            tle_parameters: self.tle_parameters.map(Builder::into_inner),
            covariance: self.covariance.map(Builder::into_inner),
            user_defined: self.user_defined.map(Builder::into_inner),
        })
    }
}

impl MessageKind for Omm {
    type Metadata = OmmMetadata;
    type Data = OmmData;
    type DataParser = OmmDataParser;

    const NAME: &'static str = "OMM";
    const ROOT: &'static str = "omm";
    const VERSION_KEY: &'static str = "CCSDS_OMM_VERS";
    const DEFAULT_VERSION: f64 = 3.0;
    const HEADER_ID_VERSION: f64 = 3.0;
    const KVN_METADATA_MARKERS: bool = false;
    const KVN_DATA_MARKERS: bool = false;
    const MULTI_SEGMENT: bool = false;

    fn process_metadata(metadata: &mut Builder<OmmMetadata>, token: &Token) -> Result<bool> {
        if token.name == MEAN_ELEMENT_THEORY {
            metadata.fields().mean_element_theory = Some(token.content_as_string());
            return Ok(true);
        }
        if OdmCommonKey::from_keyword(&token.name).is_none() {
            return Ok(false);
        }
        metadata.fields().common.process(token)
    }

    fn data_parser(_metadata: &OmmMetadata, syntax: Syntax) -> OmmDataParser {
        OmmDataParser::new(syntax)
    }

    fn write_metadata(generator: &mut dyn Generator, metadata: &OmmMetadata) -> Result<()> {
        metadata.common.write(generator)?;
        generator.write_string(MEAN_ELEMENT_THEORY, metadata.mean_element_theory.as_deref(), true)
    }

    fn write_data(generator: &mut dyn Generator, _metadata: &OmmMetadata, data: &OmmData) -> Result<()> {
        data.mean_elements.write(generator)?;
        if let Some(parameters) = &data.spacecraft_parameters {
            parameters.write(generator)?;
        }
        if let Some(tle) = &data.tle_parameters {
            tle.write(generator)?;
        }
        if let Some(covariance) = &data.covariance {
            covariance.write(generator)?;
        }
        if let Some(user_defined) = &data.user_defined {
            user_defined.write(generator)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn test_mean_motion_in_si() {
        let mut elements = MeanElements::default();
        let token = Token::entry("MEAN_MOTION", "1.0", None, 12, "omm");
        elements.set(MeanElementsKey::MeanMotion, &token).unwrap();
        let expected = TAU / 86400.0;
        assert!((elements.mean_motion.unwrap() - expected).abs() < 1e-18);
    }

    #[test]
    fn test_tle_mandatory_terms() {
        let tle = TleParameters {
            bstar: Some(1.0e-4),
            ..Default::default()
        };
        match tle.validate("omm") {
            Err(Error::MissingKeyword { keyword, container, .. }) => {
                assert_eq!(keyword, "MEAN_MOTION_DOT");
                assert_eq!(container, "tleParameters");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
