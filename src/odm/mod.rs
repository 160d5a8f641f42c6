//! Orbit data messages: OPM, OMM, OEM and OCM.
//!
//! This module holds the containers shared between them: the common
//! metadata, spacecraft parameters, the position/velocity covariance, and
//! user-defined parameters.

pub mod ocm;
pub mod oem;
pub mod omm;
pub mod opm;

use crate::container::{mandatory, Block, Validate};
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::time::{Epoch, TimeSystem};
use crate::token::Token;
use crate::units::{Unit, KG, KM2, KM2_S, KM2_S2, M2, ONE};
use crate::writer::write_block;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

keywords! {
    /// Metadata keywords shared by OPM, OMM and OEM.
    pub enum OdmCommonKey {
        ObjectName => "OBJECT_NAME",
        ObjectId => "OBJECT_ID",
        CenterName => "CENTER_NAME",
        RefFrame => "REF_FRAME",
        RefFrameEpoch => "REF_FRAME_EPOCH",
        TimeSystem => "TIME_SYSTEM",
    }
}

/// Metadata fields shared by OPM, OMM and OEM.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OdmCommon {
    pub object_name: Option<String>,
    pub object_id: Option<String>,
    pub center_name: Option<String>,
    pub ref_frame: Option<String>,
    pub ref_frame_epoch: Option<Epoch>,
    pub time_system: Option<TimeSystem>,
}

approx_struct!(OdmCommon {
    object_name,
    object_id,
    center_name,
    ref_frame,
    ref_frame_epoch,
    time_system,
});

impl OdmCommon {
    /// Sets the field of `token` if it is a common keyword.
    pub(crate) fn process(&mut self, token: &Token) -> Result<bool> {
        let key = match OdmCommonKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        match key {
            OdmCommonKey::ObjectName => self.object_name = Some(token.content_as_string()),
            OdmCommonKey::ObjectId => self.object_id = Some(token.content_as_string()),
            OdmCommonKey::CenterName => self.center_name = Some(token.content_as_string()),
            OdmCommonKey::RefFrame => self.ref_frame = Some(token.content_as_string()),
            OdmCommonKey::RefFrameEpoch => self.ref_frame_epoch = Some(token.content_as_epoch()?),
            OdmCommonKey::TimeSystem => self.time_system = Some(token.content_as_enum()?),
        }
        Ok(true)
    }

    pub(crate) fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        generator.write_string(OdmCommonKey::ObjectName.keyword(), self.object_name.as_deref(), true)?;
        generator.write_string(OdmCommonKey::ObjectId.keyword(), self.object_id.as_deref(), true)?;
        generator.write_string(OdmCommonKey::CenterName.keyword(), self.center_name.as_deref(), true)?;
        generator.write_string(OdmCommonKey::RefFrame.keyword(), self.ref_frame.as_deref(), true)?;
        generator.write_epoch(OdmCommonKey::RefFrameEpoch.keyword(), self.ref_frame_epoch.as_ref(), false)?;
        let time_system = self.time_system.map(|t| t.to_string());
        generator.write_string(OdmCommonKey::TimeSystem.keyword(), time_system.as_deref(), true)
    }

    pub(crate) fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.object_name, source, "OBJECT_NAME", "metadata")?;
        mandatory(&self.object_id, source, "OBJECT_ID", "metadata")?;
        mandatory(&self.center_name, source, "CENTER_NAME", "metadata")?;
        mandatory(&self.ref_frame, source, "REF_FRAME", "metadata")?;
        mandatory(&self.time_system, source, "TIME_SYSTEM", "metadata")
    }
}

keywords! {
    pub enum SpacecraftKey {
        Mass => "MASS",
        SolarRadArea => "SOLAR_RAD_AREA",
        SolarRadCoeff => "SOLAR_RAD_COEFF",
        DragArea => "DRAG_AREA",
        DragCoeff => "DRAG_COEFF",
    }
}

/// Spacecraft parameters of OPM and OMM.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpacecraftParameters {
    pub comments: Vec<String>,
    pub mass: Option<f64>,
    pub solar_rad_area: Option<f64>,
    pub solar_rad_coeff: Option<f64>,
    pub drag_area: Option<f64>,
    pub drag_coeff: Option<f64>,
}

commented!(SpacecraftParameters);

approx_struct!(SpacecraftParameters {
    comments,
    mass,
    solar_rad_area,
    solar_rad_coeff,
    drag_area,
    drag_coeff,
});

impl SpacecraftKey {
    fn unit(self) -> Unit {
        match self {
            SpacecraftKey::Mass => KG,
            SpacecraftKey::SolarRadArea | SpacecraftKey::DragArea => M2,
            SpacecraftKey::SolarRadCoeff | SpacecraftKey::DragCoeff => ONE,
        }
    }
}

impl Block for SpacecraftParameters {
    type Key = SpacecraftKey;
    const NAME: &'static str = "spacecraftParameters";

    fn lookup(keyword: &str) -> Option<SpacecraftKey> {
        SpacecraftKey::from_keyword(keyword)
    }

    fn set(&mut self, key: SpacecraftKey, token: &Token) -> Result<()> {
        let value = Some(token.content_as_f64(&key.unit())?);
        match key {
            SpacecraftKey::Mass => self.mass = value,
            SpacecraftKey::SolarRadArea => self.solar_rad_area = value,
            SpacecraftKey::SolarRadCoeff => self.solar_rad_coeff = value,
            SpacecraftKey::DragArea => self.drag_area = value,
            SpacecraftKey::DragCoeff => self.drag_coeff = value,
        }
        Ok(())
    }
}

impl SpacecraftParameters {
    fn get(&self, key: SpacecraftKey) -> Option<f64> {
        match key {
            SpacecraftKey::Mass => self.mass,
            SpacecraftKey::SolarRadArea => self.solar_rad_area,
            SpacecraftKey::SolarRadCoeff => self.solar_rad_coeff,
            SpacecraftKey::DragArea => self.drag_area,
            SpacecraftKey::DragCoeff => self.drag_coeff,
        }
    }

    pub(crate) fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| {
            for &key in SpacecraftKey::ALL {
                generator.write_f64(key.keyword(), self.get(key), &key.unit(), false)?;
            }
            Ok(())
        })
    }
}

keywords! {
    /// Keywords of the position/velocity covariance, terms in lower triangular order.
    pub enum CovarianceKey {
        CovRefFrame => "COV_REF_FRAME",
        CxX => "CX_X",
        CyX => "CY_X",
        CyY => "CY_Y",
        CzX => "CZ_X",
        CzY => "CZ_Y",
        CzZ => "CZ_Z",
        CxDotX => "CX_DOT_X",
        CxDotY => "CX_DOT_Y",
        CxDotZ => "CX_DOT_Z",
        CxDotXDot => "CX_DOT_X_DOT",
        CyDotX => "CY_DOT_X",
        CyDotY => "CY_DOT_Y",
        CyDotZ => "CY_DOT_Z",
        CyDotXDot => "CY_DOT_X_DOT",
        CyDotYDot => "CY_DOT_Y_DOT",
        CzDotX => "CZ_DOT_X",
        CzDotY => "CZ_DOT_Y",
        CzDotZ => "CZ_DOT_Z",
        CzDotXDot => "CZ_DOT_X_DOT",
        CzDotYDot => "CZ_DOT_Y_DOT",
        CzDotZDot => "CZ_DOT_Z_DOT",
    }
}

/// Number of terms in the lower triangle of a 6x6 matrix.
pub const COVARIANCE_TERMS: usize = 21;

/// Row and column of the `index`-th term of a lower triangle stored row by row.
pub(crate) fn row_col(index: usize) -> (usize, usize) {
    let mut row = 0;
    while (row + 1) * (row + 2) / 2 <= index {
        row += 1;
    }
    (row, index - row * (row + 1) / 2)
}

/// Declared unit of the `index`-th term of a position/velocity covariance.
pub(crate) fn covariance_unit(index: usize) -> Unit {
    let (row, col) = row_col(index);
    match (row >= 3, col >= 3) {
        (false, false) => KM2,
        (true, true) => KM2_S2,
        _ => KM2_S,
    }
}

/// Position/velocity covariance matrix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartesianCovariance {
    pub comments: Vec<String>,
    /// Epoch of the matrix, given in ephemeris messages only.
    pub epoch: Option<Epoch>,
    pub cov_ref_frame: Option<String>,
    /// Lower triangle in SI units, row by row.
    pub terms: [Option<f64>; COVARIANCE_TERMS],
}

commented!(CartesianCovariance);

approx_struct!(CartesianCovariance {
    comments,
    epoch,
    cov_ref_frame,
    terms,
});

impl Block for CartesianCovariance {
    type Key = CovarianceKey;
    const NAME: &'static str = "covarianceMatrix";

    fn lookup(keyword: &str) -> Option<CovarianceKey> {
        CovarianceKey::from_keyword(keyword)
    }

    fn set(&mut self, key: CovarianceKey, token: &Token) -> Result<()> {
        match key {
            CovarianceKey::CovRefFrame => self.cov_ref_frame = Some(token.content_as_string()),
            term => {
                let index = term as usize - 1;
                self.terms[index] = Some(token.content_as_f64(&covariance_unit(index))?);
            }
        }
        Ok(())
    }
}

impl CartesianCovariance {
    /// Sets row `row` of the matrix from a KVN data line.
    pub(crate) fn set_row(&mut self, row: usize, token: &Token) -> Result<()> {
        let values = token.content_as_f64_list()?;
        if row >= 6 || values.len() != row + 1 {
            let expected = format!("covariance row {} with {} terms", row + 1, row + 1);
            return Err(Error::invalid_value(token, &expected));
        }
        let first = row * (row + 1) / 2;
        for (offset, value) in values.into_iter().enumerate() {
            self.terms[first + offset] = Some(covariance_unit(first + offset).to_si(value));
        }
        Ok(())
    }

    /// Writes the reference frame and the terms as keywords.
    pub(crate) fn write_terms(&self, generator: &mut dyn Generator) -> Result<()> {
        generator.write_string(CovarianceKey::CovRefFrame.keyword(), self.cov_ref_frame.as_deref(), false)?;
        for (index, key) in CovarianceKey::ALL[1..].iter().enumerate() {
            generator.write_f64(key.keyword(), self.terms[index], &covariance_unit(index), true)?;
        }
        Ok(())
    }

    pub(crate) fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| self.write_terms(generator))
    }
}

impl Validate for CartesianCovariance {
    fn validate(&self, source: &str) -> Result<()> {
        for (index, key) in CovarianceKey::ALL[1..].iter().enumerate() {
            mandatory(&self.terms[index], source, key.keyword(), Self::NAME)?;
        }
        Ok(())
    }
}

/// Prefix of user-defined parameter keywords in KVN.
pub const USER_DEFINED_PREFIX: &str = "USER_DEFINED_";

/// User-defined parameters, in file order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserDefined {
    pub comments: Vec<String>,
    pub parameters: IndexMap<String, String>,
}

commented!(UserDefined);

approx_struct!(UserDefined { comments, parameters });

impl Block for UserDefined {
    type Key = ();
    const NAME: &'static str = "userDefinedParameters";

    fn lookup(keyword: &str) -> Option<()> {
        keyword
            .strip_prefix(USER_DEFINED_PREFIX)
            .filter(|parameter| !parameter.is_empty())
            .map(|_| ())
    }

    /// Parameter names are case-normalized like KVN keywords, so the XML
    /// `parameter="foo"` and the KVN `USER_DEFINED_foo` name the same parameter.
    fn set(&mut self, _key: (), token: &Token) -> Result<()> {
        let parameter = token.name[USER_DEFINED_PREFIX.len()..].to_ascii_uppercase();
        self.parameters.insert(parameter, token.content_as_string());
        Ok(())
    }
}

/// Whether `parameter` reads back unchanged as the tail of a KVN keyword.
fn is_parameter_name(parameter: &str) -> bool {
    !parameter.is_empty()
        && parameter
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

impl UserDefined {
    /// # Errors
    ///
    /// Returns [`Error::Unwritable`] for a parameter name that is not an
    /// upper-case keyword, in either syntax.
    pub(crate) fn write_parameters(&self, generator: &mut dyn Generator) -> Result<()> {
        for (parameter, value) in &self.parameters {
            if !is_parameter_name(parameter) {
                return Err(Error::unwritable(
                    generator.output_name(),
                    &format!("{}{}", USER_DEFINED_PREFIX, parameter),
                    "parameter names are made of upper-case letters, digits and underscores",
                ));
            }
            generator.write_user_defined(parameter, value)?;
        }
        Ok(())
    }

    pub(crate) fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        write_block(generator, self, |generator| self.write_parameters(generator))
    }
}
