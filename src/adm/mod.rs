//! Attitude data messages: APM and AEM.
//!
//! ADM files are older than the `MESSAGE_ID` header keyword, which they
//! never accept. Both messages share the object identification metadata
//! and the vocabulary of attitude frames and directions held here.

pub mod aem;
pub mod apm;

use crate::container::mandatory;
use crate::error::Result;
use crate::generator::Generator;
use crate::time::TimeSystem;
use crate::token::Token;
use serde::{Deserialize, Serialize};

/// ADM files accept no header identification keyword, whatever their version.
pub(crate) const NO_HEADER_ID: f64 = f64::INFINITY;

keywords! {
    /// Metadata keywords shared by APM and AEM.
    pub enum AdmCommonKey {
        ObjectName => "OBJECT_NAME",
        ObjectId => "OBJECT_ID",
        CenterName => "CENTER_NAME",
        TimeSystem => "TIME_SYSTEM",
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdmCommon {
    pub object_name: Option<String>,
    pub object_id: Option<String>,
    pub center_name: Option<String>,
    pub time_system: Option<TimeSystem>,
}

approx_struct!(AdmCommon {
    object_name,
    object_id,
    center_name,
    time_system,
});

impl AdmCommon {
    pub(crate) fn process(&mut self, token: &Token) -> Result<bool> {
        let key = match AdmCommonKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        match key {
            AdmCommonKey::ObjectName => self.object_name = Some(token.content_as_string()),
            AdmCommonKey::ObjectId => self.object_id = Some(token.content_as_string()),
            AdmCommonKey::CenterName => self.center_name = Some(token.content_as_string()),
            AdmCommonKey::TimeSystem => self.time_system = Some(token.content_as_enum()?),
        }
        Ok(true)
    }

    /// Writes the identification keywords, leaving `TIME_SYSTEM` to the caller.
    pub(crate) fn write_identification(&self, generator: &mut dyn Generator) -> Result<()> {
        generator.write_string(AdmCommonKey::ObjectName.keyword(), self.object_name.as_deref(), true)?;
        generator.write_string(AdmCommonKey::ObjectId.keyword(), self.object_id.as_deref(), true)?;
        generator.write_string(AdmCommonKey::CenterName.keyword(), self.center_name.as_deref(), false)
    }

    pub(crate) fn write_time_system(&self, generator: &mut dyn Generator) -> Result<()> {
        let time_system = self.time_system.map(|t| t.to_string());
        generator.write_string(AdmCommonKey::TimeSystem.keyword(), time_system.as_deref(), true)
    }

    pub(crate) fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.object_name, source, "OBJECT_NAME", "metadata")?;
        mandatory(&self.object_id, source, "OBJECT_ID", "metadata")?;
        mandatory(&self.time_system, source, "TIME_SYSTEM", "metadata")
    }
}

ccsds_enum! {
    /// Direction of an attitude transformation.
    pub enum AttitudeDir {
        A2B => "A2B",
        B2A => "B2A",
    }
}

ccsds_enum! {
    /// Position of the scalar component in quaternion data.
    pub enum QuaternionType {
        First => "FIRST",
        Last => "LAST",
    }
}

ccsds_enum! {
    /// Frame in which angular rates are expressed.
    pub enum RateFrame {
        RefFrameA => "REF_FRAME_A",
        RefFrameB => "REF_FRAME_B",
    }
}

/// Whether `text` is a valid Euler rotation sequence such as `312` or `XYZ`.
pub(crate) fn is_rotation_sequence(text: &str) -> bool {
    let axes: Vec<char> = text
        .chars()
        .map(|c| match c {
            'X' | 'x' => '1',
            'Y' | 'y' => '2',
            'Z' | 'z' => '3',
            other => other,
        })
        .collect();
    axes.len() == 3
        && axes.iter().all(|c| matches!(c, '1' | '2' | '3'))
        && axes[0] != axes[1]
        && axes[1] != axes[2]
}
