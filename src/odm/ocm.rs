//! Orbit Comprehensive Message.
//!
//! An OCM has a single segment whose data is a sequence of marked blocks,
//! `TRAJ`, `PHYS`, `COV`, `MAN`, `OD` and `USER` in KVN (`<traj>`, `<phys>`, ...
//! in XML). Trajectory, covariance and maneuver blocks end with data lines,
//! each made of a time tag followed by values whose layout is set by the
//! block's `TRAJ_TYPE`, `COV_TYPE` or `MAN_COMPOSITION`. Time tags are either
//! absolute dates or seconds elapsed since `EPOCH_TZERO`.

use super::{covariance_unit, UserDefined};
use crate::container::{check_count, mandatory, push_indexed, Block, Builder, Commented, Validate};
use crate::error::{Error, Result};
use crate::format::{ensure_finite, format_f64, format_signed};
use crate::generator::Generator;
use crate::message::{DataParser, MessageKind};
use crate::options::Syntax;
use crate::section::SectionName;
use crate::time::{Epoch, TimeSystem, TimeTag};
use crate::token::{parse_f64, Token};
use crate::units::{Unit, D, DEG, KG, KM, KM2, KM_S, KM_S2, M, M2, M_S, N, ONE, PERCENT, S};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Marker type of the OCM grammar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ocm;

keywords! {
    pub enum OcmMetadataKey {
        ObjectName => "OBJECT_NAME",
        InternationalDesignator => "INTERNATIONAL_DESIGNATOR",
        Operator => "OPERATOR",
        Owner => "OWNER",
        Country => "COUNTRY",
        TimeSystem => "TIME_SYSTEM",
        EpochTzero => "EPOCH_TZERO",
        StartTime => "START_TIME",
        StopTime => "STOP_TIME",
        TaimutcAtTzero => "TAIMUTC_AT_TZERO",
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcmMetadata {
    pub comments: Vec<String>,
    pub object_name: Option<String>,
    pub international_designator: Option<String>,
    pub operator: Option<String>,
    pub owner: Option<String>,
    pub country: Option<String>,
    pub time_system: Option<TimeSystem>,
    /// Origin of relative time tags.
    pub epoch_tzero: Option<Epoch>,
    pub start_time: Option<Epoch>,
    pub stop_time: Option<Epoch>,
    pub taimutc_at_tzero: Option<f64>,
}

commented!(OcmMetadata);

approx_struct!(OcmMetadata {
    comments,
    object_name,
    international_designator,
    operator,
    owner,
    country,
    time_system,
    epoch_tzero,
    start_time,
    stop_time,
    taimutc_at_tzero,
});

impl Validate for OcmMetadata {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.time_system, source, "TIME_SYSTEM", "metadata")?;
        mandatory(&self.epoch_tzero, source, "EPOCH_TZERO", "metadata")
    }
}

/// One data line: a time tag and values in SI units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataLine {
    pub time: TimeTag,
    pub values: Vec<f64>,
}

approx_struct!(DataLine { time, values });

impl DataLine {
    fn parse(token: &Token, units: &[Unit]) -> Result<Self> {
        let expected = format!("time tag followed by {} numbers", units.len());
        let invalid = || Error::invalid_value(token, &expected);
        let mut fields = token.value.split_whitespace();
        let time = fields.next().and_then(TimeTag::parse).ok_or_else(invalid)?;
        let raw: Vec<f64> = fields.map(parse_f64).collect::<Option<_>>().ok_or_else(invalid)?;
        if raw.len() != units.len() {
            return Err(invalid());
        }
        let values = raw.iter().zip(units).map(|(v, unit)| unit.to_si(*v)).collect();
        Ok(DataLine { time, values })
    }

    fn format(&self, units: &[Unit]) -> String {
        let mut line = self.time.to_string();
        for (value, unit) in self.values.iter().zip(units) {
            line.push(' ');
            line.push_str(&format_signed(unit.from_si(*value)));
        }
        line
    }
}

/// Whether `token` is a data line of the block whose XML line element is `element`.
fn is_line(token: &Token, element: &str) -> bool {
    token.is_raw_line() || (token.is_entry() && token.name == element)
}

/// Fails on the first line whose value count differs from the layout set by `keyword`.
fn check_lines(source: &str, keyword: &str, lines: &[DataLine], units: &[Unit]) -> Result<()> {
    for line in lines {
        check_count(source, keyword, Some(units.len()), line.values.len())?;
    }
    Ok(())
}

fn write_lines(
    generator: &mut dyn Generator,
    element: &str,
    keyword: &str,
    lines: &[DataLine],
    units: &[Unit],
) -> Result<()> {
    check_lines(generator.output_name(), keyword, lines, units)?;
    for line in lines {
        let offset = match line.time {
            TimeTag::Relative(offset) => Some(offset),
            TimeTag::Absolute(_) => None,
        };
        ensure_finite(generator.output_name(), element, offset.into_iter().chain(line.values.iter().copied()))?;
        generator.write_raw_data(element, &line.format(units))?;
    }
    Ok(())
}

ccsds_enum! {
    /// Layout of trajectory lines.
    pub enum TrajType {
        Cartp => "CARTP",
        Cartpv => "CARTPV",
        Cartpva => "CARTPVA",
        Keplerian => "KEPLERIAN",
    }
}

impl TrajType {
    pub fn units(self) -> Vec<Unit> {
        match self {
            TrajType::Cartp => vec![KM, KM, KM],
            TrajType::Cartpv => vec![KM, KM, KM, KM_S, KM_S, KM_S],
            TrajType::Cartpva => vec![KM, KM, KM, KM_S, KM_S, KM_S, KM_S2, KM_S2, KM_S2],
            TrajType::Keplerian => vec![KM, ONE, DEG, DEG, DEG, DEG],
        }
    }
}

keywords! {
    pub enum TrajKey {
        TrajId => "TRAJ_ID",
        TrajPrevId => "TRAJ_PREV_ID",
        CenterName => "CENTER_NAME",
        TrajRefFrame => "TRAJ_REF_FRAME",
        TrajFrameEpoch => "TRAJ_FRAME_EPOCH",
        TrajType => "TRAJ_TYPE",
    }
}

const TRAJ: SectionName = SectionName::new("TRAJ", "traj");
const TRAJ_LINE: &str = "trajLine";

/// Trajectory state time history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    pub comments: Vec<String>,
    pub traj_id: Option<String>,
    pub traj_prev_id: Option<String>,
    pub center_name: Option<String>,
    pub traj_ref_frame: Option<String>,
    pub traj_frame_epoch: Option<Epoch>,
    pub traj_type: Option<TrajType>,
    pub lines: Vec<DataLine>,
}

commented!(Trajectory);

approx_struct!(Trajectory {
    comments,
    traj_id,
    traj_prev_id,
    center_name,
    traj_ref_frame,
    traj_frame_epoch,
    traj_type,
    lines,
});

impl Trajectory {
    fn process(&mut self, token: &Token) -> Result<bool> {
        if is_line(token, TRAJ_LINE) {
            let units = self
                .traj_type
                .map(TrajType::units)
                .ok_or_else(|| Error::invalid_value(token, "line after TRAJ_TYPE"))?;
            self.lines.push(DataLine::parse(token, &units)?);
            return Ok(true);
        }
        let key = match TrajKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        match key {
            TrajKey::TrajId => self.traj_id = Some(token.content_as_string()),
            TrajKey::TrajPrevId => self.traj_prev_id = Some(token.content_as_string()),
            TrajKey::CenterName => self.center_name = Some(token.content_as_string()),
            TrajKey::TrajRefFrame => self.traj_ref_frame = Some(token.content_as_string()),
            TrajKey::TrajFrameEpoch => self.traj_frame_epoch = Some(token.content_as_epoch()?),
            TrajKey::TrajType => self.traj_type = Some(token.content_as_enum()?),
        }
        Ok(true)
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        generator.write_string(TrajKey::TrajId.keyword(), self.traj_id.as_deref(), false)?;
        generator.write_string(TrajKey::TrajPrevId.keyword(), self.traj_prev_id.as_deref(), false)?;
        generator.write_string(TrajKey::CenterName.keyword(), self.center_name.as_deref(), false)?;
        generator.write_string(TrajKey::TrajRefFrame.keyword(), self.traj_ref_frame.as_deref(), true)?;
        generator.write_epoch(TrajKey::TrajFrameEpoch.keyword(), self.traj_frame_epoch.as_ref(), false)?;
        let traj_type = self.traj_type.map(|t| t.to_string());
        generator.write_string(TrajKey::TrajType.keyword(), traj_type.as_deref(), true)?;
        let units = self.traj_type.map(TrajType::units).unwrap_or_default();
        write_lines(generator, TRAJ_LINE, "TRAJ_TYPE", &self.lines, &units)
    }
}

impl Validate for Trajectory {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.traj_ref_frame, source, "TRAJ_REF_FRAME", TRAJ.xml)?;
        mandatory(&self.traj_type, source, "TRAJ_TYPE", TRAJ.xml)?;
        let units = self.traj_type.map(TrajType::units).unwrap_or_default();
        check_lines(source, "TRAJ_TYPE", &self.lines, &units)
    }
}

keywords! {
    pub enum PhysKey {
        Manufacturer => "MANUFACTURER",
        BusModel => "BUS_MODEL",
        DockedWith => "DOCKED_WITH",
        DragConstArea => "DRAG_CONST_AREA",
        DragCoeffNom => "DRAG_COEFF_NOM",
        DragUncertainty => "DRAG_UNCERTAINTY",
        InitialWetMass => "INITIAL_WET_MASS",
        WetMass => "WET_MASS",
        DryMass => "DRY_MASS",
        OebParentFrame => "OEB_PARENT_FRAME",
        OebQ1 => "OEB_Q1",
        OebQ2 => "OEB_Q2",
        OebQ3 => "OEB_Q3",
        OebQc => "OEB_QC",
        OebMax => "OEB_MAX",
        OebInt => "OEB_INT",
        OebMin => "OEB_MIN",
        Rcs => "RCS",
        SrpConstArea => "SRP_CONST_AREA",
        SolarRadCoeff => "SOLAR_RAD_COEFF",
        MaxThrust => "MAX_THRUST",
        BolDv => "BOL_DV",
        RemainingDv => "REMAINING_DV",
    }
}

impl PhysKey {
    fn unit(self) -> Unit {
        match self {
            PhysKey::DragConstArea | PhysKey::Rcs | PhysKey::SrpConstArea => M2,
            PhysKey::DragUncertainty => PERCENT,
            PhysKey::InitialWetMass | PhysKey::WetMass | PhysKey::DryMass => KG,
            PhysKey::OebMax | PhysKey::OebInt | PhysKey::OebMin => M,
            PhysKey::MaxThrust => N,
            PhysKey::BolDv | PhysKey::RemainingDv => M_S,
            _ => ONE,
        }
    }
}

const PHYS: SectionName = SectionName::new("PHYS", "phys");

/// Physical properties of the object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhysicalProperties {
    pub comments: Vec<String>,
    pub manufacturer: Option<String>,
    pub bus_model: Option<String>,
    pub docked_with: Vec<String>,
    pub drag_const_area: Option<f64>,
    pub drag_coeff_nom: Option<f64>,
    /// Stored as a fraction.
    pub drag_uncertainty: Option<f64>,
    pub initial_wet_mass: Option<f64>,
    pub wet_mass: Option<f64>,
    pub dry_mass: Option<f64>,
    pub oeb_parent_frame: Option<String>,
    pub oeb_q1: Option<f64>,
    pub oeb_q2: Option<f64>,
    pub oeb_q3: Option<f64>,
    pub oeb_qc: Option<f64>,
    pub oeb_max: Option<f64>,
    pub oeb_int: Option<f64>,
    pub oeb_min: Option<f64>,
    pub rcs: Option<f64>,
    pub srp_const_area: Option<f64>,
    pub solar_rad_coeff: Option<f64>,
    pub max_thrust: Option<f64>,
    pub bol_dv: Option<f64>,
    pub remaining_dv: Option<f64>,
}

commented!(PhysicalProperties);

approx_struct!(PhysicalProperties {
    comments,
    manufacturer,
    bus_model,
    docked_with,
    drag_const_area,
    drag_coeff_nom,
    drag_uncertainty,
    initial_wet_mass,
    wet_mass,
    dry_mass,
    oeb_parent_frame,
    oeb_q1,
    oeb_q2,
    oeb_q3,
    oeb_qc,
    oeb_max,
    oeb_int,
    oeb_min,
    rcs,
    srp_const_area,
    solar_rad_coeff,
    max_thrust,
    bol_dv,
    remaining_dv,
});

impl PhysicalProperties {
    fn number_mut(&mut self, key: PhysKey) -> Option<&mut Option<f64>> {
        Some(match key {
            PhysKey::DragConstArea => &mut self.drag_const_area,
            PhysKey::DragCoeffNom => &mut self.drag_coeff_nom,
            PhysKey::DragUncertainty => &mut self.drag_uncertainty,
            PhysKey::InitialWetMass => &mut self.initial_wet_mass,
            PhysKey::WetMass => &mut self.wet_mass,
            PhysKey::DryMass => &mut self.dry_mass,
            PhysKey::OebQ1 => &mut self.oeb_q1,
            PhysKey::OebQ2 => &mut self.oeb_q2,
            PhysKey::OebQ3 => &mut self.oeb_q3,
            PhysKey::OebQc => &mut self.oeb_qc,
            PhysKey::OebMax => &mut self.oeb_max,
            PhysKey::OebInt => &mut self.oeb_int,
            PhysKey::OebMin => &mut self.oeb_min,
            PhysKey::Rcs => &mut self.rcs,
            PhysKey::SrpConstArea => &mut self.srp_const_area,
            PhysKey::SolarRadCoeff => &mut self.solar_rad_coeff,
            PhysKey::MaxThrust => &mut self.max_thrust,
            PhysKey::BolDv => &mut self.bol_dv,
            PhysKey::RemainingDv => &mut self.remaining_dv,
            PhysKey::Manufacturer | PhysKey::BusModel | PhysKey::DockedWith | PhysKey::OebParentFrame => {
                return None
            }
        })
    }

    fn number(&self, key: PhysKey) -> Option<f64> {
        match key {
            PhysKey::DragConstArea => self.drag_const_area,
            PhysKey::DragCoeffNom => self.drag_coeff_nom,
            PhysKey::DragUncertainty => self.drag_uncertainty,
            PhysKey::InitialWetMass => self.initial_wet_mass,
            PhysKey::WetMass => self.wet_mass,
            PhysKey::DryMass => self.dry_mass,
            PhysKey::OebQ1 => self.oeb_q1,
            PhysKey::OebQ2 => self.oeb_q2,
            PhysKey::OebQ3 => self.oeb_q3,
            PhysKey::OebQc => self.oeb_qc,
            PhysKey::OebMax => self.oeb_max,
            PhysKey::OebInt => self.oeb_int,
            PhysKey::OebMin => self.oeb_min,
            PhysKey::Rcs => self.rcs,
            PhysKey::SrpConstArea => self.srp_const_area,
            PhysKey::SolarRadCoeff => self.solar_rad_coeff,
            PhysKey::MaxThrust => self.max_thrust,
            PhysKey::BolDv => self.bol_dv,
            PhysKey::RemainingDv => self.remaining_dv,
            _ => None,
        }
    }

    fn process(&mut self, token: &Token) -> Result<bool> {
        let key = match PhysKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        match key {
            PhysKey::Manufacturer => self.manufacturer = Some(token.content_as_string()),
            PhysKey::BusModel => self.bus_model = Some(token.content_as_string()),
            PhysKey::DockedWith => self.docked_with = token.content_as_list(),
            PhysKey::OebParentFrame => self.oeb_parent_frame = Some(token.content_as_string()),
            number => {
                let value = token.content_as_f64(&number.unit())?;
                if let Some(field) = self.number_mut(number) {
                    *field = Some(value);
                }
            }
        }
        Ok(true)
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        for &key in PhysKey::ALL {
            match key {
                PhysKey::Manufacturer => generator.write_string(key.keyword(), self.manufacturer.as_deref(), false)?,
                PhysKey::BusModel => generator.write_string(key.keyword(), self.bus_model.as_deref(), false)?,
                PhysKey::DockedWith => generator.write_list(key.keyword(), &self.docked_with)?,
                PhysKey::OebParentFrame => {
                    generator.write_string(key.keyword(), self.oeb_parent_frame.as_deref(), false)?
                }
                number => generator.write_f64(number.keyword(), self.number(number), &number.unit(), false)?,
            }
        }
        Ok(())
    }
}

impl Validate for PhysicalProperties {
    fn validate(&self, source: &str) -> Result<()> {
        let quaternion = [
            (PhysKey::OebQ1, self.oeb_q1),
            (PhysKey::OebQ2, self.oeb_q2),
            (PhysKey::OebQ3, self.oeb_q3),
            (PhysKey::OebQc, self.oeb_qc),
        ];
        if quaternion.iter().any(|(_, value)| value.is_some()) {
            for (key, value) in quaternion {
                mandatory(&value, source, key.keyword(), PHYS.xml)?;
            }
        }
        Ok(())
    }
}

ccsds_enum! {
    /// Layout of covariance lines.
    pub enum CovType {
        Cartp => "CARTP",
        Cartpv => "CARTPV",
    }
}

impl CovType {
    /// Units of the lower triangle terms, row by row.
    pub fn units(self) -> Vec<Unit> {
        match self {
            CovType::Cartp => vec![KM2; 6],
            CovType::Cartpv => (0..super::COVARIANCE_TERMS).map(covariance_unit).collect(),
        }
    }
}

keywords! {
    pub enum CovKey {
        CovId => "COV_ID",
        CovPrevId => "COV_PREV_ID",
        CovRefFrame => "COV_REF_FRAME",
        CovFrameEpoch => "COV_FRAME_EPOCH",
        CovType => "COV_TYPE",
    }
}

const COV: SectionName = SectionName::new("COV", "cov");
const COV_LINE: &str = "covLine";

/// Covariance time history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcmCovariance {
    pub comments: Vec<String>,
    pub cov_id: Option<String>,
    pub cov_prev_id: Option<String>,
    pub cov_ref_frame: Option<String>,
    pub cov_frame_epoch: Option<Epoch>,
    pub cov_type: Option<CovType>,
    pub lines: Vec<DataLine>,
}

commented!(OcmCovariance);

approx_struct!(OcmCovariance {
    comments,
    cov_id,
    cov_prev_id,
    cov_ref_frame,
    cov_frame_epoch,
    cov_type,
    lines,
});

impl OcmCovariance {
    fn process(&mut self, token: &Token) -> Result<bool> {
        if is_line(token, COV_LINE) {
            let units = self
                .cov_type
                .map(CovType::units)
                .ok_or_else(|| Error::invalid_value(token, "line after COV_TYPE"))?;
            self.lines.push(DataLine::parse(token, &units)?);
            return Ok(true);
        }
        let key = match CovKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        match key {
            CovKey::CovId => self.cov_id = Some(token.content_as_string()),
            CovKey::CovPrevId => self.cov_prev_id = Some(token.content_as_string()),
            CovKey::CovRefFrame => self.cov_ref_frame = Some(token.content_as_string()),
            CovKey::CovFrameEpoch => self.cov_frame_epoch = Some(token.content_as_epoch()?),
            CovKey::CovType => self.cov_type = Some(token.content_as_enum()?),
        }
        Ok(true)
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        generator.write_string(CovKey::CovId.keyword(), self.cov_id.as_deref(), false)?;
        generator.write_string(CovKey::CovPrevId.keyword(), self.cov_prev_id.as_deref(), false)?;
        generator.write_string(CovKey::CovRefFrame.keyword(), self.cov_ref_frame.as_deref(), true)?;
        generator.write_epoch(CovKey::CovFrameEpoch.keyword(), self.cov_frame_epoch.as_ref(), false)?;
        let cov_type = self.cov_type.map(|t| t.to_string());
        generator.write_string(CovKey::CovType.keyword(), cov_type.as_deref(), true)?;
        let units = self.cov_type.map(CovType::units).unwrap_or_default();
        write_lines(generator, COV_LINE, "COV_TYPE", &self.lines, &units)
    }
}

impl Validate for OcmCovariance {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.cov_ref_frame, source, "COV_REF_FRAME", COV.xml)?;
        mandatory(&self.cov_type, source, "COV_TYPE", COV.xml)?;
        let units = self.cov_type.map(CovType::units).unwrap_or_default();
        check_lines(source, "COV_TYPE", &self.lines, &units)
    }
}

/// Unit of a maneuver line column, `None` for unknown columns.
///
/// Time columns come first and are not listed here.
fn maneuver_column_unit(column: &str) -> Option<Unit> {
    Some(match column {
        "DV_X" | "DV_Y" | "DV_Z" | "DV_MAG" => KM_S,
        "ACC_X" | "ACC_Y" | "ACC_Z" | "ACC_MAG" => KM_S2,
        "THR_X" | "THR_Y" | "THR_Z" | "THR_MAG" => N,
        "DV_MASS" | "DEPLOY_MASS" => KG,
        "THR_ISP" | "DURATION" => S,
        "THR_EFFIC" => ONE,
        _ => return None,
    })
}

const TIME_COLUMNS: [&str; 2] = ["TIME_ABSOLUTE", "TIME_RELATIVE"];

keywords! {
    pub enum ManKey {
        ManId => "MAN_ID",
        ManPrevId => "MAN_PREV_ID",
        ManDeviceId => "MAN_DEVICE_ID",
        ManRefFrame => "MAN_REF_FRAME",
        ManComposition => "MAN_COMPOSITION",
    }
}

const MAN: SectionName = SectionName::new("MAN", "man");
const MAN_LINE: &str = "manLine";

/// Maneuver time history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcmManeuver {
    pub comments: Vec<String>,
    pub man_id: Option<String>,
    pub man_prev_id: Option<String>,
    pub man_device_id: Option<String>,
    pub man_ref_frame: Option<String>,
    /// Columns of the maneuver lines, starting with the time column.
    pub man_composition: Vec<String>,
    pub lines: Vec<DataLine>,
}

commented!(OcmManeuver);

approx_struct!(OcmManeuver {
    comments,
    man_id,
    man_prev_id,
    man_device_id,
    man_ref_frame,
    man_composition,
    lines,
});

impl OcmManeuver {
    fn units(&self) -> Vec<Unit> {
        self.man_composition
            .iter()
            .skip(1)
            .filter_map(|column| maneuver_column_unit(column))
            .collect()
    }

    fn process(&mut self, token: &Token) -> Result<bool> {
        if is_line(token, MAN_LINE) {
            if self.man_composition.is_empty() {
                return Err(Error::invalid_value(token, "line after MAN_COMPOSITION"));
            }
            self.lines.push(DataLine::parse(token, &self.units())?);
            return Ok(true);
        }
        let key = match ManKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        match key {
            ManKey::ManId => self.man_id = Some(token.content_as_string()),
            ManKey::ManPrevId => self.man_prev_id = Some(token.content_as_string()),
            ManKey::ManDeviceId => self.man_device_id = Some(token.content_as_string()),
            ManKey::ManRefFrame => self.man_ref_frame = Some(token.content_as_string()),
            ManKey::ManComposition => {
                let columns = token.content_as_list();
                let valid = columns
                    .split_first()
                    .map_or(false, |(time, rest)| {
                        TIME_COLUMNS.contains(&time.as_str())
                            && rest.iter().all(|c| maneuver_column_unit(c).is_some())
                    });
                if !valid {
                    return Err(Error::invalid_value(token, "time column followed by maneuver columns"));
                }
                self.man_composition = columns;
            }
        }
        Ok(true)
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        generator.write_string(ManKey::ManId.keyword(), self.man_id.as_deref(), true)?;
        generator.write_string(ManKey::ManPrevId.keyword(), self.man_prev_id.as_deref(), false)?;
        generator.write_string(ManKey::ManDeviceId.keyword(), self.man_device_id.as_deref(), true)?;
        generator.write_string(ManKey::ManRefFrame.keyword(), self.man_ref_frame.as_deref(), false)?;
        generator.write_list(ManKey::ManComposition.keyword(), &self.man_composition)?;
        write_lines(generator, MAN_LINE, "MAN_COMPOSITION", &self.lines, &self.units())
    }
}

impl Validate for OcmManeuver {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.man_id, source, "MAN_ID", MAN.xml)?;
        mandatory(&self.man_device_id, source, "MAN_DEVICE_ID", MAN.xml)?;
        if self.man_composition.is_empty() {
            return Err(Error::missing_keyword(source, "MAN_COMPOSITION", MAN.xml));
        }
        check_lines(source, "MAN_COMPOSITION", &self.lines, &self.units())
    }
}

keywords! {
    pub enum OdKey {
        OdId => "OD_ID",
        OdPrevId => "OD_PREV_ID",
        OdMethod => "OD_METHOD",
        OdEpoch => "OD_EPOCH",
        DaysSinceFirstObs => "DAYS_SINCE_FIRST_OBS",
        DaysSinceLastObs => "DAYS_SINCE_LAST_OBS",
        ObsAvailable => "OBS_AVAILABLE",
        ObsUsed => "OBS_USED",
        NumberSensorsUsed => "NUMBER_SENSORS_USED",
        WeightedRms => "WEIGHTED_RMS",
    }
}

const OD: SectionName = SectionName::new("OD", "od");
const SENSORS_USED: &str = "SENSORS_USED_";
const NUMBER_SENSOR_NOISE: &str = "NUMBER_SENSOR_NOISE_COVARIANCE_";
const SENSOR_NOISE_STDDEV: &str = "SENSOR_NOISE_STDDEV_";

/// Orbit determination data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrbitDetermination {
    pub comments: Vec<String>,
    pub od_id: Option<String>,
    pub od_prev_id: Option<String>,
    pub od_method: Option<String>,
    pub od_epoch: Option<Epoch>,
    pub days_since_first_obs: Option<f64>,
    pub days_since_last_obs: Option<f64>,
    pub obs_available: Option<u32>,
    pub obs_used: Option<u32>,
    pub number_sensors_used: Option<usize>,
    /// `SENSORS_USED_1`, `SENSORS_USED_2`, ...
    pub sensors_used: Vec<String>,
    /// `NUMBER_SENSOR_NOISE_COVARIANCE_1`, ...
    pub number_sensor_noise_covariance: Vec<usize>,
    /// `SENSOR_NOISE_STDDEV_1`, ...
    pub sensor_noise_stddev: Vec<Vec<f64>>,
    pub weighted_rms: Option<f64>,
}

commented!(OrbitDetermination);

approx_struct!(OrbitDetermination {
    comments,
    od_id,
    od_prev_id,
    od_method,
    od_epoch,
    days_since_first_obs,
    days_since_last_obs,
    obs_available,
    obs_used,
    number_sensors_used,
    sensors_used,
    number_sensor_noise_covariance,
    sensor_noise_stddev,
    weighted_rms,
});

impl OrbitDetermination {
    fn process(&mut self, token: &Token) -> Result<bool> {
        if let Some(index) = token.index_after(SENSORS_USED) {
            push_indexed(&mut self.sensors_used, index, token.content_as_string(), token)?;
            return Ok(true);
        }
        if let Some(index) = token.index_after(NUMBER_SENSOR_NOISE) {
            let count = token.content_as_int()?;
            push_indexed(&mut self.number_sensor_noise_covariance, index, count, token)?;
            return Ok(true);
        }
        if let Some(index) = token.index_after(SENSOR_NOISE_STDDEV) {
            let values = token.content_as_f64_list()?;
            push_indexed(&mut self.sensor_noise_stddev, index, values, token)?;
            return Ok(true);
        }
        let key = match OdKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        match key {
            OdKey::OdId => self.od_id = Some(token.content_as_string()),
            OdKey::OdPrevId => self.od_prev_id = Some(token.content_as_string()),
            OdKey::OdMethod => self.od_method = Some(token.content_as_string()),
            OdKey::OdEpoch => self.od_epoch = Some(token.content_as_epoch()?),
            OdKey::DaysSinceFirstObs => self.days_since_first_obs = Some(token.content_as_f64(&D)?),
            OdKey::DaysSinceLastObs => self.days_since_last_obs = Some(token.content_as_f64(&D)?),
            OdKey::ObsAvailable => self.obs_available = Some(token.content_as_int()?),
            OdKey::ObsUsed => self.obs_used = Some(token.content_as_int()?),
            OdKey::NumberSensorsUsed => self.number_sensors_used = Some(token.content_as_int()?),
            OdKey::WeightedRms => self.weighted_rms = Some(token.content_as_raw_f64()?),
        }
        Ok(true)
    }

    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        let count = |value: Option<usize>| value.map(|v| v as i64);
        generator.write_string(OdKey::OdId.keyword(), self.od_id.as_deref(), true)?;
        generator.write_string(OdKey::OdPrevId.keyword(), self.od_prev_id.as_deref(), false)?;
        generator.write_string(OdKey::OdMethod.keyword(), self.od_method.as_deref(), true)?;
        generator.write_epoch(OdKey::OdEpoch.keyword(), self.od_epoch.as_ref(), true)?;
        generator.write_f64(OdKey::DaysSinceFirstObs.keyword(), self.days_since_first_obs, &D, false)?;
        generator.write_f64(OdKey::DaysSinceLastObs.keyword(), self.days_since_last_obs, &D, false)?;
        generator.write_int(OdKey::ObsAvailable.keyword(), self.obs_available.map(i64::from), false)?;
        generator.write_int(OdKey::ObsUsed.keyword(), self.obs_used.map(i64::from), false)?;
        generator.write_int(OdKey::NumberSensorsUsed.keyword(), count(self.number_sensors_used), false)?;
        for (i, sensor) in self.sensors_used.iter().enumerate() {
            generator.write_string(&format!("{}{}", SENSORS_USED, i + 1), Some(sensor), false)?;
        }
        for (i, number) in self.number_sensor_noise_covariance.iter().enumerate() {
            generator.write_int(&format!("{}{}", NUMBER_SENSOR_NOISE, i + 1), count(Some(*number)), false)?;
        }
        for (i, values) in self.sensor_noise_stddev.iter().enumerate() {
            let keyword = format!("{}{}", SENSOR_NOISE_STDDEV, i + 1);
            ensure_finite(generator.output_name(), &keyword, values.iter().copied())?;
            let text: Vec<String> = values.iter().map(|v| format_f64(*v)).collect();
            generator.write_string(&keyword, Some(&text.join(" ")), false)?;
        }
        generator.write_f64(OdKey::WeightedRms.keyword(), self.weighted_rms, &ONE, false)
    }
}

impl Validate for OrbitDetermination {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.od_id, source, "OD_ID", OD.xml)?;
        mandatory(&self.od_method, source, "OD_METHOD", OD.xml)?;
        mandatory(&self.od_epoch, source, "OD_EPOCH", OD.xml)?;
        check_count(source, "NUMBER_SENSORS_USED", self.number_sensors_used, self.sensors_used.len())?;
        let entries = self
            .number_sensor_noise_covariance
            .len()
            .max(self.sensor_noise_stddev.len());
        for i in 0..entries {
            check_count(
                source,
                &format!("{}{}", NUMBER_SENSOR_NOISE, i + 1),
                self.number_sensor_noise_covariance.get(i).copied(),
                self.sensor_noise_stddev.get(i).map_or(0, Vec::len),
            )?;
        }
        Ok(())
    }
}

const USER: SectionName = SectionName::new("USER", "user");

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OcmData {
    pub trajectories: Vec<Trajectory>,
    pub physical_properties: Option<PhysicalProperties>,
    pub covariances: Vec<OcmCovariance>,
    pub maneuvers: Vec<OcmManeuver>,
    pub orbit_determination: Option<OrbitDetermination>,
    pub user_defined: Option<UserDefined>,
}

approx_struct!(OcmData {
    trajectories,
    physical_properties,
    covariances,
    maneuvers,
    orbit_determination,
    user_defined,
});

impl Validate for OcmData {
    fn validate(&self, source: &str) -> Result<()> {
        for trajectory in &self.trajectories {
            trajectory.validate(source)?;
        }
        if let Some(physical) = &self.physical_properties {
            physical.validate(source)?;
        }
        for covariance in &self.covariances {
            covariance.validate(source)?;
        }
        for maneuver in &self.maneuvers {
            maneuver.validate(source)?;
        }
        if let Some(od) = &self.orbit_determination {
            od.validate(source)?;
        }
        Ok(())
    }
}

fn write_section<T: Commented>(
    generator: &mut dyn Generator,
    section: SectionName,
    block: &T,
    fields: impl FnOnce(&mut dyn Generator) -> Result<()>,
) -> Result<()> {
    generator.enter_section(section)?;
    generator.write_comments(block.comments())?;
    fields(&mut *generator)?;
    generator.exit_section()?;
    generator.write_empty_line()
}

impl OcmData {
    fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        for trajectory in &self.trajectories {
            write_section(generator, TRAJ, trajectory, |g| trajectory.write(g))?;
        }
        if let Some(physical) = &self.physical_properties {
            write_section(generator, PHYS, physical, |g| physical.write(g))?;
        }
        for covariance in &self.covariances {
            write_section(generator, COV, covariance, |g| covariance.write(g))?;
        }
        for maneuver in &self.maneuvers {
            write_section(generator, MAN, maneuver, |g| maneuver.write(g))?;
        }
        if let Some(od) = &self.orbit_determination {
            write_section(generator, OD, od, |g| od.write(g))?;
        }
        if let Some(user) = &self.user_defined {
            write_section(generator, USER, user, |g| user.write_parameters(g))?;
        }
        Ok(())
    }
}

/// The block being read.
enum OpenBlock {
    Traj(Builder<Trajectory>),
    Phys(Builder<PhysicalProperties>),
    Cov(Builder<OcmCovariance>),
    Man(Builder<OcmManeuver>),
    Od(Builder<OrbitDetermination>),
    User(Builder<UserDefined>),
}

impl OpenBlock {
    fn start(token: &Token, syntax: Syntax) -> Option<OpenBlock> {
        let block = if TRAJ.is_start(token, syntax) {
            OpenBlock::Traj(Builder::default())
        } else if PHYS.is_start(token, syntax) {
            OpenBlock::Phys(Builder::default())
        } else if COV.is_start(token, syntax) {
            OpenBlock::Cov(Builder::default())
        } else if MAN.is_start(token, syntax) {
            OpenBlock::Man(Builder::default())
        } else if OD.is_start(token, syntax) {
            OpenBlock::Od(Builder::default())
        } else if USER.is_start(token, syntax) {
            OpenBlock::User(Builder::default())
        } else {
            return None;
        };
        Some(block)
    }

    fn section(&self) -> SectionName {
        match self {
            OpenBlock::Traj(_) => TRAJ,
            OpenBlock::Phys(_) => PHYS,
            OpenBlock::Cov(_) => COV,
            OpenBlock::Man(_) => MAN,
            OpenBlock::Od(_) => OD,
            OpenBlock::User(_) => USER,
        }
    }

    fn add_comment(&mut self, token: &Token) -> Result<()> {
        match self {
            OpenBlock::Traj(b) => b.add_comment(token),
            OpenBlock::Phys(b) => b.add_comment(token),
            OpenBlock::Cov(b) => b.add_comment(token),
            OpenBlock::Man(b) => b.add_comment(token),
            OpenBlock::Od(b) => b.add_comment(token),
            OpenBlock::User(b) => b.add_comment(token),
        }
    }

    fn process(&mut self, token: &Token) -> Result<bool> {
        match self {
            OpenBlock::Traj(b) => b.fields().process(token),
            OpenBlock::Phys(b) => b.fields().process(token),
            OpenBlock::Cov(b) => b.fields().process(token),
            OpenBlock::Man(b) => b.fields().process(token),
            OpenBlock::Od(b) => b.fields().process(token),
            OpenBlock::User(b) => match UserDefined::lookup(&token.name) {
                Some(key) => b.fields().set(key, token).map(|_| true),
                None => Ok(false),
            },
        }
    }

    fn close(self, data: &mut OcmData) {
        match self {
            OpenBlock::Traj(b) => data.trajectories.push(b.into_inner()),
            OpenBlock::Phys(b) => data.physical_properties = Some(b.into_inner()),
            OpenBlock::Cov(b) => data.covariances.push(b.into_inner()),
            OpenBlock::Man(b) => data.maneuvers.push(b.into_inner()),
            OpenBlock::Od(b) => data.orbit_determination = Some(b.into_inner()),
            OpenBlock::User(b) => data.user_defined = Some(b.into_inner()),
        }
    }
}

pub struct OcmDataParser {
    syntax: Syntax,
    open: Option<OpenBlock>,
    data: OcmData,
}

impl OcmDataParser {
    pub fn new(syntax: Syntax) -> Self {
        OcmDataParser {
            syntax,
            open: None,
            data: OcmData::default(),
        }
    }
}

impl DataParser for OcmDataParser {
    type Output = OcmData;

    fn process(&mut self, token: &Token) -> Result<bool> {
        let block = match self.open.as_mut() {
            Some(block) => block,
            None => {
                if token.is_comment() {
                    return Err(Error::comment_not_allowed(token));
                }
                self.open = OpenBlock::start(token, self.syntax);
                if let Some(block) = &self.open {
                    trace!(line = token.line, block = block.section().xml, "block starts");
                }
                return Ok(self.open.is_some());
            }
        };
        if block.section().is_stop(token, self.syntax) {
            if let Some(block) = self.open.take() {
                block.close(&mut self.data);
            }
            return Ok(true);
        }
        if token.is_comment() {
            block.add_comment(token)?;
            return Ok(true);
        }
        if !token.is_entry() {
            return Ok(false);
        }
        block.process(token)
    }

    fn finish(self) -> Result<OcmData> {
        Ok(self.data)
    }
}

impl MessageKind for Ocm {
    type Metadata = OcmMetadata;
    type Data = OcmData;
    type DataParser = OcmDataParser;

    const NAME: &'static str = "OCM";
    const ROOT: &'static str = "ocm";
    const VERSION_KEY: &'static str = "CCSDS_OCM_VERS";
    const DEFAULT_VERSION: f64 = 3.0;
    const HEADER_ID_VERSION: f64 = 3.0;
    const KVN_METADATA_MARKERS: bool = true;
    const KVN_DATA_MARKERS: bool = false;
    const MULTI_SEGMENT: bool = false;

    fn process_metadata(metadata: &mut Builder<OcmMetadata>, token: &Token) -> Result<bool> {
        let key = match OcmMetadataKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        let fields = metadata.fields();
        match key {
            OcmMetadataKey::ObjectName => fields.object_name = Some(token.content_as_string()),
            OcmMetadataKey::InternationalDesignator => {
                fields.international_designator = Some(token.content_as_string())
            }
            OcmMetadataKey::Operator => fields.operator = Some(token.content_as_string()),
            OcmMetadataKey::Owner => fields.owner = Some(token.content_as_string()),
            OcmMetadataKey::Country => fields.country = Some(token.content_as_string()),
            OcmMetadataKey::TimeSystem => fields.time_system = Some(token.content_as_enum()?),
            OcmMetadataKey::EpochTzero => fields.epoch_tzero = Some(token.content_as_epoch()?),
            OcmMetadataKey::StartTime => fields.start_time = Some(token.content_as_epoch()?),
            OcmMetadataKey::StopTime => fields.stop_time = Some(token.content_as_epoch()?),
            OcmMetadataKey::TaimutcAtTzero => fields.taimutc_at_tzero = Some(token.content_as_f64(&S)?),
        }
        Ok(true)
    }

    fn data_parser(_metadata: &OcmMetadata, syntax: Syntax) -> OcmDataParser {
        OcmDataParser::new(syntax)
    }

    fn write_metadata(generator: &mut dyn Generator, metadata: &OcmMetadata) -> Result<()> {
        let time_system = metadata.time_system.map(|t| t.to_string());
        let strings = [
            (OcmMetadataKey::ObjectName, metadata.object_name.as_deref()),
            (OcmMetadataKey::InternationalDesignator, metadata.international_designator.as_deref()),
            (OcmMetadataKey::Operator, metadata.operator.as_deref()),
            (OcmMetadataKey::Owner, metadata.owner.as_deref()),
            (OcmMetadataKey::Country, metadata.country.as_deref()),
        ];
        for (key, value) in strings {
            generator.write_string(key.keyword(), value, false)?;
        }
        generator.write_string(OcmMetadataKey::TimeSystem.keyword(), time_system.as_deref(), true)?;
        generator.write_epoch(OcmMetadataKey::EpochTzero.keyword(), metadata.epoch_tzero.as_ref(), true)?;
        generator.write_epoch(OcmMetadataKey::StartTime.keyword(), metadata.start_time.as_ref(), false)?;
        generator.write_epoch(OcmMetadataKey::StopTime.keyword(), metadata.stop_time.as_ref(), false)?;
        generator.write_f64(OcmMetadataKey::TaimutcAtTzero.keyword(), metadata.taimutc_at_tzero, &S, false)
    }

    fn write_data(generator: &mut dyn Generator, _metadata: &OcmMetadata, data: &OcmData) -> Result<()> {
        data.write(generator)
    }
}
