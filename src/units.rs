//! Physical units attached to numeric values.
//!
//! Numeric fields are stored in SI units (m, kg, s, rad and their products).
//! Each keyword declares the unit CCSDS mandates for it, which is used both
//! as the default when a KVN line carries no `[unit]` suffix and as the unit
//! values are converted back to when a message is written.
//!
//! A unit found in a message (`[km]`, `[m**2]`, `[rev/day**2]`, ...) is parsed
//! with the grammar `term (('*' | '/') term)*`, where `term` is a base unit
//! optionally raised to an integer power with `**`. It is accepted in place of
//! the declared unit only if both have the same physical dimension.
//!
//! ```rust
//! use ccsds_ndm::units::{Unit, KM, KM2_S};
//!
//! let unit = Unit::parse("m**2/s").unwrap();
//! assert!(unit.same_dimension(&KM2_S));
//! assert_eq!(KM.to_si(1.5), 1500.0);
//! ```

use std::borrow::Cow;
use std::f64::consts::{PI, TAU};

/// Exponents of the base quantities of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub angle: i8,
}

impl Dimension {
    pub const NONE: Dimension = Dimension::new(0, 0, 0, 0);
    pub const LENGTH: Dimension = Dimension::new(1, 0, 0, 0);
    pub const MASS: Dimension = Dimension::new(0, 1, 0, 0);
    pub const TIME: Dimension = Dimension::new(0, 0, 1, 0);
    pub const ANGLE: Dimension = Dimension::new(0, 0, 0, 1);

    pub const fn new(length: i8, mass: i8, time: i8, angle: i8) -> Self {
        Dimension {
            length,
            mass,
            time,
            angle,
        }
    }

    /// `None` when an exponent leaves the `i8` range.
    fn raised(self, power: i8) -> Option<Self> {
        Some(Dimension::new(
            self.length.checked_mul(power)?,
            self.mass.checked_mul(power)?,
            self.time.checked_mul(power)?,
            self.angle.checked_mul(power)?,
        ))
    }

    fn times(self, other: Dimension) -> Option<Self> {
        Some(Dimension::new(
            self.length.checked_add(other.length)?,
            self.mass.checked_add(other.mass)?,
            self.time.checked_add(other.time)?,
            self.angle.checked_add(other.angle)?,
        ))
    }
}

/// A physical unit: a display name, a scale factor to SI and a dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    name: Cow<'static, str>,
    scale: f64,
    dimension: Dimension,
}

macro_rules! unit {
    ($name:literal, $scale:expr, $l:literal, $m:literal, $t:literal, $a:literal) => {
        Unit {
            name: Cow::Borrowed($name),
            scale: $scale,
            dimension: Dimension::new($l, $m, $t, $a),
        }
    };
}

const DAY: f64 = 86400.0;

pub const ONE: Unit = unit!("n/a", 1.0, 0, 0, 0, 0);
pub const PERCENT: Unit = unit!("%", 0.01, 0, 0, 0, 0);
pub const M: Unit = unit!("m", 1.0, 1, 0, 0, 0);
pub const KM: Unit = unit!("km", 1000.0, 1, 0, 0, 0);
pub const M_S: Unit = unit!("m/s", 1.0, 1, 0, -1, 0);
pub const KM_S: Unit = unit!("km/s", 1000.0, 1, 0, -1, 0);
pub const KM_S2: Unit = unit!("km/s**2", 1000.0, 1, 0, -2, 0);
pub const M2: Unit = unit!("m**2", 1.0, 2, 0, 0, 0);
pub const KM2: Unit = unit!("km**2", 1.0e6, 2, 0, 0, 0);
pub const KM2_S: Unit = unit!("km**2/s", 1.0e6, 2, 0, -1, 0);
pub const KM2_S2: Unit = unit!("km**2/s**2", 1.0e6, 2, 0, -2, 0);
pub const KM3_S2: Unit = unit!("km**3/s**2", 1.0e9, 3, 0, -2, 0);
pub const KG: Unit = unit!("kg", 1.0, 0, 1, 0, 0);
pub const S: Unit = unit!("s", 1.0, 0, 0, 1, 0);
pub const S_INV: Unit = unit!("1/s", 1.0, 0, 0, -1, 0);
pub const D: Unit = unit!("d", DAY, 0, 0, 1, 0);
pub const DEG: Unit = unit!("deg", PI / 180.0, 0, 0, 0, 1);
pub const DEG_S: Unit = unit!("deg/s", PI / 180.0, 0, 0, -1, 1);
pub const REV_DAY: Unit = unit!("rev/day", TAU / DAY, 0, 0, -1, 1);
pub const REV_DAY2: Unit = unit!("rev/day**2", TAU / (DAY * DAY), 0, 0, -2, 1);
pub const REV_DAY3: Unit = unit!("rev/day**3", TAU / (DAY * DAY * DAY), 0, 0, -3, 1);
pub const ER_INV: Unit = unit!("1/ER", 1.0 / EARTH_RADIUS, -1, 0, 0, 0);
pub const KG_M2: Unit = unit!("kg*m**2", 1.0, 2, 1, 0, 0);
pub const N: Unit = unit!("N", 1.0, 1, 1, -2, 0);
pub const N_M: Unit = unit!("N*m", 1.0, 2, 1, -2, 0);

/// Earth radius used by the `ER` unit of TLE drag terms.
const EARTH_RADIUS: f64 = 6_378_135.0;

fn base(symbol: &str) -> Option<(f64, Dimension)> {
    let found = match symbol {
        "1" => (1.0, Dimension::NONE),
        "%" => (0.01, Dimension::NONE),
        "m" => (1.0, Dimension::LENGTH),
        "km" => (1000.0, Dimension::LENGTH),
        "ER" => (EARTH_RADIUS, Dimension::LENGTH),
        "g" => (1.0e-3, Dimension::MASS),
        "kg" => (1.0, Dimension::MASS),
        "s" => (1.0, Dimension::TIME),
        "min" => (60.0, Dimension::TIME),
        "h" => (3600.0, Dimension::TIME),
        "d" | "day" => (DAY, Dimension::TIME),
        "rad" => (1.0, Dimension::ANGLE),
        "deg" => (PI / 180.0, Dimension::ANGLE),
        "rev" => (TAU, Dimension::ANGLE),
        "N" => (1.0, Dimension::new(1, 1, -2, 0)),
        _ => return None,
    };
    Some(found)
}

impl Unit {
    /// Parses a unit as found between the brackets of a KVN line or in an XML `units` attribute.
    ///
    /// Returns `None` for unknown symbols and malformed expressions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ccsds_ndm::units::{Unit, ONE, REV_DAY2};
    ///
    /// assert_eq!(Unit::parse("n/a"), Some(ONE));
    /// let unit = Unit::parse("rev/day**2").unwrap();
    /// assert!(unit.same_dimension(&REV_DAY2));
    /// assert!(Unit::parse("furlong").is_none());
    /// assert!(Unit::parse("km/").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Unit> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
            return Some(ONE);
        }

        let bytes = trimmed.as_bytes();
        let mut scale = 1.0;
        let mut dimension = Dimension::NONE;
        let mut divide = false;
        let mut i = 0;
        loop {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'%') {
                i += 1;
            }
            let (factor, dim) = base(&trimmed[start..i])?;

            let mut power: i8 = 1;
            if trimmed[i..].starts_with("**") {
                i += 2;
                let exponent_start = i;
                if i < bytes.len() && (bytes[i] == b'-' || bytes[i] == b'+') {
                    i += 1;
                }
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                power = trimmed[exponent_start..i].parse().ok()?;
            }
            if divide {
                power = power.checked_neg()?;
            }
            scale *= factor.powi(i32::from(power));
            dimension = dimension.times(dim.raised(power)?)?;

            match bytes.get(i) {
                None => break,
                Some(b'*') => divide = false,
                Some(b'/') => divide = true,
                Some(_) => return None,
            }
            i += 1;
        }

        Some(Unit {
            name: Cow::Owned(trimmed.to_string()),
            scale,
            dimension,
        })
    }

    /// Name of the unit as written in messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Whether this is the dimensionless unit `n/a`, which is never written out.
    pub fn is_one(&self) -> bool {
        self.name == "n/a"
    }

    /// Whether values in `self` can be converted to `other`.
    pub fn same_dimension(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Converts a value expressed in this unit to SI.
    pub fn to_si(&self, value: f64) -> f64 {
        value * self.scale
    }

    /// Converts an SI value to this unit.
    pub fn from_si(&self, value: f64) -> f64 {
        value / self.scale
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compound_units() {
        let unit = Unit::parse("km**2/s**2").unwrap();
        assert_eq!(unit.dimension(), KM2_S2.dimension());
        assert_eq!(unit.to_si(1.0), 1.0e6);

        let torque = Unit::parse("N*m").unwrap();
        assert!(torque.same_dimension(&N_M));

        let inertia = Unit::parse("kg*m**2").unwrap();
        assert!(inertia.same_dimension(&KG_M2));
    }

    #[test]
    fn test_parse_inverse_units() {
        let bstar = Unit::parse("1/ER").unwrap();
        assert!(bstar.same_dimension(&ER_INV));
        assert!((bstar.to_si(1.0) - 1.0 / EARTH_RADIUS).abs() < 1e-20);
    }

    #[test]
    fn test_angles_convert_to_radians() {
        assert!((DEG.to_si(180.0) - PI).abs() < 1e-15);
        assert!((REV_DAY.to_si(1.0) - TAU / 86400.0).abs() < 1e-18);
        assert!((DEG.from_si(DEG.to_si(51.6416)) - 51.6416).abs() < 1e-12);
    }

    #[test]
    fn test_incompatible_dimensions() {
        let meters = Unit::parse("m").unwrap();
        assert!(meters.same_dimension(&KM));
        assert!(!meters.same_dimension(&KM_S));
        assert!(!Unit::parse("kg").unwrap().same_dimension(&N));
    }

    #[test]
    fn test_malformed_units() {
        assert!(Unit::parse("km**").is_none());
        assert!(Unit::parse("km s").is_none());
        assert!(Unit::parse("*km").is_none());
        assert!(Unit::parse("parsec").is_none());
    }

    #[test]
    fn test_exponent_overflow_is_rejected() {
        assert!(Unit::parse("N**100").is_none());
        assert!(Unit::parse("1/m**-128").is_none());
        assert!(Unit::parse("m**100*m**100").is_none());
        assert!(Unit::parse("m**300").is_none());

        let tiny = Unit::parse("m**-128").unwrap();
        assert_eq!(tiny.dimension(), Dimension::new(-128, 0, 0, 0));
    }

    #[test]
    fn test_percent_and_days() {
        assert_eq!(PERCENT.to_si(50.0), 0.5);
        assert_eq!(Unit::parse("day").unwrap().to_si(1.0), 86400.0);
        assert!(Unit::parse("%").unwrap().same_dimension(&ONE));
    }
}
