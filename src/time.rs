//! Dates and time scales.
//!
//! Dates are opaque calendar values: they are parsed, compared and written
//! back, never converted between time scales. The time scale of a segment
//! is carried separately by its `TIME_SYSTEM` keyword.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar date and time, to the nanosecond.
///
/// Both calendar (`2024-03-05T12:00:00.5`) and day-of-year (`2024-065T12:00:00.5`)
/// forms are accepted, with an optional trailing `Z`. Output always uses the
/// calendar form.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::Epoch;
///
/// let a = Epoch::parse("2024-065T12:00:00.25").unwrap();
/// let b = Epoch::parse("2024-03-05T12:00:00.250Z").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "2024-03-05T12:00:00.250");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Epoch(pub NaiveDateTime);

const CALENDAR: &str = "%Y-%m-%dT%H:%M:%S%.f";
const ORDINAL: &str = "%Y-%jT%H:%M:%S%.f";

impl Epoch {
    /// Parses a CCSDS date, returning `None` when the text is not a date.
    pub fn parse(text: &str) -> Option<Epoch> {
        let text = text.trim();
        let text = text.strip_suffix('Z').unwrap_or(text);
        NaiveDateTime::parse_from_str(text, CALENDAR)
            .or_else(|_| NaiveDateTime::parse_from_str(text, ORDINAL))
            .ok()
            .map(Epoch)
    }

    /// Seconds elapsed from `earlier` to `self`.
    pub fn seconds_since(&self, earlier: &Epoch) -> f64 {
        let delta = self.0 - earlier.0;
        match delta.num_nanoseconds() {
            Some(nanos) => nanos as f64 * 1.0e-9,
            None => delta.num_milliseconds() as f64 * 1.0e-3,
        }
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CALENDAR))
    }
}

/// Time tag of an OCM data line: an offset in seconds from `EPOCH_TZERO`, or an absolute date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimeTag {
    Relative(f64),
    Absolute(Epoch),
}

impl TimeTag {
    pub fn parse(text: &str) -> Option<TimeTag> {
        if text.contains('T') {
            Epoch::parse(text).map(TimeTag::Absolute)
        } else {
            crate::token::parse_f64(text).map(TimeTag::Relative)
        }
    }
}

impl fmt::Display for TimeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeTag::Relative(offset) => f.write_str(&crate::format::format_f64(*offset)),
            TimeTag::Absolute(epoch) => epoch.fmt(f),
        }
    }
}

impl crate::approx::ApproxEq for TimeTag {
    fn approx_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TimeTag::Relative(a), TimeTag::Relative(b)) => crate::approx::close(*a, *b),
            (TimeTag::Absolute(a), TimeTag::Absolute(b)) => a == b,
            _ => false,
        }
    }
}

ccsds_enum! {
    /// Time scale of the dates of a segment.
    pub enum TimeSystem {
        Gmst => "GMST",
        Gps => "GPS",
        Met => "MET",
        Mrt => "MRT",
        Sclk => "SCLK",
        Tai => "TAI",
        Tcb => "TCB",
        Tdb => "TDB",
        Tcg => "TCG",
        Tt => "TT",
        Ut1 => "UT1",
        Utc => "UTC",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Enumerated;

    #[test]
    fn test_parse_forms() {
        let epoch = Epoch::parse("1998-12-18T14:28:15.1172").unwrap();
        assert_eq!(epoch.to_string(), "1998-12-18T14:28:15.117200");
        assert!(Epoch::parse("2000-01-01T00:00:00").is_some());
        assert!(Epoch::parse("2000-001T00:00:00Z").is_some());
        assert!(Epoch::parse("yesterday").is_none());
        assert!(Epoch::parse("2000-13-01T00:00:00").is_none());
    }

    #[test]
    fn test_display_round_trips() {
        for text in ["2021-06-30T23:59:59.999999999", "2003-07-11T00:00:00"] {
            let epoch = Epoch::parse(text).unwrap();
            assert_eq!(Epoch::parse(&epoch.to_string()), Some(epoch));
        }
    }

    #[test]
    fn test_seconds_since() {
        let a = Epoch::parse("2020-01-01T00:00:00").unwrap();
        let b = Epoch::parse("2020-01-01T00:01:30.5").unwrap();
        assert_eq!(b.seconds_since(&a), 90.5);
        assert!(a < b);
    }

    #[test]
    fn test_time_tags() {
        assert_eq!(TimeTag::parse("120.5"), Some(TimeTag::Relative(120.5)));
        assert!(matches!(
            TimeTag::parse("2020-01-01T00:00:00"),
            Some(TimeTag::Absolute(_))
        ));
        assert_eq!(TimeTag::parse("abc"), None);
    }

    #[test]
    fn test_time_system_values() {
        assert_eq!(TimeSystem::from_value("utc"), Some(TimeSystem::Utc));
        assert_eq!(TimeSystem::Tdb.as_str(), "TDB");
        assert_eq!(TimeSystem::from_value("LOCAL"), None);
    }
}
