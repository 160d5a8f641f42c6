//! NDM surface syntaxes
//!
//! This module documents the two surface syntaxes of CCSDS Navigation Data
//! Messages as implemented by this library, and holds the number formatting
//! shared by both generators.
//!
//! # Logical model
//!
//! Every message has the same shape whatever its syntax:
//!
//! ```text
//! message
//! ├── version            CCSDS_OPM_VERS = 3.0  |  <opm id="CCSDS_OPM_VERS" version="3.0">
//! ├── header             COMMENT*, CLASSIFICATION, CREATION_DATE, ORIGINATOR, MESSAGE_ID
//! └── segment+
//!     ├── metadata       COMMENT*, keywords
//!     └── data           COMMENT*, keywords, blocks, data lines
//! ```
//!
//! Comments always come first in their container. Once a field has been set,
//! a later comment is rejected.
//!
//! # KVN
//!
//! One item per line, blank lines ignored:
//!
//! | Line shape | Token |
//! |------------|-------|
//! | `KEYWORD = value [unit]` | entry, unit optional |
//! | `COMMENT free text` | entry named `COMMENT` |
//! | `META_START`, `COVARIANCE_STOP`, ... | section start / stop |
//! | `2024-01-01T00:00:00 1.0 2.0 ...` | data line (starts with a digit, sign or dot) |
//!
//! **Rules**:
//! - The line is split on its first `=`. The keyword must be made of letters,
//!   digits and underscores, and is case-normalized to upper case
//! - A trailing `[...]` on the value is the unit of numeric keywords. Text
//!   keywords keep it as part of their value
//! - Values are trimmed and inner whitespace runs collapse to one space;
//!   comment text is only trimmed
//! - Sections without markers (the header, and the metadata and data of
//!   some message types) are delimited implicitly, by the first keyword or
//!   comment that belongs to the next section
//!
//! ```text
//! CCSDS_OPM_VERS = 3.0
//! CREATION_DATE  = 2022-11-06T09:23:57
//! ORIGINATOR     = JAXA
//!
//! COMMENT GEOCENTRIC, CARTESIAN, EARTH FIXED
//! OBJECT_NAME    = OSPREY 5
//! ...
//! X              = 6655.9942 [km]
//! ```
//!
//! # XML
//!
//! ```xml
//! <opm id="CCSDS_OPM_VERS" version="3.0">
//!   <header>
//!     <CREATION_DATE>2022-11-06T09:23:57</CREATION_DATE>
//!     <ORIGINATOR>JAXA</ORIGINATOR>
//!   </header>
//!   <body>
//!     <segment>
//!       <metadata>...</metadata>
//!       <data>
//!         <stateVector>
//!           <X units="km">6655.9942</X>
//!           ...
//!         </stateVector>
//!       </data>
//!     </segment>
//!   </body>
//! </opm>
//! ```
//!
//! **Rules**:
//! - An element holding text is an entry. Its `units` attribute is the unit
//! - An element holding elements is a section
//! - `<USER_DEFINED parameter="NAME">` is the entry `USER_DEFINED_NAME`.
//!   Parameter names are upper-cased like KVN keywords
//! - Data lines of OCM blocks are elements (`<trajLine>`, `<covLine>`, `<manLine>`)
//!   whose text is the line
//!
//! # Numbers
//!
//! Reals are written with the shortest decimal representation that parses
//! back to the same `f64` ([`format_f64`]). Values between `1e-5` and `1e15`
//! in magnitude use positional notation, with at least one fractional digit.
//! Others use scientific notation with an upper-case `E`. Columns of data
//! lines carry an explicit sign ([`format_signed`]). NaN and infinities are
//! neither read nor written.

use crate::error::{Error, Result};

/// Fails with [`Error::Unwritable`] unless every value is finite.
pub(crate) fn ensure_finite(
    output_name: &str,
    keyword: &str,
    values: impl IntoIterator<Item = f64>,
) -> Result<()> {
    match values.into_iter().find(|v| !v.is_finite()) {
        Some(value) => Err(Error::unwritable(
            output_name,
            keyword,
            &format!("{} is not a finite number", format_f64(value)),
        )),
        None => Ok(()),
    }
}

/// Formats a real number for output.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::format::format_f64;
///
/// assert_eq!(format_f64(3.0), "3.0");
/// assert_eq!(format_f64(-0.25), "-0.25");
/// assert_eq!(format_f64(1.5e-7), "1.5E-7");
/// assert_eq!(format_f64(398600.4415), "398600.4415");
/// ```
pub fn format_f64(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1.0e-5..1.0e15).contains(&magnitude) {
        let mut text = value.to_string();
        if !text.contains('.') {
            text.push_str(".0");
        }
        text
    } else {
        format!("{:e}", value).replace('e', "E")
    }
}

/// Formats a real number with an explicit sign, as data line columns are.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::format::format_signed;
///
/// assert_eq!(format_signed(2.5), "+2.5");
/// assert_eq!(format_signed(-2.5), "-2.5");
/// ```
pub fn format_signed(value: f64) -> String {
    let text = format_f64(value);
    if text.starts_with('-') || value.is_nan() {
        text
    } else {
        format!("+{}", text)
    }
}
