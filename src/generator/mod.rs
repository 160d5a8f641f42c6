//! Generators writing messages in KVN or XML.
//!
//! A [`Generator`] is the output-side counterpart of a lexer: message writers
//! describe the document through one contract (open a section, write its
//! comments, write its entries, close it) and the generator renders it in its
//! own syntax. Output accumulates in memory. [`Generator::into_output`] hands
//! it over once the message is complete, so a failed generation never leaves
//! a truncated message behind.
//!
//! Sections must be closed in the reverse order they were opened. Closing a
//! section when none is open is a bug in the calling writer, and panics.
//!
//! ```rust
//! use ccsds_ndm::generator::{Generator, KvnGenerator};
//! use ccsds_ndm::section::SectionName;
//! use ccsds_ndm::units::KM;
//! use ccsds_ndm::GeneratorOptions;
//!
//! let mut generator = KvnGenerator::new(GeneratorOptions::kvn().with_units_column(40));
//! generator.enter_section(SectionName::METADATA).unwrap();
//! generator.write_f64("X", Some(7000000.0), &KM, true).unwrap();
//! generator.exit_section().unwrap();
//! assert_eq!(
//!     generator.into_inner(),
//!     format!("META_START\n{:<20} = {:<17}[km]\nMETA_STOP\n", "X", "7000.0")
//! );
//! ```

mod kvn;
mod xml;

pub use kvn::KvnGenerator;
pub use xml::XmlGenerator;

use crate::error::{Error, Result};
use crate::format::{ensure_finite, format_f64};
use crate::options::{GeneratorOptions, Syntax};
use crate::section::SectionName;
use crate::time::Epoch;
use crate::units::Unit;

/// Output side of the engine, implemented once per syntax.
pub trait Generator {
    fn syntax(&self) -> Syntax;

    /// Name of the output, for error messages.
    fn output_name(&self) -> &str;

    /// Writes the version line (KVN) or opens the root element (XML).
    fn start_message(&mut self, root: &str, version_key: &str, version: f64) -> Result<()>;

    /// Closes the root element (XML).
    fn end_message(&mut self, root: &str) -> Result<()>;

    fn enter_section(&mut self, section: SectionName) -> Result<()>;

    /// Closes the innermost open section.
    ///
    /// # Panics
    ///
    /// Panics if no section is open.
    fn exit_section(&mut self) -> Result<()>;

    fn write_comments(&mut self, comments: &[String]) -> Result<()>;

    /// Writes one entry.
    ///
    /// An absent value is skipped, unless it is mandatory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKeyword`] for a mandatory entry without value.
    fn write_entry(&mut self, key: &str, value: Option<&str>, unit: Option<&Unit>, mandatory: bool) -> Result<()>;

    /// Writes a user-defined parameter (`USER_DEFINED_<parameter>`).
    fn write_user_defined(&mut self, parameter: &str, value: &str) -> Result<()>;

    /// Writes one data line. XML wraps it in `element`.
    fn write_raw_data(&mut self, element: &str, line: &str) -> Result<()>;

    /// Separates blocks in KVN. Ignored in XML.
    fn write_empty_line(&mut self) -> Result<()>;

    /// The generated text.
    fn into_output(self: Box<Self>) -> String;

    fn write_string(&mut self, key: &str, value: Option<&str>, mandatory: bool) -> Result<()> {
        self.write_entry(key, value, None, mandatory)
    }

    /// Writes an SI value converted to `unit`.
    fn write_f64(&mut self, key: &str, value: Option<f64>, unit: &Unit, mandatory: bool) -> Result<()> {
        if let Some(value) = value {
            ensure_finite(self.output_name(), key, [value])?;
        }
        let text = value.map(|v| format_f64(unit.from_si(v)));
        self.write_entry(key, text.as_deref(), Some(unit), mandatory)
    }

    fn write_int(&mut self, key: &str, value: Option<i64>, mandatory: bool) -> Result<()> {
        let text = value.map(|v| v.to_string());
        self.write_entry(key, text.as_deref(), None, mandatory)
    }

    fn write_epoch(&mut self, key: &str, value: Option<&Epoch>, mandatory: bool) -> Result<()> {
        let text = value.map(Epoch::to_string);
        self.write_entry(key, text.as_deref(), None, mandatory)
    }

    fn write_list(&mut self, key: &str, values: &[String]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        self.write_entry(key, Some(&values.join(",")), None, false)
    }
}

/// Creates the generator for the syntax selected in `options`.
pub fn generator(options: GeneratorOptions) -> Box<dyn Generator> {
    match options.syntax {
        Syntax::Kvn => Box::new(KvnGenerator::new(options)),
        Syntax::Xml => Box::new(XmlGenerator::new(options)),
    }
}

fn missing(output_name: &str, key: &str, section: Option<&SectionName>) -> Error {
    let container = section.map(|s| s.xml).unwrap_or("message");
    Error::missing_keyword(output_name, key, container)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::DEG;

    #[test]
    fn test_factory_selects_syntax() {
        assert_eq!(generator(GeneratorOptions::kvn()).syntax(), Syntax::Kvn);
        assert_eq!(generator(GeneratorOptions::xml()).syntax(), Syntax::Xml);
    }

    #[test]
    fn test_missing_mandatory_entry() {
        for options in [GeneratorOptions::kvn(), GeneratorOptions::xml()] {
            let mut generator = generator(options.with_output_name("out"));
            generator.enter_section(SectionName::HEADER).unwrap();
            assert!(generator.write_string("MESSAGE_ID", None, false).is_ok());
            match generator.write_f64("INCLINATION", None, &DEG, true) {
                Err(Error::MissingKeyword {
                    source_name,
                    keyword,
                    container,
                }) => {
                    assert_eq!(source_name, "out");
                    assert_eq!(keyword, "INCLINATION");
                    assert_eq!(container, "header");
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    #[should_panic(expected = "no open section")]
    fn test_exit_without_enter_kvn() {
        let mut generator = generator(GeneratorOptions::kvn());
        let _ = generator.exit_section();
    }

    #[test]
    #[should_panic(expected = "no open section")]
    fn test_exit_without_enter_xml() {
        let mut generator = generator(GeneratorOptions::xml());
        let _ = generator.exit_section();
    }
}
