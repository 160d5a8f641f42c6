use super::{missing, Generator};
use crate::error::{Error, Result};
use crate::format::format_f64;
use crate::options::{GeneratorOptions, Syntax};
use crate::section::SectionName;
use crate::token::COMMENT;
use crate::units::Unit;
use tracing::trace;

/// Generator for keyword = value notation.
pub struct KvnGenerator {
    output: String,
    options: GeneratorOptions,
    sections: Vec<SectionName>,
}

impl KvnGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        KvnGenerator {
            output: String::with_capacity(4096),
            options,
            sections: Vec::new(),
        }
    }

    pub fn into_inner(self) -> String {
        self.output
    }

    /// Fails for text that would spill onto another line.
    fn single_line(&self, keyword: &str, text: &str) -> Result<()> {
        if text.contains(['\n', '\r']) {
            return Err(Error::unwritable(
                &self.options.output_name,
                keyword,
                "KVN values and comments cannot span several lines",
            ));
        }
        Ok(())
    }

    fn write_line(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }
}

impl Generator for KvnGenerator {
    fn syntax(&self) -> Syntax {
        Syntax::Kvn
    }

    fn output_name(&self) -> &str {
        &self.options.output_name
    }

    fn start_message(&mut self, _root: &str, version_key: &str, version: f64) -> Result<()> {
        self.write_entry(version_key, Some(&format_f64(version)), None, true)
    }

    fn end_message(&mut self, _root: &str) -> Result<()> {
        Ok(())
    }

    fn enter_section(&mut self, section: SectionName) -> Result<()> {
        trace!(section = section.xml, "entering section");
        if let Some(marker) = section.kvn {
            self.write_line(&format!("{}_START", marker));
        }
        self.sections.push(section);
        Ok(())
    }

    fn exit_section(&mut self) -> Result<()> {
        let section = match self.sections.pop() {
            Some(section) => section,
            None => panic!("exit_section called with no open section"),
        };
        if let Some(marker) = section.kvn {
            self.write_line(&format!("{}_STOP", marker));
        }
        Ok(())
    }

    fn write_comments(&mut self, comments: &[String]) -> Result<()> {
        for comment in comments {
            self.single_line(COMMENT, comment)?;
            if comment.is_empty() {
                self.write_line(COMMENT);
            } else {
                self.write_line(&format!("{} {}", COMMENT, comment));
            }
        }
        Ok(())
    }

    fn write_entry(&mut self, key: &str, value: Option<&str>, unit: Option<&Unit>, mandatory: bool) -> Result<()> {
        let value = match value {
            Some(value) => value,
            None if mandatory => {
                return Err(missing(&self.options.output_name, key, self.sections.last()))
            }
            None => return Ok(()),
        };
        self.single_line(key, value)?;

        let mut line = format!("{:<width$} = {}", key, value, width = self.options.key_width);
        if let Some(unit) = unit.filter(|u| self.options.writes_units() && !u.is_one()) {
            let length = line.chars().count();
            if length < self.options.units_column {
                line.push_str(&" ".repeat(self.options.units_column - length));
            } else {
                line.push(' ');
            }
            line.push('[');
            line.push_str(unit.name());
            line.push(']');
        }
        self.write_line(&line);
        Ok(())
    }

    fn write_user_defined(&mut self, parameter: &str, value: &str) -> Result<()> {
        let key = format!("USER_DEFINED_{}", parameter);
        self.write_entry(&key, Some(value), None, false)
    }

    fn write_raw_data(&mut self, _element: &str, line: &str) -> Result<()> {
        self.write_line(line);
        Ok(())
    }

    fn write_empty_line(&mut self) -> Result<()> {
        self.output.push('\n');
        Ok(())
    }

    fn into_output(self: Box<Self>) -> String {
        self.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{KG, ONE};

    #[test]
    fn test_units_column() {
        let mut generator = KvnGenerator::new(GeneratorOptions::kvn().with_units_column(30));
        generator.write_entry("MASS", Some("100.0"), Some(&KG), true).unwrap();
        generator.write_entry("DRAG_COEFF", Some("2.2"), Some(&ONE), true).unwrap();
        generator
            .write_entry("A_VERY_LONG_KEYWORD_NAME", Some("123456789.0"), Some(&KG), true)
            .unwrap();
        let output = generator.into_inner();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0].find('['), Some(30));
        assert!(lines[0].ends_with("[kg]"));
        assert!(!lines[1].contains('['));
        assert!(lines[2].ends_with("123456789.0 [kg]"));
    }

    #[test]
    fn test_multi_line_text_is_rejected() {
        let mut generator = KvnGenerator::new(GeneratorOptions::kvn().with_output_name("out.kvn"));
        match generator.write_string("OBJECT_NAME", Some("SAT\nX = 1"), true) {
            Err(Error::Unwritable { output_name, keyword, .. }) => {
                assert_eq!(output_name, "out.kvn");
                assert_eq!(keyword, "OBJECT_NAME");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(generator.write_comments(&["one\r\ntwo".to_string()]).is_err());
        assert!(generator.write_string("OBJECT_NAME", Some("SAT [A]"), true).is_ok());
    }

    #[test]
    fn test_units_disabled() {
        let mut generator = KvnGenerator::new(GeneratorOptions::kvn());
        generator.write_entry("MASS", Some("100.0"), Some(&KG), true).unwrap();
        assert_eq!(generator.into_inner(), format!("{:<20} = 100.0\n", "MASS"));
    }

    #[test]
    fn test_sections_and_comments() {
        let mut generator = KvnGenerator::new(GeneratorOptions::kvn().with_key_width(0));
        generator.start_message("oem", "CCSDS_OEM_VERS", 3.0).unwrap();
        generator.enter_section(SectionName::METADATA).unwrap();
        generator
            .write_comments(&["first".to_string(), String::new()])
            .unwrap();
        generator.enter_section(SectionName::IMPLICIT_DATA).unwrap();
        generator.write_raw_data("stateVector", "2020-01-01T00:00:00 +1.0").unwrap();
        generator.exit_section().unwrap();
        generator.exit_section().unwrap();
        generator.write_user_defined("FOO", "bar").unwrap();
        assert_eq!(
            generator.into_inner(),
            "CCSDS_OEM_VERS = 3.0\nMETA_START\nCOMMENT first\nCOMMENT\n\
             2020-01-01T00:00:00 +1.0\nMETA_STOP\nUSER_DEFINED_FOO = bar\n"
        );
    }
}
