use super::{missing, Generator};
use crate::error::Result;
use crate::format::format_f64;
use crate::options::{GeneratorOptions, Syntax};
use crate::section::SectionName;
use crate::token::COMMENT;
use crate::units::Unit;
use quick_xml::escape::escape;
use tracing::trace;

/// Generator for the XML syntax.
pub struct XmlGenerator {
    output: String,
    options: GeneratorOptions,
    sections: Vec<SectionName>,
    root_open: bool,
}

impl XmlGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        XmlGenerator {
            output: String::with_capacity(8192),
            options,
            sections: Vec::new(),
            root_open: false,
        }
    }

    pub fn into_inner(self) -> String {
        self.output
    }

    fn indent(&mut self) {
        let level = self.sections.len() + usize::from(self.root_open);
        self.output.push_str(&" ".repeat(level * self.options.indent));
    }

    fn element(&mut self, name: &str, attribute: Option<(&str, &str)>, text: &str) {
        self.indent();
        self.output.push('<');
        self.output.push_str(name);
        if let Some((key, value)) = attribute {
            self.output
                .push_str(&format!(" {}=\"{}\"", key, escape(value)));
        }
        self.output.push('>');
        self.output.push_str(&escape(text));
        self.output.push_str("</");
        self.output.push_str(name);
        self.output.push_str(">\n");
    }
}

impl Generator for XmlGenerator {
    fn syntax(&self) -> Syntax {
        Syntax::Xml
    }

    fn output_name(&self) -> &str {
        &self.options.output_name
    }

    fn start_message(&mut self, root: &str, version_key: &str, version: f64) -> Result<()> {
        self.output
            .push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.output.push_str(&format!(
            "<{} id=\"{}\" version=\"{}\">\n",
            root,
            version_key,
            format_f64(version)
        ));
        self.root_open = true;
        Ok(())
    }

    fn end_message(&mut self, root: &str) -> Result<()> {
        self.root_open = false;
        self.output.push_str(&format!("</{}>\n", root));
        Ok(())
    }

    fn enter_section(&mut self, section: SectionName) -> Result<()> {
        trace!(section = section.xml, "entering section");
        self.indent();
        self.output.push_str(&format!("<{}>\n", section.xml));
        self.sections.push(section);
        Ok(())
    }

    fn exit_section(&mut self) -> Result<()> {
        let section = match self.sections.pop() {
            Some(section) => section,
            None => panic!("exit_section called with no open section"),
        };
        self.indent();
        self.output.push_str(&format!("</{}>\n", section.xml));
        Ok(())
    }

    fn write_comments(&mut self, comments: &[String]) -> Result<()> {
        for comment in comments {
            self.element(COMMENT, None, comment);
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
        let unit = unit
            .filter(|u| self.options.writes_units() && !u.is_one())
            .map(|u| ("units", u.name()));
        self.element(key, unit, value);
        Ok(())
    }

    fn write_user_defined(&mut self, parameter: &str, value: &str) -> Result<()> {
        self.element("USER_DEFINED", Some(("parameter", parameter)), value);
        Ok(())
    }

    fn write_raw_data(&mut self, element: &str, line: &str) -> Result<()> {
        self.element(element, None, line);
        Ok(())
    }

    fn write_empty_line(&mut self) -> Result<()> {
        Ok(())
    }

    fn into_output(self: Box<Self>) -> String {
        self.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::KM;

    #[test]
    fn test_document_layout() {
        let mut generator = XmlGenerator::new(GeneratorOptions::xml().with_units_column(1));
        generator.start_message("opm", "CCSDS_OPM_VERS", 3.0).unwrap();
        generator.enter_section(SectionName::HEADER).unwrap();
        generator
            .write_comments(&["a < b & c".to_string()])
            .unwrap();
        generator.write_entry("X", Some("6655.9942"), Some(&KM), true).unwrap();
        generator.exit_section().unwrap();
        generator.end_message("opm").unwrap();
        assert_eq!(
            generator.into_inner(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <opm id=\"CCSDS_OPM_VERS\" version=\"3.0\">\n  \
             <header>\n    \
             <COMMENT>a &lt; b &amp; c</COMMENT>\n    \
             <X units=\"km\">6655.9942</X>\n  \
             </header>\n\
             </opm>\n"
        );
    }

    #[test]
    fn test_units_disabled_and_user_defined() {
        let mut generator = XmlGenerator::new(GeneratorOptions::xml().with_indent(0));
        generator.write_entry("X", Some("1.0"), Some(&KM), true).unwrap();
        generator.write_user_defined("EARTH_MODEL", "WGS-84").unwrap();
        assert_eq!(
            generator.into_inner(),
            "<X>1.0</X>\n<USER_DEFINED parameter=\"EARTH_MODEL\">WGS-84</USER_DEFINED>\n"
        );
    }
}
