//! Configuration options for NDM generation.
//!
//! This module provides types to customize generated messages:
//!
//! - [`GeneratorOptions`]: Main configuration struct
//! - [`Syntax`]: Choice of surface syntax (KVN or XML)
//!
//! ## Examples
//!
//! ```rust
//! use ccsds_ndm::{GeneratorOptions, Syntax};
//!
//! // KVN with units aligned on column 60
//! let options = GeneratorOptions::kvn().with_units_column(60);
//! assert_eq!(options.syntax, Syntax::Kvn);
//!
//! // XML with 4-space indentation and no units attributes
//! let options = GeneratorOptions::xml().with_indent(4).with_units_column(0);
//! assert!(!options.writes_units());
//! ```

use serde::{Deserialize, Serialize};

/// Surface syntax of a navigation data message.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::Syntax;
///
/// assert_eq!(Syntax::detect("CCSDS_OPM_VERS = 3.0"), Syntax::Kvn);
/// assert_eq!(Syntax::detect("  <?xml version=\"1.0\"?><opm/>"), Syntax::Xml);
/// assert_eq!(Syntax::Xml.as_str(), "XML");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Syntax {
    /// Keyword = value notation
    #[default]
    Kvn,
    /// XML schema notation
    Xml,
}

impl Syntax {
    /// Returns the name of this syntax.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Syntax::Kvn => "KVN",
            Syntax::Xml => "XML",
        }
    }

    /// Guesses the syntax of a message from its first significant character.
    ///
    /// Anything starting with `<` (after an optional byte order mark and
    /// whitespace) is XML, everything else is KVN.
    #[must_use]
    pub fn detect(text: &str) -> Syntax {
        let trimmed = text.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('<') {
            Syntax::Xml
        } else {
            Syntax::Kvn
        }
    }
}

impl std::fmt::Display for Syntax {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration options for NDM generation.
///
/// Controls the surface syntax and the layout details of generated messages.
///
/// # Examples
///
/// ```rust
/// use ccsds_ndm::{GeneratorOptions, Syntax};
///
/// // Default: KVN without units
/// let options = GeneratorOptions::new();
/// assert_eq!(options.units_column, 0);
///
/// // Custom configuration
/// let options = GeneratorOptions::new()
///     .with_syntax(Syntax::Xml)
///     .with_units_column(1)
///     .with_indent(4)
///     .with_output_name("orbit.xml");
/// assert!(options.writes_units());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorOptions {
    pub syntax: Syntax,
    /// Column where KVN units start; `0` disables unit emission in both syntaxes.
    pub units_column: usize,
    /// Spaces per nesting level (XML only).
    pub indent: usize,
    /// Width the KVN keywords are padded to before the `=` sign.
    pub key_width: usize,
    /// Name used in error messages about the generated output.
    pub output_name: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            syntax: Syntax::default(),
            units_column: 0,
            indent: 2,
            key_width: 20,
            output_name: "<output>".to_string(),
        }
    }
}

impl GeneratorOptions {
    /// Creates default options (KVN, no units, 20-character key padding).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ccsds_ndm::GeneratorOptions;
    ///
    /// let options = GeneratorOptions::new();
    /// assert_eq!(options.key_width, 20);
    /// assert_eq!(options.indent, 2);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for KVN output.
    #[must_use]
    pub fn kvn() -> Self {
        Self::default()
    }

    /// Creates options for XML output.
    #[must_use]
    pub fn xml() -> Self {
        GeneratorOptions {
            syntax: Syntax::Xml,
            ..Default::default()
        }
    }

    /// Sets the surface syntax.
    #[must_use]
    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Sets the units column.
    ///
    /// In KVN, units are padded to start at this column. In XML any non-zero
    /// value turns on `units` attributes. Zero disables units altogether.
    #[must_use]
    pub fn with_units_column(mut self, units_column: usize) -> Self {
        self.units_column = units_column;
        self
    }

    /// Sets the indentation size (number of spaces per level).
    ///
    /// Default is 2. Only affects XML output.
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the width KVN keywords are padded to.
    #[must_use]
    pub fn with_key_width(mut self, key_width: usize) -> Self {
        self.key_width = key_width;
        self
    }

    /// Sets the name used to identify the output in error messages.
    #[must_use]
    pub fn with_output_name(mut self, output_name: &str) -> Self {
        self.output_name = output_name.to_string();
        self
    }

    /// Whether units are emitted at all.
    #[must_use]
    pub const fn writes_units(&self) -> bool {
        self.units_column > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_skips_bom_and_whitespace() {
        assert_eq!(Syntax::detect("\u{feff}\n  <ndm>"), Syntax::Xml);
        assert_eq!(Syntax::detect(""), Syntax::Kvn);
        assert_eq!(Syntax::detect("COMMENT <not xml>"), Syntax::Kvn);
    }

    #[test]
    fn test_builders() {
        let options = GeneratorOptions::xml()
            .with_units_column(60)
            .with_key_width(25)
            .with_output_name("out.xml");
        assert_eq!(options.syntax, Syntax::Xml);
        assert_eq!(options.units_column, 60);
        assert_eq!(options.key_width, 25);
        assert_eq!(options.output_name, "out.xml");
        assert!(options.writes_units());
    }
}
