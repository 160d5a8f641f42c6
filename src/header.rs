//! Message header, common to all message types.

use crate::container::{mandatory, Builder, Validate};
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::section::SectionName;
use crate::time::Epoch;
use crate::token::Token;
use serde::{Deserialize, Serialize};

keywords! {
    pub enum HeaderKey {
        Classification => "CLASSIFICATION",
        CreationDate => "CREATION_DATE",
        Originator => "ORIGINATOR",
        MessageId => "MESSAGE_ID",
    }
}

/// Header of a navigation data message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Header {
    pub comments: Vec<String>,
    /// Format version, from `CCSDS_xxx_VERS` or the root `version` attribute.
    pub format_version: f64,
    pub classification: Option<String>,
    pub creation_date: Option<Epoch>,
    pub originator: Option<String>,
    pub message_id: Option<String>,
}

commented!(Header);

approx_struct!(Header {
    comments,
    format_version,
    classification,
    creation_date,
    originator,
    message_id,
});

impl Header {
    /// Sets a header field from `token`.
    ///
    /// `CLASSIFICATION` and `MESSAGE_ID` only exist from format version
    /// `gated_from` on. Returns `false` for keywords that are not header keywords.
    pub(crate) fn process(builder: &mut Builder<Header>, token: &Token, gated_from: f64) -> Result<bool> {
        let key = match HeaderKey::from_keyword(&token.name) {
            Some(key) => key,
            None => return Ok(false),
        };
        let version = builder.get().format_version;
        let header = builder.fields();
        match key {
            HeaderKey::Classification | HeaderKey::MessageId if version < gated_from => {
                return Err(Error::keyword_not_allowed(token, version));
            }
            HeaderKey::Classification => header.classification = Some(token.content_as_string()),
            HeaderKey::CreationDate => header.creation_date = Some(token.content_as_epoch()?),
            HeaderKey::Originator => header.originator = Some(token.content_as_string()),
            HeaderKey::MessageId => header.message_id = Some(token.content_as_string()),
        }
        Ok(true)
    }

    pub(crate) fn write(&self, generator: &mut dyn Generator) -> Result<()> {
        generator.enter_section(SectionName::HEADER)?;
        generator.write_comments(&self.comments)?;
        generator.write_string(HeaderKey::Classification.keyword(), self.classification.as_deref(), false)?;
        generator.write_epoch(HeaderKey::CreationDate.keyword(), self.creation_date.as_ref(), true)?;
        generator.write_string(HeaderKey::Originator.keyword(), self.originator.as_deref(), true)?;
        generator.write_string(HeaderKey::MessageId.keyword(), self.message_id.as_deref(), false)?;
        generator.exit_section()?;
        generator.write_empty_line()
    }
}

impl Validate for Header {
    fn validate(&self, source: &str) -> Result<()> {
        mandatory(&self.creation_date, source, "CREATION_DATE", "header")?;
        mandatory(&self.originator, source, "ORIGINATOR", "header")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(name: &str, value: &str) -> Token {
        Token::entry(name, value, None, 3, "hdr")
    }

    #[test]
    fn test_message_id_gated_by_version() {
        let mut builder = Builder::new(Header {
            format_version: 2.0,
            ..Default::default()
        });
        let err = Header::process(&mut builder, &token("MESSAGE_ID", "M-1"), 3.0).unwrap_err();
        assert!(matches!(err, Error::KeywordNotAllowed { .. }));

        let mut builder = Builder::new(Header {
            format_version: 3.0,
            ..Default::default()
        });
        assert!(Header::process(&mut builder, &token("MESSAGE_ID", "M-1"), 3.0).unwrap());
        assert_eq!(builder.get().message_id.as_deref(), Some("M-1"));
    }

    #[test]
    fn test_unknown_keyword_is_not_consumed() {
        let mut builder = Builder::new(Header::default());
        assert!(!Header::process(&mut builder, &token("OBJECT_NAME", "X"), 3.0).unwrap());
        assert!(builder.accepts_comments());
    }

    #[test]
    fn test_mandatory_fields() {
        let mut header = Header::default();
        assert!(matches!(
            header.validate("hdr"),
            Err(Error::MissingKeyword { ref keyword, .. }) if keyword == "CREATION_DATE"
        ));
        header.creation_date = Epoch::parse("2020-01-01T00:00:00");
        header.originator = Some("ESA".to_string());
        assert!(header.validate("hdr").is_ok());
    }
}
