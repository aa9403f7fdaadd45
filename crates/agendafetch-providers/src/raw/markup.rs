//! The legacy XML export (`view=xml`).
//!
//! The document root is `<iconf>`; contributions and sessions may appear in
//! any order below it.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{AgendaError, AgendaResult};

const XML_DECLARATION: &str = "<?xml";
const ROOT_END: &str = "</iconf>";

/// A conference as served by the XML export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conference {
    #[serde(rename = "ID")]
    pub id: String,
    pub category: String,
    pub title: String,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    #[serde(rename = "contribution")]
    pub contributions: Vec<Contribution>,
    #[serde(rename = "session")]
    pub sessions: Vec<Session>,
    pub material: Vec<Material>,
    /// `True` when the server has retired this export.
    #[serde(rename = "_deprecated")]
    pub deprecated: Option<String>,
}

impl Conference {
    pub fn is_deprecated(&self) -> bool {
        self.deprecated.as_deref().map(str::trim) == Some("True")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    #[serde(rename = "ID")]
    pub id: String,
    pub title: String,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    #[serde(rename = "contribution")]
    pub contributions: Vec<Contribution>,
    pub material: Vec<Material>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contribution {
    #[serde(rename = "ID")]
    pub id: String,
    pub title: String,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub material: Vec<Material>,
    pub speakers: Vec<Speakers>,
    #[serde(rename = "subcontribution")]
    pub subcontributions: Vec<Contribution>,
}

/// A `<speakers>` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Speakers {
    #[serde(rename = "user")]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub name: Option<UserName>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserName {
    #[serde(rename = "@first")]
    pub first: String,
    #[serde(rename = "@middle")]
    pub middle: String,
    #[serde(rename = "@last")]
    pub last: String,
}

impl UserName {
    /// `first middle last`, with gaps left by empty parts removed.
    pub fn full_name(&self) -> String {
        let rest = format!("{} {}", self.middle, self.last);
        format!("{} {}", self.first, rest.trim()).trim().to_string()
    }
}

/// One material entry (`slides`, `poster`, `minutes`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    #[serde(rename = "ID")]
    pub id: String,
    pub title: String,
    pub link: Option<String>,
    /// Direct links some servers publish next to (or instead of) `files`.
    pub pdf: Option<String>,
    pub ps: Option<String>,
    pub pptx: Option<String>,
    pub ppt: Option<String>,
    pub files: Option<Files>,
}

impl Material {
    /// Uploaded files, empty when the entry has none.
    pub fn files(&self) -> &[File] {
        self.files.as_ref().map(|f| f.file.as_slice()).unwrap_or_default()
    }

    /// Direct links paired with the file type they point to.
    pub fn direct_links(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("pdf", &self.pdf),
            ("ps", &self.ps),
            ("ppt", &self.ppt),
            ("pptx", &self.pptx),
        ]
        .into_iter()
        .filter_map(|(kind, link)| {
            link.as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| (kind, l))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Files {
    pub file: Vec<File>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: Option<String>,
}

/// Cuts `text` down to the `<?xml … </iconf>` region.
///
/// Some servers wrap the export in HTML or trail it with debugging output.
///
/// # Errors
///
/// [`AgendaErrorCode::MalformedResponse`](crate::AgendaErrorCode::MalformedResponse)
/// when either marker is missing.
pub fn clean_markup(text: &str) -> AgendaResult<&str> {
    let start = text
        .find(XML_DECLARATION)
        .ok_or_else(|| AgendaError::malformed_response("no XML declaration in agenda export"))?;
    let end = text[start..]
        .find(ROOT_END)
        .map(|i| start + i + ROOT_END.len())
        .ok_or_else(|| AgendaError::malformed_response("no </iconf> in agenda export"))?;
    Ok(&text[start..end])
}

/// Parses an XML export into a [`Conference`].
///
/// # Errors
///
/// [`AgendaErrorCode::MalformedResponse`](crate::AgendaErrorCode::MalformedResponse)
/// when the document is not an agenda export.
pub fn parse_markup(text: &str) -> AgendaResult<Conference> {
    let cleaned = clean_markup(text)?;
    trace!(bytes = cleaned.len(), "parsing agenda markup");
    quick_xml::de::from_str(cleaned).map_err(|e| {
        AgendaError::malformed_response(format!("invalid agenda markup: {}", e)).with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgendaErrorCode;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<iconf>
  <ID>a042880</ID>
  <category>EvtGen</category>
  <title> EvtGen miniworkshop </title>
  <startDate>2005-01-21T09:00:00</startDate>
  <endDate>2005-01-21T19:00:00</endDate>
  <contribution>
    <ID>s1t15</ID>
    <title>Introduction</title>
    <startDate>2005-01-21T09:00:00</startDate>
    <endDate>2005-01-21T09:15:00</endDate>
    <speakers>
      <user><name first="P." middle="" last="BARTALINI"/></user>
    </speakers>
    <material>
      <ID>slides</ID>
      <title>slides</title>
      <files>
        <file><name>intro.pdf</name><type>pdf</type><url>http://x/intro.pdf</url></file>
        <file><name>intro.pptx</name><type>pptx</type><url>http://x/intro.pptx</url></file>
      </files>
    </material>
  </contribution>
  <session>
    <ID>1</ID>
    <title>Morning</title>
    <startDate>2005-01-21T10:00:00</startDate>
    <endDate>2005-01-21T12:00:00</endDate>
  </session>
  <contribution>
    <ID>s1t16</ID>
    <title>Late</title>
  </contribution>
</iconf>"#;

    #[test]
    fn parses_interleaved_contributions_and_sessions() {
        let conf = parse_markup(SAMPLE).unwrap();
        assert_eq!(conf.id, "a042880");
        assert_eq!(conf.title.trim(), "EvtGen miniworkshop");
        assert_eq!(conf.contributions.len(), 2);
        assert_eq!(conf.sessions.len(), 1);
        assert!(!conf.is_deprecated());

        let talk = &conf.contributions[0];
        assert_eq!(talk.start_date.as_deref(), Some("2005-01-21T09:00:00"));
        assert_eq!(talk.material[0].files().len(), 2);
        let name = talk.speakers[0].users[0].name.as_ref().unwrap();
        assert_eq!(name.full_name(), "P. BARTALINI");
        assert!(conf.contributions[1].start_date.is_none());
    }

    #[test]
    fn cleanup_strips_surrounding_noise() {
        let wrapped = format!("<html><body>{}</body></html>trailing", SAMPLE);
        let cleaned = clean_markup(&wrapped).unwrap();
        assert!(cleaned.starts_with("<?xml"));
        assert!(cleaned.ends_with("</iconf>"));
    }

    #[test]
    fn missing_markers_are_malformed() {
        let err = clean_markup("<html>Not found</html>").unwrap_err();
        assert_eq!(err.code(), AgendaErrorCode::MalformedResponse);

        let err = parse_markup("<?xml version=\"1.0\"?><iconf><ID>1</ID>").unwrap_err();
        assert_eq!(err.code(), AgendaErrorCode::MalformedResponse);
    }

    #[test]
    fn deprecated_flag() {
        let conf = parse_markup(
            "<?xml version=\"1.0\"?><iconf><ID>1</ID><_deprecated>True</_deprecated></iconf>",
        )
        .unwrap();
        assert!(conf.is_deprecated());
    }

    #[test]
    fn speaker_names_collapse_empty_parts() {
        let name = UserName {
            first: "".into(),
            middle: "".into(),
            last: "Smith".into(),
        };
        assert_eq!(name.full_name(), "Smith");
        let name = UserName {
            first: "Ann".into(),
            middle: "B.".into(),
            last: "Smith".into(),
        };
        assert_eq!(name.full_name(), "Ann B. Smith");
    }

    #[test]
    fn direct_links_skip_blank_entries() {
        let material = Material {
            pdf: Some("http://x/a.pdf".into()),
            ppt: Some("  ".into()),
            ..Material::default()
        };
        let links: Vec<_> = material.direct_links().collect();
        assert_eq!(links, vec![("pdf", "http://x/a.pdf")]);
        assert!(material.files().is_empty());
    }
}
