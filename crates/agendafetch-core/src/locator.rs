//! Agenda locations and request URLs.
//!
//! Indico installations have used several URL shapes over the years. This
//! module reduces all of them to a [`Location`] (site, subdirectory,
//! identifier) and builds the outbound request URLs for each [`Dialect`].
//!
//! # Example
//!
//! ```
//! use agendafetch_core::locator::parse_conference;
//!
//! let legacy = parse_conference("http://indico.example.org/conferenceDisplay.py?confId=14475").unwrap();
//! let modern = parse_conference("http://indico.example.org/event/14475/").unwrap();
//! assert_eq!(legacy, modern);
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::signing::Credentials;

/// Host used for bare numeric conference ids.
pub const DEFAULT_SITE: &str = "indico.cern.ch";

/// `…/[subdir/]…confId=<id>` on the old `.py` endpoints.
static LEGACY_CONFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?P<site>[^/]+)/(?P<subdir>.+/)?.*(?i:confId)=(?P<id>\w+)")
        .expect("Invalid legacy conference regex")
});

/// `…/[subdir/]event/<id>`.
static EVENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?P<site>[^/]+)/(?P<subdir>.+/)?event/(?P<id>\w+)")
        .expect("Invalid event regex")
});

/// Category references, tried in order.
static CATEGORY_REGEXES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"https?://(?P<site>[^/]+)/(?P<subdir>.+/)?export/categ/(?P<id>[^/?#]+?)\.ics",
        r"https?://(?P<site>[^/]+)/(?P<subdir>.+/)?category/(?P<id>[^/?#]+)",
        r"https?://(?P<site>[^/]+)/(?P<subdir>.+/)?.*categId=(?P<id>[^&/#]+)",
    ]
    .map(|pattern| Regex::new(pattern).expect("Invalid category regex"))
});

/// Errors raised while interpreting or building agenda URLs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("URL does not have confId parameter or does not start with http or https: {0:?}")]
    NotAConference(String),

    #[error("unable to interpret {0:?} as a category URL")]
    NotACategory(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("could not build a request URL: {0}")]
    InvalidUrl(String),
}

/// Where an agenda lives: host, optional path prefix and conference or
/// category id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub site: String,
    /// Path prefix without leading or trailing slash, empty when absent.
    pub subdirectory: String,
    pub identifier: String,
}

impl Location {
    pub fn new(
        site: impl Into<String>,
        subdirectory: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            subdirectory: subdirectory.into(),
            identifier: identifier.into(),
        }
    }

    /// A conference on [`DEFAULT_SITE`].
    pub fn from_id(id: u64) -> Self {
        Self::new(DEFAULT_SITE, "", id.to_string())
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    /// `scheme://site[/subdir]` with no trailing slash.
    fn root(&self, https: bool) -> String {
        let scheme = if https { "https" } else { "http" };
        if self.subdirectory.is_empty() {
            format!("{}://{}", scheme, self.site)
        } else {
            format!("{}://{}/{}", scheme, self.site, self.subdirectory)
        }
    }

    fn url(&self, https: bool, path_and_query: &str) -> Result<Url, LocatorError> {
        let raw = format!("{}{}", self.root(https), path_and_query);
        Url::parse(&raw).map_err(|e| LocatorError::InvalidUrl(format!("{}: {}", raw, e)))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agenda {} at {}", self.identifier, self.site)?;
        if !self.subdirectory.is_empty() {
            write!(f, "/{}", self.subdirectory)?;
        }
        Ok(())
    }
}

impl FromStr for Location {
    type Err = LocatorError;

    /// Accepts conference URLs and bare numeric ids.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(id) => Ok(Self::from_id(id)),
            Err(_) => parse_conference(s),
        }
    }
}

fn location_from(caps: &Captures<'_>) -> Location {
    let subdirectory = caps
        .name("subdir")
        .map(|m| m.as_str().trim_end_matches('/'))
        .unwrap_or_default();
    Location::new(&caps["site"], subdirectory, &caps["id"])
}

/// Parses any supported conference URL.
///
/// # Errors
///
/// [`LocatorError::NotAConference`] when no known shape matches.
pub fn parse_conference(url: &str) -> Result<Location, LocatorError> {
    [&*LEGACY_CONFERENCE_REGEX, &*EVENT_REGEX]
        .into_iter()
        .find_map(|re| re.captures(url))
        .map(|caps| location_from(&caps))
        .ok_or_else(|| LocatorError::NotAConference(url.to_string()))
}

/// Parses any supported category URL.
///
/// # Errors
///
/// [`LocatorError::NotACategory`] when no known shape matches.
pub fn parse_category(url: &str) -> Result<Location, LocatorError> {
    CATEGORY_REGEXES
        .iter()
        .find_map(|re| re.captures(url))
        .map(|caps| location_from(&caps))
        .ok_or_else(|| LocatorError::NotACategory(url.to_string()))
}

/// True when [`parse_category`] would succeed.
pub fn is_valid_category(url: &str) -> bool {
    CATEGORY_REGEXES.iter().any(|re| re.is_match(url))
}

/// Human-facing link to a conference page.
pub fn build_conference_url(location: &Location, modern: bool) -> String {
    if modern {
        format!("{}/event/{}", location.root(true), location.identifier)
    } else {
        format!(
            "{}/conferenceDisplay.py?confId={}",
            location.root(false),
            location.identifier
        )
    }
}

/// Signed URL of a category's iCalendar feed, covering `days_back` days.
///
/// # Errors
///
/// [`LocatorError::InvalidParameter`] when `days_back` is negative.
pub fn build_category_url(
    location: &Location,
    days_back: i64,
    credentials: &Credentials,
) -> Result<Url, LocatorError> {
    if days_back < 0 {
        return Err(LocatorError::InvalidParameter(format!(
            "days back must not be negative, got {}",
            days_back
        )));
    }
    let from = format!("-{}d", days_back);
    let params: Vec<(&str, &str)> = if days_back > 0 {
        vec![("from", from.as_str())]
    } else {
        Vec::new()
    };
    let path = format!("/export/categ/{}.ics", location.identifier);
    location.url(true, &credentials.sign(&path, &params))
}

/// The wire formats a host may serve a conference in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `conferenceOtherViews.py?confId=…&view=xml` over plain http.
    LegacyMarkup,
    /// `event/<id>/other-view?view=xml` over https.
    ModernMarkup,
    /// `export/event/<id>.json` over https.
    Json,
}

impl Dialect {
    /// Markup dialect for a host, depending on whether it takes the modern path.
    pub fn markup(modern: bool) -> Self {
        if modern {
            Self::ModernMarkup
        } else {
            Self::LegacyMarkup
        }
    }

    pub fn is_markup(self) -> bool {
        matches!(self, Self::LegacyMarkup | Self::ModernMarkup)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LegacyMarkup => "legacy_markup",
            Self::ModernMarkup => "modern_markup",
            Self::Json => "json",
        }
    }

    /// Signed data URL for `location` in this dialect.
    ///
    /// # Errors
    ///
    /// [`LocatorError::InvalidUrl`] when the location does not form a valid URL.
    pub fn request_url(
        self,
        location: &Location,
        credentials: &Credentials,
    ) -> Result<Url, LocatorError> {
        const MARKUP_PARAMS: [(&str, &str); 5] = [
            ("view", "xml"),
            ("showDate", "all"),
            ("showSession", "all"),
            ("detailLevel", "contribution"),
            ("fr", "no"),
        ];

        match self {
            Self::LegacyMarkup => {
                let mut params = MARKUP_PARAMS.to_vec();
                params.push(("confId", location.identifier.as_str()));
                location.url(
                    false,
                    &credentials.sign("/conferenceOtherViews.py", &params),
                )
            }
            Self::ModernMarkup => {
                let path = format!("/event/{}/other-view", location.identifier);
                location.url(true, &credentials.sign(&path, &MARKUP_PARAMS))
            }
            Self::Json => {
                let path = format!("/export/event/{}.json", location.identifier);
                location.url(
                    true,
                    &credentials.sign(&path, &[("nc", "yes"), ("detail", "sessions")]),
                )
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
