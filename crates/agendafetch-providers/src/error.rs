//! Error types for agenda fetching and normalization.

use std::fmt;
use thiserror::Error;

use agendafetch_core::{LocatorError, TimeCodecError};

/// The category of an agenda error.
///
/// The fetcher uses the code to decide whether a failed attempt can be
/// retried in another dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgendaErrorCode {
    /// A URL could not be interpreted as a conference or category.
    Locator,
    /// The markup export answered but flagged itself as retired.
    FormatDeprecated,
    /// The payload could not be parsed or does not have the expected shape.
    MalformedResponse,
    /// A talk has no usable artifact. Reported, never returned from a fetch.
    MissingMaterial,
    /// A caller-supplied value is out of range.
    InvalidParameter,
    /// Transport failure: connection, status code, unreadable body.
    Fetch,
}

impl AgendaErrorCode {
    /// True when another dialect may still succeed after this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FormatDeprecated | Self::MalformedResponse)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locator => "locator",
            Self::FormatDeprecated => "format_deprecated",
            Self::MalformedResponse => "malformed_response",
            Self::MissingMaterial => "missing_material",
            Self::InvalidParameter => "invalid_parameter",
            Self::Fetch => "fetch",
        }
    }
}

impl fmt::Display for AgendaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while fetching or normalizing an agenda.
#[derive(Debug, Error)]
pub struct AgendaError {
    code: AgendaErrorCode,
    message: String,
    /// Host the failing request was sent to.
    site: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AgendaError {
    pub fn new(code: AgendaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            site: None,
            source: None,
        }
    }

    pub fn locator(message: impl Into<String>) -> Self {
        Self::new(AgendaErrorCode::Locator, message)
    }

    pub fn format_deprecated(message: impl Into<String>) -> Self {
        Self::new(AgendaErrorCode::FormatDeprecated, message)
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(AgendaErrorCode::MalformedResponse, message)
    }

    pub fn missing_material(message: impl Into<String>) -> Self {
        Self::new(AgendaErrorCode::MissingMaterial, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(AgendaErrorCode::InvalidParameter, message)
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(AgendaErrorCode::Fetch, message)
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> AgendaErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }
}

impl fmt::Display for AgendaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref site) = self.site {
            write!(f, "[{}] ", site)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<LocatorError> for AgendaError {
    fn from(err: LocatorError) -> Self {
        let code = match err {
            LocatorError::InvalidParameter(_) => AgendaErrorCode::InvalidParameter,
            LocatorError::NotAConference(_)
            | LocatorError::NotACategory(_)
            | LocatorError::InvalidUrl(_) => AgendaErrorCode::Locator,
        };
        Self::new(code, err.to_string()).with_source(err)
    }
}

impl From<TimeCodecError> for AgendaError {
    fn from(err: TimeCodecError) -> Self {
        Self::invalid_parameter(err.to_string()).with_source(err)
    }
}

/// A specialized Result type for agenda operations.
pub type AgendaResult<T> = Result<T, AgendaError>;
