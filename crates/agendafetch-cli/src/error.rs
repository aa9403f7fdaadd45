//! CLI error types.

use std::fmt;

use agendafetch_core::LocatorError;
use agendafetch_core::tracing::TracingError;
use agendafetch_providers::AgendaError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Configuration or key file error.
    Config(String),
    /// An argument could not be read as an agenda or category.
    Locator(LocatorError),
    /// Fetching or normalizing an agenda failed.
    Agenda(AgendaError),
    /// Logging could not be set up.
    Tracing(TracingError),
    /// IO error.
    Io(std::io::Error),
    /// Output could not be rendered.
    Output(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Locator(err) => write!(f, "{}", err),
            Self::Agenda(err) => write!(f, "{}", err),
            Self::Tracing(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Output(err) => write!(f, "output error: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Locator(err) => Some(err),
            Self::Agenda(err) => Some(err),
            Self::Tracing(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Output(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

impl From<LocatorError> for CliError {
    fn from(err: LocatorError) -> Self {
        Self::Locator(err)
    }
}

impl From<AgendaError> for CliError {
    fn from(err: AgendaError) -> Self {
        Self::Agenda(err)
    }
}

impl From<TracingError> for CliError {
    fn from(err: TracingError) -> Self {
        Self::Tracing(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err)
    }
}
