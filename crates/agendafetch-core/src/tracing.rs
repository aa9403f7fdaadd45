//! Logging setup shared by the library crates and the `agendafetch` binary.
//!
//! ```ignore
//! use agendafetch_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::cli_debug())?;
//! ```
//!
//! `RUST_LOG` always wins over the configured default level.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber was already installed.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The filter directive could not be parsed.
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line human readable output.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Options for [`init_tracing`].
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level used for the `agendafetch` targets when `RUST_LOG` is unset.
    pub default_level: Level,
    /// Rendering of each event.
    pub output_format: TracingOutputFormat,
    /// Emit file and line numbers.
    pub include_location: bool,
    /// Emit the module path of each event.
    pub include_target: bool,
    /// Explicit filter directive, replaces `default_level` when set.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Verbose preset used by `--debug`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_target: true,
            ..Self::default()
        }
    }

    /// Picks [`TracingConfig::cli_debug`] or the quiet default.
    #[must_use]
    pub fn from_debug_flag(debug: bool) -> Self {
        if debug {
            Self::cli_debug()
        } else {
            Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Default directive applied when neither `RUST_LOG` nor `env_filter` is set.
    pub fn default_directive(&self) -> String {
        format!("agendafetch={}", self.default_level)
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.env_filter {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn build_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_target(self.include_target);

        match self.output_format {
            TracingOutputFormat::Pretty => base.pretty().boxed(),
            TracingOutputFormat::Compact => base.compact().without_time().boxed(),
            TracingOutputFormat::Json => base.json().boxed(),
        }
    }
}

/// Installs the global subscriber. Logs go to stderr so stdout stays clean for
/// agenda output.
///
/// # Errors
///
/// Fails when a subscriber is already installed or the filter is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.build_filter()?;
    let subscriber = tracing_subscriber::registry()
        .with(config.build_layer())
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_quiet_compact() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::WARN);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(!config.include_location);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn debug_flag_selects_preset() {
        let config = TracingConfig::from_debug_flag(true);
        assert_eq!(config.default_level, Level::DEBUG);
        assert!(config.include_location);

        let config = TracingConfig::from_debug_flag(false);
        assert_eq!(config.default_level, Level::WARN);
    }

    #[test]
    fn default_directive_targets_crates() {
        let config = TracingConfig::default().with_level(Level::TRACE);
        assert_eq!(config.default_directive(), "agendafetch=TRACE");
    }

    #[test]
    fn explicit_filter_is_parsed() {
        let config = TracingConfig::default()
            .with_format(TracingOutputFormat::Json)
            .with_env_filter("agendafetch_providers=trace");
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert!(config.build_filter().is_ok());
    }
}
