//! Tracing configuration for the binary
//!
//! Libraries only emit events; the binary installs the subscriber. `log`
//! records from dependencies are bridged into the same subscriber.

#[cfg(feature = "cli")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Dependencies that are too chatty at the verbosity the user asked for
const QUIET_TARGETS: &[&str] = &["ort=warn", "h2=warn", "hyper=warn", "rustls=warn"];

/// Configuration for tracing output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Human-readable console output with colors
    #[default]
    Console,
    /// Compact output without colors for CI and log collectors
    Compact,
    /// JSON structured logging for production environments
    #[cfg(feature = "tracing-json")]
    Json,
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "compact" => Ok(Self::Compact),
            #[cfg(feature = "tracing-json")]
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown log format '{}'", other)),
        }
    }
}

/// Tracing configuration builder
#[derive(Debug, Default)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    /// Output format
    pub format: TracingFormat,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set custom environment filter
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",  // Default: service lifecycle and per-request outcomes
            1 => "debug", // -v: pipeline internals and timings
            _ => "trace", // -vv+: everything
        }
    }

    /// Full filter directive: explicit filter, else verbosity plus quiet dependencies
    #[must_use]
    pub fn filter_directives(&self) -> String {
        if let Some(filter) = &self.env_filter {
            return filter.clone();
        }
        let mut directives = vec![self.verbosity_to_filter().to_string()];
        if self.verbosity < 2 {
            directives.extend(QUIET_TARGETS.iter().map(|target| (*target).to_string()));
        }
        directives.join(",")
    }

    /// Initialize the global subscriber
    ///
    /// `RUST_LOG`, when set, replaces the verbosity-derived filter.
    ///
    /// # Errors
    /// - Invalid filter directives
    /// - A global subscriber is already installed
    #[cfg(feature = "cli")]
    pub fn init(self) -> anyhow::Result<()> {
        use tracing_subscriber::fmt;

        let filter = match std::env::var("RUST_LOG") {
            Ok(directives) if self.env_filter.is_none() && !directives.trim().is_empty() => {
                EnvFilter::try_new(directives)?
            },
            _ => EnvFilter::try_new(self.filter_directives())?,
        };

        let registry = Registry::default().with(filter);

        match self.format {
            TracingFormat::Console => {
                let fmt_layer = fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_level(true)
                    .compact();
                registry.with(fmt_layer).try_init()?;
            },
            TracingFormat::Compact => {
                let fmt_layer = fmt::layer().with_ansi(false).with_target(true).compact();
                registry.with(fmt_layer).try_init()?;
            },
            #[cfg(feature = "tracing-json")]
            TracingFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true);
                registry.with(fmt_layer).try_init()?;
            },
        }

        Ok(())
    }
}

/// Span creation helpers for the binary's top-level operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span covering the lifetime of the HTTP service
    pub fn serve(address: &str, backend: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "serve",
            address = %address,
            backend = %backend
        )
    }

    /// Span for a one-shot file removal
    pub fn file_processing(file_path: &std::path::Path, background: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "file_processing",
            file_path = %file_path.display(),
            background = %background
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(TracingConfig::new().with_verbosity(0).verbosity_to_filter(), "info");
        assert_eq!(TracingConfig::new().with_verbosity(1).verbosity_to_filter(), "debug");
        assert_eq!(TracingConfig::new().with_verbosity(2).verbosity_to_filter(), "trace");
        assert_eq!(TracingConfig::new().with_verbosity(10).verbosity_to_filter(), "trace");
    }

    #[test]
    fn test_filter_directives() {
        let directives = TracingConfig::new().filter_directives();
        assert!(directives.starts_with("info,"));
        assert!(directives.contains("ort=warn"));

        assert_eq!(TracingConfig::new().with_verbosity(2).filter_directives(), "trace");
        assert_eq!(
            TracingConfig::new().with_env_filter("photo_splicer=debug").filter_directives(),
            "photo_splicer=debug"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("console".parse::<TracingFormat>().unwrap(), TracingFormat::Console);
        assert_eq!("Compact".parse::<TracingFormat>().unwrap(), TracingFormat::Compact);
        assert!("xml".parse::<TracingFormat>().is_err());
    }
}
