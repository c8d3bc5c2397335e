//! Logging configuration for check runs.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the application. [`setup::init_logging`] is a ready-made subscriber setup
//! used by the `ddlx-check` binary.

use tracing::Level;

/// Controls how chatty the orchestrator and verifier are.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for ddlx-check components
    pub base_level: Level,
    /// Whether to log each constraint's status and metric
    pub log_constraint_details: bool,
    /// Whether to log dataset loading and filtered view registration
    pub log_data_operations: bool,
    /// Maximum length of logged messages such as failure text
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_constraint_details: false,
            log_data_operations: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Everything on, long fields.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_constraint_details: true,
            log_data_operations: true,
            max_field_length: 1024,
        }
    }

    /// Warnings only.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_constraint_details: false,
            log_data_operations: false,
            max_field_length: 128,
        }
    }

    /// Whether `base_level` lets debug events through.
    pub fn debug_enabled(&self) -> bool {
        self.base_level >= Level::DEBUG
    }

    pub fn truncate(&self, value: &str) -> String {
        truncate_field(value, self.max_field_length)
    }
}

/// Debug event emitted only when the given [`LogConfig`] enables debug output.
///
/// The arguments are not evaluated otherwise.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to at most `max_length` bytes, respecting char boundaries.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber setup for applications.
pub mod setup {
    use crate::error::{DdlxError, Result};
    use tracing::Level;

    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for everything else
        pub level: Level,
        /// Log level for ddlx-check components
        pub crate_level: Level,
        /// Emit JSON lines instead of human-readable text
        pub json_format: bool,
        /// Explicit filter directive, overrides the levels above
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                crate_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                crate_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn structured() -> Self {
            Self {
                json_format: true,
                ..Self::default()
            }
        }

        pub fn with_crate_level(mut self, level: Level) -> Self {
            self.crate_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the filter directive string.
        pub fn env_filter(&self) -> String {
            match &self.env_filter {
                Some(filter) => filter.clone(),
                None => format!(
                    "{},ddlx_check={}",
                    self.level.as_str().to_lowercase(),
                    self.crate_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a global `tracing` subscriber writing to stderr.
    ///
    /// `RUST_LOG` takes precedence over the configured levels.
    ///
    /// ```rust,no_run
    /// use ddlx_check::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| DdlxError::Configuration(format!("Failed to initialize logging: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let default = LogConfig::default();
        assert_eq!(default.base_level, Level::INFO);
        assert!(!default.log_constraint_details);

        let verbose = LogConfig::verbose();
        assert!(verbose.log_constraint_details);
        assert_eq!(verbose.max_field_length, 1024);

        let production = LogConfig::production();
        assert_eq!(production.base_level, Level::WARN);
        assert!(!production.log_data_operations);
    }

    #[test]
    fn test_debug_gating_follows_base_level() {
        assert!(!LogConfig::default().debug_enabled());
        assert!(!LogConfig::production().debug_enabled());
        assert!(LogConfig::verbose().debug_enabled());

        let trace = LogConfig {
            base_level: Level::TRACE,
            ..LogConfig::default()
        };
        assert!(trace.debug_enabled());
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("short", 10), "short");
        assert_eq!(truncate_field("a long value", 6), "a long...(truncated)");
        // 'é' spans bytes 1..3, so a cut at 2 backs off to 1
        assert_eq!(truncate_field("héllo", 2), "h...(truncated)");
    }

    #[test]
    fn test_env_filter_string() {
        let config = LoggingConfig::default();
        assert_eq!(config.env_filter(), "warn,ddlx_check=info");

        let custom = LoggingConfig::default().with_env_filter("ddlx_check=trace");
        assert_eq!(custom.env_filter(), "ddlx_check=trace");
    }
}
