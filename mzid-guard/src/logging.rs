//! Logging utilities and configuration for mzid-guard.
//!
//! The validator logs through `tracing` with structured fields. Per-rule and
//! per-element detail can be very chatty on documents with hundreds of
//! thousands of identification items, so it is gated by [`LogConfig`].

use tracing::Level;

/// Logging configuration for the validator.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for validator components
    pub base_level: Level,
    /// Whether to log every rule execution
    pub log_rule_details: bool,
    /// Whether to log stage start and end
    pub log_stage_progress: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_rule_details: false,
            log_stage_progress: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_rule_details: true,
            log_stage_progress: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_rule_details: false,
            log_stage_progress: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Macro for performance-sensitive debug logging.
///
/// Arguments are only evaluated if debug logging is enabled.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.base_level >= tracing::Level::DEBUG {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional per-rule logging.
#[macro_export]
macro_rules! log_rule {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_rule_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional stage progress logging.
#[macro_export]
macro_rules! log_stage {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_stage_progress {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
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

/// Utilities for setting up structured logging.
pub mod setup {
    use tracing::Level;

    /// Configuration for the logging subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for validator components specifically
        pub validator_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                validator_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                validator_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                validator_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        /// Sets the log level for the application.
        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        /// Sets the log level for validator components.
        pub fn with_validator_level(mut self, level: Level) -> Self {
            self.validator_level = level;
            self
        }

        /// Sets whether to use JSON output format.
        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},mzid_guard={}",
                    self.level.as_str().to_lowercase(),
                    self.validator_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Initializes the global `tracing` subscriber.
    ///
    /// `RUST_LOG` takes precedence over the configured filter.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use mzid_guard::logging::setup::{init_logging, LoggingConfig};
    ///
    /// let config = LoggingConfig::development().with_json_format(true);
    /// init_logging(config).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let config = LogConfig::default();
        assert_eq!(config.base_level, Level::INFO);
        assert!(!config.log_rule_details);
        assert!(config.log_stage_progress);

        let verbose = LogConfig::verbose();
        assert_eq!(verbose.base_level, Level::DEBUG);
        assert!(verbose.log_rule_details);
        assert_eq!(verbose.max_field_length, 1024);

        let production = LogConfig::production();
        assert_eq!(production.base_level, Level::WARN);
        assert!(!production.log_stage_progress);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text that should be truncated", 10),
            "this is a ...(truncated)"
        );
        // never splits a multi-byte character
        assert_eq!(truncate_field("ééé", 3), "é...(truncated)");
    }

    #[test]
    fn test_env_filter_string() {
        let config = LoggingConfig::default();
        assert_eq!(config.env_filter(), "info,mzid_guard=debug");

        let custom = LoggingConfig::production().with_env_filter("mzid_guard=trace");
        assert_eq!(custom.env_filter(), "mzid_guard=trace");
    }
}
