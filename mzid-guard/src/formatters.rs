//! Rendering of validation runs.
//!
//! A [`RunSummary`] can be rendered as JSON for tools or as plain text for a
//! terminal.
//!
//! # Examples
//!
//! ```rust
//! use mzid_guard::formatters::{HumanFormatter, JsonFormatter, ResultFormatter};
//! use mzid_guard::core::RunSummary;
//!
//! fn print(summary: &RunSummary) -> mzid_guard::prelude::Result<()> {
//!     println!("{}", HumanFormatter::new().format(summary)?);
//!     let _json = JsonFormatter::new().with_pretty(false).format(summary)?;
//!     Ok(())
//! }
//! ```

use crate::core::{MessageLevel, RunSummary};
use crate::prelude::*;
use serde::Serialize;
use std::fmt::Write;

/// Configuration options for formatting a run.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the rule outcome buckets
    pub include_report: bool,
    /// Include the clustered messages
    pub include_messages: bool,
    /// Include remediation tips next to messages
    pub include_tips: bool,
    /// Maximum number of messages to display, `None` for all
    pub max_messages: Option<usize>,
    /// Whether to use colorized output (for human formatter)
    pub use_colors: bool,
    /// Whether to include timestamps in output
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_report: true,
            include_messages: true,
            include_tips: true,
            max_messages: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Creates a minimal configuration showing only the summary.
    pub fn minimal() -> Self {
        Self {
            include_report: true,
            include_messages: false,
            include_tips: false,
            max_messages: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Creates a configuration suitable for CI/CD environments.
    pub fn ci() -> Self {
        Self {
            include_report: true,
            include_messages: true,
            include_tips: false,
            max_messages: Some(50),
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_report(mut self, include: bool) -> Self {
        self.include_report = include;
        self
    }

    pub fn with_messages(mut self, include: bool) -> Self {
        self.include_messages = include;
        self
    }

    pub fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = Some(max);
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }
}

/// Formats a validation run into a string.
pub trait ResultFormatter {
    /// Formats a run with the formatter's own configuration.
    fn format(&self, summary: &RunSummary) -> Result<String>;

    /// Formats a run with a custom configuration.
    fn format_with_config(
        &self,
        summary: &RunSummary,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(summary)
    }
}

fn shown(summary: &RunSummary, config: &FormatterConfig) -> usize {
    if !config.include_messages {
        return 0;
    }
    config
        .max_messages
        .map_or(summary.messages.len(), |max| max.min(summary.messages.len()))
}

/// Formats runs as structured JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonRun<'a> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<String>,
    min_level: MessageLevel,
    stats: &'a crate::core::RunStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a crate::core::ExtendedReport>,
    messages: &'a [crate::cluster::ClusteredMessage],
    total_messages: usize,
}

impl ResultFormatter for JsonFormatter {
    fn format(&self, summary: &RunSummary) -> Result<String> {
        self.format_with_config(summary, &self.config)
    }

    fn format_with_config(&self, summary: &RunSummary, config: &FormatterConfig) -> Result<String> {
        let run = JsonRun {
            status: if summary.has_errors() { "failure" } else { "success" },
            started_at: config
                .include_timestamps
                .then(|| summary.started_at.to_rfc3339()),
            min_level: summary.min_level,
            stats: &summary.stats,
            report: config.include_report.then_some(&summary.report),
            messages: &summary.messages[..shown(summary, config)],
            total_messages: summary.messages.len(),
        };
        let json = if self.pretty {
            serde_json::to_string_pretty(&run)
        } else {
            serde_json::to_string(&run)
        };
        json.map_err(|e| ValidatorError::Internal(format!("Failed to serialize run to JSON: {e}")))
    }
}

/// Formats runs as text for a terminal.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(config: &FormatterConfig, level: MessageLevel, text: &str) -> String {
        if !config.use_colors {
            return text.to_string();
        }
        let code = match level {
            MessageLevel::Fatal | MessageLevel::Error => "31",
            MessageLevel::Warn => "33",
            MessageLevel::Success => "32",
            MessageLevel::Info | MessageLevel::Debug => "34",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn render(
        &self,
        summary: &RunSummary,
        config: &FormatterConfig,
        out: &mut String,
    ) -> std::fmt::Result {
        writeln!(out)?;
        if summary.has_errors() {
            writeln!(out, "{}", Self::paint(config, MessageLevel::Error, "Validation FAILED"))?;
        } else {
            writeln!(out, "{}", Self::paint(config, MessageLevel::Success, "Validation PASSED"))?;
        }
        if config.include_timestamps {
            writeln!(out, "Started: {}", summary.started_at.to_rfc3339())?;
        }
        writeln!(out, "Minimum level: {}", summary.min_level)?;
        writeln!(
            out,
            "Elements checked: {} ({} on {} workers)",
            summary.stats.elements_checked + summary.stats.concurrent_elements,
            summary.stats.concurrent_elements,
            summary.stats.workers
        )?;
        writeln!(out, "Execution Time: {}ms", summary.stats.duration_ms)?;

        if config.include_report {
            let report = &summary.report;
            writeln!(out)?;
            writeln!(out, "Object rules:")?;
            writeln!(out, "   Valid: {}", report.object_rules_valid.len())?;
            writeln!(out, "   Invalid: {}", report.object_rules_invalid.len())?;
            writeln!(out, "   Not checked: {}", report.object_rules_not_checked.len())?;
            writeln!(out, "CV mapping rules:")?;
            writeln!(out, "   Valid: {}", report.cv_rules_valid.len())?;
            writeln!(out, "   Invalid: {}", report.cv_rules_invalid.len())?;
            writeln!(out, "   Not checked: {}", report.cv_rules_not_checked.len())?;
            writeln!(out, "   Invalid xpath: {}", report.cv_rules_invalid_xpath.len())?;
            writeln!(out, "   No data: {}", report.cv_rules_valid_xpath_no_data.len())?;
            if !report.schema_defects.is_empty() {
                writeln!(out, "Schema defects: {}", report.schema_defects.len())?;
            }
        }

        let count = shown(summary, config);
        if count > 0 {
            writeln!(out)?;
            writeln!(out, "Messages:")?;
            for message in &summary.messages[..count] {
                let level = Self::paint(config, message.level, message.level.as_str());
                write!(out, "   [{level}]")?;
                if let Some(rule) = message.rule_id() {
                    write!(out, " {rule}:")?;
                }
                writeln!(out, " {}", message.message)?;
                if let Some(context) = message.render_context() {
                    writeln!(out, "      at {context}")?;
                }
                if config.include_tips {
                    for tip in message.rule.iter().flat_map(|r| r.tips.iter()) {
                        writeln!(out, "      tip: {tip}")?;
                    }
                }
            }
        }
        if config.include_messages && summary.messages.len() > count {
            writeln!(out, "   ... and {} more messages", summary.messages.len() - count)?;
        }
        Ok(())
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultFormatter for HumanFormatter {
    fn format(&self, summary: &RunSummary) -> Result<String> {
        self.format_with_config(summary, &self.config)
    }

    fn format_with_config(&self, summary: &RunSummary, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        self.render(summary, config, &mut output)
            .map_err(|e| ValidatorError::Internal(format!("Failed to render run: {e}")))?;
        Ok(output)
    }
}
