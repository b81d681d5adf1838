//! Output formatting utilities
//!
//! Formatters for CLI output in both human-readable and JSON formats,
//! plus the spinner shown during transfers.

mod formatter;
mod progress;

use gsw_core::config::Defaults;

pub use formatter::Formatter;
pub use progress::Spinner;

/// Output configuration derived from CLI flags and the configuration file
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress spinner
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Fill in what the flags left off from the configuration file.
    ///
    /// Flags only ever switch a mode on, so a set flag always wins.
    pub fn with_defaults(mut self, defaults: &Defaults) -> Self {
        self.json |= defaults.output.eq_ignore_ascii_case("json");
        self.no_color |= defaults.color.eq_ignore_ascii_case("never");
        self.no_progress |= !defaults.progress;
        self
    }
}
