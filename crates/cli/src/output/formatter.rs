//! Human and JSON rendering shared by every command
//!
//! In JSON mode stdout carries only result documents and errors become JSON
//! objects on stderr. Status marks and warnings are dropped.

use gsw_core::Error;
use serde::Serialize;

use super::OutputConfig;
use crate::exit_code::ExitCode;

/// Status glyph printed in front of human-readable messages
#[derive(Debug, Clone, Copy)]
enum Mark {
    Success,
    Warning,
    Failure,
}

impl Mark {
    fn render(self, colored: bool) -> String {
        let (glyph, ansi) = match self {
            Mark::Success => ('✓', 32),
            Mark::Warning => ('⚠', 33),
            Mark::Failure => ('✗', 31),
        };
        if colored {
            format!("\x1b[{ansi}m{glyph}\x1b[0m")
        } else {
            glyph.to_string()
        }
    }
}

/// Renders command results according to an [`OutputConfig`]
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Settings this formatter renders with
    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Whether results are emitted as JSON documents
    pub fn is_json(&self) -> bool {
        self.config.json
    }

    fn colored(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Status lines are dropped in quiet and JSON modes
    fn silent(&self) -> bool {
        self.config.quiet || self.config.json
    }

    /// Confirm a finished operation on stdout
    pub fn success(&self, message: &str) {
        if !self.silent() {
            println!("{} {message}", Mark::Success.render(self.colored()));
        }
    }

    /// Report a non-fatal problem on stderr
    pub fn warning(&self, message: &str) {
        if !self.silent() {
            eprintln!("{} {message}", Mark::Warning.render(self.colored()));
        }
    }

    /// Report an error on stderr, even in quiet mode
    pub fn error(&self, message: &str) {
        if self.config.json {
            eprintln!("{:#}", serde_json::json!({ "error": message }));
        } else {
            eprintln!("{} {message}", Mark::Failure.render(self.colored()));
        }
    }

    /// Report a core error and return the exit code it maps to
    pub fn fail(&self, err: &Error) -> ExitCode {
        tracing::debug!(error = ?err, "command failed");
        self.error(&err.to_string());
        ExitCode::from_error(err)
    }

    /// Print a result document
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => self.error(&format!("cannot serialize output: {e}")),
        }
    }

    /// Print a result line unless quiet
    pub fn println(&self, message: &str) {
        if !self.config.quiet {
            println!("{message}");
        }
    }
}
