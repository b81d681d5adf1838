//! Spinner shown while a batch of transfers or deletions runs
//!
//! The executor does not report per-item progress, so only an
//! indeterminate spinner is drawn.

use std::time::Duration;

use super::OutputConfig;

/// Spinner wrapper
///
/// Suppressed in quiet, JSON and no-progress modes.
#[derive(Debug)]
pub struct Spinner {
    bar: Option<indicatif::ProgressBar>,
}

impl Spinner {
    /// Start a spinner with the given message
    pub fn start(config: &OutputConfig, message: &str) -> Self {
        if config.quiet || config.json || config.no_progress {
            return Self { bar: None };
        }

        let bar = indicatif::ProgressBar::new_spinner();
        if let Ok(style) = indicatif::ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar: Some(bar) }
    }

    /// Finish and clear the spinner
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if the spinner is drawn
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.finish();
    }
}
