use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner that walks through the fixed steps of an ETL run.
///
/// A silent reporter swallows every call so library callers and tests can
/// pass one around without drawing to the terminal.
pub struct ProgressReporter {
    progress_bar: Option<ProgressBar>,
    total_steps: usize,
}

impl ProgressReporter {
    pub fn new_spinner(message: &str, total_steps: usize, silent: bool) -> Self {
        if silent {
            return Self::silent();
        }

        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            progress_bar: Some(pb),
            total_steps,
        }
    }

    pub fn silent() -> Self {
        Self {
            progress_bar: None,
            total_steps: 0,
        }
    }

    /// Show `[step/total] message`
    pub fn step(&self, step: usize, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(format!("[{}/{}] {}", step, self.total_steps, message));
        }
    }

    pub fn finish_with_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(ref pb) = self.progress_bar {
            if !pb.is_finished() {
                pb.finish_and_clear();
            }
        }
    }
}
