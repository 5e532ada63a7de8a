//! Spinners and multi-stage progress.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(80);

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}

/// Start a spinner with a message
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(TICK);
    pb
}

/// Stop a spinner with a success line
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    println!("{} {}", "✓".green(), msg);
}

/// Stop a spinner with an error line on stderr
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    eprintln!("{} {}", "✗".red(), msg);
}

/// Stop a spinner without output
pub fn finish_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

/// Progress over a known sequence of named stages.
///
/// Each stage gets its own spinner prefixed with `[n/total]`. Starting a
/// stage completes the previous one.
pub struct StageProgress {
    total: usize,
    current: usize,
    label: String,
    bar: Option<ProgressBar>,
    hidden: bool,
}

impl StageProgress {
    /// Create a tracker for `total` stages.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            current: 0,
            label: String::new(),
            bar: None,
            hidden: false,
        }
    }

    /// Create a tracker that draws nothing (e.g. under `--quiet`).
    pub fn hidden(total: usize) -> Self {
        let mut stages = Self::new(total);
        stages.hidden = true;
        stages
    }

    /// Number of stages started so far.
    pub fn current(&self) -> usize {
        self.current
    }

    fn prefix(&self) -> String {
        format!("[{}/{}]", self.current, self.total)
    }

    /// Complete the running stage, if any, and start the next one.
    pub fn start(&mut self, label: &str) {
        self.complete();
        self.current += 1;
        self.label = label.to_string();
        if self.hidden {
            return;
        }
        let pb = spinner(&format!("{} {}", self.prefix().blue().bold(), label));
        self.bar = Some(pb);
    }

    fn complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            finish_success(&pb, &format!("{} {}", self.prefix().blue().bold(), self.label));
        }
    }

    /// Complete the running stage.
    pub fn finish(mut self) {
        self.complete();
    }

    /// Mark the running stage as failed.
    pub fn fail(mut self, msg: &str) {
        if let Some(pb) = self.bar.take() {
            finish_error(&pb, &format!("{} {}: {}", self.prefix(), self.label, msg));
        }
    }
}

impl Drop for StageProgress {
    fn drop(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}
