use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const RUNNING_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
const DONE_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}";

/// Per-company progress for a scan. A disabled tracker draws nothing.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: ProgressBar,
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

impl ProgressTracker {
    pub fn new(enabled: bool) -> Self {
        let progress_bar = if enabled {
            let pb = ProgressBar::new(0);
            pb.set_style(bar_style(RUNNING_TEMPLATE));
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { progress_bar }
    }

    pub fn start_progress(&self, total: u64) {
        let pb = &self.progress_bar;
        pb.reset();
        pb.set_length(total);
        pb.set_position(0);
        pb.set_message("Scanning filings");
        if !pb.is_hidden() {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
    }

    pub fn update_message(&self, ticker: &str) {
        self.progress_bar.set_message(format!("Scanning filings [{}]", ticker));
    }

    pub fn increment(&self, delta: u64) {
        self.progress_bar.inc(delta);
    }

    pub fn finish(&self) {
        let pb = &self.progress_bar;
        pb.set_style(bar_style(DONE_TEMPLATE));
        pb.finish_with_message("Complete");
    }
}
