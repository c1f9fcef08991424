use indicatif::{ProgressBar, ProgressStyle};

/// Observer notified as projects are processed.
pub trait Progress: Send + Sync {
    fn start(&self, total: u64);
    /// Called before a project is processed.
    fn describe(&self, label: &str);
    /// Called once per project after it completes or fails.
    fn advance(&self, label: &str);
    fn finish(&self);
}

pub struct NoopProgress;

impl Progress for NoopProgress {
    fn start(&self, _total: u64) {}
    fn describe(&self, _label: &str) {}
    fn advance(&self, _label: &str) {}
    fn finish(&self) {}
}

/// Terminal progress bar drawn on stderr.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message("Processing...");
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for BarProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn describe(&self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn advance(&self, _label: &str) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
