use indicatif::{ProgressBar, ProgressStyle};
use log::warn;

use crate::reproject::ProgressEvent;

/// Terminal progress bar counting completed bands
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new(total: u64, description: &str) -> Self {
        let bar = ProgressBar::new(total);
        match ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} bands ({eta}) {msg}")
        {
            Ok(style) => bar.set_style(style.progress_chars("#>-")),
            Err(e) => warn!("Falling back to the default progress style: {}", e),
        }
        bar.set_message(description.to_string());

        ProgressTracker {
            bar,
        }
    }

    /// A tracker that draws nothing, for non-interactive runs
    pub fn hidden() -> Self {
        ProgressTracker { bar: ProgressBar::hidden() }
    }

    pub fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BandStarted { index, total } => {
                self.bar.set_length(total as u64);
                self.bar.set_message(format!("band {}", index));
            },
            ProgressEvent::BandCompleted { index, .. } => self.bar.set_position(index as u64),
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("Completed");
    }

    pub fn abandon(&self) {
        self.bar.abandon_with_message("Failed");
    }
}
