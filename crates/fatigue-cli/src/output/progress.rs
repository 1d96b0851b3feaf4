//! Progress bar adapter using indicatif.

use std::io::IsTerminal;

use fatigue_core::{ProgressSink, TrainingEvent};
use indicatif::{ProgressBar, ProgressStyle};

/// Per-epoch batch progress for `fatigue train`.
///
/// Draws a bar on a terminal and falls back to one line per epoch otherwise.
pub struct TrainingProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl TrainingProgress {
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        if quiet || !std::io::stderr().is_terminal() {
            return Self { bar: None, quiet };
        }

        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} loss {prefix}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }

        Self {
            bar: Some(bar),
            quiet,
        }
    }

    fn report(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }
}

impl ProgressSink for TrainingProgress {
    fn on_event(&self, event: TrainingEvent) {
        if self.quiet {
            return;
        }

        match event {
            TrainingEvent::EpochStarted {
                epoch,
                epochs,
                batches,
            } => {
                if let Some(bar) = &self.bar {
                    bar.reset();
                    bar.set_length(batches as u64);
                    bar.set_message(format!("Epoch {epoch}/{epochs}"));
                }
            }
            TrainingEvent::BatchCompleted { batch, loss } => {
                if let Some(bar) = &self.bar {
                    bar.set_position(batch as u64);
                    bar.set_prefix(format!("{loss:.4}"));
                }
            }
            TrainingEvent::EpochCompleted { metrics } => {
                let mut line = format!(
                    "Epoch {}: loss {:.4} accuracy {:.4}",
                    metrics.epoch, metrics.train.loss, metrics.train.accuracy
                );
                if let Some(v) = metrics.validation {
                    line.push_str(&format!(
                        " - val_loss {:.4} val_accuracy {:.4}",
                        v.loss, v.accuracy
                    ));
                }
                self.report(&line);
            }
            TrainingEvent::Finished { .. } => {
                if let Some(bar) = &self.bar {
                    bar.finish_and_clear();
                }
            }
        }
    }
}
