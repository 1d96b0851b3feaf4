//! Output formatting for CLI.

mod progress;

pub use progress::TrainingProgress;
