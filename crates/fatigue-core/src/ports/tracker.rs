//! Experiment tracking port.

/// Records the parameters, metrics and tags of one training run.
pub trait ExperimentTracker: Send + Sync {
    /// Records hyperparameters as string values.
    fn log_params(&self, params: &[(&str, String)]) -> anyhow::Result<()>;

    /// Records a metric value, optionally at a step (epoch).
    fn log_metric(&self, key: &str, value: f64, step: Option<usize>) -> anyhow::Result<()>;

    /// Sets descriptive tags on the run.
    fn set_tags(&self, tags: &[(&str, &str)]) -> anyhow::Result<()>;
}
