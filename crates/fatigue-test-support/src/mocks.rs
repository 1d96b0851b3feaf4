//! Mock implementations of core port traits.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::bail;
use fatigue_core::ports::{
    DatasetSource, ExperimentTracker, FatigueClassifier, LabeledImage, ProgressSink, TrainingEvent,
};
use image::DynamicImage;

/// Mock implementation of `FatigueClassifier` for testing.
///
/// Returns a fixed output row (or a fixed error) and counts calls.
pub struct MockClassifier {
    output: Result<Vec<f32>, String>,
    path: PathBuf,
    input_shape: [Option<usize>; 4],
    calls: Arc<Mutex<usize>>,
}

impl MockClassifier {
    /// Creates a classifier that always returns `output`.
    #[must_use]
    pub fn with_output(output: Vec<f32>) -> Self {
        Self {
            output: Ok(output),
            path: PathBuf::from("Model/fatigue_model.safetensors"),
            input_shape: [None, Some(3), Some(256), Some(256)],
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates a classifier whose predictions always fail with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
            ..Self::with_output(Vec::new())
        }
    }

    /// Overrides the reported model path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Overrides the reported input shape.
    #[must_use]
    pub const fn with_input_shape(mut self, shape: [Option<usize>; 4]) -> Self {
        self.input_shape = shape;
        self
    }

    /// Returns the number of `predict` calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FatigueClassifier for MockClassifier {
    fn model_path(&self) -> &Path {
        &self.path
    }

    fn input_shape(&self) -> [Option<usize>; 4] {
        self.input_shape
    }

    fn predict(&self, _image: &DynamicImage) -> anyhow::Result<Vec<f32>> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        match &self.output {
            Ok(row) => Ok(row.clone()),
            Err(message) => bail!("{message}"),
        }
    }
}

/// Mock implementation of `ExperimentTracker` for testing.
///
/// Captures everything logged for later assertions.
#[derive(Default)]
pub struct MockTracker {
    params: Mutex<Vec<(String, String)>>,
    metrics: Mutex<Vec<(String, f64, Option<usize>)>>,
    tags: Mutex<Vec<(String, String)>>,
}

impl MockTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the logged parameters in order.
    #[must_use]
    pub fn params(&self) -> Vec<(String, String)> {
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the value of a logged parameter.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<String> {
        self.params()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns the logged metrics in order.
    #[must_use]
    pub fn metrics(&self) -> Vec<(String, f64, Option<usize>)> {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns every logged metric named `key` as `(value, step)` pairs.
    #[must_use]
    pub fn metric(&self, key: &str) -> Vec<(f64, Option<usize>)> {
        self.metrics()
            .into_iter()
            .filter(|(k, _, _)| k == key)
            .map(|(_, value, step)| (value, step))
            .collect()
    }

    /// Returns the tags that were set.
    #[must_use]
    pub fn tags(&self) -> Vec<(String, String)> {
        self.tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ExperimentTracker for MockTracker {
    fn log_params(&self, params: &[(&str, String)]) -> anyhow::Result<()> {
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(params.iter().map(|(k, v)| ((*k).to_string(), v.clone())));
        Ok(())
    }

    fn log_metric(&self, key: &str, value: f64, step: Option<usize>) -> anyhow::Result<()> {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), value, step));
        Ok(())
    }

    fn set_tags(&self, tags: &[(&str, &str)]) -> anyhow::Result<()> {
        self.tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(tags.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures training events for later assertions.
#[derive(Default)]
pub struct MockProgressSink {
    events: Mutex<Vec<TrainingEvent>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<TrainingEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of events with the given variant name.
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| {
                let name = match event {
                    TrainingEvent::EpochStarted { .. } => "EpochStarted",
                    TrainingEvent::BatchCompleted { .. } => "BatchCompleted",
                    TrainingEvent::EpochCompleted { .. } => "EpochCompleted",
                    TrainingEvent::Finished { .. } => "Finished",
                };
                name == kind
            })
            .count()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: TrainingEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// In-memory `DatasetSource` for testing.
pub struct MockDataset {
    items: Vec<LabeledImage>,
    classes: Vec<String>,
}

impl MockDataset {
    /// Creates a dataset from `(image, label)` pairs.
    #[must_use]
    pub fn new(items: Vec<(DynamicImage, f32)>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(image, label)| LabeledImage { image, label })
                .collect(),
            classes: vec!["Non_fatigue".to_string(), "Fatigue".to_string()],
        }
    }

    /// Creates an empty dataset.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl DatasetSource for MockDataset {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn get(&self, index: usize) -> anyhow::Result<LabeledImage> {
        match self.items.get(index) {
            Some(item) => Ok(item.clone()),
            None => bail!("index {index} out of range ({} items)", self.items.len()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_counts_calls() {
        let classifier = MockClassifier::with_output(vec![0.4]);
        let img = DynamicImage::new_rgb8(4, 4);
        assert_eq!(classifier.predict(&img).unwrap(), vec![0.4]);
        assert_eq!(classifier.predict(&img).unwrap(), vec![0.4]);
        assert_eq!(classifier.call_count(), 2);
    }

    #[test]
    fn test_failing_classifier() {
        let classifier = MockClassifier::failing("boom");
        let err = classifier.predict(&DynamicImage::new_rgb8(4, 4)).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(classifier.call_count(), 1);
    }

    #[test]
    fn test_tracker_captures() {
        let tracker = MockTracker::new();
        tracker.log_params(&[("epochs", "4".to_string())]).unwrap();
        tracker.log_metric("val_loss", 0.5, Some(1)).unwrap();
        tracker.log_metric("val_loss", 0.4, None).unwrap();
        tracker.set_tags(&[("task", "fatigue_detection")]).unwrap();

        assert_eq!(tracker.param("epochs").as_deref(), Some("4"));
        assert_eq!(tracker.metric("val_loss"), vec![(0.5, Some(1)), (0.4, None)]);
        assert_eq!(tracker.tags().len(), 1);
    }

    #[test]
    fn test_dataset_out_of_range() {
        let data = MockDataset::empty();
        assert!(data.is_empty());
        assert!(data.get(0).is_err());
    }
}
