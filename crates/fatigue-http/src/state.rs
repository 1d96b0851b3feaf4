//! Shared handler state.

use std::sync::Arc;

use fatigue_core::FatigueClassifier;

use crate::ApiError;

/// State shared by all handlers. The classifier is absent in degraded mode.
#[derive(Clone, Default)]
pub struct AppState {
    classifier: Option<Arc<dyn FatigueClassifier>>,
}

impl AppState {
    #[must_use]
    pub fn new(classifier: Option<Arc<dyn FatigueClassifier>>) -> Self {
        Self { classifier }
    }

    /// State with a loaded classifier.
    #[must_use]
    pub fn with_classifier(classifier: impl FatigueClassifier + 'static) -> Self {
        Self::new(Some(Arc::new(classifier)))
    }

    /// State for a service running without a model.
    #[must_use]
    pub fn without_model() -> Self {
        Self::default()
    }

    /// The loaded classifier, or `ModelUnavailable`.
    pub fn classifier(&self) -> Result<Arc<dyn FatigueClassifier>, ApiError> {
        self.classifier.clone().ok_or(ApiError::ModelUnavailable)
    }
}
