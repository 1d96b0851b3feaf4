//! Test support utilities for fatigue-detect.
//!
//! Provides mock ports, synthetic face images and multipart upload bodies
//! for testing the service and the training pipeline.
//!
//! # Example
//!
//! ```
//! use fatigue_test_support::{MockClassifier, SyntheticImageBuilder};
//!
//! let face = SyntheticImageBuilder::face(256, 256);
//! let jpeg = SyntheticImageBuilder::jpeg_bytes(&face);
//! let classifier = MockClassifier::with_output(vec![0.7, 0.3]);
//! assert!(!jpeg.is_empty());
//! assert_eq!(classifier.call_count(), 0);
//! ```

mod builders;
mod mocks;

pub use builders::{MultipartUpload, SyntheticImageBuilder};
pub use mocks::{MockClassifier, MockDataset, MockProgressSink, MockTracker};
