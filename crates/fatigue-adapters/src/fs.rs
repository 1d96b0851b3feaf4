//! Filesystem adapter for class-per-directory image datasets.
//!
//! Expects `<root>/<class>/<image>` with exactly two class directories.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fatigue_core::ports::{DatasetSource, LabeledImage};
use tracing::{debug, warn};

/// Training split directory under the data root.
pub const TRAIN_DIR: &str = "TRAIN";
/// Validation split directory under the data root.
pub const VAL_DIR: &str = "VAL";

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "tif", "webp"];

/// Binary image dataset backed by a directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryDataset {
    classes: Vec<String>,
    samples: Vec<(PathBuf, f32)>,
}

impl DirectoryDataset {
    /// Scans `root` for two class directories and their images.
    ///
    /// The class named `fatigue_class` (case-insensitive) gets label 1.0.
    /// If no class matches, the first class in sorted order does.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be read or does not contain
    /// exactly two class directories.
    pub fn open(root: impl AsRef<Path>, fatigue_class: &str) -> Result<Self> {
        let root = root.as_ref();
        let mut class_dirs: Vec<PathBuf> = std::fs::read_dir(root)
            .with_context(|| format!("Failed to read dataset directory: {}", root.display()))?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        class_dirs.sort();

        if class_dirs.len() != 2 {
            bail!(
                "expected exactly 2 class directories in {}, found {}",
                root.display(),
                class_dirs.len()
            );
        }

        let names: Vec<String> = class_dirs
            .iter()
            .map(|p| p.file_name().map_or_else(String::new, |n| n.to_string_lossy().into_owned()))
            .collect();

        let fatigue_index = names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(fatigue_class))
            .unwrap_or_else(|| {
                warn!(
                    "No class named '{fatigue_class}' in {}; treating '{}' as fatigue",
                    root.display(),
                    names[0]
                );
                0
            });

        let mut samples = Vec::new();
        for (index, dir) in class_dirs.iter().enumerate() {
            let label = if index == fatigue_index { 1.0 } else { 0.0 };
            let mut files = collect_images(dir)?;
            files.sort();
            debug!("{}: {} images (label {label})", dir.display(), files.len());
            samples.extend(files.into_iter().map(|f| (f, label)));
        }

        // Label order: non-fatigue first, fatigue second.
        let classes = vec![
            names[1 - fatigue_index].clone(),
            names[fatigue_index].clone(),
        ];

        Ok(Self { classes, samples })
    }

    /// Number of examples carrying the fatigue label.
    #[must_use]
    pub fn fatigue_count(&self) -> usize {
        self.samples.iter().filter(|(_, l)| *l > 0.5).count()
    }
}

impl DatasetSource for DirectoryDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn get(&self, index: usize) -> Result<LabeledImage> {
        let (path, label) = self
            .samples
            .get(index)
            .with_context(|| format!("sample index {index} out of range"))?;
        let image = image::open(path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;
        Ok(LabeledImage {
            image,
            label: *label,
        })
    }
}

fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read class directory: {}", dir.display()))?;

    Ok(entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_supported_image(path))
        .collect())
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}
