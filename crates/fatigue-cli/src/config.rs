//! Configuration file support for fatigue-detect.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/fatigue-detect/config.toml` (lowest priority)
//! - Project-local: `.fatigue-detect.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use fatigue_core::inference::MIN_INPUT_SIZE;
use serde::Deserialize;
use tracing::{debug, info, warn};

const APP_DIR: &str = "fatigue-detect";
const PROJECT_FILE: &str = ".fatigue-detect.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Model artifact settings.
    pub model: ModelConfig,
    /// Training hyperparameters and data location.
    pub training: TrainingSection,
    /// Experiment tracking settings.
    pub tracking: TrackingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: Option<String>,
    /// Bind port.
    pub port: Option<u16>,
    /// Maximum request body size in MiB.
    pub body_limit_mb: Option<usize>,
}

/// Model artifact configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path of the safetensors artifact.
    pub path: Option<PathBuf>,
    /// Square input edge the served model was trained with.
    pub input_size: Option<u32>,
}

/// Training configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingSection {
    /// Directory containing `TRAIN/` and `VAL/`.
    pub data_dir: Option<PathBuf>,
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub learning_rate: Option<f64>,
    pub image_size: Option<u32>,
    /// Name of the class directory labelled as fatigue.
    pub fatigue_class: Option<String>,
    pub seed: Option<u64>,
}

/// Experiment tracking configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Root directory for runs.
    pub dir: Option<PathBuf>,
    /// Experiment name.
    pub experiment: Option<String>,
    /// Run name.
    pub run_name: Option<String>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/fatigue-detect/config.toml`
    /// 2. Project-local: `.fatigue-detect.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged and dropped.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        for problem in config.validate() {
            warn!("{problem}; using default");
        }

        config
    }

    /// Drops out-of-range values so that defaults apply, returning one
    /// message per dropped value.
    fn validate(&mut self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.server.port == Some(0) {
            self.server.port = None;
            problems.push("server.port must be non-zero".to_string());
        }
        if self.server.body_limit_mb == Some(0) {
            self.server.body_limit_mb = None;
            problems.push("server.body_limit_mb must be positive".to_string());
        }
        if let Some(size) = self.model.input_size.filter(|s| *s < MIN_INPUT_SIZE) {
            self.model.input_size = None;
            problems.push(format!(
                "model.input_size must be at least {MIN_INPUT_SIZE}, got {size}"
            ));
        }
        if self.training.epochs == Some(0) {
            self.training.epochs = None;
            problems.push("training.epochs must be positive".to_string());
        }
        if self.training.batch_size == Some(0) {
            self.training.batch_size = None;
            problems.push("training.batch_size must be positive".to_string());
        }
        if let Some(lr) = self.training.learning_rate.filter(|lr| !(*lr > 0.0 && lr.is_finite())) {
            self.training.learning_rate = None;
            problems.push(format!("training.learning_rate must be positive, got {lr}"));
        }
        if let Some(size) = self.training.image_size.filter(|s| *s < MIN_INPUT_SIZE) {
            self.training.image_size = None;
            problems.push(format!(
                "training.image_size must be at least {MIN_INPUT_SIZE}, got {size}"
            ));
        }

        problems
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        // Server
        self.server.host = other.server.host.or_else(|| self.server.host.take());
        self.server.port = other.server.port.or(self.server.port);
        self.server.body_limit_mb = other.server.body_limit_mb.or(self.server.body_limit_mb);

        // Model
        self.model.path = other.model.path.or_else(|| self.model.path.take());
        self.model.input_size = other.model.input_size.or(self.model.input_size);

        // Training
        self.training.data_dir = other
            .training
            .data_dir
            .or_else(|| self.training.data_dir.take());
        self.training.epochs = other.training.epochs.or(self.training.epochs);
        self.training.batch_size = other.training.batch_size.or(self.training.batch_size);
        self.training.learning_rate = other
            .training
            .learning_rate
            .or(self.training.learning_rate);
        self.training.image_size = other.training.image_size.or(self.training.image_size);
        self.training.fatigue_class = other
            .training
            .fatigue_class
            .or_else(|| self.training.fatigue_class.take());
        self.training.seed = other.training.seed.or(self.training.seed);

        // Tracking
        self.tracking.dir = other.tracking.dir.or_else(|| self.tracking.dir.take());
        self.tracking.experiment = other
            .tracking
            .experiment
            .or_else(|| self.tracking.experiment.take());
        self.tracking.run_name = other
            .tracking
            .run_name
            .or_else(|| self.tracking.run_name.take());
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.fatigue-detect.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.server.port.is_none());
        assert!(config.model.path.is_none());
        assert!(config.training.epochs.is_none());
        assert!(config.tracking.dir.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str("").expect("parse empty config");
        assert!(config.server.host.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r"
[server]
host = '127.0.0.1'
port = 9000
body_limit_mb = 4

[model]
path = 'artifacts/model.safetensors'
input_size = 128

[training]
data_dir = 'data'
epochs = 10
batch_size = 16
learning_rate = 0.0005
image_size = 128
fatigue_class = 'tired'
seed = 7

[tracking]
dir = 'runs'
experiment = 'exp'
run_name = 'baseline'
";
        let config: AppConfig = toml::from_str(toml).expect("parse full config");

        assert_eq!(config.server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.server.port, Some(9000));
        assert_eq!(config.server.body_limit_mb, Some(4));
        assert_eq!(
            config.model.path,
            Some(PathBuf::from("artifacts/model.safetensors"))
        );
        assert_eq!(config.model.input_size, Some(128));
        assert_eq!(config.training.epochs, Some(10));
        assert_eq!(config.training.learning_rate, Some(0.0005));
        assert_eq!(config.training.fatigue_class.as_deref(), Some("tired"));
        assert_eq!(config.training.seed, Some(7));
        assert_eq!(config.tracking.run_name.as_deref(), Some("baseline"));
    }

    #[test]
    fn test_merge_configs() {
        let mut base: AppConfig = toml::from_str(
            r"
[server]
port = 8000

[training]
epochs = 4
batch_size = 32
",
        )
        .expect("parse base");

        let override_config: AppConfig = toml::from_str(
            r"
[training]
epochs = 12

[tracking]
experiment = 'override'
",
        )
        .expect("parse override");

        base.merge(override_config);

        assert_eq!(base.training.epochs, Some(12));
        assert_eq!(base.training.batch_size, Some(32));
        assert_eq!(base.server.port, Some(8000));
        assert_eq!(base.tracking.experiment.as_deref(), Some("override"));
    }

    #[test]
    fn test_merge_empty_override_preserves_base() {
        let mut base: AppConfig = toml::from_str(
            r"
[model]
path = 'm.safetensors'
",
        )
        .expect("parse base");

        base.merge(AppConfig::default());

        assert_eq!(base.model.path, Some(PathBuf::from("m.safetensors")));
    }

    #[test]
    fn test_invalid_toml_syntax_handled() {
        let toml = r"
[training
epochs = 3
";
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err(), "invalid TOML should return error");
    }

    #[test]
    fn test_invalid_field_type_handled() {
        let toml = r#"
[server]
port = "eight thousand"
"#;
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err(), "type mismatch should return error");
    }

    #[test]
    fn test_unknown_field_ignored() {
        let toml = r"
[training]
epochs = 2
optimizer = 'sgd'
";
        let config: AppConfig = toml::from_str(toml).expect("unknown fields are ignored");
        assert_eq!(config.training.epochs, Some(2));
    }

    #[test]
    fn test_validate_drops_invalid_values() {
        let mut config: AppConfig = toml::from_str(
            r"
[server]
port = 0

[training]
epochs = 0
batch_size = 8
learning_rate = -0.1
image_size = 10
",
        )
        .expect("parse config");

        let problems = config.validate();

        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.contains("training.learning_rate")));
        assert!(config.server.port.is_none());
        assert!(config.training.epochs.is_none());
        assert!(config.training.learning_rate.is_none());
        assert!(config.training.image_size.is_none());
        assert_eq!(config.training.batch_size, Some(8));
    }

    #[test]
    fn test_validate_valid_config_passes() {
        let mut config: AppConfig = toml::from_str(
            r"
[training]
epochs = 1
learning_rate = 0.01
image_size = 22
",
        )
        .expect("parse config");

        assert!(config.validate().is_empty());
        assert_eq!(config.training.image_size, Some(22));
    }

    #[test]
    fn test_find_config_in_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), "").unwrap();

        let found = find_config_in_parents(&nested).unwrap();
        assert_eq!(found, dir.path().join(PROJECT_FILE));
    }
}
