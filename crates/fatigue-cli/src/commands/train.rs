//! Train command - fit the CNN on a directory dataset and track the run.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::Args;
use fatigue_adapters::{DirectoryDataset, FileRun, RunStatus, DEFAULT_MODEL_PATH, TRAIN_DIR, VAL_DIR};
use fatigue_core::inference::get_device;
use fatigue_core::training::{Trainer, TrainingConfig, TrainingSummary};
use fatigue_core::DatasetSource;
use tracing::{info, warn};

use super::{parse_image_size, parse_learning_rate, parse_positive};
use crate::config::AppConfig;
use crate::output::TrainingProgress;

mod defaults {
    pub const DATA_DIR: &str = "Data/etat_des_joueurs";
    pub const FATIGUE_CLASS: &str = "fatigue";
    pub const TRACKING_DIR: &str = "Ml_flow_runs";
    pub const EXPERIMENT: &str = "fatigue-face-detection";
    pub const RUN_NAME: &str = "cnn-fatigue-v1";
}

/// Arguments for a training run.
#[derive(Args, Clone, Debug, Default)]
pub struct TrainArgs {
    /// Dataset root containing TRAIN/ and VAL/
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Number of epochs
    #[arg(long, value_parser = parse_positive::<usize>)]
    pub epochs: Option<usize>,

    /// Images per batch
    #[arg(long, value_parser = parse_positive::<usize>)]
    pub batch_size: Option<usize>,

    /// Adam learning rate
    #[arg(long, value_parser = parse_learning_rate)]
    pub learning_rate: Option<f64>,

    /// Square training image size in pixels
    #[arg(long, value_parser = parse_image_size)]
    pub image_size: Option<u32>,

    /// Where to write the model artifact
    #[arg(long, value_name = "PATH")]
    pub model_path: Option<PathBuf>,

    /// Root directory for tracked runs
    #[arg(long, value_name = "DIR")]
    pub tracking_dir: Option<PathBuf>,

    /// Experiment name
    #[arg(long)]
    pub experiment: Option<String>,

    /// Run name
    #[arg(long)]
    pub run_name: Option<String>,

    /// Class directory labelled as fatigue
    #[arg(long)]
    pub fatigue_class: Option<String>,

    /// Seed for shuffling, augmentation and initialization
    #[arg(long)]
    pub seed: Option<u64>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl TrainArgs {
    /// Apply configuration file values, respecting CLI precedence.
    #[must_use]
    pub fn with_config(mut args: Self, config: &AppConfig) -> Self {
        let training = &config.training;
        if args.data_dir.is_none() {
            args.data_dir.clone_from(&training.data_dir);
        }
        args.epochs = args.epochs.or(training.epochs);
        args.batch_size = args.batch_size.or(training.batch_size);
        args.learning_rate = args.learning_rate.or(training.learning_rate);
        args.image_size = args.image_size.or(training.image_size);
        if args.fatigue_class.is_none() {
            args.fatigue_class.clone_from(&training.fatigue_class);
        }
        args.seed = args.seed.or(training.seed);

        if args.model_path.is_none() {
            args.model_path.clone_from(&config.model.path);
        }

        if args.tracking_dir.is_none() {
            args.tracking_dir.clone_from(&config.tracking.dir);
        }
        if args.experiment.is_none() {
            args.experiment.clone_from(&config.tracking.experiment);
        }
        if args.run_name.is_none() {
            args.run_name.clone_from(&config.tracking.run_name);
        }
        args
    }

    fn data_dir(&self) -> &Path {
        self.data_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(defaults::DATA_DIR))
    }

    fn model_path(&self) -> &Path {
        self.model_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_MODEL_PATH))
    }

    fn tracking_dir(&self) -> &Path {
        self.tracking_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(defaults::TRACKING_DIR))
    }

    fn experiment(&self) -> &str {
        self.experiment.as_deref().unwrap_or(defaults::EXPERIMENT)
    }

    fn run_name(&self) -> &str {
        self.run_name.as_deref().unwrap_or(defaults::RUN_NAME)
    }

    fn fatigue_class(&self) -> &str {
        self.fatigue_class
            .as_deref()
            .unwrap_or(defaults::FATIGUE_CLASS)
    }

    /// Hyperparameters with defaults filled in.
    fn training_config(&self) -> TrainingConfig {
        let defaults = TrainingConfig::default();
        TrainingConfig {
            image_size: self.image_size.unwrap_or(defaults.image_size),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            epochs: self.epochs.unwrap_or(defaults.epochs),
            learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
            seed: self.seed,
            augment: defaults.augment,
        }
    }
}

/// Run the train command.
///
/// Expects `args` to have been processed through `with_config()` first.
pub fn run(args: &TrainArgs) -> Result<()> {
    let data_dir = args.data_dir();
    let train = DirectoryDataset::open(data_dir.join(TRAIN_DIR), args.fatigue_class())
        .context("Failed to load training images")?;
    let val = DirectoryDataset::open(data_dir.join(VAL_DIR), args.fatigue_class())
        .context("Failed to load validation images")?;
    check_matching_classes(train.classes(), val.classes())?;
    info!(
        "Found {} training images ({} fatigue) and {} validation images, classes {:?}",
        train.len(),
        train.fatigue_count(),
        val.len(),
        train.classes()
    );

    let run = FileRun::start(args.tracking_dir(), args.experiment(), args.run_name())?;
    let progress = TrainingProgress::new(args.quiet);
    let trainer = Trainer::new(args.training_config(), get_device(), &run, &progress);

    let outcome = trainer.train(&train, &val).and_then(|trained| {
        trained.save(args.model_path())?;
        Ok(*trained.summary())
    });

    match outcome {
        Ok(summary) => {
            run.finish(RunStatus::Finished)?;
            print_summary(&summary, args.model_path(), &run);
            Ok(())
        }
        Err(e) => {
            if let Err(finish_err) = run.finish(RunStatus::Failed) {
                warn!("Failed to mark run as failed: {finish_err:#}");
            }
            Err(e.context("Training failed"))
        }
    }
}

/// Both splits must label the same folder names the same way.
fn check_matching_classes(train: &[String], val: &[String]) -> Result<()> {
    let matches = train.len() == val.len()
        && train
            .iter()
            .zip(val)
            .all(|(t, v)| t.eq_ignore_ascii_case(v));
    ensure!(
        matches,
        "{TRAIN_DIR} and {VAL_DIR} class directories differ: {train:?} vs {val:?}"
    );
    Ok(())
}

fn print_summary(summary: &TrainingSummary, model_path: &Path, run: &FileRun) {
    println!("Training complete after {} epoch(s)", summary.epochs);
    println!(
        "  train loss {:.4}, accuracy {:.2}%",
        summary.final_train.loss,
        summary.final_train.accuracy * 100.0
    );
    match summary.validation {
        Some(v) => println!(
            "  validation loss {:.4}, accuracy {:.2}%",
            v.loss,
            v.accuracy * 100.0
        ),
        None => println!("  validation skipped (no images)"),
    }
    if let Some(p) = summary.sample_prediction {
        println!("  sample prediction {p:.4}");
    }
    println!("Model saved to {}", model_path.display());
    println!("Run {} tracked in {}", run.run_id(), run.dir().display());
}
