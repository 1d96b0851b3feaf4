//! File-based experiment tracking.
//!
//! Each run lives in `<root>/<experiment>/<run_id>/`:
//! - `meta.json`: run id, name, status, start/end time
//! - `params.json`, `tags.json`: string maps, rewritten on update
//! - `metrics.csv`: `key,value,step,timestamp` rows, appended

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use fatigue_core::ExperimentTracker;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, info};

const METRICS_HEADER: &str = "key,value,step,timestamp";

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// Contents of `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub run_name: String,
    pub experiment: String,
    pub status: RunStatus,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// An open tracking run on disk.
pub struct FileRun {
    dir: PathBuf,
    meta: Mutex<RunMeta>,
    params: Mutex<BTreeMap<String, String>>,
    tags: Mutex<BTreeMap<String, String>>,
}

impl FileRun {
    /// Creates the run directory and marks the run as running.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or its files cannot be written.
    pub fn start(root: impl AsRef<Path>, experiment: &str, run_name: &str) -> Result<Self> {
        let now = OffsetDateTime::now_utc();
        let stamp = now
            .format(format_description!("[year][month][day]T[hour][minute][second]"))
            .context("Failed to format run timestamp")?;

        let experiment_dir = root.as_ref().join(sanitize(experiment));
        let base_id = sanitize(&format!("{stamp}-{run_name}"));
        let (run_id, dir) = unique_dir(&experiment_dir, &base_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create run directory {}", dir.display()))?;

        let meta = RunMeta {
            run_id,
            run_name: run_name.to_string(),
            experiment: experiment.to_string(),
            status: RunStatus::Running,
            start_time: rfc3339(now),
            end_time: None,
        };
        write_json(&dir.join("meta.json"), &meta)?;
        fs::write(dir.join("metrics.csv"), format!("{METRICS_HEADER}\n"))
            .context("Failed to create metrics.csv")?;

        info!("Tracking run {} in {}", meta.run_id, dir.display());
        Ok(Self {
            dir,
            meta: Mutex::new(meta),
            params: Mutex::new(BTreeMap::new()),
            tags: Mutex::new(BTreeMap::new()),
        })
    }

    /// Directory holding this run's files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn run_id(&self) -> String {
        self.meta
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .run_id
            .clone()
    }

    /// Records the final status and end time.
    pub fn finish(&self, status: RunStatus) -> Result<()> {
        let mut meta = self.meta.lock().unwrap_or_else(PoisonError::into_inner);
        meta.status = status;
        meta.end_time = Some(rfc3339(OffsetDateTime::now_utc()));
        write_json(&self.dir.join("meta.json"), &*meta)?;
        debug!("Run {} marked {status:?}", meta.run_id);
        Ok(())
    }
}

impl ExperimentTracker for FileRun {
    fn log_params(&self, params: &[(&str, String)]) -> Result<()> {
        let mut map = self.params.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in params {
            map.insert((*key).to_string(), value.clone());
        }
        write_json(&self.dir.join("params.json"), &*map)
    }

    fn log_metric(&self, key: &str, value: f64, step: Option<usize>) -> Result<()> {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let step = step.map(|s| s.to_string()).unwrap_or_default();

        let mut file = OpenOptions::new()
            .append(true)
            .open(self.dir.join("metrics.csv"))
            .context("Failed to open metrics.csv")?;
        writeln!(file, "{key},{value},{step},{millis}").context("Failed to append metric")?;

        debug!("metric {key}={value:.4}");
        Ok(())
    }

    fn set_tags(&self, tags: &[(&str, &str)]) -> Result<()> {
        let mut map = self.tags.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in tags {
            map.insert((*key).to_string(), (*value).to_string());
        }
        write_json(&self.dir.join("tags.json"), &*map)
    }
}

fn unique_dir(parent: &Path, base: &str) -> (String, PathBuf) {
    let mut id = base.to_string();
    let mut n = 2;
    while parent.join(&id).exists() {
        id = format!("{base}-{n}");
        n += 1;
    }
    let dir = parent.join(&id);
    (id, dir)
}

/// Keeps `[A-Za-z0-9._-]`, replacing everything else with `_`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
