//! Slicing orchestration
//!
//! Runs the external slicer CLI against an uploaded (possibly oriented)
//! model under a bounded concurrency pool, with a wall-clock timeout, a
//! bounded retry budget, and degradation to conservative fallback metrics
//! when every attempt fails. Checkout must never be fully blocked by a
//! slicer outage: [`Slicer::slice`] always resolves to usable metrics, and
//! only infrastructure failures (temp workspace I/O) surface as errors.

pub mod pool;
pub mod process;
pub mod settings;
pub mod status;
pub mod toolpath;

use crate::config::SlicerConfig;
use crate::error::{Error, Result};
use pool::SlicePool;
use process::AttemptFailure;
use serde::{Deserialize, Serialize};
use settings::SliceSettings;
use status::{SliceState, SliceStatus, StatusBoard, StatusHandle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Fallback print time when slicing fails: one hour.
pub const FALLBACK_TIME_SEC: u64 = 3_600;
/// Fallback filament mass when slicing fails: 80 grams.
pub const FALLBACK_GRAMS: f64 = 80.0;

/// Print metrics produced by a slice request.
///
/// `fallback` distinguishes real measurements from synthesized placeholder
/// values; callers must surface it to the customer or operator rather than
/// treat fallback numbers as ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceMetrics {
    /// Estimated print time in seconds.
    pub time_sec: u64,
    /// Filament mass in grams.
    pub grams: f64,
    /// Support material mass in grams.
    pub support_grams: f64,
    /// Persisted toolpath artifact, when an artifact directory was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcode_path: Option<PathBuf>,
    /// True when these are synthesized estimates, not measurements.
    pub fallback: bool,
    /// Last captured failure text when `fallback` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SliceMetrics {
    /// Conservative synthesized metrics used when slicing fails.
    pub fn fallback(error: Option<String>) -> Self {
        Self {
            time_sec: FALLBACK_TIME_SEC,
            grams: FALLBACK_GRAMS,
            support_grams: 0.0,
            gcode_path: None,
            fallback: true,
            error,
        }
    }
}

/// Orchestrates external slicer runs for quick-order checkouts.
///
/// Independent requests run in parallel; the only shared state is the
/// bounded pool and the per-file status board.
#[derive(Debug)]
pub struct Slicer {
    config: SlicerConfig,
    pool: SlicePool,
    statuses: StatusBoard,
}

impl Slicer {
    /// Create an orchestrator from a (clamped) configuration.
    pub fn new(config: SlicerConfig) -> Self {
        let config = config.clamped();
        let pool = SlicePool::new(config.concurrency);
        Self {
            config,
            pool,
            statuses: StatusBoard::new(),
        }
    }

    /// Create an orchestrator from environment configuration.
    pub fn from_env() -> Self {
        Self::new(SlicerConfig::from_env())
    }

    /// The active configuration.
    pub fn config(&self) -> &SlicerConfig {
        &self.config
    }

    /// Latest status for a logical file, if one was ever sliced.
    pub fn status(&self, filename: &str) -> Option<SliceStatus> {
        self.statuses.current(filename)
    }

    /// Subscribe to a file's status transitions for polling UIs.
    pub fn watch(&self, filename: &str) -> StatusHandle {
        self.statuses.watch(filename)
    }

    /// Slice a model and return print metrics.
    ///
    /// Never fails on slicer trouble: execution failures retry up to the
    /// configured attempt cap and then degrade to fallback metrics. Only
    /// temp-workspace I/O errors propagate.
    pub async fn slice(
        &self,
        model: &[u8],
        filename: &str,
        settings: &SliceSettings,
    ) -> Result<SliceMetrics> {
        self.slice_to(model, filename, settings, None).await
    }

    /// Like [`slice`](Self::slice), additionally persisting the generated
    /// toolpath into `artifact_dir` on success.
    pub async fn slice_to(
        &self,
        model: &[u8],
        filename: &str,
        settings: &SliceSettings,
        artifact_dir: Option<&Path>,
    ) -> Result<SliceMetrics> {
        let settings = settings.normalized();

        if self.config.disabled {
            let attempt = self.statuses.next_attempt(filename);
            warn!(filename, "slicer disabled, returning fallback metrics");
            self.statuses
                .publish(filename, SliceState::Completed, attempt);
            return Ok(SliceMetrics::fallback(Some(
                "slicer disabled by configuration".to_string(),
            )));
        }

        // Primary backpressure point: queue FIFO for a pool slot. The slot
        // guard and the temp workspace guard release independently.
        let _slot = self.pool.acquire().await?;

        let workspace = tempfile::tempdir().map_err(|e| Error::slicer_infra("temp dir", e))?;
        let input_path = workspace.path().join(sanitize_filename(filename));
        fs::write(&input_path, model)
            .await
            .map_err(|e| Error::slicer_infra("stage model", e))?;

        let output_dir = workspace.path().join("out");
        fs::create_dir(&output_dir)
            .await
            .map_err(|e| Error::slicer_infra("output dir", e))?;

        let mut last_error: Option<String> = None;
        for _ in 0..self.config.attempts {
            let attempt = self.statuses.next_attempt(filename);
            self.statuses.publish(filename, SliceState::Running, attempt);
            info!(filename, attempt, "slicing");

            match self
                .run_once(&input_path, &output_dir, &settings, artifact_dir)
                .await
            {
                Ok(metrics) => {
                    self.statuses
                        .publish(filename, SliceState::Completed, attempt);
                    info!(
                        filename,
                        attempt,
                        grams = metrics.grams,
                        time_sec = metrics.time_sec,
                        "slice complete"
                    );
                    return Ok(metrics);
                }
                Err(failure) => {
                    warn!(filename, attempt, %failure, "slice attempt failed");
                    last_error = Some(failure.to_string());
                }
            }
        }

        let attempt = self
            .statuses
            .current(filename)
            .map(|s| s.attempt)
            .unwrap_or(0);
        self.statuses.publish(filename, SliceState::Failed, attempt);
        warn!(filename, "all slice attempts failed, degrading to fallback metrics");
        Ok(SliceMetrics::fallback(last_error))
    }

    /// One attempt: spawn, wait, locate the toolpath, extract metrics.
    async fn run_once(
        &self,
        input_path: &Path,
        output_dir: &Path,
        settings: &SliceSettings,
        artifact_dir: Option<&Path>,
    ) -> std::result::Result<SliceMetrics, AttemptFailure> {
        process::run_attempt(&self.config, input_path, output_dir, settings).await?;

        let gcode = toolpath::find_gcode(output_dir).await.ok_or_else(|| {
            AttemptFailure::MissingOutput(format!("no .gcode in {}", output_dir.display()))
        })?;

        let content = fs::read_to_string(&gcode)
            .await
            .map_err(|e| AttemptFailure::MissingOutput(e.to_string()))?;

        let metrics = toolpath::extract_metrics(&content).ok_or_else(|| {
            AttemptFailure::Unparseable("mass or time signal missing".to_string())
        })?;

        let gcode_path = match artifact_dir {
            Some(dir) => Some(persist_artifact(&gcode, dir).await?),
            None => None,
        };

        Ok(SliceMetrics {
            time_sec: metrics.time_sec,
            grams: metrics.grams,
            support_grams: metrics.support_grams,
            gcode_path,
            fallback: false,
            error: None,
        })
    }
}

/// Copy the toolpath out of the scoped workspace before it is removed.
async fn persist_artifact(gcode: &Path, dir: &Path) -> std::result::Result<PathBuf, AttemptFailure> {
    let name = gcode
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "toolpath.gcode".to_string());
    let target = dir.join(name);
    fs::copy(gcode, &target)
        .await
        .map_err(|e| AttemptFailure::MissingOutput(format!("persist artifact: {}", e)))?;
    debug!(target = %target.display(), "persisted toolpath artifact");
    Ok(target)
}

/// Strip path components from an uploaded filename before staging it.
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("model.stl");
    base.to_string()
}
