//! External slicer process execution
//!
//! One attempt = spawn the slicer CLI against a staged model file and race
//! its exit against a wall-clock timer. On timer win the process is
//! force-killed and the attempt counts as failed; there is no cooperative
//! cancellation beyond the kill.

use crate::config::SlicerConfig;
use crate::slicer::settings::SliceSettings;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

/// Why a single slicer attempt failed.
///
/// Every variant is recoverable by retry and ultimately by fallback
/// metrics; none of these escape the orchestrator as an error.
#[derive(Debug)]
pub enum AttemptFailure {
    /// The binary could not be spawned.
    Spawn(std::io::Error),
    /// The process exited with a non-zero status.
    NonZeroExit {
        /// Exit code, if the process was not signal-killed.
        code: Option<i32>,
        /// Captured stderr for diagnostics.
        stderr: String,
    },
    /// The wall-clock timeout elapsed and the process was killed.
    Timeout {
        /// The enforced limit.
        limit: Duration,
    },
    /// The process succeeded but produced no toolpath file.
    MissingOutput(String),
    /// The toolpath file lacked extractable mass or time metrics.
    Unparseable(String),
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptFailure::Spawn(err) => write!(f, "failed to spawn slicer: {}", err),
            AttemptFailure::NonZeroExit { code, stderr } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    write!(f, "slicer exited with status {}", code)
                } else {
                    write!(f, "slicer exited with status {}: {}", code, stderr)
                }
            }
            AttemptFailure::Timeout { limit } => {
                write!(f, "slicer timed out after {}ms", limit.as_millis())
            }
            AttemptFailure::MissingOutput(detail) => {
                write!(f, "slicer produced no toolpath output: {}", detail)
            }
            AttemptFailure::Unparseable(detail) => {
                write!(f, "toolpath metrics not extractable: {}", detail)
            }
        }
    }
}

/// Build the slicer command line for a staged model.
pub(crate) fn build_command(
    config: &SlicerConfig,
    input: &Path,
    output_dir: &Path,
    settings: &SliceSettings,
) -> Command {
    let mut command = Command::new(&config.binary);
    command
        .arg("--export-gcode")
        .arg("--layer-height")
        .arg(settings.layer_height_mm.to_string())
        .arg("--fill-density")
        .arg(format!("{}%", settings.infill_percent));

    let supports = settings.supports.normalized();
    if supports.enabled {
        command
            .arg("--support-material")
            .arg("--support-material-angle")
            .arg(supports.angle_deg.to_string())
            .arg("--support-material-style")
            .arg(supports.resolved_style().as_flag())
            .arg("--support-material-interface-layers")
            .arg(supports.interface_layers.to_string());
    }

    command.arg("--output").arg(output_dir).arg(input);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

/// Run one slicer attempt to completion or timeout.
pub(crate) async fn run_attempt(
    config: &SlicerConfig,
    input: &Path,
    output_dir: &Path,
    settings: &SliceSettings,
) -> Result<(), AttemptFailure> {
    let limit = Duration::from_millis(config.timeout_ms);
    let mut command = build_command(config, input, output_dir, settings);
    debug!(binary = %config.binary, input = %input.display(), "spawning slicer");

    let mut child = command.spawn().map_err(AttemptFailure::Spawn)?;

    // Drain stderr concurrently so a chatty slicer cannot fill the pipe
    // and deadlock against wait().
    let stderr_task = child.stderr.take().map(|mut stderr| {
        tokio::spawn(async move {
            let mut captured = String::new();
            let _ = stderr.read_to_string(&mut captured).await;
            captured
        })
    });

    let status = match tokio::time::timeout(limit, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => return Err(AttemptFailure::Spawn(err)),
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(AttemptFailure::Timeout { limit });
        }
    };

    let stderr = match stderr_task {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };

    if !status.success() {
        return Err(AttemptFailure::NonZeroExit {
            code: status.code(),
            stderr,
        });
    }
    Ok(())
}
