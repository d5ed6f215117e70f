//! Toolpath metric extraction
//!
//! Slicers annotate generated gcode with summary comments. The three
//! signals consumed here follow the PrusaSlicer conventions:
//!
//! ```text
//! ; filament used [g] = 12.83
//! ; filament used = 12.83g
//! ; estimated printing time (normal mode) = 1h 32m 5s
//! ; estimated printing time = 01:32:05
//! ; support material used = 2.10g
//! ```
//!
//! Only the first 200 lines are scanned; the summary block sits at the top
//! of the file and scanning megabytes of movement commands buys nothing.
//! Mass and time are both required: a file missing either is a parse
//! failure, not a silent zero.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Lines scanned from the top of the toolpath file.
const SCAN_LINES: usize = 200;

static FILAMENT_GRAMS_BRACKET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)filament used \[g\]\s*=\s*([0-9]+(?:\.[0-9]+)?)")
        .expect("hardcoded pattern compiles")
});

static FILAMENT_GRAMS_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)filament used\s*=\s*([0-9]+(?:\.[0-9]+)?)\s*g")
        .expect("hardcoded pattern compiles")
});

static PRINT_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)estimated printing time[^=]*=\s*(.+)").expect("hardcoded pattern compiles")
});

static SUPPORT_GRAMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)support material used\s*=\s*([0-9]+(?:\.[0-9]+)?)\s*g")
        .expect("hardcoded pattern compiles")
});

static CLOCK_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d{2}):(\d{2})$").expect("hardcoded pattern compiles"));

static COMPOUND_COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*([dhms])").expect("hardcoded pattern compiles"));

/// Metrics extracted from a toolpath file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolpathMetrics {
    /// Filament mass in grams.
    pub grams: f64,
    /// Estimated print time in seconds.
    pub time_sec: u64,
    /// Support material mass in grams; zero when not reported.
    pub support_grams: f64,
}

/// Scan toolpath content for mass, time, and support signals.
///
/// Returns `None` when either mass or time is missing after scanning.
pub fn extract_metrics(content: &str) -> Option<ToolpathMetrics> {
    let mut grams = None;
    let mut time_sec = None;
    let mut support_grams = None;

    for line in content.lines().take(SCAN_LINES) {
        if grams.is_none() {
            grams = FILAMENT_GRAMS_BRACKET
                .captures(line)
                .or_else(|| FILAMENT_GRAMS_SUFFIX.captures(line))
                .and_then(|c| c[1].parse::<f64>().ok());
        }
        if time_sec.is_none()
            && let Some(captures) = PRINT_TIME.captures(line)
        {
            time_sec = parse_duration(captures[1].trim());
        }
        if support_grams.is_none() {
            support_grams = SUPPORT_GRAMS
                .captures(line)
                .and_then(|c| c[1].parse::<f64>().ok());
        }
        if grams.is_some() && time_sec.is_some() && support_grams.is_some() {
            break;
        }
    }

    Some(ToolpathMetrics {
        grams: grams?,
        time_sec: time_sec?,
        support_grams: support_grams.unwrap_or(0.0),
    })
}

/// Parse a duration in either `HH:MM:SS` or compound `1d 2h 3m 4s` form.
fn parse_duration(text: &str) -> Option<u64> {
    if let Some(clock) = CLOCK_DURATION.captures(text) {
        let hours: u64 = clock[1].parse().ok()?;
        let minutes: u64 = clock[2].parse().ok()?;
        let seconds: u64 = clock[3].parse().ok()?;
        return Some(hours * 3600 + minutes * 60 + seconds);
    }

    let mut total = 0u64;
    let mut matched = false;
    for component in COMPOUND_COMPONENT.captures_iter(text) {
        let value: u64 = component[1].parse().ok()?;
        total += match &component[2] {
            "d" => value * 86_400,
            "h" => value * 3_600,
            "m" => value * 60,
            _ => value,
        };
        matched = true;
    }
    matched.then_some(total)
}

/// Locate the newest `.gcode` file in the slicer output directory.
pub(crate) async fn find_gcode(dir: &Path) -> Option<PathBuf> {
    let mut entries = fs::read_dir(dir).await.ok()?;
    let mut newest: Option<(PathBuf, std::time::SystemTime)> = None;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_gcode = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gcode"));
        if !is_gcode {
            continue;
        }
        let modified = entry
            .metadata()
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        if newest.as_ref().is_none_or(|(_, prev)| modified >= *prev) {
            newest = Some((path, modified));
        }
    }

    newest.map(|(path, _)| path)
}
