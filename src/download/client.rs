//! External download client wrapper
//!
//! Files are fetched by shelling out to the data commons' command-line client,
//! one object at a time. The client reports success or failure only as free
//! text, so its output is classified into a `FetchStatus` here.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde::Serialize;

use super::manifest::ManifestEntry;

/// Outcome of fetching a single object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum FetchStatus {
    Downloaded,
    Skipped,
    Failed(String),
    /// Output matched no known marker
    Unknown,
}

impl FetchStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, FetchStatus::Failed(_))
    }
}

/// Something that can fetch one object into a directory
pub trait FileFetcher {
    fn fetch(&self, object_id: &str, destination: &Path) -> Result<FetchStatus>;
}

/// Invokes the download client as a subprocess
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    pub program: PathBuf,
    pub profile: String,
    pub extra_args: Vec<String>,
}

impl CommandFetcher {
    pub fn new(program: impl Into<PathBuf>, profile: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            profile: profile.into(),
            extra_args: Vec::new(),
        }
    }

    /// Arguments passed to the client for one object
    pub fn args(&self, object_id: &str, destination: &Path) -> Vec<String> {
        let mut args = vec![
            "download-single".to_string(),
            format!("--profile={}", self.profile),
            format!("--guid={}", object_id),
            format!("--download-path={}", destination.display()),
            "--no-prompt".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

impl FileFetcher for CommandFetcher {
    fn fetch(&self, object_id: &str, destination: &Path) -> Result<FetchStatus> {
        let output = Command::new(&self.program)
            .args(self.args(object_id, destination))
            .output()
            .with_context(|| format!("Failed to run download client: {}", self.program.display()))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let status = classify_output(&text);
        log::debug!("{} -> {:?} (exit {:?})", object_id, status, output.status.code());
        Ok(status)
    }
}

/// Classify free-text client output.
///
/// Failure markers win over success markers, since the client prints a
/// "Succeeded: 0" line even when the download fails.
pub fn classify_output(output: &str) -> FetchStatus {
    let lines: Vec<&str> = output.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    for line in &lines {
        let lower = line.to_lowercase();
        if let Some(count) = counter_value(&lower, "failed") {
            if count > 0 {
                return FetchStatus::Failed(line.to_string());
            }
            continue;
        }
        if lower.contains("error")
            || lower.contains("not found")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
        {
            return FetchStatus::Failed(line.to_string());
        }
    }

    let lower = output.to_lowercase();
    if lower.contains("already exists") {
        return FetchStatus::Skipped;
    }
    if lines.iter().any(|l| matches!(counter_value(&l.to_lowercase(), "succeeded"), Some(n) if n > 0))
        || lower.contains("successfully downloaded")
    {
        return FetchStatus::Downloaded;
    }

    FetchStatus::Unknown
}

/// Parse "<label>: <n>" counters such as "Failed: 0"
fn counter_value(line: &str, label: &str) -> Option<u64> {
    let rest = line.strip_prefix(label)?.trim_start().strip_prefix(':')?;
    rest.trim()
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .and_then(|n| n.parse().ok())
}

/// Result of one manifest download run
#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadReport {
    pub results: Vec<(String, FetchStatus)>,
}

impl DownloadReport {
    pub fn count(&self, predicate: impl Fn(&FetchStatus) -> bool) -> usize {
        self.results.iter().filter(|(_, s)| predicate(s)).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &(String, FetchStatus)> {
        self.results.iter().filter(|(_, s)| s.is_failure())
    }
}

/// Fetch every manifest entry in order.
///
/// Entries are processed sequentially with no retry. A client that cannot be
/// started aborts the run; a failed download is recorded and the run continues.
pub fn download_all(
    fetcher: &dyn FileFetcher,
    entries: &[ManifestEntry],
    destination: &Path,
    mut on_progress: impl FnMut(&str, &FetchStatus),
) -> Result<DownloadReport> {
    std::fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create download directory: {}", destination.display()))?;

    let mut report = DownloadReport::default();
    for entry in entries {
        let status = fetcher.fetch(&entry.object_id, destination)?;
        on_progress(&entry.object_id, &status);
        report.results.push((entry.object_id.clone(), status));
    }

    Ok(report)
}
