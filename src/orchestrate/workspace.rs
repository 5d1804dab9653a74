use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::ReelResult;
use crate::foundation::naming::{timestamped_name, timestamped_stem};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Newest files kept per group (uploads, renders).
    pub keep_last: usize,
    /// Keep each job's scratch directory for debugging.
    pub keep_temp: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_last: 20,
            keep_temp: false,
        }
    }
}

/// Directory layout: `uploads/`, `renders/` and `renders/temp/` under one root.
///
/// Every job writes its intermediates to its own `renders/temp/<user>_<stamp>_<hex>/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn renders(&self) -> PathBuf {
        self.root.join("renders")
    }

    pub fn temp(&self) -> PathBuf {
        self.renders().join("temp")
    }

    pub fn ensure(&self) -> ReelResult<()> {
        for dir in [self.uploads(), self.temp()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create '{}'", dir.display()))?;
        }
        Ok(())
    }

    /// Fresh timestamped path under `renders/`.
    pub fn render_path(&self, prefix: &str, ext: &str) -> PathBuf {
        self.renders().join(timestamped_name(prefix, ext))
    }

    /// Fresh scratch directory path for one job of `owner`; not created here.
    pub fn job_temp(&self, owner: &str) -> PathBuf {
        self.temp().join(timestamped_stem(owner))
    }

    /// `true` when `dir` is a job directory strictly below `renders/temp/`.
    pub fn is_job_temp(&self, dir: &Path) -> bool {
        let temp = self.temp();
        dir != temp && dir.starts_with(&temp)
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// Delete all but the `n` most recently modified files in `dir` matching `extensions`.
///
/// Subdirectories are left alone. A missing directory counts as empty. Returns the number
/// of files removed.
pub fn keep_last_n(dir: &Path, n: usize, extensions: &[&str]) -> ReelResult<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("list '{}'", dir.display()))
                .into());
        }
    };
    let mut files: Vec<(PathBuf, SystemTime)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            let path = entry.path();
            (meta.is_file() && has_extension(&path, extensions))
                .then(|| (path, meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)))
        })
        .collect();
    files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in files.into_iter().skip(n) {
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove"),
        }
    }
    Ok(removed)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub job_temp_removed: bool,
    pub uploads_removed: usize,
    pub renders_removed: usize,
}

/// Drop one job's scratch directory and trim uploads/renders to the newest `keep_last` files.
///
/// Only `job_temp` is removed; scratch directories of jobs still running stay untouched.
#[tracing::instrument(skip(workspace, job_temp), fields(root = %workspace.root().display()))]
pub fn cleanup_artifacts(
    workspace: &Workspace,
    policy: &RetentionPolicy,
    job_temp: &Path,
) -> ReelResult<CleanupReport> {
    let mut report = CleanupReport::default();
    if !workspace.is_job_temp(job_temp) {
        tracing::warn!(dir = %job_temp.display(), "not a job scratch directory, left in place");
    } else if !policy.keep_temp && job_temp.exists() {
        match std::fs::remove_dir_all(job_temp) {
            Ok(()) => report.job_temp_removed = true,
            Err(e) => tracing::warn!(dir = %job_temp.display(), error = %e, "temp cleanup failed"),
        }
    }
    report.uploads_removed = keep_last_n(&workspace.uploads(), policy.keep_last, IMAGE_EXTENSIONS)?;
    report.renders_removed = keep_last_n(&workspace.renders(), policy.keep_last, VIDEO_EXTENSIONS)?;
    tracing::debug!(?report, "cleanup done");
    Ok(report)
}

#[cfg(test)]
#[path = "../../tests/unit/orchestrate/workspace.rs"]
mod tests;
