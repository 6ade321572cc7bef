//! Ephemeral storage cleanup.
//!
//! Cleanup runs after the response is assembled and is never awaited by
//! the request path: a failed deletion must not degrade latency or turn
//! a successful result into a reported failure. Everything here logs
//! and swallows its errors.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

/// Remove one request's ephemeral artifacts in the background.
///
/// Returns the join handle so tests can await completion; the request
/// path drops it.
pub fn spawn_cleanup(
    staging_root: PathBuf,
    request_id: String,
    archive_path: PathBuf,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        cleanup(&staging_root, &request_id, &archive_path).await;
    })
}

/// Remove the per-request staging directory and the locally mirrored
/// archive. Each removal is guarded independently; neither failure
/// prevents the other attempt, and nothing propagates.
pub async fn cleanup(staging_root: &Path, request_id: &str, archive_path: &Path) {
    let staging_dir = staging_root.join(request_id);
    match tokio::fs::remove_dir_all(&staging_dir).await {
        Ok(()) => tracing::info!(dir = %staging_dir.display(), "removed staging directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(dir = %staging_dir.display(), "staging directory was never created");
        }
        Err(e) => {
            tracing::warn!(dir = %staging_dir.display(), "failed to remove staging directory: {e}");
        }
    }

    match tokio::fs::remove_file(archive_path).await {
        Ok(()) => tracing::info!(archive = %archive_path.display(), "removed mirrored archive"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(archive = %archive_path.display(), "failed to remove archive: {e}");
        }
    }
}

/// Outcome of one aged-artifact sweep target.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SweepReport {
    pub deleted: usize,
    pub errors: usize,
}

/// Which artifact kinds an aged sweep should touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepMode {
    /// Both mirrored archives and staging directories.
    #[default]
    All,
    /// Only stray `.zip` mirrors.
    Archives,
    /// Only per-request staging directories.
    Staging,
}

impl SweepMode {
    /// Parse the `mode` query value; unknown values mean everything.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "archives" | "uploads" => Self::Archives,
            "staging" => Self::Staging,
            _ => Self::All,
        }
    }
}

/// Delete leftover upload artifacts older than `age_threshold_hours`:
/// stray `.zip` mirrors and stale staging directories that a crashed or
/// killed request never cleaned up. Per-item failures are counted, not
/// fatal.
pub fn sweep_aged(staging_root: &Path, age_threshold_hours: f64, mode: SweepMode) -> SweepReport {
    let mut report = SweepReport::default();

    let entries = match std::fs::read_dir(staging_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(dir = %staging_root.display(), "uploads directory does not exist");
            return report;
        }
        Err(e) => {
            tracing::warn!(dir = %staging_root.display(), "failed to read uploads directory: {e}");
            report.errors += 1;
            return report;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else {
            report.errors += 1;
            continue;
        };
        let path = entry.path();

        let age_hours = match artifact_age_hours(&path) {
            Some(age) => age,
            None => {
                report.errors += 1;
                continue;
            }
        };
        if age_hours <= age_threshold_hours {
            continue;
        }

        let removed = if path.is_dir() && mode != SweepMode::Archives {
            std::fs::remove_dir_all(&path)
        } else if !path.is_dir()
            && mode != SweepMode::Staging
            && path.extension().is_some_and(|ext| ext == "zip")
        {
            std::fs::remove_file(&path)
        } else {
            continue;
        };

        match removed {
            Ok(()) => {
                tracing::info!(path = %path.display(), age_hours, "swept aged artifact");
                report.deleted += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to sweep artifact: {e}");
                report.errors += 1;
            }
        }
    }

    report
}

fn artifact_age_hours(path: &Path) -> Option<f64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let age = SystemTime::now().duration_since(modified).ok()?;
    Some(age.as_secs_f64() / 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_cleanup_removes_both_artifacts() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("req-1");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("a.pdf"), b"pdf").unwrap();
        let archive = dir.path().join("req-1_temp.zip");
        std::fs::write(&archive, b"zip").unwrap();

        cleanup(dir.path(), "req-1", &archive).await;

        assert!(!staging.exists());
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_missing_staging() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("req-2_temp.zip");
        std::fs::write(&archive, b"zip").unwrap();

        // Staging dir was never created; archive must still be removed.
        cleanup(dir.path(), "req-2", &archive).await;
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_nothing_to_do() {
        let dir = tempdir().unwrap();
        cleanup(dir.path(), "req-3", &dir.path().join("absent.zip")).await;
    }

    #[tokio::test]
    async fn test_spawn_cleanup_runs_detached() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("req-4");
        std::fs::create_dir_all(&staging).unwrap();
        let archive = dir.path().join("req-4_temp.zip");
        std::fs::write(&archive, b"zip").unwrap();

        spawn_cleanup(
            dir.path().to_path_buf(),
            "req-4".to_string(),
            archive.clone(),
        )
        .await
        .unwrap();

        assert!(!staging.exists());
        assert!(!archive.exists());
    }

    #[test]
    fn test_sweep_deletes_aged_only() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("old.zip"), b"zip").unwrap();
        std::fs::create_dir_all(dir.path().join("stale-request")).unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"not a zip").unwrap();

        // Threshold zero: everything sweepable counts as aged.
        let report = sweep_aged(dir.path(), 0.0, SweepMode::All);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.errors, 0);
        assert!(!dir.path().join("old.zip").exists());
        assert!(!dir.path().join("stale-request").exists());
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn test_sweep_keeps_fresh_artifacts() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("fresh.zip"), b"zip").unwrap();

        let report = sweep_aged(dir.path(), 24.0, SweepMode::All);
        assert_eq!(report.deleted, 0);
        assert!(dir.path().join("fresh.zip").exists());
    }

    #[test]
    fn test_sweep_mode_filters_targets() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("old.zip"), b"zip").unwrap();
        std::fs::create_dir_all(dir.path().join("stale-request")).unwrap();

        let report = sweep_aged(dir.path(), 0.0, SweepMode::Archives);
        assert_eq!(report.deleted, 1);
        assert!(!dir.path().join("old.zip").exists());
        assert!(dir.path().join("stale-request").exists());

        let report = sweep_aged(dir.path(), 0.0, SweepMode::Staging);
        assert_eq!(report.deleted, 1);
        assert!(!dir.path().join("stale-request").exists());
    }

    #[test]
    fn test_sweep_mode_parse() {
        assert_eq!(SweepMode::parse("uploads"), SweepMode::Archives);
        assert_eq!(SweepMode::parse("staging"), SweepMode::Staging);
        assert_eq!(SweepMode::parse("all"), SweepMode::All);
        assert_eq!(SweepMode::parse("anything-else"), SweepMode::All);
    }

    #[test]
    fn test_sweep_missing_root_is_empty_report() {
        let dir = tempdir().unwrap();
        let report = sweep_aged(&dir.path().join("never-created"), 24.0, SweepMode::All);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.errors, 0);
    }
}
