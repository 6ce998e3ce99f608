//
// browse.rs
// ROI-LockTime-rs
//
// Finds exported snapshots under a snapshot root so a reference can be picked, newest lock first.
//

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::json;
use crate::snapshot::LOCKTIME_FORMAT;

/// Provenance of one snapshot file found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub path: PathBuf,
    pub f_name: String,
    pub reviewer: Option<String>,
    pub locked_at: Option<NaiveDateTime>,
    pub rois: usize,
    pub with_contours: usize,
}

/// Every readable snapshot below `root`. Unreadable JSON files are logged and skipped.
pub fn find_snapshots(root: &Path) -> Vec<SnapshotEntry> {
    let mut entries: Vec<SnapshotEntry> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
        .filter_map(|e| match json::load(e.path()) {
            Ok(snapshot) => Some(SnapshotEntry {
                path: e.path().to_path_buf(),
                locked_at: snapshot
                    .locktime
                    .as_deref()
                    .and_then(|t| NaiveDateTime::parse_from_str(t, LOCKTIME_FORMAT).ok()),
                reviewer: snapshot.reviewer.clone(),
                rois: snapshot.rois.len(),
                with_contours: snapshot.rois.iter().filter(|r| r.has_contours()).count(),
                f_name: snapshot.f_name,
            }),
            Err(err) => {
                debug!(path = %e.path().display(), error = %err, "unreadable snapshot");
                warn!(
                    dir = %e.path().parent().map(|p| p.display().to_string()).unwrap_or_default(),
                    "not a snapshot, skipping"
                );
                None
            }
        })
        .collect();

    // Newest lock first; unapproved snapshots last, by name.
    entries.sort_by(|a, b| {
        b.locked_at
            .cmp(&a.locked_at)
            .then_with(|| a.f_name.cmp(&b.f_name))
    });
    entries
}
