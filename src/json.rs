//
// json.rs
// ROI-LockTime-rs
//
// Reads and writes snapshots in the JSON interchange format, deciding which contour payloads travel with them.
//

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};

use crate::error::{FileFault, LockTimeError, Result};
use crate::host::RoiLookup;
use crate::snapshot::Snapshot;

const INDENT: &[u8] = b"    ";

/// Serialize a snapshot as indented JSON with lexicographically ordered keys.
pub fn to_json_string(snapshot: &Snapshot) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    write_pretty(snapshot, &mut buf)?;
    // serde_json only ever emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_pretty<W: Write>(snapshot: &Snapshot, writer: W) -> serde_json::Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(writer, PrettyFormatter::with_indent(INDENT));
    snapshot.serialize(&mut ser)
}

/// Parse a snapshot document and check the contour invariant of every record.
pub fn from_json_str(text: &str) -> std::result::Result<Snapshot, FileFault> {
    let snapshot: Snapshot = serde_json::from_str(text)?;
    validated(snapshot)
}

fn validated(mut snapshot: Snapshot) -> std::result::Result<Snapshot, FileFault> {
    for record in &mut snapshot.rois {
        record.normalize().map_err(FileFault::Invalid)?;
    }
    Ok(snapshot)
}

/// Load a snapshot from an interchange file.
pub fn load(path: &Path) -> Result<Snapshot> {
    let fault = |source: FileFault| LockTimeError::LoadFile {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| fault(e.into()))?;
    let snapshot: Snapshot =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| fault(e.into()))?;
    let snapshot = validated(snapshot).map_err(fault)?;

    // File names start with the patient ID; only the directory goes out above debug.
    debug!(path = %path.display(), "snapshot file read");
    info!(
        dir = %parent_display(path),
        rois = snapshot.rois.len(),
        approved = snapshot.is_approved(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Export including every record's contours, loading them from the host first.
///
/// A failing contour lookup aborts the export. Records loaded before the
/// failure stay loaded.
pub fn export_with_contours<H: RoiLookup + ?Sized>(
    snapshot: &mut Snapshot,
    dir: &Path,
    host: &H,
) -> Result<PathBuf> {
    for record in &mut snapshot.rois {
        record.load_contours(host)?;
    }
    write_snapshot(snapshot, dir)
}

/// Export summaries only. Any payload still in memory is dropped first.
pub fn export_without_contours(snapshot: &mut Snapshot, dir: &Path) -> Result<PathBuf> {
    for record in &mut snapshot.rois {
        record.unload_contours();
    }
    write_snapshot(snapshot, dir)
}

pub fn export<H: RoiLookup + ?Sized>(
    snapshot: &mut Snapshot,
    dir: &Path,
    include_contours: bool,
    host: &H,
) -> Result<PathBuf> {
    if include_contours {
        export_with_contours(snapshot, dir, host)
    } else {
        export_without_contours(snapshot, dir)
    }
}

fn write_snapshot(snapshot: &Snapshot, dir: &Path) -> Result<PathBuf> {
    if !is_plain_file_name(&snapshot.f_name) {
        return Err(LockTimeError::Export {
            path: dir.to_path_buf(),
            source: FileFault::Invalid(format!(
                "'{}' is not a plain file name",
                snapshot.f_name
            )),
        });
    }

    let path = dir.join(&snapshot.f_name);
    let fault = |source: FileFault| LockTimeError::Export {
        path: path.clone(),
        source,
    };

    debug!(path = %path.display(), "writing snapshot");
    let file = File::create(&path).map_err(|e| fault(e.into()))?;
    let mut writer = BufWriter::new(file);
    write_pretty(snapshot, &mut writer).map_err(|e| fault(e.into()))?;
    writer.flush().map_err(|e| fault(e.into()))?;

    info!(
        dir = %dir.display(),
        rois = snapshot.rois.len(),
        with_contours = snapshot.rois.iter().filter(|r| r.has_contours()).count(),
        "snapshot exported"
    );
    Ok(path)
}

/// `f_name` may come from a file; it must not point outside the export directory.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn parent_display(path: &Path) -> String {
    path.parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
