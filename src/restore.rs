//
// restore.rs
// ROI-LockTime-rs
//
// Recreates saved ROIs in a live structure set, one record at a time, collecting per-record outcomes.
//

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LockTimeError, RestoreStep, Result};
use crate::host::{BoxGeometry, HostError, Representation, RoiTarget};
use crate::roi::RoiRecord;

/// ROI type assigned to restored structures.
pub const RESTORED_ROI_TYPE: &str = "Undefined";
/// Colour used when the record carries none.
pub const FALLBACK_COLOUR: &str = "Blue";

/// A ROI recreated in the target structure set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredRoi {
    /// Label stored in the snapshot.
    pub label: String,
    /// Name the host assigned, which may differ to avoid collisions.
    pub name: String,
    /// Number of contour planes assigned.
    pub contour_count: usize,
}

impl RestoredRoi {
    /// The ROI was created but received no contour geometry.
    pub fn is_empty(&self) -> bool {
        self.contour_count == 0
    }
}

/// Restore a single record: create, seed, switch to contours, assign.
pub fn restore_one<H: RoiTarget + ?Sized>(record: &RoiRecord, host: &mut H) -> Result<RestoredRoi> {
    let label = record.label.as_str();
    let fail = |step: RestoreStep| {
        move |source: HostError| LockTimeError::Restore {
            label: label.to_string(),
            step,
            source,
        }
    };

    debug!(roi = label, "recreating ROI");
    let name = host
        .unique_roi_name(label)
        .map_err(fail(RestoreStep::Naming))?;
    let colour = record.colour.as_deref().unwrap_or(FALLBACK_COLOUR);

    host.create_roi(&name, RESTORED_ROI_TYPE, colour)
        .map_err(fail(RestoreStep::Creation))?;
    host.create_box_geometry(&name, &BoxGeometry::placeholder())
        .map_err(fail(RestoreStep::GeometrySeeding))?;
    host.set_representation(&name, Representation::Contours)
        .map_err(fail(RestoreStep::RepresentationSwitch))?;

    let contour_count = match record.contours() {
        Some(contours) if !contours.is_empty() => {
            host.set_contours(&name, contours)
                .map_err(fail(RestoreStep::ContourAssignment))?;
            contours.len()
        }
        _ => {
            warn!(roi = label, name = %name, "ROI has no contours, restored without geometry");
            0
        }
    };

    Ok(RestoredRoi {
        label: label.to_string(),
        name,
        contour_count,
    })
}

/// What to do after a record fails to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestorePolicy {
    #[default]
    Continue,
    Stop,
}

#[derive(Debug)]
pub struct RestoreFailure {
    pub label: String,
    pub error: LockTimeError,
}

/// Per-record outcome of a batch restoration. Nothing is rolled back.
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<RestoredRoi>,
    /// Records without loaded contours, skipped silently.
    pub skipped: Vec<String>,
    pub failures: Vec<RestoreFailure>,
    /// Records left untouched after a failure under [`RestorePolicy::Stop`].
    pub not_attempted: Vec<String>,
}

impl RestoreReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.restored.len() + self.failures.len()
    }
}

/// Restore every record that has contours loaded.
pub fn restore_records<'a, H, I>(records: I, host: &mut H, policy: RestorePolicy) -> RestoreReport
where
    H: RoiTarget + ?Sized,
    I: IntoIterator<Item = &'a RoiRecord>,
{
    let mut report = RestoreReport::default();
    let mut halted = false;

    for record in records {
        if !record.has_contours() {
            report.skipped.push(record.label.clone());
            continue;
        }
        if halted {
            report.not_attempted.push(record.label.clone());
            continue;
        }

        match restore_one(record, host) {
            Ok(restored) => report.restored.push(restored),
            Err(error) => {
                warn!(roi = %record.label, error = %error, "restore failed");
                report.failures.push(RestoreFailure {
                    label: record.label.clone(),
                    error,
                });
                halted = policy == RestorePolicy::Stop;
            }
        }
    }

    info!(
        restored = report.restored.len(),
        skipped = report.skipped.len(),
        failed = report.failures.len(),
        "restore finished"
    );
    report
}
