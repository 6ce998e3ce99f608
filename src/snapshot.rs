//
// snapshot.rs
// ROI-LockTime-rs
//
// A structure set captured at lock time: provenance plus ROI records, built from the live host or from a file.
//

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LockTimeError, Result};
use crate::host::{LiveSource, LockedSet, Review, RoiLookup, RoiTarget};
use crate::json;
use crate::restore::{self, RestorePolicy, RestoreReport};
use crate::roi::RoiRecord;

/// `strftime` pattern of the `locktime` field.
pub const LOCKTIME_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";
/// Stands in for the reviewer in file names of unreviewed structure sets.
pub const UNAPPROVED_MARKER: &str = "UNAPPROVED";
pub const FIELD_SEPARATOR: &str = "_";
pub const FILE_SUFFIX: &str = ".json";

/// Snapshot of a sub-structure-set. Fields are in lexicographic order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub f_name: String,
    #[serde(deserialize_with = "present_or_null")]
    pub locktime: Option<String>,
    #[serde(deserialize_with = "present_or_null")]
    pub reviewer: Option<String>,
    pub rois: Vec<RoiRecord>,
}

/// The key must exist; only its value may be null.
fn present_or_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

/// Where a snapshot should come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    File(PathBuf),
    Live(usize),
}

impl SnapshotSource {
    /// Pick a source from optional inputs. A file path takes precedence.
    pub fn from_options(path: Option<PathBuf>, index: Option<usize>) -> Result<Self> {
        match (path, index) {
            (Some(path), _) => Ok(SnapshotSource::File(path)),
            (None, Some(index)) => Ok(SnapshotSource::Live(index)),
            (None, None) => Err(LockTimeError::Configuration(
                "neither a snapshot file nor a sub-structure-set index was given",
            )),
        }
    }
}

impl Snapshot {
    pub fn open<S: LiveSource + ?Sized>(source: &SnapshotSource, host: &S) -> Result<Self> {
        match source {
            SnapshotSource::File(path) => Self::from_file(path),
            SnapshotSource::Live(index) => Self::from_live(host, *index),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        json::load(path)
    }

    /// Capture the ROIs of a live sub-structure-set that have contour geometry.
    ///
    /// Contours are not loaded here. Missing or unreadable review metadata
    /// yields an unapproved snapshot rather than an error.
    pub fn from_live<S: LiveSource + ?Sized>(source: &S, index: usize) -> Result<Self> {
        let live_fault = |e| LockTimeError::LiveSource { index, source: e };

        let patient_id = source.patient_id().map_err(live_fault)?;
        let live_rois = source.sub_structure_set_rois(index).map_err(live_fault)?;

        let review = match source.review(index) {
            Ok(review) => review,
            Err(e) => {
                warn!(index, error = %e, "review metadata unavailable, treating as unapproved");
                None
            }
        };
        let (locktime, reviewer) = match review {
            Some(review) => {
                let (locktime, reviewer) = provenance(&review);
                (Some(locktime), Some(reviewer))
            }
            None => (None, None),
        };
        let f_name = file_name(&patient_id, reviewer.as_deref().zip(locktime.as_deref()));

        let total = live_rois.len();
        let rois: Vec<RoiRecord> = live_rois
            .into_iter()
            .filter(|roi| {
                if !roi.has_contours {
                    debug!(roi = %roi.name, "skipping ROI without contour geometry");
                }
                roi.has_contours
            })
            .map(|roi| {
                let colour = roi.colour_string();
                RoiRecord::new(roi.name, colour, roi.center_of_mass, roi.volume)
            })
            .collect();

        info!(
            index,
            rois = rois.len(),
            skipped = total - rois.len(),
            approved = locktime.is_some(),
            "snapshot captured from live structure set"
        );

        Ok(Self {
            f_name,
            locktime,
            reviewer,
            rois,
        })
    }

    pub fn is_approved(&self) -> bool {
        self.locktime.is_some() && self.reviewer.is_some()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.rois.iter().map(|r| r.label.as_str()).collect()
    }

    pub fn record(&self, label: &str) -> Option<&RoiRecord> {
        self.rois.iter().find(|r| r.label == label)
    }

    pub fn record_mut(&mut self, label: &str) -> Option<&mut RoiRecord> {
        self.rois.iter_mut().find(|r| r.label == label)
    }

    /// Write to `dir/f_name`, see [`json::export`].
    pub fn export<H: RoiLookup + ?Sized>(
        &mut self,
        dir: &Path,
        include_contours: bool,
        host: &H,
    ) -> Result<PathBuf> {
        json::export(self, dir, include_contours, host)
    }

    /// Export a snapshot built from locked sub-structure-set `index`.
    ///
    /// Contours come from that locked version, not from the active structure set.
    pub fn export_locked<S: LiveSource + ?Sized>(
        &mut self,
        dir: &Path,
        include_contours: bool,
        source: &S,
        index: usize,
    ) -> Result<PathBuf> {
        json::export(self, dir, include_contours, &LockedSet::new(source, index))
    }

    /// Restore every record with contours loaded; the rest are skipped.
    pub fn restore_all<H: RoiTarget + ?Sized>(
        &self,
        host: &mut H,
        policy: RestorePolicy,
    ) -> RestoreReport {
        restore::restore_records(&self.rois, host, policy)
    }
}

/// Lock time and display name of the reviewer.
fn provenance(review: &Review) -> (String, String) {
    let locktime = review.review_time.format(LOCKTIME_FORMAT).to_string();
    let reviewer = review.reviewer_full_name.replace('^', " ");
    (locktime, reviewer)
}

/// `<patient>_<reviewer>_<locktime>_.json`, or `<patient>_UNAPPROVED_.json`.
pub fn file_name(patient_id: &str, approval: Option<(&str, &str)>) -> String {
    let mut parts = vec![sanitize_component(patient_id)];
    match approval {
        Some((reviewer, locktime)) => {
            parts.push(sanitize_component(&reviewer.replace(' ', FIELD_SEPARATOR)));
            parts.push(locktime.to_string());
        }
        None => parts.push(UNAPPROVED_MARKER.to_string()),
    }
    parts.push(FILE_SUFFIX.to_string());
    parts.join(FIELD_SEPARATOR)
}

fn sanitize_component(input: &str) -> String {
    // File names end up on a shared drive; keep only letters, digits and separators.
    input
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostError, LiveRoi};
    use crate::models::Point3;
    use chrono::NaiveDate;

    struct StubSource {
        review: std::result::Result<Option<Review>, ()>,
    }

    impl LiveSource for StubSource {
        fn patient_id(&self) -> std::result::Result<String, HostError> {
            Ok("RTX123".into())
        }

        fn sub_structure_set_count(&self) -> usize {
            1
        }

        fn sub_structure_set_rois(&self, index: usize) -> std::result::Result<Vec<LiveRoi>, HostError> {
            if index != 0 {
                return Err(HostError::StructureSetNotFound(index));
            }
            Ok(vec![
                LiveRoi {
                    name: "Bladder".into(),
                    color: Some([255, 255, 255, 0]),
                    center_of_mass: Point3::new(1.0, 2.0, 3.0),
                    volume: 45.23,
                    has_contours: true,
                },
                LiveRoi {
                    name: "Ref point".into(),
                    color: None,
                    center_of_mass: Point3::ORIGIN,
                    volume: 0.0,
                    has_contours: false,
                },
            ])
        }

        fn review(&self, _index: usize) -> std::result::Result<Option<Review>, HostError> {
            self.review
                .clone()
                .map_err(|_| HostError::Rejected("review not readable".into()))
        }

        fn sub_structure_set_contours(
            &self,
            _index: usize,
            _label: &str,
        ) -> std::result::Result<Option<Vec<crate::models::Contour>>, HostError> {
            Ok(None)
        }
    }

    fn reviewed() -> Review {
        Review {
            reviewer_full_name: "Doe^Jane".into(),
            review_time: NaiveDate::from_ymd_opt(2023, 2, 21)
                .and_then(|d| d.and_hms_opt(9, 37, 14))
                .expect("valid date"),
        }
    }

    #[test]
    fn approved_snapshot_carries_provenance() {
        let source = StubSource {
            review: Ok(Some(reviewed())),
        };
        let snapshot = Snapshot::from_live(&source, 0).expect("snapshot");

        assert_eq!(snapshot.locktime.as_deref(), Some("02_21_2023_09_37_14"));
        assert_eq!(snapshot.reviewer.as_deref(), Some("Doe Jane"));
        assert_eq!(snapshot.f_name, "RTX123_Doe_Jane_02_21_2023_09_37_14_.json");
        assert_eq!(snapshot.labels(), vec!["Bladder"]);

        let bladder = snapshot.record("Bladder").expect("bladder");
        assert_eq!(bladder.colour.as_deref(), Some("255,255,255,0"));
        assert!(!bladder.has_contours());
    }

    #[test]
    fn unreadable_review_means_unapproved() {
        for review in [Ok(None), Err(())] {
            let snapshot = Snapshot::from_live(&StubSource { review }, 0).expect("snapshot");
            assert!(!snapshot.is_approved());
            assert!(snapshot.reviewer.is_none());
            assert_eq!(snapshot.f_name, "RTX123_UNAPPROVED_.json");
        }
    }

    #[test]
    fn missing_structure_set_is_an_error() {
        let source = StubSource { review: Ok(None) };
        let err = Snapshot::from_live(&source, 4).unwrap_err();
        assert!(matches!(err, LockTimeError::LiveSource { index: 4, .. }));
    }

    #[test]
    fn source_requires_path_or_index() {
        assert!(matches!(
            SnapshotSource::from_options(None, None),
            Err(LockTimeError::Configuration(_))
        ));
        assert_eq!(
            SnapshotSource::from_options(Some("a.json".into()), Some(2)).expect("source"),
            SnapshotSource::File("a.json".into())
        );
        assert_eq!(
            SnapshotSource::from_options(None, Some(2)).expect("source"),
            SnapshotSource::Live(2)
        );
    }

    #[test]
    fn file_name_strips_path_characters() {
        assert_eq!(
            file_name("../RTX 9", Some(("Jane Doe", "01_01_2024_00_00_00"))),
            "RTX9_Jane_Doe_01_01_2024_00_00_00_.json"
        );
    }

    #[test]
    fn file_name_keeps_accented_letters() {
        assert_eq!(
            file_name("RTX7", Some(("Ana Mendonça", "03_04_2024_10_00_00"))),
            "RTX7_Ana_Mendonça_03_04_2024_10_00_00_.json"
        );
        assert_eq!(
            file_name("RTX7", Some(("O'Brien/Müller", "03_04_2024_10_00_00"))),
            "RTX7_OBrienMüller_03_04_2024_10_00_00_.json"
        );
    }
}
