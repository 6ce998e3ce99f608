//
// host.rs
// ROI-LockTime-rs
//
// Capability traits describing what the core needs from the treatment-planning host, and the host's error type.
//

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Contour, Point3, RoiSummary, SimilarityMetrics};

/// Failures reported by the host itself.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("ROI '{0}' not found in the active structure set")]
    RoiNotFound(String),
    #[error("sub-structure-set {0} does not exist")]
    StructureSetNotFound(usize),
    #[error("ROI '{0}' has no geometry")]
    NoGeometry(String),
    #[error("ROI name '{0}' is already in use")]
    NameTaken(String),
    #[error("similarity of '{0}' and '{1}' cannot be computed")]
    Unsupported(String, String),
    #[error("host rejected the request: {0}")]
    Rejected(String),
}

/// A ROI as enumerated from a live sub-structure-set.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRoi {
    pub name: String,
    /// Alpha, red, green, blue.
    pub color: Option<[u8; 4]>,
    pub center_of_mass: Point3,
    pub volume: f64,
    pub has_contours: bool,
}

impl LiveRoi {
    /// Colour as stored in the interchange file, `"A,R,G,B"`.
    pub fn colour_string(&self) -> Option<String> {
        self.color
            .map(|[a, r, g, b]| format!("{},{},{},{}", a, r, g, b))
    }
}

/// Approval metadata of a locked sub-structure-set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Name as the host stores it, components separated by `^`.
    pub reviewer_full_name: String,
    pub review_time: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Representation {
    Voxels,
    Contours,
}

/// Box geometry used to seed a freshly created ROI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxGeometry {
    pub size: Point3,
    pub center: Point3,
    pub representation: Representation,
}

impl BoxGeometry {
    /// 2 cm voxel cube at the origin; the host needs some geometry before contours can be assigned.
    pub fn placeholder() -> Self {
        Self {
            size: Point3::new(2.0, 2.0, 2.0),
            center: Point3::ORIGIN,
            representation: Representation::Voxels,
        }
    }
}

/// Read access to the sub-structure-sets of the current examination.
pub trait LiveSource {
    fn patient_id(&self) -> Result<String, HostError>;
    fn sub_structure_set_count(&self) -> usize;
    fn sub_structure_set_rois(&self, index: usize) -> Result<Vec<LiveRoi>, HostError>;
    /// `Ok(None)` when the sub-structure-set has not been reviewed.
    fn review(&self, index: usize) -> Result<Option<Review>, HostError>;
    /// Contours of `label` as stored in the sub-structure-set itself,
    /// `Ok(None)` when that ROI has no delineated contours there.
    fn sub_structure_set_contours(
        &self,
        index: usize,
        label: &str,
    ) -> Result<Option<Vec<Contour>>, HostError>;
}

/// Per-label queries against the active structure set.
pub trait RoiLookup {
    /// `Ok(None)` when the ROI exists but has no delineated contours.
    fn contours(&self, label: &str) -> Result<Option<Vec<Contour>>, HostError>;
    fn summary(&self, label: &str) -> Result<RoiSummary, HostError>;
    /// Region comparison including distance-to-agreement measures.
    fn similarity(&self, reference: &str, compare: &str) -> Result<SimilarityMetrics, HostError>;
}

/// Lookups bound to one locked sub-structure-set instead of the active one.
///
/// Exports of a locked version read their contours through this, so later
/// edits or deletions in the active structure set do not leak into the record.
pub struct LockedSet<'a, S: ?Sized> {
    source: &'a S,
    index: usize,
}

impl<'a, S: LiveSource + ?Sized> LockedSet<'a, S> {
    pub fn new(source: &'a S, index: usize) -> Self {
        Self { source, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<S: LiveSource + ?Sized> RoiLookup for LockedSet<'_, S> {
    fn contours(&self, label: &str) -> Result<Option<Vec<Contour>>, HostError> {
        self.source.sub_structure_set_contours(self.index, label)
    }

    fn summary(&self, label: &str) -> Result<RoiSummary, HostError> {
        self.source
            .sub_structure_set_rois(self.index)?
            .into_iter()
            .find(|roi| roi.name == label)
            .map(|roi| RoiSummary {
                label: roi.name,
                volume: roi.volume,
                centroid: roi.center_of_mass,
            })
            .ok_or_else(|| HostError::RoiNotFound(label.to_string()))
    }

    /// Locked versions are read-only; the host only compares active ROIs.
    fn similarity(&self, reference: &str, compare: &str) -> Result<SimilarityMetrics, HostError> {
        Err(HostError::Unsupported(reference.to_string(), compare.to_string()))
    }
}

/// Mutations used when restoring ROIs into the active structure set.
pub trait RoiTarget {
    fn unique_roi_name(&self, desired: &str) -> Result<String, HostError>;
    fn create_roi(&mut self, name: &str, roi_type: &str, colour: &str) -> Result<(), HostError>;
    fn create_box_geometry(&mut self, name: &str, geometry: &BoxGeometry) -> Result<(), HostError>;
    fn set_representation(
        &mut self,
        name: &str,
        representation: Representation,
    ) -> Result<(), HostError>;
    fn set_contours(&mut self, name: &str, contours: &[Contour]) -> Result<(), HostError>;
}
