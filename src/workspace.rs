//
// workspace.rs
// ROI-LockTime-rs
//
// File-backed stand-in for the treatment-planning host: one patient's current structure set and its locked versions.
//

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FileFault, LockTimeError, Result};
use crate::host::{
    BoxGeometry, HostError, LiveRoi, LiveSource, Representation, Review, RoiLookup, RoiTarget,
};
use crate::models::{Contour, Point3, RoiSummary, SimilarityMetrics};

/// A ROI as stored in the workspace file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceRoi {
    pub name: String,
    #[serde(default)]
    pub color: Option<[u8; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi_type: Option<String>,
    pub center_of_mass: Point3,
    pub volume: f64,
    /// Representation of the primary shape; `None` for a ROI without geometry.
    #[serde(default = "contours_representation")]
    pub representation: Option<Representation>,
    #[serde(default)]
    pub contours: Option<Vec<Contour>>,
}

fn contours_representation() -> Option<Representation> {
    Some(Representation::Contours)
}

impl WorkspaceRoi {
    fn has_contours(&self) -> bool {
        self.representation == Some(Representation::Contours) && self.contours.is_some()
    }

    fn contours_if_delineated(&self) -> Option<Vec<Contour>> {
        if self.has_contours() {
            self.contours.clone()
        } else {
            None
        }
    }

    fn summary(&self) -> RoiSummary {
        RoiSummary {
            label: self.name.clone(),
            volume: self.volume,
            centroid: self.center_of_mass,
        }
    }

    fn live(&self) -> LiveRoi {
        LiveRoi {
            name: self.name.clone(),
            color: self.color,
            center_of_mass: self.center_of_mass,
            volume: self.volume,
            has_contours: self.has_contours(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSet {
    #[serde(default)]
    pub review: Option<Review>,
    #[serde(default)]
    pub rois: Vec<WorkspaceRoi>,
}

/// Host-computed metrics for a pair of ROIs in the current structure set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEntry {
    pub reference: String,
    pub compare: String,
    pub metrics: SimilarityMetrics,
}

/// Patient workspace acting as the live host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub patient_id: String,
    /// The editable structure set of the current examination.
    pub current: WorkspaceSet,
    /// Locked versions, oldest first.
    #[serde(default)]
    pub sub_structure_sets: Vec<WorkspaceSet>,
    #[serde(default)]
    pub similarity: Vec<SimilarityEntry>,
}

impl Workspace {
    pub fn new(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            current: WorkspaceSet::default(),
            sub_structure_sets: Vec::new(),
            similarity: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let fault = |source: FileFault| LockTimeError::LoadFile {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(|e| fault(e.into()))?;
        let workspace: Workspace =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| fault(e.into()))?;

        info!(
            path = %path.display(),
            rois = workspace.current.rois.len(),
            locked = workspace.sub_structure_sets.len(),
            "workspace opened"
        );
        Ok(workspace)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let fault = |source: FileFault| LockTimeError::Export {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(|e| fault(e.into()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| fault(e.into()))?;
        writer.flush().map_err(|e| fault(e.into()))?;
        info!(path = %path.display(), "workspace saved");
        Ok(())
    }

    /// Lock the current structure set as a new reviewed version.
    pub fn lock_current(&mut self, review: Review) -> usize {
        self.sub_structure_sets.push(WorkspaceSet {
            review: Some(review),
            rois: self.current.rois.clone(),
        });
        self.sub_structure_sets.len() - 1
    }

    pub fn add_similarity(
        &mut self,
        reference: impl Into<String>,
        compare: impl Into<String>,
        metrics: SimilarityMetrics,
    ) {
        self.similarity.push(SimilarityEntry {
            reference: reference.into(),
            compare: compare.into(),
            metrics,
        });
    }

    pub fn roi(&self, name: &str) -> Option<&WorkspaceRoi> {
        self.current.rois.iter().find(|r| r.name == name)
    }

    fn roi_mut(&mut self, name: &str) -> std::result::Result<&mut WorkspaceRoi, HostError> {
        self.current
            .rois
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| HostError::RoiNotFound(name.to_string()))
    }

    fn existing(&self, name: &str) -> std::result::Result<&WorkspaceRoi, HostError> {
        self.roi(name)
            .ok_or_else(|| HostError::RoiNotFound(name.to_string()))
    }

    fn sub_set(&self, index: usize) -> std::result::Result<&WorkspaceSet, HostError> {
        self.sub_structure_sets
            .get(index)
            .ok_or(HostError::StructureSetNotFound(index))
    }
}

impl LiveSource for Workspace {
    fn patient_id(&self) -> std::result::Result<String, HostError> {
        Ok(self.patient_id.clone())
    }

    fn sub_structure_set_count(&self) -> usize {
        self.sub_structure_sets.len()
    }

    fn sub_structure_set_rois(&self, index: usize) -> std::result::Result<Vec<LiveRoi>, HostError> {
        Ok(self.sub_set(index)?.rois.iter().map(WorkspaceRoi::live).collect())
    }

    fn review(&self, index: usize) -> std::result::Result<Option<Review>, HostError> {
        Ok(self.sub_set(index)?.review.clone())
    }

    fn sub_structure_set_contours(
        &self,
        index: usize,
        label: &str,
    ) -> std::result::Result<Option<Vec<Contour>>, HostError> {
        let roi = self
            .sub_set(index)?
            .rois
            .iter()
            .find(|r| r.name == label)
            .ok_or_else(|| HostError::RoiNotFound(label.to_string()))?;
        Ok(roi.contours_if_delineated())
    }
}

impl RoiLookup for Workspace {
    fn contours(&self, label: &str) -> std::result::Result<Option<Vec<Contour>>, HostError> {
        Ok(self.existing(label)?.contours_if_delineated())
    }

    fn summary(&self, label: &str) -> std::result::Result<RoiSummary, HostError> {
        self.existing(label).map(WorkspaceRoi::summary)
    }

    fn similarity(
        &self,
        reference: &str,
        compare: &str,
    ) -> std::result::Result<SimilarityMetrics, HostError> {
        for label in [reference, compare] {
            if self.existing(label)?.representation.is_none() {
                return Err(HostError::NoGeometry(label.to_string()));
            }
        }
        if reference == compare {
            return Ok(SimilarityMetrics::PERFECT);
        }
        self.similarity
            .iter()
            .find(|e| {
                (e.reference == reference && e.compare == compare)
                    || (e.reference == compare && e.compare == reference)
            })
            .map(|e| e.metrics)
            .ok_or_else(|| HostError::Unsupported(reference.to_string(), compare.to_string()))
    }
}

impl RoiTarget for Workspace {
    fn unique_roi_name(&self, desired: &str) -> std::result::Result<String, HostError> {
        if self.roi(desired).is_none() {
            return Ok(desired.to_string());
        }
        let name = (1..)
            .map(|n| format!("{desired} ({n})"))
            .find(|candidate| self.roi(candidate).is_none())
            .unwrap_or_else(|| desired.to_string());
        Ok(name)
    }

    fn create_roi(
        &mut self,
        name: &str,
        roi_type: &str,
        colour: &str,
    ) -> std::result::Result<(), HostError> {
        if self.roi(name).is_some() {
            return Err(HostError::NameTaken(name.to_string()));
        }
        debug!(name, roi_type, colour, "creating ROI");
        self.current.rois.push(WorkspaceRoi {
            name: name.to_string(),
            color: parse_colour(colour),
            roi_type: Some(roi_type.to_string()),
            center_of_mass: Point3::ORIGIN,
            volume: 0.0,
            representation: None,
            contours: None,
        });
        Ok(())
    }

    fn create_box_geometry(
        &mut self,
        name: &str,
        geometry: &BoxGeometry,
    ) -> std::result::Result<(), HostError> {
        let roi = self.roi_mut(name)?;
        roi.representation = Some(geometry.representation);
        roi.center_of_mass = geometry.center;
        roi.volume = geometry.size.x * geometry.size.y * geometry.size.z;
        roi.contours = None;
        Ok(())
    }

    fn set_representation(
        &mut self,
        name: &str,
        representation: Representation,
    ) -> std::result::Result<(), HostError> {
        let roi = self.roi_mut(name)?;
        if roi.representation.is_none() {
            return Err(HostError::NoGeometry(name.to_string()));
        }
        if representation == Representation::Contours && roi.contours.is_none() {
            roi.contours = Some(Vec::new());
        }
        roi.representation = Some(representation);
        Ok(())
    }

    fn set_contours(
        &mut self,
        name: &str,
        contours: &[Contour],
    ) -> std::result::Result<(), HostError> {
        let roi = self.roi_mut(name)?;
        if roi.representation != Some(Representation::Contours) {
            return Err(HostError::Rejected(format!(
                "ROI '{name}' is not contour-based"
            )));
        }
        roi.contours = Some(contours.to_vec());
        Ok(())
    }
}

/// `"A,R,G,B"` to components; anything else (named colours) has none.
fn parse_colour(colour: &str) -> Option<[u8; 4]> {
    let parts: Vec<u8> = colour
        .split(',')
        .map(|p| p.trim().parse::<u8>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    parts.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workspace() -> Workspace {
        let mut ws = Workspace::new("RTX1");
        ws.current.rois.push(WorkspaceRoi {
            name: "PTV".into(),
            color: Some([255, 255, 0, 0]),
            roi_type: None,
            center_of_mass: Point3::new(0.1, 0.2, 0.3),
            volume: 10.0,
            representation: Some(Representation::Contours),
            contours: Some(vec![json!({"plane": 0})]),
        });
        ws
    }

    #[test]
    fn unique_names_avoid_collisions() {
        let mut ws = workspace();
        assert_eq!(ws.unique_roi_name("CTV").expect("name"), "CTV");
        assert_eq!(ws.unique_roi_name("PTV").expect("name"), "PTV (1)");
        ws.create_roi("PTV (1)", "Undefined", "Blue").expect("create");
        assert_eq!(ws.unique_roi_name("PTV").expect("name"), "PTV (2)");
        assert!(matches!(
            ws.create_roi("PTV", "Undefined", "Blue"),
            Err(HostError::NameTaken(_))
        ));
    }

    #[test]
    fn contours_require_seeded_geometry() {
        let mut ws = workspace();
        ws.create_roi("New", "Undefined", "255,0,0,255").expect("create");
        assert_eq!(ws.roi("New").and_then(|r| r.color), Some([255, 0, 0, 255]));
        assert!(matches!(
            ws.set_representation("New", Representation::Contours),
            Err(HostError::NoGeometry(_))
        ));

        ws.create_box_geometry("New", &BoxGeometry::placeholder())
            .expect("seed");
        assert!(ws.set_contours("New", &[json!({})]).is_err());
        ws.set_representation("New", Representation::Contours)
            .expect("switch");
        ws.set_contours("New", &[json!({"plane": 3})]).expect("assign");
        assert_eq!(ws.contours("New").expect("lookup").map(|c| c.len()), Some(1));
    }

    #[test]
    fn similarity_uses_identity_or_table() {
        let mut ws = workspace();
        assert_eq!(
            ws.similarity("PTV", "PTV").expect("self"),
            SimilarityMetrics::PERFECT
        );
        ws.current.rois.push(WorkspaceRoi {
            name: "CTV".into(),
            ..ws.current.rois[0].clone()
        });
        assert!(matches!(
            ws.similarity("PTV", "CTV"),
            Err(HostError::Unsupported(..))
        ));
        let metrics = SimilarityMetrics {
            dice: 0.8,
            ..SimilarityMetrics::PERFECT
        };
        ws.add_similarity("CTV", "PTV", metrics);
        assert_eq!(ws.similarity("PTV", "CTV").expect("table"), metrics);
        assert!(matches!(
            ws.similarity("PTV", "Nope"),
            Err(HostError::RoiNotFound(_))
        ));
    }

    #[test]
    fn locked_versions_keep_their_own_contours() {
        let mut ws = workspace();
        ws.lock_current(Review {
            reviewer_full_name: "Doe^Jane".into(),
            review_time: chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
                .and_then(|d| d.and_hms_opt(8, 0, 0))
                .expect("valid date"),
        });
        ws.current.rois[0].contours = Some(vec![json!({"plane": 99})]);

        assert_eq!(
            ws.sub_structure_set_contours(0, "PTV").expect("locked"),
            Some(vec![json!({"plane": 0})])
        );
        assert!(matches!(
            ws.sub_structure_set_contours(0, "CTV"),
            Err(HostError::RoiNotFound(_))
        ));
        assert!(matches!(
            ws.sub_structure_set_contours(3, "PTV"),
            Err(HostError::StructureSetNotFound(3))
        ));
    }

    #[test]
    fn named_colours_have_no_components() {
        assert_eq!(parse_colour("Blue"), None);
        assert_eq!(parse_colour("1, 2, 3, 4"), Some([1, 2, 3, 4]));
        assert_eq!(parse_colour("1,2,3"), None);
    }
}
