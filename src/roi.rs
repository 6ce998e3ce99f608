//
// roi.rs
// ROI-LockTime-rs
//
// The ROI record: identity, geometry summary and the lazily loaded contour payload.
//

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compare::{self, Tolerance};
use crate::error::{LockTimeError, Result};
use crate::host::{RoiLookup, RoiTarget};
use crate::models::{ComparisonResult, Contour, Point3, RoiSummary};
use crate::restore::{self, RestoredRoi};

/// One ROI as captured in a snapshot.
///
/// Fields are declared in lexicographic order so the serialized keys are too.
/// `has_contours` is authoritative: a payload is only meaningful while it is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiRecord {
    pub centroid: Point3,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default)]
    contours: Option<Vec<Contour>>,
    #[serde(default)]
    has_contours: bool,
    pub label: String,
    pub volume: f64,
}

impl RoiRecord {
    pub fn new(
        label: impl Into<String>,
        colour: Option<String>,
        centroid: Point3,
        volume: f64,
    ) -> Self {
        Self {
            centroid,
            colour,
            contours: None,
            has_contours: false,
            label: label.into(),
            volume,
        }
    }

    /// Attach a contour payload, marking it as loaded.
    pub fn with_contours(mut self, contours: Vec<Contour>) -> Self {
        self.contours = Some(contours);
        self.has_contours = true;
        self
    }

    pub fn has_contours(&self) -> bool {
        self.has_contours
    }

    /// The loaded payload, `None` whenever `has_contours` is false.
    pub fn contours(&self) -> Option<&[Contour]> {
        if self.has_contours {
            self.contours.as_deref()
        } else {
            None
        }
    }

    pub fn summary(&self) -> RoiSummary {
        RoiSummary {
            label: self.label.clone(),
            volume: self.volume,
            centroid: self.centroid,
        }
    }

    /// Fetch this ROI's contours from the active structure set.
    ///
    /// A ROI without delineated contours is a normal state and leaves the
    /// record unloaded. A failing lookup is an error naming the label.
    pub fn load_contours<H: RoiLookup + ?Sized>(&mut self, host: &H) -> Result<()> {
        let fetched = host
            .contours(&self.label)
            .map_err(|source| LockTimeError::LoadContours {
                label: self.label.clone(),
                source,
            })?;

        match fetched {
            Some(contours) => {
                debug!(roi = %self.label, planes = contours.len(), "contours loaded");
                self.contours = Some(contours);
                self.has_contours = true;
            }
            None => {
                debug!(roi = %self.label, "no contours delineated");
                self.unload_contours();
            }
        }
        Ok(())
    }

    pub fn unload_contours(&mut self) {
        self.contours = None;
        self.has_contours = false;
    }

    /// Recreate this ROI in the target structure set.
    pub fn restore<H: RoiTarget + ?Sized>(&self, host: &mut H) -> Result<RestoredRoi> {
        restore::restore_one(self, host)
    }

    /// Compare this record with a live ROI, using the strict tolerance and
    /// host similarity metrics. Contours are loaded first if needed.
    pub fn compare_with<H: RoiLookup + ?Sized>(
        &mut self,
        other_label: &str,
        host: &H,
    ) -> Result<ComparisonResult> {
        if !self.has_contours {
            self.load_contours(host)?;
        }

        let other = host
            .summary(other_label)
            .map_err(|source| LockTimeError::Resolution {
                label: other_label.to_string(),
                source,
            })?;

        let metrics = host
            .similarity(&self.label, other_label)
            .map_err(|source| LockTimeError::Comparison {
                reference: self.label.clone(),
                compare: other_label.to_string(),
                source,
            })?;

        Ok(compare::with_metrics(
            &self.summary(),
            &other,
            Tolerance::STRICT,
            Some(metrics),
        ))
    }

    /// Bring a deserialized record in line with the `has_contours` invariant.
    pub(crate) fn normalize(&mut self) -> std::result::Result<(), String> {
        if !self.has_contours {
            self.contours = None;
        } else if self.contours.is_none() {
            return Err(format!(
                "ROI '{}' is marked as having contours but carries none",
                self.label
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostError;
    use crate::models::SimilarityMetrics;
    use serde_json::json;

    struct FixedLookup {
        contours: Option<Vec<Contour>>,
    }

    impl RoiLookup for FixedLookup {
        fn contours(&self, label: &str) -> std::result::Result<Option<Vec<Contour>>, HostError> {
            if label == "Missing" {
                return Err(HostError::RoiNotFound(label.to_string()));
            }
            Ok(self.contours.clone())
        }

        fn summary(&self, label: &str) -> std::result::Result<RoiSummary, HostError> {
            match label {
                "Bladder" | "Rectum" => Ok(RoiSummary {
                    label: label.to_string(),
                    volume: 45.231,
                    centroid: Point3::new(1.0, 2.0, 3.005),
                }),
                _ => Err(HostError::RoiNotFound(label.to_string())),
            }
        }

        fn similarity(
            &self,
            reference: &str,
            compare: &str,
        ) -> std::result::Result<SimilarityMetrics, HostError> {
            if reference == compare {
                Ok(SimilarityMetrics::PERFECT)
            } else {
                Err(HostError::Unsupported(reference.into(), compare.into()))
            }
        }
    }

    fn bladder() -> RoiRecord {
        RoiRecord::new(
            "Bladder",
            Some("255,255,255,0".into()),
            Point3::new(1.0, 2.0, 3.0),
            45.23,
        )
    }

    #[test]
    fn unload_is_idempotent() {
        let mut record = bladder().with_contours(vec![json!({"z": 1.0})]);
        record.unload_contours();
        let once = record.clone();
        record.unload_contours();
        assert_eq!(record, once);
        assert!(!record.has_contours());
        assert!(record.contours().is_none());
    }

    #[test]
    fn load_without_delineation_is_not_an_error() {
        let mut record = bladder().with_contours(vec![json!({"stale": true})]);
        record
            .load_contours(&FixedLookup { contours: None })
            .expect("no contours is fine");
        assert!(!record.has_contours());
        assert!(record.contours().is_none());
    }

    #[test]
    fn failed_lookup_names_the_roi() {
        let mut record = RoiRecord::new("Missing", None, Point3::ORIGIN, 1.0);
        let err = record
            .load_contours(&FixedLookup { contours: None })
            .unwrap_err();
        assert!(matches!(err, LockTimeError::LoadContours { ref label, .. } if label == "Missing"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn compare_with_loads_contours_and_uses_strict_tolerance() {
        let host = FixedLookup {
            contours: Some(vec![json!([{"x": 0.0, "y": 0.0, "z": 3.0}])]),
        };
        let mut record = bladder();
        let result = record.compare_with("Bladder", &host).expect("compare");

        assert!(record.has_contours());
        assert!(result.volume_match);
        assert!(result.centroid_match);
        assert_eq!(result.similarity_metrics, Some(SimilarityMetrics::PERFECT));
    }

    #[test]
    fn compare_with_unknown_label_is_a_resolution_error() {
        let host = FixedLookup {
            contours: Some(Vec::new()),
        };
        let mut record = bladder();
        let err = record.compare_with("Prostate", &host).unwrap_err();
        assert!(matches!(err, LockTimeError::Resolution { ref label, .. } if label == "Prostate"));
    }

    #[test]
    fn similarity_failure_names_both_rois() {
        let host = FixedLookup {
            contours: Some(Vec::new()),
        };
        let mut record = bladder();
        let err = record.compare_with("Rectum", &host).unwrap_err();

        match &err {
            LockTimeError::Comparison {
                reference,
                compare,
                source,
            } => {
                assert_eq!(reference, "Bladder");
                assert_eq!(compare, "Rectum");
                assert!(matches!(source, HostError::Unsupported(..)));
            }
            other => panic!("expected comparison error, got {other}"),
        }
        assert!(std::error::Error::source(&err).is_some());
        assert!(record.has_contours());
    }

    #[test]
    fn normalize_rejects_flag_without_payload() {
        let mut record: RoiRecord = serde_json::from_value(json!({
            "label": "PTV", "centroid": {"x": 0.0, "y": 0.0, "z": 0.0},
            "volume": 1.0, "has_contours": true, "contours": null
        }))
        .expect("parse");
        assert!(record.normalize().is_err());
    }
}
