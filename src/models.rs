//
// models.rs
// ROI-LockTime-rs
//
// Defines the plain serializable values shared by records, the comparator and the host contract.
//

use serde::{Deserialize, Serialize};

/// Contour geometry for one plane, owned by the host and carried verbatim.
pub type Contour = serde_json::Value;

/// Point in patient coordinates, centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Per-axis absolute differences, in x, y, z order.
    pub fn abs_deltas(&self, other: &Point3) -> [f64; 3] {
        [
            (self.x - other.x).abs(),
            (self.y - other.y).abs(),
            (self.z - other.z).abs(),
        ]
    }
}

impl std::fmt::Display for Point3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Identity and geometry summary of a ROI, as compared by the comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiSummary {
    pub label: String,
    pub volume: f64,
    pub centroid: Point3,
}

/// Overlap and surface-distance measures computed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimilarityMetrics {
    #[serde(rename = "DiceSimilarityCoefficient")]
    pub dice: f64,
    pub precision: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub mean_distance_to_agreement: f64,
    pub max_distance_to_agreement: f64,
}

impl SimilarityMetrics {
    /// Metrics for two identical regions.
    pub const PERFECT: SimilarityMetrics = SimilarityMetrics {
        dice: 1.0,
        precision: 1.0,
        sensitivity: 1.0,
        specificity: 1.0,
        mean_distance_to_agreement: 0.0,
        max_distance_to_agreement: 0.0,
    };
}

/// Frozen outcome of comparing a reference ROI with a compare ROI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub reference_label: String,
    pub reference_volume: f64,
    pub reference_centroid: Point3,
    pub compare_label: String,
    pub compare_volume: f64,
    pub compare_centroid: Point3,
    pub volume_match: bool,
    pub centroid_match: bool,
    pub similarity_metrics: Option<SimilarityMetrics>,
}
