//
// compare.rs
// ROI-LockTime-rs
//
// Volume and centroid agreement checks, the four-way verdict shown per row, and the default reference pairing.
//

use crate::models::{ComparisonResult, Point3, RoiSummary, SimilarityMetrics};

/// Per-axis centroid tolerance in centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub centroid_cm: f64,
}

impl Tolerance {
    /// Audit-grade check used for single-ROI comparisons and exported reports.
    pub const STRICT: Tolerance = Tolerance { centroid_cm: 0.01 };
    /// Coarse visual check used by the row-by-row structure set check.
    pub const INTERACTIVE: Tolerance = Tolerance { centroid_cm: 0.1 };
}

/// Volume in hundredths of a cubic centimetre, rounded toward zero.
///
/// The small offset absorbs binary representation error, so `10.01` counts as
/// 1001 hundredths rather than 1000.
fn hundredths(volume: f64) -> i64 {
    let scaled = volume * 100.0;
    (scaled + 1e-6_f64.copysign(scaled)).trunc() as i64
}

/// True when both volumes agree at two decimal places.
pub fn volumes_match(a: f64, b: f64) -> bool {
    hundredths(a) == hundredths(b)
}

/// True when no axis differs by more than the tolerance.
pub fn centroids_match(a: &Point3, b: &Point3, tolerance: Tolerance) -> bool {
    a.abs_deltas(b)
        .iter()
        .all(|delta| *delta <= tolerance.centroid_cm)
}

/// Compare two summaries without host metrics.
pub fn compare_summaries(
    reference: &RoiSummary,
    compare: &RoiSummary,
    tolerance: Tolerance,
) -> ComparisonResult {
    with_metrics(reference, compare, tolerance, None)
}

pub(crate) fn with_metrics(
    reference: &RoiSummary,
    compare: &RoiSummary,
    tolerance: Tolerance,
    similarity_metrics: Option<SimilarityMetrics>,
) -> ComparisonResult {
    ComparisonResult {
        reference_label: reference.label.clone(),
        reference_volume: reference.volume,
        reference_centroid: reference.centroid,
        compare_label: compare.label.clone(),
        compare_volume: compare.volume,
        compare_centroid: compare.centroid,
        volume_match: volumes_match(reference.volume, compare.volume),
        centroid_match: centroids_match(&reference.centroid, &compare.centroid, tolerance),
        similarity_metrics,
    }
}

/// Display category for a pair of match flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    VolumeOnly,
    CentroidOnly,
    Mismatch,
}

impl Verdict {
    pub fn from_flags(volume_match: bool, centroid_match: bool) -> Self {
        match (volume_match, centroid_match) {
            (true, true) => Verdict::Match,
            (true, false) => Verdict::VolumeOnly,
            (false, true) => Verdict::CentroidOnly,
            (false, false) => Verdict::Mismatch,
        }
    }

    pub fn of(result: &ComparisonResult) -> Self {
        Self::from_flags(result.volume_match, result.centroid_match)
    }

    pub fn text(&self) -> &'static str {
        match self {
            Verdict::Match => "VOLUME & CENTROID MATCH",
            Verdict::VolumeOnly => "VOLUME MATCH, CENTROID FAIL",
            Verdict::CentroidOnly => "VOLUME FAIL, CENTROID MATCH",
            Verdict::Mismatch => "FAILURE",
        }
    }
}

/// Index of the reference ROI offered by default for `label`.
///
/// Exact label equality only, falling back to the first entry. There is no
/// geometric closest-match search.
pub fn default_pairing<S: AsRef<str>>(label: &str, references: &[S]) -> usize {
    references
        .iter()
        .position(|candidate| candidate.as_ref() == label)
        .unwrap_or(0)
}
