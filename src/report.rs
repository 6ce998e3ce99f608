//
// report.rs
// ROI-LockTime-rs
//
// Writes comparison results as a CSV table preceded by a line naming the two structure sets compared.
//

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::{FileFault, LockTimeError, Result};
use crate::models::ComparisonResult;

pub const HEADER: [&str; 12] = [
    "Reference ROI",
    "Reference Volume (cc)",
    "Reference Centroid (cm)",
    "Compare ROI",
    "Compare Volume (cc)",
    "Compare Centroid (cm)",
    "DICE",
    "Precision",
    "Sensitivity",
    "Specificity",
    "MeanDistanceToAgreement",
    "MaxDistanceToAgreement",
];

fn row(result: &ComparisonResult) -> Vec<String> {
    let mut cells = vec![
        result.reference_label.clone(),
        format!("{:.2}", result.reference_volume),
        result.reference_centroid.to_string(),
        result.compare_label.clone(),
        format!("{:.2}", result.compare_volume),
        result.compare_centroid.to_string(),
    ];
    match &result.similarity_metrics {
        Some(m) => cells.extend(
            [
                m.dice,
                m.precision,
                m.sensitivity,
                m.specificity,
                m.mean_distance_to_agreement,
                m.max_distance_to_agreement,
            ]
            .iter()
            .map(|v| format!("{v:.4}")),
        ),
        // Metrics unavailable: leave the cells blank rather than inventing values.
        None => cells.extend(std::iter::repeat(String::new()).take(6)),
    }
    cells
}

/// Write the provenance line, the header and one row per result.
pub fn write_report<W: Write>(
    mut writer: W,
    reference: &str,
    compare: &str,
    results: &[ComparisonResult],
) -> std::result::Result<(), FileFault> {
    writeln!(writer, "ROI LockTime comparison of {reference} (reference) against {compare}")?;

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HEADER)?;
    for result in results {
        csv.write_record(row(result))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_report_file(
    path: &Path,
    reference: &str,
    compare: &str,
    results: &[ComparisonResult],
) -> Result<()> {
    let fault = |source: FileFault| LockTimeError::Export {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| fault(e.into()))?;
    write_report(BufWriter::new(file), reference, compare, results).map_err(fault)?;
    info!(path = %path.display(), rows = results.len(), "comparison report written");
    Ok(())
}
