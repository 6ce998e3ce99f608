//
// error.rs
// ROI-LockTime-rs
//
// Typed failures raised by the snapshot, comparison and restoration layers, each keeping its underlying cause.
//

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::host::HostError;

/// Errors surfaced by the core. The presentation layer decides how to report them.
#[derive(Debug, Error)]
pub enum LockTimeError {
    /// Interchange file missing, unreadable or structurally invalid.
    #[error("Cannot load structure set from {}", path.display())]
    LoadFile {
        path: PathBuf,
        #[source]
        source: FileFault,
    },

    /// The host could not provide contour geometry for a ROI.
    #[error("Cannot load contours for ROI '{label}'")]
    LoadContours {
        label: String,
        #[source]
        source: HostError,
    },

    /// The live sub-structure-set could not be enumerated.
    #[error("Cannot read sub-structure-set {index} from the live source")]
    LiveSource {
        index: usize,
        #[source]
        source: HostError,
    },

    #[error("Cannot write structure set to {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: FileFault,
    },

    /// A referenced ROI label does not exist in the live system.
    #[error("ROI '{label}' cannot be resolved in the live structure set")]
    Resolution {
        label: String,
        #[source]
        source: HostError,
    },

    #[error("Similarity comparison of '{reference}' and '{compare}' failed")]
    Comparison {
        reference: String,
        compare: String,
        #[source]
        source: HostError,
    },

    #[error("Cannot restore ROI '{label}': {step} was rejected")]
    Restore {
        label: String,
        step: RestoreStep,
        #[source]
        source: HostError,
    },

    /// Neither a file path nor a live-source index was supplied.
    #[error("No structure set source: {0}")]
    Configuration(&'static str),
}

/// Underlying cause of a file-level load or export failure.
#[derive(Debug, Error)]
pub enum FileFault {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Invalid(String),
}

/// The individual host calls a single-ROI restoration is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStep {
    Naming,
    Creation,
    GeometrySeeding,
    RepresentationSwitch,
    ContourAssignment,
}

impl fmt::Display for RestoreStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RestoreStep::Naming => "unique naming",
            RestoreStep::Creation => "ROI creation",
            RestoreStep::GeometrySeeding => "placeholder geometry seeding",
            RestoreStep::RepresentationSwitch => "representation switch",
            RestoreStep::ContourAssignment => "contour assignment",
        };
        f.write_str(text)
    }
}

pub type Result<T> = std::result::Result<T, LockTimeError>;
