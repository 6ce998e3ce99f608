//
// lib.rs
// ROI-LockTime-rs
//
// Exposes the snapshot, comparison and restoration core plus the CLI entry point for the binary.
//

// Core: records, snapshots and the operations on them.
pub mod compare;
pub mod error;
pub mod host;
pub mod json;
pub mod models;
pub mod restore;
pub mod roi;
pub mod snapshot;

// Shell: file-backed host, reporting and the command line.
pub mod browse;
pub mod cli;
pub mod config;
pub mod logging;
pub mod report;
pub mod workspace;

pub use cli::{run as run_cli, Cli, Commands};
pub use error::{LockTimeError, Result};
pub use roi::RoiRecord;
pub use snapshot::{Snapshot, SnapshotSource};
