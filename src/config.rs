//
// config.rs
// ROI-LockTime-rs
//
// Optional TOML settings: where snapshots live and the defaults for export and restore.
//

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::restore::RestorePolicy;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILENAME: &str = "roi-locktime.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Default export destination and browse root.
    pub snapshot_root: PathBuf,
    pub include_contours: bool,
    pub restore_policy: RestorePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            snapshot_root: PathBuf::from("."),
            include_contours: false,
            restore_policy: RestorePolicy::Continue,
        }
    }
}

impl Settings {
    /// Load an explicit file, or `roi-locktime.toml` if present, or defaults.
    ///
    /// An explicit path must exist. Any file that exists must parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = PathBuf::from(CONFIG_FILENAME);
                if !candidate.is_file() {
                    debug!("no settings file, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = Self::from_toml(&text)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        debug!(path = %path.display(), ?settings, "settings loaded");
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::from_toml("include_contours = true").expect("parse");
        assert!(settings.include_contours);
        assert_eq!(settings.snapshot_root, PathBuf::from("."));
        assert_eq!(settings.restore_policy, RestorePolicy::Continue);
    }

    #[test]
    fn full_file_and_unknown_keys() {
        let settings = Settings::from_toml(
            "snapshot_root = \"/planning/locktime\"\nrestore_policy = \"stop\"\n",
        )
        .expect("parse");
        assert_eq!(settings.snapshot_root, PathBuf::from("/planning/locktime"));
        assert_eq!(settings.restore_policy, RestorePolicy::Stop);

        assert!(Settings::from_toml("snapshot_rot = \"typo\"").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/no/such/settings.toml"))).is_err());
    }
}
