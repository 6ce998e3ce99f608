//
// cli.rs
// ROI-LockTime-rs
//
// Defines the CLI surface with Clap and dispatches user actions to the snapshot, compare and restore layers.
//

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};

use crate::compare::{compare_summaries, default_pairing, Tolerance, Verdict};
use crate::config::Settings;
use crate::models::ComparisonResult;
use crate::restore::RestorePolicy;
use crate::snapshot::{Snapshot, SnapshotSource};
use crate::workspace::Workspace;
use crate::{browse, logging, report};

/// Command-line shell: each verb is one user action, run to completion.
#[derive(Parser)]
#[command(name = "roi-locktime")]
#[command(about = "Snapshot, check and restore locked structure sets", long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Settings file (defaults to ./roi-locktime.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the locked sub-structure-sets of a workspace
    Sets {
        #[arg(long)]
        host: PathBuf,
    },
    /// Export a locked sub-structure-set to a snapshot file
    Export {
        #[arg(long)]
        host: PathBuf,
        #[arg(short, long)]
        index: usize,
        /// Destination directory (defaults to the snapshot root)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Write contour geometry (overrides the settings default)
        #[arg(long, overrides_with = "no_include_contours")]
        include_contours: bool,
        /// Write summaries only (overrides the settings default)
        #[arg(long, overrides_with = "include_contours")]
        no_include_contours: bool,
    },
    /// Print the provenance and ROIs of a snapshot file
    Show { file: PathBuf },
    /// Check a structure set row by row against a reference snapshot
    Check {
        /// Snapshot file to check
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Workspace holding the sub-structure-set selected by --index
        #[arg(long)]
        host: Option<PathBuf>,
        #[arg(short, long)]
        index: Option<usize>,
        #[arg(long)]
        reference: PathBuf,
        /// Override the default pairing, CURRENT=REFERENCE
        #[arg(long = "pair", value_parser = parse_pair)]
        pairs: Vec<(String, String)>,
    },
    /// Compare snapshot ROIs with live ROIs, including similarity metrics
    Compare {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        host: PathBuf,
        /// Write the results as CSV
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Recreate saved contours in the workspace's current structure set
    Restore {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        host: PathBuf,
        #[arg(long)]
        stop_on_error: bool,
        /// Write the updated workspace back to --host
        #[arg(long)]
        save: bool,
    },
    /// List snapshot files under the snapshot root
    Browse {
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

/// The explicit export flag, if any; the last one given wins.
fn contour_choice(include: bool, exclude: bool) -> Option<bool> {
    match (include, exclude) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((current, reference)) if !current.is_empty() && !reference.is_empty() => {
            Ok((current.to_string(), reference.to_string()))
        }
        _ => Err(format!("expected CURRENT=REFERENCE, got '{raw}'")),
    }
}

pub fn run() -> anyhow::Result<()> {
    // Parse once, set up logging and settings, then dispatch.
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sets { host } => list_sets(&host)?,
        Commands::Export {
            host,
            index,
            out,
            include_contours,
            no_include_contours,
        } => {
            let workspace = Workspace::load(&host)?;
            let mut snapshot = Snapshot::from_live(&workspace, index)?;
            let dir = out.unwrap_or_else(|| settings.snapshot_root.clone());
            let include = contour_choice(include_contours, no_include_contours)
                .unwrap_or(settings.include_contours);
            let path = snapshot.export_locked(&dir, include, &workspace, index)?;
            println!("Structure set exported to: {}", path.display());
        }
        Commands::Show { file } => show(&Snapshot::from_file(&file)?),
        Commands::Check {
            snapshot,
            host,
            index,
            reference,
            pairs,
        } => {
            let source = SnapshotSource::from_options(snapshot, index)?;
            let current = match &source {
                SnapshotSource::File(path) => Snapshot::from_file(path)?,
                SnapshotSource::Live(_) => {
                    let host = host.context("--index needs --host")?;
                    Snapshot::open(&source, &Workspace::load(&host)?)?
                }
            };
            let reference = Snapshot::from_file(&reference)?;
            check(&current, &reference, &pairs)?;
        }
        Commands::Compare {
            snapshot,
            host,
            report: report_path,
        } => {
            let workspace = Workspace::load(&host)?;
            let mut snapshot = Snapshot::from_file(&snapshot)?;
            let results = compare_live(&mut snapshot, &workspace)?;
            if let Some(path) = report_path {
                report::write_report_file(
                    &path,
                    &snapshot.f_name,
                    &host.display().to_string(),
                    &results,
                )?;
                println!("Report written to: {}", path.display());
            }
        }
        Commands::Restore {
            snapshot,
            host,
            stop_on_error,
            save,
        } => {
            let mut workspace = Workspace::load(&host)?;
            let snapshot = Snapshot::from_file(&snapshot)?;
            let policy = if stop_on_error {
                RestorePolicy::Stop
            } else {
                settings.restore_policy
            };
            restore(&snapshot, &mut workspace, policy, save.then_some(host.as_path()))?;
        }
        Commands::Browse { root } => {
            let root = root.unwrap_or(settings.snapshot_root);
            let entries = browse::find_snapshots(&root);
            println!("Found {} snapshot(s) under {}", entries.len(), root.display());
            for entry in entries {
                let locked = entry
                    .locked_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "UNAPPROVED".to_string());
                println!(
                    "  {:<20} {:<24} {:>3} ROI(s), {:>3} with contours  {}",
                    locked,
                    entry.reviewer.as_deref().unwrap_or("-"),
                    entry.rois,
                    entry.with_contours,
                    entry.path.display()
                );
            }
        }
    }

    Ok(())
}

fn list_sets(host: &Path) -> anyhow::Result<()> {
    use crate::host::LiveSource;

    let workspace = Workspace::load(host)?;
    let count = workspace.sub_structure_set_count();
    if count == 0 {
        println!("No locked sub-structure-sets.");
    }
    for index in 0..count {
        let snapshot = Snapshot::from_live(&workspace, index)?;
        println!("  [{index}] {} ({} ROI(s))", snapshot.f_name, snapshot.rois.len());
    }
    Ok(())
}

fn show(snapshot: &Snapshot) {
    println!("{}", "=".repeat(80));
    println!("Structure set: {}", snapshot.f_name);
    println!("{}", "=".repeat(80));
    println!("  Reviewer: {}", snapshot.reviewer.as_deref().unwrap_or("N/A"));
    println!("  Locked:   {}", snapshot.locktime.as_deref().unwrap_or("N/A"));
    println!("\nROIS");
    for roi in &snapshot.rois {
        println!(
            "  {:<24} {:>10.2} cc  {}  {}",
            roi.label,
            roi.volume,
            roi.centroid,
            if roi.has_contours() {
                "contours"
            } else {
                "summary only"
            }
        );
    }
}

/// Interactive check: each current ROI against its paired reference ROI.
fn check(current: &Snapshot, reference: &Snapshot, pairs: &[(String, String)]) -> anyhow::Result<()> {
    let references = reference.labels();
    println!("{} CF. {}", current.f_name, reference.f_name);

    for roi in &current.rois {
        let index = match pairs.iter().find(|(c, _)| *c == roi.label) {
            Some((_, chosen)) => match references.iter().position(|r| r == chosen) {
                Some(index) => index,
                None => bail!("Reference ROI '{chosen}' is not in {}", reference.f_name),
            },
            None => default_pairing(&roi.label, &references),
        };

        match reference.rois.get(index) {
            Some(paired) => {
                let result = compare_summaries(&paired.summary(), &roi.summary(), Tolerance::INTERACTIVE);
                println!(
                    "  {:<24} CF. {:<24} {}",
                    roi.label,
                    paired.label,
                    Verdict::of(&result).text()
                );
            }
            None => println!("  {:<24} CF. {:<24} -", roi.label, ""),
        }
    }
    Ok(())
}

/// Strict comparison with host metrics; per-ROI failures are reported and skipped.
fn compare_live(snapshot: &mut Snapshot, workspace: &Workspace) -> anyhow::Result<Vec<ComparisonResult>> {
    let live: Vec<String> = workspace.current.rois.iter().map(|r| r.name.clone()).collect();
    if live.is_empty() {
        bail!("The current structure set has no ROIs to compare against");
    }

    let mut results = Vec::new();
    for record in &mut snapshot.rois {
        let other = live[default_pairing(&record.label, &live)].clone();
        match record.compare_with(&other, workspace) {
            Ok(result) => {
                let dice = result
                    .similarity_metrics
                    .map(|m| format!("{:.3}", m.dice))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "  {:<24} CF. {:<24} {}  DICE {}",
                    result.reference_label,
                    result.compare_label,
                    Verdict::of(&result).text(),
                    dice
                );
                results.push(result);
            }
            Err(err) => eprintln!("  {:<24} ERROR {:#}", record.label, anyhow::Error::from(err)),
        }
    }
    Ok(results)
}

fn restore(
    snapshot: &Snapshot,
    workspace: &mut Workspace,
    policy: RestorePolicy,
    save_to: Option<&Path>,
) -> anyhow::Result<()> {
    let report = snapshot.restore_all(workspace, policy);

    for restored in &report.restored {
        if restored.is_empty() {
            println!("  {} -> {} (created without contours)", restored.label, restored.name);
        } else {
            println!(
                "  {} -> {} ({} contour plane(s))",
                restored.label, restored.name, restored.contour_count
            );
        }
    }
    for label in &report.skipped {
        println!("  {label}: no contours saved, skipped");
    }
    for failure in &report.failures {
        eprintln!("  {}: {}", failure.label, error_chain(&failure.error));
    }
    for label in &report.not_attempted {
        println!("  {label}: not attempted");
    }

    if let Some(path) = save_to {
        workspace.save(path)?;
    }
    if !report.is_success() {
        bail!("{} ROI(s) failed to restore", report.failures.len());
    }
    println!("Restored {} ROI(s).", report.restored.len());
    Ok(())
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_arguments_split_on_equals() {
        assert_eq!(
            parse_pair("PTV_60=PTV_6000").expect("pair"),
            ("PTV_60".to_string(), "PTV_6000".to_string())
        );
        assert!(parse_pair("PTV_60").is_err());
        assert!(parse_pair("=GTV").is_err());
    }

    fn export_choice(args: &[&str]) -> Option<bool> {
        let mut argv = vec!["roi-locktime", "export", "--host", "ws.json", "-i", "0"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).expect("parse").command {
            Commands::Export {
                include_contours,
                no_include_contours,
                ..
            } => contour_choice(include_contours, no_include_contours),
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn export_flags_can_override_settings_either_way() {
        assert_eq!(export_choice(&[]), None);
        assert_eq!(export_choice(&["--include-contours"]), Some(true));
        assert_eq!(export_choice(&["--no-include-contours"]), Some(false));
        assert_eq!(
            export_choice(&["--include-contours", "--no-include-contours"]),
            Some(false)
        );
        assert_eq!(
            export_choice(&["--no-include-contours", "--include-contours"]),
            Some(true)
        );
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
