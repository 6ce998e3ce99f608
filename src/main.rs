//
// main.rs
// ROI-LockTime-rs
//
// Entry point that hands off execution to the CLI layer.
//

use roi_locktime::cli;

fn main() -> anyhow::Result<()> {
    // All argument parsing and dispatching lives in the CLI module.
    cli::run()
}
