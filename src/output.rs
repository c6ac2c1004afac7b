//! Output gate.
//!
//! Decides per job, before any browser page is opened, whether prior output
//! means the job can be skipped, must be wiped first, or simply runs. The
//! decision is computed from the filesystem at admission time and never
//! persisted.

use std::fs;
use std::io;
use std::path::Path;

/// What to do with a job given its existing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputDecision {
    /// No prior output; run normally.
    Run,
    /// Completed output exists and overwriting was not requested; the job is
    /// not executed at all.
    SkipExisting,
    /// Prior output exists and overwriting was requested; it is deleted
    /// before the job runs so a failed re-run cannot leave old and new files
    /// mixed together.
    OverwriteExisting,
}

/// Compute the decision for a job. `set_dir` is the job's output directory,
/// `marker` the file whose presence means the job completed before.
pub fn decide(set_dir: &Path, marker: &Path, overwrite: bool) -> OutputDecision {
    if set_dir.exists() && overwrite {
        OutputDecision::OverwriteExisting
    } else if marker.exists() && !overwrite {
        OutputDecision::SkipExisting
    } else {
        OutputDecision::Run
    }
}

/// Apply the decision: wipe prior output for an overwrite, create the output
/// directory for anything that runs, touch nothing for a skip.
pub fn prepare(set_dir: &Path, marker: &Path, overwrite: bool) -> io::Result<OutputDecision> {
    let decision = decide(set_dir, marker, overwrite);
    match decision {
        OutputDecision::SkipExisting => return Ok(decision),
        OutputDecision::OverwriteExisting => fs::remove_dir_all(set_dir)?,
        OutputDecision::Run => {}
    }
    fs::create_dir_all(set_dir)?;
    Ok(decision)
}
