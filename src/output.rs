use tracing::{error, info, warn};

use crate::dispatcher::Outcome;

/// Log one line for a dispatch outcome.
///
/// - successes and expected-absence cases go to `info`
/// - unrecognized command text goes to `warn`
/// - I/O failures go to `error` with the path and cause
///
/// A skipped duplicate append is intentionally silent.
pub fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Created(path) => info!("✔ file created: {}", path.display()),
        Outcome::AlreadyExists(path) => info!("ℹ file already exists: {}", path.display()),
        Outcome::Deleted(path) => info!("✔ file deleted: {}", path.display()),
        Outcome::NothingToDelete(path) => info!("ℹ no file to delete at: {}", path.display()),
        Outcome::Renamed { from, to } => {
            info!("✔ file renamed: {} → {}", from.display(), to.display())
        }
        Outcome::RenameSourceMissing(path) => {
            info!("ℹ cannot rename, path not found: {}", path.display())
        }
        Outcome::Appended(path) => info!("✔ appended to file: {}", path.display()),
        Outcome::AppendSkipped => {}
        Outcome::Failed { op, path, source } => {
            error!("✖ error {op} \"{}\": {source}", path.display())
        }
        Outcome::RenameFailed { from, to, source } => error!(
            "✖ error renaming \"{}\" → \"{}\": {source}",
            from.display(),
            to.display()
        ),
        Outcome::Unrecognized(text) => warn!("⚠ unrecognized command: \"{text}\""),
    }
}
