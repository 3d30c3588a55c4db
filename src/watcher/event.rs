use std::path::PathBuf;

/// Watch event after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The command file's content changed; run a dispatch cycle.
    Changed(PathBuf),
    /// The command file was removed or renamed away. Not dispatched.
    Gone(PathBuf),
}
