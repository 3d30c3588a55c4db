use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tokio::io::AsyncWriteExt;

use crate::command::{self, Command};

/// Which file operation an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Delete,
    Append,
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Op::Create => "creating",
            Op::Delete => "deleting",
            Op::Append => "appending to",
        };
        f.write_str(name)
    }
}

/// Result of one dispatch cycle. Every variant except `AppendSkipped` is
/// reported exactly once by `output::report`.
#[derive(Debug)]
pub enum Outcome {
    Created(PathBuf),
    AlreadyExists(PathBuf),
    Deleted(PathBuf),
    NothingToDelete(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
    RenameSourceMissing(PathBuf),
    Appended(PathBuf),
    /// Content matched the last successful append; nothing was done.
    AppendSkipped,
    Failed {
        op: Op,
        path: PathBuf,
        source: std::io::Error,
    },
    /// Rename failed for a reason other than a missing source. Both paths are
    /// kept since the destination is often the side at fault.
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
    Unrecognized(String),
}

impl Outcome {
    /// True for outcomes that indicate something went wrong (I/O error or
    /// unparseable command).
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::Failed { .. } | Outcome::RenameFailed { .. } | Outcome::Unrecognized(_)
        )
    }
}

/// Turns command text into file operations.
///
/// The only state is the last successfully appended content. It lives behind
/// a `Mutex` so spawned cycles can share the dispatcher, but the lock is
/// never held across I/O: two overlapping appends of the same content can
/// both pass the duplicate check.
#[derive(Debug, Default)]
pub struct Dispatcher {
    last_appended: Mutex<Option<String>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the command file, parse it, and run the matching operation.
    pub async fn handle_change(&self, command_file: &Path) -> std::io::Result<Outcome> {
        let raw = tokio::fs::read_to_string(command_file).await?;
        Ok(self.dispatch(&raw).await)
    }

    /// Parse `text` and run at most one operation.
    pub async fn dispatch(&self, text: &str) -> Outcome {
        match command::parse(text) {
            Some(Command::Create(path)) => create(path).await,
            Some(Command::Delete(path)) => delete(path).await,
            Some(Command::Rename { from, to }) => rename(from, to).await,
            Some(Command::Append { path, content }) => self.append(path, content).await,
            None => Outcome::Unrecognized(text.trim().to_string()),
        }
    }

    /// Append `content` to `path` unless it equals the previous successful
    /// append. The cache is updated only after the write succeeds.
    pub async fn append(&self, path: PathBuf, content: String) -> Outcome {
        if self.last_appended().as_deref() == Some(content.as_str()) {
            return Outcome::AppendSkipped;
        }

        match append_bytes(&path, content.as_bytes()).await {
            Ok(()) => {
                self.set_last_appended(content);
                Outcome::Appended(path)
            }
            Err(source) => Outcome::Failed {
                op: Op::Append,
                path,
                source,
            },
        }
    }

    fn last_appended(&self) -> Option<String> {
        match self.last_appended.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_last_appended(&self, content: String) {
        let mut guard = match self.last_appended.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(content);
    }
}

/// Create an empty file, failing rather than truncating if it exists.
pub async fn create(path: PathBuf) -> Outcome {
    let result = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await;

    match result {
        Ok(_) => Outcome::Created(path),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Outcome::AlreadyExists(path),
        Err(source) => Outcome::Failed {
            op: Op::Create,
            path,
            source,
        },
    }
}

pub async fn delete(path: PathBuf) -> Outcome {
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Outcome::Deleted(path),
        Err(e) if e.kind() == ErrorKind::NotFound => Outcome::NothingToDelete(path),
        Err(source) => Outcome::Failed {
            op: Op::Delete,
            path,
            source,
        },
    }
}

/// Rename `from` to `to`. A not-found error only counts as "source missing"
/// when the source really is gone; a missing destination directory is an
/// error.
pub async fn rename(from: PathBuf, to: PathBuf) -> Outcome {
    match tokio::fs::rename(&from, &to).await {
        Ok(()) => Outcome::Renamed { from, to },
        Err(source) if source.kind() == ErrorKind::NotFound => {
            if source_exists(&from).await {
                Outcome::RenameFailed { from, to, source }
            } else {
                Outcome::RenameSourceMissing(from)
            }
        }
        Err(source) => Outcome::RenameFailed { from, to, source },
    }
}

async fn source_exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}

async fn append_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}
