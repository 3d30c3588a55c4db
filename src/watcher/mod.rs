pub mod event;

use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use event::WatchEvent;

/// Handle to a running watcher. Dropping it stops watching.
pub struct WatcherHandle {
    /// Keep alive: dropping the watcher stops the OS watch.
    _watcher: RecommendedWatcher,
    /// Forwards events from the notify thread into the tokio channel.
    _bridge_task: JoinHandle<()>,
}

/// Check that `command_file` exists and is a regular file.
///
/// Run before the watcher starts so a missing command file stops the process
/// at startup instead of failing on the first event.
pub fn ensure_watchable(command_file: &Path) -> anyhow::Result<()> {
    let meta = std::fs::metadata(command_file)
        .with_context(|| format!("cannot watch command file {}", command_file.display()))?;
    if !meta.is_file() {
        bail!("command file {} is not a regular file", command_file.display());
    }
    Ok(())
}

/// Start watching a single command file.
///
/// Raw notify events are classified by kind before anything else, so opening
/// or reading the file (including the dispatcher's own reads) never counts as
/// a change. With `debounce` unset every content change is forwarded. With a
/// window set, all changes arriving within one window of the first are merged
/// into a single `Changed`.
///
/// Returns a `WatcherHandle` (must be kept alive) and a tokio mpsc receiver
/// of classified `WatchEvent`s.
pub fn start_watcher(
    command_file: &Path,
    debounce: Option<Duration>,
) -> anyhow::Result<(WatcherHandle, tokio_mpsc::Receiver<WatchEvent>)> {
    ensure_watchable(command_file)?;

    let (std_tx, std_rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = std_tx.send(res);
    })?;
    watcher.watch(command_file, RecursiveMode::NonRecursive)?;

    let (tokio_tx, tokio_rx) = tokio_mpsc::channel::<WatchEvent>(256);

    let target = command_file.to_path_buf();
    let bridge_task = tokio::task::spawn_blocking(move || {
        forward_events(&std_rx, &target, debounce, |event| {
            tokio_tx.blocking_send(event).is_ok()
        });
    });

    Ok((
        WatcherHandle {
            _watcher: watcher,
            _bridge_task: bridge_task,
        },
        tokio_rx,
    ))
}

/// Drain raw events from `rx`, classify them, and hand them to `emit`.
///
/// Returns when the notify side hangs up or `emit` reports the receiver is
/// gone. A pending debounced change is flushed before `Gone` so ordering is
/// kept, and before returning on hang-up.
fn forward_events(
    rx: &Receiver<notify::Result<notify::Event>>,
    target: &Path,
    debounce: Option<Duration>,
    mut emit: impl FnMut(WatchEvent) -> bool,
) {
    let mut due: Option<Instant> = None;

    loop {
        let received = match due {
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(res) => Some(res),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => {
                        emit(WatchEvent::Changed(target.to_path_buf()));
                        return;
                    }
                }
            }
            None => match rx.recv() {
                Ok(res) => Some(res),
                Err(_) => return,
            },
        };

        let Some(res) = received else {
            // Window elapsed.
            due = None;
            if !emit(WatchEvent::Changed(target.to_path_buf())) {
                return;
            }
            continue;
        };

        let event = match res {
            Ok(event) => event,
            Err(err) => {
                warn!(target: "watcher", "error: {err:?}");
                continue;
            }
        };

        let delivered = match classify_kind(&event.kind, target) {
            None => true,
            Some(WatchEvent::Changed(_)) if debounce.is_some() => {
                if due.is_none() {
                    due = debounce.map(|window| Instant::now() + window);
                }
                true
            }
            Some(gone @ WatchEvent::Gone(_)) if due.is_some() => {
                due = None;
                emit(WatchEvent::Changed(target.to_path_buf())) && emit(gone)
            }
            Some(watch_event) => emit(watch_event),
        };
        if !delivered {
            return; // receiver dropped, shutdown
        }
    }
}

/// Classify a raw notify event kind for the watched file.
///
/// Only data modifications count as a change. Access and metadata events are
/// ignored; renames and removals of the watched file itself become `Gone`.
fn classify_kind(kind: &EventKind, target: &Path) -> Option<WatchEvent> {
    match kind {
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            Some(WatchEvent::Changed(target.to_path_buf()))
        }
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Remove(_) => {
            Some(WatchEvent::Gone(target.to_path_buf()))
        }
        other => {
            debug!(target: "watcher", "ignoring {other:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, AccessMode, DataChange, MetadataKind, RemoveKind, RenameMode};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::mpsc::channel;

    fn raw(kind: EventKind) -> notify::Result<notify::Event> {
        Ok(notify::Event::new(kind))
    }

    fn data_change() -> EventKind {
        EventKind::Modify(ModifyKind::Data(DataChange::Content))
    }

    /// Feed `events` through the bridge and collect what it emits.
    fn forwarded(
        events: Vec<notify::Result<notify::Event>>,
        debounce: Option<Duration>,
    ) -> Vec<WatchEvent> {
        let (tx, rx) = channel();
        for event in events {
            tx.send(event).unwrap();
        }
        drop(tx);

        let mut out = Vec::new();
        forward_events(&rx, Path::new("/tmp/command.txt"), debounce, |event| {
            out.push(event);
            true
        });
        out
    }

    #[test]
    fn test_classify_data_change_is_changed() {
        let target = Path::new("/tmp/command.txt");
        assert_eq!(
            classify_kind(&data_change(), target),
            Some(WatchEvent::Changed(target.to_path_buf()))
        );
        assert_eq!(
            classify_kind(&EventKind::Modify(ModifyKind::Any), target),
            Some(WatchEvent::Changed(target.to_path_buf()))
        );
    }

    #[test]
    fn test_classify_rename_and_remove_are_gone() {
        let target = Path::new("/tmp/command.txt");
        assert_eq!(
            classify_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::From)), target),
            Some(WatchEvent::Gone(target.to_path_buf()))
        );
        assert_eq!(
            classify_kind(&EventKind::Remove(RemoveKind::File), target),
            Some(WatchEvent::Gone(target.to_path_buf()))
        );
    }

    #[test]
    fn test_classify_ignores_access_and_metadata() {
        let target = Path::new("/tmp/command.txt");
        assert_eq!(
            classify_kind(&EventKind::Access(AccessKind::Read), target),
            None
        );
        assert_eq!(
            classify_kind(&EventKind::Access(AccessKind::Open(AccessMode::Any)), target),
            None
        );
        assert_eq!(
            classify_kind(
                &EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
                target
            ),
            None
        );
    }

    #[test]
    fn test_forward_without_debounce_passes_every_change() {
        let out = forwarded(
            vec![
                raw(data_change()),
                raw(EventKind::Access(AccessKind::Open(AccessMode::Any))),
                raw(data_change()),
            ],
            None,
        );
        assert_eq!(out.len(), 2, "got {out:?}");
        assert!(out.iter().all(|e| matches!(e, WatchEvent::Changed(_))));
    }

    #[test]
    fn test_forward_debounced_merges_burst_into_one_change() {
        let out = forwarded(
            vec![
                raw(data_change()),
                raw(data_change()),
                raw(EventKind::Modify(ModifyKind::Any)),
            ],
            Some(Duration::from_millis(50)),
        );
        assert_eq!(out, vec![WatchEvent::Changed(PathBuf::from("/tmp/command.txt"))]);
    }

    #[test]
    fn test_forward_debounced_ignores_reads_of_the_command_file() {
        // Reading the file (open, read, close) must not schedule a dispatch.
        let out = forwarded(
            vec![
                raw(EventKind::Access(AccessKind::Open(AccessMode::Any))),
                raw(EventKind::Access(AccessKind::Read)),
                raw(EventKind::Access(AccessKind::Close(AccessMode::Read))),
                raw(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
            ],
            Some(Duration::from_millis(50)),
        );
        assert!(out.is_empty(), "got {out:?}");
    }

    #[test]
    fn test_forward_debounced_flushes_change_before_gone() {
        let out = forwarded(
            vec![raw(data_change()), raw(EventKind::Remove(RemoveKind::File))],
            Some(Duration::from_millis(50)),
        );
        let target = PathBuf::from("/tmp/command.txt");
        assert_eq!(
            out,
            vec![WatchEvent::Changed(target.clone()), WatchEvent::Gone(target)]
        );
    }

    #[test]
    fn test_forward_debounced_emits_after_window_elapses() {
        let (tx, rx) = channel();
        tx.send(raw(data_change())).unwrap();

        let mut out = Vec::new();
        let handle = std::thread::spawn(move || {
            // Stays connected past the window, then hangs up.
            std::thread::sleep(Duration::from_millis(200));
            drop(tx);
        });
        forward_events(
            &rx,
            Path::new("/tmp/command.txt"),
            Some(Duration::from_millis(20)),
            |event| {
                out.push(event);
                true
            },
        );
        handle.join().unwrap();

        assert_eq!(out.len(), 1, "got {out:?}");
    }

    #[test]
    fn test_ensure_watchable_rejects_missing_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_watchable(&dir.path().join("command.txt")).is_err());
        assert!(ensure_watchable(dir.path()).is_err());

        let file = dir.path().join("command.txt");
        fs::write(&file, "").unwrap();
        assert!(ensure_watchable(&file).is_ok());
    }

    #[tokio::test]
    async fn test_start_watcher_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(start_watcher(&dir.path().join("command.txt"), None).is_err());
    }
}
