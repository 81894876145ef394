// src/watch/watcher.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::LoopEvent;
use crate::watch::{ChangeEvent, ChangeKind};

/// Handle for the filesystem watcher.
///
/// Dropping this handle stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// A path to watch, relative to the project root.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub recursive: bool,
}

impl WatchTarget {
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: true,
        }
    }

    /// Watch a single file. Its parent directory is watched non-recursively,
    /// which survives editors that replace the file on save.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: false,
        }
    }
}

/// Spawn a watcher over `targets` (relative to `root`) that sends
/// [`LoopEvent::Change`] with root-relative paths into `loop_tx`.
///
/// Bursts of notify events are merged: after the first event the bridge
/// waits `debounce`, drains everything that arrived meanwhile and forwards
/// each changed path once.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    targets: &[WatchTarget],
    debounce: Duration,
    loop_tx: mpsc::Sender<LoopEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("assetpipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("assetpipe: file watch error: {err}"),
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    let dirs: Vec<(PathBuf, RecursiveMode)> = targets
        .iter()
        .map(|target| {
            let abs = root.join(&target.path);
            if target.recursive {
                (abs, RecursiveMode::Recursive)
            } else {
                let parent = abs.parent().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                (parent, RecursiveMode::NonRecursive)
            }
        })
        .collect();

    let mut watched = HashSet::new();
    for (idx, (dir, mode)) in dirs.iter().enumerate() {
        // Already covered by another recursive watch (e.g. src/css under src).
        let covered = dirs.iter().enumerate().any(|(other, (d, m))| {
            other != idx
                && *m == RecursiveMode::Recursive
                && dir.starts_with(d)
                && (dir != d || other < idx)
        });
        if covered || !watched.insert(dir.clone()) {
            continue;
        }
        if !dir.is_dir() {
            warn!(path = %dir.display(), "watch target does not exist; skipping");
            continue;
        }
        watcher
            .watch(dir, *mode)
            .with_context(|| format!("watching {}", dir.display()))?;
        info!(path = %dir.display(), recursive = *mode == RecursiveMode::Recursive, "watching");
    }

    tokio::spawn(async move {
        while let Some(first) = event_rx.recv().await {
            let mut batch = vec![first];
            tokio::time::sleep(debounce).await;
            while let Ok(event) = event_rx.try_recv() {
                batch.push(event);
            }

            let mut seen = HashSet::new();
            for event in batch {
                debug!(?event, "received notify event");
                let Some(kind) = change_kind(&event.kind) else {
                    continue;
                };
                for path in event.paths {
                    let Some(rel) = relative_to(&root, &path) else {
                        continue;
                    };
                    if !seen.insert(rel.clone()) {
                        continue;
                    }
                    let change = ChangeEvent {
                        path: rel,
                        kind,
                        timestamp: SystemTime::now(),
                    };
                    if loop_tx.send(LoopEvent::Change(change)).await.is_err() {
                        debug!("watch loop closed; stopping watcher bridge");
                        return;
                    }
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    path.strip_prefix(root).ok().map(Path::to_path_buf)
}
