//! Local file backend
//!
//! Content is the file's bytes; the version is the SHA-256 checksum of those
//! bytes, so rewriting a file with identical content is not a change.
//! Changes are detected through filesystem notifications on the parent
//! directory, with a periodic re-read as a fallback when notifications are
//! unavailable or missed.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    Backend, BackendFactory, ChangeStream, Error, Params, Result, Revision, Version,
};

const KIND: &str = "local";

/// Quiet period after a notification before re-reading the file.
///
/// Editors often write a file in several steps.
const SETTLE: Duration = Duration::from_millis(50);

/// Reads configuration from a file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    path: PathBuf,
    fallback: Duration,
}

impl LocalBackend {
    pub fn new(path: impl Into<PathBuf>, fallback: Duration) -> Self {
        let path = path.into();
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "Source file does not exist yet");
        }
        Self { path, fallback }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for LocalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local({})", self.path.display())
    }
}

async fn read_revision(path: &Path) -> Result<Revision> {
    let backend = format!("local({})", path.display());
    match tokio::fs::read(path).await {
        Ok(content) => {
            let version = Version::new(ninja_fs::compute_checksum(&content));
            Ok(Revision::new(content, version))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::not_found(backend, "file does not exist"))
        }
        Err(e) => Err(Error::unavailable(backend, e.to_string())),
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn fetch(&self) -> Result<Revision> {
        read_revision(&self.path).await
    }

    fn poll(&self, from: Option<Version>) -> Box<dyn ChangeStream> {
        Box::new(LocalChangeStream {
            path: self.path.clone(),
            fallback: self.fallback,
            last: from,
            watch: None,
            started: false,
        })
    }
}

struct WatchState {
    // Dropping the watcher stops notifications.
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<()>,
}

/// Change stream over one local file.
pub struct LocalChangeStream {
    path: PathBuf,
    fallback: Duration,
    last: Option<Version>,
    watch: Option<WatchState>,
    started: bool,
}

impl LocalChangeStream {
    fn start_watching(&mut self) {
        match watch_file(&self.path) {
            Ok(state) => {
                tracing::debug!(path = %self.path.display(), "Watching for changes");
                self.watch = Some(state);
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    interval_ms = self.fallback.as_millis() as u64,
                    "Filesystem notifications unavailable, falling back to polling"
                );
            }
        }
    }

    /// Re-read the file and report it if its version moved.
    async fn check(&mut self) -> Option<Revision> {
        match read_revision(&self.path).await {
            Ok(revision) if self.last.as_ref() != Some(&revision.version) => {
                self.last = Some(revision.version.clone());
                Some(revision)
            }
            Ok(_) => None,
            // Missing or unreadable mid-edit; wait for the next event.
            Err(e) => {
                tracing::debug!(error = %e, "Source not readable");
                None
            }
        }
    }
}

fn watch_file(path: &Path) -> Result<WatchState> {
    let watch_error = |e: notify::Error| Error::Watch {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let target: Option<OsString> = path.file_name().map(|name| name.to_os_string());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            let relevant = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == target);
            if relevant {
                let _ = tx.send(());
            }
        }
        Err(e) => tracing::warn!(error = %e, "Watch error"),
    })
    .map_err(watch_error)?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(watch_error)?;

    Ok(WatchState {
        _watcher: watcher,
        events: rx,
    })
}

/// Resolve once a notification arrives and the file has settled.
async fn notified(watch: &mut Option<WatchState>) {
    match watch {
        Some(state) => {
            if state.events.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(SETTLE).await;
            while state.events.try_recv().is_ok() {}
        }
        None => std::future::pending().await,
    }
}

#[async_trait]
impl ChangeStream for LocalChangeStream {
    async fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Revision>> {
        if !self.started {
            self.started = true;
            self.start_watching();
        }

        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            if let Some(revision) = self.check().await {
                tracing::debug!(version = %revision.version, "Detected change");
                return Ok(Some(revision));
            }

            let fallback = self.fallback;
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = notified(&mut self.watch) => {}
                _ = tokio::time::sleep(fallback) => {}
            }
        }
    }
}

/// Factory for [`LocalBackend`].
///
/// Takes a single `path` parameter.
#[derive(Debug, Clone)]
pub struct LocalFactory {
    fallback: Duration,
}

impl LocalFactory {
    pub fn new(fallback: Duration) -> Self {
        Self { fallback }
    }
}

#[async_trait]
impl BackendFactory for LocalFactory {
    fn kind(&self) -> &'static str {
        KIND
    }

    async fn from_identifiers(&self, params: &Params) -> Result<Box<dyn Backend>> {
        let path = params.require(KIND, &["path"])?;
        Ok(Box::new(LocalBackend::new(path, self.fallback)))
    }
}
