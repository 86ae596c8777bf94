use crate::schema::DashboardConfig;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watches the config file and delivers a freshly parsed [`DashboardConfig`]
/// after every write.
///
/// The parent directory is watched rather than the file itself, so editors
/// that save by renaming a temp file over the original keep working.
/// Documents that fail to parse are logged and skipped; the previous config
/// stays in effect.
///
/// # Example
/// ```no_run
/// # async fn demo() {
/// use holdwatch_config::ConfigWatcher;
/// let (_watcher, mut rx) = ConfigWatcher::spawn("/home/user/.config/holdwatch/holdwatch.toml");
/// while let Some(cfg) = rx.recv().await {
///     println!("poll interval is now {}s", cfg.poll.interval.secs());
/// }
/// # }
/// ```
pub struct ConfigWatcher {
    path: PathBuf,
}

impl ConfigWatcher {
    /// Spawn a filesystem watcher for `path`.
    /// Returns the watcher handle and a receiver of reloaded configs.
    pub fn spawn(path: impl AsRef<Path>) -> (Self, mpsc::Receiver<DashboardConfig>) {
        let (tx, rx) = mpsc::channel(1);
        let path = path.as_ref().to_path_buf();
        let watcher = Self { path: path.clone() };

        tokio::spawn(watch_loop(path, tx));

        (watcher, rx)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn watch_loop(path: PathBuf, tx: mpsc::Sender<DashboardConfig>) {
    use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
    use std::time::Duration;

    let (sync_tx, mut sync_rx) = mpsc::channel::<notify::Result<Event>>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = sync_tx.blocking_send(res);
        },
        Config::default().with_poll_interval(Duration::from_secs(2)),
    ) {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to create filesystem watcher: {e}");
            return;
        }
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
        error!("Failed to watch '{}': {e}", dir.display());
        return;
    }

    info!("Watching config file: {}", path.display());

    while let Some(event) = sync_rx.recv().await {
        let event = match event {
            Ok(e) => e,
            Err(e) => {
                warn!("Watcher error: {e}");
                continue;
            }
        };

        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            continue;
        }
        if !touches(&event.paths, &path) {
            continue;
        }

        match crate::load(&path) {
            Ok(cfg) => {
                debug!("Config reloaded from {}", path.display());
                if tx.send(cfg).await.is_err() {
                    break; // receiver dropped
                }
            }
            Err(e) => warn!("Ignoring config change: {e}"),
        }
    }
}

/// Whether any of the event paths refers to the watched file.
fn touches(paths: &[PathBuf], target: &Path) -> bool {
    paths
        .iter()
        .any(|p| p == target || (p.file_name().is_some() && p.file_name() == target.file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touches_matches_by_file_name() {
        let target = Path::new("/etc/holdwatch/holdwatch.toml");
        assert!(touches(&[PathBuf::from("/etc/holdwatch/holdwatch.toml")], target));
        assert!(touches(&[PathBuf::from("/private/etc/holdwatch/holdwatch.toml")], target));
        assert!(!touches(&[PathBuf::from("/etc/holdwatch/.holdwatch.toml.swp")], target));
        assert!(!touches(&[], target));
    }
}
