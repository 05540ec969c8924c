//! Kubeconfig change watcher.
//!
//! Watches the file(s) backing the resolved kubeconfig and invokes a reload
//! callback on any change, so rotated credentials are picked up without a
//! restart. Failure to establish the watch is not fatal: the server keeps
//! serving with its current backend and simply loses automatic reload.

use std::future::Future;
use std::path::PathBuf;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Live filesystem watch. Dropping the guard stops the OS watcher, which
/// closes the event channel and lets the forwarding task drain and exit on
/// its own; cleanup runs exactly once.
pub struct WatchGuard {
    _watcher: RecommendedWatcher,
}

/// Install a watch on every contributing kubeconfig file.
///
/// Returns `None` when the watcher cannot be created or no file could be
/// watched; both are degraded-but-running modes, reported via the log.
pub fn spawn<F, Fut>(paths: &[PathBuf], on_change: F) -> Option<WatchGuard>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher = match notify::recommended_watcher(move |res: notify::Result<Event>| {
        match res {
            Ok(event) => {
                if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                    let _ = tx.send(event);
                }
            }
            Err(e) => warn!(error = %e, "kubeconfig watcher error"),
        }
    }) {
        Ok(watcher) => watcher,
        Err(e) => {
            warn!(error = %e, "failed to create kubeconfig watcher; automatic reload disabled");
            return None;
        }
    };

    let mut watched = 0usize;
    for path in paths {
        match watcher.watch(path, RecursiveMode::NonRecursive) {
            Ok(()) => {
                debug!(path = %path.display(), "watching kubeconfig file");
                watched += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to watch kubeconfig file");
            }
        }
    }
    if watched == 0 {
        warn!("no kubeconfig files could be watched; automatic reload disabled");
        return None;
    }

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            debug!(paths = ?event.paths, kind = ?event.kind, "kubeconfig change detected");
            on_change().await;
        }
    });

    Some(WatchGuard { _watcher: watcher })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn change_event_triggers_callback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "apiVersion: v1\n").unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let hits_clone = hits.clone();
        let guard = spawn(&[path.clone()], move || {
            let hits = hits_clone.clone();
            let tx = tx.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            }
        })
        .expect("watcher should install on an existing file");

        std::fs::write(&path, "apiVersion: v1\nclusters: []\n").unwrap();

        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("expected a change notification")
            .expect("channel open");
        assert!(hits.load(Ordering::SeqCst) >= 1);
        drop(guard);
    }

    #[tokio::test]
    async fn missing_files_degrade_to_no_watch() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let guard = spawn(&[missing], || async {});
        assert!(guard.is_none());
    }
}
