//! File system watcher.
//!
//! Watches a directory recursively and forwards create, modify and remove
//! events through a channel. Paths matching the ignore globs (relative to the
//! watched root) are dropped before they reach the channel. Every other event
//! is forwarded, so the last event of a burst always follows the last write.

use std::path::{Path, PathBuf};

use globset::GlobSet;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::dev::reload::compile_globs;
use crate::error::{CliError, Result};

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    fn from_event(kind: &EventKind, path: &Path) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(FileChange::Created(path.to_path_buf())),
            EventKind::Modify(_) => Some(FileChange::Modified(path.to_path_buf())),
            EventKind::Remove(_) => Some(FileChange::Removed(path.to_path_buf())),
            _ => None,
        }
    }
}

/// Recursive watcher. Dropping it stops the watch and closes the channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// # Errors
    ///
    /// Fails if `root` does not exist, an ignore glob is invalid, or the OS
    /// watcher cannot be created.
    pub fn new<S: AsRef<str>>(
        root: PathBuf,
        ignore_patterns: &[S],
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let ignore = compile_globs(ignore_patterns)?;
        let (tx, rx) = mpsc::channel(100);
        // Events arrive with symlinks resolved.
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        let watch_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("watch error: {e}");
                    return;
                }
            };

            for path in &event.paths {
                if should_ignore(path, &watch_root, &ignore) {
                    continue;
                }
                let Some(change) = FileChange::from_event(&event.kind, path) else {
                    continue;
                };
                // Receiver gone means the consumer shut down.
                let _ = tx.blocking_send(change);
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::debug!("watching {}", root.display());

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Paths outside the root, and paths whose root-relative form matches an
/// ignore glob, are skipped.
fn should_ignore(path: &Path, root: &Path, ignore: &GlobSet) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };
    ignore.is_match(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globs(patterns: &[&str]) -> GlobSet {
        compile_globs(patterns).unwrap()
    }

    #[test]
    fn ignores_node_modules_and_git() {
        let root = PathBuf::from("/site");
        let ignore = globs(&["**/node_modules/**", "**/.git/**"]);

        assert!(should_ignore(
            Path::new("/site/node_modules/pkg/index.js"),
            &root,
            &ignore
        ));
        assert!(should_ignore(Path::new("/site/.git/HEAD"), &root, &ignore));
        assert!(!should_ignore(
            Path::new("/site/public/assets/app.js"),
            &root,
            &ignore
        ));
    }

    #[test]
    fn ignores_rendered_pages_when_configured() {
        let root = PathBuf::from("/site");
        let ignore = globs(&["**/public/*.html", "**/src/templates/**"]);

        assert!(should_ignore(Path::new("/site/public/index.html"), &root, &ignore));
        assert!(should_ignore(
            Path::new("/site/src/templates/layout.twig"),
            &root,
            &ignore
        ));
        assert!(!should_ignore(
            Path::new("/site/public/assets/main.css"),
            &root,
            &ignore
        ));
    }

    #[test]
    fn ignores_paths_outside_root() {
        let root = PathBuf::from("/site");
        assert!(should_ignore(Path::new("/other/file.js"), &root, &globs(&[])));
    }

    #[tokio::test]
    async fn repeated_writes_all_arrive() {
        let dir = tempfile::tempdir().unwrap();
        let (_watcher, mut changes) =
            FileWatcher::new(dir.path().to_path_buf(), &[] as &[&str]).unwrap();
        let file = dir.path().join("page.twig");

        std::fs::write(&file, "one").unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        std::fs::write(&file, "two").unwrap();

        let mut seen = 0;
        while let Ok(Some(change)) =
            tokio::time::timeout(std::time::Duration::from_millis(500), changes.recv()).await
        {
            if change.path().ends_with("page.twig") {
                seen += 1;
            }
        }
        assert!(seen >= 2, "only {seen} events for two writes");
    }

    #[test]
    fn missing_root_is_an_error() {
        let result = FileWatcher::new(PathBuf::from("/definitely/not/here"), &[] as &[&str]);
        assert!(matches!(result, Err(CliError::FileNotFound(_))));
    }

    #[test]
    fn file_change_path() {
        let path = PathBuf::from("/site/src/index.js");
        assert_eq!(FileChange::Modified(path.clone()).path(), path.as_path());
        assert_eq!(FileChange::Removed(path.clone()).path(), path.as_path());
    }
}
