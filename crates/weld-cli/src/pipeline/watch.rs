//! Source watches for the `watch` and `watch:build` steps.
//!
//! Each watched input directory gets its own [`FileWatcher`] and task. The
//! tasks run concurrently and are not coordinated: two directories changing
//! together rebuild in parallel, and every admitted change runs its steps.

use std::sync::Arc;

use tokio::task::JoinHandle;
use weld_config::SiteConfig;

use crate::dev::{FileWatcher, LiveReload};
use crate::error::Result;
use crate::pipeline::Step;
use crate::pipeline::run::execute;
use crate::ui;

/// Input directory segments and the steps a change under each one runs.
pub fn watch_targets(step: Step, config: &SiteConfig) -> Vec<(String, Vec<Step>)> {
    match step {
        Step::Watch => vec![(config.input.templates.clone(), vec![Step::Templates])],
        Step::WatchBuild => {
            let mut styles = vec![Step::StylesBuild];
            if config.serve.render_after_styles {
                styles.push(Step::Templates);
            }
            vec![
                (config.input.scripts.clone(), vec![Step::ScriptsBuild]),
                (config.input.styles.clone(), styles),
                (config.input.templates.clone(), vec![Step::Templates]),
            ]
        }
        _ => Vec::new(),
    }
}

/// Running watches. Dropping the set stops them.
#[derive(Default)]
pub struct WatchSet {
    watchers: Vec<FileWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Start watching `segment`, running `steps` in order on every change.
    ///
    /// A missing directory is skipped with a warning.
    pub fn watch(
        &mut self,
        config: &Arc<SiteConfig>,
        live: &LiveReload,
        segment: &str,
        steps: Vec<Step>,
    ) -> Result<()> {
        let dir = config.resolve(segment);
        if !dir.is_dir() {
            ui::warning(&format!("{segment} not found, not watching it"));
            return Ok(());
        }

        let (watcher, mut changes) = FileWatcher::new(dir, &[] as &[&str])?;
        tracing::debug!("watching {segment} for {:?}", steps);

        let config = Arc::clone(config);
        let live = live.clone();
        let segment = segment.to_string();
        let task = tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                tracing::debug!("{segment} changed: {}", change.path().display());
                for step in &steps {
                    if let Err(e) = execute(*step, &config, &live).await {
                        ui::error(&format!("{} failed: {e}", step.name()));
                        break;
                    }
                }
            }
        });

        self.watchers.push(watcher);
        self.tasks.push(task);
        Ok(())
    }

    /// Stop every watch.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.watchers.clear();
    }
}

impl Drop for WatchSet {
    fn drop(&mut self) {
        self.stop();
    }
}
