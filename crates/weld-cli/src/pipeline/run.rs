use std::sync::Arc;
use std::time::Instant;

use weld_config::SiteConfig;

use crate::dev::{DevServerOptions, LiveReload};
use crate::error::{CliError, Result};
use crate::pipeline::watch::{WatchSet, watch_targets};
use crate::pipeline::{SourcePresence, Step, Task, plan};
use crate::steps;
use crate::ui;

/// Runs tasks against one configuration.
pub struct Pipeline {
    config: Arc<SiteConfig>,
    live: LiveReload,
}

impl Pipeline {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config: Arc::new(config),
            live: LiveReload::new(),
        }
    }

    /// Run `task` to completion.
    ///
    /// One-shot tasks return once their steps finish. Tasks that start a
    /// server or a watch run until Ctrl+C. A failing step stops the sequence
    /// and its error is returned.
    pub async fn run(mut self, task: Task) -> Result<()> {
        if let Some(mode) = task.mode() {
            self.config = Arc::new(self.config.as_ref().clone().with_mode(mode));
        }

        let presence = SourcePresence::detect(&self.config);
        let steps = plan(task, presence);
        tracing::debug!("{task} ({}): {:?}", self.config.mode(), steps);

        let mut watches = WatchSet::new();
        for step in &steps {
            self.run_step(*step, &mut watches).await?;
        }

        if steps.iter().any(|step| step.is_long_running()) {
            ui::info("Press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;
            ui::info("Shutting down...");
            watches.stop();
            self.live.shutdown().await?;
        }

        Ok(())
    }

    async fn run_step(&self, step: Step, watches: &mut WatchSet) -> Result<()> {
        match step {
            Step::StartServer => {
                let options = DevServerOptions::from_config(&self.config)?;
                self.live.init(options).await?;
                Ok(())
            }
            Step::Watch | Step::WatchBuild => {
                for (segment, on_change) in watch_targets(step, &self.config) {
                    watches.watch(&self.config, &self.live, &segment, on_change)?;
                }
                if watches.is_empty() {
                    ui::warning("Nothing to watch");
                }
                Ok(())
            }
            Step::ScriptsBuild | Step::StylesBuild | Step::Templates => {
                let spinner = ui::Spinner::new(&format!("Running {}...", step.name()));
                let started = Instant::now();
                match execute(step, &self.config, &self.live).await {
                    Ok(count) => {
                        spinner.finish(&format!(
                            "{} wrote {count} {} in {}",
                            step.name(),
                            if count == 1 { "file" } else { "files" },
                            ui::format_duration(started.elapsed())
                        ));
                        Ok(())
                    }
                    Err(e) => {
                        spinner.fail(&format!("{} failed", step.name()));
                        Err(e)
                    }
                }
            }
        }
    }
}

/// Run one build step, returning how many files it wrote.
///
/// Rendering templates asks connected browsers to reload.
pub(crate) async fn execute(step: Step, config: &SiteConfig, live: &LiveReload) -> Result<usize> {
    let written = match step {
        Step::ScriptsBuild => steps::build_scripts(config).await?,
        Step::StylesBuild => steps::build_styles(config)?,
        Step::Templates => {
            let written = steps::render_templates(config)?;
            live.reload(Some(&format!("{}/*.html", config.output.templates)));
            written
        }
        other => {
            return Err(CliError::InvalidArgument(format!(
                "{} is not a build step",
                other.name()
            )));
        }
    };

    for path in &written {
        tracing::debug!("wrote {}", ui::relative_display(path, &config.root));
    }
    Ok(written.len())
}
