//! Task sequencing.
//!
//! A [`Task`] is what the user asks for on the command line. [`plan`] turns
//! it into an ordered list of [`Step`]s given which source directories exist,
//! and [`Pipeline::run`] executes them in order.

mod run;
mod watch;

pub use run::Pipeline;
pub use watch::{WatchSet, watch_targets};

use weld_config::{Mode, SiteConfig};

/// A top-level task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Serve,
    ServeBuild,
    ScriptsBuild,
    StylesBuild,
    Templates,
    Watch,
    WatchBuild,
}

impl Task {
    pub fn name(self) -> &'static str {
        match self {
            Task::Serve => "serve",
            Task::ServeBuild => "serve:build",
            Task::ScriptsBuild => "scripts:build",
            Task::StylesBuild => "styles:build",
            Task::Templates => "templates",
            Task::Watch => "watch",
            Task::WatchBuild => "watch:build",
        }
    }

    /// The serve mode this task sets before any step runs. Other tasks keep
    /// the configured mode.
    pub fn mode(self) -> Option<Mode> {
        match self {
            Task::Serve => Some(Mode::Dev),
            Task::ServeBuild => Some(Mode::Build),
            _ => None,
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One unit of work in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ScriptsBuild,
    StylesBuild,
    Templates,
    StartServer,
    Watch,
    WatchBuild,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::ScriptsBuild => "scripts:build",
            Step::StylesBuild => "styles:build",
            Step::Templates => "templates",
            Step::StartServer => "serve",
            Step::Watch => "watch",
            Step::WatchBuild => "watch:build",
        }
    }

    /// Whether the step keeps running after it returns.
    pub fn is_long_running(self) -> bool {
        matches!(self, Step::StartServer | Step::Watch | Step::WatchBuild)
    }
}

/// Which input directories exist. Checked once, when a task starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourcePresence {
    pub scripts: bool,
    pub styles: bool,
    pub templates: bool,
}

impl SourcePresence {
    pub fn detect(config: &SiteConfig) -> Self {
        Self {
            scripts: config.resolve(&config.input.scripts).is_dir(),
            styles: config.resolve(&config.input.styles).is_dir(),
            templates: config.resolve(&config.input.templates).is_dir(),
        }
    }

    pub fn all() -> Self {
        Self {
            scripts: true,
            styles: true,
            templates: true,
        }
    }
}

/// The steps `task` runs, in order.
///
/// The serve tasks skip build steps whose sources are absent. Single-step
/// tasks always run their step; the step itself warns about a missing
/// directory.
pub fn plan(task: Task, presence: SourcePresence) -> Vec<Step> {
    let mut steps = Vec::new();
    match task {
        Task::Serve => {
            if presence.templates {
                steps.push(Step::Templates);
            }
            steps.extend([Step::StartServer, Step::Watch]);
        }
        Task::ServeBuild => {
            if presence.scripts {
                steps.push(Step::ScriptsBuild);
            }
            if presence.styles {
                steps.push(Step::StylesBuild);
            }
            if presence.templates {
                steps.push(Step::Templates);
            }
            steps.extend([Step::StartServer, Step::WatchBuild]);
        }
        Task::ScriptsBuild => steps.push(Step::ScriptsBuild),
        Task::StylesBuild => steps.push(Step::StylesBuild),
        Task::Templates => steps.push(Step::Templates),
        Task::Watch => steps.push(Step::Watch),
        Task::WatchBuild => steps.push(Step::WatchBuild),
    }
    steps
}
