//! Command-line interface definition.
//!
//! Every subcommand is one pipeline task:
//!
//! - `weld serve` - render templates, serve sources directly, watch templates
//! - `weld serve:build` - build everything, serve the output, rebuild on change
//! - `weld scripts:build`, `weld styles:build`, `weld templates` - one step
//! - `weld watch`, `weld watch:build` - watch without a server

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value, json};

use crate::pipeline::Task;

/// weld - a small static site pipeline
#[derive(Parser, Debug)]
#[command(
    name = "weld",
    version,
    about = "Build scripts, styles and templates, and serve them with live reload",
    long_about = "weld bundles scripts, processes stylesheets and renders templates into an\n\
                  output directory, and runs a development server that reloads the browser\n\
                  when generated files change."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file to use instead of searching the project root
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render templates and serve sources with live reload
    Serve(ServeArgs),

    /// Build scripts, styles and templates, then serve the output with live reload
    #[command(name = "serve:build")]
    ServeBuild(ServeArgs),

    /// Bundle scripts into the output directory
    #[command(name = "scripts:build")]
    ScriptsBuild,

    /// Process stylesheets into the output directory
    #[command(name = "styles:build")]
    StylesBuild,

    /// Render templates into the output directory
    Templates,

    /// Re-render templates when they change
    Watch,

    /// Rebuild scripts, styles and templates when they change
    #[command(name = "watch:build")]
    WatchBuild,
}

/// Server flags shared by `serve` and `serve:build`.
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Port to listen on (0 picks a free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Interface to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Do not open a browser
    #[arg(long)]
    pub no_open: bool,
}

impl ServeArgs {
    /// The config layer these flags contribute. Unset flags leave the lower
    /// layers alone.
    pub fn overrides(&self) -> Value {
        let mut serve = Map::new();
        if let Some(port) = self.port {
            serve.insert("port".into(), json!(port));
        }
        if let Some(host) = &self.host {
            serve.insert("host".into(), json!(host));
        }
        if self.no_open {
            serve.insert("open".into(), json!(false));
        }

        if serve.is_empty() {
            Value::Null
        } else {
            json!({ "serve": serve })
        }
    }
}

impl Command {
    pub fn task(&self) -> Task {
        match self {
            Command::Serve(_) => Task::Serve,
            Command::ServeBuild(_) => Task::ServeBuild,
            Command::ScriptsBuild => Task::ScriptsBuild,
            Command::StylesBuild => Task::StylesBuild,
            Command::Templates => Task::Templates,
            Command::Watch => Task::Watch,
            Command::WatchBuild => Task::WatchBuild,
        }
    }

    pub fn overrides(&self) -> Value {
        match self {
            Command::Serve(args) | Command::ServeBuild(args) => args.overrides(),
            _ => Value::Null,
        }
    }
}
