//! Conversion from CLI errors to miette reports.

use miette::Report;

use crate::error::{BuildError, CliError};

pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => miette::miette!(
            help = "Check weld.toml, weld.config.json or WELD_* environment variables",
            "Configuration error: {}",
            e
        ),
        CliError::Server(msg) => miette::miette!(
            help = "Pick another port with --port or stop the process using it",
            "Server error: {}",
            msg
        ),
        _ => miette::miette!("{}", err),
    }
}

pub fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::Styles { file, error } => {
            miette::miette!("Stylesheet error in {}:\n{}", file.display(), error)
        }
        BuildError::Templates { file, error } => {
            miette::miette!("Template error in {}:\n{}", file.display(), error)
        }
        _ => miette::miette!("{}", err),
    }
}
