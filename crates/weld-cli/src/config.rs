//! Configuration loading for the CLI.

use std::path::PathBuf;

use weld_config::{ConfigDiscovery, SiteConfig};

use crate::cli::Cli;
use crate::error::Result;

/// Load the effective configuration for this invocation.
///
/// The project root is `--cwd` (relative to the current directory) or the
/// current directory. `--config` replaces the search for a config file, and
/// the subcommand's flags form the top layer.
pub fn load(cli: &Cli) -> Result<SiteConfig> {
    let root = project_root(cli.cwd.as_ref())?;

    let mut discovery = ConfigDiscovery::new(&root);
    if let Some(file) = &cli.config {
        discovery = discovery.with_file(root.join(file));
    }

    let config = discovery.load_with(cli.command.overrides())?;
    tracing::debug!("project root {}", config.root.display());
    Ok(config)
}

fn project_root(cwd: Option<&PathBuf>) -> Result<PathBuf> {
    let current = std::env::current_dir()?;
    Ok(match cwd {
        Some(dir) => path_clean::clean(current.join(dir)),
        None => current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;

    #[test]
    #[serial]
    fn root_defaults_to_current_directory() {
        let dir = tempfile::tempdir().unwrap();
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let cli = Cli::try_parse_from(["weld", "templates"]).unwrap();
        let result = load(&cli);
        std::env::set_current_dir(previous).unwrap();

        let expected = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(std::fs::canonicalize(result.unwrap().root).unwrap(), expected);
    }

    #[test]
    fn cwd_flag_sets_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from(["weld", "--cwd", &root, "serve", "--port", "4100"]).unwrap();

        let config = load(&cli).unwrap();
        assert_eq!(config.root, dir.path());
        assert_eq!(config.serve.port, 4100);
    }

    #[test]
    fn explicit_config_file_is_used() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("site.toml"),
            "[output]\ndir = \"dist\"\n",
        )
        .unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let cli =
            Cli::try_parse_from(["weld", "--cwd", &root, "-c", "site.toml", "templates"]).unwrap();

        assert_eq!(load(&cli).unwrap().output.dir, "dist");
    }

    #[test]
    fn missing_explicit_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let cli =
            Cli::try_parse_from(["weld", "--cwd", &root, "-c", "nope.toml", "templates"]).unwrap();

        assert!(load(&cli).is_err());
    }
}
