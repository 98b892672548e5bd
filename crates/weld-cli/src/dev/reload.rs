//! Selective reload decision for file changes seen by the dev server.

use std::fmt;
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{CliError, Result};

/// Extra reload condition, ORed into [`ReloadGate::should_reload`].
pub type ReloadPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A predicate that never matches.
pub fn never() -> ReloadPredicate {
    Arc::new(|_| false)
}

/// Compile globs into a predicate. Paths are matched without a leading `/`.
pub fn glob_predicate(patterns: &[String]) -> Result<ReloadPredicate> {
    if patterns.is_empty() {
        return Ok(never());
    }
    let set = compile_globs(patterns)?;
    Ok(Arc::new(move |path: &str| {
        set.is_match(path.replace('\\', "/").trim_start_matches('/'))
    }))
}

pub(crate) fn compile_globs<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = Glob::new(pattern)
            .map_err(|e| CliError::InvalidArgument(format!("invalid glob '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| CliError::InvalidArgument(format!("invalid glob set: {e}")))
}

/// Decides whether a changed path should trigger a full browser reload.
///
/// A path qualifies when it lies under the `/<output>/` segment. With
/// `reload_public` off, rendered `.html` and `.json` files are excluded since
/// the template step reloads after rendering. The extra predicate can always
/// force a reload.
///
/// The gate keeps no history; every call is decided on its own.
#[derive(Clone)]
pub struct ReloadGate {
    segment: String,
    reload_public: bool,
    extra: ReloadPredicate,
}

impl ReloadGate {
    pub fn new(output: &str, reload_public: bool) -> Self {
        let output = output.replace('\\', "/");
        Self {
            segment: format!("/{}/", output.trim_matches('/')),
            reload_public,
            extra: never(),
        }
    }

    pub fn with_predicate(mut self, extra: ReloadPredicate) -> Self {
        self.extra = extra;
        self
    }

    pub fn should_reload(&self, path: &str) -> bool {
        let normalized = normalize(path);

        let in_output = normalized.contains(&self.segment);
        let base = if self.reload_public {
            in_output
        } else {
            in_output && !normalized.ends_with(".json") && !normalized.ends_with(".html")
        };

        base || (self.extra)(path)
    }
}

impl fmt::Debug for ReloadGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadGate")
            .field("segment", &self.segment)
            .field("reload_public", &self.reload_public)
            .finish_non_exhaustive()
    }
}

/// Forward slashes and a leading `/`, so `public/a.js` contains `/public/`.
fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') {
        unified
    } else {
        format!("/{unified}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selective_mode_skips_rendered_pages_and_data() {
        let gate = ReloadGate::new("public", false);

        assert!(gate.should_reload("/site/public/assets/app.js"));
        assert!(gate.should_reload("/site/public/assets/main.css"));
        assert!(!gate.should_reload("/site/public/index.html"));
        assert!(!gate.should_reload("/site/public/data.json"));
        assert!(!gate.should_reload("/site/src/scripts/app.js"));
    }

    #[test]
    fn public_mode_reloads_everything_under_output() {
        let gate = ReloadGate::new("public", true);

        assert!(gate.should_reload("/site/public/index.html"));
        assert!(gate.should_reload("/site/public/data.json"));
        assert!(!gate.should_reload("/site/src/templates/index.twig"));
    }

    #[test]
    fn relative_and_windows_paths_are_normalized() {
        let gate = ReloadGate::new("public", false);

        assert!(gate.should_reload("public/assets/app.js"));
        assert!(gate.should_reload("C:\\site\\public\\assets\\app.js"));
        assert!(!gate.should_reload("publicity/app.js"));
    }

    #[test]
    fn extra_predicate_forces_reload() {
        let gate = ReloadGate::new("public", false)
            .with_predicate(Arc::new(|path: &str| path.ends_with(".php")));

        assert!(gate.should_reload("/site/app/controller.php"));
        assert!(gate.should_reload("/site/public/page.php"));
        assert!(!gate.should_reload("/site/app/controller.rb"));
    }

    #[test]
    fn glob_predicate_matches_relative_paths() {
        let predicate = glob_predicate(&["src/data/**".to_string(), "**/*.php".to_string()]).unwrap();

        assert!(predicate("src/data/items.json"));
        assert!(predicate("/src/data/items.json"));
        assert!(predicate("app/views/page.php"));
        assert!(!predicate("src/styles/main.css"));
    }

    #[test]
    fn empty_glob_list_never_matches() {
        let predicate = glob_predicate(&[]).unwrap();
        assert!(!predicate("anything"));
    }

    #[test]
    fn invalid_glob_is_rejected() {
        assert!(glob_predicate(&["src/[".to_string()]).is_err());
    }

    #[test]
    fn nested_output_segment() {
        let gate = ReloadGate::new("dist/site", false);
        assert!(gate.should_reload("dist/site/app.js"));
        assert!(!gate.should_reload("dist/app.js"));
    }
}
