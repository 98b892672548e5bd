//! `templates`: render every top-level template to `<stem>.html`.
//!
//! Templates are loaded by name from `input.templates`, so `{% extends %}`
//! and `{% include %}` resolve against that directory, including its
//! subdirectories. Only top-level files become pages.

use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, Value, context, path_loader};
use weld_config::SiteConfig;

use crate::error::{BuildError, CliError, Result};
use crate::steps::asset::AssetRewriter;
use crate::steps::writer::{OutputFile, write_outputs};
use crate::steps::{list_sources, output_name, source_dir};

pub const TEMPLATE_EXTENSIONS: &[&str] = &["twig", "jinja", "j2", "html"];

/// Render `input.templates/*` into `output.templates`.
pub fn render_templates(config: &SiteConfig) -> Result<Vec<PathBuf>> {
    let Some(input) = source_dir(config, &config.input.templates) else {
        return Ok(Vec::new());
    };
    let pages = list_sources(&input, TEMPLATE_EXTENSIONS)?;
    if pages.is_empty() {
        tracing::debug!("no templates in {}", input.display());
        return Ok(Vec::new());
    }

    let env = environment(config, &input)?;
    let ctx = context! {
        outputPath => format!("/{}", config.output.dir),
        inputPath => format!("/{}", config.input.dir),
    };

    let mut files = Vec::with_capacity(pages.len());
    for page in &pages {
        let html = render_page(&env, page, &input, &ctx)?;
        files.push(OutputFile::new(output_name(page, "html"), html));
    }

    Ok(write_outputs(&config.resolve(&config.output.templates), &files)?)
}

/// Environment with the template loader, the `asset` filter and the
/// `input.main` globals.
pub fn environment(config: &SiteConfig, templates_dir: &Path) -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_loader(path_loader(templates_dir));
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);

    let rewriter = AssetRewriter::from_config(config);
    env.add_filter("asset", move |url: &str| rewriter.rewrite(url));

    let globals_path = config.resolve(&config.input.main);
    for (name, value) in load_globals(&globals_path)? {
        env.add_global(name, Value::from_serialize(&value));
    }

    Ok(env)
}

/// Top-level entries of the globals file. A missing file means no globals.
fn load_globals(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no template globals at {}", path.display());
            return Ok(serde_json::Map::new());
        }
        Err(e) => return Err(e.into()),
    };

    let invalid = |error: String| BuildError::Templates {
        file: path.to_path_buf(),
        error,
    };
    match serde_json::from_str::<serde_json::Value>(&text).map_err(|e| invalid(e.to_string()))? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(invalid(format!("expected a JSON object, found {}", json_kind(&other))).into()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn render_page(env: &Environment<'_>, page: &Path, templates_dir: &Path, ctx: &Value) -> Result<String> {
    let name = page
        .strip_prefix(templates_dir)
        .unwrap_or(page)
        .to_string_lossy()
        .replace('\\', "/");

    let rendered = env
        .get_template(&name)
        .and_then(|template| template.render(ctx));
    rendered.map_err(|e| {
        CliError::from(BuildError::Templates {
            file: page.to_path_buf(),
            error: format!("{e:#}"),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use weld_config::Mode;

    fn site() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("src/templates");
        fs::create_dir_all(templates.join("partials")).unwrap();
        (dir, templates)
    }

    #[test]
    fn renders_pages_with_layout_and_globals() {
        let (dir, templates) = site();
        fs::write(
            templates.join("partials/layout.twig"),
            "<title>{{ site.name }}</title>{% block body %}{% endblock %}",
        )
        .unwrap();
        fs::write(
            templates.join("index.twig"),
            "{% extends \"partials/layout.twig\" %}{% block body %}<p>{{ outputPath }} {{ inputPath }}</p>{% endblock %}",
        )
        .unwrap();
        fs::write(dir.path().join("src/main.json"), r#"{ "site": { "name": "Weld" } }"#).unwrap();

        let config = SiteConfig::defaults(dir.path());
        let written = render_templates(&config).unwrap();

        assert_eq!(written, vec![dir.path().join("public/index.html")]);
        let html = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(html, "<title>Weld</title><p>/public /src</p>");
    }

    #[test]
    fn asset_filter_follows_mode() {
        let (dir, templates) = site();
        fs::write(
            templates.join("page.twig"),
            r#"{{ "/src/styles/main.css" | asset }}"#,
        )
        .unwrap();

        let build = SiteConfig::defaults(dir.path()).with_mode(Mode::Build);
        render_templates(&build).unwrap();
        let html = fs::read_to_string(dir.path().join("public/page.html")).unwrap();
        assert_eq!(html, "/assets/main.css");

        let dev = SiteConfig::defaults(dir.path()).with_mode(Mode::Dev);
        render_templates(&dev).unwrap();
        let html = fs::read_to_string(dir.path().join("public/page.html")).unwrap();
        assert_eq!(html, "/src/styles/main.css");
    }

    #[test]
    fn missing_globals_file_is_fine() {
        let (dir, templates) = site();
        fs::write(templates.join("about.j2"), "about").unwrap();

        let config = SiteConfig::defaults(dir.path());
        render_templates(&config).unwrap();
        assert!(dir.path().join("public/about.html").exists());
    }

    #[test]
    fn non_object_globals_are_rejected() {
        let (dir, templates) = site();
        fs::write(templates.join("index.twig"), "x").unwrap();
        fs::write(dir.path().join("src/main.json"), "[1, 2]").unwrap();

        let err = render_templates(&SiteConfig::defaults(dir.path())).unwrap_err();
        assert!(err.to_string().contains("main.json"));
    }

    #[test]
    fn render_error_names_the_template() {
        let (dir, templates) = site();
        fs::write(templates.join("broken.twig"), "{% if %}").unwrap();

        let err = render_templates(&SiteConfig::defaults(dir.path())).unwrap_err();
        assert!(err.to_string().contains("broken.twig"));
    }

    #[test]
    fn partials_in_subdirectories_are_not_pages() {
        let (dir, templates) = site();
        fs::write(templates.join("partials/nav.twig"), "nav").unwrap();

        let written = render_templates(&SiteConfig::defaults(dir.path())).unwrap();
        assert!(written.is_empty());
        assert!(!dir.path().join("public/nav.html").exists());
    }
}
