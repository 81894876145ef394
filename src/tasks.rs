// src/tasks.rs

//! The standard task set.
//!
//! | task              | source       | destination   | pipeline                      |
//! |-------------------|--------------|---------------|-------------------------------|
//! | `styles`          | `src.css`    | `dist.css`    | `styles.pipeline`             |
//! | `scripts`         | `src.js`     | `dist.js`     | `scripts.pipeline`, `.min.js` |
//! | `images-optimize` | `src.images` | `dist.images` | per extension                 |
//! | `markup-copy`     | `src.base`   | `dist.base`   | none                          |
//! | `markup-minify`   | `src.base`   | `dist.base`   | `markup.minify_pipeline`      |
//!
//! `serve` depends on `markup-copy`, `styles` and `scripts`; `default` is an
//! alias for `serve`.

use std::path::Path;
use std::sync::Arc;

use crate::asset::{AssetRule, AssetTask, Route};
use crate::config::BuildConfig;
use crate::dag::{TaskAction, TaskGraph};
use crate::errors::Result;
use crate::pipeline::{ContextSpec, Pipeline, StepRegistry};

pub const STYLES: &str = "styles";
pub const SCRIPTS: &str = "scripts";
pub const IMAGES_OPTIMIZE: &str = "images-optimize";
pub const MARKUP_COPY: &str = "markup-copy";
pub const MARKUP_MINIFY: &str = "markup-minify";
pub const SERVE: &str = "serve";
pub const DEFAULT: &str = "default";

/// Every task name accepted on the command line.
pub const ALL: &[&str] = &[
    STYLES,
    SCRIPTS,
    IMAGES_OPTIMIZE,
    MARKUP_COPY,
    MARKUP_MINIFY,
    SERVE,
    DEFAULT,
];

/// Tasks re-run by the watch loop. Image optimisation is deliberately
/// manual-only.
pub const WATCHED: &[&str] = &[STYLES, SCRIPTS, MARKUP_COPY];

/// Build the standard task graph from `cfg`, resolving pipelines through
/// `registry`. The graph is validated before it is returned.
pub fn standard_graph(cfg: &BuildConfig, registry: &StepRegistry) -> Result<TaskGraph> {
    let mut graph = TaskGraph::new();

    graph.add_task(STYLES, no_deps(), asset(styles_task(cfg, registry)?))?;
    graph.add_task(SCRIPTS, no_deps(), asset(scripts_task(cfg, registry)?))?;
    graph.add_task(IMAGES_OPTIMIZE, no_deps(), asset(images_task(cfg, registry)?))?;
    graph.add_task(
        MARKUP_COPY,
        no_deps(),
        asset(markup_task(cfg, MARKUP_COPY, "→ Copying HTML", Pipeline::default())?),
    )?;
    graph.add_task(
        MARKUP_MINIFY,
        no_deps(),
        asset(markup_task(
            cfg,
            MARKUP_MINIFY,
            "→ Minifying HTML",
            registry.pipeline(&cfg.markup.minify_pipeline)?,
        )?),
    )?;
    graph.add_task(SERVE, [MARKUP_COPY, STYLES, SCRIPTS], TaskAction::Serve)?;
    graph.add_task(DEFAULT, [SERVE], TaskAction::Alias)?;

    graph.validate()?;
    Ok(graph)
}

fn no_deps() -> [&'static str; 0] {
    []
}

fn asset(task: AssetTask) -> TaskAction {
    TaskAction::Asset(Arc::new(task))
}

fn styles_task(cfg: &BuildConfig, registry: &StepRegistry) -> Result<AssetTask> {
    let source_root = cfg.resolve(&cfg.src.css);
    // Partials reach an entry only through @import, so any file under the
    // stylesheet root may change its output.
    let mut rule =
        AssetRule::new(&source_root, cfg.resolve(&cfg.dist.css)).with_extra_tree(&source_root);
    if let Some(utilities) = cfg.utilities_path() {
        rule = rule.with_extra_input(utilities);
    }

    let route = Route::new(
        cfg.styles.entries.clone(),
        rule,
        registry.pipeline(&cfg.styles.pipeline)?,
    )?;

    Ok(AssetTask::new(STYLES, source_root)
        .with_banner("→ Compiling CSS")
        .with_route(route)
        .with_context(ContextSpec {
            project_root: cfg.root.clone(),
            purge_content: cfg.purge.content.clone(),
            utilities: cfg.utilities_path(),
        }))
}

fn scripts_task(cfg: &BuildConfig, registry: &StepRegistry) -> Result<AssetTask> {
    let source_root = cfg.resolve(&cfg.src.js);
    let dest = cfg.resolve(&cfg.dist.js);

    // Already minified sources are published as-is under their own name.
    let prebuilt = Route::new(
        vec!["**/*.min.js".to_string()],
        AssetRule::new(&source_root, &dest),
        Pipeline::default(),
    )?;
    let minified = Route::new(
        vec!["**/*.js".to_string()],
        AssetRule::new(&source_root, &dest).with_rewrite(".js", ".min.js"),
        registry.pipeline(&cfg.scripts.pipeline)?,
    )?;

    Ok(AssetTask::new(SCRIPTS, source_root)
        .with_banner("→ Minifying JS")
        .with_route(prebuilt)
        .with_route(minified))
}

fn images_task(cfg: &BuildConfig, registry: &StepRegistry) -> Result<AssetTask> {
    let source_root = cfg.resolve(&cfg.src.images);
    let dest = cfg.resolve(&cfg.dist.images);
    let mut task = AssetTask::new(IMAGES_OPTIMIZE, &source_root).with_banner("→ Optimizing images");

    for ext in &cfg.images.extensions {
        let steps: &[&str] = match ext.to_ascii_lowercase().as_str() {
            "svg" => &["svg-optimize"],
            "png" => &["png-recompress"],
            _ => &[],
        };
        task = task.with_route(Route::new_ignoring_case(
            vec![format!("**/*.{ext}")],
            AssetRule::new(&source_root, &dest),
            registry.pipeline(steps)?,
        )?);
    }

    Ok(task)
}

fn markup_task(
    cfg: &BuildConfig,
    name: &str,
    banner: &str,
    pipeline: Pipeline,
) -> Result<AssetTask> {
    let source_root = cfg.resolve(&cfg.src.base);
    let route = Route::new(
        vec!["**/*.html".to_string()],
        AssetRule::new(&source_root, cfg.resolve(&cfg.dist.base)),
        pipeline,
    )?;
    Ok(AssetTask::new(name, source_root)
        .with_banner(banner)
        .with_route(route))
}

/// Config-relative path as a `/`-separated glob prefix.
pub(crate) fn glob_prefix(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let text = text.trim_start_matches("./").trim_end_matches('/');
    if text == "." { String::new() } else { text.to_string() }
}
