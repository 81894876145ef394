// src/config/validate.rs

use std::path::Path;

use crate::config::model::BuildConfig;
use crate::errors::{BuildError, Result};
use crate::pipeline::StepRegistry;
use crate::tasks;

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - every source/destination root is set
/// - every pipeline only names registered steps
/// - styles have at least one entry and images at least one extension
/// - `serve.reload_on` only names watch-triggered tasks
///
/// Task graph acyclicity is checked by [`crate::dag::TaskGraph::validate`].
pub fn validate_config(cfg: &BuildConfig, registry: &StepRegistry) -> Result<()> {
    validate_paths(cfg)?;
    validate_pipelines(cfg, registry)?;
    validate_sections(cfg)?;
    validate_serve(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &BuildConfig) -> Result<()> {
    let required: [(&str, &Path); 8] = [
        ("src.base", &cfg.src.base),
        ("src.css", &cfg.src.css),
        ("src.js", &cfg.src.js),
        ("src.images", &cfg.src.images),
        ("dist.base", &cfg.dist.base),
        ("dist.css", &cfg.dist.css),
        ("dist.js", &cfg.dist.js),
        ("dist.images", &cfg.dist.images),
    ];

    for (key, path) in required {
        if path.as_os_str().is_empty() {
            return Err(BuildError::config(format!("missing required path `{key}`")));
        }
    }

    if let Some(utilities) = &cfg.config.utilities {
        if utilities.as_os_str().is_empty() {
            return Err(BuildError::config(
                "`config.utilities` must not be empty when set",
            ));
        }
    }

    Ok(())
}

fn validate_pipelines(cfg: &BuildConfig, registry: &StepRegistry) -> Result<()> {
    let pipelines = [
        ("styles.pipeline", &cfg.styles.pipeline),
        ("scripts.pipeline", &cfg.scripts.pipeline),
        ("markup.minify_pipeline", &cfg.markup.minify_pipeline),
    ];

    for (key, steps) in pipelines {
        for step in steps {
            if !registry.contains(step) {
                return Err(BuildError::config(format!(
                    "`{key}` references unknown step '{step}' (known: {})",
                    registry.names().join(", ")
                )));
            }
        }
    }
    Ok(())
}

fn validate_sections(cfg: &BuildConfig) -> Result<()> {
    if cfg.styles.entries.is_empty() {
        return Err(BuildError::config("`styles.entries` must list at least one file"));
    }
    if cfg.images.extensions.is_empty() {
        return Err(BuildError::config(
            "`images.extensions` must list at least one extension",
        ));
    }
    for ext in &cfg.images.extensions {
        if ext.is_empty() || ext.contains(['.', '/', '{', '}', '*']) {
            return Err(BuildError::config(format!(
                "invalid image extension '{ext}' (expected e.g. \"png\")"
            )));
        }
    }
    Ok(())
}

fn validate_serve(cfg: &BuildConfig) -> Result<()> {
    for task in &cfg.serve.reload_on {
        if !tasks::WATCHED.contains(&task.as_str()) {
            return Err(BuildError::config(format!(
                "`serve.reload_on` names '{task}', which is not watch-triggered (expected one of: {})",
                tasks::WATCHED.join(", ")
            )));
        }
    }
    Ok(())
}
