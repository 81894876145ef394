// src/watch/patterns.rs

use std::fmt;

use globset::GlobSet;

use crate::config::BuildConfig;
use crate::engine::TaskName;
use crate::errors::Result;
use crate::pipeline::step::build_globset;
use crate::tasks::{self, glob_prefix};

/// Compiled watch patterns for a single task.
///
/// Patterns are relative to the project root; [`WatchRoute::matches`] takes
/// `/`-separated relative paths such as `"src/css/base.css"`.
#[derive(Clone)]
pub struct WatchRoute {
    task: TaskName,
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for WatchRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRoute")
            .field("task", &self.task)
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl WatchRoute {
    pub fn new(task: impl Into<TaskName>, patterns: Vec<String>) -> Result<Self> {
        let set = build_globset(&patterns)?;
        Ok(Self {
            task: task.into(),
            patterns,
            set,
        })
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// Static mapping from changed paths to the tasks that own them.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: Vec<WatchRoute>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, route: WatchRoute) -> Self {
        self.routes.push(route);
        self
    }

    /// The standard rules:
    ///
    /// - `src.css/**/*.css` and the utilities config → `styles`
    /// - `src.js/**/*.js` → `scripts`
    /// - `src.base/**/*.html` → `markup-copy`
    pub fn from_config(cfg: &BuildConfig) -> Result<Self> {
        let mut styles = vec![under(&glob_prefix(&cfg.src.css), "**/*.css")];
        if let Some(utilities) = &cfg.config.utilities {
            styles.push(glob_prefix(utilities));
        }

        Ok(Self::new()
            .with_route(WatchRoute::new(tasks::STYLES, styles)?)
            .with_route(WatchRoute::new(
                tasks::SCRIPTS,
                vec![under(&glob_prefix(&cfg.src.js), "**/*.js")],
            )?)
            .with_route(WatchRoute::new(
                tasks::MARKUP_COPY,
                vec![under(&glob_prefix(&cfg.src.base), "**/*.html")],
            )?))
    }

    pub fn routes(&self) -> &[WatchRoute] {
        &self.routes
    }

    /// Tasks owning `rel_path`, in route order, without duplicates.
    pub fn tasks_for(&self, rel_path: &str) -> Vec<TaskName> {
        let mut tasks: Vec<TaskName> = Vec::new();
        for route in &self.routes {
            if route.matches(rel_path) && !tasks.iter().any(|t| t == route.task()) {
                tasks.push(route.task.clone());
            }
        }
        tasks
    }
}

fn under(prefix: &str, pattern: &str) -> String {
    if prefix.is_empty() {
        pattern.to_string()
    } else {
        format!("{prefix}/{pattern}")
    }
}
