// src/asset/task.rs

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::report::{FileReport, TaskReport};
use super::staleness::{AssetRule, is_stale};
use super::write::write_atomic;
use crate::errors::{BuildError, Result};
use crate::pipeline::step::{build_globset, build_globset_with_case};
use crate::pipeline::{ContextSpec, Pipeline, StepContext};

/// A slice of a task's source tree with its own rule and pipeline.
///
/// Patterns are matched against paths relative to the task's source root,
/// using `/` as separator.
pub struct Route {
    patterns: Vec<String>,
    include: GlobSet,
    pub rule: AssetRule,
    pub pipeline: Pipeline,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("patterns", &self.patterns)
            .field("rule", &self.rule)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Route {
    pub fn new(patterns: Vec<String>, rule: AssetRule, pipeline: Pipeline) -> Result<Self> {
        let include = build_globset(&patterns)?;
        Ok(Self {
            patterns,
            include,
            rule,
            pipeline,
        })
    }

    /// Like [`Route::new`], but patterns match regardless of case
    /// (`logo.PNG` matches `**/*.png`).
    pub fn new_ignoring_case(patterns: Vec<String>, rule: AssetRule, pipeline: Pipeline) -> Result<Self> {
        let include = build_globset_with_case(&patterns, true)?;
        Ok(Self {
            patterns,
            include,
            rule,
            pipeline,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.include.is_match(rel_path)
    }
}

/// One repeatable unit of work: enumerate sources, skip fresh ones, run the
/// pipeline on the rest and write the results.
///
/// Each file goes to the first route whose patterns match it. Files matching
/// no route are ignored.
pub struct AssetTask {
    name: String,
    banner: String,
    source_root: PathBuf,
    routes: Vec<Arc<Route>>,
    context: Option<ContextSpec>,
}

impl fmt::Debug for AssetTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetTask")
            .field("name", &self.name)
            .field("source_root", &self.source_root)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl AssetTask {
    pub fn new(name: impl Into<String>, source_root: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            banner: format!("→ Running {name}"),
            name,
            source_root: source_root.into(),
            routes: Vec::new(),
            context: None,
        }
    }

    /// Line logged when the task starts.
    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.routes.push(Arc::new(route));
        self
    }

    /// Build a [`StepContext`] from `spec` for runs that have stale files.
    pub fn with_context(mut self, spec: ContextSpec) -> Self {
        self.context = Some(spec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Whether both tasks write into a common destination directory.
    pub fn shares_destination(&self, other: &AssetTask) -> bool {
        self.routes.iter().any(|mine| {
            other
                .routes
                .iter()
                .any(|theirs| mine.rule.dest_dir == theirs.rule.dest_dir)
        })
    }

    /// Sources under the root in sorted order, each with its route.
    ///
    /// Directory entries that cannot be read are returned as failed reports.
    fn enumerate(&self) -> (Vec<(PathBuf, Arc<Route>)>, Vec<FileReport>) {
        let mut sources = Vec::new();
        let mut errors = Vec::new();

        for entry in WalkDir::new(&self.source_root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(&self.source_root).to_path_buf();
                    errors.push(FileReport::failed(
                        path.clone(),
                        None,
                        BuildError::io(&path, err.into()),
                    ));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.source_root) else {
                continue;
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            if let Some(route) = self.routes.iter().find(|r| r.matches(&rel)) {
                sources.push((entry.path().to_path_buf(), Arc::clone(route)));
            }
        }

        (sources, errors)
    }

    fn build_context(&self) -> Result<StepContext> {
        match &self.context {
            Some(spec) => spec.build(),
            None => Ok(StepContext::default()),
        }
    }

    /// Run the task once. `force` rebuilds every file regardless of
    /// staleness.
    ///
    /// Never fails as a whole: every problem is recorded in the report.
    pub async fn run(&self, force: bool) -> TaskReport {
        info!(task = %self.name, "{}", self.banner);
        let mut report = TaskReport::new(&self.name);

        if !self.source_root.is_dir() {
            warn!(
                task = %self.name,
                root = %self.source_root.display(),
                "source directory does not exist; nothing to do"
            );
            return report;
        }

        let (sources, walk_errors) = self.enumerate();
        report.files.extend(walk_errors);

        let mut slots: Vec<Option<FileReport>> = Vec::with_capacity(sources.len());
        let mut pending = Vec::new();

        for (source, route) in sources {
            let dest = route.rule.dest_path(&source);
            let stale = if force {
                Ok(true)
            } else {
                is_stale(&source, &route.rule)
            };
            match stale {
                Ok(false) => {
                    debug!(task = %self.name, file = %source.display(), "up to date");
                    slots.push(Some(FileReport::skipped(source, dest)));
                }
                Ok(true) => {
                    pending.push((slots.len(), source, dest, route));
                    slots.push(None);
                }
                Err(err) => slots.push(Some(FileReport::failed(source, Some(dest), err))),
            }
        }

        if !pending.is_empty() {
            match self.build_context() {
                Ok(ctx) => self.process(pending, Arc::new(ctx), &mut slots).await,
                Err(err) => {
                    warn!(task = %self.name, error = %err, "failed to build step context");
                    report
                        .files
                        .push(FileReport::failed(self.source_root.clone(), None, err));
                }
            }
        }

        report.files.extend(slots.into_iter().flatten());
        report
    }

    /// Run the pipeline for every pending file on the blocking pool and fill
    /// in the matching slots.
    async fn process(
        &self,
        pending: Vec<(usize, PathBuf, PathBuf, Arc<Route>)>,
        ctx: Arc<StepContext>,
        slots: &mut [Option<FileReport>],
    ) {
        let handles: Vec<_> = pending
            .into_iter()
            .map(|(slot, source, dest, route)| {
                let ctx = Arc::clone(&ctx);
                let (src, dst) = (source.clone(), dest.clone());
                let handle = tokio::task::spawn_blocking(move || {
                    build_file(&src, &dst, &route.pipeline, &ctx)
                });
                (slot, source, dest, handle)
            })
            .collect();

        for (slot, source, dest, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => Err(BuildError::Runtime(format!(
                    "worker for {} failed: {join_err}",
                    source.display()
                ))),
            };
            slots[slot] = Some(match outcome {
                Ok(()) => {
                    debug!(task = %self.name, file = %source.display(), dest = %dest.display(), "written");
                    FileReport::written(source, dest)
                }
                Err(err) => FileReport::failed(source, Some(dest), err),
            });
        }
    }
}

fn build_file(source: &Path, dest: &Path, pipeline: &Pipeline, ctx: &StepContext) -> Result<()> {
    let content = fs::read(source).map_err(|e| BuildError::io(source, e))?;
    let output = pipeline.run(content, source, ctx)?;
    write_atomic(dest, &output)
}
