// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info};

use crate::asset::{AssetTask, TaskReport};
use crate::errors::{BuildError, Result};

/// What a task does once its dependencies have finished.
#[derive(Debug, Clone)]
pub enum TaskAction {
    /// Run an asset task.
    Asset(Arc<AssetTask>),
    /// Start the dev server and watch loop. The graph itself only runs the
    /// dependencies; the caller starts the server afterwards.
    Serve,
    /// No own work; exists only to pull in its dependencies.
    Alias,
}

#[derive(Debug, Clone)]
pub struct TaskNode {
    pub name: String,
    pub deps: Vec<String>,
    pub action: TaskAction,
}

/// Named tasks and the tasks each depends on.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: BTreeMap<String, TaskNode>,
}

/// Execution plan for one requested task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Tasks grouped by depth. Every task's dependencies live in earlier
    /// levels; tasks within a level are independent.
    pub levels: Vec<Vec<String>>,
    /// First task (on the depth-first walk) that pulled each task in.
    parents: HashMap<String, String>,
}

impl Resolution {
    /// Dependency chain from the requested task down to `task`, e.g.
    /// `"default -> serve -> styles"`.
    pub fn chain(&self, task: &str) -> String {
        let mut chain = vec![task.to_string()];
        let mut current = task;
        while let Some(parent) = self.parents.get(current) {
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        chain.join(" -> ")
    }

    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.levels.iter().flatten().map(String::as_str)
    }
}

/// Reports of every asset task that ran, in execution order.
#[derive(Debug, Default)]
pub struct GraphReport {
    pub reports: Vec<TaskReport>,
}

impl GraphReport {
    pub fn report(&self, task: &str) -> Option<&TaskReport> {
        self.reports.iter().find(|r| r.task == task)
    }

    pub fn is_ok(&self) -> bool {
        self.reports.iter().all(TaskReport::is_ok)
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a task. Names must be unique.
    pub fn add_task<S: Into<String>>(
        &mut self,
        name: &str,
        deps: impl IntoIterator<Item = S>,
        action: TaskAction,
    ) -> Result<()> {
        if self.nodes.contains_key(name) {
            return Err(BuildError::config(format!("task '{name}' is declared twice")));
        }
        self.nodes.insert(
            name.to_string(),
            TaskNode {
                name: name.to_string(),
                deps: deps.into_iter().map(Into::into).collect(),
                action,
            },
        );
        Ok(())
    }

    pub fn task(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    /// All asset tasks keyed by name.
    pub fn asset_tasks(&self) -> HashMap<String, Arc<AssetTask>> {
        self.nodes
            .values()
            .filter_map(|node| match &node.action {
                TaskAction::Asset(task) => Some((node.name.clone(), Arc::clone(task))),
                _ => None,
            })
            .collect()
    }

    /// Check the whole graph: every dependency exists, no task depends on
    /// itself, and there are no cycles.
    pub fn validate(&self) -> Result<()> {
        for node in self.nodes.values() {
            for dep in &node.deps {
                if dep == &node.name {
                    return Err(BuildError::config(format!(
                        "task '{}' cannot depend on itself",
                        node.name
                    )));
                }
                if !self.nodes.contains_key(dep) {
                    return Err(BuildError::config(format!(
                        "task '{}' depends on unknown task '{dep}'",
                        node.name
                    )));
                }
            }
        }

        // Edge direction: dep -> task.
        let mut graph = DiGraphMap::<&str, ()>::new();
        for node in self.nodes.values() {
            graph.add_node(node.name.as_str());
            for dep in &node.deps {
                graph.add_edge(dep.as_str(), node.name.as_str(), ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            let at = cycle.node_id();
            // Re-resolve from the offending node to report the actual path.
            let detail = match self.resolve(at) {
                Err(err) => err.to_string(),
                Ok(_) => format!("dependency cycle involving task '{at}'"),
            };
            return Err(BuildError::config(detail));
        }

        debug!(tasks = self.nodes.len(), "task graph validated");
        Ok(())
    }

    /// Resolve the transitive dependencies of `name` depth-first.
    ///
    /// Fails with [`BuildError::Config`] on an unknown task or a cycle, naming
    /// the cycle path.
    pub fn resolve(&self, name: &str) -> Result<Resolution> {
        let mut depth = HashMap::new();
        let mut parents = HashMap::new();
        let mut stack = Vec::new();
        self.visit(name, &mut stack, &mut depth, &mut parents)?;

        let max = depth.values().copied().max().unwrap_or(0);
        let mut levels = vec![Vec::new(); max + 1];
        for (task, level) in depth {
            levels[level].push(task);
        }
        for level in &mut levels {
            level.sort();
        }

        Ok(Resolution { levels, parents })
    }

    fn visit(
        &self,
        name: &str,
        stack: &mut Vec<String>,
        depth: &mut HashMap<String, usize>,
        parents: &mut HashMap<String, String>,
    ) -> Result<usize> {
        if let Some(pos) = stack.iter().position(|n| n == name) {
            let mut cycle = stack[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(BuildError::config(format!(
                "dependency cycle: {}",
                cycle.join(" -> ")
            )));
        }
        if let Some(level) = depth.get(name) {
            return Ok(*level);
        }

        let node = self.nodes.get(name).ok_or_else(|| match stack.last() {
            Some(parent) => {
                BuildError::config(format!("task '{parent}' depends on unknown task '{name}'"))
            }
            None => BuildError::config(format!("unknown task '{name}'")),
        })?;

        stack.push(name.to_string());
        let mut level = 0;
        for dep in &node.deps {
            if !depth.contains_key(dep.as_str()) && !parents.contains_key(dep.as_str()) {
                parents.insert(dep.clone(), name.to_string());
            }
            level = level.max(self.visit(dep, stack, depth, parents)? + 1);
        }
        stack.pop();

        depth.insert(name.to_string(), level);
        Ok(level)
    }

    /// Whether running `name` should end with the dev server running.
    pub fn requires_server(&self, name: &str) -> Result<bool> {
        let plan = self.resolve(name)?;
        Ok(plan
            .tasks()
            .any(|t| matches!(self.nodes.get(t).map(|n| &n.action), Some(TaskAction::Serve))))
    }

    /// Run `name` after all of its dependencies, level by level. Tasks in the
    /// same level run concurrently unless they write into the same
    /// destination directory; those run one after another in level order.
    ///
    /// Stops after the first batch containing a failed task and returns
    /// [`BuildError::TaskFailed`] with the chain that led to it. Output that
    /// was already written stays on disk.
    pub async fn run(&self, name: &str, force: bool) -> Result<GraphReport> {
        self.run_many(&[name], force).await
    }

    /// Run several requested tasks in the given order. A task that an earlier
    /// request already ran is not run again.
    ///
    /// Every request is resolved before anything runs, so an unknown name or
    /// a cycle fails without touching the file system.
    pub async fn run_many(&self, names: &[&str], force: bool) -> Result<GraphReport> {
        let plans = names
            .iter()
            .map(|name| self.resolve(name))
            .collect::<Result<Vec<_>>>()?;

        let mut graph_report = GraphReport::default();
        let mut done = HashSet::new();

        for (name, plan) in names.iter().zip(&plans) {
            info!(task = %name, levels = ?plan.levels, "resolved task graph");
            for level in &plan.levels {
                let fresh: Vec<&str> = level
                    .iter()
                    .map(String::as_str)
                    .filter(|task| done.insert(task.to_string()))
                    .collect();

                for batch in self.batches(&fresh) {
                    let reports = run_batch(batch, force).await?;
                    let failed = reports.iter().find(|r| !r.is_ok()).map(|r| {
                        BuildError::TaskFailed {
                            task: r.task.clone(),
                            chain: plan.chain(&r.task),
                            failures: r.failed(),
                        }
                    });
                    graph_report.reports.extend(reports);

                    if let Some(err) = failed {
                        return Err(err);
                    }
                }
            }
        }

        Ok(graph_report)
    }

    /// Split one level's asset tasks into batches that can run concurrently.
    /// Each task joins the first batch holding no task that shares a
    /// destination directory with it.
    fn batches(&self, level: &[&str]) -> Vec<Vec<Arc<AssetTask>>> {
        let mut batches: Vec<Vec<Arc<AssetTask>>> = Vec::new();
        for task in level {
            let Some(TaskAction::Asset(asset)) = self.nodes.get(*task).map(|n| &n.action) else {
                debug!(task = %task, "no build action");
                continue;
            };
            let slot = batches
                .iter()
                .position(|batch| batch.iter().all(|other| !asset.shares_destination(other)));
            match slot {
                Some(idx) => batches[idx].push(Arc::clone(asset)),
                None => batches.push(vec![Arc::clone(asset)]),
            }
        }
        batches
    }
}

async fn run_batch(batch: Vec<Arc<AssetTask>>, force: bool) -> Result<Vec<TaskReport>> {
    let handles: Vec<_> = batch
        .into_iter()
        .map(|asset| {
            let task = asset.name().to_string();
            (task, tokio::spawn(async move { asset.run(force).await }))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for (task, handle) in handles {
        let report = handle
            .await
            .map_err(|e| BuildError::Runtime(format!("task '{task}' did not complete: {e}")))?;
        report.log_summary();
        reports.push(report);
    }
    Ok(reports)
}
