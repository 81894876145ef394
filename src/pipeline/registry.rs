// src/pipeline/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{BuildError, Result};
use crate::pipeline::Pipeline;
use crate::pipeline::step::PipelineStep;
use crate::pipeline::steps;

/// Explicit mapping from step name to implementation.
///
/// Populated by [`StepRegistry::register`] calls at startup; pipelines can
/// only ever reference steps registered here.
#[derive(Clone, Default)]
pub struct StepRegistry {
    steps: BTreeMap<&'static str, Arc<dyn PipelineStep>>,
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.names())
            .finish()
    }
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in step.
    pub fn with_builtin_steps() -> Self {
        let mut registry = Self::new();
        registry.register(steps::styles::ImportStep);
        registry.register(steps::styles::UtilitiesStep);
        registry.register(steps::styles::SystemUiStep);
        registry.register(steps::styles::MinifyStep);
        registry.register(steps::styles::PurgeStep);
        registry.register(steps::scripts::JsMinifyStep);
        registry.register(steps::markup::HtmlMinifyStep);
        registry.register(steps::images::SvgOptimizeStep);
        registry.register(steps::images::PngRecompressStep);
        registry
    }

    /// Register a step under its own name, replacing any previous step with
    /// the same name.
    pub fn register<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        let name = step.name();
        if self.steps.insert(name, Arc::new(step)).is_some() {
            debug!(step = name, "replaced previously registered step");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PipelineStep>> {
        self.steps.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.steps.keys().copied().collect()
    }

    /// Resolve an ordered list of step names into a runnable pipeline.
    pub fn pipeline<S: AsRef<str>>(&self, names: &[S]) -> Result<Pipeline> {
        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let step = self
                .get(name)
                .ok_or_else(|| BuildError::config(format!("unknown pipeline step '{name}'")))?;
            resolved.push(step);
        }
        Ok(Pipeline::new(resolved))
    }
}
