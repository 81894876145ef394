// src/pipeline/mod.rs

//! Content transformation pipelines.
//!
//! - [`step`] defines the opaque [`PipelineStep`] contract and the read-only
//!   [`StepContext`] shared by all files of a task run.
//! - [`registry`] maps step names to implementations.
//! - [`steps`] holds the built-in steps.

pub mod registry;
pub mod step;
pub mod steps;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::{BuildError, Result};

pub use registry::StepRegistry;
pub use step::{ContextSpec, PipelineStep, PurgeManifest, StepContext, StepError, UtilityTable};

/// An ordered sequence of steps. An empty pipeline copies content verbatim.
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.step_names()).finish()
    }
}

impl Pipeline {
    pub fn new(steps: Vec<Arc<dyn PipelineStep>>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Apply every step in order, feeding each step's output to the next.
    ///
    /// The first failing step aborts the run; its name and `file` are carried
    /// in the returned [`BuildError::Transform`].
    pub fn run(&self, content: Vec<u8>, file: &Path, ctx: &StepContext) -> Result<Vec<u8>> {
        let mut content = content;
        for step in &self.steps {
            trace!(step = step.name(), file = %file.display(), bytes = content.len(), "applying step");
            content = step
                .apply(content, file, ctx)
                .map_err(|err| BuildError::Transform {
                    step: step.name().to_string(),
                    path: file.to_path_buf(),
                    message: err.0,
                })?;
        }
        debug!(file = %file.display(), steps = self.steps.len(), "pipeline finished");
        Ok(content)
    }
}
