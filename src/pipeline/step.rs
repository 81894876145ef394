// src/pipeline/step.rs

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{BuildError, Result};

/// Rejection raised by a single step. The pipeline attaches the step name and
/// file path before surfacing it as [`BuildError::Transform`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StepError(pub String);

impl StepError {
    pub fn new(msg: impl Into<String>) -> Self {
        StepError(msg.into())
    }
}

/// One named, opaque content transformation.
///
/// Steps are stateless: the output depends only on `content`, the file being
/// processed and the read-only `ctx`.
pub trait PipelineStep: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        content: Vec<u8>,
        file: &Path,
        ctx: &StepContext,
    ) -> std::result::Result<Vec<u8>, StepError>;
}

/// Decode step input as UTF-8 text.
pub(crate) fn utf8(content: Vec<u8>) -> std::result::Result<String, StepError> {
    String::from_utf8(content).map_err(|e| StepError::new(format!("input is not UTF-8: {e}")))
}

/// Shared configuration handed to every step of a task run.
///
/// Built once per run and shared read-only across all files of that run.
#[derive(Debug, Clone, Default)]
pub struct StepContext {
    pub purge: PurgeManifest,
    pub utilities: UtilityTable,
}

/// Files that reference CSS selectors, reduced to the set of words they
/// contain. Consumed by the `purge` step.
#[derive(Debug, Clone, Default)]
pub struct PurgeManifest {
    files: Vec<PathBuf>,
    tokens: HashSet<String>,
}

impl PurgeManifest {
    /// Build a manifest from in-memory documents.
    pub fn from_documents<'a>(docs: impl IntoIterator<Item = (PathBuf, &'a str)>) -> Self {
        let mut manifest = PurgeManifest::default();
        for (path, text) in docs {
            manifest.add_document(path, text);
        }
        manifest
    }

    /// Collect every file under `root` matching one of `patterns`.
    pub fn from_globs(root: &Path, patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::default());
        }

        let set = build_globset(patterns)?;
        let mut manifest = PurgeManifest::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                BuildError::io(&path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            if !set.is_match(&rel) {
                continue;
            }

            let bytes = fs::read(entry.path()).map_err(|e| BuildError::io(entry.path(), e))?;
            manifest.add_document(entry.path().to_path_buf(), &String::from_utf8_lossy(&bytes));
        }

        debug!(
            files = manifest.files.len(),
            tokens = manifest.tokens.len(),
            "built purge manifest"
        );
        Ok(manifest)
    }

    fn add_document(&mut self, path: PathBuf, text: &str) {
        self.tokens.extend(
            TOKEN_SPLITTER
                .split(text)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
        self.files.push(path);
    }

    /// An empty manifest disables purging.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}

// Class names keep `-`, `_`, `:` and `/` (e.g. `md:w-1/2`).
static TOKEN_SPLITTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-:/]+").expect("valid regex"));

/// Utility name → declaration block, consumed by the `utilities` step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtilityTable {
    entries: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct UtilitiesFile {
    #[serde(default)]
    utilities: BTreeMap<String, String>,
}

impl UtilityTable {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Parse the `[utilities]` table of a TOML document.
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        let file: UtilitiesFile = toml::from_str(text)?;
        Ok(Self::new(file.utilities))
    }

    /// Load from disk; a missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "utilities config not found; using empty table");
                return Ok(Self::default());
            }
            Err(e) => return Err(BuildError::io(path, e)),
        };
        Self::parse(&text).map_err(|e| {
            BuildError::config(format!("parsing utilities config {}: {e}", path.display()))
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recipe for building a [`StepContext`] at the start of a task run.
///
/// Content files and the utilities table may change between runs, so they are
/// read when a run actually has stale files, never at startup.
#[derive(Debug, Clone, Default)]
pub struct ContextSpec {
    pub project_root: PathBuf,
    pub purge_content: Vec<String>,
    pub utilities: Option<PathBuf>,
}

impl ContextSpec {
    pub fn build(&self) -> Result<StepContext> {
        let purge = PurgeManifest::from_globs(&self.project_root, &self.purge_content)?;
        let utilities = match &self.utilities {
            Some(path) => UtilityTable::load(path)?,
            None => UtilityTable::default(),
        };
        Ok(StepContext { purge, utilities })
    }
}

/// Compile glob patterns where `*` does not cross directory separators.
pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    build_globset_with_case(patterns, false)
}

pub(crate) fn build_globset_with_case(patterns: &[String], case_insensitive: bool) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| BuildError::config(format!("invalid glob pattern '{pat}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BuildError::config(format!("building glob set: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_tokens_keep_variant_prefixes() {
        let manifest = PurgeManifest::from_documents([(
            PathBuf::from("index.html"),
            r#"<div class="btn md:w-1/2 text-red">"#,
        )]);
        assert!(manifest.contains("btn"));
        assert!(manifest.contains("md:w-1/2"));
        assert!(manifest.contains("text-red"));
        assert!(!manifest.contains("hidden"));
    }

    #[test]
    fn utilities_parse_reads_table() {
        let table = UtilityTable::parse(
            r#"
            [utilities]
            "text-red" = "color: #e3342f"
            "p-4" = "padding: 1rem"
            "#,
        )
        .unwrap();
        assert_eq!(table.get("p-4"), Some("padding: 1rem"));
        assert_eq!(table.iter().count(), 2);
    }
}
