// src/asset/staleness.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::errors::{BuildError, Result};

/// Suffix mapping applied to destination file names, e.g. `.js` → `.min.js`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRewrite {
    pub from: String,
    pub to: String,
}

impl ExtensionRewrite {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Rewritten file name, or `None` when the rewrite does not apply.
    ///
    /// A name that already carries the target suffix is left alone, so
    /// `app.min.js` never becomes `app.min.min.js`.
    pub fn apply(&self, file_name: &str) -> Option<String> {
        if file_name.ends_with(&self.to) {
            return None;
        }
        file_name
            .strip_suffix(&self.from)
            .map(|stem| format!("{stem}{}", self.to))
    }
}

/// Source ↔ destination correspondence for one class of files.
#[derive(Debug, Clone)]
pub struct AssetRule {
    /// Directory that source paths are taken relative to.
    pub source_root: PathBuf,
    /// Directory that replaces `source_root` in the destination path.
    pub dest_dir: PathBuf,
    pub rewrite: Option<ExtensionRewrite>,
    /// Files whose changes also make every destination of this rule stale
    /// (e.g. the utilities config for styles).
    pub extra_inputs: Vec<PathBuf>,
    /// Directories whose files, at any depth, count as extra inputs (e.g.
    /// the partials an entry stylesheet imports).
    pub extra_trees: Vec<PathBuf>,
}

impl AssetRule {
    pub fn new(source_root: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_dir: dest_dir.into(),
            rewrite: None,
            extra_inputs: Vec::new(),
            extra_trees: Vec::new(),
        }
    }

    pub fn with_rewrite(mut self, from: &str, to: &str) -> Self {
        self.rewrite = Some(ExtensionRewrite::new(from, to));
        self
    }

    pub fn with_extra_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.extra_inputs.push(path.into());
        self
    }

    pub fn with_extra_tree(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_trees.push(dir.into());
        self
    }

    /// Destination path for `source`.
    ///
    /// A source outside `source_root` maps to its bare file name in
    /// `dest_dir`.
    pub fn dest_path(&self, source: &Path) -> PathBuf {
        let rel = match source.strip_prefix(&self.source_root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => source.file_name().map(PathBuf::from).unwrap_or_default(),
        };

        let mut dest = self.dest_dir.join(rel);
        if let Some(rewrite) = &self.rewrite {
            let renamed = dest
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| rewrite.apply(n));
            if let Some(name) = renamed {
                dest.set_file_name(name);
            }
        }
        dest
    }
}

/// Whether the destination of `source` under `rule` must be rebuilt.
///
/// True when the destination is missing, or when the source or any of the
/// rule's extra inputs (files or files under extra trees) was modified after
/// it. Missing or unreadable extra inputs are ignored. Only an unreadable
/// source is an error.
pub fn is_stale(source: &Path, rule: &AssetRule) -> Result<bool> {
    let dest = rule.dest_path(source);
    let Some(dest_time) = mtime(&dest).map_err(|e| BuildError::io(&dest, e))? else {
        return Ok(true);
    };

    let source_time = mtime(source)
        .map_err(|e| BuildError::io(source, e))?
        .ok_or_else(|| {
            BuildError::io(source, io::Error::new(io::ErrorKind::NotFound, "source file vanished"))
        })?;
    if source_time > dest_time {
        return Ok(true);
    }

    for extra in &rule.extra_inputs {
        if let Ok(Some(t)) = mtime(extra) {
            if t > dest_time {
                return Ok(true);
            }
        }
    }

    for dir in &rule.extra_trees {
        let newer = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok()?.modified().ok())
            .any(|t| t > dest_time);
        if newer {
            return Ok(true);
        }
    }

    Ok(false)
}

fn mtime(path: &Path) -> io::Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(meta) => meta.modified().map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_skips_names_already_rewritten() {
        let rw = ExtensionRewrite::new(".js", ".min.js");
        assert_eq!(rw.apply("app.js").as_deref(), Some("app.min.js"));
        assert_eq!(rw.apply("app.min.js"), None);
        assert_eq!(rw.apply("app.ts"), None);
    }

    #[test]
    fn dest_path_keeps_subdirectories() {
        let rule = AssetRule::new("/p/src/js", "/p/dist/js").with_rewrite(".js", ".min.js");
        assert_eq!(
            rule.dest_path(Path::new("/p/src/js/vendor/lib.js")),
            PathBuf::from("/p/dist/js/vendor/lib.min.js")
        );
        assert_eq!(
            rule.dest_path(Path::new("/p/src/js/lib.min.js")),
            PathBuf::from("/p/dist/js/lib.min.js")
        );
    }

    #[test]
    fn dest_path_without_rewrite_is_same_name() {
        let rule = AssetRule::new("src", "dist");
        assert_eq!(
            rule.dest_path(Path::new("src/index.html")),
            PathBuf::from("dist/index.html")
        );
    }
}
