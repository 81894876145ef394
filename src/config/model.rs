// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration as read from `Assetpipe.toml`.
///
/// ```toml
/// [src]
/// base = "src"
/// css = "src/css"
///
/// [dist]
/// base = "dist"
///
/// [styles]
/// entries = ["style.css"]
/// pipeline = ["import", "utilities", "system-ui", "minify", "purge"]
///
/// [config]
/// utilities = "utilities.toml"
///
/// [purge]
/// content = ["src/**/*.html"]
/// ```
///
/// All sections are optional and have reasonable defaults. Relative paths are
/// resolved against [`BuildConfig::root`], the directory holding the config
/// file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BuildConfig {
    /// Project root. Not read from TOML; set by the loader.
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub src: SourcePaths,

    #[serde(default)]
    pub dist: DistPaths,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub markup: MarkupSection,

    #[serde(default)]
    pub images: ImagesSection,

    /// Tool-specific config files, from `[config]`.
    #[serde(default)]
    pub config: ToolConfigSection,

    #[serde(default)]
    pub purge: PurgeSection,

    #[serde(default)]
    pub serve: ServeSection,
}

impl BuildConfig {
    /// Defaults rooted at `root`, as if an empty config file lived there.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Resolve a config-relative path against the project root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Resolved path of the utilities (tailwind-equivalent) config, if any.
    pub fn utilities_path(&self) -> Option<PathBuf> {
        self.config.utilities.as_ref().map(|p| self.resolve(p))
    }
}

/// `[src]` section: source roots per asset class.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcePaths {
    #[serde(default = "default_src_base")]
    pub base: PathBuf,
    #[serde(default = "default_src_css")]
    pub css: PathBuf,
    #[serde(default = "default_src_js")]
    pub js: PathBuf,
    #[serde(default = "default_src_images")]
    pub images: PathBuf,
}

fn default_src_base() -> PathBuf {
    PathBuf::from("src")
}

fn default_src_css() -> PathBuf {
    PathBuf::from("src/css")
}

fn default_src_js() -> PathBuf {
    PathBuf::from("src/js")
}

fn default_src_images() -> PathBuf {
    PathBuf::from("src/images")
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            base: default_src_base(),
            css: default_src_css(),
            js: default_src_js(),
            images: default_src_images(),
        }
    }
}

/// `[dist]` section: destination roots per asset class.
#[derive(Debug, Clone, Deserialize)]
pub struct DistPaths {
    #[serde(default = "default_dist_base")]
    pub base: PathBuf,
    #[serde(default = "default_dist_css")]
    pub css: PathBuf,
    #[serde(default = "default_dist_js")]
    pub js: PathBuf,
    #[serde(default = "default_dist_images")]
    pub images: PathBuf,
}

fn default_dist_base() -> PathBuf {
    PathBuf::from("dist")
}

fn default_dist_css() -> PathBuf {
    PathBuf::from("dist/css")
}

fn default_dist_js() -> PathBuf {
    PathBuf::from("dist/js")
}

fn default_dist_images() -> PathBuf {
    PathBuf::from("dist/images")
}

impl Default for DistPaths {
    fn default() -> Self {
        Self {
            base: default_dist_base(),
            css: default_dist_css(),
            js: default_dist_js(),
            images: default_dist_images(),
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    /// Entry stylesheets under `src.css`. Partials reach the output only
    /// through `@import`.
    #[serde(default = "default_style_entries")]
    pub entries: Vec<String>,

    /// Step names, applied in order.
    #[serde(default = "default_style_pipeline")]
    pub pipeline: Vec<String>,
}

fn default_style_entries() -> Vec<String> {
    vec!["style.css".to_string()]
}

fn default_style_pipeline() -> Vec<String> {
    ["import", "utilities", "system-ui", "minify", "purge"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            entries: default_style_entries(),
            pipeline: default_style_pipeline(),
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsSection {
    /// Pipeline for unminified `*.js` sources. Already minified `*.min.js`
    /// sources are always copied verbatim.
    #[serde(default = "default_script_pipeline")]
    pub pipeline: Vec<String>,
}

fn default_script_pipeline() -> Vec<String> {
    vec!["js-minify".to_string()]
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            pipeline: default_script_pipeline(),
        }
    }
}

/// `[markup]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupSection {
    /// Pipeline used by `markup-minify`. `markup-copy` never transforms.
    #[serde(default = "default_markup_minify_pipeline")]
    pub minify_pipeline: Vec<String>,
}

fn default_markup_minify_pipeline() -> Vec<String> {
    vec!["html-minify".to_string()]
}

impl Default for MarkupSection {
    fn default() -> Self {
        Self {
            minify_pipeline: default_markup_minify_pipeline(),
        }
    }
}

/// `[images]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesSection {
    /// File extensions (without the dot) picked up by `images-optimize`.
    #[serde(default = "default_image_extensions")]
    pub extensions: Vec<String>,
}

fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "svg"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            extensions: default_image_extensions(),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolConfigSection {
    /// Utilities table consumed by the `utilities` step. Also watched and
    /// used as an extra staleness input for styles.
    #[serde(default)]
    pub utilities: Option<PathBuf>,
}

/// `[purge]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PurgeSection {
    /// Glob patterns (relative to the project root) of files that reference
    /// CSS selectors. Empty disables purging.
    #[serde(default)]
    pub content: Vec<String>,
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Tasks whose successful watch-triggered run emits a reload signal.
    #[serde(default = "default_reload_on")]
    pub reload_on: Vec<String>,

    /// Window in which bursts of file events are merged before routing.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_reload_on() -> Vec<String> {
    vec!["markup-copy".to_string()]
}

fn default_debounce_ms() -> u64 {
    50
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reload_on: default_reload_on(),
            debounce_ms: default_debounce_ms(),
        }
    }
}
