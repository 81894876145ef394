// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate paths and pipeline step names (`validate.rs`).
//!
//! The resulting [`BuildConfig`] is immutable and passed by reference to every
//! component that needs it.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    BuildConfig, DistPaths, ImagesSection, MarkupSection, PurgeSection, ScriptsSection,
    ServeSection, SourcePaths, StylesSection, ToolConfigSection,
};
pub use validate::validate_config;
