// src/pipeline/steps/mod.rs

//! Built-in pipeline steps, grouped by the asset class they serve.

pub mod images;
pub mod markup;
pub mod scripts;
pub mod styles;
