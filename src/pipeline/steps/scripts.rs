// src/pipeline/steps/scripts.rs

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::pipeline::step::{PipelineStep, StepContext, StepError, utf8};

/// `js-minify`: parse with oxc, compress, mangle local names and print
/// without comments or whitespace.
///
/// Sources are parsed as classic scripts, so top-level bindings stay visible
/// to other scripts on the page.
pub struct JsMinifyStep;

impl PipelineStep for JsMinifyStep {
    fn name(&self) -> &'static str {
        "js-minify"
    }

    fn apply(&self, content: Vec<u8>, _file: &Path, _ctx: &StepContext) -> Result<Vec<u8>, StepError> {
        let text = utf8(content)?;
        minify_js(&text).map(String::into_bytes)
    }
}

pub(crate) fn minify_js(source: &str) -> Result<String, StepError> {
    let allocator = Allocator::default();
    let source_type = SourceType::script();
    let parsed = Parser::new(&allocator, source, source_type).parse();
    if let Some(err) = parsed.errors.first() {
        return Err(StepError::new(format!("syntax error: {err}")));
    }

    let mut program = parsed.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let minified = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program)
        .code;
    Ok(code)
}
