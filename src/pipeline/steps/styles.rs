// src/pipeline/steps/styles.rs

//! Stylesheet steps, in their required order:
//! `import` → `utilities` → `system-ui` → `minify` → `purge`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;
use regex::{Captures, NoExpand, Regex};

use crate::pipeline::step::{PipelineStep, PurgeManifest, StepContext, StepError, utf8};

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?["']([^"']+)["']\s*\)?\s*([^;]*);"#).expect("valid regex")
});
static UTILITIES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@utilities\s*;").expect("valid regex"));
static APPLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@apply\s+([^;{}]+);?").expect("valid regex"));
static SYSTEM_UI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(font-family\s*:[^;{}]*?)\bsystem-ui\b").expect("valid regex")
});
static SELECTOR_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.#]((?:\\.|[A-Za-z0-9_-])+)").expect("valid regex"));
static ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));

const SYSTEM_FONT_STACK: &str =
    r#"system-ui,-apple-system,"Segoe UI",Roboto,"Helvetica Neue",Arial,sans-serif"#;

/// `import`: inline local `@import` statements, recursively.
pub struct ImportStep;

impl PipelineStep for ImportStep {
    fn name(&self) -> &'static str {
        "import"
    }

    fn apply(&self, content: Vec<u8>, file: &Path, _ctx: &StepContext) -> Result<Vec<u8>, StepError> {
        let text = utf8(content)?;
        let mut stack = vec![file.to_path_buf()];
        inline_imports(&text, file, &mut stack).map(String::into_bytes)
    }
}

fn inline_imports(text: &str, file: &Path, stack: &mut Vec<PathBuf>) -> Result<String, StepError> {
    let base = file.parent().unwrap_or(Path::new(""));
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in IMPORT_RE.captures_iter(text) {
        let whole = caps.get(0).expect("group 0 always matches");
        let target = &caps[1];
        let media = caps[2].trim();

        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        // Remote and media-scoped imports stay as they are.
        if is_remote(target) || !media.is_empty() {
            out.push_str(whole.as_str());
            continue;
        }

        let path = base.join(target);
        if stack.contains(&path) {
            return Err(StepError::new(format!(
                "import cycle: {} imports {} again",
                file.display(),
                path.display()
            )));
        }

        let imported = fs::read_to_string(&path).map_err(|e| {
            StepError::new(format!("cannot resolve @import '{target}' ({}): {e}", path.display()))
        })?;

        stack.push(path.clone());
        let expanded = inline_imports(&imported, &path, stack)?;
        stack.pop();

        out.push_str(expanded.trim_end());
        out.push('\n');
    }

    out.push_str(&text[last..]);
    Ok(out)
}

fn is_remote(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://") || target.starts_with("//")
}

/// `utilities`: expand `@utilities;` and `@apply` from the utilities table.
pub struct UtilitiesStep;

impl PipelineStep for UtilitiesStep {
    fn name(&self) -> &'static str {
        "utilities"
    }

    fn apply(&self, content: Vec<u8>, _file: &Path, ctx: &StepContext) -> Result<Vec<u8>, StepError> {
        let text = utf8(content)?;

        let generated = ctx
            .utilities
            .iter()
            .map(|(name, decls)| format!(".{}{{{}}}", escape_class(name), decls.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        let text = UTILITIES_RE.replace_all(&text, NoExpand(&generated));

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in APPLY_RE.captures_iter(&text) {
            let whole = caps.get(0).expect("group 0 always matches");
            out.push_str(&text[last..whole.start()]);
            last = whole.end();
            out.push_str(&expand_apply(&caps, ctx)?);
        }
        out.push_str(&text[last..]);

        Ok(out.into_bytes())
    }
}

fn expand_apply(caps: &Captures<'_>, ctx: &StepContext) -> Result<String, StepError> {
    let mut decls = Vec::new();
    for name in caps[1].split_whitespace() {
        let block = ctx
            .utilities
            .get(name)
            .ok_or_else(|| StepError::new(format!("@apply references unknown utility '{name}'")))?;
        decls.push(block.trim().trim_end_matches(';').to_string());
    }
    Ok(format!("{};", decls.join(";")))
}

fn escape_class(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, ':' | '/' | '.') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `system-ui`: expand the `system-ui` generic family into a font stack.
pub struct SystemUiStep;

impl PipelineStep for SystemUiStep {
    fn name(&self) -> &'static str {
        "system-ui"
    }

    fn apply(&self, content: Vec<u8>, _file: &Path, _ctx: &StepContext) -> Result<Vec<u8>, StepError> {
        let text = utf8(content)?;
        let out = SYSTEM_UI_RE.replace_all(&text, |caps: &Captures<'_>| {
            format!("{}{}", &caps[1], SYSTEM_FONT_STACK)
        });
        Ok(out.into_owned().into_bytes())
    }
}

/// `minify`: print the sheet through lightningcss with its minifier on.
///
/// Comments and redundant whitespace go, empty rules are dropped and adjacent
/// rules with identical declarations are merged.
pub struct MinifyStep;

impl PipelineStep for MinifyStep {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn apply(&self, content: Vec<u8>, _file: &Path, _ctx: &StepContext) -> Result<Vec<u8>, StepError> {
        let text = utf8(content)?;
        let mut sheet = parse_sheet(&text)?;
        sheet
            .minify(MinifyOptions::default())
            .map_err(|e| StepError::new(format!("minifying stylesheet: {e}")))?;
        print_compact(&sheet).map(String::into_bytes)
    }
}

fn parse_sheet(text: &str) -> Result<StyleSheet<'_>, StepError> {
    StyleSheet::parse(text, ParserOptions::default())
        .map_err(|e| StepError::new(format!("parsing stylesheet: {e}")))
}

fn print_compact(sheet: &StyleSheet<'_>) -> Result<String, StepError> {
    sheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map(|out| out.code)
        .map_err(|e| StepError::new(format!("printing stylesheet: {e}")))
}

/// `purge`: drop rules whose selectors are not referenced by any file in the
/// purge manifest. A no-op when the manifest is empty; otherwise the sheet is
/// printed compactly.
pub struct PurgeStep;

impl PipelineStep for PurgeStep {
    fn name(&self) -> &'static str {
        "purge"
    }

    fn apply(&self, content: Vec<u8>, _file: &Path, ctx: &StepContext) -> Result<Vec<u8>, StepError> {
        if ctx.purge.is_empty() {
            return Ok(content);
        }
        let text = utf8(content)?;
        let mut sheet = parse_sheet(&text)?;
        purge_rules(&mut sheet.rules, &ctx.purge)?;
        print_compact(&sheet).map(String::into_bytes)
    }
}

/// Style rules survive when any selector in their list is used. Rules inside
/// `@media` are purged the same way and an emptied block goes with them;
/// every other at-rule is kept.
fn purge_rules(rules: &mut CssRuleList<'_>, manifest: &PurgeManifest) -> Result<(), StepError> {
    let mut kept = Vec::with_capacity(rules.0.len());
    for mut rule in rules.0.drain(..) {
        let keep = match &mut rule {
            CssRule::Style(style) => {
                let mut used = false;
                for selector in style.selectors.0.iter() {
                    let text = selector
                        .to_css_string(PrinterOptions::default())
                        .map_err(|e| StepError::new(format!("printing selector: {e}")))?;
                    if selector_is_used(&text, manifest) {
                        used = true;
                        break;
                    }
                }
                used
            }
            CssRule::Media(media) => {
                purge_rules(&mut media.rules, manifest)?;
                !media.rules.0.is_empty()
            }
            _ => true,
        };
        if keep {
            kept.push(rule);
        }
    }
    rules.0 = kept;
    Ok(())
}

/// A selector is used when every class and id it names appears in the
/// manifest. Selectors without classes or ids are always used.
fn selector_is_used(selector: &str, manifest: &PurgeManifest) -> bool {
    let without_attributes = ATTRIBUTE_RE.replace_all(selector, "");
    SELECTOR_NAME_RE
        .captures_iter(&without_attributes)
        .all(|caps| manifest.contains(&caps[1].replace('\\', "")))
}
