// src/pipeline/steps/markup.rs

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::scripts::minify_js;
use crate::pipeline::step::{PipelineStep, StepContext, StepError, utf8};

/// `html-minify`: check tag balance, minify inline scripts with `js-minify`
/// and hand the document to `minify-html`.
///
/// A closing tag with no matching open tag, or a non-void element left open
/// at the end of the document, fails the step. Elements whose end tag is
/// optional in HTML (`<p>`, `<li>`, `<td>`, ...) may be left open.
pub struct HtmlMinifyStep;

impl PipelineStep for HtmlMinifyStep {
    fn name(&self) -> &'static str {
        "html-minify"
    }

    fn apply(&self, content: Vec<u8>, _file: &Path, _ctx: &StepContext) -> Result<Vec<u8>, StepError> {
        let text = utf8(content)?;
        minify_html(&text).map(String::into_bytes)
    }
}

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const OPTIONAL_END: &[&str] = &[
    "p", "li", "dt", "dd", "option", "optgroup", "tr", "td", "th", "thead", "tbody", "tfoot",
    "colgroup", "rp", "rt", "html", "head", "body",
];

/// Elements whose content is not markup.
const RAW_TEXT: &[&str] = &["script", "style", "textarea", "title"];

const JS_TYPES: &[&str] = &["text/javascript", "application/javascript", "module"];

static TYPE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\btype\s*=\s*["']?([^"'\s>]+)"#).expect("valid regex")
});

pub(crate) fn minify_html(src: &str) -> Result<String, StepError> {
    let scripts = check_tags(src)?;

    let mut prepared = String::with_capacity(src.len());
    let mut last = 0;
    for body in scripts {
        prepared.push_str(&src[last..body.start]);
        prepared.push_str(&minify_js(&src[body.clone()])?);
        last = body.end;
    }
    prepared.push_str(&src[last..]);

    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = false;
    cfg.remove_bangs = false;
    cfg.remove_processing_instructions = true;
    let out = minify_html::minify(prepared.as_bytes(), &cfg);

    String::from_utf8(out).map_err(|e| StepError::new(format!("minified output is not UTF-8: {e}")))
}

struct OpenTag {
    name: String,
    line: usize,
}

/// Walk the document checking that every element is closed in order.
///
/// Returns the byte ranges of inline JavaScript bodies.
fn check_tags(src: &str) -> Result<Vec<Range<usize>>, StepError> {
    let lower = src.to_ascii_lowercase();
    let bytes = src.as_bytes();
    let line_at = |idx: usize| src[..idx].matches('\n').count() + 1;
    let unterminated = |idx: usize| StepError::new(format!("unterminated tag on line {}", line_at(idx)));

    let mut stack: Vec<OpenTag> = Vec::new();
    let mut scripts = Vec::new();
    let mut i = 0;

    while let Some(rel) = src[i..].find('<') {
        i += rel;

        if src[i..].starts_with("<!--") {
            let Some(rel) = src[i + 4..].find("-->") else {
                return Err(StepError::new(format!(
                    "unterminated comment starting on line {}",
                    line_at(i)
                )));
            };
            i += 4 + rel + 3;
            continue;
        }

        if src[i..].starts_with("<!") || src[i..].starts_with("<?") {
            i = tag_end(bytes, i).ok_or_else(|| unterminated(i))? + 1;
            continue;
        }

        if src[i..].starts_with("</") {
            let end = tag_end(bytes, i).ok_or_else(|| unterminated(i))?;
            close_tag(&mut stack, &tag_name(&lower[i + 2..end]), line_at(i))?;
            i = end + 1;
            continue;
        }

        if !bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            // A stray '<' is plain text.
            i += 1;
            continue;
        }

        let end = tag_end(bytes, i).ok_or_else(|| unterminated(i))?;
        let name = tag_name(&lower[i + 1..end]);
        let inner = &src[i + 1..end];
        let line = line_at(i);
        i = end + 1;

        if inner.trim_end().ends_with('/') || VOID.contains(&name.as_str()) {
            continue;
        }

        if RAW_TEXT.contains(&name.as_str()) {
            let Some(rel) = lower[i..].find(&format!("</{name}")) else {
                return Err(StepError::new(format!("unclosed <{name}> opened on line {line}")));
            };
            if name == "script" && is_js(inner) {
                scripts.push(i..i + rel);
            }
            let close = i + rel;
            i = tag_end(bytes, close).ok_or_else(|| unterminated(close))? + 1;
            continue;
        }

        stack.push(OpenTag { name, line });
    }

    if let Some(open) = stack.iter().find(|t| !OPTIONAL_END.contains(&t.name.as_str())) {
        return Err(StepError::new(format!(
            "unclosed <{}> opened on line {}",
            open.name, open.line
        )));
    }

    Ok(scripts)
}

fn close_tag(stack: &mut Vec<OpenTag>, name: &str, line: usize) -> Result<(), StepError> {
    if !stack.iter().any(|t| t.name == name) {
        return Err(StepError::new(format!(
            "closing tag </{name}> on line {line} has no matching open tag"
        )));
    }
    while let Some(top) = stack.pop() {
        if top.name == name {
            return Ok(());
        }
        if !OPTIONAL_END.contains(&top.name.as_str()) {
            return Err(StepError::new(format!(
                "closing tag </{name}> on line {line} while <{}> from line {} is still open",
                top.name, top.line
            )));
        }
    }
    Ok(())
}

/// Index of the `>` closing the tag that starts at `start`, skipping quoted
/// attribute values.
fn tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (idx, &b) in bytes.iter().enumerate().skip(start + 1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(idx),
            None => {}
        }
    }
    None
}

fn tag_name(after_bracket: &str) -> String {
    after_bracket
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}

fn is_js(tag_inner: &str) -> bool {
    match TYPE_ATTR.captures(tag_inner) {
        Some(caps) => JS_TYPES.contains(&caps[1].to_ascii_lowercase().as_str()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_comments_and_layout_whitespace() {
        let src = "<!DOCTYPE html>\n<html>\n  <head>\n    <!-- comment -->\n    <title>Hello</title>\n  </head>\n  <body>\n    <p>One\n    <p>Two</p>\n    <br>\n  </body>\n</html>\n";
        let out = minify_html(src).unwrap();
        assert!(!out.contains("comment"), "{out}");
        assert!(!out.contains('\n'), "{out}");
        assert!(out.contains("<title>Hello</title>"), "{out}");
        assert!(out.contains("Two</p>"), "{out}");
    }

    #[test]
    fn whitespace_between_inline_elements_becomes_one_space() {
        assert_eq!(
            minify_html("<p><b>Hello</b>\n<i>world</i></p>").unwrap(),
            "<p><b>Hello</b> <i>world</i></p>"
        );
        assert_eq!(
            minify_html("<p><b>bold</b> <i>italic</i></p>").unwrap(),
            "<p><b>bold</b> <i>italic</i></p>"
        );
    }

    #[test]
    fn inline_scripts_go_through_js_minify() {
        let src = "<div></div><script>\n  // hi\n  var answer = 42;\n</script><script type=\"application/ld+json\">{ \"a\": 1 }</script>";
        let out = minify_html(src).unwrap();
        assert!(!out.contains("// hi"), "{out}");
        assert!(out.contains("answer"), "{out}");
        assert!(out.contains("{ \"a\": 1 }"), "{out}");
    }

    #[test]
    fn pre_content_is_kept() {
        let out = minify_html("<pre>  keep\n   this </pre>").unwrap();
        assert!(out.contains("  keep\n   this "), "{out}");
    }

    #[test]
    fn mismatched_closing_tag_is_rejected() {
        let err = minify_html("<div><span></div>").unwrap_err();
        assert!(err.0.contains("</div>"), "{err}");
        assert!(err.0.contains("<span>"), "{err}");
    }

    #[test]
    fn stray_closing_tag_is_rejected() {
        let err = minify_html("<div></div>\n</section>").unwrap_err();
        assert!(err.0.contains("line 2"), "{err}");
    }

    #[test]
    fn unclosed_element_is_rejected() {
        let err = minify_html("<main>\n<div>text</div>").unwrap_err();
        assert!(err.0.contains("<main>"), "{err}");
    }

    #[test]
    fn unterminated_comment_is_rejected() {
        assert!(minify_html("<p>x</p><!-- open").is_err());
    }

    #[test]
    fn optional_end_tags_may_stay_open() {
        assert!(check_tags("<ul><li>one<li>two</ul>").unwrap().is_empty());
    }
}
