// tests/styles_pipeline.rs

use std::path::{Path, PathBuf};

use assetpipe::asset::FileStatus;
use assetpipe::config::BuildConfig;
use assetpipe::dag::TaskAction;
use assetpipe::pipeline::{PurgeManifest, StepContext, StepRegistry};
use assetpipe::tasks::{self, standard_graph};
use assetpipe_test_utils::builders::ProjectFixture;
use assetpipe_test_utils::init_tracing;

fn run_steps(steps: &[&str], input: &str, ctx: &StepContext) -> String {
    let pipeline = StepRegistry::with_builtin_steps().pipeline(steps).unwrap();
    let out = pipeline
        .run(input.as_bytes().to_vec(), Path::new("style.css"), ctx)
        .unwrap();
    String::from_utf8(out).unwrap()
}

fn manifest_ctx(html: &str) -> StepContext {
    StepContext {
        purge: PurgeManifest::from_documents([(PathBuf::from("index.html"), html)]),
        ..StepContext::default()
    }
}

#[test]
fn purge_before_minify_changes_output() {
    init_tracing();
    let ctx = manifest_ctx(r#"<p class="a">"#);
    let input = ".a{color:red}\n.b{color:red}";

    // Minify merges both rules first, so purge keeps the merged rule.
    assert_eq!(run_steps(&["minify", "purge"], input, &ctx), ".a,.b{color:red}");
    assert_eq!(run_steps(&["purge", "minify"], input, &ctx), ".a{color:red}");
}

#[test]
fn empty_manifest_makes_purge_a_no_op() {
    init_tracing();
    let ctx = StepContext::default();
    let input = ".a{color:red}\n.b{color:red}";

    let minify_then_purge = run_steps(&["minify", "purge"], input, &ctx);
    let purge_then_minify = run_steps(&["purge", "minify"], input, &ctx);
    assert_eq!(minify_then_purge, purge_then_minify);
    assert_eq!(run_steps(&["purge"], input, &ctx), input);
}

fn styles_fixture() -> ProjectFixture {
    ProjectFixture::new()
        .with_file(
            "src/css/style.css",
            "@import \"base.css\";\n@utilities;\n.btn { @apply p-4; font-family: system-ui; }\n",
        )
        .with_file("src/css/base.css", "body { margin: 0 }\n")
        .with_file(
            "utilities.toml",
            "[utilities]\n\"p-4\" = \"padding: 1rem\"\n\"hidden\" = \"display: none\"\n",
        )
        .with_file("src/index.html", r#"<div class="btn p-4">hi</div>"#)
}

fn styles_config(fx: &ProjectFixture) -> BuildConfig {
    let mut cfg = fx.config();
    cfg.config.utilities = Some(PathBuf::from("utilities.toml"));
    cfg.purge.content = vec!["src/**/*.html".to_string()];
    cfg
}

fn styles_task(cfg: &BuildConfig) -> std::sync::Arc<assetpipe::asset::AssetTask> {
    let graph = standard_graph(cfg, &StepRegistry::with_builtin_steps()).unwrap();
    match &graph.task(tasks::STYLES).unwrap().action {
        TaskAction::Asset(task) => task.clone(),
        other => panic!("styles is not an asset task: {other:?}"),
    }
}

#[tokio::test]
async fn entry_is_written_then_skipped() {
    init_tracing();
    let fx = styles_fixture();
    let task = styles_task(&styles_config(&fx));
    let entry = fx.path("src/css/style.css");

    let first = task.run(false).await;
    assert!(first.is_ok(), "{:?}", first.files);
    assert_eq!(first.file(&entry).unwrap().status, FileStatus::Written);
    // Partials are only reachable through @import.
    assert_eq!(first.files.len(), 1);
    assert!(!fx.exists("dist/css/base.css"));

    let css = fx.read("dist/css/style.css");
    assert!(css.contains("body{margin:0}"), "{css}");
    assert!(css.contains(".p-4{padding:1rem}"), "{css}");
    assert!(!css.contains("hidden"), "unused utility should be purged: {css}");
    assert!(css.contains("-apple-system"), "{css}");

    let second = task.run(false).await;
    assert_eq!(second.file(&entry).unwrap().status, FileStatus::Skipped);
    assert_eq!(second.written(), 0);
}

#[tokio::test]
async fn utilities_change_rebuilds_styles() {
    init_tracing();
    let fx = styles_fixture();
    let task = styles_task(&styles_config(&fx));

    assert_eq!(task.run(false).await.written(), 1);
    fx.write("utilities.toml", "[utilities]\n\"p-4\" = \"padding: 2rem\"\n");
    fx.touch_ahead("utilities.toml", 5);

    let report = task.run(false).await;
    assert_eq!(report.written(), 1);
    assert!(fx.read("dist/css/style.css").contains(".p-4{padding:2rem}"));
}

#[tokio::test]
async fn force_rebuilds_fresh_files() {
    init_tracing();
    let fx = styles_fixture();
    let task = styles_task(&styles_config(&fx));

    task.run(false).await;
    assert_eq!(task.run(true).await.written(), 1);
}

#[tokio::test]
async fn unknown_utility_fails_with_step_name() {
    init_tracing();
    let fx = ProjectFixture::new().with_file("src/css/style.css", ".btn { @apply nope; }");
    let task = styles_task(&fx.config());

    let report = task.run(false).await;
    assert_eq!(report.failed(), 1);
    let line = report.failures().next().unwrap().failure_line().unwrap();
    assert!(line.contains("step 'utilities' failed"), "{line}");
    assert!(line.contains("nope"), "{line}");
    assert!(!fx.exists("dist/css/style.css"));
}

#[tokio::test]
async fn partial_edit_rebuilds_entry() {
    init_tracing();
    let fx = ProjectFixture::new()
        .with_file("src/css/style.css", "@import \"base.css\";\n")
        .with_file("src/css/base.css", "body { color: red }\n");
    let task = styles_task(&fx.config());
    let entry = fx.path("src/css/style.css");

    assert_eq!(task.run(false).await.written(), 1);
    assert_eq!(fx.read("dist/css/style.css"), "body{color:red}");

    fx.write("src/css/base.css", "body { color: blue }\n");
    fx.touch_ahead("src/css/base.css", 5);

    let report = task.run(false).await;
    assert_eq!(report.file(&entry).unwrap().status, FileStatus::Written);
    let css = fx.read("dist/css/style.css");
    assert!(!css.contains("red"), "{css}");
}
