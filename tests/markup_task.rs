// tests/markup_task.rs

use std::sync::Arc;

use assetpipe::asset::{AssetTask, FileStatus};
use assetpipe::dag::TaskAction;
use assetpipe::pipeline::StepRegistry;
use assetpipe::tasks::{self, standard_graph};
use assetpipe_test_utils::builders::ProjectFixture;
use assetpipe_test_utils::init_tracing;

const PAGE: &str = "<html>\n  <body>\n    <!-- nav -->\n    <h1>Hi</h1>\n  </body>\n</html>\n";

fn asset_task(fx: &ProjectFixture, name: &str) -> Arc<AssetTask> {
    let graph = standard_graph(&fx.config(), &StepRegistry::with_builtin_steps()).unwrap();
    match &graph.task(name).unwrap().action {
        TaskAction::Asset(task) => Arc::clone(task),
        other => panic!("{name} is not an asset task: {other:?}"),
    }
}

#[tokio::test]
async fn copy_publishes_html_verbatim() {
    init_tracing();
    let fx = ProjectFixture::new()
        .with_file("src/index.html", PAGE)
        .with_file("src/blog/post.html", PAGE)
        .with_file("src/css/style.css", ".a{}");

    let report = asset_task(&fx, tasks::MARKUP_COPY).run(false).await;
    assert!(report.is_ok());
    assert_eq!(report.written(), 2);
    assert_eq!(fx.read("dist/index.html"), PAGE);
    assert_eq!(fx.read("dist/blog/post.html"), PAGE);
    assert!(!fx.exists("dist/css/style.css"));
}

#[tokio::test]
async fn minify_writes_to_the_same_tree() {
    init_tracing();
    let fx = ProjectFixture::new().with_file("src/index.html", PAGE);

    let report = asset_task(&fx, tasks::MARKUP_MINIFY).run(false).await;
    assert!(report.is_ok(), "{:?}", report.files);
    let html = fx.read("dist/index.html");
    assert!(html.contains("<h1>Hi</h1>"), "{html}");
    assert!(!html.contains("nav"), "{html}");
    assert!(!html.contains('\n'), "{html}");
}

#[tokio::test]
async fn unbalanced_file_fails_while_siblings_are_written() {
    init_tracing();
    let fx = ProjectFixture::new()
        .with_file("src/a.html", "<div><p>ok</p></div>")
        .with_file("src/broken.html", "<div>\n<span>text</div>\n")
        .with_file("src/z.html", "<ul><li>one<li>two</ul>");

    let report = asset_task(&fx, tasks::MARKUP_MINIFY).run(false).await;
    assert!(!report.is_ok());
    assert_eq!(report.failed(), 1);
    assert_eq!(report.written(), 2);

    let broken = report.file(&fx.path("src/broken.html")).unwrap();
    assert_eq!(broken.status, FileStatus::Failed);
    let line = broken.failure_line().unwrap();
    assert!(line.contains("html-minify"), "{line}");
    assert!(line.contains("broken.html"), "{line}");

    assert!(fx.exists("dist/a.html"));
    assert!(fx.exists("dist/z.html"));
    assert!(!fx.exists("dist/broken.html"));
}

#[tokio::test]
async fn failed_file_is_retried_on_next_run() {
    init_tracing();
    let fx = ProjectFixture::new().with_file("src/page.html", "<div>");
    let task = asset_task(&fx, tasks::MARKUP_MINIFY);

    assert_eq!(task.run(false).await.failed(), 1);

    fx.write("src/page.html", "<div></div>");
    let report = task.run(false).await;
    assert!(report.is_ok());
    assert_eq!(fx.read("dist/page.html"), "<div></div>");
}
