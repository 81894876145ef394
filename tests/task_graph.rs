// tests/task_graph.rs

use std::path::Path;
use std::sync::Arc;

use assetpipe::asset::{AssetRule, AssetTask, Route};
use assetpipe::dag::{TaskAction, TaskGraph};
use assetpipe::errors::BuildError;
use assetpipe::pipeline::{Pipeline, StepRegistry};
use assetpipe::tasks::{self, standard_graph};
use assetpipe_test_utils::builders::ProjectFixture;
use assetpipe_test_utils::{init_tracing, with_timeout};

/// Copy `*.txt` from `from` to `to`.
fn copy_task(name: &str, from: &Path, to: &Path) -> TaskAction {
    let route = Route::new(
        vec!["**/*.txt".to_string()],
        AssetRule::new(from, to),
        Pipeline::default(),
    )
    .unwrap();
    TaskAction::Asset(Arc::new(AssetTask::new(name, from).with_route(route)))
}

#[tokio::test]
async fn cycle_is_rejected_before_any_task_runs() {
    init_tracing();
    let fx = ProjectFixture::new().with_file("in/a.txt", "a");

    let mut graph = TaskGraph::new();
    graph
        .add_task("A", ["B"], copy_task("A", &fx.path("in"), &fx.path("out-a")))
        .unwrap();
    graph
        .add_task("B", ["A"], copy_task("B", &fx.path("in"), &fx.path("out-b")))
        .unwrap();

    match graph.validate() {
        Err(BuildError::Config(msg)) => assert!(msg.contains("cycle"), "{msg}"),
        other => panic!("expected config error, got {other:?}"),
    }

    let err = with_timeout(graph.run("A", false)).await.unwrap_err();
    assert!(matches!(err, BuildError::Config(_)), "{err:?}");
    assert!(!fx.exists("out-a"));
    assert!(!fx.exists("out-b"));
}

#[tokio::test]
async fn dependencies_finish_before_dependents_start() {
    init_tracing();
    let fx = ProjectFixture::new().with_file("in/note.txt", "hello");

    // `publish` reads what `stage` writes.
    let mut graph = TaskGraph::new();
    graph
        .add_task("stage", Vec::<&str>::new(), copy_task("stage", &fx.path("in"), &fx.path("mid")))
        .unwrap();
    graph
        .add_task("publish", ["stage"], copy_task("publish", &fx.path("mid"), &fx.path("out")))
        .unwrap();
    graph.validate().unwrap();

    let report = with_timeout(graph.run("publish", false)).await.unwrap();
    assert!(report.is_ok());
    assert_eq!(report.report("stage").unwrap().written(), 1);
    assert_eq!(report.report("publish").unwrap().written(), 1);
    assert_eq!(fx.read("out/note.txt"), "hello");
}

#[tokio::test]
async fn failure_names_the_chain_and_keeps_sibling_output() {
    init_tracing();
    let fx = ProjectFixture::new()
        .with_file("src/css/style.css", ".btn { @apply missing; }")
        .with_file("src/js/app.js", "let a = 1;\n")
        .with_file("src/index.html", "<p>hi</p>");
    let graph = standard_graph(&fx.config(), &StepRegistry::with_builtin_steps()).unwrap();

    let err = with_timeout(graph.run(tasks::DEFAULT, false)).await.unwrap_err();
    match err {
        BuildError::TaskFailed {
            task,
            chain,
            failures,
        } => {
            assert_eq!(task, tasks::STYLES);
            assert_eq!(chain, "default -> serve -> styles");
            assert_eq!(failures, 1);
        }
        other => panic!("expected task failure, got {other:?}"),
    }

    // Independent tasks in the same level still ran.
    assert!(fx.exists("dist/js/app.min.js"));
    assert!(fx.exists("dist/index.html"));
    assert!(!fx.exists("dist/css/style.css"));
}

#[tokio::test]
async fn standard_default_builds_everything_serve_needs() {
    init_tracing();
    let fx = ProjectFixture::new()
        .with_file("src/css/style.css", "body { color: red }")
        .with_file("src/js/app.js", "let a = 1;\n")
        .with_file("src/index.html", "<p>hi</p>")
        .with_file("src/images/logo.svg", "<svg></svg>");
    let graph = standard_graph(&fx.config(), &StepRegistry::with_builtin_steps()).unwrap();

    assert!(graph.requires_server(tasks::DEFAULT).unwrap());
    assert!(!graph.requires_server(tasks::STYLES).unwrap());

    let report = with_timeout(graph.run(tasks::DEFAULT, false)).await.unwrap();
    assert!(report.is_ok());
    assert_eq!(fx.read("dist/css/style.css"), "body{color:red}");
    assert!(fx.exists("dist/index.html"));
    // images-optimize is not part of the serve chain.
    assert!(!fx.exists("dist/images/logo.svg"));
}

#[test]
fn unknown_task_is_a_config_error() {
    let fx = ProjectFixture::new();
    let graph = standard_graph(&fx.config(), &StepRegistry::with_builtin_steps()).unwrap();
    assert!(matches!(graph.resolve("deploy"), Err(BuildError::Config(_))));
}

const PAGE: &str = "<div>\n  <!-- draft -->\n  <p>hi</p>\n</div>\n";

fn task_names(report: &assetpipe::dag::GraphReport) -> Vec<&str> {
    report.reports.iter().map(|r| r.task.as_str()).collect()
}

#[tokio::test]
async fn requested_tasks_run_in_command_line_order() {
    init_tracing();
    let fx = ProjectFixture::new().with_file("src/index.html", PAGE);
    let graph = standard_graph(&fx.config(), &StepRegistry::with_builtin_steps()).unwrap();

    let report = with_timeout(graph.run_many(&[tasks::MARKUP_COPY, tasks::MARKUP_MINIFY], true))
        .await
        .unwrap();
    assert_eq!(task_names(&report), vec![tasks::MARKUP_COPY, tasks::MARKUP_MINIFY]);
    assert!(!fx.read("dist/index.html").contains("draft"));

    let report = with_timeout(graph.run_many(&[tasks::MARKUP_MINIFY, tasks::MARKUP_COPY], true))
        .await
        .unwrap();
    assert_eq!(task_names(&report), vec![tasks::MARKUP_MINIFY, tasks::MARKUP_COPY]);
    assert_eq!(fx.read("dist/index.html"), PAGE);
}

#[tokio::test]
async fn shared_dependency_runs_once_across_requests() {
    init_tracing();
    let fx = ProjectFixture::new()
        .with_file("src/css/style.css", "body { color: red }")
        .with_file("src/index.html", "<p>hi</p>");
    let graph = standard_graph(&fx.config(), &StepRegistry::with_builtin_steps()).unwrap();

    let report = with_timeout(graph.run_many(&[tasks::STYLES, tasks::SERVE], false))
        .await
        .unwrap();
    let styles_runs = report.reports.iter().filter(|r| r.task == tasks::STYLES).count();
    assert_eq!(styles_runs, 1);
    assert!(report.report(tasks::MARKUP_COPY).is_some());
}

#[tokio::test]
async fn tasks_sharing_a_destination_never_overlap() {
    init_tracing();
    let fx = ProjectFixture::new().with_file("src/index.html", PAGE);
    let standard = standard_graph(&fx.config(), &StepRegistry::with_builtin_steps()).unwrap();
    let action = |name: &str| standard.task(name).unwrap().action.clone();

    // Both markup tasks land in the same level of `publish`.
    let mut graph = TaskGraph::new();
    graph
        .add_task(tasks::MARKUP_MINIFY, Vec::<&str>::new(), action(tasks::MARKUP_MINIFY))
        .unwrap();
    graph
        .add_task(tasks::MARKUP_COPY, Vec::<&str>::new(), action(tasks::MARKUP_COPY))
        .unwrap();
    graph
        .add_task("publish", [tasks::MARKUP_COPY, tasks::MARKUP_MINIFY], TaskAction::Alias)
        .unwrap();
    assert_eq!(
        graph.resolve("publish").unwrap().levels[0],
        vec![tasks::MARKUP_COPY.to_string(), tasks::MARKUP_MINIFY.to_string()]
    );

    for _ in 0..5 {
        let report = with_timeout(graph.run("publish", true)).await.unwrap();
        assert_eq!(task_names(&report), vec![tasks::MARKUP_COPY, tasks::MARKUP_MINIFY]);
        assert!(!fx.read("dist/index.html").contains("draft"));
    }
}
