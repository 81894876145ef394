// tests/config_loading.rs

use std::path::PathBuf;

use assetpipe::config::{load_and_validate, load_from_path};
use assetpipe::errors::BuildError;
use assetpipe::pipeline::StepRegistry;
use assetpipe_test_utils::builders::ProjectFixture;

#[test]
fn empty_file_uses_defaults_rooted_at_config_dir() {
    let fx = ProjectFixture::new();
    let path = fx.write_config("");

    let cfg = load_and_validate(&path, &StepRegistry::with_builtin_steps()).unwrap();
    assert_eq!(cfg.root, fx.root());
    assert_eq!(cfg.src.css, PathBuf::from("src/css"));
    assert_eq!(cfg.dist.js, PathBuf::from("dist/js"));
    assert_eq!(cfg.styles.entries, vec!["style.css"]);
    assert_eq!(cfg.serve.port, 3000);
    assert_eq!(cfg.serve.reload_on, vec!["markup-copy"]);
    assert!(cfg.config.utilities.is_none());
}

#[test]
fn full_file_is_read() {
    let fx = ProjectFixture::new();
    let path = fx.write_config(
        r#"
[src]
base = "site"
css = "site/styles"

[dist]
base = "public"

[styles]
entries = ["main.css", "print.css"]
pipeline = ["import", "minify"]

[config]
utilities = "utilities.toml"

[purge]
content = ["site/**/*.html"]

[serve]
port = 8080
reload_on = ["markup-copy", "styles"]
debounce_ms = 10
"#,
    );

    let cfg = load_and_validate(&path, &StepRegistry::with_builtin_steps()).unwrap();
    assert_eq!(cfg.src.base, PathBuf::from("site"));
    assert_eq!(cfg.src.css, PathBuf::from("site/styles"));
    // Unset keys keep their defaults.
    assert_eq!(cfg.src.js, PathBuf::from("src/js"));
    assert_eq!(cfg.dist.base, PathBuf::from("public"));
    assert_eq!(cfg.styles.pipeline, vec!["import", "minify"]);
    assert_eq!(cfg.utilities_path(), Some(fx.path("utilities.toml")));
    assert_eq!(cfg.purge.content, vec!["site/**/*.html"]);
    assert_eq!(cfg.serve.port, 8080);
    assert_eq!(cfg.serve.debounce_ms, 10);
}

#[test]
fn unknown_step_is_a_config_error() {
    let fx = ProjectFixture::new();
    let path = fx.write_config("[styles]\npipeline = [\"import\", \"autoprefix\"]\n");

    match load_and_validate(&path, &StepRegistry::with_builtin_steps()) {
        Err(BuildError::Config(msg)) => {
            assert!(msg.contains("autoprefix"), "{msg}");
            assert!(msg.contains("styles.pipeline"), "{msg}");
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn empty_required_path_is_a_config_error() {
    let fx = ProjectFixture::new();
    let path = fx.write_config("[dist]\ncss = \"\"\n");

    match load_and_validate(&path, &StepRegistry::with_builtin_steps()) {
        Err(BuildError::Config(msg)) => assert!(msg.contains("dist.css"), "{msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn reload_on_must_name_a_watched_task() {
    let fx = ProjectFixture::new();
    let path = fx.write_config("[serve]\nreload_on = [\"images-optimize\"]\n");

    assert!(matches!(
        load_and_validate(&path, &StepRegistry::with_builtin_steps()),
        Err(BuildError::Config(_))
    ));
}

#[test]
fn invalid_toml_and_missing_file() {
    let fx = ProjectFixture::new();
    let path = fx.write_config("[serve\nport = 1");
    assert!(matches!(load_from_path(&path), Err(BuildError::Config(_))));

    assert!(matches!(
        load_from_path(fx.path("nope.toml")),
        Err(BuildError::Io { .. })
    ));
}
