// tests/external_tools.rs
#![cfg(unix)]

mod common;
use crate::common::builders::SettingsBuilder;
use crate::common::{init_tracing, with_timeout, write_file};

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use distflow::config::RunConfiguration;
use distflow::errors::DistflowError;
use distflow::orchestrator::{LeafOutcome, Orchestrator};
use distflow::pipeline;

type TestResult = Result<(), Box<dyn Error>>;

const BROKEN_SASS: &str = r#"#!/bin/sh
echo 'Error: expected "{".' >&2
echo '  src/scss/app.scss 3:13  root stylesheet' >&2
exit 65
"#;

// Writes `<outfile>` and, when asked for one, `<outfile>.map`.
const FAKE_ESBUILD: &str = r#"#!/bin/sh
out=""
map=0
min=0
for arg in "$@"; do
  case "$arg" in
    --outfile=*) out="${arg#--outfile=}" ;;
    --sourcemap) map=1 ;;
    --minify) min=1 ;;
  esac
done
if [ "$min" = 1 ]; then
  printf 'console.log(1)' > "$out"
else
  printf 'console.log( 1 );\n//# sourceMappingURL=app.js.map\n' > "$out"
fi
if [ "$map" = 1 ]; then
  printf '{"version":3}' > "$out.map"
fi
"#;

fn install_script(root: &Path, name: &str, body: &str) -> PathBuf {
    let path = root.join("bin").join(name);
    write_file(root, &format!("bin/{name}"), body.as_bytes());
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn seed_with_broken_styles(root: &Path) -> SettingsBuilder {
    write_file(root, "fonts/a.ttf", b"font");
    write_file(root, "vendor/lib.js", b"lib");
    write_file(root, "src/scss/app.scss", b".foo bar baz");
    let sass = install_script(root, "sass", BROKEN_SASS);

    SettingsBuilder::new(root)
        .font("fonts/*")
        .prebuilt_script("vendor/*.js")
        .sass_entry("src/scss/*.scss")
        .sass_tool(sass.to_str().unwrap())
}

fn orchestrator(config: RunConfiguration) -> Orchestrator {
    Orchestrator::new(pipeline::default_graph().unwrap(), config)
}

#[tokio::test]
async fn style_failure_fails_build_but_siblings_complete() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    let config = seed_with_broken_styles(tmp.path()).build();

    let report = with_timeout(orchestrator(config).execute("build")).await?;

    assert!(!report.is_success());
    match report.outcome_of("styles") {
        Some(LeafOutcome::Failed(msg)) => {
            assert!(msg.contains("src/scss/app.scss:3"), "message was: {msg}");
            assert!(msg.contains("expected"), "message was: {msg}");
        }
        other => panic!("expected styles to fail, got {other:?}"),
    }
    assert_eq!(report.outcome_of("fonts"), Some(&LeafOutcome::Succeeded));
    assert_eq!(report.outcome_of("scripts:copy"), Some(&LeafOutcome::Succeeded));
    assert!(tmp.path().join("dist/fonts/a.ttf").is_file());
    assert!(tmp.path().join("dist/js/lib.js").is_file());

    match report.error {
        Some(DistflowError::CompositeFailure { failed, .. }) => {
            assert_eq!(failed, vec!["styles".to_string()]);
        }
        other => panic!("expected a parallel failure, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn tolerated_style_failure_keeps_build_green() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    let config = seed_with_broken_styles(tmp.path())
        .halt_on_error("styles", false)
        .build();

    let report = with_timeout(orchestrator(config).run("build")).await?;

    assert!(matches!(
        report.outcome_of("styles"),
        Some(LeafOutcome::Tolerated(_))
    ));
    assert!(tmp.path().join("dist/fonts/a.ttf").is_file());
    Ok(())
}

#[tokio::test]
async fn style_failure_in_cleanbuild_after_clean_ran() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    write_file(tmp.path(), "dist/stale.css", b"old");
    let config = seed_with_broken_styles(tmp.path()).build();

    let err = with_timeout(orchestrator(config).run(pipeline::DEFAULT_TASK))
        .await
        .unwrap_err();

    assert!(matches!(err, DistflowError::CompositeFailure { .. }));
    assert!(!tmp.path().join("dist/stale.css").exists());
    Ok(())
}

fn seed_scripts(root: &Path) -> SettingsBuilder {
    write_file(root, "src/js/app.js", b"import './dep.js'; console.log(1);");
    write_file(root, "src/js/dep.js", b"export {};");
    let esbuild = install_script(root, "esbuild", FAKE_ESBUILD);

    SettingsBuilder::new(root)
        .script_entry("src/js/app.js")
        .esbuild_tool(esbuild.to_str().unwrap())
}

#[tokio::test]
async fn development_bundle_ships_a_source_map() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    let config = seed_scripts(tmp.path()).build();

    with_timeout(orchestrator(config).run("scripts:bundle")).await?;

    assert!(tmp.path().join("dist/js/app.js").is_file());
    assert!(tmp.path().join("dist/js/app.js.map").is_file());
    assert!(!tmp.path().join("dist/js/dep.js").exists());
    Ok(())
}

#[tokio::test]
async fn production_bundle_is_minified_without_map() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    let config = seed_scripts(tmp.path()).production().build();

    with_timeout(orchestrator(config).run("scripts:bundle")).await?;

    let bundle = fs::read_to_string(tmp.path().join("dist/js/app.js"))?;
    assert_eq!(bundle, "console.log(1)");
    assert!(!tmp.path().join("dist/js/app.js.map").exists());
    Ok(())
}

#[tokio::test]
async fn missing_tool_fails_the_step() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    write_file(tmp.path(), "src/scss/app.scss", b"a {}");
    let config = SettingsBuilder::new(tmp.path())
        .sass_entry("src/scss/app.scss")
        .sass_tool("distflow-missing-sass")
        .build();

    let err = with_timeout(orchestrator(config).run("styles"))
        .await
        .unwrap_err();

    match err {
        DistflowError::LeafTask { task, message } => {
            assert_eq!(task, "styles");
            assert!(message.contains("not found"), "message was: {message}");
        }
        other => panic!("expected a leaf failure, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn every_stylesheet_is_attempted_when_the_tool_is_missing() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    write_file(tmp.path(), "src/scss/app.scss", b"a {}");
    write_file(tmp.path(), "src/scss/print.scss", b"b {}");
    let config = SettingsBuilder::new(tmp.path())
        .sass_entry("src/scss/*.scss")
        .sass_tool("distflow-missing-sass")
        .build();

    let err = with_timeout(orchestrator(config).run("styles"))
        .await
        .unwrap_err();

    match err {
        DistflowError::LeafTask { message, .. } => {
            assert!(message.contains("2 of 2"), "message was: {message}");
            assert!(message.contains("app.scss"), "message was: {message}");
            assert!(message.contains("print.scss"), "message was: {message}");
        }
        other => panic!("expected a leaf failure, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn script_entries_with_the_same_stem_fail_before_bundling() -> TestResult {
    init_tracing();
    let tmp = TempDir::new()?;
    write_file(tmp.path(), "src/a/index.js", b"A");
    write_file(tmp.path(), "src/b/index.js", b"B");
    let esbuild = install_script(tmp.path(), "esbuild", FAKE_ESBUILD);
    let config = SettingsBuilder::new(tmp.path())
        .script_entry("src/*/index.js")
        .esbuild_tool(esbuild.to_str().unwrap())
        .build();

    let err = with_timeout(orchestrator(config).run("scripts:bundle"))
        .await
        .unwrap_err();

    match err {
        DistflowError::LeafTask { message, .. } => {
            assert!(message.contains("conflicting script entries"), "message was: {message}");
        }
        other => panic!("expected a leaf failure, got {other:?}"),
    }
    assert!(!tmp.path().join("dist/js/index.js").exists());
    Ok(())
}
