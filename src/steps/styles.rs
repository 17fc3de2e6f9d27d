// src/steps/styles.rs

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{debug, error, info};

use crate::config::RunConfiguration;
use crate::orchestrator::{LeafFuture, LeafTask};

use super::patterns::{self, MatchedFile};
use super::process::run_tool;

/// Compiles `PATHS.sass_entries` to `<dist>/css` with the `sass` CLI.
///
/// Every entry is attempted; the step fails afterwards if any of them did.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleCompiler;

impl LeafTask for StyleCompiler {
    fn run<'a>(&'a self, config: &'a RunConfiguration) -> LeafFuture<'a> {
        Box::pin(compile_all(config))
    }
}

/// Location of a compile error as reported by the style compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

// `  src/scss/app.scss 3:13  root stylesheet`
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<file>\S(?:.*\S)?)\s+(?P<line>\d+):(?P<col>\d+)(?:\s{2,}.*)?$")
        .expect("static regex")
});

/// Pull the first error message and source location out of `sass` stderr.
pub fn parse_diagnostic(stderr: &str) -> Option<Diagnostic> {
    let message = stderr
        .lines()
        .find_map(|l| l.trim().strip_prefix("Error:"))
        .map(|m| m.trim().to_string())
        .unwrap_or_default();

    stderr.lines().find_map(|line| {
        let caps = LOCATION_RE.captures(line)?;
        let file = caps.name("file")?.as_str();
        // Skip the code-excerpt gutter (`3 │ ...`).
        if file.contains('│') || file.contains('|') {
            return None;
        }
        Some(Diagnostic {
            file: file.to_string(),
            line: caps.name("line")?.as_str().parse().ok()?,
            column: caps.name("col")?.as_str().parse().ok()?,
            message: message.clone(),
        })
    })
}

/// Command-line arguments for compiling `entry` into `output`.
pub fn sass_args(config: &RunConfiguration, entry: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    for lib in &config.paths.sass_libs {
        let mut arg = OsString::from("--load-path=");
        arg.push(config.resolve(lib));
        args.push(arg);
    }

    if config.mode.is_production() {
        args.push("--style=compressed".into());
        args.push("--no-source-map".into());
    } else {
        args.push("--style=expanded".into());
        args.push("--source-map".into());
        args.push("--embed-sources".into());
    }

    args.extend(config.tools.sass_args.iter().map(OsString::from));
    args.push(entry.as_os_str().to_owned());
    args.push(output.as_os_str().to_owned());
    args
}

/// `_partial.scss` files are only ever imported, never compiled directly.
fn is_partial(file: &MatchedFile) -> bool {
    file.path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

fn output_path(css_dir: &Path, file: &MatchedFile) -> PathBuf {
    css_dir.join(&file.relative).with_extension("css")
}

async fn compile_all(config: &RunConfiguration) -> Result<()> {
    if config.paths.sass_entries.is_empty() {
        debug!("no stylesheet entries configured");
        return Ok(());
    }

    let root = config.root.clone();
    let patterns = config.paths.sass_entries.clone();
    let entries: Vec<MatchedFile> =
        tokio::task::spawn_blocking(move || patterns::resolve(&root, &patterns))
            .await
            .context("resolving stylesheet entries")??
            .into_iter()
            .filter(|f| !is_partial(f))
            .collect();

    if entries.is_empty() {
        debug!("stylesheet patterns matched no entries");
        return Ok(());
    }

    let css_dir = config.dist_subdir("css");
    let mut failures = Vec::new();

    for entry in &entries {
        let output = output_path(&css_dir, entry);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let args = sass_args(config, &entry.path, &output);
        let result = match run_tool("styles", &config.tools.sass, &args, &config.root).await {
            Ok(result) => result,
            Err(err) => {
                error!(task = "styles", file = %entry.path.display(), "{err:#}");
                failures.push(format!("{}: {err:#}", entry.path.display()));
                continue;
            }
        };

        if result.success {
            debug!(entry = %entry.path.display(), output = %output.display(), "compiled stylesheet");
            continue;
        }

        let stderr = result.stderr_text();
        match parse_diagnostic(&stderr) {
            Some(diag) => {
                error!(
                    task = "styles",
                    file = %diag.file,
                    line = diag.line,
                    column = diag.column,
                    "{}",
                    diag.message
                );
                failures.push(format!("{}:{}: {}", diag.file, diag.line, diag.message));
            }
            None => {
                error!(
                    task = "styles",
                    file = %entry.path.display(),
                    exit_code = result.exit_code.unwrap_or(-1),
                    "{}",
                    stderr
                );
                failures.push(format!("{}: sass exited unsuccessfully", entry.path.display()));
            }
        }
    }

    if !failures.is_empty() {
        bail!(
            "{} of {} stylesheet(s) failed to compile: {}",
            failures.len(),
            entries.len(),
            failures.join("; ")
        );
    }

    info!(count = entries.len(), dest = %css_dir.display(), "compiled stylesheets");
    Ok(())
}
