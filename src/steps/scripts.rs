// src/steps/scripts.rs

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info};

use crate::config::RunConfiguration;
use crate::orchestrator::{LeafFuture, LeafTask};

use super::patterns::{self, MatchedFile};
use super::process::run_tool;

/// Bundles each `PATHS.entries` script into `<dist>/js/<stem>.js` with
/// `esbuild`.
///
/// Development builds are unminified with an external `.js.map`;
/// production builds are minified and ship no source map.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptBundler;

impl LeafTask for ScriptBundler {
    fn run<'a>(&'a self, config: &'a RunConfiguration) -> LeafFuture<'a> {
        Box::pin(bundle_all(config))
    }
}

/// Command-line arguments for bundling `entry` into `outfile`.
pub fn esbuild_args(config: &RunConfiguration, entry: &Path, outfile: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![entry.as_os_str().to_owned(), "--bundle".into()];

    let mut out = OsString::from("--outfile=");
    out.push(outfile);
    args.push(out);

    if config.mode.is_production() {
        args.push("--minify".into());
    } else {
        args.push("--sourcemap".into());
    }

    args.extend(config.tools.esbuild_args.iter().map(OsString::from));
    args
}

/// Output file for an entry: named after the entry's file stem, flat in
/// `js_dir`.
pub fn bundle_output(js_dir: &Path, entry: &Path) -> PathBuf {
    let stem = entry
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| OsString::from("bundle"));
    let mut name = stem;
    name.push(".js");
    js_dir.join(name)
}

/// Pair each entry with its bundle path, rejecting entries whose bundles
/// would land on the same file.
pub fn planned_outputs<'e>(
    js_dir: &Path,
    entries: &'e [MatchedFile],
) -> Result<Vec<(&'e MatchedFile, PathBuf)>> {
    let mut claimed: BTreeMap<PathBuf, &Path> = BTreeMap::new();
    let mut clashes = Vec::new();
    let mut plan = Vec::with_capacity(entries.len());

    for entry in entries {
        let outfile = bundle_output(js_dir, &entry.path);
        match claimed.get(&outfile) {
            Some(first) => clashes.push(format!(
                "{} and {} both bundle to {}",
                first.display(),
                entry.path.display(),
                outfile.display()
            )),
            None => {
                claimed.insert(outfile.clone(), entry.path.as_path());
            }
        }
        plan.push((entry, outfile));
    }

    if !clashes.is_empty() {
        bail!("conflicting script entries: {}", clashes.join("; "));
    }
    Ok(plan)
}

async fn bundle_all(config: &RunConfiguration) -> Result<()> {
    if config.paths.entries.is_empty() {
        debug!("no script entries configured");
        return Ok(());
    }

    let root = config.root.clone();
    let patterns = config.paths.entries.clone();
    let entries: Vec<MatchedFile> =
        tokio::task::spawn_blocking(move || patterns::resolve(&root, &patterns))
            .await
            .context("resolving script entries")??;

    if entries.is_empty() {
        debug!("script patterns matched no entries");
        return Ok(());
    }

    let js_dir = config.dist_subdir("js");
    let plan = planned_outputs(&js_dir, &entries)?;
    tokio::fs::create_dir_all(&js_dir)
        .await
        .with_context(|| format!("creating {}", js_dir.display()))?;

    let mut failures = Vec::new();
    for (entry, outfile) in plan {
        let args = esbuild_args(config, &entry.path, &outfile);
        let result =
            match run_tool("scripts:bundle", &config.tools.esbuild, &args, &config.root).await {
                Ok(result) => result,
                Err(err) => {
                    error!(task = "scripts:bundle", file = %entry.path.display(), "{err:#}");
                    failures.push(format!("{}: {err:#}", entry.path.display()));
                    continue;
                }
            };

        if result.success {
            debug!(entry = %entry.path.display(), output = %outfile.display(), "bundled script");
            continue;
        }

        error!(
            task = "scripts:bundle",
            file = %entry.path.display(),
            exit_code = result.exit_code.unwrap_or(-1),
            "{}",
            result.stderr_text()
        );
        failures.push(entry.path.display().to_string());
    }

    if !failures.is_empty() {
        bail!(
            "{} of {} script bundle(s) failed: {}",
            failures.len(),
            entries.len(),
            failures.join(", ")
        );
    }

    info!(
        count = entries.len(),
        mode = %config.mode,
        dest = %js_dir.display(),
        "bundled scripts"
    );
    Ok(())
}
