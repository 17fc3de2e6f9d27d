// src/steps/copy.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::{PathsSection, RunConfiguration};
use crate::orchestrator::{LeafFuture, LeafTask};

use super::patterns;

/// Which `PATHS` list a copy step reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopySource {
    /// `PATHS.fonts`
    Fonts,
    /// `PATHS.mlentries` (pre-built scripts)
    PrebuiltScripts,
}

impl CopySource {
    fn patterns(self, paths: &PathsSection) -> &[String] {
        match self {
            CopySource::Fonts => &paths.fonts,
            CopySource::PrebuiltScripts => &paths.mlentries,
        }
    }
}

/// Copies every file matched by a pattern list into `<dist>/<dest>`,
/// keeping paths relative to each pattern's glob base.
#[derive(Debug, Clone)]
pub struct CopyFiles {
    source: CopySource,
    dest: &'static str,
}

impl CopyFiles {
    pub fn new(source: CopySource, dest: &'static str) -> Self {
        Self { source, dest }
    }

    /// `PATHS.fonts` -> `<dist>/fonts`
    pub fn fonts() -> Self {
        Self::new(CopySource::Fonts, "fonts")
    }

    /// `PATHS.mlentries` -> `<dist>/js`
    pub fn prebuilt_scripts() -> Self {
        Self::new(CopySource::PrebuiltScripts, "js")
    }
}

impl LeafTask for CopyFiles {
    fn run<'a>(&'a self, config: &'a RunConfiguration) -> LeafFuture<'a> {
        Box::pin(async move {
            let patterns = self.source.patterns(&config.paths).to_vec();
            if patterns.is_empty() {
                debug!(source = ?self.source, "no input patterns configured; nothing to copy");
                return Ok(());
            }
            copy_matching(config, patterns, config.dist_subdir(self.dest)).await
        })
    }
}

async fn copy_matching(
    config: &RunConfiguration,
    patterns: Vec<String>,
    dest: PathBuf,
) -> Result<()> {
    let root = config.root.clone();
    let files = tokio::task::spawn_blocking(move || patterns::resolve(&root, &patterns))
        .await
        .context("resolving input patterns")??;

    if files.is_empty() {
        debug!(dest = %dest.display(), "input patterns matched no files");
        return Ok(());
    }

    tokio::fs::create_dir_all(&dest)
        .await
        .with_context(|| format!("creating {}", dest.display()))?;

    for file in &files {
        let target = dest.join(&file.relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::copy(&file.path, &target)
            .await
            .with_context(|| {
                format!("copying {} to {}", file.path.display(), target.display())
            })?;
        debug!(from = %file.path.display(), to = %target.display(), "copied file");
    }

    info!(count = files.len(), dest = %dest.display(), "copied files");
    Ok(())
}
