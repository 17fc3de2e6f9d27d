// src/steps/clean.rs

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::config::RunConfiguration;
use crate::orchestrator::{LeafFuture, LeafTask};

/// Recursively removes the output root. An already absent directory counts
/// as success.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clean;

impl LeafTask for Clean {
    fn run<'a>(&'a self, config: &'a RunConfiguration) -> LeafFuture<'a> {
        Box::pin(clean(config))
    }
}

async fn clean(config: &RunConfiguration) -> Result<()> {
    let dist = config.dist_dir();
    ensure_not_project_root(&config.root, &dist)?;

    match tokio::fs::remove_dir_all(&dist).await {
        Ok(()) => {
            info!(path = %dist.display(), "removed output directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %dist.display(), "output directory already absent");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("removing {}", dist.display())),
    }
}

/// Refuse to delete the project root or anything above it, even if the
/// settings slipped past validation (e.g. an absolute `dist` or symlinks).
fn ensure_not_project_root(root: &Path, dist: &Path) -> Result<()> {
    let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let dist = match std::fs::canonicalize(dist) {
        Ok(p) => p,
        // Nothing on disk to protect.
        Err(_) => return Ok(()),
    };

    if root.starts_with(&dist) {
        bail!(
            "refusing to remove {}: it contains the project root {}",
            dist.display(),
            root.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn guard_rejects_ancestors_of_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("project");
        std::fs::create_dir_all(root.join("dist")).unwrap();

        assert!(ensure_not_project_root(&root, &root.join("dist")).is_ok());
        assert!(ensure_not_project_root(&root, &root).is_err());
        assert!(ensure_not_project_root(&root, tmp.path()).is_err());
        assert!(ensure_not_project_root(&root, &root.join("missing")).is_ok());
    }
}
