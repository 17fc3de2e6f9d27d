// src/config/validate.rs

use std::path::{Component, Path};

use crate::config::model::{RawSettingsFile, SettingsFile};
use crate::errors::{DistflowError, Result};
use crate::pipeline::LEAF_TASKS;
use crate::steps::patterns;

impl TryFrom<RawSettingsFile> for SettingsFile {
    type Error = DistflowError;

    fn try_from(raw: RawSettingsFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_settings(&raw)?;
        Ok(SettingsFile::new_unchecked(raw.paths, raw.tools, raw.steps))
    }
}

fn validate_raw_settings(cfg: &RawSettingsFile) -> Result<()> {
    validate_dist(&cfg.paths.dist)?;
    validate_tools(cfg)?;
    validate_step_names(cfg)?;
    validate_patterns(cfg)?;
    Ok(())
}

fn validate_dist(dist: &str) -> Result<()> {
    let trimmed = dist.trim();
    if trimmed.is_empty() {
        return Err(DistflowError::ConfigLoad(
            "PATHS.dist must not be empty".to_string(),
        ));
    }

    // `clean` deletes this directory, so it has to name something strictly
    // below the project root.
    let path = Path::new(trimmed);
    if path.is_absolute() {
        return Ok(());
    }

    let mut depth: i32 = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            break;
        }
    }
    if depth <= 0 {
        return Err(DistflowError::ConfigLoad(format!(
            "PATHS.dist must point below the project root (got '{dist}')"
        )));
    }

    Ok(())
}

fn validate_tools(cfg: &RawSettingsFile) -> Result<()> {
    for (key, value) in [("sass", &cfg.tools.sass), ("esbuild", &cfg.tools.esbuild)] {
        if value.trim().is_empty() {
            return Err(DistflowError::ConfigLoad(format!(
                "tools.{key} must name an executable"
            )));
        }
    }
    Ok(())
}

fn validate_step_names(cfg: &RawSettingsFile) -> Result<()> {
    for name in cfg.steps.keys() {
        if !LEAF_TASKS.contains(&name.as_str()) {
            return Err(DistflowError::ConfigLoad(format!(
                "unknown step '{}' in `steps` (expected one of: {})",
                name,
                LEAF_TASKS.join(", ")
            )));
        }
    }
    Ok(())
}

fn validate_patterns(cfg: &RawSettingsFile) -> Result<()> {
    let groups = [
        ("fonts", &cfg.paths.fonts),
        ("sass_entries", &cfg.paths.sass_entries),
        ("entries", &cfg.paths.entries),
        ("mlentries", &cfg.paths.mlentries),
    ];

    for (key, list) in groups {
        for pattern in list.iter() {
            let body = pattern.strip_prefix('!').unwrap_or(pattern);
            patterns::compile(body).map_err(|e| {
                DistflowError::ConfigLoad(format!("invalid glob in PATHS.{key}: '{pattern}': {e}"))
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::{SettingsFormat, parse_str};

    fn settings(yaml: &str) -> Result<SettingsFile> {
        SettingsFile::try_from(parse_str(yaml, SettingsFormat::Yaml)?)
    }

    #[test]
    fn accepts_nested_dist() {
        assert!(settings("PATHS:\n  dist: build/dist\n").is_ok());
        assert!(settings("PATHS:\n  dist: ./dist\n").is_ok());
    }

    #[test]
    fn rejects_dist_that_would_wipe_the_project() {
        for dist in ["\"\"", ".", "..", "dist/../..", "a/../"] {
            let err = settings(&format!("PATHS:\n  dist: {dist}\n")).unwrap_err();
            assert!(err.is_config_load(), "dist={dist} gave {err:?}");
        }
    }

    #[test]
    fn rejects_unknown_step_policy() {
        let err = settings("PATHS:\n  dist: dist\nsteps:\n  sassy:\n    halt_on_error: false\n")
            .unwrap_err();
        match err {
            DistflowError::ConfigLoad(msg) => assert!(msg.contains("sassy")),
            other => panic!("expected ConfigLoad, got {other:?}"),
        }
    }

    #[test]
    fn rejects_broken_glob() {
        let err = settings("PATHS:\n  dist: dist\n  fonts: [\"src/[fonts\"]\n").unwrap_err();
        assert!(err.is_config_load());

        let err = settings("PATHS:\n  dist: dist\n  fonts: [\"fonts/*\", \"!fonts/[x\"]\n")
            .unwrap_err();
        assert!(err.is_config_load());
    }
}
