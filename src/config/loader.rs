// src/config/loader.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::model::{RawSettingsFile, SettingsFile};
use crate::errors::{DistflowError, Result};

/// Default settings file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "distflow.yml";

/// Settings file format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Yaml,
    Toml,
}

impl SettingsFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => SettingsFormat::Toml,
            _ => SettingsFormat::Yaml,
        }
    }
}

/// Load a settings file and return the raw `RawSettingsFile`.
///
/// This only performs deserialization; use [`load_and_validate`] to also run
/// the semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSettingsFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            DistflowError::ConfigLoad(format!("settings file not found: {}", path.display()))
        }
        _ => DistflowError::ConfigLoad(format!("reading {}: {e}", path.display())),
    })?;

    parse_str(&contents, SettingsFormat::from_path(path))
}

/// Parse settings from an in-memory string.
pub fn parse_str(contents: &str, format: SettingsFormat) -> Result<RawSettingsFile> {
    let raw = match format {
        SettingsFormat::Yaml => serde_yaml::from_str(contents)?,
        SettingsFormat::Toml => toml::from_str(contents)?,
    };
    Ok(raw)
}

/// Load a settings file from path and validate it.
///
/// This is the entry point the rest of the application uses. Any error it
/// returns satisfies [`DistflowError::is_config_load`].
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SettingsFile> {
    let raw = load_from_path(&path)?;
    SettingsFile::try_from(raw)
}

/// Default settings path (`distflow.yml` in the working directory).
///
/// `DISTFLOW_CONFIG` overrides it when set.
pub fn default_config_path() -> PathBuf {
    std::env::var_os("DISTFLOW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_accepts_single_strings_and_lists() {
        let raw = parse_str(
            r#"
PATHS:
  dist: dist
  fonts: "src/fonts/**/*"
  sass_entries:
    - src/scss/app.scss
    - src/scss/print.scss
"#,
            SettingsFormat::Yaml,
        )
        .unwrap();

        assert_eq!(raw.paths.dist, "dist");
        assert_eq!(raw.paths.fonts, vec!["src/fonts/**/*"]);
        assert_eq!(raw.paths.sass_entries.len(), 2);
        assert!(raw.paths.entries.is_empty());
        assert_eq!(raw.tools.sass, "sass");
        assert_eq!(raw.tools.esbuild, "esbuild");
    }

    #[test]
    fn toml_is_picked_by_extension() {
        assert_eq!(
            SettingsFormat::from_path(Path::new("build/distflow.toml")),
            SettingsFormat::Toml
        );
        assert_eq!(
            SettingsFormat::from_path(Path::new("config.gulp.yml")),
            SettingsFormat::Yaml
        );

        let raw = parse_str(
            r#"
[PATHS]
dist = "out"
entries = ["src/js/app.js"]

[steps.styles]
halt_on_error = false
"#,
            SettingsFormat::Toml,
        )
        .unwrap();
        assert_eq!(raw.paths.dist, "out");
        assert!(!raw.steps["styles"].halt_on_error);
    }

    #[test]
    fn missing_paths_section_is_a_parse_error() {
        let err = parse_str("tools:\n  sass: sass\n", SettingsFormat::Yaml).unwrap_err();
        assert!(err.is_config_load());
    }
}
