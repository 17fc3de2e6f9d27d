// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::types::Mode;

/// Top-level settings as read from `distflow.yml`.
///
/// ```yaml
/// PATHS:
///   dist: dist
///   fonts: ["src/assets/fonts/**/*"]
///   sass_entries: ["src/scss/app.scss"]
///   sass_libs: ["node_modules/foundation-sites/scss"]
///   entries: ["src/js/app.js"]
///   mlentries: ["build/ml/*.js"]
///
/// tools:
///   sass: sass
///   esbuild: esbuild
///
/// steps:
///   styles:
///     halt_on_error: false
/// ```
///
/// This is the raw, unvalidated form; use [`SettingsFile`] (obtained via
/// `TryFrom`) everywhere else.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSettingsFile {
    /// Input/output locations from `PATHS`.
    #[serde(rename = "PATHS", alias = "paths")]
    pub paths: PathsSection,

    /// External tool binaries and extra arguments.
    #[serde(default)]
    pub tools: ToolsSection,

    /// Per-step policies, keyed by leaf task name.
    #[serde(default)]
    pub steps: BTreeMap<String, StepPolicy>,
}

/// Validated settings.
///
/// Only constructible through `TryFrom<RawSettingsFile>` (see
/// `config::validate`), so holding one means the invariants were checked.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    pub paths: PathsSection,
    pub tools: ToolsSection,
    pub steps: BTreeMap<String, StepPolicy>,
}

impl SettingsFile {
    pub(crate) fn new_unchecked(
        paths: PathsSection,
        tools: ToolsSection,
        steps: BTreeMap<String, StepPolicy>,
    ) -> Self {
        Self {
            paths,
            tools,
            steps,
        }
    }
}

/// `PATHS` section.
///
/// Every list accepts either a YAML sequence or a single string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsSection {
    /// Output root; wiped by `clean`.
    pub dist: String,

    /// Font globs, copied to `<dist>/fonts`.
    #[serde(default, deserialize_with = "one_or_many")]
    pub fonts: Vec<String>,

    /// Stylesheet entry points, compiled to `<dist>/css`.
    #[serde(default, deserialize_with = "one_or_many")]
    pub sass_entries: Vec<String>,

    /// Include directories handed to the style compiler.
    #[serde(default, deserialize_with = "one_or_many")]
    pub sass_libs: Vec<String>,

    /// Script entry points, bundled to `<dist>/js`.
    #[serde(default, deserialize_with = "one_or_many")]
    pub entries: Vec<String>,

    /// Pre-built scripts copied verbatim to `<dist>/js`.
    #[serde(default, deserialize_with = "one_or_many")]
    pub mlentries: Vec<String>,
}

/// `tools` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_sass")]
    pub sass: String,

    #[serde(default = "default_esbuild")]
    pub esbuild: String,

    /// Extra arguments appended to every `sass` invocation.
    #[serde(default)]
    pub sass_args: Vec<String>,

    /// Extra arguments appended to every `esbuild` invocation.
    #[serde(default)]
    pub esbuild_args: Vec<String>,
}

fn default_sass() -> String {
    "sass".to_string()
}

fn default_esbuild() -> String {
    "esbuild".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sass: default_sass(),
            esbuild: default_esbuild(),
            sass_args: Vec::new(),
            esbuild_args: Vec::new(),
        }
    }
}

/// `steps.<name>` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StepPolicy {
    /// When false, a failure of this step is logged and tolerated instead
    /// of failing the enclosing group.
    #[serde(default = "default_halt_on_error")]
    pub halt_on_error: bool,
}

fn default_halt_on_error() -> bool {
    true
}

impl Default for StepPolicy {
    fn default() -> Self {
        Self {
            halt_on_error: default_halt_on_error(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Resolved, immutable settings for a single run.
///
/// Built once in `lib::run` and handed by reference to every leaf task.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Directory all relative paths are resolved against (the directory
    /// containing the settings file).
    pub root: PathBuf,
    pub paths: PathsSection,
    pub tools: ToolsSection,
    pub steps: BTreeMap<String, StepPolicy>,
    pub mode: Mode,
}

impl RunConfiguration {
    pub fn new(root: impl Into<PathBuf>, settings: SettingsFile, mode: Mode) -> Self {
        Self {
            root: root.into(),
            paths: settings.paths,
            tools: settings.tools,
            steps: settings.steps,
            mode,
        }
    }

    /// Absolute (root-joined) output directory.
    pub fn dist_dir(&self) -> PathBuf {
        self.resolve(&self.paths.dist)
    }

    /// Output subdirectory, e.g. `dist_subdir("fonts")`.
    pub fn dist_subdir(&self, name: &str) -> PathBuf {
        self.dist_dir().join(name)
    }

    /// Resolve a settings path relative to the project root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Effective policy for a leaf task; missing entries use the defaults.
    pub fn step_policy(&self, name: &str) -> StepPolicy {
        self.steps.get(name).copied().unwrap_or_default()
    }
}
