use std::collections::BTreeMap;
use std::path::PathBuf;

use distflow::config::{
    PathsSection, RawSettingsFile, RunConfiguration, SettingsFile, StepPolicy, ToolsSection,
};
use distflow::types::Mode;

/// Builder for `RunConfiguration` to simplify test setup.
///
/// Defaults: `dist = "dist"`, no inputs, development mode.
pub struct SettingsBuilder {
    root: PathBuf,
    raw: RawSettingsFile,
    mode: Mode,
}

impl SettingsBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            raw: RawSettingsFile {
                paths: PathsSection {
                    dist: "dist".to_string(),
                    ..Default::default()
                },
                tools: ToolsSection::default(),
                steps: BTreeMap::new(),
            },
            mode: Mode::Development,
        }
    }

    pub fn dist(mut self, dist: &str) -> Self {
        self.raw.paths.dist = dist.to_string();
        self
    }

    pub fn font(mut self, pattern: &str) -> Self {
        self.raw.paths.fonts.push(pattern.to_string());
        self
    }

    pub fn sass_entry(mut self, pattern: &str) -> Self {
        self.raw.paths.sass_entries.push(pattern.to_string());
        self
    }

    pub fn script_entry(mut self, pattern: &str) -> Self {
        self.raw.paths.entries.push(pattern.to_string());
        self
    }

    pub fn prebuilt_script(mut self, pattern: &str) -> Self {
        self.raw.paths.mlentries.push(pattern.to_string());
        self
    }

    pub fn sass_tool(mut self, program: &str) -> Self {
        self.raw.tools.sass = program.to_string();
        self
    }

    pub fn esbuild_tool(mut self, program: &str) -> Self {
        self.raw.tools.esbuild = program.to_string();
        self
    }

    pub fn halt_on_error(mut self, step: &str, halt: bool) -> Self {
        self.raw
            .steps
            .insert(step.to_string(), StepPolicy { halt_on_error: halt });
        self
    }

    pub fn production(mut self) -> Self {
        self.mode = Mode::Production;
        self
    }

    pub fn build(self) -> RunConfiguration {
        let settings =
            SettingsFile::try_from(self.raw).expect("Failed to build valid settings from builder");
        RunConfiguration::new(self.root, settings, self.mode)
    }
}
