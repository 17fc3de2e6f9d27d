// src/steps/patterns.rs

//! Input glob resolution shared by the copy, style and script steps.
//!
//! Semantics follow the usual "src glob" conventions of front-end build
//! tools:
//!
//! - Patterns are relative to the project root and use `/` separators.
//! - `*` does not cross directory boundaries; `**` does.
//! - A leading `!` turns a pattern into an exclusion.
//! - Every matched file remembers its path relative to the pattern's *glob
//!   base* (the leading components without glob metacharacters), so
//!   `src/fonts/**/*` copies `src/fonts/a/b.ttf` to `<dest>/a/b.ttf`.
//! - A literal (non-glob) pattern must name an existing file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

/// A file selected by a set of patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Location on disk.
    pub path: PathBuf,
    /// Path relative to the glob base of the pattern that matched it.
    pub relative: PathBuf,
}

const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}'];

pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_META)
}

fn normalize(pattern: &str) -> &str {
    let mut p = pattern;
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p
}

/// Leading path components of `pattern` that contain no glob syntax.
///
/// For a literal file path this is the parent directory.
pub fn glob_base(pattern: &str) -> PathBuf {
    let pattern = normalize(pattern);
    if !is_glob(pattern) {
        return Path::new(pattern)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
    }

    let mut base = PathBuf::new();
    for part in pattern.split('/') {
        if is_glob(part) {
            break;
        }
        if part.is_empty() && base.as_os_str().is_empty() && pattern.starts_with('/') {
            base.push("/");
            continue;
        }
        base.push(part);
    }
    base
}

/// Compile one pattern body (without `!`). `*` stays within a single path
/// component for includes and excludes alike.
pub fn compile(pattern: &str) -> std::result::Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

struct Include {
    pattern: String,
    base: PathBuf,
    matcher: Option<GlobMatcher>,
}

/// Compiled include/exclude pattern list.
pub struct PatternSet {
    includes: Vec<Include>,
    excludes: Option<GlobSet>,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut includes = Vec::new();
        let mut exclude_builder = GlobSetBuilder::new();
        let mut has_excludes = false;

        for raw in patterns {
            if let Some(negated) = raw.strip_prefix('!') {
                exclude_builder.add(
                    compile(normalize(negated))
                        .with_context(|| format!("invalid exclude pattern '{raw}'"))?,
                );
                has_excludes = true;
                continue;
            }

            let pattern = normalize(raw).to_string();
            let matcher = if is_glob(&pattern) {
                let glob = compile(&pattern).with_context(|| format!("invalid pattern '{raw}'"))?;
                Some(glob.compile_matcher())
            } else {
                None
            };

            includes.push(Include {
                base: glob_base(&pattern),
                pattern,
                matcher,
            });
        }

        let excludes = if has_excludes {
            Some(
                exclude_builder
                    .build()
                    .context("building exclude pattern set")?,
            )
        } else {
            None
        };

        Ok(Self { includes, excludes })
    }

    fn is_excluded(&self, candidate: &str) -> bool {
        self.excludes
            .as_ref()
            .is_some_and(|set| set.is_match(candidate))
    }

    /// Resolve all patterns against `root`.
    ///
    /// Results are deduplicated (the first pattern to match a file wins)
    /// and sorted by path within each pattern for stable output.
    pub fn resolve(&self, root: &Path) -> Result<Vec<MatchedFile>> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut out = Vec::new();

        for include in &self.includes {
            let mut found: Vec<MatchedFile> = match &include.matcher {
                None => self.resolve_literal(root, include)?.into_iter().collect(),
                Some(matcher) => self.resolve_glob(root, include, matcher)?,
            };
            found.sort_by(|a, b| a.path.cmp(&b.path));

            debug!(
                pattern = %include.pattern,
                matches = found.len(),
                "resolved input pattern"
            );

            for file in found {
                if seen.insert(file.path.clone()) {
                    out.push(file);
                }
            }
        }

        Ok(out)
    }

    fn resolve_literal(&self, root: &Path, include: &Include) -> Result<Option<MatchedFile>> {
        let path = root.join(&include.pattern);
        if !path.is_file() {
            bail!("file not found: {}", path.display());
        }
        if self.is_excluded(&include.pattern) {
            return Ok(None);
        }
        let relative = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&include.pattern));
        Ok(Some(MatchedFile { path, relative }))
    }

    fn resolve_glob(
        &self,
        root: &Path,
        include: &Include,
        matcher: &GlobMatcher,
    ) -> Result<Vec<MatchedFile>> {
        let base_dir = root.join(&include.base);
        if !base_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        walk_files(&base_dir, &mut files)?;

        let mut out = Vec::new();
        for path in files {
            let candidate = match path.strip_prefix(root) {
                Ok(rel) if !include.base.is_absolute() => to_slash(rel),
                _ => to_slash(&path),
            };
            if !matcher.is_match(&candidate) || self.is_excluded(&candidate) {
                continue;
            }
            let relative = path
                .strip_prefix(&base_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(&candidate));
            out.push(MatchedFile { path, relative });
        }
        Ok(out)
    }
}

/// Convenience wrapper: compile `patterns` and resolve them against `root`.
pub fn resolve(root: &Path, patterns: &[String]) -> Result<Vec<MatchedFile>> {
    PatternSet::new(patterns)?.resolve(root)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
        .replacen("//", "/", 1)
}

fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("reading dir {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading entry in {}", dir.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("stat {}", path.display()))?;
        if file_type.is_dir() {
            walk_files(&path, out)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            out.push(path);
        }
    }
    Ok(())
}
