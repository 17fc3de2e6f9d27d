// src/steps/mod.rs

//! Leaf build steps.
//!
//! Each step is a thin adapter implementing [`LeafTask`]:
//!
//! - [`clean`] removes the output root.
//! - [`copy`] copies glob-matched files (fonts, pre-built scripts).
//! - [`styles`] compiles stylesheets with the `sass` CLI.
//! - [`scripts`] bundles script entries with `esbuild`.
//!
//! [`patterns`] and [`process`] are the shared glob and child-process
//! plumbing.
//!
//! [`LeafTask`]: crate::orchestrator::LeafTask

pub mod clean;
pub mod copy;
pub mod patterns;
pub mod process;
pub mod scripts;
pub mod styles;

pub use clean::Clean;
pub use copy::{CopyFiles, CopySource};
pub use scripts::ScriptBundler;
pub use styles::StyleCompiler;
