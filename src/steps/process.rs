// src/steps/process.rs

//! External tool invocation.
//!
//! Style and script steps shell out to real tools (`sass`, `esbuild`). This
//! module runs one such process with `tokio::process::Command`, streams its
//! stdout/stderr into the log line by line, and hands back the collected
//! output so the caller can turn failures into diagnostics.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// What a finished tool process left behind.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ToolOutput {
    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Run `program` with `args` in `cwd` and wait for it to exit.
///
/// A non-zero exit is *not* an error here; check [`ToolOutput::success`].
/// Errors are reserved for failing to start or wait on the process.
pub async fn run_tool(
    task: &str,
    program: &str,
    args: &[OsString],
    cwd: &Path,
) -> Result<ToolOutput> {
    info!(
        task = %task,
        tool = %program,
        args = ?args,
        "starting external tool"
    );

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            anyhow!("could not start `{program}`: executable not found on PATH")
        } else {
            anyhow!(e).context(format!("spawning `{program}` for task '{task}'"))
        }
    })?;

    let stdout = child.stdout.take().map(|s| collect_lines(task, "stdout", s));
    let stderr = child.stderr.take().map(|s| collect_lines(task, "stderr", s));

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for `{program}` (task '{task}')"))?;

    let stdout = join_lines(stdout).await;
    let stderr = join_lines(stderr).await;

    debug!(
        task = %task,
        tool = %program,
        exit_code = status.code().unwrap_or(-1),
        success = status.success(),
        "external tool exited"
    );

    Ok(ToolOutput {
        exit_code: status.code(),
        success: status.success(),
        stdout,
        stderr,
    })
}

fn collect_lines<R>(task: &str, stream: &'static str, reader: R) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let task = task.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut out = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(task = %task, stream, "{}", line);
            out.push(line);
        }
        out
    })
}

async fn join_lines(handle: Option<JoinHandle<Vec<String>>>) -> Vec<String> {
    match handle {
        Some(h) => h.await.unwrap_or_default(),
        None => Vec::new(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let cwd = std::env::temp_dir();
        let out = run_tool(
            "probe",
            "sh",
            &args(&["-c", "echo out; echo err >&2; exit 3"]),
            &cwd,
        )
        .await
        .unwrap();

        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout, vec!["out"]);
        assert_eq!(out.stderr_text(), "err");
    }

    #[tokio::test]
    async fn missing_executable_is_an_error() {
        let cwd = std::env::temp_dir();
        let err = run_tool("probe", "distflow-no-such-tool", &[], &cwd)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
