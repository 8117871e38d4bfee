//! Builder for executing external tool commands with timeout support.
//!
//! Encoder runs can last minutes, so the command runner streams stderr
//! line-by-line to a caller-supplied callback instead of buffering it all.
//! Only a bounded tail of the diagnostic output is retained for error
//! reporting. The child process is reaped on every exit path: normal
//! completion, I/O failure, and timeout.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use reelgate_common::{Error, Result};

/// Default command timeout: 4 hours, enough for long encodes of large files.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4 * 3600);

/// Maximum number of stderr bytes retained for error reporting.
const STDERR_TAIL_BYTES: usize = 500;

/// Result of a streamed tool execution.
#[derive(Debug)]
pub struct StreamedOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Bounded tail of the captured stderr (last ~500 characters).
    pub stderr_tail: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use reelgate_av::command::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> reelgate_common::Result<()> {
/// let mut cmd = ToolCommand::new(PathBuf::from("ffmpeg"));
/// cmd.arg("-version");
/// let output = cmd.execute_streaming(|line| println!("{line}")).await?;
/// assert!(output.status.success());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Execute the command, invoking `on_line` for every line of stderr.
    ///
    /// Lines are split on both `\n` and `\r`, since encoders overwrite
    /// their progress display with carriage returns.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if spawning fails (missing executable,
    ///   permissions).
    /// - [`Error::ToolFailed`] on I/O failure while reading diagnostics or
    ///   when the timeout expires (the child is killed and reaped first).
    ///
    /// A nonzero exit status is NOT an error at this layer; callers check
    /// `status` so they can attach their own context.
    pub async fn execute_streaming(
        &self,
        mut on_line: impl FnMut(&str),
    ) -> Result<StreamedOutput> {
        let program_name = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|_| Error::tool_not_found(program_name.clone()))?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::internal("child stderr was not captured"))?;

        let mut tail = String::new();

        let run = async {
            let mut buf = [0u8; 8192];
            let mut pending = String::new();
            loop {
                let n = stderr.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                pending.push_str(&String::from_utf8_lossy(&buf[..n]));
                while let Some(pos) = pending.find(['\r', '\n']) {
                    let line: String = pending[..pos].to_string();
                    pending.drain(..=pos);
                    if !line.is_empty() {
                        on_line(&line);
                        push_tail(&mut tail, &line);
                    }
                }
            }
            if !pending.is_empty() {
                on_line(&pending);
                let rest = std::mem::take(&mut pending);
                push_tail(&mut tail, &rest);
            }
            child.wait().await
        };

        match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(status)) => Ok(StreamedOutput {
                status,
                stderr_tail: tail,
            }),
            Ok(Err(e)) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                Err(Error::tool_failed(
                    program_name,
                    format!("I/O error waiting for process: {e}"),
                ))
            }
            Err(_elapsed) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                Err(Error::tool_failed(
                    program_name,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        }
    }
}

/// Append a line to the tail buffer, keeping only the last
/// [`STDERR_TAIL_BYTES`] bytes (on a char boundary).
fn push_tail(tail: &mut String, line: &str) {
    if !tail.is_empty() {
        tail.push('\n');
    }
    tail.push_str(line);
    if tail.len() > STDERR_TAIL_BYTES {
        let mut split = tail.len() - STDERR_TAIL_BYTES;
        while !tail.is_char_boundary(split) {
            split += 1;
        }
        tail.drain(..split);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute_streaming(|_| {})
            .await;
        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
    }

    #[tokio::test]
    async fn streams_stderr_lines() {
        // `sh -c` writes two lines to stderr.
        let mut cmd = ToolCommand::new(PathBuf::from("sh"));
        cmd.args(["-c", "echo one >&2; echo two >&2"]);

        let mut lines = Vec::new();
        let output = cmd
            .execute_streaming(|line| lines.push(line.to_string()))
            .await
            .unwrap();

        assert!(output.status.success());
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
        assert!(output.stderr_tail.contains("one"));
        assert!(output.stderr_tail.contains("two"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_in_status() {
        let mut cmd = ToolCommand::new(PathBuf::from("sh"));
        cmd.args(["-c", "echo boom >&2; exit 3"]);

        let output = cmd.execute_streaming(|_| {}).await.unwrap();
        assert!(!output.status.success());
        assert!(output.stderr_tail.contains("boom"));
    }

    #[tokio::test]
    async fn timeout_fires() {
        let mut cmd = ToolCommand::new(PathBuf::from("sleep"));
        cmd.arg("10").timeout(Duration::from_millis(100));

        let result = cmd.execute_streaming(|_| {}).await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("timed out"), "unexpected error: {err}");
    }

    #[test]
    fn tail_is_bounded() {
        let mut tail = String::new();
        for i in 0..100 {
            push_tail(&mut tail, &format!("line number {i} with some padding"));
        }
        assert!(tail.len() <= STDERR_TAIL_BYTES);
        assert!(tail.contains("line number 99"));
        assert!(!tail.contains("line number 0 "));
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let mut tail = String::new();
        for _ in 0..50 {
            push_tail(&mut tail, "héllo wörld with ünïcode paddîng");
        }
        assert!(tail.len() <= STDERR_TAIL_BYTES);
        // Must still be valid UTF-8 (guaranteed by String) and non-empty.
        assert!(!tail.is_empty());
    }
}
