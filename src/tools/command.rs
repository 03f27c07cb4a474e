// 外部コマンド実行: タイムアウト付き、stdout/stderrを回収する

use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::UnmarkError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captured result of a finished tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Run `program` with `args`, waiting at most `timeout` for it to exit.
///
/// A timed-out child is killed and reaped before the error is returned.
pub fn run_with_timeout<I, S>(
    program: &Path,
    args: I,
    timeout: Duration,
) -> crate::error::Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.display().to_string();
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    tracing::debug!(command = ?command, "spawning external tool");

    let mut child = command
        .spawn()
        .map_err(|e| UnmarkError::external_tool(format!("failed to execute {name}: {e}")))?;

    // Drain the pipes on helper threads so a verbose tool cannot block on a full pipe.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_with_deadline(&mut child, &name, timeout)?;

    Ok(ToolOutput {
        status,
        stdout: join_drain(stdout),
        stderr: join_drain(stderr),
    })
}

/// Run a tool and require a successful exit status.
///
/// `accept` decides which exit codes count as success.
pub fn run_checked<I, S>(
    program: &Path,
    args: I,
    timeout: Duration,
    accept: impl Fn(i32) -> bool,
) -> crate::error::Result<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_with_timeout(program, args, timeout)?;
    match output.status.code() {
        Some(code) if accept(code) => Ok(output),
        code => Err(UnmarkError::external_tool(format!(
            "{} failed (exit code {}): {}",
            program.display(),
            code.map_or_else(|| "unknown".to_string(), |c| c.to_string()),
            output.stderr_text()
        ))),
    }
}

fn wait_with_deadline(
    child: &mut Child,
    name: &str,
    timeout: Duration,
) -> crate::error::Result<ExitStatus> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(UnmarkError::external_tool(format!(
                        "{name} timed out after {}s",
                        timeout.as_secs_f64()
                    )));
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(UnmarkError::external_tool(format!(
                    "failed to wait for {name}: {e}"
                )));
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut reader| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_drain(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Fail unless `path` exists and is non-empty after a tool claimed success.
pub fn ensure_output(path: &Path, tool: &str) -> crate::error::Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(UnmarkError::external_tool(format!(
            "{tool} produced an empty file: {}",
            path.display()
        ))),
        Err(e) => Err(UnmarkError::external_tool(format!(
            "{tool} produced no readable output at {}: {e}",
            path.display()
        ))),
    }
}
