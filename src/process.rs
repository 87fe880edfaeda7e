#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::Stdio,
    time::Duration,
};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    process::{Child, Command},
    time::timeout,
};

/// Kills a spawned child unless it ran to completion.
struct KillOnDrop(Option<Child>);

impl KillOnDrop {
    /// Takes ownership of `child`.
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    /// The guarded child.
    fn child_mut(&mut self) -> Result<&mut Child> {
        self.0.as_mut().context("child process already released")
    }

    /// The child exited on its own; nothing left to kill.
    fn release(mut self) {
        self.0 = None;
    }
}

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct Collected {
    /// Exit status returned by the process.
    pub status: std::process::ExitStatus,
    /// Contents written to stdout.
    pub stdout: Vec<u8>,
    /// Contents written to stderr.
    pub stderr: Vec<u8>,
}

impl Collected {
    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, or `None` if the process was terminated by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Stdout decoded lossily.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stdout followed by stderr, decoded lossily.
    pub fn combined_text(&self) -> String {
        let mut text = self.stdout_text();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&String::from_utf8_lossy(&self.stderr));
        }
        text
    }
}

/// What to do with the child's output besides capturing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Echo {
    /// Capture only.
    #[default]
    Quiet,
    /// Also copy stdout/stderr to our own stdout/stderr as it arrives.
    Tee,
}

/// Drains `reader` into a buffer, copying each chunk to `sink` if one is
/// given.
async fn drain<R, W>(mut reader: R, mut sink: Option<W>) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut collected = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk).await.context("failed to read pipe")?;
        if read == 0 {
            break;
        }
        if let Some(out) = sink.as_mut() {
            out.write_all(&chunk[..read]).await.context("failed to echo output")?;
            out.flush().await.context("failed to echo output")?;
        }
        collected.extend_from_slice(&chunk[..read]);
    }
    Ok(collected)
}

/// Spawns a command with stdin detached and collects stdout/stderr.
///
/// * `cwd`: working directory, inherited when `None`
/// * `env`: extra environment variables layered on top of ours
/// * `deadline`: the child is killed if it runs longer than this
/// * `echo`: whether to also stream output to the terminal
pub async fn run_collect(
    program: impl AsRef<OsStr>,
    args: &[OsString],
    cwd: Option<&Path>,
    env: &[(OsString, OsString)],
    deadline: Option<Duration>,
    echo: Echo,
) -> Result<Collected> {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }

    tracing::debug!("spawning {} {:?}", program.to_string_lossy(), args);
    let mut guard = KillOnDrop::new(
        cmd.spawn()
            .with_context(|| format!("failed to spawn {}", program.to_string_lossy()))?,
    );

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .context("missing stdout pipe")?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .context("missing stderr pipe")?;

    let tee = echo == Echo::Tee;
    let out_task = tokio::spawn(drain(stdout, tee.then(tokio::io::stdout)));
    let err_task = tokio::spawn(drain(stderr, tee.then(tokio::io::stderr)));

    let wait_future = async move {
        let mut guard = guard;
        let status = guard
            .child_mut()?
            .wait()
            .await
            .context("failed to wait on process")?;
        guard.release();
        let stdout = out_task.await.context("stdout task join error")??;
        let stderr = err_task.await.context("stderr task join error")??;
        Ok::<Collected, anyhow::Error>(Collected {
            status,
            stdout,
            stderr,
        })
    };

    match deadline {
        Some(limit) => timeout(limit, wait_future).await.with_context(|| {
            format!("{} timed out after {limit:?}", program.to_string_lossy())
        })?,
        None => wait_future.await,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collects_output_and_status() {
        let args: Vec<OsString> = vec!["-c".into(), "printf out; printf err >&2; exit 3".into()];
        let collected = run_collect("sh", &args, None, &[], None, Echo::Quiet)
            .await
            .expect("run sh");

        assert!(!collected.success());
        assert_eq!(collected.code(), Some(3));
        assert_eq!(collected.stdout_text(), "out");
        assert_eq!(collected.combined_text(), "out\nerr");
    }

    #[tokio::test]
    async fn passes_environment() {
        let args: Vec<OsString> = vec!["-c".into(), "printf %s \"$GREENCENTLY_ECHO_VALUE\"".into()];
        let env: Vec<(OsString, OsString)> = vec![("GREENCENTLY_ECHO_VALUE".into(), "hello".into())];
        let collected = run_collect("sh", &args, None, &env, None, Echo::Quiet)
            .await
            .expect("run sh");

        assert_eq!(collected.stdout_text(), "hello");
    }

    #[tokio::test]
    async fn deadline_kills_slow_children() {
        let args: Vec<OsString> = vec!["-c".into(), "sleep 5".into()];
        let result = run_collect(
            "sh",
            &args,
            None,
            &[],
            Some(Duration::from_millis(100)),
            Echo::Quiet,
        )
        .await;

        let err = result.expect_err("deadline should fire");
        assert!(format!("{err:#}").contains("timed out after 100ms"), "{err:#}");
    }
}
