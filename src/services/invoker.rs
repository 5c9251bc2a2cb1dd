//! Process invoker
//!
//! Launches the external analysis program against a staged artifact,
//! supervises its lifetime, and accumulates both output streams. The two
//! pipes are drained on independent tasks for the full lifetime of the
//! child; a single sequential reader would deadlock as soon as the program
//! emits more than one OS pipe buffer on the stream nobody is reading.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How one invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exit code 0
    Success,
    /// Non-zero exit code
    Failure(i32),
    /// Killed before exiting (cancellation or signal)
    Killed,
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }
}

/// One completed execution of the analysis program
///
/// The stream buffers hold everything the program wrote; the exit status is
/// observed exactly once, by the invoker.
#[derive(Debug)]
pub struct PipelineInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit: ExitOutcome,
}

/// Invoker errors. A non-zero exit is not an error at this layer; callers
/// inspect [`PipelineInvocation::exit`].
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Program missing or not executable
    #[error("failed to start analysis program {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A piped stream could not be captured or its reader task died
    #[error("failed to capture analysis program output stream")]
    StreamCapture,

    /// I/O failure while supervising the child
    #[error("I/O error while supervising analysis program: {0}")]
    Io(#[from] std::io::Error),
}

/// How long the drains of a killed invocation may linger. Descendants of
/// the killed child can inherit the pipe write ends and keep the streams
/// open past the kill; the cancel path must not wait on the whole tree.
const KILLED_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Launches and supervises the external analysis program
pub struct PipelineInvoker {
    program: PathBuf,
}

impl PipelineInvoker {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run the program with three positional arguments: artifact path,
    /// target column name, and top-feature count.
    ///
    /// Cancelling `cancel` kills the child and yields
    /// [`ExitOutcome::Killed`]. If the returned future is dropped (caller
    /// abort, deadline expiry), the child is killed via `kill_on_drop`.
    pub async fn invoke(
        &self,
        artifact_path: &Path,
        target_column: &str,
        top_features: u32,
        cancel: &CancellationToken,
    ) -> Result<PipelineInvocation, InvokeError> {
        let args = vec![
            artifact_path.display().to_string(),
            target_column.to_string(),
            top_features.to_string(),
        ];

        debug!(
            program = %self.program.display(),
            artifact = %artifact_path.display(),
            "Spawning analysis program"
        );

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvokeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let mut stdout_pipe = child.stdout.take().ok_or(InvokeError::StreamCapture)?;
        let mut stderr_pipe = child.stderr.take().ok_or(InvokeError::StreamCapture)?;

        // Independent drains, running until EOF on their pipe.
        let mut stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
        });
        let mut stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
        });

        let status = tokio::select! {
            status = child.wait() => Some(status?),
            _ = cancel.cancelled() => None,
        };
        let exit = match status {
            Some(status) => match status.code() {
                Some(0) => ExitOutcome::Success,
                Some(code) => ExitOutcome::Failure(code),
                None => ExitOutcome::Killed,
            },
            None => {
                child.kill().await?;
                ExitOutcome::Killed
            }
        };

        // On a normal exit the pipes close and both drains terminate. A
        // killed child may leave descendants holding the write ends, so
        // that path bounds the drain join; a killed invocation's output is
        // diagnostic at best and may be abandoned.
        let (stdout_buf, stderr_buf) = if exit == ExitOutcome::Killed {
            let drains = async { tokio::join!(&mut stdout_task, &mut stderr_task) };
            match tokio::time::timeout(KILLED_DRAIN_GRACE, drains).await {
                Ok((stdout, stderr)) => (
                    stdout.map_err(|_| InvokeError::StreamCapture)??,
                    stderr.map_err(|_| InvokeError::StreamCapture)??,
                ),
                Err(_) => {
                    stdout_task.abort();
                    stderr_task.abort();
                    (Vec::new(), Vec::new())
                }
            }
        } else {
            (
                stdout_task.await.map_err(|_| InvokeError::StreamCapture)??,
                stderr_task.await.map_err(|_| InvokeError::StreamCapture)??,
            )
        };

        let invocation = PipelineInvocation {
            program: self.program.clone(),
            args,
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
            exit,
        };

        debug!(
            exit = ?invocation.exit,
            stdout_bytes = invocation.stdout.len(),
            stderr_bytes = invocation.stderr.len(),
            "Analysis program finished"
        );

        Ok(invocation)
    }
}
