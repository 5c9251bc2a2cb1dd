//! Process invoker integration tests
//!
//! Drive the invoker against small shell scripts standing in for the
//! analysis program: argument passing, exit-code capture, concurrent
//! draining of both streams, and the cancellation hook.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use mlingest::services::{ExitOutcome, InvokeError, PipelineInvoker};

/// Write an executable stand-in for the analysis program.
fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

#[tokio::test]
async fn passes_positional_arguments_and_captures_stdout() {
    let dir = TempDir::new().unwrap();
    let program = write_script(dir.path(), "args.sh", r#"echo "artifact=$1 target=$2 top=$3""#);
    let artifact = dir.path().join("data.csv");

    let invoker = PipelineInvoker::new(&program);
    let cancel = CancellationToken::new();
    let invocation = invoker
        .invoke(&artifact, "Activity", 10, &cancel)
        .await
        .unwrap();

    assert_eq!(invocation.exit, ExitOutcome::Success);
    assert!(invocation
        .stdout
        .contains(&format!("artifact={} target=Activity top=10", artifact.display())));
    assert_eq!(invocation.args.len(), 3);
    assert!(invocation.stderr.is_empty());
}

#[tokio::test]
async fn nonzero_exit_is_reported_with_stderr_intact() {
    let dir = TempDir::new().unwrap();
    let program = write_script(dir.path(), "fail.sh", "printf 'feature error' >&2\nexit 3");

    let invoker = PipelineInvoker::new(&program);
    let cancel = CancellationToken::new();
    let invocation = invoker
        .invoke(&dir.path().join("data.csv"), "Activity", 10, &cancel)
        .await
        .unwrap();

    assert_eq!(invocation.exit, ExitOutcome::Failure(3));
    assert_eq!(invocation.stderr, "feature error");
}

#[tokio::test]
async fn drains_both_streams_beyond_pipe_buffer_without_deadlock() {
    let dir = TempDir::new().unwrap();
    // ~200 KiB of stderr noise (well past the usual 64 KiB pipe buffer)
    // before stdout sees the payload. A sequential reader would deadlock
    // here; the invoker's concurrent drains must not.
    let program = write_script(
        dir.path(),
        "noisy.sh",
        r#"i=0
while [ $i -lt 4000 ]; do
  echo "noise noise noise noise noise noise noise noise" >&2
  i=$((i+1))
done
echo '{"model":"RF","accuracy":0.5}'"#,
    );

    let invoker = PipelineInvoker::new(&program);
    let cancel = CancellationToken::new();
    let invocation = tokio::time::timeout(
        Duration::from_secs(30),
        invoker.invoke(&dir.path().join("data.csv"), "Activity", 10, &cancel),
    )
    .await
    .expect("invocation deadlocked on a full pipe")
    .unwrap();

    assert_eq!(invocation.exit, ExitOutcome::Success);
    assert!(invocation.stdout.contains("\"model\":\"RF\""));
    assert!(invocation.stderr.len() > 100_000);
}

#[tokio::test]
async fn cancellation_kills_a_stalled_child_promptly() {
    let dir = TempDir::new().unwrap();
    let program = write_script(dir.path(), "stall.sh", "sleep 30");

    let invoker = PipelineInvoker::new(&program);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let invocation = invoker
        .invoke(&dir.path().join("data.csv"), "Activity", 10, &cancel)
        .await
        .unwrap();

    assert_eq!(invocation.exit, ExitOutcome::Killed);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "kill took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn cancellation_is_prompt_despite_lingering_descendants() {
    let dir = TempDir::new().unwrap();
    // The background sleep inherits the pipe write ends and survives the
    // kill of the shell; draining must not wait out the whole tree.
    let program = write_script(dir.path(), "tree.sh", "sleep 30 &\nwait");

    let invoker = PipelineInvoker::new(&program);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let invocation = invoker
        .invoke(&dir.path().join("data.csv"), "Activity", 10, &cancel)
        .await
        .unwrap();

    assert_eq!(invocation.exit, ExitOutcome::Killed);
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "kill took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn missing_program_is_a_spawn_failure() {
    let dir = TempDir::new().unwrap();

    let invoker = PipelineInvoker::new(dir.path().join("no_such_program"));
    let cancel = CancellationToken::new();
    let err = invoker
        .invoke(&dir.path().join("data.csv"), "Activity", 10, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, InvokeError::Spawn { .. }));
}
