// src/exec/task_runner.rs

//! Individual execution process runner.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::dag::Project;
use crate::errors::MojoError;
use crate::plan::MojoExecution;

/// Run one execution's command and wait for it.
///
/// - stdout is logged at info, stderr at debug, tagged with the project.
/// - A non-zero exit is a `Failed` error; failing to spawn or wait on the
///   process is `Fatal`.
pub async fn run_execution(
    project: &Project,
    execution: &MojoExecution,
    phase: Option<&str>,
) -> Result<(), MojoError> {
    let key = project.key().to_string();

    info!(
        project = %key,
        execution = %execution.execution_id,
        phase = phase.unwrap_or("-"),
        cmd = %execution.cmd,
        "starting execution process"
    );

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&execution.cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&execution.cmd);
        c
    };

    if let Some(dir) = project.dir() {
        cmd.current_dir(dir);
    }

    cmd.env("REACTOR_PROJECT", &key)
        .env("REACTOR_PHASE", phase.unwrap_or(""))
        .env("REACTOR_EXECUTION", &execution.execution_id)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        MojoError::Fatal(format!(
            "spawning process for execution '{}' of {key}: {e}",
            execution.execution_id
        ))
    })?;

    // Always consume both pipes so buffers don't fill.
    let stdout_task = child.stdout.take().map(|stdout| {
        let key = key.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(project = %key, "{}", line);
            }
        })
    });
    let stderr_task = child.stderr.take().map(|stderr| {
        let key = key.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(project = %key, "stderr: {}", line);
            }
        })
    });

    let status = child.wait().await.map_err(|e| {
        MojoError::Fatal(format!(
            "waiting for process of execution '{}' of {key}: {e}",
            execution.execution_id
        ))
    })?;

    for reader in [stdout_task, stderr_task].into_iter().flatten() {
        let _ = reader.await;
    }

    let code = status.code().unwrap_or(-1);
    info!(
        project = %key,
        execution = %execution.execution_id,
        exit_code = code,
        success = status.success(),
        "execution process exited"
    );

    if status.success() {
        Ok(())
    } else {
        Err(MojoError::Failed(format!(
            "command `{}` exited with code {code}",
            execution.cmd
        )))
    }
}
