//! Live shell executor using `tokio::process`.

use std::process::Stdio;

use tokio::process::Command;

use crate::ports::shell::{ShellCommand, ShellError, ShellExecutor, ShellFuture, ShellOutput};

/// Live shell executor that spawns real child processes.
///
/// Children are killed when their future is dropped, so an expired
/// timeout or a cancelled poll cycle never leaves a process behind.
pub struct LiveShellExecutor;

impl ShellExecutor for LiveShellExecutor {
    fn run<'a>(&'a self, command: &'a ShellCommand) -> ShellFuture<'a> {
        Box::pin(async move {
            let mut child = Command::new(&command.program);
            child.args(&command.args).stdin(Stdio::null()).kill_on_drop(true);
            if let Some(dir) = &command.cwd {
                child.current_dir(dir);
            }
            for (key, value) in &command.env {
                child.env(key, value);
            }

            let launch_error =
                |source| ShellError::Launch { program: command.program.clone(), source };
            let output = match command.timeout {
                Some(limit) => tokio::time::timeout(limit, child.output())
                    .await
                    .map_err(|_| ShellError::TimedOut { program: command.program.clone(), limit })?
                    .map_err(launch_error)?,
                None => child.output().await.map_err(launch_error)?,
            };

            Ok(ShellOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}
