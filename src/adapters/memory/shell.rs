//! Scripted shell executor.

use std::sync::{Arc, Mutex};

use crate::ports::shell::{ShellCommand, ShellError, ShellExecutor, ShellFuture, ShellOutput};

#[derive(Clone)]
enum Response {
    Output(ShellOutput),
    TimeOut,
}

#[derive(Default)]
struct Script {
    rules: Vec<(String, Response)>,
    commands: Vec<ShellCommand>,
}

/// Serves canned outputs for commands whose rendered command line starts
/// with a registered prefix, and records every command it receives.
///
/// Commands without a matching rule succeed with empty output.
#[derive(Clone, Default)]
pub struct ScriptedShellExecutor {
    script: Arc<Mutex<Script>>,
}

impl ScriptedShellExecutor {
    /// Creates an executor with no rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers commands starting with `prefix` with `output`.
    pub fn respond(&self, prefix: &str, output: ShellOutput) {
        self.push_rule(prefix, Response::Output(output));
    }

    /// Makes commands starting with `prefix` exceed their timeout.
    pub fn time_out(&self, prefix: &str) {
        self.push_rule(prefix, Response::TimeOut);
    }

    /// Every command run so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<ShellCommand> {
        self.script.lock().expect("script lock poisoned").commands.clone()
    }

    fn push_rule(&self, prefix: &str, response: Response) {
        let mut script = self.script.lock().expect("script lock poisoned");
        script.rules.push((prefix.to_string(), response));
    }
}

impl ShellExecutor for ScriptedShellExecutor {
    fn run<'a>(&'a self, command: &'a ShellCommand) -> ShellFuture<'a> {
        let response = {
            let mut script = self.script.lock().expect("script lock poisoned");
            script.commands.push(command.clone());
            let line = command.display();
            script
                .rules
                .iter()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                .map(|(_, response)| response.clone())
        };

        Box::pin(async move {
            match response {
                Some(Response::Output(output)) => Ok(output),
                Some(Response::TimeOut) => Err(ShellError::TimedOut {
                    program: command.program.clone(),
                    limit: command.timeout.unwrap_or_default(),
                }),
                None => Ok(ShellOutput::ok("")),
            }
        })
    }
}
