use std::process::Command;
use tracing::debug;

use crate::descriptor::ExternalCommand;

/// How an external command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
}

impl CommandStatus {
    pub const SUCCESS: CommandStatus = CommandStatus { code: Some(0) };

    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands on behalf of formatting tasks.
///
/// Implementations are shared by all workers of the pool.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &ExternalCommand) -> std::io::Result<CommandStatus>;
}

/// Spawns real processes, inheriting stdio
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ExternalCommand) -> std::io::Result<CommandStatus> {
        debug!("Running {}", command);
        let status = Command::new(command.program())
            .args(command.args())
            .status()?;
        Ok(CommandStatus {
            code: status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_system_runner_reports_exit_codes() {
        let runner = SystemRunner::new();

        let ok = runner
            .run(&ExternalCommand::new("sh", ["-c", "exit 0"]))
            .unwrap();
        assert!(ok.success());

        let failed = runner
            .run(&ExternalCommand::new("sh", ["-c", "exit 3"]))
            .unwrap();
        assert_eq!(failed, CommandStatus::exited(3));
        assert!(!failed.success());
    }

    #[test]
    fn test_system_runner_missing_program() {
        let runner = SystemRunner::new();
        let result = runner.run(&ExternalCommand::new(
            "incrfmt-definitely-not-a-program",
            Vec::<String>::new(),
        ));
        assert!(result.is_err());
    }
}
