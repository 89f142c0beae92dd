//! Mock implementations for testing

use incrfmt_core::descriptor::ExternalCommand;
use incrfmt_core::runner::{CommandRunner, CommandStatus};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A command runner that records invocations instead of spawning processes.
///
/// Every command succeeds unless its rendered form contains one of the
/// registered failure needles, in which case it exits with status 1.
#[derive(Debug, Default)]
pub struct MockRunner {
    invocations: Mutex<Vec<ExternalCommand>>,
    failing: Mutex<Vec<String>>,
}

impl MockRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail every command whose rendered form contains `needle`
    pub fn fail_when(&self, needle: impl Into<String>) {
        self.failing.lock().unwrap().push(needle.into());
    }

    pub fn invocations(&self) -> Vec<ExternalCommand> {
        self.invocations.lock().unwrap().clone()
    }

    /// Last argument of every call to a program named `program_name`,
    /// sorted; for the formatter this is the formatted file
    pub fn targets_of(&self, program_name: &str) -> Vec<PathBuf> {
        let mut targets: Vec<PathBuf> = self
            .invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|command| {
                Path::new(command.program())
                    .file_name()
                    .map(|name| name == program_name)
                    .unwrap_or(false)
            })
            .filter_map(|command| command.args().last().map(PathBuf::from))
            .collect();
        targets.sort();
        targets
    }

    pub fn clear(&self) {
        self.invocations.lock().unwrap().clear();
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, command: &ExternalCommand) -> std::io::Result<CommandStatus> {
        self.invocations.lock().unwrap().push(command.clone());

        let rendered = command.to_string();
        let fails = self
            .failing
            .lock()
            .unwrap()
            .iter()
            .any(|needle| rendered.contains(needle.as_str()));

        Ok(if fails {
            CommandStatus::exited(1)
        } else {
            CommandStatus::SUCCESS
        })
    }
}
