use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::descriptor::{ExternalCommand, SourceDescriptor};
use crate::errors::{Result, TaskError, TaskErrorKind};
use crate::formatter::Formatter;
use crate::runner::CommandRunner;

/// Outcome of running every task to completion
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    /// Paths formatted successfully, in input order
    pub completed: Vec<PathBuf>,

    /// One error per failed task, in input order
    pub failures: Vec<TaskError>,
}

impl ExecutionSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone, Copy)]
enum Stage {
    Preprocess,
    Format,
}

/// Runs preprocess commands and the formatter for each stale descriptor on
/// a bounded rayon pool.
///
/// Tasks never cancel each other: a failing task is recorded and every other
/// task still runs. `execute` returns only after all tasks have finished.
pub struct ParallelExecutor<'a> {
    runner: &'a dyn CommandRunner,
    formatter: &'a Formatter,
    jobs: Option<usize>,
}

impl<'a> ParallelExecutor<'a> {
    pub fn new(runner: &'a dyn CommandRunner, formatter: &'a Formatter) -> Self {
        Self {
            runner,
            formatter,
            jobs: None,
        }
    }

    /// Pool width; `None` uses the host's available parallelism
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn execute(
        &self,
        descriptors: &[&SourceDescriptor],
        cache: &CacheStore,
    ) -> Result<ExecutionSummary> {
        if descriptors.is_empty() {
            return Ok(ExecutionSummary::default());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs.unwrap_or(0))
            .thread_name(|index| format!("incrfmt-worker-{}", index))
            .build()?;
        debug!(
            "Running {} task(s) on {} worker(s)",
            descriptors.len(),
            pool.current_num_threads()
        );

        let outcomes: Vec<std::result::Result<PathBuf, TaskError>> = pool.install(|| {
            descriptors
                .par_iter()
                .map(|descriptor| self.run_task(descriptor, cache))
                .collect()
        });

        let mut summary = ExecutionSummary::default();
        for outcome in outcomes {
            match outcome {
                Ok(path) => summary.completed.push(path),
                Err(error) => summary.failures.push(error),
            }
        }
        Ok(summary)
    }

    fn run_task(
        &self,
        descriptor: &SourceDescriptor,
        cache: &CacheStore,
    ) -> std::result::Result<PathBuf, TaskError> {
        info!("format {}", descriptor.path().display());

        for command in descriptor.preprocess_commands() {
            self.invoke(descriptor, command, Stage::Preprocess)?;
        }

        let command = self.formatter.command_for(descriptor);
        self.invoke(descriptor, &command, Stage::Format)?;

        let recorded = cache.record_now(descriptor.path());
        debug!("{} formatted at {}", descriptor.path().display(), recorded);
        Ok(descriptor.path().to_path_buf())
    }

    fn invoke(
        &self,
        descriptor: &SourceDescriptor,
        command: &ExternalCommand,
        stage: Stage,
    ) -> std::result::Result<(), TaskError> {
        let fail = |kind| TaskError {
            path: descriptor.path().to_path_buf(),
            kind,
        };

        let status = self.runner.run(command).map_err(|source| {
            fail(TaskErrorKind::Spawn {
                command: command.to_string(),
                source,
            })
        })?;

        if status.success() {
            return Ok(());
        }

        warn!(
            "`{}` exited with {:?} for {}",
            command,
            status.code,
            descriptor.path().display()
        );
        let command = command.to_string();
        Err(fail(match stage {
            Stage::Preprocess => TaskErrorKind::Preprocess {
                command,
                code: status.code,
            },
            Stage::Format => TaskErrorKind::Formatter {
                command,
                code: status.code,
            },
        }))
    }
}
