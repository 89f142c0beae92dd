//! Incremental, parallel driver for external source formatters.
//!
//! Sources are discovered per configured project, compared against a
//! modification-time cache, and only the stale ones are handed to the
//! formatter on a worker pool. The cache is persisted once all work is done.

pub mod cache;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod errors;
pub mod executor;
pub mod formatter;
pub mod runner;
pub mod session;

pub use cache::{CacheStore, Staleness, StalenessEvaluator};
pub use config::{CliOverrides, FormatConfig, FormatterConfig, ProjectConfig};
pub use descriptor::{ExternalCommand, SourceDescriptor};
pub use discovery::{DenyList, Discoverer};
pub use errors::{FormatError, TaskError, TaskErrorKind};
pub use executor::{ExecutionSummary, ParallelExecutor};
pub use formatter::Formatter;
pub use runner::{CommandRunner, CommandStatus, SystemRunner};
pub use session::{FormatPlan, FormatSession, RunReport};
