use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::CacheError;

/// Fatal errors of a formatting run.
///
/// Everything except [`FormatError::Task`] and [`FormatError::Persistence`]
/// is raised before any external command is started.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid deny pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Failed to walk {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Cannot resolve dependency '{name}': {reason}")]
    DependencyResolution { name: String, reason: String },

    #[error("Cannot read metadata of {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("Failed to persist cache: {0}")]
    Persistence(#[from] CacheError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A single descriptor failed; siblings are unaffected.
#[derive(Debug, Error)]
#[error("{}: {kind}", .path.display())]
pub struct TaskError {
    pub path: PathBuf,
    pub kind: TaskErrorKind,
}

#[derive(Debug)]
pub enum TaskErrorKind {
    /// A preprocess command exited unsuccessfully
    Preprocess { command: String, code: Option<i32> },

    /// The formatter exited unsuccessfully
    Formatter { command: String, code: Option<i32> },

    /// An external command could not be started at all
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskErrorKind::Preprocess { command, code } => {
                write!(f, "preprocess command `{}` failed ({})", command, exit(code))
            }
            TaskErrorKind::Formatter { command, code } => {
                write!(f, "formatter `{}` failed ({})", command, exit(code))
            }
            TaskErrorKind::Spawn { command, source } => {
                write!(f, "could not run `{}`: {}", command, source)
            }
        }
    }
}

fn exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_display_includes_path_and_code() {
        let err = TaskError {
            path: PathBuf::from("/proj/src/a.cc"),
            kind: TaskErrorKind::Preprocess {
                command: "sed -i a.cc".to_string(),
                code: Some(4),
            },
        };

        let message = err.to_string();
        assert!(message.contains("/proj/src/a.cc"));
        assert!(message.contains("sed -i a.cc"));
        assert!(message.contains("exit code 4"));
    }

    #[test]
    fn test_signal_termination_display() {
        let kind = TaskErrorKind::Formatter {
            command: "clang-format".to_string(),
            code: None,
        };
        assert!(kind.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_task_error_converts_into_format_error() {
        let err: FormatError = TaskError {
            path: PathBuf::from("/a"),
            kind: TaskErrorKind::Formatter {
                command: "fmt".to_string(),
                code: Some(1),
            },
        }
        .into();
        assert!(matches!(err, FormatError::Task(_)));
    }
}
