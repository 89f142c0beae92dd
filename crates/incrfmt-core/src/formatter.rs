use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::FormatterConfig;
use crate::descriptor::{expand_template, ExternalCommand, SourceDescriptor, TemplateVars};
use crate::errors::{FormatError, Result};

/// The resolved external formatter
#[derive(Debug, Clone)]
pub struct Formatter {
    executable: PathBuf,
    args: Vec<String>,
    root: PathBuf,
}

impl Formatter {
    /// Resolve the configured program to an executable.
    ///
    /// A program containing a path separator is taken relative to `root`;
    /// a bare name is looked up on `PATH`.
    pub fn resolve(config: &FormatterConfig, root: &Path) -> Result<Self> {
        let program = Path::new(&config.program);
        let candidate = if program.components().count() > 1 || program.is_absolute() {
            root.join(program)
        } else {
            program.to_path_buf()
        };

        let executable =
            which::which(&candidate).map_err(|e| FormatError::DependencyResolution {
                name: config.program.clone(),
                reason: e.to_string(),
            })?;
        debug!("Formatter resolved to {}", executable.display());

        Ok(Self {
            executable,
            args: config.args.clone(),
            root: root.to_path_buf(),
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// The invocation that formats `descriptor` in place
    pub fn command_for(&self, descriptor: &SourceDescriptor) -> ExternalCommand {
        let vars = TemplateVars {
            path: descriptor.path(),
            style: descriptor.style_file(),
            root: &self.root,
        };
        ExternalCommand::new(
            self.executable.to_string_lossy(),
            self.args.iter().map(|arg| expand_template(arg, &vars)),
        )
    }
}
