use indexmap::IndexSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// An external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new<S, I, A>(program: S, args: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a command from an argv vector, `None` if it is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Values substituted into command templates
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    /// Absolute source path, `{path}`
    pub path: &'a Path,
    /// Absolute style file, `{style}`
    pub style: &'a Path,
    /// Project root, `{root}`
    pub root: &'a Path,
}

/// Expand `{path}`, `{style}` and `{root}` in `template`
pub fn expand_template(template: &str, vars: &TemplateVars<'_>) -> String {
    template
        .replace("{path}", &vars.path.to_string_lossy())
        .replace("{style}", &vars.style.to_string_lossy())
        .replace("{root}", &vars.root.to_string_lossy())
}

/// Expand every element of an argv template into a command
pub fn expand_command(argv: &[String], vars: &TemplateVars<'_>) -> Option<ExternalCommand> {
    let expanded: Vec<String> = argv.iter().map(|arg| expand_template(arg, vars)).collect();
    ExternalCommand::from_argv(&expanded)
}

/// One unit of formatting work.
///
/// The path is the unique key of the descriptor and of its cache entry.
/// Descriptors are built during discovery and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    path: PathBuf,

    /// Style configuration handed to the formatter
    style_file: PathBuf,

    /// Files whose change forces this source to be formatted again
    dependency_files: IndexSet<PathBuf>,

    /// Run in order before the formatter
    preprocess_commands: Vec<ExternalCommand>,
}

impl SourceDescriptor {
    pub fn new(path: impl Into<PathBuf>, style_file: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            style_file: style_file.into(),
            dependency_files: IndexSet::new(),
            preprocess_commands: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: impl Into<PathBuf>) -> Self {
        self.dependency_files.insert(dependency.into());
        self
    }

    pub fn with_dependencies<I, P>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.dependency_files
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_preprocess(mut self, command: ExternalCommand) -> Self {
        self.preprocess_commands.push(command);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn style_file(&self) -> &Path {
        &self.style_file
    }

    pub fn dependency_files(&self) -> impl Iterator<Item = &PathBuf> + '_ {
        self.dependency_files.iter()
    }

    pub fn preprocess_commands(&self) -> &[ExternalCommand] {
        &self.preprocess_commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template() {
        let vars = TemplateVars {
            path: Path::new("/proj/src/a.cc"),
            style: Path::new("/proj/.clang-format"),
            root: Path::new("/proj"),
        };

        assert_eq!(
            expand_template("-style=file:{style}", &vars),
            "-style=file:/proj/.clang-format"
        );
        assert_eq!(expand_template("{root}/x {path}", &vars), "/proj/x /proj/src/a.cc");
        assert_eq!(expand_template("-i", &vars), "-i");
    }

    #[test]
    fn test_expand_command() {
        let vars = TemplateVars {
            path: Path::new("/p/a.cc"),
            style: Path::new("/p/s"),
            root: Path::new("/p"),
        };
        let argv = vec!["sed".to_string(), "-i".to_string(), "{path}".to_string()];

        let command = expand_command(&argv, &vars).unwrap();
        assert_eq!(command.program(), "sed");
        assert_eq!(command.args(), ["-i", "/p/a.cc"]);
        assert_eq!(command.to_string(), "sed -i /p/a.cc");

        assert!(expand_command(&[], &vars).is_none());
    }

    #[test]
    fn test_dependencies_are_ordered_and_unique() {
        let descriptor = SourceDescriptor::new("/p/a.cc", "/p/style")
            .with_dependency("/p/style")
            .with_dependencies(["/p/extra", "/p/style"]);

        let deps: Vec<_> = descriptor.dependency_files().cloned().collect();
        assert_eq!(
            deps,
            vec![PathBuf::from("/p/style"), PathBuf::from("/p/extra")]
        );
    }
}
