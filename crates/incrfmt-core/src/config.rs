use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::{CACHE_DIR_NAME, CACHE_FILE_NAME};
use crate::errors::{FormatError, Result};

/// Config file names looked up in the project root, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["incrfmt.yaml", "incrfmt.yml", "incrfmt.json"];

/// Style file used when a project does not name one
pub const DEFAULT_STYLE_FILE: &str = ".clang-format";

/// The external formatter and how to call it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatterConfig {
    /// Program name on PATH, or a path relative to the project root
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments; `{path}`, `{style}` and `{root}` are expanded per file
    #[serde(default = "default_formatter_args")]
    pub args: Vec<String>,
}

fn default_program() -> String {
    "clang-format".to_string()
}

fn default_formatter_args() -> Vec<String> {
    vec![
        "-style=file:{style}".to_string(),
        "-i".to_string(),
        "{path}".to_string(),
    ]
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_formatter_args(),
        }
    }
}

/// One source tree to keep formatted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Label used in log output
    #[serde(default)]
    pub name: Option<String>,

    /// Directory of the project, relative to the root
    #[serde(default = "default_project_root")]
    pub root: String,

    /// Subdirectories of `root` searched recursively
    #[serde(default = "default_subdirs")]
    pub subdirs: Vec<String>,

    /// File extensions to format, with or without the leading dot
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regexes denying paths, matched at the end of the absolute path
    #[serde(default)]
    pub deny: Vec<String>,

    /// Globs denying paths, matched against the path relative to `root`
    #[serde(default)]
    pub deny_globs: Vec<String>,

    /// Style file relative to the root (default: .clang-format)
    #[serde(default)]
    pub style_file: Option<String>,

    /// Extra files whose change invalidates every file of this project
    #[serde(default)]
    pub dependency_files: Vec<String>,

    /// Commands run in order on each file before formatting
    #[serde(default)]
    pub preprocess: Vec<Vec<String>>,
}

fn default_project_root() -> String {
    ".".to_string()
}

fn default_subdirs() -> Vec<String> {
    vec![".".to_string()]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: None,
            root: default_project_root(),
            subdirs: default_subdirs(),
            extensions: Vec::new(),
            deny: Vec::new(),
            deny_globs: Vec::new(),
            style_file: None,
            dependency_files: Vec::new(),
            preprocess: Vec::new(),
        }
    }
}

impl ProjectConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.root)
    }

    pub fn style_file(&self) -> &str {
        self.style_file.as_deref().unwrap_or(DEFAULT_STYLE_FILE)
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatConfig {
    #[serde(default)]
    pub formatter: FormatterConfig,

    /// Cache directory, relative to the root
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    /// Worker count (default: host parallelism)
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Extra files whose change invalidates every cached file
    #[serde(default)]
    pub global_dependencies: Vec<String>,

    #[serde(default)]
    pub projects: Vec<ProjectConfig>,

    /// File this config was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

fn default_cache_dir() -> String {
    CACHE_DIR_NAME.to_string()
}

fn default_cache_file() -> String {
    CACHE_FILE_NAME.to_string()
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            formatter: FormatterConfig::default(),
            cache_dir: default_cache_dir(),
            cache_file: default_cache_file(),
            jobs: None,
            global_dependencies: Vec::new(),
            projects: Vec::new(),
            source: None,
        }
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub jobs: Option<usize>,
    pub cache_dir: Option<String>,
    pub formatter: Option<String>,
}

impl FormatConfig {
    /// Load configuration from a YAML or JSON file, chosen by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FormatError::Config(format!("{}: {}", path.display(), e)))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let mut config: FormatConfig = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| FormatError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| FormatError::Config(format!("{}: {}", path.display(), e)))?
        };

        config.source = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Find the config file in `root`
    pub fn locate(root: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
    }

    /// Load `explicit` if given, otherwise the config file found in `root`
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::locate(root) {
                Some(path) => Self::from_file(&path),
                None => Err(FormatError::Config(format!(
                    "no {} found in {} (run with --init to create one)",
                    CONFIG_FILE_NAMES[0],
                    root.display()
                ))),
            },
        }
    }

    /// Write the sample configuration into `root`
    pub fn init_file(root: &Path) -> Result<PathBuf> {
        let path = root.join(CONFIG_FILE_NAMES[0]);
        if path.exists() {
            return Err(FormatError::Config(format!(
                "{} already exists",
                path.display()
            )));
        }
        std::fs::write(&path, SAMPLE_CONFIG)
            .map_err(|e| FormatError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }

    /// Merge CLI overrides into this configuration
    pub fn merge(&mut self, overrides: &CliOverrides) {
        if let Some(jobs) = overrides.jobs {
            self.jobs = Some(jobs);
        }
        if let Some(ref cache_dir) = overrides.cache_dir {
            self.cache_dir = cache_dir.clone();
        }
        if let Some(ref formatter) = overrides.formatter {
            self.formatter.program = formatter.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.projects.is_empty() {
            return Err(FormatError::Config("no projects configured".to_string()));
        }
        if self.jobs == Some(0) {
            return Err(FormatError::Config("jobs must be at least 1".to_string()));
        }
        if self.cache_file.is_empty() {
            return Err(FormatError::Config("cacheFile must not be empty".to_string()));
        }

        for project in &self.projects {
            if project.extensions.is_empty() {
                return Err(FormatError::Config(format!(
                    "project '{}' lists no extensions",
                    project.display_name()
                )));
            }
            if project.preprocess.iter().any(Vec::is_empty) {
                return Err(FormatError::Config(format!(
                    "project '{}' has an empty preprocess command",
                    project.display_name()
                )));
            }
        }
        Ok(())
    }

    /// Absolute location of the cache file for `root`
    pub fn cache_location(&self, root: &Path) -> PathBuf {
        root.join(&self.cache_dir).join(&self.cache_file)
    }
}

/// Written by `incrfmt --init`
pub const SAMPLE_CONFIG: &str = r##"# incrfmt configuration
#
# Paths are relative to the root directory passed to incrfmt unless absolute.
# In formatter arguments and preprocess commands, {path} is the file being
# formatted, {style} its style file and {root} the project root.

formatter:
  program: clang-format
  args: ["-style=file:{style}", "-i", "{path}"]

cacheDir: .cache
cacheFile: format.json

# jobs: 8                      # default: number of CPUs
# globalDependencies: []       # files whose change reformats everything

projects:
  - name: main
    root: .
    subdirs: [include/, src/, test/]
    extensions: [c, cc, h, hh]
    deny:                      # regexes, matched at the end of the path
      - "test/.*_test_cases/.*"
    styleFile: .clang-format
    preprocess:
      # Turn "project/*" includes into <project/*>
      - ["sed", "s@^#include \"\\(project/.*\\)\"$@#include <\\1>@", "-i", "{path}"]
"##;
