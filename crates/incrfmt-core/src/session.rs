use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheError, CacheStore, StalenessEvaluator};
use crate::config::{FormatConfig, ProjectConfig};
use crate::descriptor::{expand_command, SourceDescriptor, TemplateVars};
use crate::discovery::{normalize_path, DenyList, Discoverer};
use crate::errors::{FormatError, Result, TaskError};
use crate::executor::ParallelExecutor;
use crate::formatter::Formatter;
use crate::runner::{CommandRunner, SystemRunner};

/// Everything decided before any external command runs
#[derive(Debug)]
pub struct FormatPlan {
    formatter: Formatter,
    descriptors: Vec<SourceDescriptor>,
    stale: Vec<SourceDescriptor>,
    cache: CacheStore,
    trimmed: usize,
}

impl FormatPlan {
    /// All discovered descriptors, deduplicated by path
    pub fn descriptors(&self) -> &[SourceDescriptor] {
        &self.descriptors
    }

    /// Descriptors that need formatting
    pub fn stale(&self) -> &[SourceDescriptor] {
        &self.stale
    }

    pub fn stale_count(&self) -> usize {
        self.stale.len()
    }

    /// Cache entries dropped because their file is no longer discovered
    pub fn trimmed(&self) -> usize {
        self.trimmed
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }
}

/// Result of an executed plan
#[derive(Debug)]
pub struct RunReport {
    pub discovered: usize,
    pub stale: usize,
    pub formatted: Vec<PathBuf>,
    pub failures: Vec<TaskError>,
    /// Entries in the cache after the final trim
    pub cached_entries: usize,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Surface the first task failure, if any
    pub fn into_result(mut self) -> Result<RunReport> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        let first = self.failures.remove(0);
        Err(FormatError::Task(first))
    }
}

/// Wires configuration, formatter, command runner and cache into one run
pub struct FormatSession {
    root: PathBuf,
    config: FormatConfig,
    runner: Arc<dyn CommandRunner>,
    use_cache: bool,
}

impl FormatSession {
    /// Create a session that spawns real processes
    pub fn new(root: &Path, config: FormatConfig) -> Result<Self> {
        Self::with_runner(root, config, Arc::new(SystemRunner::new()))
    }

    /// Create a session with a custom command runner (for testing)
    pub fn with_runner(
        root: &Path,
        config: FormatConfig,
        runner: Arc<dyn CommandRunner>,
    ) -> Result<Self> {
        let root = root.canonicalize().map_err(|source| FormatError::Metadata {
            path: root.to_path_buf(),
            source,
        })?;

        Ok(Self {
            root,
            config,
            runner,
            use_cache: true,
        })
    }

    /// When disabled, the persisted cache is neither read nor written
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    pub fn cache_location(&self) -> PathBuf {
        self.config.cache_location(&self.root)
    }

    /// Delete the persisted cache. Returns whether one existed.
    pub fn clear_cache(&self) -> Result<bool> {
        Ok(CacheStore::remove_persisted(&self.cache_location())?)
    }

    /// Discover every configured project and build its descriptors.
    ///
    /// A path reached through several subdirectories or projects is kept
    /// once, with the settings of the first project that found it.
    pub fn discover(&self) -> Result<Vec<SourceDescriptor>> {
        let mut descriptors: IndexMap<PathBuf, SourceDescriptor> = IndexMap::new();

        for project in &self.config.projects {
            let before = descriptors.len();
            for path in self.discoverer(project)?.iter() {
                let path = path?;
                if descriptors.contains_key(&path) {
                    debug!("Ignoring duplicate {}", path.display());
                    continue;
                }
                let descriptor = self.describe(project, path.clone())?;
                descriptors.insert(path, descriptor);
            }
            debug!(
                "Project {}: {} file(s)",
                project.display_name(),
                descriptors.len() - before
            );
        }

        Ok(descriptors.into_values().collect())
    }

    fn discoverer(&self, project: &ProjectConfig) -> Result<Discoverer> {
        let deny = DenyList::new(project.deny.as_slice(), project.deny_globs.as_slice())?;
        Ok(Discoverer::new(
            self.root.join(&project.root),
            &project.subdirs,
            &project.extensions,
            deny,
        ))
    }

    fn describe(&self, project: &ProjectConfig, path: PathBuf) -> Result<SourceDescriptor> {
        let style_file = normalize_path(&self.root.join(project.style_file()));
        let vars = TemplateVars {
            path: &path,
            style: &style_file,
            root: &self.root,
        };

        let preprocess = project
            .preprocess
            .iter()
            .map(|argv| {
                expand_command(argv, &vars).ok_or_else(|| {
                    FormatError::Config(format!(
                        "project '{}' has an empty preprocess command",
                        project.display_name()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let dependencies = project
            .dependency_files
            .iter()
            .map(|dependency| normalize_path(&self.root.join(dependency)));

        let mut descriptor = SourceDescriptor::new(path.clone(), style_file.clone())
            .with_dependency(style_file)
            .with_dependencies(dependencies);
        for command in preprocess {
            descriptor = descriptor.with_preprocess(command);
        }
        Ok(descriptor)
    }

    /// Files whose change invalidates every descriptor
    pub fn global_dependencies(&self, formatter: &Formatter) -> Vec<PathBuf> {
        let mut dependencies = vec![formatter.executable().to_path_buf()];

        match std::env::current_exe() {
            Ok(exe) if exe.is_file() => dependencies.push(exe),
            Ok(exe) => warn!("Own executable {} not found, not tracking it", exe.display()),
            Err(e) => warn!("Cannot locate own executable: {}", e),
        }

        if let Some(ref source) = self.config.source {
            dependencies.push(source.clone());
        }

        dependencies.extend(
            self.config
                .global_dependencies
                .iter()
                .map(|dependency| normalize_path(&self.root.join(dependency))),
        );
        dependencies
    }

    fn load_cache(&self) -> CacheStore {
        let location = self.cache_location();
        if !self.use_cache {
            return CacheStore::empty(location);
        }

        match CacheStore::load(&location) {
            Ok(store) => store,
            Err(e @ CacheError::CorruptedFile { .. }) => {
                warn!("{}; starting with an empty cache", e);
                CacheStore::empty(location)
            }
            Err(e) => {
                warn!("Failed to read format cache: {}; starting empty", e);
                CacheStore::empty(location)
            }
        }
    }

    /// Resolve the formatter, discover sources, load and trim the cache, and
    /// pick the stale descriptors. Runs no external command.
    pub fn plan(&self) -> Result<FormatPlan> {
        let formatter = Formatter::resolve(&self.config.formatter, &self.root)?;
        let descriptors = self.discover()?;
        let evaluator = StalenessEvaluator::new(self.global_dependencies(&formatter))?;

        let mut cache = self.load_cache();
        let trimmed = cache.trim(descriptors.iter().map(SourceDescriptor::path));

        let stale: Vec<SourceDescriptor> = evaluator
            .select_stale(&descriptors, &cache)?
            .into_iter()
            .cloned()
            .collect();

        info!(
            "{} of {} file(s) need formatting",
            stale.len(),
            descriptors.len()
        );

        Ok(FormatPlan {
            formatter,
            descriptors,
            stale,
            cache,
            trimmed,
        })
    }

    /// Format every stale descriptor, then trim and persist the cache once.
    ///
    /// Task failures do not abort the run; they are returned in the report.
    /// A persistence failure is returned as an error after all tasks ran.
    pub fn execute(&self, plan: FormatPlan) -> Result<RunReport> {
        let FormatPlan {
            formatter,
            descriptors,
            stale,
            mut cache,
            ..
        } = plan;

        let stale_refs: Vec<&SourceDescriptor> = stale.iter().collect();
        let summary = ParallelExecutor::new(self.runner.as_ref(), &formatter)
            .jobs(self.config.jobs)
            .execute(&stale_refs, &cache)?;

        cache.trim(descriptors.iter().map(SourceDescriptor::path));
        let cached_entries = cache.len();

        if self.use_cache {
            if let Err(e) = cache.persist() {
                for failure in &summary.failures {
                    error!("{}", failure);
                }
                return Err(e.into());
            }
        }

        for failure in &summary.failures {
            error!("{}", failure);
        }

        Ok(RunReport {
            discovered: descriptors.len(),
            stale: stale.len(),
            formatted: summary.completed,
            failures: summary.failures,
            cached_entries,
        })
    }

    /// Plan and execute, failing with the first task error if any task failed
    pub fn run(&self) -> Result<RunReport> {
        let plan = self.plan()?;
        self.execute(plan)?.into_result()
    }
}
