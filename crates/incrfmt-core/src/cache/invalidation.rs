use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{modified_secs, CacheStore, Timestamp};
use crate::descriptor::SourceDescriptor;
use crate::errors::{FormatError, Result};

/// Why a descriptor does or does not need formatting
#[derive(Debug, Clone, PartialEq)]
pub enum Staleness {
    /// Cached and nothing it depends on changed since
    Fresh,

    /// Never formatted successfully (or trimmed from the cache)
    Uncached,

    /// The source file itself was modified after the last format
    SourceChanged,

    /// One of the descriptor's own dependency files changed
    DependencyChanged(PathBuf),

    /// A process-wide dependency (formatter, incrfmt itself, config) changed
    GlobalChanged,
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Staleness::Fresh)
    }
}

/// Decides which descriptors need formatting.
///
/// Holds only the newest modification time among the global dependencies,
/// which is read once at construction. Per-file dependency times are read on
/// demand and memoized within a single [`select_stale`](Self::select_stale)
/// pass, since many descriptors usually share one style file.
#[derive(Debug, Clone)]
pub struct StalenessEvaluator {
    global_newest: Option<Timestamp>,
}

impl StalenessEvaluator {
    /// Create an evaluator over the given global dependencies.
    ///
    /// Every global dependency must exist; an unreadable one is a
    /// `DependencyResolution` error.
    pub fn new<I, P>(global_dependencies: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut global_newest: Option<Timestamp> = None;

        for dependency in global_dependencies {
            let dependency = dependency.as_ref();
            let modified = dependency_mtime(dependency)?;
            debug!("Global dependency {} at {}", dependency.display(), modified);
            global_newest = Some(global_newest.map_or(modified, |n| n.max(modified)));
        }

        Ok(Self { global_newest })
    }

    /// Create an evaluator from an already known global modification time
    pub fn with_global_newest(global_newest: Option<Timestamp>) -> Self {
        Self { global_newest }
    }

    pub fn global_newest(&self) -> Option<Timestamp> {
        self.global_newest
    }

    /// Whether `descriptor` must be formatted again
    pub fn needs_reformat(&self, descriptor: &SourceDescriptor, cache: &CacheStore) -> Result<bool> {
        let mut memo = FxHashMap::default();
        Ok(self.evaluate(descriptor, cache, &mut memo)?.is_stale())
    }

    /// Classify `descriptor` against the cache
    pub fn staleness(&self, descriptor: &SourceDescriptor, cache: &CacheStore) -> Result<Staleness> {
        let mut memo = FxHashMap::default();
        self.evaluate(descriptor, cache, &mut memo)
    }

    /// Every descriptor that needs formatting, in input order
    pub fn select_stale<'d>(
        &self,
        descriptors: &'d [SourceDescriptor],
        cache: &CacheStore,
    ) -> Result<Vec<&'d SourceDescriptor>> {
        let mut memo = FxHashMap::default();
        let mut stale = Vec::new();

        for descriptor in descriptors {
            let staleness = self.evaluate(descriptor, cache, &mut memo)?;
            if staleness.is_stale() {
                debug!("{} is stale: {:?}", descriptor.path().display(), staleness);
                stale.push(descriptor);
            }
        }

        Ok(stale)
    }

    fn evaluate(
        &self,
        descriptor: &SourceDescriptor,
        cache: &CacheStore,
        memo: &mut FxHashMap<PathBuf, Timestamp>,
    ) -> Result<Staleness> {
        // Dependencies are read even for uncached files, so a missing style
        // file fails the plan on a cold cache too.
        let mut newest_dependency: Option<(&PathBuf, Timestamp)> = None;
        for dependency in descriptor.dependency_files() {
            let modified = match memo.get(dependency) {
                Some(modified) => *modified,
                None => {
                    let modified = dependency_mtime(dependency)?;
                    memo.insert(dependency.clone(), modified);
                    modified
                }
            };
            if newest_dependency.map_or(true, |(_, newest)| newest < modified) {
                newest_dependency = Some((dependency, modified));
            }
        }

        let Some(formatted_at) = cache.get(descriptor.path()) else {
            return Ok(Staleness::Uncached);
        };

        let source_mtime =
            modified_secs(descriptor.path()).map_err(|source| FormatError::Metadata {
                path: descriptor.path().to_path_buf(),
                source,
            })?;
        if formatted_at < source_mtime {
            return Ok(Staleness::SourceChanged);
        }

        if let Some(global_newest) = self.global_newest {
            if formatted_at < global_newest {
                return Ok(Staleness::GlobalChanged);
            }
        }

        if let Some((dependency, modified)) = newest_dependency {
            if formatted_at < modified {
                return Ok(Staleness::DependencyChanged(dependency.clone()));
            }
        }

        Ok(Staleness::Fresh)
    }
}

fn dependency_mtime(path: &Path) -> Result<Timestamp> {
    modified_secs(path).map_err(|e| FormatError::DependencyResolution {
        name: path.display().to_string(),
        reason: e.to_string(),
    })
}
