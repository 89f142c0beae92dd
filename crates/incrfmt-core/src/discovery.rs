use glob::Pattern;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::{FormatError, Result};

/// Set of denial predicates; any match excludes a path.
///
/// Regexes are anchored at the end of the absolute path string, so
/// `src/gen\.hh` denies `/any/where/src/gen.hh`. Globs are matched against the
/// path relative to the discovery root.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    regexes: Vec<Regex>,
    globs: Vec<Pattern>,
}

impl DenyList {
    pub fn new<R, G>(regexes: &[R], globs: &[G]) -> Result<Self>
    where
        R: AsRef<str>,
        G: AsRef<str>,
    {
        let regexes = regexes
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(&format!("(?:{})$", pattern)).map_err(|e| FormatError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let globs = globs
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Pattern::new(pattern).map_err(|e| FormatError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { regexes, globs })
    }

    pub fn is_empty(&self) -> bool {
        self.regexes.is_empty() && self.globs.is_empty()
    }

    /// Whether `path` (absolute) or `relative` (to the discovery root) is denied
    pub fn is_denied(&self, path: &Path, relative: &Path) -> bool {
        let absolute = path.to_string_lossy();
        if self.regexes.iter().any(|re| re.is_match(&absolute)) {
            return true;
        }

        let relative = relative.to_string_lossy();
        self.globs.iter().any(|glob| glob.matches(&relative))
    }
}

/// Lexically resolve `.` and `..` components.
///
/// Symlinks are not consulted, so `a/link/..` becomes `a`. `..` above the
/// filesystem root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(Component::ParentDir),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Enumerates candidate source files below a root.
///
/// Discovery is lazy and restartable: every call to [`iter`](Self::iter)
/// walks the filesystem afresh. Overlapping subdirectories yield the same
/// path more than once.
#[derive(Debug, Clone)]
pub struct Discoverer {
    root: PathBuf,
    subdirs: Vec<PathBuf>,
    /// Suffixes including the leading dot
    extensions: Vec<String>,
    deny: DenyList,
}

impl Discoverer {
    pub fn new<S, E>(root: impl Into<PathBuf>, subdirs: S, extensions: E, deny: DenyList) -> Self
    where
        S: IntoIterator,
        S::Item: Into<PathBuf>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref();
                let ext = ext.strip_prefix('.').unwrap_or(ext);
                format!(".{}", ext)
            })
            .collect();

        Self {
            root: normalize_path(&root.into()),
            subdirs: subdirs.into_iter().map(Into::into).collect(),
            extensions,
            deny,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a file at `path` would be yielded by discovery
    pub fn qualifies(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if !self.extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            return false;
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        !self.deny.is_denied(path, relative)
    }

    /// Walk all subdirectories in order, yielding qualifying files
    pub fn iter(&self) -> Discovery<'_> {
        Discovery {
            discoverer: self,
            subdirs: self.subdirs.iter(),
            walker: None,
        }
    }
}

/// Lazy iterator returned by [`Discoverer::iter`]
pub struct Discovery<'a> {
    discoverer: &'a Discoverer,
    subdirs: std::slice::Iter<'a, PathBuf>,
    walker: Option<walkdir::IntoIter>,
}

impl Iterator for Discovery<'_> {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(walker) = self.walker.as_mut() {
                match walker.next() {
                    Some(Ok(entry)) => {
                        if entry.file_type().is_file() && self.discoverer.qualifies(entry.path()) {
                            return Some(Ok(entry.into_path()));
                        }
                        continue;
                    }
                    Some(Err(source)) => {
                        let path = source
                            .path()
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|| self.discoverer.root.clone());
                        return Some(Err(FormatError::Discovery { path, source }));
                    }
                    None => self.walker = None,
                }
            }

            let subdir = self.subdirs.next()?;
            let dir = normalize_path(&self.discoverer.root.join(subdir));
            if !dir.is_dir() {
                debug!("Skipping missing directory {}", dir.display());
                continue;
            }

            self.walker = Some(
                WalkDir::new(dir)
                    .follow_links(false)
                    .sort_by_file_name()
                    .into_iter(),
            );
        }
    }
}
