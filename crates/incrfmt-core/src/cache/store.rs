use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use super::{now_secs, CacheError, Result};

/// Seconds since the Unix epoch
pub type Timestamp = f64;

/// Path → last successful format time.
///
/// Workers record completions through `&self`; everything that must not race
/// with them (`trim`, `persist`) takes `&mut self` or `self`, so the borrow
/// checker keeps snapshots from being taken while tasks are still running.
#[derive(Debug)]
pub struct CacheStore {
    /// File the store was loaded from and will be persisted to
    location: PathBuf,

    entries: Mutex<FxHashMap<PathBuf, Timestamp>>,
}

impl CacheStore {
    /// Create an empty store that persists to `location`
    pub fn empty(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Load the store from `location`.
    ///
    /// A missing file yields an empty store. A file that exists but is not a
    /// JSON object of path → number is reported as `CorruptedFile`.
    pub fn load(location: impl Into<PathBuf>) -> Result<Self> {
        let location = location.into();

        let content = match std::fs::read_to_string(&location) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No format cache at {}, starting empty", location.display());
                return Ok(Self::empty(location));
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: location,
                    source,
                })
            }
        };

        let raw: BTreeMap<String, Timestamp> =
            serde_json::from_str(&content).map_err(|e| CacheError::CorruptedFile {
                path: location.clone(),
                reason: e.to_string(),
            })?;

        let entries: FxHashMap<PathBuf, Timestamp> = raw
            .into_iter()
            .map(|(path, at)| (PathBuf::from(path), at))
            .collect();

        info!(
            "Loaded format cache with {} entries from {}",
            entries.len(),
            location.display()
        );

        Ok(Self {
            location,
            entries: Mutex::new(entries),
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<PathBuf, Timestamp>> {
        // Every critical section is a single map operation, so a panic while
        // holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last successful format time of `path`
    pub fn get(&self, path: &Path) -> Option<Timestamp> {
        self.lock().get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Record a successful format of `path` at `at`.
    ///
    /// The stored value never decreases: if an earlier run recorded a later
    /// instant (clock stepped backwards), that instant is kept. Returns the
    /// value now stored.
    pub fn record(&self, path: &Path, at: Timestamp) -> Timestamp {
        let mut entries = self.lock();
        let stored = entries.entry(path.to_path_buf()).or_insert(at);
        if *stored < at {
            *stored = at;
        }
        *stored
    }

    /// Record a successful format of `path` at the current wall-clock time
    pub fn record_now(&self, path: &Path) -> Timestamp {
        self.record(path, now_secs())
    }

    /// Drop every entry whose path is not in `current`. Returns how many
    /// entries were removed.
    pub fn trim<'a, I>(&mut self, current: I) -> usize
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let keep: FxHashSet<&Path> = current.into_iter().collect();
        let entries = self
            .entries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        let before = entries.len();
        entries.retain(|path, _| keep.contains(path.as_path()));
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Trimmed {} stale cache entries", removed);
        }
        removed
    }

    /// Sorted copy of the entries, keyed by the path's string form
    pub fn snapshot(&self) -> BTreeMap<String, Timestamp> {
        self.lock()
            .iter()
            .map(|(path, at)| (path.to_string_lossy().into_owned(), *at))
            .collect()
    }

    /// Write the store to its location, replacing any previous file.
    ///
    /// The JSON is written to a temporary file in the destination directory
    /// and renamed over the target, so readers never observe a partial cache.
    /// Consumes the store: a run persists exactly once. Returns the number of
    /// entries written.
    pub fn persist(self) -> Result<usize> {
        let snapshot = self.snapshot();
        let location = self.location;

        let dir = match location.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        serde_json::to_writer(&mut tmp, &snapshot)?;
        tmp.flush().map_err(|source| CacheError::Io {
            path: tmp.path().to_path_buf(),
            source,
        })?;
        tmp.persist(&location).map_err(|e| CacheError::Io {
            path: location.clone(),
            source: e.error,
        })?;

        info!(
            "Saved format cache with {} entries to {}",
            snapshot.len(),
            location.display()
        );
        Ok(snapshot.len())
    }

    /// Delete the persisted file at `location`. Returns whether a file existed.
    pub fn remove_persisted(location: &Path) -> Result<bool> {
        match std::fs::remove_file(location) {
            Ok(()) => {
                info!("Cache cleared: {}", location.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io {
                path: location.to_path_buf(),
                source,
            }),
        }
    }
}
