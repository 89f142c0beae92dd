//! Temporary project trees with controllable modification times

use incrfmt_core::config::{FormatConfig, FormatterConfig, ProjectConfig};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A throwaway project root
pub struct ProjectFixture {
    dir: TempDir,
    root: PathBuf,
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        // Canonical so paths match the keys a session records
        let root = dir.path().canonicalize().expect("canonicalize temp dir");
        Self { dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_dir(&self) -> &TempDir {
        &self.dir
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.path(rel)).expect("remove fixture file");
    }

    /// An executable shell script that exits 0, usable as a formatter
    pub fn fake_formatter(&self, rel: &str) -> PathBuf {
        let path = self.write(rel, "#!/bin/sh\nexit 0\n");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("make formatter executable");
        }
        path
    }

    /// A C++ layout: `src/` with `.cc`/`.hh` files, a style file and a fake
    /// formatter at `bin/clang-format`
    pub fn cpp_project(files: &[&str]) -> (Self, FormatConfig) {
        let fixture = Self::new();
        fixture.write(".clang-format", "BasedOnStyle: LLVM\n");
        let formatter = fixture.fake_formatter("bin/clang-format");
        for file in files {
            fixture.write(file, "int main() {}\n");
        }
        let config = cpp_config(&formatter);
        (fixture, config)
    }
}

/// A config with one project formatting `src/**.{cc,hh}` with `formatter`
pub fn cpp_config(formatter: &Path) -> FormatConfig {
    FormatConfig {
        formatter: FormatterConfig {
            program: formatter.to_string_lossy().into_owned(),
            args: vec![
                "-style=file:{style}".to_string(),
                "-i".to_string(),
                "{path}".to_string(),
            ],
        },
        projects: vec![ProjectConfig {
            name: Some("main".to_string()),
            subdirs: vec!["src".to_string()],
            extensions: vec!["cc".to_string(), "hh".to_string()],
            ..ProjectConfig::default()
        }],
        ..FormatConfig::default()
    }
}

/// Set the modification time of `path`
pub fn set_mtime(path: &Path, when: SystemTime) {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .expect("open file for mtime update");
    file.set_modified(when).expect("set mtime");
}

/// Move the modification time of `path` `secs` seconds into the future, so
/// it is newer than anything a run just recorded
pub fn touch_future(path: &Path, secs: u64) {
    set_mtime(path, SystemTime::now() + Duration::from_secs(secs));
}
