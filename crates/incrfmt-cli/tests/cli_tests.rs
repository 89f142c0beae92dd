use assert_cmd::Command;
use predicates::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn incrfmt_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("incrfmt"))
}

/// A project formatting `src/*.cc` with `formatter`, which ignores its
/// arguments (`true`, `false`)
fn setup_project(formatter: &str, files: &[&str]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::write(root.join(".clang-format"), "BasedOnStyle: LLVM\n").unwrap();
    fs::write(
        root.join("incrfmt.yaml"),
        format!(
            r#"formatter:
  program: "{}"
projects:
  - subdirs: [src]
    extensions: [cc]
"#,
            formatter
        ),
    )
    .unwrap();

    fs::create_dir_all(root.join("src")).unwrap();
    for file in files {
        fs::write(root.join("src").join(file), "int main() {}\n").unwrap();
    }
    temp_dir
}

fn read_cache(root: &Path) -> BTreeMap<String, f64> {
    let content = fs::read_to_string(root.join(".cache/format.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

// ============================================================================
// INITIALIZATION TESTS
// ============================================================================

#[test]
fn test_init_creates_config_file() {
    let temp_dir = TempDir::new().unwrap();

    incrfmt_cmd()
        .current_dir(&temp_dir)
        .arg("--init")
        .assert()
        .success()
        .stdout(predicate::str::contains("incrfmt.yaml"));

    let config = fs::read_to_string(temp_dir.path().join("incrfmt.yaml")).unwrap();
    assert!(config.contains("formatter"));
    assert!(config.contains("projects"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("incrfmt.yaml"), "projects: []\n").unwrap();

    incrfmt_cmd()
        .current_dir(&temp_dir)
        .arg("--init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let config = fs::read_to_string(temp_dir.path().join("incrfmt.yaml")).unwrap();
    assert_eq!(config, "projects: []\n");
}

#[test]
fn test_missing_config_fails() {
    let temp_dir = TempDir::new().unwrap();

    incrfmt_cmd()
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--init"));
}

// ============================================================================
// INCREMENTAL RUN TESTS
// ============================================================================

#[test]
fn test_first_run_formats_all_then_nothing() {
    let temp_dir = setup_project("true", &["a.cc", "b.cc", "notes.txt"]);

    incrfmt_cmd()
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 files to format."));

    let cache = read_cache(temp_dir.path());
    assert_eq!(cache.len(), 2);
    assert!(cache.keys().all(|k| k.ends_with(".cc")));

    incrfmt_cmd()
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0 files to format."));
}

#[test]
fn test_root_defaults_to_current_dir() {
    let temp_dir = setup_project("true", &["a.cc"]);

    incrfmt_cmd()
        .current_dir(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files to format."));
}

#[test]
fn test_explicit_config_path() {
    let temp_dir = setup_project("true", &["a.cc"]);
    fs::rename(
        temp_dir.path().join("incrfmt.yaml"),
        temp_dir.path().join("format-settings.yaml"),
    )
    .unwrap();

    incrfmt_cmd()
        .arg(temp_dir.path())
        .arg("--config")
        .arg(temp_dir.path().join("format-settings.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files to format."));
}

#[cfg(unix)]
#[test]
fn test_preprocess_runs_before_formatter() {
    let temp_dir = setup_project("true", &["a.cc"]);
    fs::write(
        temp_dir.path().join("incrfmt.yaml"),
        r#"formatter:
  program: "true"
projects:
  - subdirs: [src]
    extensions: [cc]
    preprocess:
      - ["sh", "-c", "echo '// checked' >> \"$0\"", "{path}"]
"#,
    )
    .unwrap();

    incrfmt_cmd().arg(temp_dir.path()).assert().success();

    let source = fs::read_to_string(temp_dir.path().join("src/a.cc")).unwrap();
    assert!(source.ends_with("// checked\n"));
}

// ============================================================================
// FAILURE TESTS
// ============================================================================

#[cfg(unix)]
#[test]
fn test_failing_formatter_exits_with_error() {
    let temp_dir = setup_project("false", &["a.cc", "b.cc"]);

    incrfmt_cmd()
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to format"));

    // Failed files are not recorded
    let cache = read_cache(temp_dir.path());
    assert!(cache.is_empty());
}

#[test]
fn test_unknown_formatter_fails_before_formatting() {
    let temp_dir = setup_project("no-such-formatter-on-path", &["a.cc"]);

    incrfmt_cmd()
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-formatter-on-path"));

    assert!(!temp_dir.path().join(".cache").exists());
}

#[test]
fn test_zero_jobs_is_rejected() {
    let temp_dir = setup_project("true", &["a.cc"]);

    incrfmt_cmd()
        .arg(temp_dir.path())
        .args(["-j", "0"])
        .assert()
        .failure();
}

// ============================================================================
// CACHE FLAG TESTS
// ============================================================================

#[test]
fn test_dry_run_lists_files_and_writes_no_cache() {
    let temp_dir = setup_project("true", &["a.cc"]);

    incrfmt_cmd()
        .arg(temp_dir.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files to format."))
        .stdout(predicate::str::contains("a.cc"));

    assert!(!temp_dir.path().join(".cache/format.json").exists());
}

#[test]
fn test_no_cache_reformats_everything() {
    let temp_dir = setup_project("true", &["a.cc", "b.cc"]);
    incrfmt_cmd().arg(temp_dir.path()).assert().success();
    let before = read_cache(temp_dir.path());

    incrfmt_cmd()
        .arg(temp_dir.path())
        .arg("--no-cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 files to format."));

    assert_eq!(read_cache(temp_dir.path()), before);
}

#[test]
fn test_clear_cache() {
    let temp_dir = setup_project("true", &["a.cc"]);
    incrfmt_cmd().arg(temp_dir.path()).assert().success();

    incrfmt_cmd()
        .arg(temp_dir.path())
        .arg("--clear-cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    assert!(!temp_dir.path().join(".cache/format.json").exists());

    incrfmt_cmd()
        .arg(temp_dir.path())
        .arg("--clear-cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("No cache"));
}

#[test]
fn test_cache_dir_override() {
    let temp_dir = setup_project("true", &["a.cc"]);

    incrfmt_cmd()
        .arg(temp_dir.path())
        .args(["--cache-dir", "build/fmt"])
        .assert()
        .success();

    assert!(temp_dir.path().join("build/fmt/format.json").exists());
    assert!(!temp_dir.path().join(".cache").exists());
}

#[test]
fn test_verbose_logs_to_stderr() {
    let temp_dir = setup_project("true", &["a.cc"]);

    incrfmt_cmd()
        .arg(temp_dir.path())
        .arg("-v")
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files to format."))
        .stderr(predicate::str::contains("DEBUG"));
}

#[test]
fn test_default_level_is_info() {
    let temp_dir = setup_project("true", &["a.cc"]);

    incrfmt_cmd()
        .arg(temp_dir.path())
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO"))
        .stderr(predicate::str::contains("DEBUG").not());
}

#[test]
fn test_rust_log_replaces_default_level() {
    let temp_dir = setup_project("true", &["a.cc"]);

    incrfmt_cmd()
        .arg(temp_dir.path())
        .env("RUST_LOG", "warn")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files to format."))
        .stderr(predicate::str::contains("INFO").not());
}
