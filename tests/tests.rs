use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tokio::io::AsyncWriteExt;
use tracked_temp::{exit_hook, Affixes, CleanupReport, Counts, Error, Temp};

fn tracked() -> Temp {
    let temp = Temp::new();
    temp.track(true);
    temp
}

const EXIT_MODE_VAR: &str = "TRACKED_TEMP_EXIT_MODE";

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[tokio::test]
async fn mkdir_is_removed_with_contents() {
    let temp = tracked();
    let dir = temp.mkdir("foo").await.unwrap();
    assert!(file_name(&dir).starts_with("foo"));
    assert!(dir.is_dir());

    std::fs::write(dir.join("a file"), "a content").unwrap();
    let report = temp.cleanup_sync().unwrap();
    assert_eq!(report.dirs, Counts { removed: 1, missing: 0 });
    assert!(!dir.exists());
}

#[test]
fn mkdir_sync_is_removed_with_contents() {
    let temp = tracked();
    let dir = temp.mkdir_sync("foo").unwrap();
    std::fs::create_dir(dir.join("nested")).unwrap();
    std::fs::write(dir.join("nested").join("a file"), "a content").unwrap();

    temp.cleanup_sync().unwrap();
    assert!(!dir.exists());
}

#[test]
fn open_sync_then_cleanup_sync() {
    let temp = tracked();
    let mut file = temp.open_sync("bar").unwrap();
    file.write_all(b"foo").unwrap();
    let (path, handle) = file.into_parts();
    drop(handle);
    assert!(file_name(&path).starts_with("bar"));
    assert!(path.is_file());

    temp.cleanup_sync().unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn open_sync_then_cleanup_reports_counts() {
    let temp = tracked();
    let (path, handle) = temp.open_sync(()).unwrap().into_parts();
    drop(handle);
    assert!(path.exists());

    let report = temp.cleanup().await.unwrap();
    assert_eq!(
        report,
        CleanupReport {
            files: Counts { removed: 1, missing: 0 },
            dirs: Counts { removed: 0, missing: 0 },
        }
    );
    assert!(!path.exists());
}

#[tokio::test]
async fn stream_and_directories_are_cleaned_together() {
    let temp = tracked();
    let mut stream = temp.create_write_stream("baz").await.unwrap();
    stream.write_all(b"foo").await.unwrap();
    stream.write_all(b"More text here\nand more...").await.unwrap();
    stream.shutdown().await.unwrap();
    assert!(stream.path().is_file());

    let plain = temp.mkdir_sync("foobar").unwrap();
    let custom = temp.mkdir_sync(Affixes::default().mode_str("0711")).unwrap();
    let fallback = temp.mkdir_sync(Affixes::default().mode_str("zzz")).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(custom.as_path()), 0o711);
        assert_eq!(mode(fallback.as_path()), 0o700);
    }

    let report = temp.cleanup_sync().unwrap();
    assert_eq!(report.files.removed, 1);
    assert_eq!(report.dirs.removed, 3);
    for path in [stream.path(), plain.as_path(), custom.as_path(), fallback.as_path()] {
        assert!(!path.exists());
    }
}

#[test]
fn path_uses_default_or_given_directory() {
    let temp = Temp::new();
    let path = temp.path((), None);
    assert_eq!(path.parent(), Some(temp.dir().as_path()));
    assert!(path.is_absolute());

    let cwd = std::env::current_dir().unwrap();
    let path = temp.path(Affixes::from("p-").suffix(".s").dir(&cwd), None);
    assert_eq!(path.parent(), Some(cwd.as_path()));
    assert!(file_name(&path).starts_with("p-"));
    assert!(file_name(&path).ends_with(".s"));
}

#[test]
fn dynamic_affixes_are_validated() {
    let temp = Temp::new();
    let affixes = Affixes::from_json(r#"{"prefix": "dyn-", "dir": "/srv/tmp"}"#).unwrap();
    let path = temp.path(affixes, Some("f-"));
    assert_eq!(path.parent(), Some(Path::new("/srv/tmp")));
    assert!(file_name(&path).starts_with("dyn-"));

    assert!(matches!(
        Affixes::from_json("[\"dyn-\"]"),
        Err(Error::InvalidAffixSpec(_))
    ));
}

#[test]
fn singleton_exit_hook() {
    let temp = tracked();
    let other = tracked();
    for _ in 0..=10 {
        temp.open_sync(()).unwrap();
    }
    other.mkdir_sync(()).unwrap();
    assert_eq!(exit_hook::installed_hooks(), 1);

    temp.cleanup_sync().unwrap();
    other.cleanup_sync().unwrap();
}

#[tokio::test]
async fn cleanup_without_tracking_fails_and_keeps_files() {
    let temp = Temp::new();
    let (path, handle) = temp.open_sync(()).unwrap().into_parts();
    drop(handle);

    assert!(matches!(temp.cleanup_sync(), Err(Error::NotTracking)));
    assert!(matches!(temp.cleanup().await, Err(Error::NotTracking)));
    assert!(matches!(temp.cleanup_files_sync(), Err(Error::NotTracking)));
    assert!(matches!(temp.cleanup_dirs_sync(), Err(Error::NotTracking)));
    assert!(matches!(temp.cleanup_files().await, Err(Error::NotTracking)));
    assert!(matches!(temp.cleanup_dirs().await, Err(Error::NotTracking)));
    assert!(path.is_file());

    std::fs::remove_file(path).unwrap();
}

#[test]
fn cleanup_sync_twice_is_idempotent() {
    let temp = tracked();
    for _ in 0..2 {
        let report = temp.cleanup_sync().unwrap();
        assert_eq!(report, CleanupReport::default());
    }
}

#[tokio::test]
async fn externally_removed_resources_count_as_missing() {
    let temp = tracked();
    let dir = temp.mkdir(()).await.unwrap();
    let (path, handle) = temp.open(()).await.unwrap().into_parts();
    drop(handle);

    tokio::fs::remove_dir(&dir).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    let report = temp.cleanup().await.unwrap();
    assert_eq!(report.files, Counts { removed: 0, missing: 1 });
    assert_eq!(report.dirs, Counts { removed: 0, missing: 1 });
}

#[tokio::test]
async fn disabling_tracking_stops_registration() {
    let temp = tracked();
    let kept = temp.mkdir(()).await.unwrap();
    temp.track(false);
    let untracked = temp.mkdir(()).await.unwrap();
    assert_eq!(temp.pending_dirs(), 1);

    temp.track(true);
    assert_eq!(temp.cleanup().await.unwrap().dirs.removed, 1);
    assert!(!kept.exists());
    assert!(untracked.exists());
    std::fs::remove_dir(untracked).unwrap();
}

/// Runs inside the child process spawned by [`run_exit_child`]; a no-op otherwise.
#[test]
fn exit_child() {
    let Ok(mode) = std::env::var(EXIT_MODE_VAR) else {
        return;
    };

    let temp = tracked();
    let dir = temp.mkdir_sync("exit-").unwrap();
    std::fs::write(dir.join("inner"), "a content").unwrap();
    let (file, handle) = temp.open_sync("exit-").unwrap().into_parts();
    drop(handle);
    if mode == "untracked" {
        temp.track(false);
    }

    println!("tracked-dir={}", dir.display());
    println!("tracked-file={}", file.display());
    std::io::stdout().flush().unwrap();
    if mode == "exit" {
        std::process::exit(0);
    }
}

/// Re-runs this test binary filtered to `exit_child` and returns the paths it created.
fn run_exit_child(mode: &str) -> (PathBuf, PathBuf) {
    let output = Command::new(std::env::current_exe().unwrap())
        .args(["exit_child", "--exact", "--nocapture", "--test-threads=1"])
        .env(EXIT_MODE_VAR, mode)
        .output()
        .unwrap();
    assert!(output.status.success(), "child failed: {output:?}");

    // The harness may print the test name on the same line, so match anywhere.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let field = |key: &str| {
        stdout
            .lines()
            .find_map(|line| line.split_once(key).map(|(_, path)| PathBuf::from(path.trim())))
            .unwrap_or_else(|| panic!("no {key} in child output: {stdout}"))
    };
    (field("tracked-dir="), field("tracked-file="))
}

#[test]
fn tracked_resources_are_removed_when_main_returns() {
    let (dir, file) = run_exit_child("return");
    assert!(!dir.exists());
    assert!(!file.exists());
}

#[test]
fn tracked_resources_are_removed_on_process_exit() {
    let (dir, file) = run_exit_child("exit");
    assert!(!dir.exists());
    assert!(!file.exists());
}

#[test]
fn registry_with_tracking_disabled_is_skipped_at_exit() {
    let (dir, file) = run_exit_child("untracked");
    assert!(dir.join("inner").is_file());
    assert!(file.is_file());

    std::fs::remove_dir_all(dir).unwrap();
    std::fs::remove_file(file).unwrap();
}
