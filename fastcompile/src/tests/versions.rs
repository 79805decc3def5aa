use std::sync::Arc;

use super::utils::{command, ephemeral};
use crate::{BackendRegistry, BackendSpec, VersionCache};

fn registry_with_version(version: &[&str]) -> Arc<BackendRegistry> {
    let mut build = ephemeral(super::fixtures::builds::CAT_ENTRY);
    build.version_command = command(version);
    Arc::new(BackendRegistry::new([("shell", BackendSpec::EphemeralBuild(build))]).unwrap())
}

#[tokio::test]
async fn test_cached_after_first_query() {
    let dir = tempfile::tempdir().unwrap();
    let version_file = dir.path().join("VERSION");
    std::fs::write(&version_file, "shell 2.5\n").unwrap();

    let cache = VersionCache::new(registry_with_version(&[
        "cat",
        version_file.to_str().unwrap(),
    ]));
    assert!(!cache.is_populated());

    let first = cache.get().await.clone();
    assert_eq!(first.get("shell").map(String::as_str), Some("shell 2.5"));

    // The toolchain disappearing must not change the answer
    std::fs::remove_file(&version_file).unwrap();
    let second = cache.get().await.clone();
    assert_eq!(first, second);
    assert!(cache.is_populated());
}

#[tokio::test]
async fn test_non_zero_exit_output_is_kept() {
    let cache = VersionCache::new(registry_with_version(&[
        "sh",
        "-c",
        "echo 'tool 9.1' >&2; exit 1",
    ]));
    assert_eq!(cache.get().await["shell"], "tool 9.1");
}

#[tokio::test]
async fn test_missing_toolchain_is_reported_not_fatal() {
    let cache = VersionCache::new(registry_with_version(&["definitely-not-a-real-toolchain"]));
    assert!(cache.get().await["shell"].starts_with("unavailable"));
}

#[tokio::test]
async fn test_languages_without_version_command_are_omitted() {
    let registry = BackendRegistry::new([(
        "python",
        BackendSpec::PersistentWorker {
            start_command: command(&["python3", "jsonrepl.py"]),
            working_dir: ".".into(),
            version_command: None,
        },
    )])
    .unwrap();
    let cache = VersionCache::new(Arc::new(registry));
    assert!(cache.get().await.is_empty());
}

#[tokio::test]
async fn test_backend_version_runs_in_its_working_dir() {
    let backends = tempfile::tempdir().unwrap();
    std::fs::create_dir(backends.path().join("TypeScript")).unwrap();
    std::fs::write(backends.path().join("TypeScript/VERSION"), "5.4.2\n").unwrap();

    let registry = BackendRegistry::new([(
        "TypeScript",
        BackendSpec::PersistentWorker {
            start_command: command(&["node", "jsonrepl.js"]),
            working_dir: "TypeScript".into(),
            version_command: Some(command(&["cat", "VERSION"])),
        },
    )])
    .unwrap();
    let cache = VersionCache::new(Arc::new(registry)).with_backends_dir(backends.path());
    assert_eq!(cache.get().await["TypeScript"], "5.4.2");
}
