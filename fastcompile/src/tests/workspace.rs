use std::{sync::Arc, time::Duration};

use assert_fs::TempDir;

use super::{
    fixtures::builds::*,
    utils::{default_timeout, entries, ephemeral},
};
use crate::{EphemeralRunner, Error, Job};

fn job(code: &str) -> Job {
    Job::new("Shell", code).with_stdlib("stdlib;")
}

#[tokio::test]
async fn test_success_removes_workspace() {
    let root = TempDir::new().unwrap();
    let runner = EphemeralRunner::new(root.path(), Some(default_timeout()));

    let output = tokio_test::assert_ok!(runner.run(&job("X"), &ephemeral(CAT_ENTRY)).await);
    assert_eq!(output.stdout, "X");
    assert!(entries(root.path()).is_empty());
}

#[tokio::test]
async fn test_both_files_written_before_build() {
    let root = TempDir::new().unwrap();
    let runner = EphemeralRunner::new(root.path(), Some(default_timeout()));

    let output = runner.run(&job("main"), &ephemeral(CAT_BOTH)).await.unwrap();
    assert_eq!(output.stdout, "stdlib;main");
}

#[tokio::test]
async fn test_failure_keeps_workspace_with_sources() {
    let root = TempDir::new().unwrap();
    let runner = EphemeralRunner::new(root.path(), Some(default_timeout()));

    let result = runner.run(&job("X"), &ephemeral(EXITS_NON_ZERO)).await;
    match result {
        Err(Error::BuildOrRuntimeFailure(text)) => assert!(text.contains("exit status")),
        other => panic!("unexpected: {:?}", other),
    }

    let workspaces = entries(root.path());
    assert_eq!(workspaces.len(), 1);
    let workspace = &workspaces[0];
    assert!(workspace
        .file_name()
        .unwrap()
        .to_string_lossy()
        .ends_with("_shell"));
    assert_eq!(
        std::fs::read_to_string(workspace.join("main.txt")).unwrap(),
        "X"
    );
    assert_eq!(
        std::fs::read_to_string(workspace.join("lib/one.txt")).unwrap(),
        "stdlib;"
    );
}

#[tokio::test]
async fn test_stderr_with_zero_exit_is_failure() {
    let root = TempDir::new().unwrap();
    let runner = EphemeralRunner::new(root.path(), Some(default_timeout()));

    match runner.run(&job("X"), &ephemeral(WARNS_AND_EXITS_ZERO)).await {
        Err(Error::BuildOrRuntimeFailure(stderr)) => {
            assert_eq!(stderr.trim(), "warning: unused")
        }
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(entries(root.path()).len(), 1);
}

#[tokio::test]
async fn test_timeout_keeps_workspace() {
    let root = TempDir::new().unwrap();
    let runner = EphemeralRunner::new(root.path(), Some(Duration::from_secs(1)));

    let result = runner.run(&job("X"), &ephemeral(SLEEPS)).await;
    assert!(matches!(result, Err(Error::Timeout(1))));
    assert_eq!(entries(root.path()).len(), 1);
}

#[tokio::test]
async fn test_missing_build_tool() {
    let root = TempDir::new().unwrap();
    let runner = EphemeralRunner::new(root.path(), None);

    let result = runner
        .run(&job("X"), &ephemeral(&["definitely-not-a-real-compiler"]))
        .await;
    assert!(matches!(result, Err(Error::CommandNotFound(_))));
}

#[tokio::test]
async fn test_file_names_cannot_escape_workspace() {
    let root = TempDir::new().unwrap();
    let runner = EphemeralRunner::new(root.path().join("jobs"), None);
    let mut spec = ephemeral(CAT_ENTRY);
    spec.stdlib_file_name = "../outside.txt".to_string();

    let result = runner.run(&job("X"), &spec).await;
    assert!(matches!(result, Err(Error::Workspace(_))));
    assert!(!root.path().join("outside.txt").exists());
}

#[tokio::test]
async fn test_parallel_jobs_get_disjoint_workspaces() {
    let root = TempDir::new().unwrap();
    let runner = Arc::new(EphemeralRunner::new(root.path(), Some(default_timeout())));

    let mut handles = vec![];
    for i in 0..8 {
        let runner = runner.clone();
        handles.push(tokio::spawn(async move {
            let code = format!("job-{}", i);
            let output = runner.run(&job(&code), &ephemeral(CAT_ENTRY)).await;
            (code, output)
        }));
    }

    for handle in handles {
        let (code, output) = handle.await.unwrap();
        assert_eq!(output.unwrap().stdout, code);
    }
    assert!(entries(root.path()).is_empty());
}
