//! Integration tests for `GitDiffSource` against real on-disk repositories.

use std::path::Path;
use std::process::Command;

use slipway_core::domain::{ChangeComparisonSpec, ServiceRoot, SlipwayError};
use slipway_deploy::diff_source::{DiffSource, GitDiffSource};
use slipway_deploy::exec::ProcessExecutor;

fn run_git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write_file(repo_dir: &Path, rel: &str, content: &str) {
    let path = repo_dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Repo with two commits: the second touches backend and frontend files.
fn repo_with_service_changes() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    run_git(dir.path(), &["init"]);
    run_git(dir.path(), &["config", "user.name", "test-user"]);
    run_git(dir.path(), &["config", "user.email", "test@example.com"]);

    write_file(dir.path(), "backend/src/main.py", "print('v1')\n");
    write_file(dir.path(), "frontend/index.html", "<html>v1</html>\n");
    write_file(dir.path(), "docs/readme.md", "v1\n");
    run_git(dir.path(), &["add", "."]);
    run_git(dir.path(), &["commit", "-m", "first"]);

    write_file(dir.path(), "backend/src/main.py", "print('v2')\n");
    write_file(dir.path(), "frontend/index.html", "<html>v2</html>\n");
    run_git(dir.path(), &["add", "."]);
    run_git(dir.path(), &["commit", "-m", "second"]);

    dir
}

fn spec() -> ChangeComparisonSpec {
    ChangeComparisonSpec::against_previous_commit(vec![ServiceRoot::new("backend").unwrap()])
}

#[tokio::test]
async fn reports_files_changed_between_adjacent_commits() {
    let repo = repo_with_service_changes();
    let source = GitDiffSource::new(repo.path(), ProcessExecutor::new());

    let mut files: Vec<String> = source
        .changed_files(&spec())
        .await
        .expect("diff failed")
        .into_iter()
        .map(|f| f.as_str().to_string())
        .collect();
    files.sort();

    assert_eq!(files, vec!["backend/src/main.py", "frontend/index.html"]);
}

#[tokio::test]
async fn identical_refs_yield_an_empty_list() {
    let repo = repo_with_service_changes();
    let source = GitDiffSource::new(repo.path(), ProcessExecutor::new());

    let spec = ChangeComparisonSpec::new("HEAD", "HEAD", vec![ServiceRoot::new("backend").unwrap()]);
    let files = source.changed_files(&spec).await.expect("diff failed");
    assert!(files.is_empty());
}

#[tokio::test]
async fn unknown_ref_is_a_fetch_error() {
    let repo = repo_with_service_changes();
    let source = GitDiffSource::new(repo.path(), ProcessExecutor::new());

    let spec = ChangeComparisonSpec::new(
        "no-such-ref",
        "HEAD",
        vec![ServiceRoot::new("backend").unwrap()],
    );
    let err = source.changed_files(&spec).await.unwrap_err();
    assert!(matches!(err, SlipwayError::Fetch(_)));
}

#[tokio::test]
async fn non_repo_directory_is_a_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = GitDiffSource::new(dir.path(), ProcessExecutor::new());

    let err = source.changed_files(&spec()).await.unwrap_err();
    assert!(matches!(err, SlipwayError::Fetch(_)));
}
