// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`WorkspaceManager`] fake, gated behind `test-support`, so
//! `ew-engine`'s Job Controller tests can exercise the full job lifecycle
//! without shelling out to a real `git` binary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ew_core::ThreadId;
use parking_lot::Mutex;

use crate::error::GitError;
use crate::manager::WorkspaceManager;

#[derive(Debug, Clone, Default)]
struct FakeRepoState {
    current_branch: String,
    dirty: bool,
    changed_paths: Vec<String>,
    commits: Vec<(String, Option<String>)>,
    pushed_commits: usize,
}

/// Each call is recorded so a test can assert the sequence the Job
/// Controller issued (`init` → `ensureBranch` → `commit` → `push`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerCall {
    Init,
    EnsureBranch(String),
    Commit { committed: bool },
    Push,
    Recover,
}

#[derive(Default)]
pub struct FakeWorkspaceManager {
    repos: Mutex<HashMap<PathBuf, FakeRepoState>>,
    calls: Mutex<Vec<ManagerCall>>,
    pub fail_push_non_convergent: Mutex<bool>,
}

impl FakeWorkspaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ManagerCall> {
        self.calls.lock().clone()
    }

    /// Mark the workspace dirty with the given changed-file paths, without
    /// going through a real filesystem or code-mod subprocess.
    pub fn set_changed_files(&self, workspace: &Path, paths: Vec<String>) {
        let mut repos = self.repos.lock();
        let state = repos.entry(workspace.to_path_buf()).or_default();
        state.dirty = !paths.is_empty();
        state.changed_paths = paths;
    }

    pub fn pushed_commit_count(&self, workspace: &Path) -> usize {
        self.repos.lock().get(workspace).map(|s| s.pushed_commits).unwrap_or(0)
    }
}

#[async_trait]
impl WorkspaceManager for FakeWorkspaceManager {
    async fn init(&self, workspace: &Path, _repo_url: &str) -> Result<(), GitError> {
        self.repos.lock().entry(workspace.to_path_buf()).or_insert_with(|| FakeRepoState {
            current_branch: "main".to_string(),
            ..Default::default()
        });
        self.calls.lock().push(ManagerCall::Init);
        Ok(())
    }

    async fn ensure_branch(&self, workspace: &Path, thread_id: &ThreadId) -> Result<(), GitError> {
        let branch = ew_core::branch_name(thread_id);
        let mut repos = self.repos.lock();
        let state = repos.entry(workspace.to_path_buf()).or_default();
        state.current_branch = branch.clone();
        self.calls.lock().push(ManagerCall::EnsureBranch(branch));
        Ok(())
    }

    async fn has_changes(&self, workspace: &Path) -> Result<bool, GitError> {
        Ok(self.repos.lock().get(workspace).map(|s| s.dirty).unwrap_or(false))
    }

    async fn commit(&self, workspace: &Path, subject: &str, body: Option<&str>) -> Result<bool, GitError> {
        let mut repos = self.repos.lock();
        let state = repos.entry(workspace.to_path_buf()).or_default();
        if !state.dirty {
            self.calls.lock().push(ManagerCall::Commit { committed: false });
            return Ok(false);
        }
        state.commits.push((subject.to_string(), body.map(str::to_string)));
        state.dirty = false;
        self.calls.lock().push(ManagerCall::Commit { committed: true });
        Ok(true)
    }

    async fn push(&self, workspace: &Path, _branch: Option<&str>) -> Result<(), GitError> {
        self.calls.lock().push(ManagerCall::Push);
        if *self.fail_push_non_convergent.lock() {
            return Err(GitError::PushDidNotConverge {
                branch: "unknown".to_string(),
                reason: "fake forced failure".to_string(),
            });
        }
        let mut repos = self.repos.lock();
        let state = repos.entry(workspace.to_path_buf()).or_default();
        state.pushed_commits = state.commits.len();
        Ok(())
    }

    async fn recover(&self, _workspace: &Path) -> Result<(), GitError> {
        self.calls.lock().push(ManagerCall::Recover);
        Ok(())
    }

    async fn changed_files(&self, workspace: &Path) -> Result<Vec<String>, GitError> {
        let repos = self.repos.lock();
        Ok(repos.get(workspace).map(|s| s.changed_paths.clone()).unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
